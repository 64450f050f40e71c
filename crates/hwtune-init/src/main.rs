//! hwtune boot sync
//!
//! Run once the device reports boot completed. Pushes every committed
//! tuning preference back to its kernel control node.
//!
//! Sequence:
//! 1. Load configuration (`--config` or the default file, then `HWTUNE_*`
//!    environment overrides)
//! 2. Load the control family catalog
//! 3. Replay preferences onto supported families
//! 4. Record the outcome for monitoring

use anyhow::{Context, Result};
use clap::Parser;
use hwtune_config::{TomlStore, TuneConfig};
use hwtune_engine::{BootReport, BootSync, FamilyCatalog, FamilyStatus, TuningContext};
use hwtune_hal::SysfsNodes;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Replay committed tuning preferences onto kernel control nodes
#[derive(Debug, Parser)]
#[command(name = "hwtune-init", version, about)]
struct Args {
    /// Configuration file (default: user config, then system config)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Sync stages for timing
#[derive(Debug, Clone, Copy)]
enum SyncStage {
    Catalog,
    Sync,
    Report,
}

impl SyncStage {
    fn name(&self) -> &'static str {
        match self {
            SyncStage::Catalog => "catalog",
            SyncStage::Sync => "sync",
            SyncStage::Report => "report",
        }
    }
}

fn main() -> Result<()> {
    let start = Instant::now();

    let args = Args::parse();
    let config = TuneConfig::load_for(args.config.as_deref())
        .context("Failed to load configuration")?;

    // Setup logging
    setup_logging(&config.log_filter);

    info!("hwtune boot sync starting...");
    debug!("Configuration: {:?}", config);

    // Stage 1: Load families
    let stage_start = Instant::now();
    let catalog = FamilyCatalog::load(&config.families_dir).with_context(|| {
        format!(
            "Failed to load control families from {}",
            config.families_dir.display()
        )
    })?;
    log_stage_complete(SyncStage::Catalog, stage_start);

    // Stage 2: Replay preferences
    let stage_start = Instant::now();
    let ctx = TuningContext::new(
        Arc::new(SysfsNodes::with_root(&config.node_root)),
        Arc::new(TomlStore::new(&config.store_path)),
    );
    let report = BootSync::new(&ctx).run(catalog.families());
    log_report(&report);
    log_stage_complete(SyncStage::Sync, stage_start);

    // Stage 3: Record outcome
    let stage_start = Instant::now();
    if let Err(e) = write_report(&config.report_path, &report) {
        warn!("Failed to write boot sync report: {:#}", e);
    }
    log_stage_complete(SyncStage::Report, stage_start);

    info!("Boot sync complete in {:?}", start.elapsed());
    Ok(())
}

/// Setup logging to console
fn setup_logging(default_filter: &str) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_ansi(false))
        .init();
}

/// Log per-family outcome
fn log_report(report: &BootReport) {
    for outcome in &report.families {
        match &outcome.status {
            FamilyStatus::Applied { written, failed } if failed.is_empty() => {
                info!("{}: restored {} node(s)", outcome.family, written);
            }
            FamilyStatus::Applied { written, failed } => {
                warn!(
                    "{}: restored {} node(s), failed {:?}",
                    outcome.family, written, failed
                );
            }
            FamilyStatus::Skipped { missing } => {
                info!(
                    "{}: not supported ({} node(s) missing)",
                    outcome.family,
                    missing.len()
                );
            }
        }
    }

    info!(
        "{} famil(ies) restored, {} skipped, {} failed write(s)",
        report.applied(),
        report.skipped(),
        report.failures()
    );
}

/// Write the report as JSON for monitoring
fn write_report(path: &Path, report: &BootReport) -> Result<()> {
    let contents = serde_json::to_string_pretty(report)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    debug!("Boot sync report written to {}", path.display());
    Ok(())
}

/// Log stage completion with timing
fn log_stage_complete(stage: SyncStage, start: Instant) {
    info!("Stage {} complete in {:?}", stage.name(), start.elapsed());
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwtune_engine::FamilyOutcome;
    use tempfile::TempDir;

    #[test]
    fn test_parse_config_argument() {
        let args = Args::try_parse_from(["hwtune-init", "--config", "/tmp/hwtune.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/tmp/hwtune.toml")));

        let args = Args::try_parse_from(["hwtune-init", "-c", "relative.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("relative.toml")));
    }

    #[test]
    fn test_parse_rejects_bad_arguments() {
        assert!(Args::try_parse_from(["hwtune-init", "--config"]).is_err());
        assert!(Args::try_parse_from(["hwtune-init", "--verbose"]).is_err());
    }

    #[test]
    fn test_config_is_optional() {
        let args = Args::try_parse_from(["hwtune-init"]).unwrap();
        assert!(args.config.is_none());
    }

    #[test]
    fn test_args_definition() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn test_write_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run").join("report.json");
        let report = BootReport {
            families: vec![FamilyOutcome {
                family: "volume_boost".to_string(),
                status: FamilyStatus::Applied {
                    written: 8,
                    failed: vec![],
                },
            }],
        };

        write_report(&path, &report).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["families"][0]["family"], "volume_boost");
        assert_eq!(json["families"][0]["status"], "applied");
        assert_eq!(json["families"][0]["written"], 8);
    }
}
