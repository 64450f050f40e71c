//! Configuration management for hwtune
//!
//! Handles engine settings and the durable preference store that holds the
//! last committed value of every control node.

mod store;

pub use store::{MemoryStore, PreferenceStore, TomlStore};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Layered configuration error: {0}")]
    Layered(#[from] config::ConfigError),

    #[error("Failed to persist {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Standard configuration paths
pub const CONFIG_DIR: &str = "/etc/hwtune";
pub const USER_CONFIG_DIR: &str = "/data/hwtune";

/// Environment prefix for layered overrides (`HWTUNE_STORE_PATH`, ...)
pub const ENV_PREFIX: &str = "HWTUNE";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuneConfig {
    /// Prefix under which absolute node paths are resolved
    #[serde(default = "default_node_root")]
    pub node_root: PathBuf,

    /// Preference store file
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Directory of additional control family definitions
    #[serde(default = "default_families_dir")]
    pub families_dir: PathBuf,

    /// Where the boot binary records the last sync outcome
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,

    /// Log filter used when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_node_root() -> PathBuf {
    PathBuf::from("/")
}

fn default_store_path() -> PathBuf {
    Path::new(USER_CONFIG_DIR).join("preferences.toml")
}

fn default_families_dir() -> PathBuf {
    Path::new(CONFIG_DIR).join("families")
}

fn default_report_path() -> PathBuf {
    PathBuf::from("/run/hwtune-boot-sync.json")
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for TuneConfig {
    fn default() -> Self {
        Self {
            node_root: default_node_root(),
            store_path: default_store_path(),
            families_dir: default_families_dir(),
            report_path: default_report_path(),
            log_filter: default_log_filter(),
        }
    }
}

impl TuneConfig {
    /// Configuration file used when none is named: the user config if
    /// present, otherwise the system config (which may be absent)
    pub fn default_path() -> PathBuf {
        let user_config = Path::new(USER_CONFIG_DIR).join("config.toml");
        if user_config.exists() {
            return user_config;
        }
        Path::new(CONFIG_DIR).join("config.toml")
    }

    /// Load the boot configuration. A file named explicitly must exist;
    /// without one the default path is layered and may be absent.
    pub fn load_for(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) if !path.exists() => Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Self::load_layered(path),
            None => {
                let path = Self::default_path();
                if !path.exists() {
                    tracing::warn!("No configuration file found, using defaults");
                }
                Self::load_layered(&path)
            }
        }
    }

    /// Load a (possibly absent) TOML file with `HWTUNE_*` environment
    /// variables layered on top
    pub fn load_layered(path: &Path) -> Result<Self, ConfigError> {
        Self::load_layered_with(path, config::Environment::with_prefix(ENV_PREFIX))
    }

    fn load_layered_with(path: &Path, env: config::Environment) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(env)
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        tracing::debug!("Layered configuration: {:?}", config);
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.store_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("store_path must not be empty".into()));
        }
        if self.node_root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("node_root must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let map: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    #[test]
    fn test_default_config() {
        let config = TuneConfig::default();
        assert_eq!(config.node_root, PathBuf::from("/"));
        assert_eq!(
            config.store_path,
            PathBuf::from("/data/hwtune/preferences.toml")
        );
        assert_eq!(config.families_dir, PathBuf::from("/etc/hwtune/families"));
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_load_layered_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "node_root = \"/tmp/sysroot\"\nlog_filter = \"debug\"\n",
        )
        .unwrap();

        let config = TuneConfig::load_layered_with(&path, env(&[])).unwrap();
        assert_eq!(config.node_root, PathBuf::from("/tmp/sysroot"));
        assert_eq!(config.log_filter, "debug");
        // Unset fields fall back to defaults
        assert_eq!(config.store_path, TuneConfig::default().store_path);
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "store_path = \"/tmp/prefs.toml\"\nlog_filter = \"debug\"\n",
        )
        .unwrap();

        let config = TuneConfig::load_layered_with(
            &path,
            env(&[
                ("HWTUNE_STORE_PATH", "/data/local/prefs.toml"),
                ("HWTUNE_NODE_ROOT", "/mnt/sysroot"),
            ]),
        )
        .unwrap();
        assert_eq!(config.store_path, PathBuf::from("/data/local/prefs.toml"));
        assert_eq!(config.node_root, PathBuf::from("/mnt/sysroot"));
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn test_environment_without_file() {
        let dir = TempDir::new().unwrap();
        let config = TuneConfig::load_layered_with(
            &dir.path().join("absent.toml"),
            env(&[("HWTUNE_LOG_FILTER", "hwtune_engine=trace")]),
        )
        .unwrap();
        assert_eq!(config.log_filter, "hwtune_engine=trace");
        assert_eq!(config.families_dir, TuneConfig::default().families_dir);
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let err = TuneConfig::load_for(Some(Path::new("/nonexistent/hwtune.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
        assert!(format!("{}", err).contains("not found"));
    }

    #[test]
    fn test_explicit_file_is_loaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hwtune.toml");
        std::fs::write(&path, "families_dir = \"/tmp/families\"\n").unwrap();

        let config = TuneConfig::load_for(Some(&path)).unwrap();
        assert_eq!(config.families_dir, PathBuf::from("/tmp/families"));
    }

    #[test]
    fn test_default_path() {
        let path = TuneConfig::default_path();
        assert!(path.ends_with("config.toml"));
        assert!(path.starts_with(USER_CONFIG_DIR) || path.starts_with(CONFIG_DIR));
    }

    #[test]
    fn test_invalid_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "store_path = \"\"\n").unwrap();

        let err = TuneConfig::load_layered_with(&path, env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_constants() {
        assert_eq!(CONFIG_DIR, "/etc/hwtune");
        assert_eq!(USER_CONFIG_DIR, "/data/hwtune");
        assert_eq!(ENV_PREFIX, "HWTUNE");
    }
}
