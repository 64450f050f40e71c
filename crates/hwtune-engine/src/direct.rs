//! Direct settings and live calibration access
//!
//! Toggle and list style settings (dock audio routing, backlight timeout)
//! have no preview: a choice is written to the node and saved at once.
//! Calibration tools read and write whole families as space-separated
//! value lists.

use crate::{ControlFamily, FamilyMode, Result, TuneError, TuningContext};

/// Write a direct setting to its node and save it.
///
/// Returns `Ok(false)` when the value was saved but the node write failed;
/// the next boot sync retries it.
pub fn apply_direct(
    ctx: &TuningContext,
    family: &ControlFamily,
    control: &str,
    value: i64,
) -> Result<bool> {
    if family.mode != FamilyMode::Direct {
        return Err(TuneError::WrongMode {
            family: family.id.clone(),
            mode: family.mode,
        });
    }
    let spec = family
        .control(control)
        .ok_or_else(|| TuneError::UnknownControl {
            family: family.id.clone(),
            control: control.to_string(),
        })?;
    if !ctx.probe().is_supported(family) {
        return Err(TuneError::Unsupported(family.id.clone()));
    }

    let written = match ctx
        .nodes()
        .write_text(&spec.path, &spec.codec.encode(value))
    {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Failed to apply {}/{}: {}", family.id, control, e);
            false
        }
    };

    ctx.store().put(&spec.key(), value)?;
    tracing::info!("{}/{} set to {}", family.id, control, value);
    Ok(written)
}

/// Decoded live value of every control in the family, in order
pub fn current_values(ctx: &TuningContext, family: &ControlFamily) -> Result<Vec<i64>> {
    family
        .controls
        .iter()
        .map(|control| -> Result<i64> {
            let raw = ctx.nodes().read_text(&control.path)?;
            Ok(control.codec.decode(&raw)?)
        })
        .collect()
}

/// Same as [`current_values`], joined by single spaces
pub fn current_values_text(ctx: &TuningContext, family: &ControlFamily) -> Result<String> {
    let values = current_values(ctx, family)?;
    Ok(values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" "))
}

/// Write a space-separated list of values, one per control in order.
///
/// Nothing is persisted. Returns false if the list is malformed or has the
/// wrong length, or at the first failed write.
pub fn set_values(ctx: &TuningContext, family: &ControlFamily, values: &str) -> bool {
    let parsed: std::result::Result<Vec<i64>, _> =
        values.split_whitespace().map(str::parse::<i64>).collect();
    let parsed = match parsed {
        Ok(parsed) if parsed.len() == family.controls.len() => parsed,
        _ => {
            tracing::warn!("Rejecting value list {:?} for {}", values, family.id);
            return false;
        }
    };

    for (control, value) in family.controls.iter().zip(parsed) {
        if let Err(e) = ctx
            .nodes()
            .write_text(&control.path, &control.codec.encode(value))
        {
            tracing::warn!("Failed to set {}: {}", control.name, e);
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ControlSpec, ScaleCodec};
    use hwtune_config::MemoryStore;
    use hwtune_hal::mock::MockNodes;
    use std::sync::Arc;

    fn multipliers() -> ControlFamily {
        let mut family = ControlFamily::color_tuning();
        family.id = "color_calibration".to_string();
        family.controls.truncate(3);
        family
    }

    fn context(nodes: &MockNodes) -> (TuningContext, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (
            TuningContext::new(Arc::new(nodes.clone()), store.clone()),
            store,
        )
    }

    #[test]
    fn test_apply_direct_writes_and_saves() {
        let family = ControlFamily::dock_audio();
        let nodes = MockNodes::new()
            .with_node(&family.controls[0].path, "0")
            .with_node(&family.controls[1].path, "0");
        let (ctx, store) = context(&nodes);

        assert!(apply_direct(&ctx, &family, "deskdock_audio", 1).unwrap());
        assert_eq!(nodes.value(&family.controls[1].path).as_deref(), Some("1"));
        assert_eq!(store.value(&family.controls[1].key()), Some(1));
        assert_eq!(nodes.value(&family.controls[0].path).as_deref(), Some("0"));
    }

    #[test]
    fn test_apply_direct_saves_even_if_node_write_fails() {
        let family = ControlFamily::touchkey_backlight();
        let nodes = MockNodes::new().with_node(&family.controls[0].path, "0");
        nodes.fail_writes(&family.controls[0].path);
        let (ctx, store) = context(&nodes);

        assert!(!apply_direct(&ctx, &family, "timeout", 3).unwrap());
        assert_eq!(store.value(&family.controls[0].key()), Some(3));
    }

    #[test]
    fn test_apply_direct_rejections() {
        let dock = ControlFamily::dock_audio();
        let nodes = MockNodes::new().with_node(&dock.controls[0].path, "0");
        let (ctx, store) = context(&nodes);

        assert!(matches!(
            apply_direct(&ctx, &dock, "cardock_audio", 1),
            Err(TuneError::Unsupported(_))
        ));
        assert!(matches!(
            apply_direct(&ctx, &dock, "hdmi_audio", 1),
            Err(TuneError::UnknownControl { .. })
        ));
        assert!(matches!(
            apply_direct(&ctx, &ControlFamily::volume_boost(), "boost_spk", 1),
            Err(TuneError::WrongMode { .. })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_current_values_decode() {
        let family = multipliers();
        let nodes = MockNodes::new()
            .with_node(&family.controls[0].path, "4294967294\n")
            .with_node(&family.controls[1].path, "2000")
            .with_node(&family.controls[2].path, "1");
        let (ctx, _) = context(&nodes);

        assert_eq!(
            current_values(&ctx, &family).unwrap(),
            vec![i32::MAX as i64, 1000, 0]
        );
        assert_eq!(
            current_values_text(&ctx, &family).unwrap(),
            "2147483647 1000 0"
        );
    }

    #[test]
    fn test_current_values_errors() {
        let family = multipliers();
        let nodes = MockNodes::new()
            .with_node(&family.controls[0].path, "garbage")
            .with_node(&family.controls[1].path, "2");
        let (ctx, _) = context(&nodes);
        assert!(matches!(current_values(&ctx, &family), Err(TuneError::Codec(_))));

        nodes.insert(&family.controls[0].path, "2");
        assert!(matches!(current_values(&ctx, &family), Err(TuneError::Node(_))));
    }

    #[test]
    fn test_current_values_out_of_range_offset() {
        let family = ControlFamily::color_tuning();
        let nodes = MockNodes::new();
        for control in &family.controls {
            nodes.insert(&control.path, &control.codec.encode(control.default));
        }
        nodes.insert(&family.controls[3].path, "-9223372036854775808");
        let (ctx, _) = context(&nodes);

        assert!(matches!(current_values(&ctx, &family), Err(TuneError::Codec(_))));
    }

    #[test]
    fn test_set_values() {
        let family = multipliers();
        let nodes = MockNodes::new();
        for control in &family.controls {
            nodes.insert(&control.path, "0");
        }
        let (ctx, store) = context(&nodes);

        assert!(set_values(&ctx, &family, "1000 2000 3000"));
        assert_eq!(nodes.value(&family.controls[2].path).as_deref(), Some("6000"));
        assert!(store.is_empty());

        assert!(!set_values(&ctx, &family, "1 2"));
        assert!(!set_values(&ctx, &family, "1 two 3"));
        assert_eq!(nodes.value(&family.controls[0].path).as_deref(), Some("2000"));
    }

    #[test]
    fn test_set_values_stops_at_first_failure() {
        let family = ControlFamily {
            id: "gamma".into(),
            name: "Gamma".into(),
            mode: FamilyMode::Session,
            controls: ["/g/r", "/g/g", "/g/b"]
                .iter()
                .map(|p| ControlSpec::new(p, *p, ScaleCodec::SignedOffset, 40, 0))
                .collect(),
        };
        let nodes = MockNodes::new()
            .with_node("/g/r", "0")
            .with_node("/g/g", "0")
            .with_node("/g/b", "0");
        nodes.fail_writes("/g/g");
        let (ctx, _) = context(&nodes);

        assert!(!set_values(&ctx, &family, "5 6 7"));
        assert_eq!(nodes.value("/g/r").as_deref(), Some("5"));
        assert_eq!(nodes.value("/g/b").as_deref(), Some("0"));
    }
}
