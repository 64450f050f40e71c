//! Control families
//!
//! A family is a group of control nodes enabled and disabled together. The
//! built-in catalog covers the colour tuning, mDNIe scenario, in-call
//! volume boost, dock audio, touch-key backlight and vibration intensity
//! nodes; a configuration directory can add families or replace built-ins
//! by id.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{ScaleCodec, TuneError};

const COLOR_TUNING_DIR: &str = "/sys/devices/virtual/misc/color_tuning";
const VOODOO_SOUND_DIR: &str = "/sys/devices/virtual/misc/voodoo_sound";
const DOCK_AUDIO_DIR: &str = "/sys/class/misc/dockaudio";
const MDNIE_NODE: &str = "/sys/class/mdnieset_ui/switch_mdnieset_ui/mdnieset_ui_file_cmd";
const VIBRATOR_NODE: &str = "/sys/class/timed_output/vibrator/pwm_value";

/// Full scale of a colour multiplier
pub const MULTIPLIER_MAX: i64 = i32::MAX as i64;
/// Largest gamma offset
pub const GAMMA_MAX: i64 = 40;
/// Largest in-call boost step
pub const BOOST_MAX: i64 = 3;
/// Largest in-call mic gain
pub const MIC_GAIN_MAX: i64 = 31;
/// Last mDNIe scenario index (UI, video, warm, cold, camera, navigation)
pub const MDNIE_SCENARIO_MAX: i64 = 5;
/// Full vibrator PWM duty
pub const VIBRATION_MAX: i64 = 100;

/// How the UI edits a family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FamilyMode {
    /// Edited in a dialog with live preview, then committed or cancelled
    #[default]
    Session,
    /// A single choice written and saved in one step
    Direct,
}

/// Static description of one tunable node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSpec {
    /// Short identifier, unique within the family
    pub name: String,
    /// Kernel node path; also the preference key
    pub path: PathBuf,
    /// Encoding between user value and node text
    #[serde(default)]
    pub codec: ScaleCodec,
    /// Lowest user value
    #[serde(default)]
    pub min: i64,
    /// Highest user value
    pub max: i64,
    /// Value used when nothing was ever committed
    pub default: i64,
}

impl ControlSpec {
    pub fn new(name: &str, path: impl Into<PathBuf>, codec: ScaleCodec, max: i64, default: i64) -> Self {
        Self {
            name: name.to_string(),
            path: path.into(),
            codec,
            min: 0,
            max,
            default,
        }
    }

    /// Preference store key for this control
    pub fn key(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    fn validate(&self, family: &str) -> Result<(), TuneError> {
        let invalid = |reason: String| TuneError::InvalidFamily {
            family: family.to_string(),
            reason,
        };

        if self.name.is_empty() {
            return Err(invalid("control without a name".into()));
        }
        if !self.path.is_absolute() {
            return Err(invalid(format!(
                "{}: node path {} is not absolute",
                self.name,
                self.path.display()
            )));
        }
        if self.min > self.max {
            return Err(invalid(format!("{}: min {} > max {}", self.name, self.min, self.max)));
        }
        if !self.contains(self.default) {
            return Err(invalid(format!(
                "{}: default {} outside [{}, {}]",
                self.name, self.default, self.min, self.max
            )));
        }
        match self.codec {
            ScaleCodec::Linear { factor } if factor < 1 => {
                return Err(invalid(format!("{}: linear factor {} < 1", self.name, factor)));
            }
            _ => {}
        }
        Ok(())
    }
}

/// Group of controls sharing an activation gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFamily {
    /// Family identifier
    pub id: String,
    /// Display name
    pub name: String,
    #[serde(default)]
    pub mode: FamilyMode,
    /// Member controls, in presentation order
    pub controls: Vec<ControlSpec>,
}

impl ControlFamily {
    /// Look up a member control by name
    pub fn control(&self, name: &str) -> Option<&ControlSpec> {
        self.controls.iter().find(|c| c.name == name)
    }

    /// Every node path the family needs
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.controls.iter().map(|c| c.path.as_path())
    }

    /// Check the family is internally consistent
    pub fn validate(&self) -> Result<(), TuneError> {
        if self.id.is_empty() {
            return Err(TuneError::InvalidFamily {
                family: self.name.clone(),
                reason: "missing id".into(),
            });
        }
        if self.controls.is_empty() {
            return Err(TuneError::InvalidFamily {
                family: self.id.clone(),
                reason: "no controls".into(),
            });
        }
        for (i, control) in self.controls.iter().enumerate() {
            control.validate(&self.id)?;
            if self.controls[..i].iter().any(|c| c.name == control.name) {
                return Err(TuneError::InvalidFamily {
                    family: self.id.clone(),
                    reason: format!("duplicate control {}", control.name),
                });
            }
        }
        Ok(())
    }

    /// Colour multipliers and gamma offsets
    pub fn color_tuning() -> Self {
        let mut controls = Vec::with_capacity(6);
        for color in ["red", "green", "blue"] {
            controls.push(ControlSpec::new(
                &format!("{}_multiplier", color),
                format!("{}/{}_multiplier", COLOR_TUNING_DIR, color),
                ScaleCodec::LINEAR_DOUBLE,
                MULTIPLIER_MAX,
                MULTIPLIER_MAX,
            ));
        }
        for color in ["red", "green", "blue"] {
            controls.push(ControlSpec::new(
                &format!("{}_gamma", color),
                format!("{}/{}_v1_offset", COLOR_TUNING_DIR, color),
                ScaleCodec::SignedOffset,
                GAMMA_MAX,
                0,
            ));
        }

        Self {
            id: "color_tuning".to_string(),
            name: "Color tuning".to_string(),
            mode: FamilyMode::Session,
            controls,
        }
    }

    /// mDNIe image scenario, as an index into the scenario list
    pub fn mdnie() -> Self {
        Self {
            id: "mdnie".to_string(),
            name: "mDNIe scenario".to_string(),
            mode: FamilyMode::Direct,
            controls: vec![ControlSpec::new(
                "scenario",
                MDNIE_NODE,
                ScaleCodec::Identity,
                MDNIE_SCENARIO_MAX,
                0,
            )],
        }
    }

    /// In-call volume boost and mic gain
    pub fn volume_boost() -> Self {
        let mut controls = Vec::with_capacity(8);
        for output in ["rcv", "bt", "spk", "hp"] {
            controls.push(ControlSpec::new(
                &format!("boost_{}", output),
                format!("{}/incall_boost_{}", VOODOO_SOUND_DIR, output),
                ScaleCodec::Identity,
                BOOST_MAX,
                2,
            ));
        }
        for (input, default) in [("rcv", 19), ("spk", 31), ("hp", 29), ("hp_no_mic", 18)] {
            controls.push(ControlSpec::new(
                &format!("mic_{}", input),
                format!("{}/incall_mic_gain_{}", VOODOO_SOUND_DIR, input),
                ScaleCodec::Identity,
                MIC_GAIN_MAX,
                default,
            ));
        }

        Self {
            id: "volume_boost".to_string(),
            name: "Volume boost".to_string(),
            mode: FamilyMode::Session,
            controls,
        }
    }

    /// Audio routing to car and desk docks
    pub fn dock_audio() -> Self {
        let controls = ["cardock", "deskdock"]
            .into_iter()
            .map(|dock| {
                ControlSpec::new(
                    &format!("{}_audio", dock),
                    format!("{}/{}_enable", DOCK_AUDIO_DIR, dock),
                    ScaleCodec::Identity,
                    1,
                    0,
                )
            })
            .collect();

        Self {
            id: "dock_audio".to_string(),
            name: "Dock audio".to_string(),
            mode: FamilyMode::Direct,
            controls,
        }
    }

    /// Touch-key backlight timeout, as an index into the timeout list
    pub fn touchkey_backlight() -> Self {
        Self {
            id: "touchkey_backlight".to_string(),
            name: "Touch key backlight timeout".to_string(),
            mode: FamilyMode::Direct,
            controls: vec![ControlSpec::new(
                "timeout",
                "/sys/class/misc/notification/bl_timeout",
                ScaleCodec::Identity,
                5,
                0,
            )],
        }
    }

    /// Vibrator intensity, previewed while the slider moves
    pub fn vibration() -> Self {
        Self {
            id: "vibration".to_string(),
            name: "Vibration intensity".to_string(),
            mode: FamilyMode::Session,
            controls: vec![ControlSpec::new(
                "intensity",
                VIBRATOR_NODE,
                ScaleCodec::Identity,
                VIBRATION_MAX,
                50,
            )],
        }
    }
}

/// Ordered set of known families
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyCatalog {
    #[serde(default)]
    families: Vec<ControlFamily>,
}

impl FamilyCatalog {
    pub fn new(families: Vec<ControlFamily>) -> Self {
        Self { families }
    }

    /// Families compiled into the engine
    pub fn builtin() -> Self {
        Self::new(vec![
            ControlFamily::color_tuning(),
            ControlFamily::mdnie(),
            ControlFamily::volume_boost(),
            ControlFamily::dock_audio(),
            ControlFamily::touchkey_backlight(),
            ControlFamily::vibration(),
        ])
    }

    /// Built-in families plus every `*.toml` definition in `dir`
    pub fn load(dir: &Path) -> Result<Self, TuneError> {
        let mut catalog = Self::builtin();

        if !dir.exists() {
            tracing::debug!("No family directory at {}", dir.display());
            return Ok(catalog);
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "toml") {
                files.push(path);
            }
        }
        // Directory order is unspecified; later files win deterministically
        files.sort();

        for path in files {
            let contents = std::fs::read_to_string(&path)?;
            let family: ControlFamily = toml::from_str(&contents).map_err(|e| {
                TuneError::InvalidFamily {
                    family: path.display().to_string(),
                    reason: e.to_string(),
                }
            })?;
            tracing::info!("Loaded family {} from {}", family.id, path.display());
            catalog.insert(family)?;
        }

        Ok(catalog)
    }

    /// Add a family, replacing any existing one with the same id
    pub fn insert(&mut self, family: ControlFamily) -> Result<(), TuneError> {
        family.validate()?;
        match self.families.iter_mut().find(|f| f.id == family.id) {
            Some(existing) => *existing = family,
            None => self.families.push(family),
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ControlFamily> {
        self.families.iter().find(|f| f.id == id)
    }

    pub fn families(&self) -> &[ControlFamily] {
        &self.families
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_families_are_valid() {
        let catalog = FamilyCatalog::builtin();
        assert_eq!(catalog.len(), 6);
        for family in catalog.families() {
            family.validate().unwrap();
        }
    }

    #[test]
    fn test_color_tuning_layout() {
        let family = ControlFamily::color_tuning();
        assert_eq!(family.controls.len(), 6);
        assert_eq!(family.mode, FamilyMode::Session);

        let red = family.control("red_multiplier").unwrap();
        assert_eq!(
            red.path,
            PathBuf::from("/sys/devices/virtual/misc/color_tuning/red_multiplier")
        );
        assert_eq!(red.codec, ScaleCodec::LINEAR_DOUBLE);
        assert_eq!(red.default, MULTIPLIER_MAX);

        let gamma = family.control("blue_gamma").unwrap();
        assert_eq!(gamma.codec, ScaleCodec::SignedOffset);
        assert_eq!((gamma.min, gamma.max, gamma.default), (0, 40, 0));
    }

    #[test]
    fn test_volume_boost_defaults() {
        let family = ControlFamily::volume_boost();
        let defaults: Vec<i64> = family.controls.iter().map(|c| c.default).collect();
        assert_eq!(defaults, vec![2, 2, 2, 2, 19, 31, 29, 18]);
        assert_eq!(family.control("mic_hp_no_mic").unwrap().max, 31);
    }

    #[test]
    fn test_mdnie_and_vibration_defaults() {
        let mdnie = ControlFamily::mdnie();
        assert_eq!(mdnie.mode, FamilyMode::Direct);
        let scenario = mdnie.control("scenario").unwrap();
        assert_eq!((scenario.min, scenario.max, scenario.default), (0, 5, 0));

        let vibration = ControlFamily::vibration();
        assert_eq!(vibration.mode, FamilyMode::Session);
        let intensity = vibration.control("intensity").unwrap();
        assert_eq!(
            intensity.path,
            PathBuf::from("/sys/class/timed_output/vibrator/pwm_value")
        );
        assert_eq!((intensity.max, intensity.default), (100, 50));
    }

    #[test]
    fn test_validation_rejects_bad_default() {
        let mut family = ControlFamily::dock_audio();
        family.controls[0].default = 2;
        assert!(matches!(
            family.validate(),
            Err(TuneError::InvalidFamily { .. })
        ));

        let mut family = ControlFamily::dock_audio();
        family.controls[1].name = family.controls[0].name.clone();
        assert!(family.validate().is_err());

        let mut family = ControlFamily::color_tuning();
        family.controls[0].codec = ScaleCodec::Linear { factor: 0 };
        assert!(family.validate().is_err());

        let empty = ControlFamily {
            id: "empty".into(),
            name: "Empty".into(),
            mode: FamilyMode::Direct,
            controls: vec![],
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_load_custom_families() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("bln.toml"),
            r#"
id = "backlight_notification"
name = "Backlight notification"
mode = "direct"

[[controls]]
name = "enabled"
path = "/sys/class/misc/backlightnotification/enabled"
max = 1
default = 0
"#,
        )
        .unwrap();
        // Replaces the built-in family with the same id
        std::fs::write(
            dir.path().join("dock.toml"),
            r#"
id = "dock_audio"
name = "Car dock audio"
mode = "direct"

[[controls]]
name = "cardock_audio"
path = "/sys/class/misc/dockaudio/cardock_enable"
max = 1
default = 1
"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("README"), "not a family").unwrap();

        let catalog = FamilyCatalog::load(dir.path()).unwrap();
        assert_eq!(catalog.len(), 7);

        let bln = catalog.get("backlight_notification").unwrap();
        assert_eq!(bln.mode, FamilyMode::Direct);
        assert_eq!(bln.controls[0].codec, ScaleCodec::Identity);
        assert_eq!(bln.controls[0].min, 0);

        let dock = catalog.get("dock_audio").unwrap();
        assert_eq!(dock.controls.len(), 1);
        assert_eq!(dock.controls[0].default, 1);
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("broken.toml"), "id = ").unwrap();

        let err = FamilyCatalog::load(dir.path()).unwrap_err();
        assert!(matches!(err, TuneError::InvalidFamily { .. }));
    }

    #[test]
    fn test_load_without_directory() {
        let catalog = FamilyCatalog::load(Path::new("/nonexistent/families")).unwrap();
        assert_eq!(catalog, FamilyCatalog::builtin());
    }
}
