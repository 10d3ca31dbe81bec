//! Configuration file support for Bedside.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/bedside/config.toml`.

use crate::{Error, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Bed identifiers of the default ward layout, in display order
static DEFAULT_BEDS: Lazy<Vec<String>> = Lazy::new(|| {
    [
        "1-1", "1-2", "1-3", "1-4", "2-1", "2-2", "3-1", "3-2", "4-1", "4-2", "5", "6", "7", "8",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
});

/// Get the default bed list
pub fn default_bed_ids() -> &'static [String] {
    &DEFAULT_BEDS
}

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub ward: WardConfig,

    #[serde(default)]
    pub resuscitation: ResuscitationConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Ward layout: which beds exist and in which order they are shown
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WardConfig {
    #[serde(default = "default_beds")]
    pub beds: Vec<String>,
}

impl Default for WardConfig {
    fn default() -> Self {
        Self {
            beds: default_beds(),
        }
    }
}

/// Resuscitation timer parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResuscitationConfig {
    #[serde(default = "default_round_seconds")]
    pub round_seconds: u64,

    #[serde(default = "default_metronome_bpm")]
    pub metronome_bpm: u32,

    #[serde(default = "default_true")]
    pub metronome_enabled: bool,

    #[serde(default = "default_adrenaline_dose_mg")]
    pub adrenaline_dose_mg: f64,

    #[serde(default = "default_joules")]
    pub default_joules: u32,
}

impl Default for ResuscitationConfig {
    fn default() -> Self {
        Self {
            round_seconds: default_round_seconds(),
            metronome_bpm: default_metronome_bpm(),
            metronome_enabled: true,
            adrenaline_dose_mg: default_adrenaline_dose_mg(),
            default_joules: default_joules(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("bedside")
}

fn default_beds() -> Vec<String> {
    DEFAULT_BEDS.clone()
}

fn default_round_seconds() -> u64 {
    120
}

fn default_metronome_bpm() -> u32 {
    110
}

fn default_true() -> bool {
    true
}

fn default_adrenaline_dose_mg() -> f64 {
    1.0
}

fn default_joules() -> u32 {
    200
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("bedside").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Reject configurations the store and timer cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.ward.beds.is_empty() {
            return Err(Error::Config("ward.beds must list at least one bed".into()));
        }

        let mut seen = HashSet::new();
        for bed in &self.ward.beds {
            if bed.trim().is_empty() {
                return Err(Error::Config("ward.beds contains an empty bed id".into()));
            }
            if !seen.insert(bed.as_str()) {
                return Err(Error::Config(format!("duplicate bed id '{}'", bed)));
            }
        }

        if self.resuscitation.round_seconds == 0 {
            return Err(Error::Config(
                "resuscitation.round_seconds must be positive".into(),
            ));
        }
        if self.resuscitation.metronome_bpm == 0 {
            return Err(Error::Config(
                "resuscitation.metronome_bpm must be positive".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ward.beds.len(), 14);
        assert_eq!(config.ward.beds[0], "1-1");
        assert_eq!(config.ward.beds[13], "8");
        assert_eq!(config.resuscitation.round_seconds, 120);
        assert_eq!(config.resuscitation.metronome_bpm, 110);
        assert!(config.resuscitation.metronome_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.ward.beds, parsed.ward.beds);
        assert_eq!(
            config.resuscitation.default_joules,
            parsed.resuscitation.default_joules
        );
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[ward]
beds = ["A", "B"]
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.ward.beds, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(config.resuscitation.round_seconds, 120); // default
    }

    #[test]
    fn test_duplicate_beds_rejected() {
        let mut config = Config::default();
        config.ward.beds = vec!["1".into(), "2".into(), "1".into()];
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_tempo_rejected() {
        let mut config = Config::default();
        config.resuscitation.metronome_bpm = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[resuscitation]\nmetronome_enabled = false\ndefault_joules = 150\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(!config.resuscitation.metronome_enabled);
        assert_eq!(config.resuscitation.default_joules, 150);
        assert_eq!(config.ward.beds.len(), 14);
    }
}
