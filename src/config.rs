use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::loader::DatasetKind;

pub const APP_NAME: &str = "rusty-dashboard";
/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "rusty-dashboard.toml";

/// Dashboard settings, read from TOML. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the SQLite files.
    pub data_dir: PathBuf,
    /// Seed for the synthetic sales data.
    pub seed: u64,
    pub sales_bins: usize,
    pub student_bins: usize,
    pub correlation_columns: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            seed: 42,
            sales_bins: 30,
            student_bins: 20,
            correlation_columns: vec!["grade".into(), "attendance".into(), "age".into()],
        }
    }
}

impl AppConfig {
    /// Load from `explicit` if given, else the first config file found in
    /// the working directory or the user config directory, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::discover() {
                Some(path) => Self::from_file(&path)?,
                None => {
                    log::debug!("no config file found, using defaults");
                    Self::default()
                }
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Some(local);
        }
        user_config_path().filter(|p| p.is_file())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;
        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file at {}: {e}", path.display()))?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sales_bins == 0 || self.student_bins == 0 {
            bail!("histogram bin counts must be greater than 0");
        }
        if self.correlation_columns.len() < 2 {
            bail!("correlation_columns needs at least two columns");
        }
        Ok(())
    }

    /// Command-line values take precedence over the file.
    pub fn apply_overrides(&mut self, data_dir: Option<PathBuf>, seed: Option<u64>) {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        if let Some(seed) = seed {
            self.seed = seed;
        }
    }

    pub fn store_path(&self, kind: DatasetKind) -> PathBuf {
        self.data_dir.join(kind.file_name())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("serializing config")
    }
}

/// `<config dir>/rusty-dashboard/config.toml`, when the platform has one.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "seed = 7\nstudent_bins = 12\n").unwrap();

        let config = AppConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.student_bins, 12);
        assert_eq!(config.sales_bins, 30);
        assert_eq!(config.correlation_columns.len(), 3);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "sales_bins = 0\n").unwrap();
        assert!(AppConfig::load(Some(path.as_path())).is_err());

        std::fs::write(&path, "seed = \"many\"\n").unwrap();
        let err = AppConfig::load(Some(path.as_path())).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load(Some(dir.path().join("absent.toml").as_path())).is_err());
    }

    #[test]
    fn overrides_and_store_paths() {
        let mut config = AppConfig::default();
        config.apply_overrides(Some(PathBuf::from("/data")), None);
        assert_eq!(config.seed, 42);
        assert_eq!(
            config.store_path(DatasetKind::Students),
            PathBuf::from("/data/students.db")
        );
    }

    #[test]
    fn serialized_defaults_parse_back() {
        let config = AppConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(toml::from_str::<AppConfig>(&text).unwrap(), config);
    }
}
