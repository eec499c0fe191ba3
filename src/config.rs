// Application configuration
// TOML file in the platform config directory; every key is optional

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::models::settings::CalendarSettings;

const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "trips.db";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file; defaults to the platform data directory.
    pub database_path: Option<PathBuf>,
    pub calendar: CalendarSettings,
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "TripScheduler", "trip-scheduler")
}

impl AppConfig {
    /// `<config dir>/trip-scheduler/config.toml`, when the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Load from `path`, or from the default location when `None`.
    /// A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) => path,
                None => {
                    log::warn!("No config directory on this platform, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: AppConfig =
            toml::from_str(&raw).with_context(|| format!("Invalid config {}", path.display()))?;
        config
            .calendar
            .validate()
            .with_context(|| format!("Invalid [calendar] section in {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let raw = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, raw).with_context(|| format!("Failed to write config {}", path.display()))
    }

    /// Database location: the configured path, else the platform data
    /// directory (created if needed), else the working directory.
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }

        match project_dirs() {
            Some(dirs) => {
                let data_dir = dirs.data_dir();
                fs::create_dir_all(data_dir)
                    .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;
                Ok(data_dir.join(DATABASE_FILE))
            }
            None => Ok(PathBuf::from(DATABASE_FILE)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::settings::CalendarViewType;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "database_path = \"/tmp/trips.db\"\n\n[calendar]\nview = \"week\"\ntime_slot_duration = 15\n",
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/trips.db")));
        assert_eq!(config.calendar.view, CalendarViewType::Week);
        assert_eq!(config.calendar.time_slot_duration, 15);
        assert_eq!(config.calendar.start_hour, 8);
    }

    #[test]
    fn test_invalid_slot_duration_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[calendar]\ntime_slot_duration = 20\n").unwrap();

        let err = AppConfig::load(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("time_slot_duration"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = AppConfig::default();
        config.calendar.end_hour = 22;

        config.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_configured_database_path_wins() {
        let config = AppConfig {
            database_path: Some(PathBuf::from("custom.db")),
            ..AppConfig::default()
        };
        assert_eq!(config.database_path().unwrap(), PathBuf::from("custom.db"));
    }
}
