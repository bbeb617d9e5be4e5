use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::db::{BackendType, StoreConfig};

/// Environment variable naming the data file
pub const DB_PATH_ENV: &str = "REQTRACK_DB";

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "REQTRACK_CONFIG";

pub const DEFAULT_DB_FILE: &str = "database.csv";

/// User settings, read from `~/.reqtrack.yaml` when present
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the data file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// Give up waiting for the write lock after this many seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_timeout_secs: Option<u64>,
}

impl Config {
    /// Loads the config from the provided path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))
    }

    /// Loads the config, or returns defaults if the file does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the config to the specified path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(&self)?;

        // Ensure parent directories exist
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {:?}", path.as_ref()))?;

        Ok(())
    }

    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_secs.map(Duration::from_secs)
    }

    /// Builds the storage settings, resolving the data file path.
    /// A dry run reads the data file but keeps every change in memory.
    pub fn store_config(&self, cli_file: Option<&Path>, dry_run: bool) -> StoreConfig {
        StoreConfig {
            path: determine_database_path(cli_file, self),
            backend_type: if dry_run {
                BackendType::Memory
            } else {
                BackendType::Csv
            },
            lock_timeout: self.lock_timeout(),
        }
    }
}

/// Gets the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    if let Ok(path) = env::var(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }

    // Default to ~/.reqtrack.yaml
    let home_dir = dirs::home_dir().context("Failed to determine home directory")?;

    Ok(home_dir.join(".reqtrack.yaml"))
}

/// Determines the data file to use
///
/// Priority: command line, then `REQTRACK_DB`, then the config file, then
/// `database.csv` in the current directory.
pub fn determine_database_path(cli_file: Option<&Path>, config: &Config) -> PathBuf {
    resolve_database_path(cli_file, env::var(DB_PATH_ENV).ok(), config)
}

fn resolve_database_path(
    cli_file: Option<&Path>,
    env_value: Option<String>,
    config: &Config,
) -> PathBuf {
    if let Some(path) = cli_file {
        return path.to_path_buf();
    }
    if let Some(path) = env_value.filter(|v| !v.trim().is_empty()) {
        return PathBuf::from(path);
    }
    if let Some(path) = &config.database_path {
        return path.clone();
    }
    PathBuf::from(DEFAULT_DB_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_path_precedence() {
        let config = Config {
            database_path: Some(PathBuf::from("/srv/requests.csv")),
            lock_timeout_secs: None,
        };
        let cli = Path::new("cli.csv");

        assert_eq!(
            resolve_database_path(Some(cli), Some("env.csv".to_string()), &config),
            PathBuf::from("cli.csv")
        );
        assert_eq!(
            resolve_database_path(None, Some("env.csv".to_string()), &config),
            PathBuf::from("env.csv")
        );
        assert_eq!(
            resolve_database_path(None, Some("  ".to_string()), &config),
            PathBuf::from("/srv/requests.csv")
        );
        assert_eq!(
            resolve_database_path(None, None, &Config::default()),
            PathBuf::from(DEFAULT_DB_FILE)
        );
    }

    #[test]
    fn test_dry_run_selects_memory_store() {
        let config = Config {
            database_path: None,
            lock_timeout_secs: Some(3),
        };
        let cli = Path::new("cli.csv");

        let live = config.store_config(Some(cli), false);
        assert_eq!(live.backend_type, BackendType::Csv);
        assert_eq!(live.path, PathBuf::from("cli.csv"));

        let dry = config.store_config(Some(cli), true);
        assert_eq!(dry.backend_type, BackendType::Memory);
        assert_eq!(dry.path, PathBuf::from("cli.csv"));
        assert_eq!(dry.lock_timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("conf").join("reqtrack.yaml");

        let config = Config {
            database_path: Some(PathBuf::from("shared/database.csv")),
            lock_timeout_secs: Some(5),
        };
        config.save(&path)?;

        let loaded = Config::load(&path)?;
        assert_eq!(loaded, config);
        assert_eq!(loaded.lock_timeout(), Some(Duration::from_secs(5)));

        Ok(())
    }

    #[test]
    fn test_missing_file_gives_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = Config::load_or_default(dir.path().join("absent.yaml"))?;
        assert_eq!(config, Config::default());
        assert!(config.lock_timeout().is_none());
        Ok(())
    }

    #[test]
    fn test_partial_file_parses() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("reqtrack.yaml");
        fs::write(&path, "lock_timeout_secs: 10\n")?;

        let config = Config::load(&path)?;
        assert_eq!(config.lock_timeout_secs, Some(10));
        assert!(config.database_path.is_none());
        Ok(())
    }
}
