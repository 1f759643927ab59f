//! Run configuration
//!
//! Layered lowest to highest: built-in defaults, an optional TOML file,
//! `LOGSCAN_*` environment variables, command-line flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use logscan_ingest::{DEFAULT_SHUTDOWN_TIMEOUT, IngestConfig};

use crate::report::OutputFormat;

/// Env var naming a config file when `--config` is not given
pub const CONFIG_PATH_ENV: &str = "LOGSCAN_CONFIG";

const DEFAULT_TOP_K: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Worker pool size; derived from host parallelism when unset
    pub workers: Option<usize>,

    /// Length of the source and message rankings
    pub top_k: usize,

    /// Per-file read budget in seconds
    pub file_timeout_secs: Option<u64>,

    /// Upper bound on waiting for the pool to drain, in seconds
    pub shutdown_timeout_secs: u64,

    pub format: OutputFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workers: None,
            top_k: DEFAULT_TOP_K,
            file_timeout_secs: None,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT.as_secs(),
            format: OutputFormat::Text,
        }
    }
}

impl AppConfig {
    /// Defaults, overlaid with the config file if one was named
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        match path {
            Some(path) => {
                tracing::info!(path = %path.display(), "loading configuration");
                Self::from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Apply `LOGSCAN_*` overrides; `lookup` is normally `std::env::var`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("LOGSCAN_WORKERS") {
            self.workers = Some(parse_env("LOGSCAN_WORKERS", &v)?);
        }
        if let Some(v) = lookup("LOGSCAN_TOP_K") {
            self.top_k = parse_env("LOGSCAN_TOP_K", &v)?;
        }
        if let Some(v) = lookup("LOGSCAN_FILE_TIMEOUT_SECS") {
            self.file_timeout_secs = Some(parse_env("LOGSCAN_FILE_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = lookup("LOGSCAN_SHUTDOWN_TIMEOUT_SECS") {
            self.shutdown_timeout_secs = parse_env("LOGSCAN_SHUTDOWN_TIMEOUT_SECS", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            bail!("top_k must be at least 1");
        }
        if self.workers == Some(0) {
            bail!("workers must be at least 1");
        }
        if self.file_timeout_secs == Some(0) {
            bail!("file_timeout_secs must be greater than zero");
        }
        if self.shutdown_timeout_secs == 0 {
            bail!("shutdown_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    /// Settings handed to the ingest engine
    pub fn ingest_config(&self) -> IngestConfig {
        let mut config = IngestConfig::default()
            .with_shutdown_timeout(Duration::from_secs(self.shutdown_timeout_secs));
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(secs) = self.file_timeout_secs {
            config = config.with_file_timeout(Duration::from_secs(secs));
        }
        config
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("invalid value for {key}: {value:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.top_k, 10);
        assert!(config.validate().is_ok());
        assert_eq!(
            config.ingest_config().shutdown_timeout,
            DEFAULT_SHUTDOWN_TIMEOUT
        );
        assert!(config.ingest_config().file_timeout.is_none());
    }

    #[test]
    fn test_from_file_partial_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logscan.toml");
        fs::write(&path, "workers = 3\ntop_k = 5\nformat = \"json\"\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.workers, Some(3));
        assert_eq!(config.top_k, 5);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.shutdown_timeout_secs, 60);
        assert_eq!(config.ingest_config().workers, 3);
    }

    #[test]
    fn test_from_file_rejects_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logscan.toml");
        fs::write(&path, "wrokers = 3\n").unwrap();
        assert!(AppConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("LOGSCAN_WORKERS", "6"),
                ("LOGSCAN_TOP_K", " 25 "),
                ("LOGSCAN_FILE_TIMEOUT_SECS", "30"),
            ]))
            .unwrap();

        assert_eq!(config.workers, Some(6));
        assert_eq!(config.top_k, 25);
        assert_eq!(
            config.ingest_config().file_timeout,
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(env(&[("LOGSCAN_WORKERS", "many")]))
            .unwrap_err();
        assert!(format!("{err:#}").contains("LOGSCAN_WORKERS"));
    }

    #[test]
    fn test_validate_rejects_zero() {
        let config = AppConfig {
            top_k: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            workers: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
