//! Configuration loading and typed config structures for orgsim.
//!
//! The configuration lives in `orgsim-config.yaml`. Every section and
//! field has a default, so an empty (or missing) file yields a working
//! setup. Two environment variables override the file:
//!
//! - `ORGSIM_RESULTS_DIR` overrides `simulation.results_dir`
//! - `ORGSIM_LOG_LEVEL` overrides `logging.level`

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "orgsim-config.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OrgsimConfig {
    /// Run defaults and result storage.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Sweep worker pool.
    #[serde(default)]
    pub sweep: SweepConfig,

    /// Logging output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl OrgsimConfig {
    /// Load configuration from a YAML file, then apply env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load `path` if it exists, otherwise start from defaults. Env
    /// overrides apply either way.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_file`] when the file exists.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string. No env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply `ORGSIM_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("ORGSIM_RESULTS_DIR") {
            self.simulation.results_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup("ORGSIM_LOG_LEVEL") {
            self.logging.level = level;
        }
    }
}

/// Run defaults and result storage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// Steps per run when the caller does not say.
    #[serde(default = "default_steps")]
    pub default_steps: u64,

    /// Root directory of the file result store.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            default_steps: default_steps(),
            results_dir: default_results_dir(),
        }
    }
}

/// Sweep worker pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SweepConfig {
    /// Concurrent grid points. `0` means available parallelism.
    #[serde(default)]
    pub max_workers: usize,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

const fn default_steps() -> u64 {
    100
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("simulation_results")
}

fn default_log_level() -> String {
    "info".to_owned()
}
