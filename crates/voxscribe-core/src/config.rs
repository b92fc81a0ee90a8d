use std::fmt;
use std::path::Path;
use std::str::FromStr;

use regex::Regex;
use serde::Deserialize;

use crate::error::ConfigError;

/// Numeric precision the backend loads its weights in. Exactly two values
/// are supported; anything else is a configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Float16,
    Bfloat16,
}

impl Default for Precision {
    fn default() -> Self {
        Precision::Float16
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precision::Float16 => write!(f, "float16"),
            Precision::Bfloat16 => write!(f, "bfloat16"),
        }
    }
}

impl FromStr for Precision {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "float16" => Ok(Precision::Float16),
            "bfloat16" => Ok(Precision::Bfloat16),
            other => Err(ConfigError::UnsupportedPrecision(other.to_string())),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    #[serde(default = "default_model_id")]
    pub model_id: String,

    #[serde(default)]
    pub precision: Precision,

    /// The single accelerated-device identifier this process requires.
    /// Requests naming any other device are rejected outright.
    #[serde(default = "default_device")]
    pub device: String,

    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Recordings longer than this many seconds are split into bounded
    /// segments and transcribed as one batch.
    #[serde(default = "default_chunk_sec")]
    pub chunk_sec: f64,

    #[serde(default = "default_engine")]
    pub engine: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub protocol_only: bool,

    #[serde(default)]
    pub announce_ready: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            precision: Precision::default(),
            device: default_device(),
            max_batch_size: default_max_batch_size(),
            chunk_sec: default_chunk_sec(),
            engine: default_engine(),
            log_level: default_log_level(),
            protocol_only: false,
            announce_ready: false,
        }
    }
}

fn default_model_id() -> String {
    "models/ggml-base.bin".to_string()
}

fn default_device() -> String {
    "cuda".to_string()
}

fn default_max_batch_size() -> usize {
    8
}

fn default_chunk_sec() -> f64 {
    60.0
}

fn default_engine() -> String {
    "whisper".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Interpolate `${VAR}` patterns with environment variable values.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([^}]+)\}").unwrap();
    let mut result = input.to_string();
    let mut missing = Vec::new();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => {
                result = result.replace(&cap[0], &val);
            }
            Err(_) => {
                missing.push(var_name.to_string());
            }
        }
    }

    if let Some(first_missing) = missing.into_iter().next() {
        return Err(ConfigError::EnvVarNotFound(first_missing));
    }

    Ok(result)
}

impl WorkerConfig {
    /// Load configuration from a TOML file, with environment variable interpolation.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let interpolated = interpolate_env_vars(&content)?;
        let config: WorkerConfig = toml::from_str(&interpolated)?;
        Ok(config)
    }

    /// Parse configuration from a TOML string (for testing).
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let interpolated = interpolate_env_vars(s)?;
        let config: WorkerConfig = toml::from_str(&interpolated)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_values() {
        let config = WorkerConfig::from_toml_str("").unwrap();
        assert_eq!(config.model_id, "models/ggml-base.bin");
        assert_eq!(config.precision, Precision::Float16);
        assert_eq!(config.device, "cuda");
        assert_eq!(config.max_batch_size, 8);
        assert_eq!(config.chunk_sec, 60.0);
        assert_eq!(config.engine, "whisper");
        assert_eq!(config.log_level, "info");
        assert!(!config.protocol_only);
        assert!(!config.announce_ready);
    }

    #[test]
    fn test_config_parse_valid_toml() {
        let toml_str = r#"
model_id = "models/custom"
precision = "bfloat16"
device = "cuda"
max_batch_size = 4
chunk_sec = 30.0
engine = "null"
log_level = "debug"
protocol_only = true
announce_ready = true
"#;
        let config = WorkerConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.model_id, "models/custom");
        assert_eq!(config.precision, Precision::Bfloat16);
        assert_eq!(config.max_batch_size, 4);
        assert_eq!(config.chunk_sec, 30.0);
        assert_eq!(config.engine, "null");
        assert_eq!(config.log_level, "debug");
        assert!(config.protocol_only);
        assert!(config.announce_ready);
    }

    #[test]
    fn test_config_rejects_unknown_precision() {
        let result = WorkerConfig::from_toml_str(r#"precision = "float32""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_precision_from_str() {
        assert_eq!(Precision::from_str("float16").unwrap(), Precision::Float16);
        assert_eq!(
            Precision::from_str("bfloat16").unwrap(),
            Precision::Bfloat16,
        );
        let err = Precision::from_str("int8").unwrap_err();
        assert!(err.to_string().contains("int8"));
    }

    #[test]
    fn test_precision_display_round_trips() {
        assert_eq!(Precision::Float16.to_string(), "float16");
        assert_eq!(Precision::Bfloat16.to_string(), "bfloat16");
    }

    #[test]
    fn test_config_env_var_interpolation() {
        std::env::set_var("VOXSCRIBE_TEST_MODEL", "models/from-env");
        let config = WorkerConfig::from_toml_str(r#"model_id = "${VOXSCRIBE_TEST_MODEL}""#)
            .unwrap();
        assert_eq!(config.model_id, "models/from-env");
        std::env::remove_var("VOXSCRIBE_TEST_MODEL");
    }

    #[test]
    fn test_config_missing_env_var_error() {
        let result =
            WorkerConfig::from_toml_str(r#"model_id = "${DEFINITELY_DOES_NOT_EXIST_54321}""#);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("DEFINITELY_DOES_NOT_EXIST_54321"),
        );
    }

    #[test]
    fn test_config_invalid_toml_error() {
        let result = WorkerConfig::from_toml_str("this is not valid toml [[[");
        assert!(result.is_err());
    }

    #[test]
    fn test_config_load_from_file_not_found() {
        let result = WorkerConfig::load_from_file(Path::new("/nonexistent/path.toml"));
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("failed to read config file"),
        );
    }
}
