use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::calibration_history::MAX_CALIBRATION_ENTRIES;
use crate::errors::{GuardError, GuardResult};
use crate::runtime_config::RuntimeConfig;

pub const DEFAULT_CONFIG_FILE: &str = "reliance_guard.toml";
pub const ENV_PREFIX: &str = "RELIANCE_GUARD_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardConfig {
    pub data_dir: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub trust: TrustConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustConfig {
    #[serde(default = "default_calibration_capacity")]
    pub calibration_capacity: usize,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_calibration_capacity() -> usize {
    MAX_CALIBRATION_ENTRIES
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("reliance_guard"))
        .unwrap_or_else(|| PathBuf::from("reliance_guard_data"))
}

impl Default for TrustConfig {
    fn default() -> Self {
        TrustConfig {
            calibration_capacity: default_calibration_capacity(),
        }
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        GuardConfig {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            runtime: RuntimeConfig::default(),
            trust: TrustConfig::default(),
        }
    }
}

impl GuardConfig {
    pub fn validate(&self) -> GuardResult<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(GuardError::config("data_dir must be set"));
        }
        if self.trust.calibration_capacity == 0 {
            return Err(GuardError::validation(
                "trust.calibration_capacity",
                "must be at least 1",
            ));
        }
        if self.runtime.default_intervention.trim().is_empty() {
            return Err(GuardError::validation(
                "runtime.default_intervention",
                "must not be empty",
            ));
        }
        Ok(())
    }

    /// Calibration ring capacity, capped at the ring's hard limit.
    pub fn calibration_capacity(&self) -> usize {
        self.trust.calibration_capacity.min(MAX_CALIBRATION_ENTRIES)
    }

    pub fn to_toml(&self) -> GuardResult<String> {
        toml::to_string_pretty(self).map_err(|e| GuardError::internal(format!("failed to render config: {e}")))
    }
}

/// Layered configuration: built-in defaults, then the TOML file, then
/// `RELIANCE_GUARD_*` environment variables (`__` separates nested keys).
pub fn figment(path: Option<&Path>) -> Figment {
    let file = path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    Figment::from(Serialized::defaults(GuardConfig::default()))
        .merge(Toml::file(file))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

pub fn load_config(path: Option<&Path>) -> GuardResult<GuardConfig> {
    let config: GuardConfig = figment(path).extract()?;
    config.validate()?;
    Ok(config)
}
