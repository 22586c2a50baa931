// Runtime configuration types for the reliance guard
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Whether scheduling decisions reach the UI.
///
/// `Shadow` computes and logs every decision but always answers
/// `display = false`, so thresholds can be observed before they are enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementMode {
    #[default]
    Shadow,
    Active,
}

impl EnforcementMode {
    pub fn is_displaying(&self) -> bool {
        matches!(self, EnforcementMode::Active)
    }
}

impl FromStr for EnforcementMode {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_lowercase().as_str() {
            "shadow" => Ok(EnforcementMode::Shadow),
            "active" => Ok(EnforcementMode::Active),
            other => Err(format!("unknown enforcement mode '{other}'")),
        }
    }
}

impl fmt::Display for EnforcementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnforcementMode::Shadow => f.write_str("shadow"),
            EnforcementMode::Active => f.write_str("active"),
        }
    }
}

fn default_intervention() -> String {
    "verification-prompt".to_string()
}

/// Runtime configuration for the guard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub enforcement_mode: EnforcementMode,
    #[serde(default)]
    pub telemetry_enabled: bool,
    /// Attach rule explanations to decision events.
    #[serde(default)]
    pub explanation_enabled: bool,
    /// JSONL file receiving decision events; stdout when unset and telemetry is on.
    #[serde(default)]
    pub decision_log: Option<PathBuf>,
    #[serde(default = "default_intervention")]
    pub default_intervention: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            enforcement_mode: EnforcementMode::Shadow,
            telemetry_enabled: true,
            explanation_enabled: true,
            decision_log: None,
            default_intervention: default_intervention(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadow_is_the_safe_default() {
        let config = RuntimeConfig::default();
        assert_eq!(config.enforcement_mode, EnforcementMode::Shadow);
        assert!(!config.enforcement_mode.is_displaying());
        assert!(EnforcementMode::Active.is_displaying());
    }

    #[test]
    fn modes_parse() {
        assert_eq!("ACTIVE".parse::<EnforcementMode>().unwrap(), EnforcementMode::Active);
        assert!("strict".parse::<EnforcementMode>().is_err());
    }
}
