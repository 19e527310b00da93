//! Engine configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via AUTOMATON_CONFIG or `from_file`)
//! 3. Environment variables

use crate::identity::{IdStrategy, IdentityConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What happens to a consumed node's payload when its transition fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadPolicy {
    /// Apply the guard operation to the payload.
    #[default]
    Apply,
    /// Only compare the guard operation; payloads are left as they are.
    MatchOnly,
}

impl std::str::FromStr for PayloadPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "apply" => Ok(PayloadPolicy::Apply),
            "match_only" | "match-only" => Ok(PayloadPolicy::MatchOnly),
            other => Err(format!("unknown payload policy '{}'", other)),
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Identity generation.
    pub identity: IdentityConfig,
    /// Payload handling on transition.
    pub payload_policy: PayloadPolicy,
    /// Retry bound for transitions that declare none.
    pub default_max_retry: Option<u32>,
    /// `create_runtime` without a start type seeds every entry node of a forest.
    pub seed_all_entries: bool,
}

impl EngineConfig {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("AUTOMATON_CONFIG") {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: EngineConfig = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Loads configuration from environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Returns a config using sequential identities with `prefix`.
    pub fn sequential(prefix: impl Into<String>) -> Self {
        Self {
            identity: IdentityConfig {
                strategy: IdStrategy::Sequential,
                prefix: prefix.into(),
            },
            ..Self::default()
        }
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from a variable lookup. Unparseable values are
    /// ignored with a warning.
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(strategy) = var("AUTOMATON_ID_STRATEGY") {
            match strategy.parse() {
                Ok(s) => self.identity.strategy = s,
                Err(e) => tracing::warn!("ignoring AUTOMATON_ID_STRATEGY: {}", e),
            }
        }

        if let Some(prefix) = var("AUTOMATON_ID_PREFIX") {
            self.identity.prefix = prefix;
        }

        if let Some(policy) = var("AUTOMATON_PAYLOAD_POLICY") {
            match policy.parse() {
                Ok(p) => self.payload_policy = p,
                Err(e) => tracing::warn!("ignoring AUTOMATON_PAYLOAD_POLICY: {}", e),
            }
        }

        if let Some(retry) = var("AUTOMATON_DEFAULT_MAX_RETRY") {
            if retry.is_empty() || retry.eq_ignore_ascii_case("none") {
                self.default_max_retry = None;
            } else if let Ok(n) = retry.parse() {
                self.default_max_retry = Some(n);
            } else {
                tracing::warn!("ignoring AUTOMATON_DEFAULT_MAX_RETRY: '{}'", retry);
            }
        }

        if let Some(seed) = var("AUTOMATON_SEED_ALL_ENTRIES") {
            self.seed_all_entries = seed == "1" || seed.eq_ignore_ascii_case("true");
        }
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError(_, e) => Some(e),
            ConfigError::ParseError(_, _) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.identity.strategy, IdStrategy::Uuid);
        assert_eq!(config.identity.prefix, "node-");
        assert_eq!(config.payload_policy, PayloadPolicy::Apply);
        assert_eq!(config.default_max_retry, None);
        assert!(!config.seed_all_entries);
    }

    #[test]
    fn test_overrides() {
        let mut config = EngineConfig::default();
        config.apply_overrides(lookup(&[
            ("AUTOMATON_ID_STRATEGY", "sequential"),
            ("AUTOMATON_ID_PREFIX", "job-"),
            ("AUTOMATON_PAYLOAD_POLICY", "match_only"),
            ("AUTOMATON_DEFAULT_MAX_RETRY", "5"),
            ("AUTOMATON_SEED_ALL_ENTRIES", "true"),
        ]));

        assert_eq!(config.identity.strategy, IdStrategy::Sequential);
        assert_eq!(config.identity.prefix, "job-");
        assert_eq!(config.payload_policy, PayloadPolicy::MatchOnly);
        assert_eq!(config.default_max_retry, Some(5));
        assert!(config.seed_all_entries);
    }

    #[test]
    fn test_invalid_overrides_are_ignored() {
        let mut config = EngineConfig::default();
        config.apply_overrides(lookup(&[
            ("AUTOMATON_ID_STRATEGY", "random"),
            ("AUTOMATON_DEFAULT_MAX_RETRY", "lots"),
        ]));
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_yaml_file_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("automaton.yaml");

        let config = EngineConfig {
            default_max_retry: Some(2),
            ..EngineConfig::sequential("n-")
        };
        config.save(&path).unwrap();

        let loaded = EngineConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("automaton.yaml");
        std::fs::write(&path, "payload_policy: match_only\n").unwrap();

        let loaded = EngineConfig::from_file(&path).unwrap();
        assert_eq!(loaded.payload_policy, PayloadPolicy::MatchOnly);
        assert_eq!(loaded.identity, IdentityConfig::default());
    }

    #[test]
    fn test_missing_file() {
        let result = EngineConfig::from_file("/nonexistent/automaton.yaml");
        assert!(matches!(result, Err(ConfigError::IoError(..))));
    }
}
