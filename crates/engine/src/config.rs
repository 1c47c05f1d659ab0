use payee_rules_core::{Rule, RuleId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

use crate::pattern::{RegexLimits, DEFAULT_REGEX_BUDGET};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Duplicate rule id: {0}")]
    DuplicateRuleId(RuleId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Wall-clock budget for one regex evaluation, in milliseconds.
    pub regex_budget_ms: u64,
    /// Compiled program size limit per regex, in bytes.
    pub regex_size_limit: usize,
    /// Lazy DFA cache limit per regex, in bytes.
    pub regex_dfa_size_limit: usize,
    /// Transactions per worker task in a parallel batch.
    pub batch_chunk_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let limits = RegexLimits::default();
        Self {
            regex_budget_ms: DEFAULT_REGEX_BUDGET.as_millis() as u64,
            regex_size_limit: limits.size_limit,
            regex_dfa_size_limit: limits.dfa_size_limit,
            batch_chunk_size: 256,
        }
    }
}

impl EngineConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(toml_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.regex_budget_ms == 0 {
            return Err(ConfigError::Invalid(
                "regex_budget_ms must be greater than zero".to_string(),
            ));
        }
        if self.regex_size_limit == 0 || self.regex_dfa_size_limit == 0 {
            return Err(ConfigError::Invalid(
                "regex size limits must be greater than zero".to_string(),
            ));
        }
        if self.batch_chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "batch_chunk_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn regex_budget(&self) -> Duration {
        Duration::from_millis(self.regex_budget_ms)
    }

    pub fn regex_limits(&self) -> RegexLimits {
        RegexLimits {
            size_limit: self.regex_size_limit,
            dfa_size_limit: self.regex_dfa_size_limit,
        }
    }
}

/// One tenant's rules as loaded from a `[[rules]]` TOML document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl RuleSet {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let set: RuleSet = toml::from_str(toml_content)?;
        let mut seen = HashSet::new();
        for rule in &set.rules {
            if !seen.insert(&rule.id) {
                return Err(ConfigError::DuplicateRuleId(rule.id.clone()));
            }
        }
        Ok(set)
    }
}
