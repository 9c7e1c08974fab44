use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Scope selector that applies a rule to every bucket.
pub const WILDCARD_SCOPE: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRule {
    #[serde(alias = "scope")]
    pub bucket: String,
    pub pattern: String,
    pub template: String,
    #[serde(default)]
    pub priority: i64,
}

impl RewriteRule {
    pub fn applies_to(&self, bucket: &str) -> bool {
        self.bucket == WILDCARD_SCOPE || self.bucket == bucket
    }
}

/// The rule-set document, `{"rules": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteConfig {
    #[serde(default)]
    pub rules: Vec<RewriteRule>,
}

#[derive(Debug, thiserror::Error)]
pub enum RuleConfigError {
    #[error("path rewrite configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read path rewrite configuration file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse path rewrite configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid path rewrite configuration: rule {index}: {reason}")]
    Invalid { index: usize, reason: &'static str },
}

impl RewriteConfig {
    /// Read, parse and validate a rule document. Any invalid rule fails the
    /// whole load.
    pub fn load(path: &Path) -> Result<Self, RuleConfigError> {
        if !path.exists() {
            return Err(RuleConfigError::NotFound(path.to_path_buf()));
        }
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &[u8]) -> Result<Self, RuleConfigError> {
        let config: RewriteConfig = serde_json::from_slice(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RuleConfigError> {
        for (index, rule) in self.rules.iter().enumerate() {
            let reason = if rule.bucket.is_empty() {
                "bucket name cannot be empty"
            } else if rule.pattern.is_empty() {
                "pattern cannot be empty"
            } else if rule.template.is_empty() {
                "template cannot be empty"
            } else if rule.priority < 0 {
                "priority cannot be negative"
            } else {
                continue;
            };
            return Err(RuleConfigError::Invalid { index, reason });
        }
        Ok(())
    }
}
