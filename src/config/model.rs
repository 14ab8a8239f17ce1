// src/config/model.rs

use serde::Deserialize;
use thiserror::Error;

/// Top-level config as deserialized from TOML.
#[derive(Debug, Default, Deserialize)]
pub struct MasterConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
}

/// Mirror of the `[logging]` table
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]                   pub enable: bool,
    #[serde(default)]                   pub file:   Option<String>,
    #[serde(default = "default_level")] pub level:  String,
}
fn default_level() -> String { "INFO".into() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { enable: false, file: None, level: default_level() }
    }
}

/// Whether insecure entries are fixed or only reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Remediate,
    Audit,
}

/// Mirror of the `[policy]` table. Empty lists mean "use the built-in set".
#[derive(Debug, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]                  pub mode:                 RunMode,
    #[serde(default)]                  pub flagged_identities:   Vec<String>,
    #[serde(default = "default_true")] pub include_domain_users: bool,
    #[serde(default)]                  pub flagged_rights:       Vec<String>,
    #[serde(default)]                  pub general_users:        Vec<String>,
    #[serde(default)]                  pub system_paths:         Vec<String>,
}
fn default_true() -> bool { true }

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::default(),
            flagged_identities: Vec::new(),
            include_domain_users: true,
            flagged_rights: Vec::new(),
            general_users: Vec::new(),
            system_paths: Vec::new(),
        }
    }
}

/// All the ways config loading can go wrong
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid right '{0}' (expected FullControl, Modify or Write)")]
    InvalidRight(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
