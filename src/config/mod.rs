//! Public API for configuration

pub mod loader;
pub mod model;

// Re-export the main entrypoints:
pub use loader::{build_policy, load_master_config, load_or_default};
pub use model::{ConfigError, LoggingConfig, MasterConfig, PolicyConfig, RunMode};
