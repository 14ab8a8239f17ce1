// src/config/loader.rs

//! # Configuration Loader
//!
//! Reads `default.toml`, deserializes into `MasterConfig`, and converts the
//! raw `[policy]` table into a runtime `Policy`.

use crate::config::model::{ConfigError, MasterConfig, PolicyConfig};
use crate::policy::{FlaggedRight, Policy};
use crate::svcguard_log;
use log::Level;
use std::{fs, io::ErrorKind, path::Path};

/// Defaults compiled into the binary; used when no config file exists.
pub const EMBEDDED_DEFAULTS: &str = include_str!("../../resources/default.toml");

/// Parse a TOML document.
pub fn parse_config(txt: &str) -> Result<MasterConfig, ConfigError> {
    Ok(toml::from_str(txt)?)
}

/// Load and parse the master configuration from `path`.
pub fn load_master_config(path: &Path) -> Result<MasterConfig, ConfigError> {
    svcguard_log!(Level::Debug, "config", "Reading config from {:?}", path);
    let txt = fs::read_to_string(path)?;
    let cfg = parse_config(&txt)?;
    svcguard_log!(Level::Info, "config", "Loaded config from {:?}", path);
    Ok(cfg)
}

/// Like [`load_master_config`], but a missing file yields the embedded defaults.
pub fn load_or_default(path: &Path) -> Result<MasterConfig, ConfigError> {
    match load_master_config(path) {
        Err(ConfigError::Io(e)) if e.kind() == ErrorKind::NotFound => {
            svcguard_log!(Level::Info, "config", "No config at {:?}, using built-in defaults", path);
            parse_config(EMBEDDED_DEFAULTS)
        }
        other => other,
    }
}

/// Convert the `[policy]` table into a runtime `Policy`.
/// Empty lists fall back to the built-in sets.
pub fn build_policy(cfg: &PolicyConfig, user_domain: Option<&str>) -> Result<Policy, ConfigError> {
    let builtin = Policy::default();

    let identities = if cfg.flagged_identities.is_empty() {
        builtin.identities().to_vec()
    } else {
        cfg.flagged_identities.clone()
    };

    let rights = if cfg.flagged_rights.is_empty() {
        FlaggedRight::ALL.to_vec()
    } else {
        cfg.flagged_rights
            .iter()
            .map(|r| r.parse::<FlaggedRight>().map_err(|_| ConfigError::InvalidRight(r.clone())))
            .collect::<Result<Vec<_>, _>>()?
    };

    let general_users = if cfg.general_users.is_empty() {
        vec![
            crate::policy::BUILTIN_USERS.0.to_string(),
            crate::policy::BUILTIN_USERS.1.to_string(),
        ]
    } else {
        cfg.general_users.clone()
    };

    let system_paths = if cfg.system_paths.is_empty() {
        vec![
            crate::policy::SYSTEM_SERVICE_HOST.to_string(),
            crate::policy::SYSTEM_DIRECTORY.to_string(),
        ]
    } else {
        cfg.system_paths.clone()
    };

    let domain = user_domain.filter(|_| cfg.include_domain_users);
    svcguard_log!(
        Level::Debug,
        "config",
        "Policy: {} identities, {} rights, {} system paths, domain={:?}",
        identities.len() + usize::from(domain.is_some()),
        rights.len(),
        system_paths.len(),
        domain
    );
    Ok(Policy::new(identities, rights, general_users, system_paths, domain))
}
