// src/main.rs

//! Console entry-point.
//!
//! 1. Parse configuration & set up structured logging
//! 2. Build the remediation policy
//! 3. Check elevation, enumerate services and secure their paths
//! 4. Exit non-zero on a fatal error

// ───── std / 3rd-party imports ──────────────────────────────────────────────
use anyhow::Context;
use chrono::Local;
use fern::Dispatch;
use log::LevelFilter;
use std::{
    path::{Path, PathBuf},
    process, thread,
};

// ───── local imports ────────────────────────────────────────────────────────
use svcguard::config::{build_policy, load_or_default, MasterConfig};

// ───── helpers ──────────────────────────────────────────────────────────────

/// Print an error with context and terminate the process.
macro_rules! fatal {
    ($ctx:expr, $($arg:tt)+) => {{
        eprintln!(
            "[{}][ERROR][{}] {}",
            chrono::Local::now().to_rfc3339(),
            $ctx,
            format!($($arg)+)
        );
        std::process::exit(1);
    }};
}

/// Directory that contains the running executable.
fn exe_dir() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot determine exe path")?;
    exe.parent()
        .map(Path::to_path_buf)
        .context("executable must live in some directory")
}

/// Config path: first argument, else `default.toml` next to the executable.
fn config_path(exe_dir: &Path) -> PathBuf {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| exe_dir.join("default.toml"))
}

/// Configure global logging as requested in `master.logging`.
fn setup_logging(exe_dir: &Path, master: &MasterConfig) -> Result<(), fern::InitError> {
    let level = match master.logging.level.to_uppercase().as_str() {
        "ERROR" => LevelFilter::Error,
        "WARN" => LevelFilter::Warn,
        "DEBUG" => LevelFilter::Debug,
        "TRACE" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    let log_path = master
        .logging
        .enable
        .then(|| exe_dir.join(master.logging.file.as_deref().unwrap_or("svcguard.log")));

    let mut dispatch = Dispatch::new()
        .format(|out, msg, record| {
            // Lines from `svcguard_log!` already carry the full prefix.
            if msg.to_string().starts_with('[') {
                out.finish(format_args!("{}", msg))
            } else {
                out.finish(format_args!(
                    "[{}][{:5}][{}][pid={}][tid={:?}] {}",
                    Local::now().to_rfc3339(),
                    record.level(),
                    record.target(),
                    process::id(),
                    thread::current().id(),
                    msg
                ))
            }
        })
        .level(level)
        .chain(std::io::stdout());

    if let Some(path) = log_path {
        dispatch = dispatch.chain(fern::log_file(path)?);
    }

    dispatch.apply()?;
    Ok(())
}

// ───── run ──────────────────────────────────────────────────────────────────

#[cfg(windows)]
fn run(master: &MasterConfig) -> anyhow::Result<bool> {
    use svcguard::win32::{FileAclStore, ScmServiceLister, TokenElevation};
    use svcguard::{run_hardening, HardenError};

    let domain = std::env::var("USERDOMAIN").ok();
    let policy = build_policy(&master.policy, domain.as_deref()).context("invalid [policy] table")?;
    let store = FileAclStore::new();

    match run_hardening(&TokenElevation, &ScmServiceLister, &store, &policy, master.policy.mode) {
        Ok(summary) => Ok(summary.reports.iter().all(|r| r.failures.is_empty())),
        Err(HardenError::NotElevated) => {
            log::error!("Run this tool from an elevated (administrator) prompt");
            Err(HardenError::NotElevated.into())
        }
        Err(e) => {
            if let Some(item) = e.item() {
                log::error!("Failed on: {}", item);
            }
            Err(e.into())
        }
    }
}

#[cfg(not(windows))]
fn run(master: &MasterConfig) -> anyhow::Result<bool> {
    // Validate the policy so config mistakes still surface off-platform.
    build_policy(&master.policy, None).context("invalid [policy] table")?;
    anyhow::bail!("service permissions can only be inspected on Windows")
}

fn main() {
    // 1 ─ Context
    let exe_dir = exe_dir().unwrap_or_else(|e| fatal!("main", "{:#}", e));
    let cfg_path = config_path(&exe_dir);
    let master = load_or_default(&cfg_path).unwrap_or_else(|e| fatal!("config", "{}", e));

    // 2 ─ Logging
    setup_logging(&exe_dir, &master).unwrap_or_else(|e| fatal!("logging", "{}", e));
    log::info!("svcguard {} starting (mode={:?})", env!("CARGO_PKG_VERSION"), master.policy.mode);

    // 3 ─ Run
    match run(&master) {
        Ok(true) => {}
        Ok(false) => {
            log::warn!("Finished with correction failures");
            process::exit(2);
        }
        Err(e) => fatal!("main", "{:#}", e),
    }
}
