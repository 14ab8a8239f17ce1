// src/lib.rs
// ────────────────────────────────────────────────────────────────────────────
// Public library entry point.  Re-export everything for both `main.rs` and
// integration tests.

pub mod macros;

pub mod acl;
pub mod config;
pub mod corrector;
pub mod elevation;
pub mod enumerator;
pub mod error;
pub mod policy;
pub mod services;

#[cfg(windows)]
pub mod win32;

pub use enumerator::{run_hardening, RunSummary};
pub use error::{HardenError, Result};
