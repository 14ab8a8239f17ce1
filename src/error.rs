// src/error.rs

//! Error taxonomy.
//!
//! Fatal errors (`HardenError`) end the run. `CorrectionError`s are recorded
//! on the path report they belong to and never travel further up.

use crate::acl::NamedRight;
use thiserror::Error;

/// Failure of an ACL collaborator call.
#[derive(Debug, Error)]
pub enum AclError {
    #[error("path not found")]
    NotFound,

    #[error("{api} failed with Win32 error {code}")]
    Os { api: &'static str, code: u32 },

    #[error("malformed ACL: {0}")]
    Malformed(String),

    #[error("{0}")]
    Message(String),
}

/// The service list could not be obtained.
#[derive(Debug, Error)]
pub enum EnumerationError {
    #[error("the service manager returned no services")]
    Empty,

    #[error("service listing failed: {0}")]
    Lister(String),
}

/// Errors that abort the whole run.
#[derive(Debug, Error)]
pub enum HardenError {
    #[error("administrative privileges are required")]
    NotElevated,

    #[error(transparent)]
    Enumeration(#[from] EnumerationError),

    #[error("cannot read ACL of {path} (service {service}): {source}")]
    AclRead {
        service: String,
        path: String,
        #[source]
        source: AclError,
    },
}

impl HardenError {
    /// Identifier of the item the error is about, if any.
    pub fn item(&self) -> Option<&str> {
        match self {
            HardenError::AclRead { path, .. } => Some(path),
            HardenError::NotElevated | HardenError::Enumeration(_) => None,
        }
    }
}

/// Recoverable failures, one per attempted correction.
#[derive(Debug, Error)]
pub enum CorrectionError {
    #[error("could not convert inherited permissions on {path}: {source}")]
    InheritanceConversion {
        path: String,
        #[source]
        source: AclError,
    },

    #[error("could not correct {right} for {identity} on {path}: {source}")]
    RemediationApply {
        path: String,
        identity: String,
        right: NamedRight,
        #[source]
        source: AclError,
    },

    #[error("{right} for {identity} on {path} is inherited and inheritance could not be broken")]
    InheritedEntryKept {
        path: String,
        identity: String,
        right: NamedRight,
    },
}

pub type Result<T> = std::result::Result<T, HardenError>;
