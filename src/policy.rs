// src/policy.rs

//! Remediation policy: which identity/right pairs are insecure and what to do
//! about them.
//!
//! The tables here are the whole policy. The corrector never compares a
//! principal or right name anywhere else.

use crate::acl::{AccessControlEntry, FileSystemRights, Identity, NamedRight};
use std::{fmt, str::FromStr};

/// Well-known broad principals, name and SID.
pub const EVERYONE: (&str, &str) = ("Everyone", "S-1-1-0");
pub const AUTHENTICATED_USERS: (&str, &str) = ("NT AUTHORITY\\Authenticated Users", "S-1-5-11");
pub const INTERACTIVE: (&str, &str) = ("NT AUTHORITY\\INTERACTIVE", "S-1-5-4");
pub const BUILTIN_USERS: (&str, &str) = ("BUILTIN\\Users", "S-1-5-32-545");

/// Account name of a domain's default user group.
pub const DOMAIN_USERS_GROUP: &str = "Domain Users";

/// Default system-service host and its directory.
pub const SYSTEM_SERVICE_HOST: &str = "C:\\Windows\\system32\\svchost.exe";
pub const SYSTEM_DIRECTORY: &str = "C:\\Windows\\system32";

/// What a narrowed entry grants. Allow entries are always paired with
/// `Synchronize` by the platform.
pub const NARROWED_RIGHTS: FileSystemRights =
    FileSystemRights::READ_AND_EXECUTE.union(FileSystemRights::SYNCHRONIZE);

/// Rights that make an entry write-capable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlaggedRight {
    FullControl,
    Modify,
    Write,
}

impl FlaggedRight {
    pub const ALL: [FlaggedRight; 3] = [FlaggedRight::FullControl, FlaggedRight::Modify, FlaggedRight::Write];

    pub fn named(self) -> NamedRight {
        match self {
            FlaggedRight::FullControl => NamedRight::FullControl,
            FlaggedRight::Modify => NamedRight::Modify,
            FlaggedRight::Write => NamedRight::Write,
        }
    }

    fn from_named(right: NamedRight) -> Option<Self> {
        match right {
            NamedRight::FullControl => Some(FlaggedRight::FullControl),
            NamedRight::Modify => Some(FlaggedRight::Modify),
            NamedRight::Write => Some(FlaggedRight::Write),
            _ => None,
        }
    }

    pub fn rights(self) -> FileSystemRights {
        self.named().rights()
    }
}

impl fmt::Display for FlaggedRight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.named().as_str())
    }
}

impl FromStr for FlaggedRight {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fullcontrol" => Ok(FlaggedRight::FullControl),
            "modify" => Ok(FlaggedRight::Modify),
            "write" => Ok(FlaggedRight::Write),
            other => Err(other.to_string()),
        }
    }
}

/// Action for one insecure identity/right pair on one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemediationAction {
    /// Not flagged.
    Skip,
    /// System path and general-users group: keep read and execute only.
    NarrowToReadExecute,
    /// Remove every grant of that right to that identity.
    RemoveGrant,
}

impl fmt::Display for RemediationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RemediationAction::Skip => "skip",
            RemediationAction::NarrowToReadExecute => "narrow to ReadAndExecute",
            RemediationAction::RemoveGrant => "remove grant",
        })
    }
}

#[derive(Debug, Clone)]
pub struct Policy {
    identities: Vec<String>,
    rights: Vec<FlaggedRight>,
    general_users: Vec<String>,
    system_paths: Vec<String>,
}

impl Policy {
    /// Build a policy. `user_domain` adds that domain's `Domain Users` group
    /// to the flagged identities.
    pub fn new(
        identities: impl IntoIterator<Item = String>,
        rights: impl IntoIterator<Item = FlaggedRight>,
        general_users: impl IntoIterator<Item = String>,
        system_paths: impl IntoIterator<Item = String>,
        user_domain: Option<&str>,
    ) -> Self {
        let mut identities: Vec<String> = identities.into_iter().collect();
        if let Some(domain) = user_domain.filter(|d| !d.is_empty()) {
            identities.push(format!("{domain}\\{DOMAIN_USERS_GROUP}"));
        }
        let mut rights: Vec<FlaggedRight> = rights.into_iter().collect();
        rights.dedup();

        Policy {
            identities,
            rights,
            general_users: general_users.into_iter().collect(),
            system_paths: system_paths.into_iter().map(|p| normalize_path(&p)).collect(),
        }
    }

    pub fn identities(&self) -> &[String] {
        &self.identities
    }

    pub fn is_flagged_identity(&self, identity: &Identity) -> bool {
        self.identities.iter().any(|candidate| identity.is_named(candidate))
    }

    pub fn is_general_users(&self, identity: &Identity) -> bool {
        self.general_users.iter().any(|candidate| identity.is_named(candidate))
    }

    pub fn is_system_path(&self, path: &str) -> bool {
        let path = normalize_path(path);
        self.system_paths.iter().any(|p| *p == path)
    }

    /// Flagged rights carried by `entry`, in the order its rights list them.
    /// Empty unless the entry is an allow entry for a flagged identity.
    pub fn insecure_rights(&self, entry: &AccessControlEntry) -> Vec<FlaggedRight> {
        if !entry.is_allow() || !self.is_flagged_identity(&entry.identity) {
            return Vec::new();
        }
        entry
            .rights()
            .named()
            .into_iter()
            .filter_map(FlaggedRight::from_named)
            .filter(|r| self.rights.contains(r))
            .collect()
    }

    pub fn action(&self, path: &str, identity: &Identity, right: FlaggedRight) -> RemediationAction {
        if !self.rights.contains(&right) || !self.is_flagged_identity(identity) {
            return RemediationAction::Skip;
        }
        if self.is_system_path(path) && self.is_general_users(identity) {
            RemediationAction::NarrowToReadExecute
        } else {
            RemediationAction::RemoveGrant
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        let identities = [EVERYONE, AUTHENTICATED_USERS, BUILTIN_USERS, INTERACTIVE]
            .into_iter()
            .flat_map(|(name, sid)| [name.to_string(), sid.to_string()]);
        Policy::new(
            identities,
            FlaggedRight::ALL,
            [BUILTIN_USERS.0.to_string(), BUILTIN_USERS.1.to_string()],
            [SYSTEM_SERVICE_HOST.to_string(), SYSTEM_DIRECTORY.to_string()],
            None,
        )
    }
}

/// Case-folded path with trailing separators removed (drive roots keep theirs).
fn normalize_path(path: &str) -> String {
    let lowered = path.trim().to_lowercase().replace('/', "\\");
    let trimmed = lowered.trim_end_matches('\\');
    if trimmed.ends_with(':') {
        format!("{trimmed}\\")
    } else {
        trimmed.to_string()
    }
}
