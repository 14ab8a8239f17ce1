//! Access-control model shared by the corrector and the platform backends.
//!
//! The ACL object itself belongs to the operating system; what the engine
//! holds is a detached copy that is read, edited and written back through an
//! [`AclStore`].

pub mod raw;
pub mod rights;

use crate::error::AclError;
use bitflags::bitflags;
use std::{fmt, path::Path};

pub use rights::{FileSystemRights, NamedRight};

bitflags! {
    /// ACE header flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AceFlags: u8 {
        const OBJECT_INHERIT       = 0x01;
        const CONTAINER_INHERIT    = 0x02;
        const NO_PROPAGATE_INHERIT = 0x04;
        const INHERIT_ONLY         = 0x08;
        const INHERITED            = 0x10;
        const SUCCESSFUL_ACCESS    = 0x40;
        const FAILED_ACCESS        = 0x80;
    }
}

/// Security principal an ACE applies to.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    /// Resolved account name, `DOMAIN\name` or a bare name.
    pub name: String,
    /// String form of the SID (`S-1-5-32-545`), when known.
    pub sid: Option<String>,
}

impl Identity {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), sid: None }
    }

    pub fn with_sid(name: impl Into<String>, sid: impl Into<String>) -> Self {
        Self { name: name.into(), sid: Some(sid.into()) }
    }

    /// Same principal: SIDs decide when both sides carry one, names otherwise.
    pub fn same_as(&self, other: &Identity) -> bool {
        match (&self.sid, &other.sid) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => self.name.eq_ignore_ascii_case(&other.name),
        }
    }

    /// Matches either the account name or the SID string, ignoring case.
    pub fn is_named(&self, candidate: &str) -> bool {
        self.name.eq_ignore_ascii_case(candidate)
            || self.sid.as_deref().is_some_and(|s| s.eq_ignore_ascii_case(candidate))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.sid, self.name.is_empty()) {
            (Some(sid), true) => f.write_str(sid),
            _ => f.write_str(&self.name),
        }
    }
}

/// What an ACE does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AceKind {
    Allow,
    Deny,
    /// Any other ACE type, carried through unchanged as its full encoded bytes.
    Opaque(Vec<u8>),
}

/// One permission grant on one path.
#[derive(Debug, Clone)]
pub struct AccessControlEntry {
    pub identity: Identity,
    pub kind: AceKind,
    /// Access mask as stored, generic bits included.
    pub access_mask: u32,
    pub flags: AceFlags,
    /// Binary SID; empty for entries that never came from a real ACL.
    pub raw_sid: Vec<u8>,
}

impl AccessControlEntry {
    pub fn allow(identity: Identity, rights: FileSystemRights, flags: AceFlags) -> Self {
        Self {
            identity,
            kind: AceKind::Allow,
            access_mask: rights.bits(),
            flags,
            raw_sid: Vec::new(),
        }
    }

    pub fn deny(identity: Identity, rights: FileSystemRights, flags: AceFlags) -> Self {
        Self { kind: AceKind::Deny, ..Self::allow(identity, rights, flags) }
    }

    pub fn rights(&self) -> FileSystemRights {
        FileSystemRights::from_access_mask(self.access_mask)
    }

    pub fn is_inherited(&self) -> bool {
        self.flags.contains(AceFlags::INHERITED)
    }

    pub fn is_allow(&self) -> bool {
        self.kind == AceKind::Allow
    }

    /// Allow entry for `identity` whose rights include all of `right`.
    fn grants(&self, identity: &Identity, right: FileSystemRights) -> bool {
        self.is_allow() && self.identity.same_as(identity) && self.rights().contains(right)
    }
}

/// A detached copy of a path's DACL.
#[derive(Debug, Clone, Default)]
pub struct AccessControlList {
    pub entries: Vec<AccessControlEntry>,
    /// Protected from inheritance propagation by the parent.
    pub protected: bool,
}

impl AccessControlList {
    pub fn new(entries: Vec<AccessControlEntry>) -> Self {
        Self { entries, protected: false }
    }

    /// Break inheritance while keeping every entry: inherited entries become
    /// explicit ones in place.
    pub fn protect_preserving(&mut self) {
        self.protected = true;
        for entry in &mut self.entries {
            entry.flags.remove(AceFlags::INHERITED);
        }
    }

    /// Remove every allow entry of `identity` that grants `right`.
    /// Returns how many entries were dropped.
    pub fn remove_grants(&mut self, identity: &Identity, right: FileSystemRights) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !e.grants(identity, right));
        before - self.entries.len()
    }

    /// Cut every allow entry of `identity` down to exactly `rights`, in place.
    /// Each entry keeps its own position and propagation flags, so a grant on
    /// the object and an inherit-only grant for its children both survive.
    /// Returns how many entries changed.
    pub fn narrow_grants(&mut self, identity: &Identity, rights: FileSystemRights) -> usize {
        let mut changed = 0;
        for entry in self
            .entries
            .iter_mut()
            .filter(|e| e.is_allow() && e.identity.same_as(identity))
        {
            if entry.access_mask != rights.bits() || entry.is_inherited() {
                entry.access_mask = rights.bits();
                entry.flags.remove(AceFlags::INHERITED);
                changed += 1;
            }
        }
        changed
    }

    /// Allow entries for `identity`.
    pub fn grants_for<'a>(
        &'a self,
        identity: &Identity,
    ) -> impl Iterator<Item = &'a AccessControlEntry> + use<'a> {
        let identity = identity.clone();
        self.entries
            .iter()
            .filter(move |e| e.is_allow() && e.identity.same_as(&identity))
    }
}

/// Reads and persists path ACLs.
pub trait AclStore {
    /// Full DACL of `path`, entries in the order the platform returns them.
    fn read(&self, path: &Path) -> Result<AccessControlList, AclError>;

    /// Persist `acl` as the DACL of `path`, honouring `acl.protected`.
    fn write(&self, path: &Path, acl: &AccessControlList) -> Result<(), AclError>;
}

/// Result of breaking inheritance on a path.
///
/// Once inheritance is broken the entries on disk may differ from the copy in
/// hand, so the caller always gets back the list it must continue with.
#[derive(Debug)]
pub enum Reacquired {
    /// Re-read after conversion.
    Fresh(AccessControlList),
    /// Conversion was persisted but the re-read failed; this is the locally
    /// converted copy.
    Stale {
        acl: AccessControlList,
        error: AclError,
    },
}

impl Reacquired {
    pub fn into_acl(self) -> AccessControlList {
        match self {
            Reacquired::Fresh(acl) | Reacquired::Stale { acl, .. } => acl,
        }
    }
}

/// Convert inherited entries of `path` into explicit ones and re-acquire the ACL.
///
/// `Err` means nothing was persisted and `current` is still authoritative.
pub fn convert_inheritance<S: AclStore + ?Sized>(
    store: &S,
    path: &Path,
    current: &AccessControlList,
) -> Result<Reacquired, AclError> {
    let mut converted = current.clone();
    converted.protect_preserving();
    store.write(path, &converted)?;

    Ok(match store.read(path) {
        Ok(fresh) => Reacquired::Fresh(fresh),
        Err(error) => Reacquired::Stale { acl: converted, error },
    })
}
