//! In-memory collaborators shared by the integration tests.
//!
//! `MemoryAclStore` keeps one ACL per path (keys are case-folded) and can be
//! told to fail reads, writes or the re-read that follows an inheritance
//! conversion. It counts calls so tests can assert how often a path was hit.

#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, HashSet},
    path::Path,
};
use svcguard::acl::{AccessControlEntry, AccessControlList, AceFlags, AclStore, FileSystemRights, Identity};
use svcguard::error::{AclError, EnumerationError};
use svcguard::services::{ServiceEntry, ServiceLister};

pub const ACCESS_DENIED: u32 = 5;

pub fn everyone() -> Identity {
    Identity::with_sid("Everyone", "S-1-1-0")
}

pub fn users() -> Identity {
    Identity::with_sid("BUILTIN\\Users", "S-1-5-32-545")
}

pub fn authenticated_users() -> Identity {
    Identity::with_sid("NT AUTHORITY\\Authenticated Users", "S-1-5-11")
}

pub fn admins() -> Identity {
    Identity::with_sid("BUILTIN\\Administrators", "S-1-5-32-544")
}

pub fn system() -> Identity {
    Identity::with_sid("NT AUTHORITY\\SYSTEM", "S-1-5-18")
}

pub fn allow(identity: Identity, rights: FileSystemRights) -> AccessControlEntry {
    AccessControlEntry::allow(identity, rights, AceFlags::empty())
}

pub fn inherited(identity: Identity, rights: FileSystemRights) -> AccessControlEntry {
    AccessControlEntry::allow(identity, rights, AceFlags::INHERITED)
}

/// Administrators and SYSTEM with full control; nothing else.
pub fn baseline() -> Vec<AccessControlEntry> {
    vec![
        allow(admins(), FileSystemRights::FULL_CONTROL),
        allow(system(), FileSystemRights::FULL_CONTROL),
    ]
}

pub fn service(name: &str, display_name: &str, command_line: &str) -> ServiceEntry {
    ServiceEntry {
        name: name.to_string(),
        display_name: display_name.to_string(),
        command_line: command_line.to_string(),
    }
}

// ───── service listers ──────────────────────────────────────────────────────

pub struct StaticLister(pub Vec<ServiceEntry>);

impl ServiceLister for StaticLister {
    fn list_services(&self) -> Result<Vec<ServiceEntry>, EnumerationError> {
        Ok(self.0.clone())
    }
}

pub struct FailingLister;

impl ServiceLister for FailingLister {
    fn list_services(&self) -> Result<Vec<ServiceEntry>, EnumerationError> {
        Err(EnumerationError::Lister("OpenSCManagerW failed with Win32 error 5".into()))
    }
}

// ───── ACL store ────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryAclStore {
    acls: RefCell<HashMap<String, AccessControlList>>,
    fail_read: RefCell<HashSet<String>>,
    fail_write: RefCell<HashSet<String>>,
    fail_protect: RefCell<HashSet<String>>,
    fail_reread: RefCell<HashSet<String>>,
    written: RefCell<HashSet<String>>,
    reads: RefCell<HashMap<String, usize>>,
    writes: Cell<usize>,
}

fn key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

impl MemoryAclStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, path: &str, entries: Vec<AccessControlEntry>) -> Self {
        self.acls
            .borrow_mut()
            .insert(path.to_lowercase(), AccessControlList::new(entries));
        self
    }

    pub fn failing_read(self, path: &str) -> Self {
        self.fail_read.borrow_mut().insert(path.to_lowercase());
        self
    }

    /// Every write to `path` fails.
    pub fn failing_write(self, path: &str) -> Self {
        self.fail_write.borrow_mut().insert(path.to_lowercase());
        self
    }

    /// Only the write that turns protection on fails.
    pub fn failing_protect(self, path: &str) -> Self {
        self.fail_protect.borrow_mut().insert(path.to_lowercase());
        self
    }

    /// Reads of `path` fail once it has been written.
    pub fn failing_reread(self, path: &str) -> Self {
        self.fail_reread.borrow_mut().insert(path.to_lowercase());
        self
    }

    pub fn acl(&self, path: &str) -> AccessControlList {
        self.acls
            .borrow()
            .get(&path.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    pub fn reads_of(&self, path: &str) -> usize {
        self.reads.borrow().get(&path.to_lowercase()).copied().unwrap_or(0)
    }

    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl AclStore for MemoryAclStore {
    fn read(&self, path: &Path) -> Result<AccessControlList, AclError> {
        let k = key(path);
        *self.reads.borrow_mut().entry(k.clone()).or_default() += 1;

        if self.fail_read.borrow().contains(&k)
            || (self.fail_reread.borrow().contains(&k) && self.written.borrow().contains(&k))
        {
            return Err(AclError::Os { api: "GetNamedSecurityInfoW", code: ACCESS_DENIED });
        }
        self.acls.borrow().get(&k).cloned().ok_or(AclError::NotFound)
    }

    fn write(&self, path: &Path, acl: &AccessControlList) -> Result<(), AclError> {
        let k = key(path);
        let was_protected = self.acls.borrow().get(&k).is_some_and(|a| a.protected);

        if self.fail_write.borrow().contains(&k)
            || (acl.protected && !was_protected && self.fail_protect.borrow().contains(&k))
        {
            return Err(AclError::Os { api: "SetNamedSecurityInfoW", code: ACCESS_DENIED });
        }
        self.writes.set(self.writes.get() + 1);
        self.written.borrow_mut().insert(k.clone());
        self.acls.borrow_mut().insert(k, acl.clone());
        Ok(())
    }
}
