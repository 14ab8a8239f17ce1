// src/acl/rights.rs

//! File-system access rights and their named decomposition.
//!
//! A raw access mask is rendered the way the platform renders file rights:
//! the largest named composite right that is fully contained in the mask is
//! taken first, its bits are removed, and the walk continues downwards until
//! the mask is exhausted. Names are listed in ascending value order, so
//! `0x1301BF` reads as `Modify, Synchronize`.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Specific file-system rights, including the named composites.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FileSystemRights: u32 {
        const READ_DATA                        = 0x0000_0001;
        const WRITE_DATA                       = 0x0000_0002;
        const APPEND_DATA                      = 0x0000_0004;
        const READ_EXTENDED_ATTRIBUTES         = 0x0000_0008;
        const WRITE_EXTENDED_ATTRIBUTES        = 0x0000_0010;
        const EXECUTE_FILE                     = 0x0000_0020;
        const DELETE_SUBDIRECTORIES_AND_FILES  = 0x0000_0040;
        const READ_ATTRIBUTES                  = 0x0000_0080;
        const WRITE_ATTRIBUTES                 = 0x0000_0100;
        const DELETE                           = 0x0001_0000;
        const READ_PERMISSIONS                 = 0x0002_0000;
        const CHANGE_PERMISSIONS               = 0x0004_0000;
        const TAKE_OWNERSHIP                   = 0x0008_0000;
        const SYNCHRONIZE                      = 0x0010_0000;

        const WRITE = Self::WRITE_DATA.bits()
            | Self::APPEND_DATA.bits()
            | Self::WRITE_EXTENDED_ATTRIBUTES.bits()
            | Self::WRITE_ATTRIBUTES.bits();
        const READ = Self::READ_DATA.bits()
            | Self::READ_EXTENDED_ATTRIBUTES.bits()
            | Self::READ_ATTRIBUTES.bits()
            | Self::READ_PERMISSIONS.bits();
        const READ_AND_EXECUTE = Self::READ.bits() | Self::EXECUTE_FILE.bits();
        const MODIFY = Self::READ_AND_EXECUTE.bits() | Self::WRITE.bits() | Self::DELETE.bits();
        const FULL_CONTROL = 0x001F_01FF;
    }
}

/// A single named right as it appears in a rights listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedRight {
    FullControl,
    Modify,
    ReadAndExecute,
    Read,
    Write,
    TakeOwnership,
    ChangePermissions,
    ReadPermissions,
    Delete,
    Synchronize,
    WriteAttributes,
    ReadAttributes,
    DeleteSubdirectoriesAndFiles,
    ExecuteFile,
    WriteExtendedAttributes,
    ReadExtendedAttributes,
    AppendData,
    WriteData,
    ReadData,
}

/// Decomposition table, largest value first.
const NAMED: &[(NamedRight, FileSystemRights)] = &[
    (NamedRight::FullControl, FileSystemRights::FULL_CONTROL),
    (NamedRight::Synchronize, FileSystemRights::SYNCHRONIZE),
    (NamedRight::TakeOwnership, FileSystemRights::TAKE_OWNERSHIP),
    (NamedRight::ChangePermissions, FileSystemRights::CHANGE_PERMISSIONS),
    (NamedRight::Modify, FileSystemRights::MODIFY),
    (NamedRight::ReadAndExecute, FileSystemRights::READ_AND_EXECUTE),
    (NamedRight::Read, FileSystemRights::READ),
    (NamedRight::ReadPermissions, FileSystemRights::READ_PERMISSIONS),
    (NamedRight::Delete, FileSystemRights::DELETE),
    (NamedRight::Write, FileSystemRights::WRITE),
    (NamedRight::WriteAttributes, FileSystemRights::WRITE_ATTRIBUTES),
    (NamedRight::ReadAttributes, FileSystemRights::READ_ATTRIBUTES),
    (NamedRight::DeleteSubdirectoriesAndFiles, FileSystemRights::DELETE_SUBDIRECTORIES_AND_FILES),
    (NamedRight::ExecuteFile, FileSystemRights::EXECUTE_FILE),
    (NamedRight::WriteExtendedAttributes, FileSystemRights::WRITE_EXTENDED_ATTRIBUTES),
    (NamedRight::ReadExtendedAttributes, FileSystemRights::READ_EXTENDED_ATTRIBUTES),
    (NamedRight::AppendData, FileSystemRights::APPEND_DATA),
    (NamedRight::WriteData, FileSystemRights::WRITE_DATA),
    (NamedRight::ReadData, FileSystemRights::READ_DATA),
];

// Generic access bits and the file generic mapping they expand to.
pub const GENERIC_READ: u32 = 0x8000_0000;
pub const GENERIC_WRITE: u32 = 0x4000_0000;
pub const GENERIC_EXECUTE: u32 = 0x2000_0000;
pub const GENERIC_ALL: u32 = 0x1000_0000;

const FILE_GENERIC_READ: u32 = 0x0012_0089;
const FILE_GENERIC_WRITE: u32 = 0x0012_0116;
const FILE_GENERIC_EXECUTE: u32 = 0x0012_00A0;
const FILE_ALL_ACCESS: u32 = 0x001F_01FF;

impl FileSystemRights {
    /// Expand generic bits of a raw ACE mask into specific file rights and
    /// drop everything that is not a file right.
    pub fn from_access_mask(mask: u32) -> Self {
        let mut specific = mask & !(GENERIC_READ | GENERIC_WRITE | GENERIC_EXECUTE | GENERIC_ALL);
        if mask & GENERIC_READ != 0 {
            specific |= FILE_GENERIC_READ;
        }
        if mask & GENERIC_WRITE != 0 {
            specific |= FILE_GENERIC_WRITE;
        }
        if mask & GENERIC_EXECUTE != 0 {
            specific |= FILE_GENERIC_EXECUTE;
        }
        if mask & GENERIC_ALL != 0 {
            specific |= FILE_ALL_ACCESS;
        }
        Self::from_bits_truncate(specific)
    }

    /// Split into named rights. The walk takes the largest composite first;
    /// the result is listed smallest value first, as the platform prints it.
    pub fn named(self) -> Vec<NamedRight> {
        let mut remaining = self;
        let mut out = Vec::new();
        for (name, value) in NAMED {
            if remaining.is_empty() {
                break;
            }
            if remaining.contains(*value) {
                out.push(*name);
                remaining.remove(*value);
            }
        }
        out.reverse();
        out
    }
}

impl fmt::Display for FileSystemRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.named();
        if names.is_empty() {
            return write!(f, "{}", self.bits());
        }
        let parts: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
        f.write_str(&parts.join(", "))
    }
}

impl NamedRight {
    pub fn as_str(self) -> &'static str {
        match self {
            NamedRight::FullControl => "FullControl",
            NamedRight::Modify => "Modify",
            NamedRight::ReadAndExecute => "ReadAndExecute",
            NamedRight::Read => "Read",
            NamedRight::Write => "Write",
            NamedRight::TakeOwnership => "TakeOwnership",
            NamedRight::ChangePermissions => "ChangePermissions",
            NamedRight::ReadPermissions => "ReadPermissions",
            NamedRight::Delete => "Delete",
            NamedRight::Synchronize => "Synchronize",
            NamedRight::WriteAttributes => "WriteAttributes",
            NamedRight::ReadAttributes => "ReadAttributes",
            NamedRight::DeleteSubdirectoriesAndFiles => "DeleteSubdirectoriesAndFiles",
            NamedRight::ExecuteFile => "ExecuteFile",
            NamedRight::WriteExtendedAttributes => "WriteExtendedAttributes",
            NamedRight::ReadExtendedAttributes => "ReadExtendedAttributes",
            NamedRight::AppendData => "AppendData",
            NamedRight::WriteData => "WriteData",
            NamedRight::ReadData => "ReadData",
        }
    }

    /// The bits this named right stands for.
    pub fn rights(self) -> FileSystemRights {
        NAMED
            .iter()
            .find(|(name, _)| *name == self)
            .map(|(_, value)| *value)
            .unwrap_or(FileSystemRights::empty())
    }
}

impl fmt::Display for NamedRight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
