//! Win32 backends for the collaborator traits.
//!
//! - `ScmServiceLister`  – service control manager database
//! - `FileAclStore`      – DACLs through the named-security-info API
//! - `TokenElevation`    – elevation bit of the process token

mod acl;
mod elevation;
mod services;

pub use acl::FileAclStore;
pub use elevation::TokenElevation;
pub use services::ScmServiceLister;

/// NUL-terminated UTF-16 copy of `s`.
pub(crate) fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Read a NUL-terminated UTF-16 string. Null reads as empty.
///
/// # Safety
/// `p` must be null or point at a NUL-terminated UTF-16 buffer.
pub(crate) unsafe fn from_wide_ptr(p: *const u16) -> String {
    if p.is_null() {
        return String::new();
    }
    unsafe {
        let mut len = 0;
        while *p.add(len) != 0 {
            len += 1;
        }
        String::from_utf16_lossy(std::slice::from_raw_parts(p, len))
    }
}
