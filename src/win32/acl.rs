// src/win32/acl.rs

//! File and folder DACLs through `GetNamedSecurityInfoW`/`SetNamedSecurityInfoW`.
//!
//! The DACL is walked ACE by ACE and decoded with [`crate::acl::raw`]; the
//! write side rebuilds a fresh ACL from the encoded entries, in order.

use super::to_wide;
use crate::acl::{raw, AccessControlList, AclStore, Identity};
use crate::error::AclError;
use crate::svcguard_log;
use log::Level;
use std::{cell::RefCell, collections::HashMap, ffi::c_void, mem::size_of, path::Path, ptr};
use windows_sys::Win32::Foundation::{
    GetLastError, LocalFree, ERROR_FILE_NOT_FOUND, ERROR_INSUFFICIENT_BUFFER, ERROR_PATH_NOT_FOUND,
    ERROR_SUCCESS,
};
use windows_sys::Win32::Security::Authorization::{
    GetNamedSecurityInfoW, SetNamedSecurityInfoW, SE_FILE_OBJECT,
};
use windows_sys::Win32::Security::{
    AclSizeInformation, AddAce, GetAce, GetAclInformation, GetSecurityDescriptorControl,
    InitializeAcl, LookupAccountSidW, ACL, ACL_REVISION_DS, ACL_SIZE_INFORMATION,
    DACL_SECURITY_INFORMATION, PROTECTED_DACL_SECURITY_INFORMATION, PSECURITY_DESCRIPTOR,
    SE_DACL_PROTECTED, SID_NAME_USE, UNPROTECTED_DACL_SECURITY_INFORMATION,
};

const ACL_HEADER_LEN: usize = 8;

/// Frees a buffer the security API allocated with `LocalAlloc`.
struct LocalGuard(PSECURITY_DESCRIPTOR);

impl Drop for LocalGuard {
    fn drop(&mut self) {
        if !self.0.is_null() {
            // SAFETY: the pointer came from GetNamedSecurityInfoW and is freed once.
            unsafe {
                LocalFree(self.0);
            }
        }
    }
}

fn os_error(api: &'static str, code: u32) -> AclError {
    match code {
        ERROR_FILE_NOT_FOUND | ERROR_PATH_NOT_FOUND => AclError::NotFound,
        _ => AclError::Os { api, code },
    }
}

/// `AclStore` over the local file system. SID lookups are cached per store.
#[derive(Debug, Default)]
pub struct FileAclStore {
    names: RefCell<HashMap<Vec<u8>, Identity>>,
}

impl FileAclStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a binary SID to `DOMAIN\name`, falling back to its string form.
    fn identity(&self, sid: &[u8]) -> Identity {
        if let Some(known) = self.names.borrow().get(sid) {
            return known.clone();
        }
        let sid_string = raw::sid_to_string(sid).unwrap_or_default();
        let name = lookup_account(sid).unwrap_or_else(|| sid_string.clone());
        let identity = Identity::with_sid(name, sid_string);
        self.names.borrow_mut().insert(sid.to_vec(), identity.clone());
        identity
    }
}

/// `LookupAccountSidW`, retried once with the sizes it asks for.
fn lookup_account(sid: &[u8]) -> Option<String> {
    let mut sid = sid.to_vec();
    let mut name = vec![0u16; 256];
    let mut domain = vec![0u16; 256];

    for _ in 0..2 {
        let mut name_len = name.len() as u32;
        let mut domain_len = domain.len() as u32;
        let mut use_: SID_NAME_USE = 0;
        // SAFETY: the SID buffer holds a validated SID and both output buffers
        // are as long as the lengths passed in.
        let ok = unsafe {
            LookupAccountSidW(
                ptr::null(),
                sid.as_mut_ptr() as *mut c_void,
                name.as_mut_ptr(),
                &mut name_len,
                domain.as_mut_ptr(),
                &mut domain_len,
                &mut use_,
            )
        };
        if ok != 0 {
            let name = String::from_utf16_lossy(&name[..name_len as usize]);
            let domain = String::from_utf16_lossy(&domain[..domain_len as usize]);
            return Some(if domain.is_empty() { name } else { format!("{domain}\\{name}") });
        }
        // SAFETY: plain thread-local error read.
        if unsafe { GetLastError() } != ERROR_INSUFFICIENT_BUFFER {
            return None;
        }
        name.resize(name_len.max(1) as usize, 0);
        domain.resize(domain_len.max(1) as usize, 0);
    }
    None
}

impl AclStore for FileAclStore {
    fn read(&self, path: &Path) -> Result<AccessControlList, AclError> {
        let mut wide = to_wide(&path.to_string_lossy());
        let mut dacl: *mut ACL = ptr::null_mut();
        let mut descriptor: PSECURITY_DESCRIPTOR = ptr::null_mut();

        // SAFETY: every out-pointer is a valid local; the descriptor is owned
        // by the guard and `dacl` points into it.
        unsafe {
            let status = GetNamedSecurityInfoW(
                wide.as_mut_ptr(),
                SE_FILE_OBJECT,
                DACL_SECURITY_INFORMATION,
                ptr::null_mut(),
                ptr::null_mut(),
                &mut dacl,
                ptr::null_mut(),
                &mut descriptor,
            );
            if status != ERROR_SUCCESS {
                return Err(os_error("GetNamedSecurityInfoW", status));
            }
            let _guard = LocalGuard(descriptor);

            let mut control = 0u16;
            let mut revision = 0u32;
            if GetSecurityDescriptorControl(descriptor, &mut control, &mut revision) == 0 {
                return Err(os_error("GetSecurityDescriptorControl", GetLastError()));
            }
            let protected = control & SE_DACL_PROTECTED != 0;

            if dacl.is_null() {
                svcguard_log!(
                    Level::Warn,
                    "acl",
                    "{} has a NULL DACL (unrestricted access)",
                    path.display()
                );
                return Ok(AccessControlList { entries: Vec::new(), protected });
            }

            let mut info = ACL_SIZE_INFORMATION { AceCount: 0, AclBytesInUse: 0, AclBytesFree: 0 };
            if GetAclInformation(
                dacl,
                &mut info as *mut ACL_SIZE_INFORMATION as *mut c_void,
                size_of::<ACL_SIZE_INFORMATION>() as u32,
                AclSizeInformation,
            ) == 0
            {
                return Err(os_error("GetAclInformation", GetLastError()));
            }

            let mut entries = Vec::with_capacity(info.AceCount as usize);
            for index in 0..info.AceCount {
                let mut ace: *mut c_void = ptr::null_mut();
                if GetAce(dacl, index, &mut ace) == 0 || ace.is_null() {
                    return Err(os_error("GetAce", GetLastError()));
                }
                let header = std::slice::from_raw_parts(ace as *const u8, 4);
                let size = u16::from_le_bytes([header[2], header[3]]) as usize;
                let bytes = std::slice::from_raw_parts(ace as *const u8, size);

                let decoded = raw::decode(bytes)?;
                let identity = if decoded.sid.is_empty() {
                    Identity::default()
                } else {
                    self.identity(decoded.sid)
                };
                entries.push(decoded.into_entry(identity));
            }
            Ok(AccessControlList { entries, protected })
        }
    }

    fn write(&self, path: &Path, acl: &AccessControlList) -> Result<(), AclError> {
        let encoded = acl
            .entries
            .iter()
            .map(raw::encode)
            .collect::<Result<Vec<_>, _>>()?;

        let body: usize = encoded.iter().map(Vec::len).sum();
        let total = (ACL_HEADER_LEN + body).next_multiple_of(4);
        let total32 = u32::try_from(total)
            .ok()
            .filter(|t| *t <= u32::from(u16::MAX))
            .ok_or_else(|| AclError::Malformed(format!("ACL of {total} bytes")))?;

        // u32-backed so the ACL header is DWORD aligned.
        let mut buf = vec![0u32; total / 4];
        let acl_ptr = buf.as_mut_ptr() as *mut ACL;
        let mut wide = to_wide(&path.to_string_lossy());

        let protection = if acl.protected {
            PROTECTED_DACL_SECURITY_INFORMATION
        } else {
            UNPROTECTED_DACL_SECURITY_INFORMATION
        };

        // SAFETY: `buf` outlives every call below and is `total` bytes long;
        // each ACE is copied from a buffer of exactly its encoded size.
        unsafe {
            if InitializeAcl(acl_ptr, total32, ACL_REVISION_DS) == 0 {
                return Err(os_error("InitializeAcl", GetLastError()));
            }
            for ace in &encoded {
                if AddAce(
                    acl_ptr,
                    ACL_REVISION_DS,
                    u32::MAX,
                    ace.as_ptr() as *const c_void,
                    ace.len() as u32,
                ) == 0
                {
                    return Err(os_error("AddAce", GetLastError()));
                }
            }

            let status = SetNamedSecurityInfoW(
                wide.as_mut_ptr(),
                SE_FILE_OBJECT,
                DACL_SECURITY_INFORMATION | protection,
                ptr::null_mut(),
                ptr::null_mut(),
                acl_ptr,
                ptr::null(),
            );
            if status != ERROR_SUCCESS {
                return Err(os_error("SetNamedSecurityInfoW", status));
            }
        }
        svcguard_log!(
            Level::Debug,
            "acl",
            "Wrote {} entries to {} (protected={})",
            acl.entries.len(),
            path.display(),
            acl.protected
        );
        Ok(())
    }
}
