// src/win32/elevation.rs

use crate::elevation::PrivilegeCheck;
use std::{ffi::c_void, mem::size_of, ptr};
use windows_sys::Win32::Foundation::{CloseHandle, HANDLE};
use windows_sys::Win32::Security::{GetTokenInformation, TokenElevation as TokenElevationClass, TOKEN_ELEVATION, TOKEN_QUERY};
use windows_sys::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

/// Reads `TokenIsElevated` from the current process token.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenElevation;

impl PrivilegeCheck for TokenElevation {
    fn is_elevated(&self) -> bool {
        // SAFETY: the token handle is checked before use and closed once; the
        // output buffer is a properly sized TOKEN_ELEVATION on the stack.
        unsafe {
            let mut token: HANDLE = ptr::null_mut();
            if OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token) == 0 {
                return false;
            }
            let mut elevation = TOKEN_ELEVATION { TokenIsElevated: 0 };
            let mut returned = 0u32;
            let ok = GetTokenInformation(
                token,
                TokenElevationClass,
                &mut elevation as *mut TOKEN_ELEVATION as *mut c_void,
                size_of::<TOKEN_ELEVATION>() as u32,
                &mut returned,
            );
            CloseHandle(token);
            ok != 0 && elevation.TokenIsElevated != 0
        }
    }
}
