// src/win32/services.rs

//! Service listing from the service control manager.

use super::from_wide_ptr;
use crate::error::EnumerationError;
use crate::services::{ServiceEntry, ServiceLister};
use crate::svcguard_log;
use log::Level;
use std::ptr;
use windows_service::{
    service::ServiceAccess,
    service_manager::{ServiceManager, ServiceManagerAccess},
};
use windows_sys::Win32::Foundation::{GetLastError, ERROR_MORE_DATA};
use windows_sys::Win32::System::Services::{
    CloseServiceHandle, EnumServicesStatusExW, OpenSCManagerW, ENUM_SERVICE_STATUS_PROCESSW,
    SC_ENUM_PROCESS_INFO, SC_MANAGER_CONNECT, SC_MANAGER_ENUMERATE_SERVICE, SERVICE_STATE_ALL,
    SERVICE_WIN32,
};

const INITIAL_BUFFER: usize = 64 * 1024;

/// Lists Win32 services (own-process and shared-process) in any state.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScmServiceLister;

impl ScmServiceLister {
    /// `(service name, display name)` for every Win32 service.
    fn service_names(&self) -> Result<Vec<(String, String)>, EnumerationError> {
        // SAFETY: the SCM handle is checked and closed on every path; the
        // enumeration buffer is u64-backed so the returned structs are aligned,
        // and only `returned` entries are read from it.
        unsafe {
            let scm = OpenSCManagerW(
                ptr::null(),
                ptr::null(),
                SC_MANAGER_CONNECT | SC_MANAGER_ENUMERATE_SERVICE,
            );
            if scm.is_null() {
                return Err(EnumerationError::Lister(format!(
                    "OpenSCManagerW failed with Win32 error {}",
                    GetLastError()
                )));
            }

            let mut names = Vec::new();
            let mut buf: Vec<u64> = vec![0; INITIAL_BUFFER / 8];
            let mut resume = 0u32;
            loop {
                let mut needed = 0u32;
                let mut returned = 0u32;
                let ok = EnumServicesStatusExW(
                    scm,
                    SC_ENUM_PROCESS_INFO,
                    SERVICE_WIN32,
                    SERVICE_STATE_ALL,
                    buf.as_mut_ptr() as *mut u8,
                    (buf.len() * 8) as u32,
                    &mut needed,
                    &mut returned,
                    &mut resume,
                    ptr::null(),
                );
                let more = ok == 0 && GetLastError() == ERROR_MORE_DATA;
                if ok == 0 && !more {
                    let code = GetLastError();
                    CloseServiceHandle(scm);
                    return Err(EnumerationError::Lister(format!(
                        "EnumServicesStatusExW failed with Win32 error {code}"
                    )));
                }

                let entries = std::slice::from_raw_parts(
                    buf.as_ptr() as *const ENUM_SERVICE_STATUS_PROCESSW,
                    returned as usize,
                );
                for e in entries {
                    names.push((from_wide_ptr(e.lpServiceName), from_wide_ptr(e.lpDisplayName)));
                }

                if !more {
                    break;
                }
                if returned == 0 {
                    buf = vec![0; (needed as usize).div_ceil(8).max(buf.len() * 2)];
                }
            }
            CloseServiceHandle(scm);
            Ok(names)
        }
    }
}

impl ServiceLister for ScmServiceLister {
    fn list_services(&self) -> Result<Vec<ServiceEntry>, EnumerationError> {
        let names = self.service_names()?;
        let manager = ServiceManager::local_computer(None::<&str>, ServiceManagerAccess::CONNECT)
            .map_err(|e| EnumerationError::Lister(e.to_string()))?;

        let mut out = Vec::with_capacity(names.len());
        for (name, display_name) in names {
            // An unreadable config leaves the command line empty; the service
            // is then skipped like one without an executable.
            let command_line = match manager
                .open_service(&name, ServiceAccess::QUERY_CONFIG)
                .and_then(|svc| svc.query_config())
            {
                Ok(cfg) => cfg.executable_path.to_string_lossy().into_owned(),
                Err(e) => {
                    svcguard_log!(Level::Warn, "services", "Cannot query config of {}: {}", name, e);
                    String::new()
                }
            };
            out.push(ServiceEntry { name, display_name, command_line });
        }
        svcguard_log!(Level::Debug, "services", "SCM returned {} service(s)", out.len());
        Ok(out)
    }
}
