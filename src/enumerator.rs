// src/enumerator.rs

//! Service enumerator & deduplicator.
//!
//! Drives the corrector over every service in display-name order, folder
//! before file, touching each distinct path at most once per run.

use crate::acl::AclStore;
use crate::config::RunMode;
use crate::corrector::{Corrector, PathReport};
use crate::elevation::PrivilegeCheck;
use crate::error::{EnumerationError, HardenError, Result};
use crate::policy::Policy;
use crate::services::{ServiceLister, ServiceRecord};
use crate::svcguard_log;
use log::Level;
use std::collections::HashSet;

/// Paths already processed this run. Keys are case-folded.
#[derive(Debug, Default)]
pub struct PathVisitSet {
    files: HashSet<String>,
    folders: HashSet<String>,
}

impl PathVisitSet {
    /// `true` the first time `path` is seen as a folder.
    pub fn visit_folder(&mut self, path: &str) -> bool {
        self.folders.insert(path.to_lowercase())
    }

    /// `true` the first time `path` is seen as a file.
    pub fn visit_file(&mut self, path: &str) -> bool {
        self.files.insert(path.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.files.len() + self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Display names of services with at least one insecure entry, first-flagged
/// order, no duplicates.
#[derive(Debug, Default, Clone)]
pub struct SecuredServicesLog {
    names: Vec<String>,
}

impl SecuredServicesLog {
    /// Append unless already present. Returns whether it was added.
    pub fn record(&mut self, display_name: &str) -> bool {
        if self.names.iter().any(|n| n == display_name) {
            return false;
        }
        self.names.push(display_name.to_string());
        true
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Everything a run produced.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub secured_services: SecuredServicesLog,
    pub reports: Vec<PathReport>,
    pub services_seen: usize,
    pub paths_scanned: usize,
    pub duplicate_paths: usize,
}

impl RunSummary {
    pub fn all_secure(&self) -> bool {
        self.secured_services.is_empty()
    }

    /// Reports for `path`, compared case-insensitively.
    pub fn report_for(&self, path: &str) -> Option<&PathReport> {
        self.reports.iter().find(|r| r.path.eq_ignore_ascii_case(path))
    }

    fn log_summary(&self) {
        svcguard_log!(
            Level::Info,
            "enumerator",
            "{} service(s), {} path(s) scanned, {} shared path(s) skipped",
            self.services_seen,
            self.paths_scanned,
            self.duplicate_paths
        );
        if self.all_secure() {
            svcguard_log!(Level::Info, "enumerator", "[OK] All service executables and folders were already secure");
            return;
        }
        svcguard_log!(
            Level::Warn,
            "enumerator",
            "Insecure permissions found for {} service(s):",
            self.secured_services.names().len()
        );
        for name in self.secured_services.names() {
            svcguard_log!(Level::Warn, "enumerator", "  {}", name);
        }
    }
}

pub struct Enumerator<'a, L: ServiceLister + ?Sized, S: AclStore + ?Sized> {
    lister: &'a L,
    corrector: Corrector<'a, S>,
}

impl<'a, L: ServiceLister + ?Sized, S: AclStore + ?Sized> Enumerator<'a, L, S> {
    pub fn new(lister: &'a L, store: &'a S, policy: &'a Policy, mode: RunMode) -> Self {
        Self { lister, corrector: Corrector::new(store, policy, mode) }
    }

    /// Fetch services sorted by display name (case-insensitive, stable).
    pub fn services(&self) -> Result<Vec<ServiceRecord>> {
        let entries = self.lister.list_services()?;
        if entries.is_empty() {
            return Err(EnumerationError::Empty.into());
        }
        let mut records: Vec<ServiceRecord> = entries.into_iter().map(ServiceRecord::from).collect();
        records.sort_by_cached_key(|r| r.display_name.to_uppercase());
        Ok(records)
    }

    /// One full pass over all services. Any fatal error aborts the pass and no
    /// summary is produced.
    pub fn run(&self) -> Result<RunSummary> {
        let services = self.services()?;
        svcguard_log!(Level::Info, "enumerator", "Found {} service(s)", services.len());

        let mut visited = PathVisitSet::default();
        let mut flagged_paths: HashSet<String> = HashSet::new();
        let mut summary = RunSummary { services_seen: services.len(), ..RunSummary::default() };

        for service in &services {
            svcguard_log!(
                Level::Debug,
                "enumerator",
                "{} ({}): {}",
                service.display_name,
                service.name,
                service.raw_command_line
            );

            let targets = [
                (service.folder_path.as_str(), true),
                (service.executable_path.as_str(), false),
            ];
            for (path, is_folder) in targets {
                if path.is_empty() {
                    continue;
                }
                let first_visit = if is_folder {
                    visited.visit_folder(path)
                } else {
                    visited.visit_file(path)
                };

                if !first_visit {
                    summary.duplicate_paths += 1;
                    svcguard_log!(Level::Debug, "enumerator", "{} already processed this run", path);
                    if flagged_paths.contains(&path.to_lowercase()) {
                        summary.secured_services.record(&service.display_name);
                    }
                    continue;
                }

                let Some(report) = self.corrector.secure(path, &service.display_name)? else {
                    continue;
                };
                summary.paths_scanned += 1;
                if report.insecure_found() {
                    flagged_paths.insert(path.to_lowercase());
                    summary.secured_services.record(&service.display_name);
                }
                summary.reports.push(report);
            }
        }

        summary.log_summary();
        Ok(summary)
    }
}

/// Refuse to run without elevation, then run one pass.
pub fn run_hardening<L, S, P>(
    privileges: &P,
    lister: &L,
    store: &S,
    policy: &Policy,
    mode: RunMode,
) -> Result<RunSummary>
where
    L: ServiceLister + ?Sized,
    S: AclStore + ?Sized,
    P: PrivilegeCheck + ?Sized,
{
    if !privileges.is_elevated() {
        return Err(HardenError::NotElevated);
    }
    svcguard_log!(Level::Info, "enumerator", "Run started (mode={:?})", mode);
    Enumerator::new(lister, store, policy, mode).run()
}
