// src/corrector.rs

//! Permission corrector: scans one path's ACL and fixes insecure grants.
//!
//! Per path: `Unchecked -> Scanning -> Clean`, or
//! `Scanning -> Remediating -> Remediated | PartiallyFailed`.
//! A failed ACL read aborts the run; a failed correction is recorded and the
//! scan moves on to the next pair. Nothing is retried.

use crate::acl::{convert_inheritance, AccessControlList, AclStore, Identity, Reacquired};
use crate::config::RunMode;
use crate::error::{CorrectionError, HardenError};
use crate::policy::{FlaggedRight, Policy, RemediationAction, NARROWED_RIGHTS};
use crate::svcguard_log;
use log::Level;
use std::path::Path;

/// Terminal state of one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathState {
    Clean,
    Remediated,
    PartiallyFailed,
    /// Audit mode: insecure pairs found, nothing written.
    Flagged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindingOutcome {
    Corrected,
    /// An earlier correction on the same path already removed it.
    AlreadyCorrected,
    Failed,
    /// Audit mode.
    Planned,
}

/// One insecure identity/right pair and what happened to it.
#[derive(Debug, Clone)]
pub struct Finding {
    pub identity: Identity,
    pub right: FlaggedRight,
    pub inherited: bool,
    pub action: RemediationAction,
    pub outcome: FindingOutcome,
}

#[derive(Debug)]
pub struct PathReport {
    pub path: String,
    pub service: String,
    pub state: PathState,
    pub findings: Vec<Finding>,
    pub inheritance_converted: bool,
    pub failures: Vec<CorrectionError>,
}

impl PathReport {
    pub fn insecure_found(&self) -> bool {
        !self.findings.is_empty()
    }

    /// At least one write reached the store.
    pub fn mutated(&self) -> bool {
        self.inheritance_converted
            || self.findings.iter().any(|f| f.outcome == FindingOutcome::Corrected)
    }
}

pub struct Corrector<'a, S: AclStore + ?Sized> {
    store: &'a S,
    policy: &'a Policy,
    mode: RunMode,
}

impl<'a, S: AclStore + ?Sized> Corrector<'a, S> {
    pub fn new(store: &'a S, policy: &'a Policy, mode: RunMode) -> Self {
        Self { store, policy, mode }
    }

    /// Secure `path` on behalf of `service`. An empty path is a no-op.
    pub fn secure(&self, path: &str, service: &str) -> Result<Option<PathReport>, HardenError> {
        if path.is_empty() {
            return Ok(None);
        }
        let target = Path::new(path);
        svcguard_log!(Level::Info, "corrector", "Checking permissions of {}", path);

        let mut acl = self.store.read(target).map_err(|source| HardenError::AclRead {
            service: service.to_string(),
            path: path.to_string(),
            source,
        })?;

        let pairs: Vec<(Identity, FlaggedRight, bool)> = acl
            .entries
            .iter()
            .flat_map(|entry| {
                self.policy
                    .insecure_rights(entry)
                    .into_iter()
                    .map(|right| (entry.identity.clone(), right, entry.is_inherited()))
            })
            .collect();

        let mut report = PathReport {
            path: path.to_string(),
            service: service.to_string(),
            state: PathState::Clean,
            findings: Vec::with_capacity(pairs.len()),
            inheritance_converted: false,
            failures: Vec::new(),
        };

        if pairs.is_empty() {
            svcguard_log!(Level::Info, "corrector", "[OK] No insecure permissions on {}", path);
            return Ok(Some(report));
        }

        let mut conversion_attempted = false;
        let mut inheritance_intact = false;
        for (identity, right, inherited) in pairs {
            let action = self.policy.action(path, &identity, right);
            svcguard_log!(
                Level::Warn,
                "corrector",
                "{} holds {} on {} (inherited={}), action: {}",
                identity,
                right,
                path,
                inherited,
                action
            );

            if self.mode == RunMode::Audit || action == RemediationAction::Skip {
                report.findings.push(Finding {
                    identity,
                    right,
                    inherited,
                    action,
                    outcome: FindingOutcome::Planned,
                });
                continue;
            }

            if inherited && !conversion_attempted {
                conversion_attempted = true;
                inheritance_intact = !self.break_inheritance(target, &mut acl, &mut report);
            }

            // With inheritance still on, the parent re-applies the entry on
            // every write, so removing or narrowing it would not stick.
            if inherited && inheritance_intact {
                let err = CorrectionError::InheritedEntryKept {
                    path: report.path.clone(),
                    identity: identity.to_string(),
                    right: right.named(),
                };
                svcguard_log!(Level::Error, "corrector", "{}", err);
                report.failures.push(err);
                report.findings.push(Finding {
                    identity,
                    right,
                    inherited,
                    action,
                    outcome: FindingOutcome::Failed,
                });
                continue;
            }

            let outcome = self.apply(target, &mut acl, &identity, right, action, &mut report);
            report.findings.push(Finding { identity, right, inherited, action, outcome });
        }

        report.state = if !report.failures.is_empty() {
            PathState::PartiallyFailed
        } else if self.mode == RunMode::Audit {
            PathState::Flagged
        } else {
            PathState::Remediated
        };

        match report.state {
            PathState::PartiallyFailed => svcguard_log!(
                Level::Error,
                "corrector",
                "{} was only partly secured ({} failure(s))",
                path,
                report.failures.len()
            ),
            PathState::Flagged => svcguard_log!(
                Level::Warn,
                "corrector",
                "{} has {} insecure permission(s), left unchanged",
                path,
                report.findings.len()
            ),
            _ => svcguard_log!(Level::Info, "corrector", "[OK] {} secured", path),
        }
        Ok(Some(report))
    }

    /// Convert inherited entries to explicit ones, then continue with the
    /// re-acquired ACL. Failure keeps the current copy and returns `false`.
    fn break_inheritance(&self, target: &Path, acl: &mut AccessControlList, report: &mut PathReport) -> bool {
        match convert_inheritance(self.store, target, acl) {
            Ok(Reacquired::Fresh(fresh)) => {
                svcguard_log!(
                    Level::Info,
                    "corrector",
                    "Converted inherited permissions on {} to explicit",
                    report.path
                );
                report.inheritance_converted = true;
                *acl = fresh;
                true
            }
            Ok(Reacquired::Stale { acl: converted, error }) => {
                svcguard_log!(
                    Level::Warn,
                    "corrector",
                    "Converted inheritance on {} but could not re-read it: {}",
                    report.path,
                    error
                );
                report.inheritance_converted = true;
                *acl = converted;
                true
            }
            Err(source) => {
                let err = CorrectionError::InheritanceConversion { path: report.path.clone(), source };
                svcguard_log!(Level::Error, "corrector", "{}", err);
                report.failures.push(err);
                false
            }
        }
    }

    /// Apply one correction and persist it. On a failed write the in-memory
    /// copy goes back to what it was before this correction.
    fn apply(
        &self,
        target: &Path,
        acl: &mut AccessControlList,
        identity: &Identity,
        right: FlaggedRight,
        action: RemediationAction,
        report: &mut PathReport,
    ) -> FindingOutcome {
        let before = acl.clone();
        match action {
            RemediationAction::NarrowToReadExecute => {
                if acl.narrow_grants(identity, NARROWED_RIGHTS) == 0 {
                    return FindingOutcome::AlreadyCorrected;
                }
            }
            RemediationAction::RemoveGrant => {
                if acl.remove_grants(identity, right.rights()) == 0 {
                    svcguard_log!(
                        Level::Info,
                        "corrector",
                        "{} no longer holds {} on {}",
                        identity,
                        right,
                        report.path
                    );
                    return FindingOutcome::AlreadyCorrected;
                }
            }
            RemediationAction::Skip => return FindingOutcome::Planned,
        }

        match self.store.write(target, acl) {
            Ok(()) => {
                svcguard_log!(
                    Level::Info,
                    "corrector",
                    "[OK] {} for {} on {}: {}",
                    right,
                    identity,
                    report.path,
                    action
                );
                FindingOutcome::Corrected
            }
            Err(source) => {
                *acl = before;
                let err = CorrectionError::RemediationApply {
                    path: report.path.clone(),
                    identity: identity.to_string(),
                    right: right.named(),
                    source,
                };
                svcguard_log!(Level::Error, "corrector", "{}", err);
                report.failures.push(err);
                FindingOutcome::Failed
            }
        }
    }
}
