//! Integration tests for whole runs: enumeration, ordering, shared-path
//! deduplication and the fatal/non-fatal split.

mod common;

use common::*;
use svcguard::acl::FileSystemRights;
use svcguard::config::RunMode;
use svcguard::corrector::PathState;
use svcguard::elevation::AssumeElevated;
use svcguard::error::{EnumerationError, HardenError};
use svcguard::policy::{Policy, NARROWED_RIGHTS};
use svcguard::run_hardening;

const ALPHA_DIR: &str = "C:\\Apps\\Alpha";
const ALPHA_EXE: &str = "C:\\Apps\\Alpha\\alpha.exe";
const BETA_EXE: &str = "C:\\Apps\\Alpha\\beta.exe";
const SYSTEM_DIR: &str = "C:\\Windows\\system32";
const SVCHOST: &str = "C:\\Windows\\system32\\svchost.exe";

fn run(lister: &StaticLister, store: &MemoryAclStore, mode: RunMode) -> svcguard::Result<svcguard::RunSummary> {
    run_hardening(&AssumeElevated(true), lister, store, &Policy::default(), mode)
}

#[test]
fn shared_folder_is_secured_once_for_both_services() {
    let lister = StaticLister(vec![
        service("beta", "Beta", "\"c:\\apps\\alpha\\BETA.exe\""),
        service("alpha", "Alpha", "C:\\Apps\\Alpha\\alpha.exe -k run"),
    ]);
    let mut folder = baseline();
    folder.push(inherited(everyone(), FileSystemRights::FULL_CONTROL));
    let store = MemoryAclStore::new()
        .with(ALPHA_DIR, folder)
        .with(ALPHA_EXE, baseline())
        .with(BETA_EXE, baseline());

    let summary = run(&lister, &store, RunMode::Remediate).unwrap();

    let folder_reports: Vec<_> = summary
        .reports
        .iter()
        .filter(|r| r.path.eq_ignore_ascii_case(ALPHA_DIR))
        .collect();
    assert_eq!(folder_reports.len(), 1);
    assert_eq!(folder_reports[0].service, "Alpha");
    assert!(folder_reports[0].inheritance_converted);
    assert_eq!(folder_reports[0].state, PathState::Remediated);

    // initial read and the re-read after conversion, nothing from Beta
    assert_eq!(store.reads_of(ALPHA_DIR), 2);
    assert_eq!(summary.duplicate_paths, 1);
    assert_eq!(summary.paths_scanned, 3);
    assert_eq!(summary.secured_services.names(), ["Alpha".to_string(), "Beta".to_string()]);
    assert!(!summary.all_secure());
    assert_eq!(store.acl(ALPHA_DIR).grants_for(&everyone()).count(), 0);
}

#[test]
fn sharing_a_clean_path_does_not_mark_a_service() {
    let lister = StaticLister(vec![
        service("alpha", "Alpha", ALPHA_EXE),
        service("beta", "Beta", BETA_EXE),
    ]);
    let mut alpha = baseline();
    alpha.push(allow(everyone(), FileSystemRights::WRITE));
    let store = MemoryAclStore::new()
        .with(ALPHA_DIR, baseline())
        .with(ALPHA_EXE, alpha)
        .with(BETA_EXE, baseline());

    let summary = run(&lister, &store, RunMode::Remediate).unwrap();
    assert_eq!(summary.secured_services.names(), ["Alpha".to_string()]);
}

#[test]
fn shared_system_host_is_narrowed_once() {
    let lister = StaticLister(vec![
        service("Core", "Core", "C:\\Windows\\system32\\svchost.exe -k netsvcs -p"),
        service("Dhcp", "DHCP Client", "C:\\WINDOWS\\system32\\svchost.exe -k LocalServiceNetworkRestricted"),
    ]);
    let mut host = baseline();
    host.push(allow(users(), FileSystemRights::MODIFY));
    let store = MemoryAclStore::new()
        .with(SYSTEM_DIR, baseline())
        .with(SVCHOST, host);

    let summary = run(&lister, &store, RunMode::Remediate).unwrap();

    assert_eq!(store.reads_of(SVCHOST), 1);
    assert_eq!(store.writes(), 1);
    let acl = store.acl(SVCHOST);
    let grants: Vec<_> = acl.grants_for(&users()).collect();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].rights(), NARROWED_RIGHTS);
    assert_eq!(summary.secured_services.names(), ["Core".to_string(), "DHCP Client".to_string()]);
}

#[test]
fn clean_system_reports_all_secure() {
    let lister = StaticLister(vec![
        service("alpha", "Alpha", ALPHA_EXE),
        service("Core", "Core", SVCHOST),
    ]);
    let store = MemoryAclStore::new()
        .with(ALPHA_DIR, baseline())
        .with(ALPHA_EXE, baseline())
        .with(SYSTEM_DIR, baseline())
        .with(SVCHOST, baseline());

    let summary = run(&lister, &store, RunMode::Remediate).unwrap();
    assert!(summary.all_secure());
    assert!(summary.secured_services.is_empty());
    assert!(summary.reports.iter().all(|r| r.state == PathState::Clean));
    assert_eq!(store.writes(), 0);
}

#[test]
fn empty_service_list_aborts_the_run() {
    let store = MemoryAclStore::new();
    let err = run(&StaticLister(Vec::new()), &store, RunMode::Remediate).unwrap_err();
    assert!(matches!(err, HardenError::Enumeration(EnumerationError::Empty)));
}

#[test]
fn lister_failure_aborts_the_run() {
    let store = MemoryAclStore::new();
    let err = run_hardening(
        &AssumeElevated(true),
        &FailingLister,
        &store,
        &Policy::default(),
        RunMode::Remediate,
    )
    .unwrap_err();
    assert!(matches!(err, HardenError::Enumeration(EnumerationError::Lister(_))));
}

#[test]
fn unelevated_run_touches_nothing() {
    let lister = StaticLister(vec![service("alpha", "Alpha", ALPHA_EXE)]);
    let store = MemoryAclStore::new().with(ALPHA_EXE, baseline());

    let err = run_hardening(
        &AssumeElevated(false),
        &lister,
        &store,
        &Policy::default(),
        RunMode::Remediate,
    )
    .unwrap_err();
    assert!(matches!(err, HardenError::NotElevated));
    assert_eq!(store.reads_of(ALPHA_EXE), 0);
}

#[test]
fn unreadable_path_aborts_after_earlier_services() {
    let lister = StaticLister(vec![
        service("alpha", "Alpha", ALPHA_EXE),
        service("zulu", "Zulu", "C:\\Apps\\Zulu\\zulu.exe"),
    ]);
    let mut alpha = baseline();
    alpha.push(allow(everyone(), FileSystemRights::FULL_CONTROL));
    let store = MemoryAclStore::new()
        .with(ALPHA_DIR, baseline())
        .with(ALPHA_EXE, alpha)
        .failing_read("C:\\Apps\\Zulu");

    let err = run(&lister, &store, RunMode::Remediate).unwrap_err();
    assert_eq!(err.item(), Some("C:\\Apps\\Zulu"));
    // Alpha was processed before the failure and stays fixed.
    assert_eq!(store.acl(ALPHA_EXE).grants_for(&everyone()).count(), 0);
    assert_eq!(store.reads_of("C:\\Apps\\Zulu\\zulu.exe"), 0);
}

#[test]
fn services_without_an_executable_are_skipped() {
    let lister = StaticLister(vec![
        service("kdriver", "Kernel Driver", ""),
        service("script", "Script Host", "C:\\Tools\\run.cmd"),
        service("panel", "Control Panel Host", "rundll32.exe shell32.dll,Control_RunDLL"),
        service("alpha", "Alpha", ALPHA_EXE),
    ]);
    let store = MemoryAclStore::new()
        .with(ALPHA_DIR, baseline())
        .with(ALPHA_EXE, baseline());

    let summary = run(&lister, &store, RunMode::Remediate).unwrap();
    assert_eq!(summary.services_seen, 4);
    assert_eq!(summary.paths_scanned, 2);
    assert_eq!(store.reads_of("C:\\Tools\\run.cmd"), 0);
    // a bare name would otherwise resolve against the working directory
    assert_eq!(store.reads_of("rundll32.exe"), 0);
}

#[test]
fn services_are_processed_in_display_name_order() {
    let lister = StaticLister(vec![
        service("z", "zeta", "C:\\Apps\\Zeta\\z.exe"),
        service("a", "Alpha", ALPHA_EXE),
        service("b", "beta", BETA_EXE),
    ]);
    let store = MemoryAclStore::new()
        .with("C:\\Apps\\Zeta", baseline())
        .with("C:\\Apps\\Zeta\\z.exe", baseline())
        .with(ALPHA_DIR, baseline())
        .with(ALPHA_EXE, baseline())
        .with(BETA_EXE, baseline());

    let summary = run(&lister, &store, RunMode::Remediate).unwrap();
    let order: Vec<&str> = summary.reports.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(
        order,
        [ALPHA_DIR, ALPHA_EXE, BETA_EXE, "C:\\Apps\\Zeta", "C:\\Apps\\Zeta\\z.exe"]
    );
}

#[test]
fn audit_run_flags_services_without_writing() {
    let lister = StaticLister(vec![service("alpha", "Alpha", ALPHA_EXE)]);
    let mut folder = baseline();
    folder.push(inherited(authenticated_users(), FileSystemRights::MODIFY));
    let store = MemoryAclStore::new()
        .with(ALPHA_DIR, folder)
        .with(ALPHA_EXE, baseline());

    let summary = run(&lister, &store, RunMode::Audit).unwrap();
    assert_eq!(summary.secured_services.names(), ["Alpha".to_string()]);
    assert_eq!(summary.report_for(ALPHA_DIR).map(|r| r.state), Some(PathState::Flagged));
    assert_eq!(store.writes(), 0);
}

#[test]
fn correction_failure_does_not_stop_the_run() {
    let lister = StaticLister(vec![
        service("alpha", "Alpha", ALPHA_EXE),
        service("beta", "Beta", "C:\\Apps\\Beta\\beta.exe"),
    ]);
    let mut alpha = baseline();
    alpha.push(allow(everyone(), FileSystemRights::MODIFY));
    let mut beta = baseline();
    beta.push(allow(everyone(), FileSystemRights::MODIFY));
    let store = MemoryAclStore::new()
        .with(ALPHA_DIR, baseline())
        .with(ALPHA_EXE, alpha)
        .failing_write(ALPHA_EXE)
        .with("C:\\Apps\\Beta", baseline())
        .with("C:\\Apps\\Beta\\beta.exe", beta);

    let summary = run(&lister, &store, RunMode::Remediate).unwrap();
    assert_eq!(
        summary.report_for(ALPHA_EXE).map(|r| r.state),
        Some(PathState::PartiallyFailed)
    );
    assert_eq!(
        summary.report_for("C:\\Apps\\Beta\\beta.exe").map(|r| r.state),
        Some(PathState::Remediated)
    );
    assert_eq!(summary.secured_services.names().len(), 2);
}
