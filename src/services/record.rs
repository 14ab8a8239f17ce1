// src/services/record.rs

//! Read-only per-run snapshot of a service and its derived paths.

use super::ServiceEntry;

const EXECUTABLE_EXTENSION: &str = ".exe";

/// Snapshot of one service, created fresh each run.
#[derive(Debug, Clone)]
pub struct ServiceRecord {
    pub name: String,
    pub display_name: String,
    pub raw_command_line: String,
    /// Executable path, or empty when the command line carries none.
    pub executable_path: String,
    /// Parent directory of `executable_path`, or empty.
    pub folder_path: String,
}

impl From<ServiceEntry> for ServiceRecord {
    fn from(entry: ServiceEntry) -> Self {
        let executable_path = executable_path(&entry.command_line);
        let folder_path = folder_path(&executable_path);
        ServiceRecord {
            name: entry.name,
            display_name: entry.display_name,
            raw_command_line: entry.command_line,
            executable_path,
            folder_path,
        }
    }
}

/// Extract the executable from a service command line: everything up to the
/// first `.exe` that ends a token, with surrounding quotes stripped.
pub fn executable_path(command_line: &str) -> String {
    // ASCII lowering keeps byte offsets aligned with the original.
    let lowered = command_line.to_ascii_lowercase();
    let mut from = 0;

    while let Some(hit) = lowered[from..].find(EXECUTABLE_EXTENSION) {
        let end = from + hit + EXECUTABLE_EXTENSION.len();
        let ends_token = command_line[end..]
            .chars()
            .next()
            .is_none_or(|c| c == '"' || c.is_whitespace());
        if ends_token {
            let exe = command_line[..end].trim().trim_matches('"').trim();
            // A bare file name is resolved through the search path, not from here.
            if !exe.contains(['\\', '/']) {
                return String::new();
            }
            return exe.to_string();
        }
        from = end;
    }
    String::new()
}

/// Parent directory of a Windows path; empty when there is none.
pub fn folder_path(executable: &str) -> String {
    match executable.rfind(['\\', '/']) {
        Some(idx) => {
            let parent = &executable[..idx];
            if parent.ends_with(':') {
                format!("{parent}\\")
            } else {
                parent.to_string()
            }
        }
        None => String::new(),
    }
}
