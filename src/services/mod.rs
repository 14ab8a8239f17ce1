//! Registered services and the paths derived from their command lines.

pub mod record;

pub use record::{executable_path, folder_path, ServiceRecord};

use crate::error::EnumerationError;

/// One entry of the service manager's database.
#[derive(Debug, Clone)]
pub struct ServiceEntry {
    pub name: String,
    pub display_name: String,
    /// Binary path name exactly as registered, arguments included.
    pub command_line: String,
}

/// Lists every registered service.
pub trait ServiceLister {
    fn list_services(&self) -> Result<Vec<ServiceEntry>, EnumerationError>;
}
