// src/elevation.rs

/// Reports whether the current process holds administrative rights.
pub trait PrivilegeCheck {
    fn is_elevated(&self) -> bool;
}

/// Fixed answer, for callers that checked elevation elsewhere.
#[derive(Debug, Clone, Copy)]
pub struct AssumeElevated(pub bool);

impl PrivilegeCheck for AssumeElevated {
    fn is_elevated(&self) -> bool {
        self.0
    }
}
