//! Controller and role error types

use core::fmt;

/// Controller operation result type
pub type Result<T> = core::result::Result<T, DeviceError>;

/// Errors reported by an installed role module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RoleError {
    /// The role stack could not bring up its side of the controller
    StartFailed,
    /// The role stack timed out waiting on hardware
    Timeout,
    /// The role stack is not in a state that allows the request
    InvalidState,
    /// The request is not supported by this role
    Unsupported,
}

/// Controller error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceError {
    /// DCCPARAMS reports more endpoints than the core supports
    TooManyEndpoints,
    /// USBMODE.CM did not latch the requested controller mode
    ModeMismatch,
    /// USBCMD.RST never self-cleared
    ResetTimeout,
    /// PORTSC.PHCD never acknowledged the PHY leaving low power
    PhyTimeout,
    /// No role module is usable for the configured dual-role mode
    NoRoles,
    /// The requested role has no installed module
    RoleNotInstalled,
    /// A role switch is in progress or pending
    Busy,
    /// Port test mode outside of the supported range
    InvalidTestMode,
    /// Endpoint index beyond the implemented endpoints
    InvalidEndpoint,
    /// Error bubbled up from a role module
    Role(RoleError),
}

impl From<RoleError> for DeviceError {
    fn from(err: RoleError) -> Self {
        Self::Role(err)
    }
}

impl fmt::Display for RoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartFailed => write!(f, "Role start failed"),
            Self::Timeout => write!(f, "Role timed out"),
            Self::InvalidState => write!(f, "Role in invalid state"),
            Self::Unsupported => write!(f, "Unsupported role operation"),
        }
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyEndpoints => write!(f, "Too many endpoints"),
            Self::ModeMismatch => write!(f, "Controller mode did not latch"),
            Self::ResetTimeout => write!(f, "Controller reset timed out"),
            Self::PhyTimeout => write!(f, "PHY low-power acknowledge timed out"),
            Self::NoRoles => write!(f, "No supported roles"),
            Self::RoleNotInstalled => write!(f, "Role not installed"),
            Self::Busy => write!(f, "Role switch in progress"),
            Self::InvalidTestMode => write!(f, "Invalid port test mode"),
            Self::InvalidEndpoint => write!(f, "Invalid endpoint"),
            Self::Role(err) => write!(f, "Role error: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::string::ToString;

    #[test]
    fn test_role_error_converts() {
        let err: DeviceError = RoleError::StartFailed.into();
        assert_eq!(err, DeviceError::Role(RoleError::StartFailed));
        assert_eq!(err.to_string(), "Role error: Role start failed");
    }

    #[test]
    fn test_display() {
        assert_eq!(DeviceError::TooManyEndpoints.to_string(), "Too many endpoints");
        assert_eq!(DeviceError::Busy.to_string(), "Role switch in progress");
    }
}
