//! Transport error types
//!
//! Every failure the SMC/HVC transport can surface to the messaging
//! framework. Setup-time errors abort that channel's setup only; `send`
//! errors go straight back to the caller without retry.

use thiserror::Error;

/// errno values used by the surrounding kernel framework
pub mod errno {
    pub const ENXIO: i32 = 6;
    pub const ENODEV: i32 = 19;
    pub const EINVAL: i32 = 22;
    pub const EADDRNOTAVAIL: i32 = 99;
}

/// Errors reported by the SMC/HVC transport
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// A receive-only channel was requested; this transport only transmits
    #[error("receive channels are not supported by the smc transport")]
    UnsupportedDirection,

    /// The mailbox region is missing from the platform description or
    /// could not be mapped
    #[error("shared memory unavailable: {0}")]
    ResourceUnavailable(&'static str),

    /// A required platform property is missing or malformed
    #[error("configuration error: {0}")]
    ConfigurationError(&'static str),

    /// The calling-convention token names neither "smc" nor "hvc"
    #[error("unsupported calling convention")]
    UnsupportedMechanism,

    /// The privileged call returned a negative status
    #[error("firmware call failed with status {0}")]
    TransportCallFailed(i64),
}

impl TransportError {
    /// Negative errno value for frameworks that speak integer status codes
    pub fn errno(&self) -> i64 {
        match self {
            Self::UnsupportedDirection => -(errno::ENODEV as i64),
            Self::ResourceUnavailable(_) => -(errno::EADDRNOTAVAIL as i64),
            Self::ConfigurationError(_) => -(errno::ENXIO as i64),
            Self::UnsupportedMechanism => -(errno::EINVAL as i64),
            Self::TransportCallFailed(status) => *status,
        }
    }
}

/// Result alias for transport operations
pub type TransportResult<T> = Result<T, TransportError>;
