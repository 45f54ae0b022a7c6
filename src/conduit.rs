//! Calling-convention selection
//!
//! The platform either traps to the secure monitor (`smc`) or to the
//! hypervisor (`hvc`). Which one is a property of the whole machine, so the
//! choice is resolved once, by whichever channel is set up first, and is
//! then shared by every other channel.

use core::sync::atomic::{AtomicU8, Ordering};

use crate::error::{TransportError, TransportResult};

const UNRESOLVED: u8 = 0;
const RESOLVED_SMC: u8 = 1;
const RESOLVED_HVC: u8 = 2;

/// Privileged call instruction used to reach the firmware agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMechanism {
    /// Secure monitor call (`smc #0`)
    Smc,
    /// Hypervisor call (`hvc #0`)
    Hvc,
}

impl CallMechanism {
    /// Parse the platform's `method` token
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "smc" => Some(Self::Smc),
            "hvc" => Some(Self::Hvc),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Smc => "smc",
            Self::Hvc => "hvc",
        }
    }

    fn to_raw(self) -> u8 {
        match self {
            Self::Smc => RESOLVED_SMC,
            Self::Hvc => RESOLVED_HVC,
        }
    }

    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            RESOLVED_SMC => Some(Self::Smc),
            RESOLVED_HVC => Some(Self::Hvc),
            _ => None,
        }
    }
}

/// Once-resolved holder for the platform calling convention
///
/// Resolution is a single compare-and-set from the unresolved state, so
/// racing first-time setups agree on whichever mechanism landed first.
/// Failed resolutions never touch the state.
pub struct ConduitSelector {
    state: AtomicU8,
}

impl ConduitSelector {
    /// Create an unresolved selector
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(UNRESOLVED),
        }
    }

    /// Mechanism fixed by an earlier resolution, if any
    pub fn get(&self) -> Option<CallMechanism> {
        CallMechanism::from_raw(self.state.load(Ordering::Acquire))
    }

    pub fn is_resolved(&self) -> bool {
        self.get().is_some()
    }

    /// Resolve from an already-read configuration token
    ///
    /// `None` means the platform description carries no token at all.
    pub fn resolve(&self, configured_method: Option<&str>) -> TransportResult<CallMechanism> {
        self.resolve_with(|| {
            configured_method.ok_or(TransportError::ConfigurationError("method"))
        })
    }

    /// Resolve, reading the configuration only if nothing is resolved yet
    ///
    /// Once a mechanism is fixed `read_method` is never called, so a
    /// channel whose own description lacks the token still succeeds.
    pub fn resolve_with<'a, F>(&self, read_method: F) -> TransportResult<CallMechanism>
    where
        F: FnOnce() -> TransportResult<&'a str>,
    {
        if let Some(mechanism) = self.get() {
            return Ok(mechanism);
        }

        let token = read_method()?;
        let wanted = match CallMechanism::from_token(token) {
            Some(mechanism) => mechanism,
            None => {
                log::warn!("invalid \"method\" property: {}", token);
                return Err(TransportError::UnsupportedMechanism);
            }
        };

        match self.state.compare_exchange(
            UNRESOLVED,
            wanted.to_raw(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                log::debug!("firmware conduit resolved to {}", wanted.name());
                Ok(wanted)
            }
            // Lost the race; the winner's choice stands.
            Err(current) => {
                CallMechanism::from_raw(current).ok_or(TransportError::UnsupportedMechanism)
            }
        }
    }
}

impl Default for ConduitSelector {
    fn default() -> Self {
        Self::new()
    }
}

/// The platform-wide selector shared by every channel in the kernel
static PLATFORM_CONDUIT: ConduitSelector = ConduitSelector::new();

/// Get the platform-wide selector
pub fn platform_conduit() -> &'static ConduitSelector {
    &PLATFORM_CONDUIT
}
