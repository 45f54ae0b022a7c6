//! scmi-smc - SMC/HVC mailbox transport for firmware control messages
//!
//! Lets a kernel exchange fixed-format command/response messages with a
//! firmware agent running at a higher exception level. Commands are staged
//! in a shared-memory mailbox and delivered with a synchronous secure
//! monitor or hypervisor call; the response is in the mailbox by the time
//! the call returns.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
// Kernel code often needs explicit casts for register-sized values
#![allow(clippy::unnecessary_cast)]

pub mod conduit;
pub mod console;
pub mod error;
pub mod platform;
pub mod shmem;
pub mod smc;
pub mod smccc;
pub mod transport;
pub mod xfer;

#[cfg(test)]
mod sim;

pub use conduit::{platform_conduit, CallMechanism, ConduitSelector};
pub use error::{TransportError, TransportResult};
pub use platform::{DeviceNode, NodeId, PhysRegion, PlatformTree, PropValue};
pub use shmem::{MailboxMapper, SharedMemory};
pub use smc::{SmcChannel, SmcTransport, SMC_DESC};
pub use smccc::{ArmSmccc, FirmwareCall, SmcccRes};
pub use transport::{ChanId, ChanInfo, Direction, TransportDesc, TransportHost, TransportOps};
pub use xfer::{MsgHeader, ProtocolId, Xfer};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
