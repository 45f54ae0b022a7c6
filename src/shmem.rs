//! Shared-memory mailbox contract
//!
//! The byte layout of the mailbox belongs to the shared-memory protocol
//! module. The transport only drives it through these operations: stage a
//! request, read the response header back, copy the response out, and test
//! for completion.

use crate::platform::PhysRegion;
use crate::xfer::Xfer;

/// A mapped mailbox owned by exactly one channel
pub trait SharedMemory {
    /// Encode `xfer`'s command into the mailbox and mark it busy
    fn tx_prepare(&mut self, xfer: &Xfer);

    /// Raw protocol header currently in the mailbox (non-destructive)
    fn read_header(&self) -> u32;

    /// Copy status and payload of the completed response into `xfer`
    fn fetch_response(&self, xfer: &mut Xfer);

    /// True once the mailbox holds the response to `xfer`
    fn poll_done(&self, xfer: &Xfer) -> bool;
}

/// Maps a described physical range into a usable mailbox
///
/// Dropping the returned mailbox releases the mapping.
pub trait MailboxMapper {
    type Mailbox: SharedMemory;

    /// `None` if the range cannot be mapped
    fn map(&self, region: PhysRegion) -> Option<Self::Mailbox>;
}
