//! Generic transport interface
//!
//! The messaging framework drives every transport through the same
//! operations table and owns the channel handles. A transport attaches its
//! private per-channel state to the handle at setup and must detach it at
//! free; the handle is the only strong owner of that state.

use crate::error::TransportResult;
use crate::platform::DeviceNode;
use crate::xfer::{ProtocolId, Xfer};

/// Largest message payload any transport in this crate carries
pub const MAX_MSG_SIZE: usize = 128;

/// Capabilities a transport publishes to the framework
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportDesc {
    /// Advisory bound on response latency; not enforced by the transport
    pub max_rx_timeout_ms: u32,
    /// Messages that may be outstanding on one channel
    pub max_msg: usize,
    /// Mailbox payload capacity in bytes
    pub max_msg_size: usize,
}

/// Direction a channel is requested for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Agent-to-platform commands
    Tx,
    /// Platform-to-agent notifications
    Rx,
}

impl Direction {
    pub fn is_tx(&self) -> bool {
        matches!(self, Self::Tx)
    }
}

/// Framework-assigned channel identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChanId(pub u32);

/// Framework-owned handle for one channel
pub struct ChanInfo<T> {
    pub id: ChanId,
    /// Description node of this channel
    pub node: DeviceNode,
    transport_info: Option<T>,
}

impl<T> ChanInfo<T> {
    pub fn new(id: ChanId, node: DeviceNode) -> Self {
        Self {
            id,
            node,
            transport_info: None,
        }
    }

    pub fn transport_info(&self) -> Option<&T> {
        self.transport_info.as_ref()
    }

    pub fn transport_info_mut(&mut self) -> Option<&mut T> {
        self.transport_info.as_mut()
    }

    pub fn is_configured(&self) -> bool {
        self.transport_info.is_some()
    }

    /// Attach transport state; any previous state is dropped
    pub fn attach(&mut self, info: T) {
        self.transport_info = Some(info);
    }

    /// Detach and hand back transport state
    pub fn detach(&mut self) -> Option<T> {
        self.transport_info.take()
    }
}

/// Upcalls from a transport into the framework
pub trait TransportHost {
    /// A response header is available on `chan`
    fn rx_callback(&self, chan: ChanId, msg_hdr: u32);

    /// Return `chan` and its registry slot `id` to the framework
    fn release_channel(&self, chan: ChanId, id: usize);
}

/// Operations table every transport implements
pub trait TransportOps {
    /// Per-channel transport state stored in the handle
    type Chan;

    fn desc(&self) -> &'static TransportDesc;

    /// Whether channel `idx` of `node` may be set up at all
    fn chan_available(&self, node: &DeviceNode, idx: usize) -> bool;

    /// Configure `cinfo` for `prot_id`, attaching transport state on success
    fn chan_setup(
        &self,
        cinfo: &mut ChanInfo<Self::Chan>,
        agent: &DeviceNode,
        prot_id: ProtocolId,
        dir: Direction,
    ) -> TransportResult<()>;

    /// Detach and release transport state, then hand `cinfo` back
    fn chan_free(&self, cinfo: &mut ChanInfo<Self::Chan>, host: &dyn TransportHost, id: usize);

    fn send_message(
        &self,
        cinfo: &mut ChanInfo<Self::Chan>,
        xfer: &Xfer,
        host: &dyn TransportHost,
    ) -> TransportResult<()>;

    /// The framework has consumed the response of the last send
    fn mark_txdone(&self, cinfo: &mut ChanInfo<Self::Chan>, ret: TransportResult<()>);

    fn fetch_response(&self, cinfo: &ChanInfo<Self::Chan>, xfer: &mut Xfer);

    fn poll_done(&self, cinfo: &ChanInfo<Self::Chan>, xfer: &Xfer) -> bool;
}
