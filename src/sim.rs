//! Simulated firmware agent for unit tests
//!
//! `SimFirmware` plays the platform side: when trapped into, it consumes
//! the command staged in the shared mailbox and writes a response back
//! before returning, exactly like a synchronous firmware call.

use std::sync::Arc;
use std::vec::Vec;

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use spin::Mutex;

use crate::conduit::CallMechanism;
use crate::platform::{DeviceNode, NodeId, PhysRegion, PlatformTree, PropValue};
use crate::platform::{CONDUIT_NODE_PATH, PROP_METHOD, PROP_SHMEM, PROP_SMC_ID};
use crate::shmem::{MailboxMapper, SharedMemory};
use crate::smccc::{FirmwareCall, SmcccRes, SMCCC_ARG_COUNT};
use crate::transport::{ChanId, TransportHost, MAX_MSG_SIZE};
use crate::xfer::{header_token, Xfer};

pub const SMC_ID: u32 = 0xC200_0001;
pub const AGENT_NODE: NodeId = NodeId(1);
pub const CHANNEL_NODE: NodeId = NodeId(2);
pub const SHMEM_NODE: NodeId = NodeId(3);
pub const ALT_SHMEM_NODE: NodeId = NodeId(4);
pub const CONDUIT_NODE: NodeId = NodeId(5);
pub const SHMEM_BASE: u64 = 0x4e00_0000;
pub const ALT_SHMEM_BASE: u64 = 0x4e00_1000;

// ============================================================================
// Platform description
// ============================================================================

fn build_platform(method: Option<&str>, with_shmem: bool) -> PlatformTree {
    let mut tree = PlatformTree::new();

    let mut agent = DeviceNode::new(AGENT_NODE, "/firmware/scmi").unwrap();
    agent.set_property(PROP_SMC_ID, PropValue::U32(SMC_ID));
    if with_shmem {
        agent.set_property(PROP_SHMEM, PropValue::Ref(SHMEM_NODE));
    }
    tree.add(agent);

    tree.add(DeviceNode::new(CHANNEL_NODE, "/firmware/scmi/protocol@10").unwrap());

    for (id, path, base) in [
        (SHMEM_NODE, "/reserved-memory/scmi-shmem@4e000000", SHMEM_BASE),
        (ALT_SHMEM_NODE, "/reserved-memory/scmi-shmem@4e001000", ALT_SHMEM_BASE),
    ] {
        let mut node = DeviceNode::new(id, path).unwrap();
        node.add_region(PhysRegion::new(base, MAX_MSG_SIZE as u64));
        tree.add(node);
    }

    if let Some(method) = method {
        let mut psci = DeviceNode::new(CONDUIT_NODE, CONDUIT_NODE_PATH).unwrap();
        psci.set_property(PROP_METHOD, PropValue::string(method).unwrap());
        tree.add(psci);
    }

    tree
}

/// Agent, one channel node, two mailboxes and a conduit node with `method`
pub fn platform(method: &str, with_shmem: bool) -> PlatformTree {
    build_platform(Some(method), with_shmem)
}

/// Same as [`platform`] but without the conduit node
pub fn platform_without_conduit() -> PlatformTree {
    build_platform(None, true)
}

pub fn agent_node(tree: &PlatformTree) -> DeviceNode {
    tree.find_by_id(AGENT_NODE).unwrap().clone()
}

pub fn channel_node(tree: &PlatformTree) -> DeviceNode {
    tree.find_by_id(CHANNEL_NODE).unwrap().clone()
}

// ============================================================================
// Mailbox
// ============================================================================

/// Contents of the simulated shared-memory area
#[derive(Debug, Default)]
struct MailboxState {
    channel_free: bool,
    header: u32,
    status: i32,
    payload: Vec<u8>,
}

/// A mapping of the simulated mailbox
pub struct SimMailbox {
    state: Arc<Mutex<MailboxState>>,
    live: Arc<AtomicUsize>,
}

impl SharedMemory for SimMailbox {
    fn tx_prepare(&mut self, xfer: &Xfer) {
        let mut st = self.state.lock();
        st.channel_free = false;
        st.header = xfer.hdr.pack();
        st.status = 0;
        st.payload.clear();
        st.payload.extend_from_slice(&xfer.tx);
    }

    fn read_header(&self) -> u32 {
        self.state.lock().header
    }

    fn fetch_response(&self, xfer: &mut Xfer) {
        let st = self.state.lock();
        xfer.status = st.status;
        let len = match xfer.rx_len {
            0 => st.payload.len(),
            n => n.min(st.payload.len()),
        };
        xfer.rx.clear();
        let _ = xfer.rx.extend_from_slice(&st.payload[..len.min(MAX_MSG_SIZE)]);
    }

    fn poll_done(&self, xfer: &Xfer) -> bool {
        let st = self.state.lock();
        st.channel_free && header_token(st.header) == xfer.hdr.seq
    }
}

impl Drop for SimMailbox {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Hands out mappings of the firmware's mailbox
#[derive(Clone)]
pub struct SimMapper {
    state: Arc<Mutex<MailboxState>>,
    live: Arc<AtomicUsize>,
    maps: Arc<Mutex<Vec<PhysRegion>>>,
    fail_next: Arc<AtomicBool>,
}

impl SimMapper {
    pub fn new(firmware: &SimFirmware) -> Self {
        Self {
            state: Arc::clone(&firmware.mailbox),
            live: Arc::new(AtomicUsize::new(0)),
            maps: Arc::new(Mutex::new(Vec::new())),
            fail_next: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn fail_next_map(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Number of successful map calls so far
    pub fn map_count(&self) -> usize {
        self.maps.lock().len()
    }

    pub fn mapped_regions(&self) -> Vec<PhysRegion> {
        self.maps.lock().clone()
    }

    /// Mappings not yet dropped
    pub fn live_mappings(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl MailboxMapper for SimMapper {
    type Mailbox = SimMailbox;

    fn map(&self, region: PhysRegion) -> Option<SimMailbox> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return None;
        }
        self.maps.lock().push(region);
        self.live.fetch_add(1, Ordering::SeqCst);
        Some(SimMailbox {
            state: Arc::clone(&self.state),
            live: Arc::clone(&self.live),
        })
    }
}

// ============================================================================
// Firmware
// ============================================================================

/// One recorded trap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimCall {
    pub mechanism: CallMechanism,
    pub function_id: u32,
    pub args: [u64; SMCCC_ARG_COUNT],
}

/// Simulated firmware agent behind the trap
#[derive(Clone)]
pub struct SimFirmware {
    mailbox: Arc<Mutex<MailboxState>>,
    response: Arc<Mutex<Option<Vec<u8>>>>,
    ret: Arc<Mutex<i64>>,
    calls: Arc<Mutex<Vec<SimCall>>>,
    last_request: Arc<Mutex<Option<Vec<u8>>>>,
}

impl SimFirmware {
    pub fn new() -> Self {
        Self {
            mailbox: Arc::new(Mutex::new(MailboxState {
                channel_free: true,
                ..MailboxState::default()
            })),
            response: Arc::new(Mutex::new(None)),
            ret: Arc::new(Mutex::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Payload for subsequent responses; by default the request is echoed
    pub fn respond_with(&self, payload: &[u8]) {
        *self.response.lock() = Some(payload.to_vec());
    }

    /// Value returned in `a0` by subsequent traps
    pub fn set_return(&self, ret: i64) {
        *self.ret.lock() = ret;
    }

    pub fn calls(&self) -> Vec<SimCall> {
        self.calls.lock().clone()
    }

    pub fn last_request(&self) -> Option<Vec<u8>> {
        self.last_request.lock().clone()
    }
}

impl FirmwareCall for SimFirmware {
    fn invoke(
        &self,
        mechanism: CallMechanism,
        function_id: u32,
        args: [u64; SMCCC_ARG_COUNT],
    ) -> SmcccRes {
        self.calls.lock().push(SimCall {
            mechanism,
            function_id,
            args,
        });

        let mut st = self.mailbox.lock();
        if !st.channel_free {
            let request = core::mem::take(&mut st.payload);
            st.payload = match self.response.lock().as_ref() {
                Some(payload) => payload.clone(),
                None => request.clone(),
            };
            *self.last_request.lock() = Some(request);
            st.status = 0;
            st.channel_free = true;
        }

        SmcccRes::status(*self.ret.lock())
    }
}

// ============================================================================
// Framework
// ============================================================================

/// Records upcalls from the transport
#[derive(Default)]
pub struct SimHost {
    rx: Mutex<Vec<(ChanId, u32)>>,
    released: Mutex<Vec<(ChanId, usize)>>,
}

impl SimHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rx_headers(&self) -> Vec<(ChanId, u32)> {
        self.rx.lock().clone()
    }

    pub fn released(&self) -> Vec<(ChanId, usize)> {
        self.released.lock().clone()
    }
}

impl TransportHost for SimHost {
    fn rx_callback(&self, chan: ChanId, msg_hdr: u32) {
        self.rx.lock().push((chan, msg_hdr));
    }

    fn release_channel(&self, chan: ChanId, id: usize) {
        self.released.lock().push((chan, id));
    }
}
