//! SMC/HVC mailbox transport
//!
//! Each channel owns one shared-memory mailbox. A send stages the command
//! in the mailbox and traps into firmware with the channel's protocol id as
//! the only argument. The trap is synchronous, so by the time it returns
//! the response is already in the mailbox and the framework is told about
//! it on the spot. There is no interrupt path and no receive channel.
//!
//! One message may be outstanding per channel. The framework serializes
//! sends; nothing here locks or queues.

use crate::conduit::{platform_conduit, CallMechanism, ConduitSelector};
use crate::error::{TransportError, TransportResult};
use crate::platform::{
    DeviceNode, PhysRegion, PlatformTree, CONDUIT_NODE_PATH, PROP_METHOD, PROP_SHMEM, PROP_SMC_ID,
};
use crate::shmem::{MailboxMapper, SharedMemory};
use crate::smccc::{status_name, FirmwareCall, SMCCC_ARG_COUNT};
use crate::transport::{
    ChanId, ChanInfo, Direction, TransportDesc, TransportHost, TransportOps, MAX_MSG_SIZE,
};
use crate::xfer::{ProtocolId, Xfer};

/// Capabilities of the SMC/HVC transport
pub static SMC_DESC: TransportDesc = TransportDesc {
    max_rx_timeout_ms: 30,
    max_msg: 1,
    max_msg_size: MAX_MSG_SIZE,
};

// ============================================================================
// Channel
// ============================================================================

/// Transport state of one configured channel
pub struct SmcChannel<M> {
    /// Weak back-reference to the framework handle; cleared on free
    cinfo: Option<ChanId>,
    shmem: M,
    func_id: u32,
    prot_id: ProtocolId,
    mechanism: CallMechanism,
}

impl<M: SharedMemory> SmcChannel<M> {
    pub fn chan_id(&self) -> Option<ChanId> {
        self.cinfo
    }

    pub fn func_id(&self) -> u32 {
        self.func_id
    }

    pub fn prot_id(&self) -> ProtocolId {
        self.prot_id
    }

    pub fn mechanism(&self) -> CallMechanism {
        self.mechanism
    }

    /// Run one command/response round trip
    ///
    /// Blocks inside the trap until firmware has written the response.
    /// The response header is delivered to `host` before returning, even
    /// when the trap reports failure.
    pub fn send<F>(&mut self, firmware: &F, xfer: &Xfer, host: &dyn TransportHost) -> TransportResult<()>
    where
        F: FirmwareCall + ?Sized,
    {
        self.shmem.tx_prepare(xfer);

        let mut args = [0u64; SMCCC_ARG_COUNT];
        args[0] = self.prot_id.0 as u64;

        log::trace!(
            "{} 0x{:08x} proto 0x{:02x} msg 0x{:02x} seq {}",
            self.mechanism.name(),
            self.func_id,
            self.prot_id.0,
            xfer.hdr.id,
            xfer.hdr.seq
        );
        let status = firmware.invoke(self.mechanism, self.func_id, args).status_code();

        if let Some(chan) = self.cinfo {
            host.rx_callback(chan, self.shmem.read_header());
        }

        if status < 0 {
            log::warn!(
                "firmware call 0x{:08x} failed: {} ({})",
                self.func_id,
                status,
                status_name(status)
            );
            return Err(TransportError::TransportCallFailed(status as i64));
        }
        Ok(())
    }

    /// Copy the completed response out of the mailbox
    pub fn fetch_response(&self, xfer: &mut Xfer) {
        self.shmem.fetch_response(xfer);
    }

    /// Non-blocking completion check
    pub fn poll_done(&self, xfer: &Xfer) -> bool {
        self.shmem.poll_done(xfer)
    }

    fn sever(&mut self) -> Option<ChanId> {
        self.cinfo.take()
    }
}

// ============================================================================
// Transport
// ============================================================================

/// The SMC/HVC transport
///
/// Holds the collaborators shared by all channels: the platform
/// description, the mailbox mapper, the firmware conduit and the
/// calling-convention selector.
pub struct SmcTransport<'a, P, F> {
    platform: &'a PlatformTree,
    mapper: P,
    firmware: F,
    conduit: &'a ConduitSelector,
}

impl<'a, P: MailboxMapper, F: FirmwareCall> SmcTransport<'a, P, F> {
    pub fn new(platform: &'a PlatformTree, mapper: P, firmware: F, conduit: &'a ConduitSelector) -> Self {
        Self {
            platform,
            mapper,
            firmware,
            conduit,
        }
    }

    /// Transport using the kernel-wide calling-convention selector
    pub fn with_platform_conduit(platform: &'a PlatformTree, mapper: P, firmware: F) -> Self {
        Self::new(platform, mapper, firmware, platform_conduit())
    }

    /// Mailbox range for a channel: its own `shmem` reference, else the agent's
    fn shmem_region(&self, chan_node: &DeviceNode, agent: &DeviceNode) -> TransportResult<PhysRegion> {
        let shmem_node = self
            .platform
            .parse_ref(chan_node, PROP_SHMEM)
            .or_else(|| self.platform.parse_ref(agent, PROP_SHMEM));

        shmem_node.and_then(|node| node.address(0)).ok_or_else(|| {
            log::error!("{}: failed to get tx shared memory", chan_node.path);
            TransportError::ResourceUnavailable("shmem")
        })
    }

    /// Build the transport state for one channel
    ///
    /// Nothing is attached to the framework handle here; on failure any
    /// mailbox mapping made so far is released when it drops.
    pub fn setup_channel(
        &self,
        chan: ChanId,
        chan_node: &DeviceNode,
        agent: &DeviceNode,
        prot_id: ProtocolId,
        dir: Direction,
    ) -> TransportResult<SmcChannel<P::Mailbox>> {
        if !dir.is_tx() {
            return Err(TransportError::UnsupportedDirection);
        }

        let region = self.shmem_region(chan_node, agent)?;
        let shmem = self.mapper.map(region).ok_or_else(|| {
            log::error!(
                "{}: failed to map tx shared memory at 0x{:x}",
                agent.path,
                region.base
            );
            TransportError::ResourceUnavailable("ioremap")
        })?;

        let func_id = agent.read_u32(PROP_SMC_ID).ok_or_else(|| {
            log::error!("{}: missing {} property", agent.path, PROP_SMC_ID);
            TransportError::ConfigurationError(PROP_SMC_ID)
        })?;

        let platform = self.platform;
        let mechanism = self.conduit.resolve_with(|| {
            let node = platform.find_by_path(CONDUIT_NODE_PATH).ok_or_else(|| {
                log::error!("not able to find {} node", CONDUIT_NODE_PATH);
                TransportError::ConfigurationError(CONDUIT_NODE_PATH)
            })?;
            node.read_string(PROP_METHOD)
                .ok_or(TransportError::ConfigurationError(PROP_METHOD))
        })?;

        log::debug!(
            "channel {} ready: proto 0x{:02x} via {} 0x{:08x}",
            chan.0,
            prot_id.0,
            mechanism.name(),
            func_id
        );

        Ok(SmcChannel {
            cinfo: Some(chan),
            shmem,
            func_id,
            prot_id,
            mechanism,
        })
    }
}

impl<'a, P: MailboxMapper, F: FirmwareCall> TransportOps for SmcTransport<'a, P, F> {
    type Chan = SmcChannel<P::Mailbox>;

    fn desc(&self) -> &'static TransportDesc {
        &SMC_DESC
    }

    fn chan_available(&self, _node: &DeviceNode, _idx: usize) -> bool {
        true
    }

    fn chan_setup(
        &self,
        cinfo: &mut ChanInfo<Self::Chan>,
        agent: &DeviceNode,
        prot_id: ProtocolId,
        dir: Direction,
    ) -> TransportResult<()> {
        let chan = self.setup_channel(cinfo.id, &cinfo.node, agent, prot_id, dir)?;
        cinfo.attach(chan);
        Ok(())
    }

    fn chan_free(&self, cinfo: &mut ChanInfo<Self::Chan>, host: &dyn TransportHost, id: usize) {
        // Both directions of the relation are cut before anything is released.
        let chan = cinfo.detach().map(|mut chan| {
            chan.sever();
            chan
        });

        log::debug!("channel {} freed", cinfo.id.0);
        host.release_channel(cinfo.id, id);
        drop(chan);
    }

    fn send_message(
        &self,
        cinfo: &mut ChanInfo<Self::Chan>,
        xfer: &Xfer,
        host: &dyn TransportHost,
    ) -> TransportResult<()> {
        let chan = cinfo
            .transport_info_mut()
            .ok_or(TransportError::ResourceUnavailable("channel not set up"))?;
        chan.send(&self.firmware, xfer, host)
    }

    fn mark_txdone(&self, _cinfo: &mut ChanInfo<Self::Chan>, _ret: TransportResult<()>) {
        // The mailbox is free again as soon as the trap returns.
    }

    fn fetch_response(&self, cinfo: &ChanInfo<Self::Chan>, xfer: &mut Xfer) {
        if let Some(chan) = cinfo.transport_info() {
            chan.fetch_response(xfer);
        }
    }

    fn poll_done(&self, cinfo: &ChanInfo<Self::Chan>, xfer: &Xfer) -> bool {
        cinfo
            .transport_info()
            .map(|chan| chan.poll_done(xfer))
            .unwrap_or(false)
    }
}
