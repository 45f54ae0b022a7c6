//! ARM SMC Calling Convention invocation
//!
//! A firmware call passes a function identifier in `x0` and up to seven
//! arguments in `x1`-`x7`, and returns results in `x0`-`x3`. The call is
//! synchronous: the trap does not return until the firmware agent has
//! finished with the request.

use crate::conduit::CallMechanism;

/// Number of argument registers after the function identifier
pub const SMCCC_ARG_COUNT: usize = 7;

/// Standard SMCCC status codes (as returned in `w0`)
pub const SMCCC_RET_SUCCESS: i32 = 0;
pub const SMCCC_RET_NOT_SUPPORTED: i32 = -1;
pub const SMCCC_RET_NOT_REQUIRED: i32 = -2;
pub const SMCCC_RET_INVALID_PARAMETER: i32 = -3;

/// Result registers of a firmware call
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SmcccRes {
    pub a0: u64,
    pub a1: u64,
    pub a2: u64,
    pub a3: u64,
}

impl SmcccRes {
    /// Result carrying only a status in `a0`
    pub fn status(code: i64) -> Self {
        Self {
            a0: code as u64,
            ..Self::default()
        }
    }

    /// `a0` as the 32-bit signed status firmware reports in `w0`
    pub fn status_code(&self) -> i32 {
        self.a0 as u32 as i32
    }
}

/// Human-readable name of an SMCCC status code
pub fn status_name(code: i32) -> &'static str {
    match code {
        SMCCC_RET_SUCCESS => "SUCCESS",
        SMCCC_RET_NOT_SUPPORTED => "NOT_SUPPORTED",
        SMCCC_RET_NOT_REQUIRED => "NOT_REQUIRED",
        SMCCC_RET_INVALID_PARAMETER => "INVALID_PARAMETER",
        c if c > 0 => "POSITIVE",
        _ => "UNKNOWN",
    }
}

/// Issues synchronous privileged calls to the firmware agent
///
/// The real implementation is [`ArmSmccc`]; channels are generic over this
/// trait so a simulated agent can stand in for firmware.
pub trait FirmwareCall {
    /// Trap into firmware and block until it returns
    fn invoke(
        &self,
        mechanism: CallMechanism,
        function_id: u32,
        args: [u64; SMCCC_ARG_COUNT],
    ) -> SmcccRes;
}

/// Firmware calls through the real `smc`/`hvc` instructions
#[derive(Debug, Clone, Copy, Default)]
pub struct ArmSmccc;

impl FirmwareCall for ArmSmccc {
    fn invoke(
        &self,
        mechanism: CallMechanism,
        function_id: u32,
        args: [u64; SMCCC_ARG_COUNT],
    ) -> SmcccRes {
        match mechanism {
            CallMechanism::Smc => unsafe { arm_smccc_smc(function_id, args) },
            CallMechanism::Hvc => unsafe { arm_smccc_hvc(function_id, args) },
        }
    }
}

/// Makes a secure monitor call (SMC)
///
/// # Safety
///
/// Executes a real `smc #0`. The function id and arguments must be valid
/// for the firmware service behind it.
#[cfg(target_arch = "aarch64")]
#[inline(never)]
pub unsafe fn arm_smccc_smc(function_id: u32, args: [u64; SMCCC_ARG_COUNT]) -> SmcccRes {
    let (a0, a1, a2, a3): (u64, u64, u64, u64);
    core::arch::asm!(
        "smc #0",
        inout("x0") function_id as u64 => a0,
        inout("x1") args[0] => a1,
        inout("x2") args[1] => a2,
        inout("x3") args[2] => a3,
        inout("x4") args[3] => _,
        inout("x5") args[4] => _,
        inout("x6") args[5] => _,
        inout("x7") args[6] => _,
        // x8-x17 may be clobbered per SMCCC
        lateout("x8") _,
        lateout("x9") _,
        lateout("x10") _,
        lateout("x11") _,
        lateout("x12") _,
        lateout("x13") _,
        lateout("x14") _,
        lateout("x15") _,
        lateout("x16") _,
        lateout("x17") _,
        options(nostack),
    );
    SmcccRes { a0, a1, a2, a3 }
}

/// Makes a hypervisor call (HVC)
///
/// # Safety
///
/// Executes a real `hvc #0`. The function id and arguments must be valid
/// for the hypervisor service behind it.
#[cfg(target_arch = "aarch64")]
#[inline(never)]
pub unsafe fn arm_smccc_hvc(function_id: u32, args: [u64; SMCCC_ARG_COUNT]) -> SmcccRes {
    let (a0, a1, a2, a3): (u64, u64, u64, u64);
    core::arch::asm!(
        "hvc #0",
        inout("x0") function_id as u64 => a0,
        inout("x1") args[0] => a1,
        inout("x2") args[1] => a2,
        inout("x3") args[2] => a3,
        inout("x4") args[3] => _,
        inout("x5") args[4] => _,
        inout("x6") args[5] => _,
        inout("x7") args[6] => _,
        lateout("x8") _,
        lateout("x9") _,
        lateout("x10") _,
        lateout("x11") _,
        lateout("x12") _,
        lateout("x13") _,
        lateout("x14") _,
        lateout("x15") _,
        lateout("x16") _,
        lateout("x17") _,
        options(nostack),
    );
    SmcccRes { a0, a1, a2, a3 }
}

/// No firmware conduit exists off aarch64
///
/// # Safety
///
/// Always safe; reports `NOT_SUPPORTED`.
#[cfg(not(target_arch = "aarch64"))]
pub unsafe fn arm_smccc_smc(_function_id: u32, _args: [u64; SMCCC_ARG_COUNT]) -> SmcccRes {
    SmcccRes::status(SMCCC_RET_NOT_SUPPORTED as i64)
}

/// No firmware conduit exists off aarch64
///
/// # Safety
///
/// Always safe; reports `NOT_SUPPORTED`.
#[cfg(not(target_arch = "aarch64"))]
pub unsafe fn arm_smccc_hvc(_function_id: u32, _args: [u64; SMCCC_ARG_COUNT]) -> SmcccRes {
    SmcccRes::status(SMCCC_RET_NOT_SUPPORTED as i64)
}
