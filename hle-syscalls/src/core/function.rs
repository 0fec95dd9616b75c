//! Host function entries and the call-time view they run against

use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;

use hle_api::{GuestCpu, GuestMemory, Nid};

use crate::core::post_call::PostCallState;
use crate::mips;

/// A host implementation of a guest-visible function
pub type HleFunc = Arc<dyn Fn(&mut HleCall<'_>) + Send + Sync>;

/// One exported function of an HLE module
#[derive(Clone)]
pub struct HleFunction {
    /// NID the guest imports the function by
    pub nid: Nid,
    /// Display name
    pub name: String,
    /// Host implementation, `None` when the slot is known but not implemented
    pub func: Option<HleFunc>,
}

impl HleFunction {
    /// Create an implemented function entry
    pub fn new<F>(nid: Nid, name: &str, func: F) -> Self
    where
        F: Fn(&mut HleCall<'_>) + Send + Sync + 'static,
    {
        Self {
            nid,
            name: name.into(),
            func: Some(Arc::new(func)),
        }
    }

    /// Create a known-but-unimplemented function entry
    pub fn unimplemented(nid: Nid, name: &str) -> Self {
        Self {
            nid,
            name: name.into(),
            func: None,
        }
    }

    /// Whether a host body is bound
    pub fn is_implemented(&self) -> bool {
        self.func.is_some()
    }
}

impl fmt::Debug for HleFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HleFunction")
            .field("nid", &format_args!("{:#010x}", self.nid))
            .field("name", &self.name)
            .field("implemented", &self.is_implemented())
            .finish()
    }
}

/// What a host function sees while it runs
///
/// Arguments and results travel through the guest register file; follow-up
/// work (rescheduling, callbacks, interrupts, debug breaks) is requested
/// through the post-call methods and carried out after the function returns.
pub struct HleCall<'a> {
    /// Guest register file
    pub cpu: &'a mut dyn GuestCpu,
    /// Guest address space
    pub memory: &'a mut dyn GuestMemory,
    after: &'a mut PostCallState,
}

impl<'a> HleCall<'a> {
    pub(crate) fn new(
        cpu: &'a mut dyn GuestCpu,
        memory: &'a mut dyn GuestMemory,
        after: &'a mut PostCallState,
    ) -> Self {
        Self { cpu, memory, after }
    }

    /// Reads the n-th register argument (a0-a3, t0-t3)
    pub fn arg(&self, n: usize) -> u32 {
        debug_assert!(n < mips::REGISTER_ARGS, "register argument {} out of range", n);
        self.cpu.gpr(mips::REG_A0 + n)
    }

    /// Writes the return value register
    pub fn set_return(&mut self, value: u32) {
        self.cpu.set_gpr(mips::REG_V0, value);
    }

    /// Writes a 64-bit return value across v0/v1
    pub fn set_return_u64(&mut self, value: u64) {
        self.cpu.set_gpr(mips::REG_V0, value as u32);
        self.cpu.set_gpr(mips::REG_V1, (value >> 32) as u32);
    }

    /// Reschedule once the call returns
    pub fn reschedule<'r>(&mut self, reason: impl Into<Option<&'r str>>) {
        self.after.reschedule(reason);
    }

    /// Reschedule once the call returns, optionally processing callbacks
    pub fn reschedule_with_callbacks<'r>(&mut self, callbacks: bool, reason: impl Into<Option<&'r str>>) {
        self.after.reschedule_with_callbacks(callbacks, reason);
    }

    /// Run one pending interrupt once the call returns
    pub fn run_interrupts(&mut self) {
        self.after.run_interrupts();
    }

    /// Process every thread's callbacks once the call returns
    pub fn check_all_callbacks(&mut self) {
        self.after.check_all_callbacks();
    }

    /// Process the current thread's callbacks once the call returns
    pub fn check_current_callbacks(&mut self) {
        self.after.check_current_callbacks();
    }

    /// Enter the debugger after this (or the next meaningful) call
    pub fn debug_break(&mut self) {
        self.after.debug_break();
    }

    /// Direct access to the post-call state
    pub fn after_syscall(&mut self) -> &mut PostCallState {
        &mut *self.after
    }
}
