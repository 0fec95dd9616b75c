//! Syscall dispatcher
//!
//! This module decodes a syscall opcode raised by guest code, runs the bound
//! host function and then the post-call work it requested. Dispatch failures
//! are logged and counted but never reach the guest, which only observes a
//! call that did nothing.

use alloc::collections::BTreeMap;
use alloc::sync::Arc;

use crate::core::context::{HleContext, HleEnv};
use crate::core::encoding::Opcode;
use crate::core::function::HleCall;
use crate::core::post_call::PostCallOutcome;

/// Result of dispatching one opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The host function ran; carries the result of its post-call work
    Called(PostCallOutcome),
    /// The slot exists but has no host body
    Unimplemented,
    /// The opcode carries an invalid-function pattern
    InvalidOpcode,
    /// The module or function index points past the registry
    UnknownFunction,
}

impl DispatchOutcome {
    /// Whether the host function actually ran
    pub fn was_called(&self) -> bool {
        matches!(self, DispatchOutcome::Called(_))
    }
}

/// Dispatch statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Total number of dispatched opcodes
    pub total_calls: u64,
    /// Number of logged dispatch failures
    pub error_count: u64,
    /// Calls that landed on an unimplemented function
    pub unimplemented_calls: u64,
    /// Debug breaks that switched the core to stepping
    pub debug_breaks: u64,
    /// Successful calls by (module index, function index)
    pub calls_by_function: BTreeMap<(u8, u16), u64>,
}

impl DispatchStats {
    /// Number of successful calls into one function
    pub fn calls_to(&self, module_index: u8, func_index: u16) -> u64 {
        self.calls_by_function
            .get(&(module_index, func_index))
            .copied()
            .unwrap_or(0)
    }
}

impl HleContext {
    /// Dispatch a syscall opcode raised by guest code
    pub fn call_syscall(&mut self, op: Opcode, env: &mut HleEnv<'_>) -> DispatchOutcome {
        let (module_index, func_index) = op.decode();
        self.stats.total_calls += 1;

        if op.is_invalid() {
            let module = self
                .registry
                .module(module_index as usize)
                .map_or("unknown", |m| m.name.as_str());
            sys_error!("trying to call invalid syscall {:#010x} in module {}", op.raw(), module);
            self.stats.error_count += 1;
            #[cfg(feature = "debug")]
            debug_assert!(false, "invalid syscall {:#010x}", op.raw());
            return DispatchOutcome::InvalidOpcode;
        }

        let Some(module) = self.registry.module(module_index as usize) else {
            sys_error!("syscall {:#010x}: bad module index {}", op.raw(), module_index);
            self.stats.error_count += 1;
            return DispatchOutcome::UnknownFunction;
        };
        let Some(function) = module.functions.get(func_index as usize) else {
            sys_error!(
                "syscall {:#010x}: bad function index {} in module {}",
                op.raw(),
                func_index,
                module.name
            );
            self.stats.error_count += 1;
            return DispatchOutcome::UnknownFunction;
        };
        let Some(func) = function.func.as_ref() else {
            sys_error!("unimplemented HLE function {}::{}", module.name, function.name);
            self.stats.error_count += 1;
            self.stats.unimplemented_calls += 1;
            return DispatchOutcome::Unimplemented;
        };

        sys_trace!("{}::{}", module.name, function.name);
        let func = Arc::clone(func);
        let nid = function.nid;

        {
            let mut call = HleCall::new(&mut *env.cpu, &mut *env.memory, &mut self.after);
            func(&mut call);
        }
        *self
            .stats
            .calls_by_function
            .entry((module_index, func_index))
            .or_insert(0) += 1;

        if self.after.is_empty() {
            return DispatchOutcome::Called(PostCallOutcome::Completed);
        }

        let outcome = self.after.finish(nid, &mut *env.scheduler, &mut *env.debug);
        if outcome == PostCallOutcome::BreakEntered {
            self.stats.debug_breaks += 1;
        }
        DispatchOutcome::Called(outcome)
    }
}
