//! HLE core context
//!
//! Everything the dispatch path mutates lives here and is passed by
//! reference; there is no process-wide registry.

use alloc::vec::Vec;

use hle_api::{DebugHost, ErrorContext, GuestAddr, GuestCpu, GuestMemory, HleConfig, Nid, Result, Scheduler};

use crate::core::dispatcher::DispatchStats;
use crate::core::patcher::SyscallPatcher;
use crate::core::post_call::PostCallState;
use crate::core::registry::{ModuleRegistrar, ModuleRegistry};

/// The machine a dispatched call runs against
pub struct HleEnv<'a> {
    /// Guest register file
    pub cpu: &'a mut dyn GuestCpu,
    /// Guest address space
    pub memory: &'a mut dyn GuestMemory,
    /// Thread scheduler hooks
    pub scheduler: &'a mut dyn Scheduler,
    /// Debugger hooks
    pub debug: &'a mut dyn DebugHost,
}

/// Registry, call-site state and pending post-call work of one emulated core
pub struct HleContext {
    pub(crate) config: HleConfig,
    pub(crate) registry: ModuleRegistry,
    pub(crate) patcher: SyscallPatcher,
    pub(crate) after: PostCallState,
    pub(crate) stats: DispatchStats,
}

impl HleContext {
    /// Create a context from a validated configuration
    pub fn new(config: HleConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            registry: ModuleRegistry::new(),
            patcher: SyscallPatcher::new(config.prune_resolved_syscalls),
            after: PostCallState::new(&config),
            stats: DispatchStats::default(),
            config,
        })
    }

    /// Run every registrar against the module registry
    pub fn init(&mut self, registrars: &[ModuleRegistrar]) -> Result<()> {
        for registrar in registrars {
            registrar(&mut self.registry).context("module registration")?;
        }
        sys_info!("HLE initialized with {} modules", self.registry.len());
        Ok(())
    }

    /// Drop all modules, call-site state, pending work and counters
    pub fn shutdown(&mut self) {
        self.registry.clear();
        self.patcher.clear();
        self.after.clear();
        self.stats = DispatchStats::default();
        sys_info!("HLE shut down");
    }

    /// Bind a guest call site, see [`SyscallPatcher::write_syscall`]
    pub fn write_syscall(
        &mut self,
        memory: &mut dyn GuestMemory,
        module_name: &str,
        nid: Nid,
        site: GuestAddr,
    ) -> Result<()> {
        self.patcher
            .write_syscall(&self.registry, memory, module_name, nid, site)
    }

    /// Bind deferred imports to guest code, see [`SyscallPatcher::resolve_syscall`]
    pub fn resolve_syscall(
        &mut self,
        memory: &mut dyn GuestMemory,
        module_name: &str,
        nid: Nid,
        target: GuestAddr,
    ) -> Result<usize> {
        self.patcher.resolve_syscall(memory, module_name, nid, target)
    }

    /// Forget call sites of an unloaded guest module
    pub fn release_range(&mut self, start: GuestAddr, end: GuestAddr) -> usize {
        self.patcher.release_range(start, end)
    }

    /// Serialize the deferred list
    pub fn save_state(&self) -> Result<Vec<u8>> {
        crate::savestate::save_deferred(&self.patcher)
    }

    /// Restore the deferred list from [`save_state`](Self::save_state) output
    pub fn load_state(&mut self, bytes: &[u8]) -> Result<()> {
        crate::savestate::load_deferred(&mut self.patcher, bytes)
    }

    /// Active configuration
    pub fn config(&self) -> &HleConfig {
        &self.config
    }

    /// Module registry
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Mutable module registry, for registration outside [`init`](Self::init)
    pub fn registry_mut(&mut self) -> &mut ModuleRegistry {
        &mut self.registry
    }

    /// Call-site patcher
    pub fn patcher(&self) -> &SyscallPatcher {
        &self.patcher
    }

    /// Pending post-call work
    pub fn post_call(&self) -> &PostCallState {
        &self.after
    }

    /// Dispatch counters
    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Zero the dispatch counters
    pub fn reset_stats(&mut self) {
        self.stats = DispatchStats::default();
    }
}
