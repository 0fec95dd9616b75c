//! Call-site patching and deferred resolution
//!
//! A guest call site is two instruction slots. Binding it to a registered
//! module writes `jr ra` followed by the encoded syscall, so the trap fires
//! from the delay slot on the way back to the caller. Sites importing from a
//! module that is not loaded yet are remembered and later rewritten to jump
//! straight at the implementation once [`SyscallPatcher::resolve_syscall`] is
//! told where it lives.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use hle_api::{Error, GuestAddr, GuestMemory, Nid, Result};
use serde::{Deserialize, Serialize};

use crate::core::encoding::Opcode;
use crate::core::registry::ModuleRegistry;
use crate::mips;

/// What a tracked call site currently holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSite {
    /// `jr ra` plus a syscall opcode
    Stub(Opcode),
    /// `jr ra; nop`, the import was stubbed out
    PatchedOut,
    /// `j target; nop`, bound directly to guest code
    DirectJump(GuestAddr),
}

impl CallSite {
    /// Whether the site was bound to guest code and must not be rewritten as a stub
    pub fn is_direct_jump(&self) -> bool {
        matches!(self, CallSite::DirectJump(_))
    }
}

/// A call site waiting for its module to be loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedSyscall {
    /// Module the site imports from
    pub module_name: String,
    /// Address of the first slot of the call site
    pub site: GuestAddr,
    /// Imported function
    pub nid: Nid,
}

impl UnresolvedSyscall {
    fn matches(&self, module_name: &str, nid: Nid) -> bool {
        self.nid == nid && self.module_name == module_name
    }
}

/// Writes call-site stubs and owns the deferred list
#[derive(Debug, Default)]
pub struct SyscallPatcher {
    sites: BTreeMap<GuestAddr, CallSite>,
    unresolved: Vec<UnresolvedSyscall>,
    prune_resolved: bool,
}

impl SyscallPatcher {
    /// Create an empty patcher
    ///
    /// With `prune_resolved` set, deferred entries are dropped once they have
    /// been bound to a target.
    pub fn new(prune_resolved: bool) -> Self {
        Self {
            sites: BTreeMap::new(),
            unresolved: Vec::new(),
            prune_resolved,
        }
    }

    /// Bind the call site at `site` to function `nid` of `module_name`
    ///
    /// A NID of zero stubs the import out. Imports from modules that are not
    /// registered leave guest memory untouched and are queued for
    /// [`resolve_syscall`](Self::resolve_syscall).
    pub fn write_syscall(
        &mut self,
        registry: &ModuleRegistry,
        memory: &mut dyn GuestMemory,
        module_name: &str,
        nid: Nid,
        site: GuestAddr,
    ) -> Result<()> {
        if let Some(CallSite::DirectJump(target)) = self.sites.get(&site) {
            sys_warn!(
                "not patching {}/{:08x} at {:08x}: already jumps to {:08x}",
                module_name,
                nid,
                site,
                target
            );
            return Ok(());
        }

        if nid == 0 {
            write_pair(memory, site, mips::make_jr_ra(), mips::make_nop())?;
            self.sites.insert(site, CallSite::PatchedOut);
            return Ok(());
        }

        if registry.module_index(module_name).is_some() {
            let op = registry.syscall_op(module_name, nid);
            write_pair(memory, site, mips::make_jr_ra(), op.raw())?;
            self.sites.insert(site, CallSite::Stub(op));
            sys_trace!("patched {}/{:08x} at {:08x} with {:?}", module_name, nid, site, op);
            return Ok(());
        }

        sys_info!(
            "syscall {}/{:08x} at {:08x} deferred until the module loads",
            module_name,
            nid,
            site
        );
        self.unresolved.push(UnresolvedSyscall {
            module_name: module_name.into(),
            site,
            nid,
        });
        Ok(())
    }

    /// Point every deferred import of `nid` from `module_name` at `target`
    ///
    /// Returns how many call sites were rewritten. A failed write stops the
    /// pass; sites rewritten before it stay resolved (and are pruned), the
    /// failing site is left as it was.
    pub fn resolve_syscall(
        &mut self,
        memory: &mut dyn GuestMemory,
        module_name: &str,
        nid: Nid,
        target: GuestAddr,
    ) -> Result<usize> {
        let pending: Vec<GuestAddr> = self
            .unresolved
            .iter()
            .filter(|e| e.matches(module_name, nid))
            .map(|e| e.site)
            .collect();
        let mut resolved = Vec::with_capacity(pending.len());
        let mut failure = None;

        for site in pending {
            sys_info!("resolving {}/{:08x} at {:08x} to {:08x}", module_name, nid, site, target);
            if let Err(e) = write_pair(memory, site, mips::make_j(target), mips::make_nop()) {
                sys_error!("failed to resolve {}/{:08x} at {:08x}: {}", module_name, nid, site, e);
                failure = Some(e);
                break;
            }
            self.sites.insert(site, CallSite::DirectJump(target));
            resolved.push(site);
        }

        if self.prune_resolved && !resolved.is_empty() {
            self.unresolved
                .retain(|e| !(e.matches(module_name, nid) && resolved.contains(&e.site)));
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(resolved.len()),
        }
    }

    /// Forget call sites and deferred imports inside `[start, end)`
    ///
    /// Used when the guest module containing those sites is unloaded.
    pub fn release_range(&mut self, start: GuestAddr, end: GuestAddr) -> usize {
        if start >= end {
            return 0;
        }

        let before = self.sites.len() + self.unresolved.len();
        let doomed: Vec<GuestAddr> = self.sites.range(start..end).map(|(site, _)| *site).collect();
        for site in doomed {
            self.sites.remove(&site);
        }
        self.unresolved.retain(|e| e.site < start || e.site >= end);

        let released = before - self.sites.len() - self.unresolved.len();
        if released > 0 {
            sys_debug!("released {} call-site records in {:08x}..{:08x}", released, start, end);
        }
        released
    }

    /// State of a tracked call site
    pub fn call_site(&self, site: GuestAddr) -> Option<CallSite> {
        self.sites.get(&site).copied()
    }

    /// Deferred imports, oldest first
    pub fn unresolved(&self) -> &[UnresolvedSyscall] {
        &self.unresolved
    }

    /// Replace the deferred list, as when loading a save state
    pub fn restore_unresolved(&mut self, entries: Vec<UnresolvedSyscall>) {
        self.unresolved = entries;
    }

    /// Whether resolved entries are dropped from the deferred list
    pub fn prunes_resolved(&self) -> bool {
        self.prune_resolved
    }

    /// Drop all tracked state
    pub fn clear(&mut self) {
        self.sites.clear();
        self.unresolved.clear();
    }
}

/// Writes both slots of a call site, or neither
fn write_pair(memory: &mut dyn GuestMemory, site: GuestAddr, first: u32, second: u32) -> Result<()> {
    let slot1 = site.checked_add(mips::INSTRUCTION_SIZE).ok_or_else(|| {
        Error::InvalidArgument(format!("call site {:08x} runs past the address space", site))
    })?;
    let previous = memory.read_u32(site)?;
    memory.write_u32(site, first)?;
    if let Err(e) = memory.write_u32(slot1, second) {
        if memory.write_u32(site, previous).is_err() {
            sys_warn!("could not restore {:08x} after a failed call-site write", site);
        }
        return Err(e);
    }
    Ok(())
}
