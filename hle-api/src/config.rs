//! HLE core configuration

use alloc::format;
use alloc::vec::Vec;

use crate::core::types::{nids, Nid};
use crate::error::{Error, Result};

/// Default capacity of the reschedule reason buffer, terminator included
pub const DEFAULT_RESCHEDULE_REASON_CAPACITY: usize = 512;

/// Default size of the dispatch loop code space
pub const DEFAULT_CODE_SPACE_SIZE: usize = 8192;

/// HLE core configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HleConfig {
    /// Capacity of the reschedule reason buffer; reasons keep at most
    /// `capacity - 1` bytes
    pub reschedule_reason_capacity: usize,
    /// NIDs that never trigger a pending debug break
    pub debug_break_blacklist: Vec<Nid>,
    /// Size of the dispatch loop code space in bytes
    pub code_space_size: usize,
    /// Drop deferred syscalls once they have been resolved
    pub prune_resolved_syscalls: bool,
}

impl Default for HleConfig {
    fn default() -> Self {
        Self {
            reschedule_reason_capacity: DEFAULT_RESCHEDULE_REASON_CAPACITY,
            debug_break_blacklist: Vec::from([nids::SUSPEND_INTR, nids::RESUME_INTR, nids::IDLE]),
            code_space_size: DEFAULT_CODE_SPACE_SIZE,
            prune_resolved_syscalls: true,
        }
    }
}

impl HleConfig {
    /// Set the reschedule reason capacity
    pub fn with_reschedule_reason_capacity(mut self, capacity: usize) -> Self {
        self.reschedule_reason_capacity = capacity;
        self
    }

    /// Set the debug break blacklist
    pub fn with_debug_break_blacklist(mut self, blacklist: Vec<Nid>) -> Self {
        self.debug_break_blacklist = blacklist;
        self
    }

    /// Set the code space size
    pub fn with_code_space_size(mut self, size: usize) -> Self {
        self.code_space_size = size;
        self
    }

    /// Keep or drop resolved deferred syscalls
    pub fn with_prune_resolved_syscalls(mut self, prune: bool) -> Self {
        self.prune_resolved_syscalls = prune;
        self
    }

    /// Checks that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.reschedule_reason_capacity < 2 {
            return Err(Error::ConfigError(format!(
                "reschedule reason capacity {} leaves no room for a reason",
                self.reschedule_reason_capacity
            )));
        }
        if self.code_space_size == 0 {
            return Err(Error::ConfigError("code space size must be non-zero".into()));
        }
        Ok(())
    }
}
