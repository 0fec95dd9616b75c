//! Core types for the HLE core

use core::fmt;

/// Guest virtual address
pub type GuestAddr = u32;

/// Numeric identifier a guest binary uses to name an imported function
pub type Nid = u32;

/// Index of a module in the module registry
pub type ModuleIndex = usize;

/// Index of a function inside its module's function table
pub type FuncIndex = usize;

/// Run state of the emulator core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CoreState {
    /// Guest code runs freely
    #[default]
    Running,
    /// Frame boundary reached, return to the host loop
    NextFrame,
    /// Single-step / debug mode
    Stepping,
    /// Core reported an unrecoverable guest fault
    Error,
    /// Shutting down
    PowerDown,
}

impl CoreState {
    /// Whether the dispatch loop should keep running in this state
    pub fn is_running(&self) -> bool {
        matches!(self, CoreState::Running)
    }
}

impl fmt::Display for CoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CoreState::Running => "running",
            CoreState::NextFrame => "next-frame",
            CoreState::Stepping => "stepping",
            CoreState::Error => "error",
            CoreState::PowerDown => "power-down",
        };
        f.write_str(name)
    }
}

bitflags::bitflags! {
    /// Memory protection flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemoryProtection: u8 {
        /// Readable
        const READ = 0b0000_0001;
        /// Writable
        const WRITE = 0b0000_0010;
        /// Executable
        const EXEC = 0b0000_0100;
    }
}

/// Well-known NIDs
pub mod nids {
    use super::Nid;

    /// sceKernelCpuSuspendIntr
    pub const SUSPEND_INTR: Nid = 0x0929_68F4;
    /// sceKernelCpuResumeIntr
    pub const RESUME_INTR: Nid = 0x5F10_D406;
    /// Synthetic NID of the idle thread's wait loop
    pub const IDLE: Nid = 0xC0DE_0006;
}
