//! Guest memory and CPU interface

use crate::core::types::GuestAddr;
use crate::error::Result;

/// Trait for the memory backing guest address space
pub trait GuestMemory {
    /// Reads a 32-bit little-endian word
    fn read_u32(&self, addr: GuestAddr) -> Result<u32>;

    /// Writes a 32-bit little-endian word
    fn write_u32(&mut self, addr: GuestAddr, value: u32) -> Result<()>;
}

/// Trait for the guest CPU register file
///
/// Host functions read their arguments from and write their results to the
/// register file directly; no other arguments are passed to them.
pub trait GuestCpu {
    /// Returns a general purpose register
    fn gpr(&self, reg: usize) -> u32;

    /// Sets a general purpose register
    fn set_gpr(&mut self, reg: usize, value: u32);

    /// Returns the program counter
    fn pc(&self) -> GuestAddr;

    /// Sets the program counter
    fn set_pc(&mut self, pc: GuestAddr);
}
