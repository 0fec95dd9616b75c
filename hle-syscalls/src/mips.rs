//! Guest (MIPS) instruction encoders and calling convention
//!
//! Only the handful of instructions the call-site patcher writes are needed
//! here; everything else belongs to the translator.

use hle_api::GuestAddr;

/// Width of one guest instruction in bytes
pub const INSTRUCTION_SIZE: GuestAddr = 4;

/// Return value register (v0)
pub const REG_V0: usize = 2;
/// Second return value register (v1)
pub const REG_V1: usize = 3;
/// First argument register (a0)
pub const REG_A0: usize = 4;
/// Return address register (ra)
pub const REG_RA: usize = 31;

/// Number of arguments passed in registers (a0-a3, t0-t3)
pub const REGISTER_ARGS: usize = 8;

/// `jr ra`
pub const fn make_jr_ra() -> u32 {
    0x03E0_0008
}

/// `nop` (sll zero, zero, 0)
pub const fn make_nop() -> u32 {
    0
}

/// `j target`, keeping the 256 MiB segment of the jump site
pub const fn make_j(target: GuestAddr) -> u32 {
    0x0800_0000 | ((target & 0x0FFF_FFFF) >> 2)
}

/// Decodes the target of a `j` instruction located at `site`
pub const fn jump_target(site: GuestAddr, op: u32) -> Option<GuestAddr> {
    if op >> 26 != 0x02 {
        return None;
    }
    Some((site.wrapping_add(INSTRUCTION_SIZE) & 0xF000_0000) | ((op & 0x03FF_FFFF) << 2))
}
