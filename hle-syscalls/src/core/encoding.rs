//! Syscall opcode encoding
//!
//! A bound call site carries a guest `syscall` instruction whose code field
//! packs the module and function indices:
//!
//! ```text
//!  31      26 25         18 17               6 5      0
//! +----------+-------------+------------------+--------+
//! |  000000  | module (8)  |  function (12)   | 001100 |
//! +----------+-------------+------------------+--------+
//! ```

use core::fmt;

use static_assertions::const_assert;

/// Low six bits of every syscall opcode (the SYSCALL function code)
pub const SYSCALL_TAG: u32 = 0x0000_000C;
/// Opcode for a call into a known module whose function is missing
pub const INVALID_SYSCALL: u32 = 0x0003_FFCC;
/// Raw marker some loaders leave in unpatched stubs
pub const INVALID_MARKER: u32 = 0x0000_FFFF;

/// Function index reserved for "function absent"
pub const INVALID_FUNC_INDEX: u16 = 0x0FFF;

pub const FUNC_SHIFT: u32 = 6;
pub const FUNC_BITS: u32 = 12;
pub const MODULE_SHIFT: u32 = FUNC_SHIFT + FUNC_BITS;
pub const MODULE_BITS: u32 = 8;

/// Number of encodable modules
pub const MAX_MODULES: usize = 1 << MODULE_BITS;
/// Number of encodable functions per module (the sentinel index excluded)
pub const MAX_FUNCTIONS: usize = INVALID_FUNC_INDEX as usize;

const_assert!(MODULE_SHIFT + MODULE_BITS <= 26);
const_assert!(SYSCALL_TAG < (1 << FUNC_SHIFT));
const_assert!(INVALID_SYSCALL & ((1 << FUNC_SHIFT) - 1) == SYSCALL_TAG);
const_assert!((INVALID_SYSCALL >> FUNC_SHIFT) & ((1 << FUNC_BITS) - 1) == INVALID_FUNC_INDEX as u32);

/// An encoded syscall opcode
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode(u32);

impl Opcode {
    /// Packs a module and function index
    pub const fn encode(module: u8, func: u16) -> Self {
        let func = (func as u32) & ((1 << FUNC_BITS) - 1);
        Opcode(SYSCALL_TAG | ((module as u32) << MODULE_SHIFT) | (func << FUNC_SHIFT))
    }

    /// Opcode for a module that is present but lacks the requested function
    pub const fn encode_invalid(module: u8) -> Self {
        Opcode(INVALID_SYSCALL | ((module as u32) << MODULE_SHIFT))
    }

    /// Opcode for a module that is not registered at all
    pub const fn unknown_module() -> Self {
        Opcode(INVALID_SYSCALL)
    }

    /// Wraps a raw opcode read from guest memory
    pub const fn from_raw(raw: u32) -> Self {
        Opcode(raw)
    }

    /// Raw 32-bit value
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Module index field
    pub const fn module_index(self) -> u8 {
        ((self.0 >> MODULE_SHIFT) & ((1 << MODULE_BITS) - 1)) as u8
    }

    /// Function index field
    pub const fn func_index(self) -> u16 {
        ((self.0 >> FUNC_SHIFT) & ((1 << FUNC_BITS) - 1)) as u16
    }

    /// Splits the opcode into (module index, function index)
    pub const fn decode(self) -> (u8, u16) {
        (self.module_index(), self.func_index())
    }

    /// Whether the opcode is one of the "cannot be dispatched" patterns
    pub const fn is_invalid(self) -> bool {
        self.func_index() == INVALID_FUNC_INDEX || self.0 == INVALID_MARKER
    }
}

impl fmt::Debug for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Opcode({:#010x}: module={}, func={})",
            self.0,
            self.module_index(),
            self.func_index()
        )
    }
}

impl From<Opcode> for u32 {
    fn from(op: Opcode) -> u32 {
        op.raw()
    }
}
