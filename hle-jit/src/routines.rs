//! Dispatch loop routines
//!
//! The routine manager owns the code space holding the fixed entry points of
//! the dispatch loop. They are generated once, in fall-through order, against
//! the register layout of the emulated CPU and then write-protected, so they
//! behave like precompiled code. To add a routine, add an [`EntryPoint`] and
//! teach the emitters about it.

use core::fmt;

use hle_api::{Error, Result};
use hle_syscalls::{sys_info, sys_trace};

use crate::code_block::{CodeBlock, CodeOffset};

/// Named entry points of the dispatch loop, in emission order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    /// Binds native registers, falls into the outer loop
    Enter,
    /// Resumed after a full reschedule
    OuterLoop,
    /// Dispatcher that stops when the core is no longer running
    DispatcherCheckCoreState,
    /// Dispatcher reached at the end of a translated block
    Dispatcher,
    /// Dispatcher for callers that already guaranteed continuation
    DispatcherNoCheck,
    /// Side entry for arithmetic faults raised by generated code
    FpException,
    /// Side entry unwinding a partially executed block on a breakpoint
    BreakpointBailout,
}

impl EntryPoint {
    /// Number of entry points
    pub const COUNT: usize = 7;

    /// Every entry point, in emission order
    pub const ALL: [EntryPoint; Self::COUNT] = [
        EntryPoint::Enter,
        EntryPoint::OuterLoop,
        EntryPoint::DispatcherCheckCoreState,
        EntryPoint::Dispatcher,
        EntryPoint::DispatcherNoCheck,
        EntryPoint::FpException,
        EntryPoint::BreakpointBailout,
    ];

    /// Routine name
    pub const fn name(self) -> &'static str {
        match self {
            EntryPoint::Enter => "enterCode",
            EntryPoint::OuterLoop => "outerLoop",
            EntryPoint::DispatcherCheckCoreState => "dispatcherCheckCoreState",
            EntryPoint::Dispatcher => "dispatcher",
            EntryPoint::DispatcherNoCheck => "dispatcherNoCheck",
            EntryPoint::FpException => "fpException",
            EntryPoint::BreakpointBailout => "breakpointBailout",
        }
    }

    /// Whether the routine falls through into the next one
    pub const fn falls_through(self) -> bool {
        matches!(
            self,
            EntryPoint::Enter | EntryPoint::OuterLoop | EntryPoint::DispatcherCheckCoreState | EntryPoint::Dispatcher
        )
    }

    const fn from_tag(tag: u8) -> Option<Self> {
        if (tag as usize) < Self::COUNT {
            Some(Self::ALL[tag as usize])
        } else {
            None
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Host registers the generated code pins emulator state to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterLayout {
    /// Holds the emulated CPU context
    pub context_reg: u8,
    /// Holds the guest memory base
    pub membase_reg: u8,
    /// Holds the remaining cycle budget
    pub downcount_reg: u8,
}

impl Default for RegisterLayout {
    fn default() -> Self {
        // rbp, r15, r14 on x86-64
        Self {
            context_reg: 5,
            membase_reg: 15,
            downcount_reg: 14,
        }
    }
}

/// Writes the body of one routine into the code space
pub trait RoutineEmitter {
    /// Emit `entry` at the current end of `block`
    fn emit(&mut self, entry: EntryPoint, layout: &RegisterLayout, block: &mut CodeBlock) -> Result<()>;
}

bitflags::bitflags! {
    /// Flags carried by a routine descriptor
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DescriptorFlags: u8 {
        /// Control falls into the next routine
        const FALLS_THROUGH = 0x01;
        /// Reached only from generated code, never by fall-through
        const SIDE_ENTRY = 0x02;
    }
}

/// Emits fixed-size routine descriptors instead of machine code
///
/// Interpreter-backed cores have nothing to generate; the descriptors keep
/// the entry-point bookkeeping and the write-once discipline identical.
#[derive(Debug, Default)]
pub struct DescriptorEmitter;

impl DescriptorEmitter {
    /// Size of one descriptor record
    pub const RECORD_SIZE: usize = 8;
    const MAGIC: [u8; 2] = *b"HR";

    /// Decode a descriptor record
    pub fn decode(record: &[u8]) -> Option<(EntryPoint, DescriptorFlags, RegisterLayout)> {
        if record.len() < Self::RECORD_SIZE || record[..2] != Self::MAGIC {
            return None;
        }
        let entry = EntryPoint::from_tag(record[2])?;
        let flags = DescriptorFlags::from_bits(record[3])?;
        let layout = RegisterLayout {
            context_reg: record[4],
            membase_reg: record[5],
            downcount_reg: record[6],
        };
        Some((entry, flags, layout))
    }
}

impl RoutineEmitter for DescriptorEmitter {
    fn emit(&mut self, entry: EntryPoint, layout: &RegisterLayout, block: &mut CodeBlock) -> Result<()> {
        let flags = if entry.falls_through() {
            DescriptorFlags::FALLS_THROUGH
        } else if matches!(entry, EntryPoint::FpException | EntryPoint::BreakpointBailout) {
            DescriptorFlags::SIDE_ENTRY
        } else {
            DescriptorFlags::empty()
        };
        let record = [
            Self::MAGIC[0],
            Self::MAGIC[1],
            entry as u8,
            flags.bits(),
            layout.context_reg,
            layout.membase_reg,
            layout.downcount_reg,
            0,
        ];
        block.write_bytes(&record)?;
        Ok(())
    }
}

/// Owner of the write-protected dispatch loop routines
pub struct AsmRoutineManager {
    block: CodeBlock,
    entries: [CodeOffset; EntryPoint::COUNT],
    layout: RegisterLayout,
}

impl AsmRoutineManager {
    /// Allocate `code_space_size` bytes, generate every routine and
    /// write-protect the result
    pub fn init(
        code_space_size: usize,
        layout: RegisterLayout,
        emitter: &mut dyn RoutineEmitter,
    ) -> Result<Self> {
        let mut block = CodeBlock::alloc(code_space_size)?;
        let mut entries = [0; EntryPoint::COUNT];

        for entry in EntryPoint::ALL {
            let start = block.code_ptr();
            emitter.emit(entry, &layout, &mut block)?;
            if block.code_ptr() == start {
                return Err(Error::InvalidState(alloc::format!(
                    "emitter generated no code for {}",
                    entry
                )));
            }
            sys_trace!("{} at {:#x}, {} bytes", entry, start, block.code_ptr() - start);
            entries[entry as usize] = start;
        }

        block.write_protect();
        sys_info!("dispatch loop generated: {} bytes", block.len());
        Ok(Self { block, entries, layout })
    }

    /// Offset of an entry point
    pub fn entry(&self, entry: EntryPoint) -> CodeOffset {
        self.entries[entry as usize]
    }

    /// Entry point starting at `offset`, if any
    pub fn entry_at(&self, offset: CodeOffset) -> Option<EntryPoint> {
        EntryPoint::ALL
            .into_iter()
            .find(|e| self.entries[*e as usize] == offset)
    }

    /// Register layout the routines were generated against
    pub fn layout(&self) -> &RegisterLayout {
        &self.layout
    }

    /// The protected code space
    pub fn code(&self) -> &CodeBlock {
        &self.block
    }
}
