//! Dynamic dispatch loop
//!
//! Walks the generated entry points the way control flows through them:
//!
//! ```text
//! Enter -> OuterLoop -> DispatcherCheckCoreState -> Dispatcher -> DispatcherNoCheck -> block
//!              ^                  ^                      ^               ^              |
//!              |                  |                      |               |              |
//!              +-- Reschedule     +-- Syscall            +-- Dispatch    +-- Chain  <---+
//! ```
//!
//! A block can also leave through the fp-exception or breakpoint side
//! entries, which end the loop.

use hle_api::{CoreState, GuestAddr, HleConfig, Result};
use hle_syscalls::{sys_debug, sys_trace, sys_warn, DispatchOutcome, Opcode};

use crate::block_cache::{BlockCache, CompiledBlock};
use crate::routines::{AsmRoutineManager, EntryPoint, RegisterLayout, RoutineEmitter};

/// How a translated block handed control back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockExit {
    /// End of block, continue through the dispatcher
    Dispatch,
    /// Continue straight at the next block, skipping the dispatcher checks
    Chain,
    /// The block raised a syscall
    Syscall(Opcode),
    /// The scheduler must pick the next thread
    Reschedule,
    /// Arithmetic fault inside the block
    FpException,
    /// A breakpoint fired mid-block
    Breakpoint,
}

/// Why the loop returned to its caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The core stopped running
    CoreState(CoreState),
    /// Generated code faulted at the given guest address
    FpException(GuestAddr),
    /// A breakpoint fired at the given guest address
    Breakpoint(GuestAddr),
}

/// The emulated machine as seen by the dispatch loop
pub trait BlockExecutor {
    /// Load emulator state into the pinned host registers
    fn bind_registers(&mut self, layout: &RegisterLayout);

    /// Re-sync pinned registers after a reschedule
    fn sync_registers(&mut self, layout: &RegisterLayout) {
        self.bind_registers(layout);
    }

    /// Current run state of the core
    fn core_state(&self) -> CoreState;

    /// Whether the current time slice is used up; the dispatcher goes back
    /// through the outer loop when it is
    fn slice_expired(&self) -> bool {
        false
    }

    /// Guest program counter
    fn pc(&self) -> GuestAddr;

    /// Translate the guest code at `pc`
    fn compile(&mut self, pc: GuestAddr) -> Result<CompiledBlock>;

    /// Run a translated block
    fn execute(&mut self, block: &CompiledBlock) -> BlockExit;

    /// Hand a syscall to the HLE dispatcher
    fn syscall(&mut self, op: Opcode) -> DispatchOutcome;

    /// Report an arithmetic fault
    fn report_fp_exception(&mut self, _pc: GuestAddr) {}

    /// Restore the state snapshot taken before the interrupted block
    fn restore_snapshot(&mut self) {}
}

/// Loop counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Passes through the outer loop
    pub outer_loops: u64,
    /// Blocks executed
    pub blocks_executed: u64,
    /// Blocks translated
    pub blocks_compiled: u64,
    /// Syscalls handed to the dispatcher
    pub syscalls: u64,
}

/// Dispatch loop state: the generated routines plus the block cache
pub struct DispatchLoop {
    routines: AsmRoutineManager,
    cache: BlockCache,
    stats: LoopStats,
}

impl DispatchLoop {
    /// Generate the loop routines with `emitter`
    pub fn new(config: &HleConfig, layout: RegisterLayout, emitter: &mut dyn RoutineEmitter) -> Result<Self> {
        Ok(Self {
            routines: AsmRoutineManager::init(config.code_space_size, layout, emitter)?,
            cache: BlockCache::new(),
            stats: LoopStats::default(),
        })
    }

    /// Run guest code until the core stops or a side entry is taken
    pub fn run(&mut self, executor: &mut dyn BlockExecutor) -> Result<LoopExit> {
        let layout = *self.routines.layout();
        let mut at = EntryPoint::Enter;

        loop {
            sys_trace!("{} ({:#x})", at, self.routines.entry(at));
            at = match at {
                EntryPoint::Enter => {
                    executor.bind_registers(&layout);
                    EntryPoint::OuterLoop
                }
                EntryPoint::OuterLoop => {
                    self.stats.outer_loops += 1;
                    executor.sync_registers(&layout);
                    EntryPoint::DispatcherCheckCoreState
                }
                EntryPoint::DispatcherCheckCoreState => {
                    let state = executor.core_state();
                    if !state.is_running() {
                        sys_debug!("dispatch loop leaving: core {}", state);
                        return Ok(LoopExit::CoreState(state));
                    }
                    EntryPoint::Dispatcher
                }
                EntryPoint::Dispatcher => {
                    if executor.slice_expired() {
                        EntryPoint::OuterLoop
                    } else {
                        EntryPoint::DispatcherNoCheck
                    }
                }
                EntryPoint::DispatcherNoCheck => {
                    match self.run_block(executor)? {
                        BlockExit::Dispatch => EntryPoint::Dispatcher,
                        BlockExit::Chain => EntryPoint::DispatcherNoCheck,
                        BlockExit::Syscall(op) => {
                            self.stats.syscalls += 1;
                            let outcome = executor.syscall(op);
                            if !outcome.was_called() {
                                sys_warn!("syscall {:?} at {:08x} did not run: {:?}", op, executor.pc(), outcome);
                            }
                            EntryPoint::DispatcherCheckCoreState
                        }
                        BlockExit::Reschedule => EntryPoint::OuterLoop,
                        BlockExit::FpException => EntryPoint::FpException,
                        BlockExit::Breakpoint => EntryPoint::BreakpointBailout,
                    }
                }
                EntryPoint::FpException => {
                    let pc = executor.pc();
                    executor.report_fp_exception(pc);
                    return Ok(LoopExit::FpException(pc));
                }
                EntryPoint::BreakpointBailout => {
                    executor.restore_snapshot();
                    let pc = executor.pc();
                    sys_debug!("breakpoint bailout at {:08x}", pc);
                    return Ok(LoopExit::Breakpoint(pc));
                }
            };
        }
    }

    fn run_block(&mut self, executor: &mut dyn BlockExecutor) -> Result<BlockExit> {
        let pc = executor.pc();
        if self.cache.lookup(pc).is_none() {
            let block = executor.compile(pc)?;
            if block.start != pc {
                return Err(hle_api::Error::InvalidState(alloc::format!(
                    "block compiled for {:08x} starts at {:08x}",
                    pc, block.start
                )));
            }
            self.stats.blocks_compiled += 1;
            self.cache.insert(block);
        }

        let Some(block) = self.cache.get(pc) else {
            return Err(hle_api::Error::InvalidState(alloc::format!("no block at {:08x}", pc)));
        };
        self.stats.blocks_executed += 1;
        Ok(executor.execute(block))
    }

    /// Drop translated blocks covering rewritten guest code
    pub fn invalidate(&mut self, start: GuestAddr, end: GuestAddr) -> usize {
        self.cache.invalidate_range(start, end)
    }

    /// Drop translated blocks covering a two-slot call site
    pub fn invalidate_call_site(&mut self, site: GuestAddr) -> usize {
        self.invalidate(site, site.saturating_add(2 * hle_syscalls::mips::INSTRUCTION_SIZE))
    }

    /// The generated routines
    pub fn routines(&self) -> &AsmRoutineManager {
        &self.routines
    }

    /// The translated block cache
    pub fn cache(&self) -> &BlockCache {
        &self.cache
    }

    /// Loop counters
    pub fn stats(&self) -> LoopStats {
        self.stats
    }
}
