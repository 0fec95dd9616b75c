//! Common test utilities
//!
//! A small fake machine (register file, word-addressed RAM, scheduler and
//! debugger hooks) plus a block executor that interprets the handful of guest
//! instructions the call-site patcher writes. Enough to drive guest code
//! through the dispatch loop into the HLE dispatcher and back.

#[cfg(feature = "log")]
pub mod capture;

use std::collections::BTreeMap;

use hle_api::{CoreState, DebugHost, Error, GuestAddr, GuestCpu, GuestMemory, HleConfig, Result, Scheduler};
use hle_jit::{BlockExecutor, BlockExit, CompiledBlock, DescriptorEmitter, DispatchLoop, RegisterLayout};
use hle_syscalls::mips::{self, INSTRUCTION_SIZE, REG_RA};
use hle_syscalls::{DispatchOutcome, HleContext, HleEnv, Opcode};

/// Where `main` starts
pub const MAIN: GuestAddr = 0x0880_4000;
/// Jumping here powers the core down
pub const EXIT: GuestAddr = 0x0880_0000;
/// Blocks run per time slice
pub const SLICE: i32 = 64;
/// Longest block the executor translates, in instructions
const MAX_BLOCK: u32 = 16;

/// `addiu rt, rs, imm`
pub const fn addiu(rt: u32, rs: u32, imm: i16) -> u32 {
    (0x09 << 26) | (rs << 21) | (rt << 16) | (imm as u16 as u32)
}

/// `jal target`
pub const fn jal(target: GuestAddr) -> u32 {
    (0x03 << 26) | ((target & 0x0FFF_FFFF) >> 2)
}

/// `break`
pub const fn brk() -> u32 {
    0x0000_000D
}

/// Whether `op` is a SPECIAL-class syscall instruction
pub const fn is_syscall(op: u32) -> bool {
    op & 0xFC00_003F == 0x0000_000C
}

/// Guest register file
#[derive(Debug, Clone, Default)]
pub struct FakeCpu {
    pub gpr: [u32; 32],
    pub pc: GuestAddr,
}

impl GuestCpu for FakeCpu {
    fn gpr(&self, reg: usize) -> u32 {
        self.gpr[reg]
    }

    fn set_gpr(&mut self, reg: usize, value: u32) {
        // r0 is hardwired to zero
        if reg != 0 {
            self.gpr[reg] = value;
        }
    }

    fn pc(&self) -> GuestAddr {
        self.pc
    }

    fn set_pc(&mut self, pc: GuestAddr) {
        self.pc = pc;
    }
}

/// Word-addressed guest RAM
#[derive(Debug, Default)]
pub struct FakeRam {
    pub words: BTreeMap<GuestAddr, u32>,
}

impl FakeRam {
    /// Store a run of instructions starting at `addr`
    pub fn load(&mut self, addr: GuestAddr, code: &[u32]) {
        for (i, op) in code.iter().enumerate() {
            self.words.insert(addr + i as u32 * INSTRUCTION_SIZE, *op);
        }
    }
}

impl GuestMemory for FakeRam {
    fn read_u32(&self, addr: GuestAddr) -> Result<u32> {
        if addr % 4 != 0 {
            return Err(Error::InvalidArgument(format!("unaligned read at {:08x}", addr)));
        }
        Ok(self.words.get(&addr).copied().unwrap_or(0))
    }

    fn write_u32(&mut self, addr: GuestAddr, value: u32) -> Result<()> {
        if addr % 4 != 0 {
            return Err(Error::InvalidArgument(format!("unaligned write at {:08x}", addr)));
        }
        self.words.insert(addr, value);
        Ok(())
    }
}

/// Scheduler hooks that record what they were asked to do
#[derive(Debug, Default)]
pub struct FakeScheduler {
    pub events: Vec<String>,
    pub pending_interrupts: u32,
}

impl Scheduler for FakeScheduler {
    fn force_callbacks(&mut self) {
        self.events.push("current_callbacks".into());
    }

    fn run_one_pending_interrupt(&mut self) -> bool {
        if self.pending_interrupts == 0 {
            return false;
        }
        self.pending_interrupts -= 1;
        self.events.push("interrupt".into());
        true
    }

    fn reschedule(&mut self, reason: &str) {
        self.events.push(format!("resched:{}", reason));
    }

    fn reschedule_with_callbacks(&mut self, reason: &str) {
        self.events.push(format!("resched_cb:{}", reason));
    }

    fn check_callbacks(&mut self) {
        self.events.push("all_callbacks".into());
    }
}

/// Debugger hooks; stepping stops the core
#[derive(Debug, Default)]
pub struct FakeDebugger {
    pub core_state: CoreState,
    pub debug_mode: bool,
}

impl DebugHost for FakeDebugger {
    fn enable_stepping(&mut self) {
        self.core_state = CoreState::Stepping;
    }

    fn set_debug_mode(&mut self, enabled: bool) {
        self.debug_mode = enabled;
    }
}

/// All collaborators of the HLE core
#[derive(Debug, Default)]
pub struct FakeMachine {
    pub cpu: FakeCpu,
    pub ram: FakeRam,
    pub scheduler: FakeScheduler,
    pub debugger: FakeDebugger,
}

impl FakeMachine {
    /// Borrow the machine as a dispatch environment
    pub fn env(&mut self) -> HleEnv<'_> {
        HleEnv {
            cpu: &mut self.cpu,
            memory: &mut self.ram,
            scheduler: &mut self.scheduler,
            debug: &mut self.debugger,
        }
    }

    /// Dispatch one opcode directly
    pub fn call(&mut self, hle: &mut HleContext, op: Opcode) -> DispatchOutcome {
        hle.call_syscall(op, &mut self.env())
    }
}

/// Interprets guest code block by block for the dispatch loop
pub struct GuestExecutor {
    pub machine: FakeMachine,
    pub hle: HleContext,
    downcount: i32,
    snapshot: Option<([u32; 32], GuestAddr)>,
}

impl GuestExecutor {
    /// Wrap a machine and an initialized HLE context, ready to run `main`
    pub fn new(machine: FakeMachine, hle: HleContext) -> Self {
        let mut executor = Self {
            machine,
            hle,
            downcount: SLICE,
            snapshot: None,
        };
        executor.machine.cpu.pc = MAIN;
        executor
    }

    /// Patch a call site through the HLE context
    pub fn write_syscall(&mut self, module: &str, nid: u32, site: GuestAddr) -> Result<()> {
        self.hle.write_syscall(&mut self.machine.ram, module, nid, site)
    }

    fn fetch(&self, addr: GuestAddr) -> u32 {
        self.machine.ram.read_u32(addr).unwrap_or(0)
    }
}

impl BlockExecutor for GuestExecutor {
    fn bind_registers(&mut self, _layout: &RegisterLayout) {
        self.downcount = SLICE;
    }

    fn sync_registers(&mut self, _layout: &RegisterLayout) {
        self.downcount = SLICE;
    }

    fn core_state(&self) -> CoreState {
        if self.machine.debugger.core_state != CoreState::Running {
            self.machine.debugger.core_state
        } else if self.machine.cpu.pc == EXIT {
            CoreState::PowerDown
        } else {
            CoreState::Running
        }
    }

    fn slice_expired(&self) -> bool {
        self.downcount <= 0 || self.machine.cpu.pc == EXIT
    }

    fn pc(&self) -> GuestAddr {
        self.machine.cpu.pc
    }

    fn compile(&mut self, pc: GuestAddr) -> Result<CompiledBlock> {
        let mut code = Vec::new();
        let mut addr = pc;
        for _ in 0..MAX_BLOCK {
            let op = self.machine.ram.read_u32(addr)?;
            code.extend_from_slice(&op.to_le_bytes());
            addr += INSTRUCTION_SIZE;

            let control = op == mips::make_jr_ra() || matches!(op >> 26, 0x02 | 0x03);
            if control {
                // Delay slot
                code.extend_from_slice(&self.machine.ram.read_u32(addr)?.to_le_bytes());
                addr += INSTRUCTION_SIZE;
                break;
            }
            if op == brk() {
                break;
            }
        }
        Ok(CompiledBlock {
            start: pc,
            guest_size: addr - pc,
            code,
        })
    }

    fn execute(&mut self, block: &CompiledBlock) -> BlockExit {
        self.downcount -= 1;
        self.snapshot = Some((self.machine.cpu.gpr, block.start));

        let mut addr = block.start;
        while addr < block.end() {
            let op = self.fetch(addr);
            let slot = self.fetch(addr + INSTRUCTION_SIZE);
            match op >> 26 {
                _ if op == mips::make_jr_ra() => {
                    self.machine.cpu.pc = self.machine.cpu.gpr[REG_RA];
                    if is_syscall(slot) {
                        return BlockExit::Syscall(Opcode::from_raw(slot));
                    }
                    return BlockExit::Dispatch;
                }
                _ if op == brk() => {
                    self.machine.cpu.pc = addr;
                    return BlockExit::Breakpoint;
                }
                0x02 => {
                    self.machine.cpu.pc = mips::jump_target(addr, op).unwrap_or(EXIT);
                    return BlockExit::Dispatch;
                }
                0x03 => {
                    self.machine.cpu.set_gpr(REG_RA, addr + 2 * INSTRUCTION_SIZE);
                    self.machine.cpu.pc = ((addr + INSTRUCTION_SIZE) & 0xF000_0000) | ((op & 0x03FF_FFFF) << 2);
                    return BlockExit::Dispatch;
                }
                0x09 => {
                    let rs = ((op >> 21) & 0x1F) as usize;
                    let rt = ((op >> 16) & 0x1F) as usize;
                    let imm = op as u16 as i16 as i32 as u32;
                    let value = self.machine.cpu.gpr[rs].wrapping_add(imm);
                    self.machine.cpu.set_gpr(rt, value);
                }
                _ => {}
            }
            addr += INSTRUCTION_SIZE;
        }

        self.machine.cpu.pc = block.end();
        if self.downcount > 0 {
            BlockExit::Chain
        } else {
            BlockExit::Dispatch
        }
    }

    fn syscall(&mut self, op: Opcode) -> DispatchOutcome {
        self.machine.call(&mut self.hle, op)
    }

    fn restore_snapshot(&mut self) {
        if let Some((gpr, pc)) = self.snapshot.take() {
            self.machine.cpu.gpr = gpr;
            self.machine.cpu.pc = pc;
        }
    }
}

/// A dispatch loop with descriptor routines and default configuration
pub fn dispatch_loop() -> DispatchLoop {
    DispatchLoop::new(&HleConfig::default(), RegisterLayout::default(), &mut DescriptorEmitter)
        .expect("dispatch loop routines fit the default code space")
}

/// An HLE context with default configuration
pub fn hle_context() -> HleContext {
    HleContext::new(HleConfig::default()).expect("default configuration is valid")
}
