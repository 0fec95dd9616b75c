//! Benchmark fixtures
//!
//! A machine whose collaborators do nothing, so the numbers measure the
//! dispatcher and not the fakes around it.

use hle_api::{DebugHost, GuestAddr, GuestCpu, GuestMemory, HleConfig, Result, Scheduler};
use hle_syscalls::{HleContext, HleEnv, HleFunction, ModuleRegistry};

/// Functions registered in the benchmark module
pub const FUNCTIONS: u16 = 64;

/// Register file plus no-op hooks
#[derive(Default)]
pub struct NullMachine {
    gpr: [u32; 32],
    pc: GuestAddr,
}

struct NullHooks;

struct NullMemory;

impl GuestCpu for NullMachine {
    fn gpr(&self, reg: usize) -> u32 {
        self.gpr[reg]
    }

    fn set_gpr(&mut self, reg: usize, value: u32) {
        self.gpr[reg] = value;
    }

    fn pc(&self) -> GuestAddr {
        self.pc
    }

    fn set_pc(&mut self, pc: GuestAddr) {
        self.pc = pc;
    }
}

impl GuestMemory for NullMemory {
    fn read_u32(&self, _addr: GuestAddr) -> Result<u32> {
        Ok(0)
    }

    fn write_u32(&mut self, _addr: GuestAddr, _value: u32) -> Result<()> {
        Ok(())
    }
}

impl Scheduler for NullHooks {
    fn force_callbacks(&mut self) {}

    fn run_one_pending_interrupt(&mut self) -> bool {
        false
    }

    fn reschedule(&mut self, _reason: &str) {}

    fn reschedule_with_callbacks(&mut self, _reason: &str) {}

    fn check_callbacks(&mut self) {}
}

impl DebugHost for NullHooks {
    fn enable_stepping(&mut self) {}

    fn set_debug_mode(&mut self, _enabled: bool) {}
}

impl NullMachine {
    /// Run `f` with the machine borrowed as a dispatch environment
    pub fn with_env<R>(&mut self, f: impl FnOnce(&mut HleEnv<'_>) -> R) -> R {
        let mut memory = NullMemory;
        let mut scheduler = NullHooks;
        let mut debug = NullHooks;
        let mut env = HleEnv {
            cpu: self,
            memory: &mut memory,
            scheduler: &mut scheduler,
            debug: &mut debug,
        };
        f(&mut env)
    }
}

fn register_bench(registry: &mut ModuleRegistry) -> Result<()> {
    let mut functions = Vec::with_capacity(FUNCTIONS as usize);
    for i in 0..FUNCTIONS as u32 {
        let func = if i % 2 == 0 {
            HleFunction::new(0x1000 + i, "Add", |call| {
                let sum = call.arg(0).wrapping_add(call.arg(1));
                call.set_return(sum);
            })
        } else {
            HleFunction::new(0x1000 + i, "Yield", |call| call.reschedule("bench"))
        };
        functions.push(func);
    }
    registry.register_module("Bench", functions)?;
    Ok(())
}

/// An initialized context with one module of [`FUNCTIONS`] functions
pub fn bench_context() -> Result<HleContext> {
    let mut hle = HleContext::new(HleConfig::default())?;
    hle.init(&[register_bench])?;
    Ok(hle)
}
