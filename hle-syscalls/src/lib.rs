//! HLE System Calls
//!
//! This crate lets guest code call host-implemented operating system
//! services. It owns the module registry, binds guest call sites to syscall
//! opcodes (or, for late-loaded modules, straight to guest code), dispatches
//! those opcodes to host functions and runs the rescheduling, callback,
//! interrupt and debugger work the functions ask for once they return.
//!
//! # Architecture
//!
//! - **Registry**: service modules and their exported functions
//! - **Encoding**: the (module, function) to opcode mapping
//! - **Patcher**: call-site stubs and the deferred import list
//! - **Dispatcher**: opcode to host function, with failure accounting
//! - **Post-call**: ordered follow-up work requested by host functions
//! - **Save state**: persistence of the deferred import list
//!
//! # Usage
//!
//! ```rust
//! use hle_syscalls::{HleContext, HleFunction, ModuleRegistry};
//! use hle_api::{HleConfig, Result};
//!
//! fn register_kernel(registry: &mut ModuleRegistry) -> Result<()> {
//!     registry.register_module(
//!         "Kernel",
//!         vec![HleFunction::new(0x1111, "Delay", |call| {
//!             call.reschedule("delay");
//!             call.set_return(0);
//!         })],
//!     )?;
//!     Ok(())
//! }
//!
//! let mut ctx = HleContext::new(HleConfig::default())?;
//! ctx.init(&[register_kernel])?;
//! assert_eq!(ctx.registry().module_index("Kernel"), Some(0));
//! # Ok::<(), hle_api::Error>(())
//! ```

#![cfg_attr(not(test), no_std)]
#![allow(dead_code)]

extern crate alloc;

#[macro_use]
pub mod logging;

pub mod core;
pub mod mips;
pub mod savestate;

// Re-export commonly used items
pub use crate::core::{
    AfterSyscall, CallSite, DispatchOutcome, DispatchStats, HleCall, HleContext, HleEnv, HleFunc,
    HleFunction, HleModule, ModuleRegistrar, ModuleRegistry, Opcode, PostCallAction,
    PostCallOutcome, PostCallState, SyscallPatcher, UnresolvedSyscall,
};
