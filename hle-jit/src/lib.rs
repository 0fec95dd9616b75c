//! HLE JIT
//!
//! This crate provides the dynamic dispatch loop: the fixed set of routines
//! that bridge translated guest blocks and the emulator core. Routines are
//! generated once into a fixed-size code space, write-protected, and then
//! walked by [`DispatchLoop::run`] until the core stops running or a block
//! leaves through one of the side entries.
//!
//! # Architecture
//!
//! - **Code block**: fixed-size, write-once code space
//! - **Routines**: entry points, register layout and routine emitters
//! - **Block cache**: translated blocks keyed by guest address
//! - **Dispatch loop**: the entry-point state machine
//!
//! # Usage
//!
//! ```rust
//! use hle_api::HleConfig;
//! use hle_jit::{DescriptorEmitter, DispatchLoop, EntryPoint, RegisterLayout};
//!
//! let dispatch = DispatchLoop::new(&HleConfig::default(), RegisterLayout::default(), &mut DescriptorEmitter)?;
//! assert!(dispatch.routines().code().is_write_protected());
//! assert_eq!(dispatch.routines().entry(EntryPoint::Enter), 0);
//! # Ok::<(), hle_api::Error>(())
//! ```

#![cfg_attr(not(test), no_std)]
#![allow(dead_code)]

extern crate alloc;

pub mod block_cache;
pub mod code_block;
pub mod dispatch_loop;
pub mod routines;

// Re-export commonly used items
pub use block_cache::{BlockCache, CacheStats, CompiledBlock};
pub use code_block::{CodeBlock, CodeOffset};
pub use dispatch_loop::{BlockExecutor, BlockExit, DispatchLoop, LoopExit, LoopStats};
pub use routines::{AsmRoutineManager, DescriptorEmitter, DescriptorFlags, EntryPoint, RegisterLayout, RoutineEmitter};
