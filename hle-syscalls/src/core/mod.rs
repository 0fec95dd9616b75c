//! Core syscall functionality
//!
//! This module provides the module registry, opcode encoding, call-site
//! patching, dispatch and the post-call action coordinator.

pub mod context;
pub mod dispatcher;
pub mod encoding;
pub mod function;
pub mod patcher;
pub mod post_call;
pub mod registry;

// Re-export commonly used items
pub use context::{HleContext, HleEnv};
pub use dispatcher::{DispatchOutcome, DispatchStats};
pub use encoding::Opcode;
pub use function::{HleCall, HleFunc, HleFunction};
pub use patcher::{CallSite, SyscallPatcher, UnresolvedSyscall};
pub use post_call::{AfterSyscall, PostCallAction, PostCallOutcome, PostCallState};
pub use registry::{HleModule, ModuleRegistrar, ModuleRegistry};
