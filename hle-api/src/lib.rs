//! HLE API - Shared types and interfaces for the HLE syscall core
//!
//! This crate provides the types, errors and collaborator interfaces used by
//! every other crate in the workspace. Nothing here has behaviour of its own;
//! it is the seam between the syscall core and the rest of the emulator.
//!
//! # Architecture
//!
//! The API is organized into several key modules:
//!
//! - **Core**: Guest addresses, NIDs, core run state and well-known NIDs
//! - **Error**: Common error type and result alias
//! - **Guest**: Guest memory and guest CPU register access
//! - **Process**: Scheduler hooks consumed after a dispatched call
//! - **Debug**: Host debugger hooks
//! - **Config**: Runtime configuration of the HLE core
//!
//! # Usage
//!
//! ```rust
//! use hle_api::{HleConfig, Result};
//!
//! fn configure() -> Result<HleConfig> {
//!     let config = HleConfig::default().with_reschedule_reason_capacity(256);
//!     config.validate()?;
//!     Ok(config)
//! }
//! ```

#![cfg_attr(not(test), no_std)]
#![allow(dead_code)]

extern crate alloc;

pub mod config;
pub mod core;
pub mod debug;
pub mod error;
pub mod guest;
pub mod process;

// Re-export commonly used types
pub use crate::config::HleConfig;
pub use crate::core::types::*;
pub use crate::debug::interface::DebugHost;
pub use crate::error::{Error, ErrorContext, Result};
pub use crate::guest::interface::{GuestCpu, GuestMemory};
pub use crate::process::interface::Scheduler;
