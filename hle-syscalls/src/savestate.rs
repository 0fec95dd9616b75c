//! Save-state support for the deferred syscall list
//!
//! The deferred list is the only HLE state that survives a save state. It is
//! written as one `bincode` section tagged with a marker and a version.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use hle_api::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::core::patcher::{SyscallPatcher, UnresolvedSyscall};

/// Section marker written in front of the deferred list
pub const SECTION_MARKER: &str = "HLE";
/// Current section version
pub const SECTION_VERSION: u8 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct DeferredSection {
    marker: String,
    version: u8,
    entries: Vec<UnresolvedSyscall>,
}

/// Serialize the deferred list of `patcher`
pub fn save_deferred(patcher: &SyscallPatcher) -> Result<Vec<u8>> {
    let section = DeferredSection {
        marker: SECTION_MARKER.into(),
        version: SECTION_VERSION,
        entries: patcher.unresolved().to_vec(),
    };
    bincode::serde::encode_to_vec(&section, bincode::config::standard())
        .map_err(|e| Error::SystemError(format!("failed to encode HLE section: {}", e)))
}

/// Replace the deferred list of `patcher` with a saved one
///
/// The patcher is left untouched when the section cannot be read.
pub fn load_deferred(patcher: &mut SyscallPatcher, bytes: &[u8]) -> Result<()> {
    let (section, read): (DeferredSection, usize) =
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| Error::ParseError(format!("HLE section: {}", e)))?;

    if read != bytes.len() {
        return Err(Error::ParseError(format!(
            "HLE section: {} trailing bytes",
            bytes.len() - read
        )));
    }
    if section.marker != SECTION_MARKER {
        return Err(Error::InvalidState(format!(
            "expected section {}, found {}",
            SECTION_MARKER, section.marker
        )));
    }
    if section.version == 0 || section.version > SECTION_VERSION {
        return Err(Error::InvalidState(format!(
            "unsupported HLE section version {}",
            section.version
        )));
    }

    sys_debug!("restored {} deferred syscalls", section.entries.len());
    patcher.restore_unresolved(section.entries);
    Ok(())
}
