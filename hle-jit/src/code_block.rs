//! Fixed-size code space
//!
//! Routines are written into the block once, after which the block is
//! write-protected for the rest of its life. Writing into a protected block
//! is a broken invariant, not a recoverable error, and panics.

use alloc::vec;
use alloc::vec::Vec;

use hle_api::{Error, MemoryProtection, Result};
use hle_syscalls::sys_debug;

/// Byte offset of generated code inside its block
pub type CodeOffset = usize;

/// A fixed-size buffer of generated host code
pub struct CodeBlock {
    space: Vec<u8>,
    used: usize,
    protection: MemoryProtection,
}

impl CodeBlock {
    /// Allocate `size` bytes of writable code space
    pub fn alloc(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::ConfigError("code space size must be non-zero".into()));
        }
        sys_debug!("allocated {} bytes of code space", size);
        Ok(Self {
            space: vec![0; size],
            used: 0,
            protection: MemoryProtection::READ | MemoryProtection::WRITE,
        })
    }

    /// Total size in bytes
    pub fn capacity(&self) -> usize {
        self.space.len()
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.used
    }

    /// Whether nothing has been written
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Bytes still free
    pub fn remaining(&self) -> usize {
        self.space.len() - self.used
    }

    /// Offset the next write lands at
    pub fn code_ptr(&self) -> CodeOffset {
        self.used
    }

    /// Current protection
    pub fn protection(&self) -> MemoryProtection {
        self.protection
    }

    /// Whether the block no longer accepts writes
    pub fn is_write_protected(&self) -> bool {
        !self.protection.contains(MemoryProtection::WRITE)
    }

    /// Append `bytes`, returning the offset they start at
    ///
    /// # Panics
    ///
    /// Panics if the block has been write-protected.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<CodeOffset> {
        if self.is_write_protected() {
            panic!("write of {} bytes into write-protected code space", bytes.len());
        }
        if bytes.len() > self.remaining() {
            return Err(Error::OutOfMemory);
        }

        let start = self.used;
        self.space[start..start + bytes.len()].copy_from_slice(bytes);
        self.used += bytes.len();
        Ok(start)
    }

    /// Make the block read-only and executable
    pub fn write_protect(&mut self) {
        self.protection = MemoryProtection::READ | MemoryProtection::EXEC;
        sys_debug!("code space write-protected with {} of {} bytes used", self.used, self.space.len());
    }

    /// `len` bytes of generated code starting at `offset`
    pub fn bytes_at(&self, offset: CodeOffset, len: usize) -> Option<&[u8]> {
        let end = offset.checked_add(len)?;
        if end > self.used {
            return None;
        }
        Some(&self.space[offset..end])
    }

    /// Everything generated so far
    pub fn code(&self) -> &[u8] {
        &self.space[..self.used]
    }
}

impl Drop for CodeBlock {
    fn drop(&mut self) {
        sys_debug!("freeing {} bytes of code space", self.space.len());
    }
}
