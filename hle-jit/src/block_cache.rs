//! Translated block cache
//!
//! Blocks are keyed by the guest address they start at. Rewriting guest code
//! (call-site patching, module unload) must invalidate the blocks covering
//! the rewritten range.

use alloc::vec::Vec;

use hashbrown::HashMap;
use hle_api::GuestAddr;

/// A block of guest code translated for the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledBlock {
    /// First guest address covered
    pub start: GuestAddr,
    /// Guest bytes covered
    pub guest_size: u32,
    /// Translated code, opaque to the cache
    pub code: Vec<u8>,
}

impl CompiledBlock {
    /// One past the last guest address covered
    pub fn end(&self) -> GuestAddr {
        self.start.saturating_add(self.guest_size)
    }

    /// Whether the block covers any byte of `[start, end)`
    pub fn overlaps(&self, start: GuestAddr, end: GuestAddr) -> bool {
        self.start < end && start < self.end()
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that found a block
    pub hits: u64,
    /// Lookups that did not
    pub misses: u64,
    /// Blocks dropped by invalidation
    pub invalidated: u64,
}

/// Translated blocks by start address
#[derive(Debug, Default)]
pub struct BlockCache {
    blocks: HashMap<GuestAddr, CompiledBlock>,
    stats: CacheStats,
}

impl BlockCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Block starting at `pc`
    pub fn lookup(&mut self, pc: GuestAddr) -> Option<&CompiledBlock> {
        let block = self.blocks.get(&pc);
        if block.is_some() {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
        block
    }

    /// Block starting at `pc`, without touching the counters
    pub fn get(&self, pc: GuestAddr) -> Option<&CompiledBlock> {
        self.blocks.get(&pc)
    }

    /// Whether a block starts at `pc`
    pub fn contains(&self, pc: GuestAddr) -> bool {
        self.blocks.contains_key(&pc)
    }

    /// Store a block, replacing any block with the same start
    pub fn insert(&mut self, block: CompiledBlock) {
        self.blocks.insert(block.start, block);
    }

    /// Drop every block overlapping `[start, end)`
    pub fn invalidate_range(&mut self, start: GuestAddr, end: GuestAddr) -> usize {
        let before = self.blocks.len();
        self.blocks.retain(|_, block| !block.overlaps(start, end));
        let dropped = before - self.blocks.len();
        self.stats.invalidated += dropped as u64;
        dropped
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    /// Number of cached blocks
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Lookup and invalidation counters
    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
