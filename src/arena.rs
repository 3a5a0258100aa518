//! Memory arena: a cache of blocks from a [`BlockAllocator`], with a
//! configurable growth policy, that hands blocks up to the allocators built
//! on top of it (stacks, pools) and reclaims them on shrink.
//!
//! Grounded on the teacher's `ArenaManager`: both own a handful of
//! specialized regions and expose `stats()`/`Drop`-time release, but this
//! version generalizes from "one fixed-size `BumpAlloc` per named purpose"
//! to "a growing cache of same-class blocks over any `BlockAllocator`", per
//! spec §4.7.

use crate::block::{BlockAllocator, MemoryBlock};
use crate::config;

/// Arena over a [`BlockAllocator`]. Blocks grow geometrically by
/// `growth_factor` each time the cache is empty and a fresh block has to be
/// requested; deallocated blocks return to a bounded cache for reuse before
/// ever going back to the block allocator.
pub struct MemoryArena<B: BlockAllocator> {
    block_allocator: B,
    growth_factor: f64,
    initial_block_size: usize,
    next_block_size: usize,
    max_cached: Option<usize>,
    blocks_used: Vec<MemoryBlock>,
    blocks_cached: Vec<MemoryBlock>,
}

impl<B: BlockAllocator> MemoryArena<B> {
    pub fn new(block_allocator: B, block_size: usize) -> Self {
        Self::with_growth(block_allocator, block_size, config::DEFAULT_GROWTH_FACTOR)
    }

    pub fn with_growth(block_allocator: B, block_size: usize, growth_factor: f64) -> Self {
        assert!(block_size > 0);
        assert!(growth_factor >= 1.0, "growth factor must be >= 1.0");
        Self {
            block_allocator,
            growth_factor,
            initial_block_size: block_size,
            next_block_size: block_size,
            max_cached: None,
            blocks_used: Vec::new(),
            blocks_cached: Vec::new(),
        }
    }

    /// Bounds the number of deallocated blocks kept around for reuse before
    /// further deallocations are released straight back to the block
    /// allocator. Default (unset) is unbounded.
    pub fn set_max_cached_blocks(&mut self, max_cached: usize) {
        self.max_cached = Some(max_cached);
    }

    /// Hands out a block: a cached one if available, otherwise a freshly
    /// requested one of `next_block_size`, after which `next_block_size`
    /// grows by `growth_factor`.
    pub fn allocate_block(&mut self) -> MemoryBlock {
        let block = if let Some(block) = self.blocks_cached.pop() {
            block
        } else {
            let block = self.block_allocator.allocate_block(self.next_block_size);
            let grown = (self.next_block_size as f64 * self.growth_factor).ceil() as usize;
            self.next_block_size = grown.max(self.next_block_size + 1);
            block
        };
        self.blocks_used.push(block);
        block
    }

    /// Reclaims the most recently handed-out block: either into the cache,
    /// or back to the block allocator if the cache is at capacity.
    ///
    /// # Panics
    /// If there is no live block to reclaim.
    pub fn deallocate_block(&mut self) {
        let block = self.blocks_used.pop().expect("no block to deallocate");
        self.release(block);
    }

    fn release(&mut self, block: MemoryBlock) {
        let under_cap = self
            .max_cached
            .map_or(true, |cap| self.blocks_cached.len() < cap);
        if under_cap {
            self.blocks_cached.push(block);
        } else {
            unsafe {
                self.block_allocator.deallocate_block(block);
            }
            // Growth policy under shrink: the source left this undefined
            // (spec §9 open question). We shrink `next_block_size` back
            // towards the arena's initial size by the inverse of the
            // growth step, so repeated grow/shrink cycles are roughly
            // symmetric instead of only ever ratcheting upward.
            let shrunk = (self.next_block_size as f64 / self.growth_factor).floor() as usize;
            self.next_block_size = shrunk.max(self.initial_block_size);
        }
    }

    /// Drains the cache, releasing every cached block back to the block
    /// allocator.
    pub fn shrink_to_fit(&mut self) {
        while let Some(block) = self.blocks_cached.pop() {
            unsafe {
                self.block_allocator.deallocate_block(block);
            }
        }
    }

    pub fn current_block(&self) -> Option<&MemoryBlock> {
        self.blocks_used.last()
    }

    /// Bytes across every block currently checked out of the arena.
    pub fn size(&self) -> usize {
        self.blocks_used.iter().map(|b| b.size).sum()
    }

    /// Size of the most recently handed-out block — arenas themselves hold
    /// no allocation cursor, so "capacity left" is the whole of the current
    /// block; the stack/pool built on top tracks how much of it is used.
    pub fn capacity_left(&self) -> usize {
        self.current_block().map_or(0, |b| b.size)
    }

    pub fn blocks_in_use(&self) -> usize {
        self.blocks_used.len()
    }

    pub fn blocks_cached(&self) -> usize {
        self.blocks_cached.len()
    }

    /// Size the *next* block requested from the block allocator would have,
    /// absent a cached block to reuse.
    pub fn next_block_size(&self) -> usize {
        self.next_block_size
    }

    /// Bumps `next_block_size` up to `min_size` if it's currently smaller.
    /// Lets a caller that needs a single allocation bigger than the arena's
    /// usual growth step (e.g. [`crate::memory_stack::MemoryStackAllocator`]
    /// serving an oversized request) get a block that actually fits it.
    pub fn ensure_next_block_size(&mut self, min_size: usize) {
        if self.next_block_size < min_size {
            self.next_block_size = min_size;
        }
    }
}

impl<B: BlockAllocator> Drop for MemoryArena<B> {
    fn drop(&mut self) {
        for block in self.blocks_used.drain(..) {
            unsafe {
                self.block_allocator.deallocate_block(block);
            }
        }
        for block in self.blocks_cached.drain(..) {
            unsafe {
                self.block_allocator.deallocate_block(block);
            }
        }
    }
}
