//! Shared helpers for integration tests
#![allow(dead_code)]

use std::cell::Cell;
use std::ptr::NonNull;
use std::rc::Rc;

use cairn_memory::allocator::{
    AllocResult, BLOCK_ALIGNMENT, BlockSource, HeapAllocator, MemoryBlock, RawAllocator,
};
use cairn_memory::MemoryError;

/// Block source handing out blocks of one fixed size
///
/// `limit` caps the number of blocks held at once; acquiring past it fails
/// like an exhausted upstream would.
#[derive(Debug)]
pub struct FixedBlocks {
    block_size: usize,
    limit: Option<usize>,
    blocks: Vec<MemoryBlock>,
    heap: HeapAllocator,
}

impl FixedBlocks {
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size,
            limit: None,
            blocks: Vec::new(),
            heap: HeapAllocator::new(),
        }
    }

    pub fn with_limit(block_size: usize, limit: usize) -> Self {
        let mut source = Self::new(block_size);
        source.limit = Some(limit);
        source
    }
}

// SAFETY: blocks are fresh heap allocations of exactly `block_size` bytes,
// freed only by popping them off the Vec.
unsafe impl BlockSource for FixedBlocks {
    fn acquire(&mut self) -> AllocResult<MemoryBlock> {
        if self.limit.is_some_and(|limit| self.blocks.len() >= limit) {
            return Err(MemoryError::allocation_failed(
                self.block_size,
                BLOCK_ALIGNMENT,
            ));
        }
        let ptr = self.heap.allocate_node(self.block_size, BLOCK_ALIGNMENT)?;
        let block = MemoryBlock::new(ptr, self.block_size);
        self.blocks.push(block);
        Ok(block)
    }

    fn release_last(&mut self) {
        if let Some(block) = self.blocks.pop() {
            unsafe {
                self.heap
                    .deallocate_node(block.start(), block.len(), BLOCK_ALIGNMENT);
            }
        }
    }

    fn len(&self) -> usize {
        self.blocks.len()
    }

    fn next_block_size(&self) -> usize {
        self.block_size
    }

    fn block(&self, index: usize) -> Option<MemoryBlock> {
        self.blocks.get(index).copied()
    }
}

impl Drop for FixedBlocks {
    fn drop(&mut self) {
        while !self.blocks.is_empty() {
            self.release_last();
        }
    }
}

/// Upstream allocator that tracks live nodes and can run out
///
/// Clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct TrackingAllocator {
    live: Rc<Cell<usize>>,
    total: Rc<Cell<usize>>,
    budget: Option<Rc<Cell<usize>>>,
}

impl TrackingAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every allocation after the first `allocations`
    pub fn with_budget(allocations: usize) -> Self {
        Self {
            budget: Some(Rc::new(Cell::new(allocations))),
            ..Self::default()
        }
    }

    /// Nodes currently allocated and not yet returned
    pub fn live(&self) -> usize {
        self.live.get()
    }

    /// Nodes allocated over the allocator's lifetime
    pub fn total(&self) -> usize {
        self.total.get()
    }
}

// SAFETY: delegates storage to the system heap.
unsafe impl RawAllocator for TrackingAllocator {
    fn allocate_node(&self, size: usize, alignment: usize) -> AllocResult<NonNull<u8>> {
        if let Some(budget) = &self.budget {
            if budget.get() == 0 {
                return Err(MemoryError::allocation_failed(size, alignment));
            }
            budget.set(budget.get() - 1);
        }
        let ptr = HeapAllocator::new().allocate_node(size, alignment)?;
        self.live.set(self.live.get() + 1);
        self.total.set(self.total.get() + 1);
        Ok(ptr)
    }

    unsafe fn deallocate_node(&self, ptr: NonNull<u8>, size: usize, alignment: usize) {
        self.live.set(self.live.get() - 1);
        unsafe { HeapAllocator::new().deallocate_node(ptr, size, alignment) };
    }

    fn max_node_size(&self) -> usize {
        HeapAllocator::new().max_node_size()
    }
}
