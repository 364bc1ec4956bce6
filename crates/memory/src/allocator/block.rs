//! Memory blocks and the sources that hand them out
//!
//! A [`BlockSource`] owns a LIFO sequence of [`MemoryBlock`]s. The memory
//! stack bumps through the most recent one and asks for another when it
//! runs out. [`BlockList`] is the default source: it pulls blocks from an
//! upstream [`RawAllocator`] and grows them geometrically, like the chunk
//! growth of a regular arena.
//!
//! ## Growth policy
//!
//! ```text
//! size(0) = initial
//! size(k) = min(max_block_size, ceil(size(k - 1) * growth_factor))
//! ```
//!
//! The size of the next block only depends on the blocks currently held, so
//! releasing a block also rewinds the policy.

use core::ptr::NonNull;

#[cfg(feature = "logging")]
use tracing::debug;

use super::{AllocResult, HeapAllocator, RawAllocator, StackConfig};

/// Alignment of every block obtained by [`BlockList`]
pub const BLOCK_ALIGNMENT: usize = 16;

/// Smallest block [`BlockList`] requests upstream
pub const MIN_BLOCK_SIZE: usize = 64;

/// Non-owning view of one contiguous memory region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBlock {
    ptr: NonNull<u8>,
    len: usize,
}

impl MemoryBlock {
    /// Creates a block view over `len` bytes starting at `ptr`
    #[inline]
    pub const fn new(ptr: NonNull<u8>, len: usize) -> Self {
        Self { ptr, len }
    }

    /// First byte of the block
    #[inline]
    pub const fn start(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Raw pointer to the first byte of the block
    #[inline]
    pub const fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Address of the first byte of the block
    #[inline]
    pub fn address(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    /// Size of the block in bytes
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the block has no usable bytes
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether `ptr` lies inside `[start, start + len)`
    #[inline]
    pub fn contains(&self, ptr: *const u8) -> bool {
        let addr = ptr as usize;
        addr >= self.address() && addr - self.address() < self.len
    }
}

/// Supplier of memory blocks for a memory stack
///
/// # Safety
///
/// Implementors must guarantee that:
/// - every block returned by `acquire` is valid for reads and writes of
///   `block.len()` bytes and not aliased by any other block
/// - a block stays valid until it is removed by `release_last`
/// - `release_last` always removes the most recently acquired block that is
///   still held (strict LIFO)
/// - `len` reports the number of held blocks and `block(i)` returns the
///   `i`-th of them, oldest first
pub unsafe trait BlockSource {
    /// Acquires the next block, sized by the growth policy
    fn acquire(&mut self) -> AllocResult<MemoryBlock>;

    /// Releases the most recently acquired block
    ///
    /// Does nothing when no block is held.
    fn release_last(&mut self);

    /// Number of blocks currently held
    fn len(&self) -> usize;

    /// Whether no blocks are held
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the block the next `acquire` would hand out
    fn next_block_size(&self) -> usize;

    /// Held block at `index` (0 is the oldest), if any
    fn block(&self, index: usize) -> Option<MemoryBlock>;
}

/// Default [`BlockSource`]: geometrically growing blocks from an upstream
/// allocator
///
/// Dropping the list returns every held block upstream, newest first.
pub struct BlockList<A: RawAllocator = HeapAllocator> {
    blocks: Vec<MemoryBlock>,
    allocator: A,
    initial_size: usize,
    growth_factor: f64,
    max_block_size: usize,
}

impl BlockList<HeapAllocator> {
    /// Creates a heap-backed list whose first block has `initial_size` bytes
    pub fn with_heap(initial_size: usize) -> Self {
        Self::new(initial_size, HeapAllocator::new())
    }
}

impl<A: RawAllocator> BlockList<A> {
    /// Creates a list with the default growth policy
    pub fn new(initial_size: usize, allocator: A) -> Self {
        let config = StackConfig::default();
        Self::with_growth(
            initial_size,
            config.growth_factor,
            config.max_block_size.max(initial_size),
            allocator,
        )
    }

    /// Creates a list following the growth policy of `config`
    pub fn from_config(config: &StackConfig, allocator: A) -> Self {
        Self::with_growth(
            config.initial_block_size,
            config.growth_factor,
            config.max_block_size,
            allocator,
        )
    }

    /// Creates a list with an explicit growth policy
    ///
    /// `growth_factor` below 1.0 is treated as 1.0 and `max_block_size` is
    /// raised to at least the initial size; sizes never drop below
    /// [`MIN_BLOCK_SIZE`].
    pub fn with_growth(
        initial_size: usize,
        growth_factor: f64,
        max_block_size: usize,
        allocator: A,
    ) -> Self {
        let initial_size = initial_size.max(MIN_BLOCK_SIZE);
        Self {
            blocks: Vec::new(),
            allocator,
            initial_size,
            growth_factor: growth_factor.max(1.0),
            max_block_size: max_block_size.max(initial_size),
        }
    }

    /// The upstream allocator
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Total bytes held across all blocks
    pub fn allocated_bytes(&self) -> usize {
        self.blocks.iter().map(MemoryBlock::len).sum()
    }

    /// The most recently acquired block, if any
    pub fn last(&self) -> Option<MemoryBlock> {
        self.blocks.last().copied()
    }

    fn grow(&self, previous: usize) -> usize {
        let scaled = (previous as f64 * self.growth_factor).ceil();
        // f64 -> usize saturates, so huge factors clamp to max_block_size
        (scaled as usize).min(self.max_block_size).max(previous)
    }
}

// SAFETY: blocks come from `allocator.allocate_node` with their exact size,
// are kept in a Vec in acquisition order and are only freed by popping the
// Vec (release_last) or in Drop, so release is strictly LIFO.
unsafe impl<A: RawAllocator> BlockSource for BlockList<A> {
    fn acquire(&mut self) -> AllocResult<MemoryBlock> {
        let size = self.next_block_size();
        let ptr = self.allocator.allocate_node(size, BLOCK_ALIGNMENT)?;
        let block = MemoryBlock::new(ptr, size);
        self.blocks.push(block);

        #[cfg(feature = "logging")]
        debug!(
            size,
            blocks = self.blocks.len(),
            "memory stack block acquired"
        );

        Ok(block)
    }

    fn release_last(&mut self) {
        if let Some(block) = self.blocks.pop() {
            // SAFETY: block was produced by allocate_node with exactly this
            // size and alignment and has just been removed from the list.
            unsafe {
                self.allocator
                    .deallocate_node(block.start(), block.len(), BLOCK_ALIGNMENT);
            }

            #[cfg(feature = "logging")]
            debug!(
                size = block.len(),
                blocks = self.blocks.len(),
                "memory stack block released"
            );
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    fn next_block_size(&self) -> usize {
        match self.blocks.last() {
            Some(block) => self.grow(block.len()),
            None => self.initial_size,
        }
    }

    #[inline]
    fn block(&self, index: usize) -> Option<MemoryBlock> {
        self.blocks.get(index).copied()
    }
}

impl<A: RawAllocator> Drop for BlockList<A> {
    fn drop(&mut self) {
        while !self.blocks.is_empty() {
            self.release_last();
        }
    }
}

impl<A: RawAllocator + core::fmt::Debug> core::fmt::Debug for BlockList<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BlockList")
            .field("blocks", &self.blocks.len())
            .field("allocated_bytes", &self.allocated_bytes())
            .field("next_block_size", &self.next_block_size())
            .field("allocator", &self.allocator)
            .finish()
    }
}
