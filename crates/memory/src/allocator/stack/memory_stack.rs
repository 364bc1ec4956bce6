//! Main memory stack implementation
//!
//! # Safety
//!
//! This module implements a single-threaded, growable stack allocator:
//! - `RefCell` around the block source (acquire/release from `&self`)
//! - `Cell` for the free-space cursor (no synchronization, single-threaded)
//! - Blocks grow on demand through the [`BlockSource`] growth policy
//! - Markers enable bulk deallocation by rewinding to a saved position
//!
//! ## Invariants
//!
//! - The cursor always spans part of the most recently acquired block
//! - `cursor.start <= cursor.end <= block.len()`
//! - Allocations never overlap (the cursor only moves forward between unwinds)
//! - At least one block is held for the whole lifetime of the stack
//!
//! ## Not Thread-Safe
//!
//! - Uses `Cell`/`RefCell` instead of atomics, so the type is `!Sync`
//! - Use one memory stack per thread

use core::cell::{Cell, RefCell};
use core::fmt;
use core::ptr::{self, NonNull};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

use super::cursor::Cursor;
use super::stats::StackCounters;
use super::{StackAllocator, StackConfig, StackFrame, StackMarker, StackStats};
use crate::allocator::{BlockList, BlockSource, HeapAllocator, MemoryBlock, RawAllocator};
use crate::error::{MemoryError, MemoryResult};
use crate::utils::is_aligned;

#[cfg(debug_assertions)]
fn next_stack_id() -> u64 {
    use core::sync::atomic::{AtomicU64, Ordering};

    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Growable stack allocator with marker-based bulk deallocation
///
/// Memory is handed out by bumping a cursor through the current block. When a
/// request does not fit, the next block is acquired from the block source and
/// the request is served from there. Nothing is freed individually: capture a
/// [`StackMarker`] with [`top`](Self::top) and later [`unwind`](Self::unwind)
/// to it to free everything allocated in between, releasing any blocks
/// acquired since.
///
/// # Memory Layout
/// ```text
/// block 0: [alloc1][alloc2][pad][alloc3]......(unused tail)
/// block 1: [alloc4][alloc5]----[start]----[free]----[end]
///                              <---- capacity() ---->
/// ```
///
/// # Examples
///
/// ```rust
/// use cairn_memory::allocator::MemoryStack;
///
/// let stack = MemoryStack::new(1024)?;
/// let marker = stack.top();
///
/// let ptr = stack.allocate(100, 8)?;
/// assert_eq!(ptr.as_ptr() as usize % 8, 0);
///
/// // SAFETY: `ptr` is not used after this point.
/// unsafe { stack.unwind(marker) };
/// # Ok::<(), cairn_memory::MemoryError>(())
/// ```
pub struct MemoryStack<S: BlockSource = BlockList> {
    source: RefCell<S>,
    cursor: Cell<Cursor>,
    /// Position right after construction, target of `reset`
    bottom: StackMarker,
    config: StackConfig,
    stats: StackCounters,
    #[cfg(debug_assertions)]
    id: u64,
}

impl MemoryStack<BlockList<HeapAllocator>> {
    /// Creates a heap-backed memory stack whose first block has `block_size`
    /// bytes
    pub fn new(block_size: usize) -> MemoryResult<Self> {
        Self::with_allocator(block_size, HeapAllocator::new())
    }

    /// Creates a production-optimized memory stack
    pub fn production(block_size: usize) -> MemoryResult<Self> {
        let config = StackConfig::production()
            .with_initial_block_size(block_size)
            .with_max_block_size(StackConfig::production().max_block_size.max(block_size));
        Self::with_config(config, HeapAllocator::new())
    }

    /// Creates a debug-optimized memory stack
    pub fn debug(block_size: usize) -> MemoryResult<Self> {
        let config = StackConfig::debug()
            .with_initial_block_size(block_size)
            .with_max_block_size(StackConfig::debug().max_block_size.max(block_size));
        Self::with_config(config, HeapAllocator::new())
    }
}

impl<A: RawAllocator> MemoryStack<BlockList<A>> {
    /// Creates a memory stack drawing blocks from `allocator`
    pub fn with_allocator(block_size: usize, allocator: A) -> MemoryResult<Self> {
        Self::from_source(BlockList::new(block_size, allocator))
    }

    /// Creates a memory stack with custom configuration
    pub fn with_config(config: StackConfig, allocator: A) -> MemoryResult<Self> {
        config.validate()?;
        let source = BlockList::from_config(&config, allocator);
        Self::from_source_with_config(source, config)
    }
}

impl<S: BlockSource> MemoryStack<S> {
    /// Creates a memory stack on top of an existing block source
    ///
    /// Eagerly acquires the first block.
    pub fn from_source(source: S) -> MemoryResult<Self> {
        Self::from_source_with_config(source, StackConfig::default())
    }

    /// Creates a memory stack on top of an existing block source with custom
    /// configuration
    ///
    /// Only the diagnostics settings of `config` apply here; block sizes are
    /// the source's business.
    pub fn from_source_with_config(mut source: S, config: StackConfig) -> MemoryResult<Self> {
        let block = source.acquire()?;
        let cursor = Cursor::spanning(block);
        let index = source.len();

        #[cfg(debug_assertions)]
        let id = next_stack_id();

        let stats = StackCounters::default();
        if config.track_stats {
            stats.record_block_acquired(index);
        }

        #[cfg(feature = "logging")]
        debug!(
            block_size = block.len(),
            next_block_size = source.next_block_size(),
            "memory stack created"
        );

        Ok(Self {
            source: RefCell::new(source),
            cursor: Cell::new(cursor),
            bottom: StackMarker {
                index,
                cursor,
                #[cfg(debug_assertions)]
                owner: id,
            },
            config,
            stats,
            #[cfg(debug_assertions)]
            id,
        })
    }

    /// Allocates `size` bytes aligned to `alignment`
    ///
    /// Acquires a new block when the request does not fit into the current
    /// one. The returned memory is uninitialized (or filled with the debug
    /// allocation pattern) and stays valid until the stack is unwound past
    /// this allocation or dropped.
    ///
    /// # Errors
    /// - [`MemoryError::InvalidAlignment`] if `alignment` is not a power of
    ///   two
    /// - [`MemoryError::BlockTooSmall`] if the request does not fit even a
    ///   freshly acquired block; the stack is left unchanged
    /// - [`MemoryError::AllocationFailed`] if the block source could not
    ///   obtain a new block; the stack is left unchanged
    #[must_use = "allocated memory must be used"]
    #[inline]
    pub fn allocate(&self, size: usize, alignment: usize) -> MemoryResult<NonNull<u8>> {
        if !alignment.is_power_of_two() {
            return Err(MemoryError::invalid_alignment(alignment));
        }

        let mut cursor = self.cursor.get();
        let padding = match cursor.fit(size, alignment) {
            Some(padding) => padding,
            None => {
                let (grown, padding) = self.grow(size, alignment)?;
                cursor = grown;
                padding
            }
        };

        let ptr = cursor.bump(padding, size);
        debug_assert!(is_aligned(ptr.as_ptr() as usize, alignment));
        self.cursor.set(cursor);

        if let Some(pattern) = self.config.alloc_pattern {
            // SAFETY: [ptr, ptr + size) was just carved out of the active
            // block and belongs to no other allocation.
            unsafe { ptr::write_bytes(ptr.as_ptr(), pattern, size) };
        }

        if self.config.track_stats {
            self.stats.record_allocation(size, padding);
        }

        Ok(ptr)
    }

    /// Acquires the next block and checks that the request fits into it
    #[cold]
    #[inline(never)]
    fn grow(&self, size: usize, alignment: usize) -> MemoryResult<(Cursor, usize)> {
        let mut source = self.source.borrow_mut();
        let block = source.acquire()?;
        let cursor = Cursor::spanning(block);

        match cursor.fit(size, alignment) {
            Some(padding) => {
                if self.config.track_stats {
                    self.stats.record_block_acquired(source.len());
                }
                Ok((cursor, padding))
            }
            None => {
                // Hand the useless block straight back; the old cursor stays.
                source.release_last();
                Err(MemoryError::block_too_small(size, alignment, block.len()))
            }
        }
    }

    /// Returns a marker for the current top of the stack
    #[inline]
    pub fn top(&self) -> StackMarker {
        StackMarker {
            index: self.source.borrow().len(),
            cursor: self.cursor.get(),
            #[cfg(debug_assertions)]
            owner: self.id,
        }
    }

    /// Unwinds the stack to `marker`
    ///
    /// Releases every block acquired after the marker was taken (newest
    /// first) and restores the cursor. Unwinding to the current top is a
    /// no-op.
    ///
    /// # Safety
    /// - `marker` must come from [`top`](Self::top) on this stack
    /// - markers must be unwound in nested order: `marker` must not have been
    ///   invalidated by unwinding to an older marker
    /// - memory allocated after `marker` was taken must not be used afterwards
    ///
    /// Debug builds check the first two requirements and panic on violation.
    pub unsafe fn unwind(&self, marker: StackMarker) {
        #[cfg(debug_assertions)]
        self.check_marker(&marker);

        let released = {
            let mut source = self.source.borrow_mut();
            let released = source.len().saturating_sub(marker.index);
            for _ in 0..released {
                source.release_last();
            }
            released
        };

        if let Some(pattern) = self.config.dealloc_pattern {
            let current = self.cursor.get();
            let freed_end = if released == 0 {
                current.start
            } else {
                marker.cursor.end
            };
            let freed = freed_end.saturating_sub(marker.cursor.start);
            // SAFETY: [start, freed_end) lies inside the marker's block, which
            // is still held, and the caller gave up every allocation in it.
            unsafe {
                ptr::write_bytes(
                    marker.cursor.block.as_ptr().add(marker.cursor.start),
                    pattern,
                    freed,
                );
            }
        }

        self.cursor.set(marker.cursor);

        if self.config.track_stats {
            self.stats.record_unwind(released);
        }

        #[cfg(feature = "logging")]
        trace!(
            released_blocks = released,
            capacity = marker.cursor.remaining(),
            "memory stack unwound"
        );
    }

    #[cfg(debug_assertions)]
    fn check_marker(&self, marker: &StackMarker) {
        assert_eq!(
            marker.owner, self.id,
            "marker was taken from a different memory stack"
        );

        let (held, block) = {
            let source = self.source.borrow();
            let block = marker.index.checked_sub(1).and_then(|i| source.block(i));
            (source.len(), block)
        };
        assert!(
            marker.index <= held && block == Some(marker.cursor.block),
            "marker refers to a block that was already released"
        );

        if marker.index == held {
            let current = self.cursor.get();
            assert!(
                marker.cursor.block == current.block && marker.cursor.start <= current.start,
                "markers must be unwound in nested order"
            );
        }
    }

    /// Frees everything and keeps only the initial block
    ///
    /// # Safety
    /// No memory allocated from this stack may be used afterwards.
    pub unsafe fn reset(&self) {
        // SAFETY: `bottom` was taken at construction and is older than any
        // other marker; the caller gave up all allocations.
        unsafe { self.unwind(self.bottom) };
    }

    /// Opens a scope that unwinds to the current top when dropped
    ///
    /// Taking `&mut self` makes scopes nest strictly; allocate through the
    /// returned [`StackFrame`].
    pub fn scope(&mut self) -> StackFrame<'_, S> {
        StackFrame::new(self)
    }

    /// Returns a [`RawAllocator`] handle over this stack
    pub fn allocator(&self) -> StackAllocator<'_, S> {
        StackAllocator::new(self)
    }

    /// Bytes left in the current block
    #[inline]
    pub fn capacity(&self) -> usize {
        self.cursor.get().remaining()
    }

    /// Size of the block the stack would acquire next
    ///
    /// Any request with `size + padding` up to this value is guaranteed not to
    /// fail with [`MemoryError::BlockTooSmall`].
    #[inline]
    pub fn next_capacity(&self) -> usize {
        self.source.borrow().next_block_size()
    }

    /// Number of blocks currently held
    #[inline]
    pub fn block_count(&self) -> usize {
        self.source.borrow().len()
    }

    /// The underlying block source
    ///
    /// Borrows the stack mutably, so nothing can allocate or unwind while the
    /// reference is alive.
    pub fn source(&mut self) -> &S {
        self.source.get_mut()
    }

    /// The block allocations are currently carved from
    #[inline]
    pub fn active_block(&self) -> MemoryBlock {
        self.cursor.get().block
    }

    /// The active configuration
    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    /// Whether `ptr` lies in the used part of the active block
    pub fn owns_in_current_block(&self, ptr: *const u8) -> bool {
        let cursor = self.cursor.get();
        cursor.block.contains(ptr) && (ptr as usize) < cursor.address()
    }

    /// Statistics snapshot; all zeros unless `track_stats` is enabled
    pub fn statistics(&self) -> StackStats {
        self.stats.snapshot()
    }

    /// Whether statistics are being collected
    pub fn statistics_enabled(&self) -> bool {
        self.config.track_stats
    }

    /// Clears the collected statistics
    pub fn reset_statistics(&self) {
        let held = if self.config.track_stats {
            self.block_count()
        } else {
            0
        };
        self.stats.reset(held);
    }
}

impl<S: BlockSource> fmt::Debug for MemoryStack<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStack")
            .field("blocks", &self.block_count())
            .field("capacity", &self.capacity())
            .field("next_capacity", &self.next_capacity())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet(block_size: usize) -> MemoryStack {
        let config = StackConfig::default()
            .with_initial_block_size(block_size)
            .with_stats(true)
            .with_patterns(None, None);
        MemoryStack::with_config(config, HeapAllocator::new()).unwrap()
    }

    #[test]
    fn test_construction_acquires_one_block() {
        let stack = MemoryStack::new(1024).unwrap();
        assert_eq!(stack.block_count(), 1);
        assert_eq!(stack.capacity(), 1024);
        assert!(stack.next_capacity() >= 1024);
    }

    #[test]
    fn test_allocation_bumps_cursor() {
        let stack = quiet(1024);
        let a = stack.allocate(100, 8).unwrap();
        let b = stack.allocate(28, 4).unwrap();

        assert_eq!(a.as_ptr() as usize % 8, 0);
        assert_eq!(b.as_ptr() as usize, a.as_ptr() as usize + 100);
        assert_eq!(stack.capacity(), 1024 - 128);
        assert!(stack.owns_in_current_block(a.as_ptr()));
    }

    #[test]
    fn test_invalid_alignment_is_rejected() {
        let stack = quiet(256);
        let err = stack.allocate(8, 12).unwrap_err();
        assert!(err.is_invalid_alignment());
        assert_eq!(stack.capacity(), 256);
    }

    #[test]
    fn test_overflow_acquires_new_block() {
        let stack = quiet(256);
        let _ = stack.allocate(200, 8).unwrap();
        let big = stack.allocate(100, 8).unwrap();

        assert_eq!(stack.block_count(), 2);
        assert_eq!(stack.capacity(), 512 - 100);
        assert!(stack.owns_in_current_block(big.as_ptr()));
    }

    #[test]
    fn test_block_too_small_leaves_stack_unchanged() {
        let stack = quiet(256);
        let before = (stack.block_count(), stack.capacity(), stack.next_capacity());

        let err = stack.allocate(4096, 8).unwrap_err();
        assert!(matches!(err, MemoryError::BlockTooSmall { block_size: 512, .. }));
        assert_eq!(
            (stack.block_count(), stack.capacity(), stack.next_capacity()),
            before
        );
    }

    #[test]
    fn test_unwind_restores_position() {
        let stack = quiet(256);
        let marker = stack.top();
        let first = stack.allocate(16, 16).unwrap();
        let _ = stack.allocate(300, 8).unwrap();
        assert_eq!(stack.block_count(), 2);

        unsafe { stack.unwind(marker) };
        assert_eq!(stack.block_count(), 1);
        assert_eq!(stack.capacity(), 256);

        let again = stack.allocate(16, 16).unwrap();
        assert_eq!(again, first);
    }

    #[test]
    fn test_dealloc_pattern_overwrites_freed_range() {
        let config = StackConfig::default()
            .with_initial_block_size(128)
            .with_patterns(Some(0xCC), Some(0xDD));
        let stack = MemoryStack::with_config(config, HeapAllocator::new()).unwrap();

        let marker = stack.top();
        let ptr = stack.allocate(32, 1).unwrap();
        unsafe {
            assert_eq!(*ptr.as_ptr(), 0xCC);
            stack.unwind(marker);
            // The block is still held by the stack, so reading it is fine.
            assert_eq!(*ptr.as_ptr().add(31), 0xDD);
        }
    }

    #[test]
    fn test_reset_keeps_initial_block() {
        let stack = quiet(128);
        for _ in 0..10 {
            let _ = stack.allocate(100, 8).unwrap();
        }
        assert!(stack.block_count() > 1);

        unsafe { stack.reset() };
        assert_eq!(stack.block_count(), 1);
        assert_eq!(stack.capacity(), 128);
    }

    #[test]
    fn test_statistics() {
        let stack = quiet(128);
        let marker = stack.top();
        let _ = stack.allocate(1, 1).unwrap();
        let _ = stack.allocate(8, 8).unwrap();
        let _ = stack.allocate(200, 8).unwrap();
        unsafe { stack.unwind(marker) };

        let stats = stack.statistics();
        assert_eq!(stats.allocations, 3);
        assert_eq!(stats.bytes_allocated, 209);
        assert_eq!(stats.padding_bytes, 7);
        assert_eq!(stats.blocks_acquired, 2);
        assert_eq!(stats.blocks_released, 1);
        assert_eq!(stats.unwinds, 1);
        assert_eq!(stats.peak_blocks, 2);

        stack.reset_statistics();
        assert_eq!(stack.statistics().allocations, 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "nested order")]
    fn test_out_of_order_unwind_is_caught() {
        let stack = quiet(256);
        let outer = stack.top();
        let _ = stack.allocate(8, 8).unwrap();
        let inner = stack.top();
        let _ = stack.allocate(8, 8).unwrap();

        unsafe {
            stack.unwind(outer);
            stack.unwind(inner);
        }
    }

    #[test]
    fn test_reset_statistics_without_tracking_stays_zero() {
        let stack = MemoryStack::production(256).unwrap();
        let _ = stack.allocate(300, 8).unwrap();

        stack.reset_statistics();
        assert_eq!(stack.statistics(), StackStats::default());
    }

    #[test]
    fn test_source_access_then_growth() {
        let mut stack = quiet(256);
        let held = stack.source().allocated_bytes();
        assert_eq!(held, 256);

        let marker = stack.top();
        let ptr = stack.allocate(400, 8).unwrap();
        assert_eq!(stack.source().allocated_bytes(), 256 + 512);
        assert!(stack.active_block().contains(ptr.as_ptr()));

        unsafe { stack.unwind(marker) };
        assert_eq!(stack.source().allocated_bytes(), 256);
    }

    /// Fixed-size blocks whose addresses are never handed out twice
    struct NeverReused {
        storage: Vec<Box<[u128]>>,
        blocks: Vec<MemoryBlock>,
    }

    unsafe impl BlockSource for NeverReused {
        fn acquire(&mut self) -> MemoryResult<MemoryBlock> {
            let mut chunk = vec![0u128; 16].into_boxed_slice();
            let ptr = NonNull::new(chunk.as_mut_ptr().cast::<u8>()).unwrap();
            self.storage.push(chunk);
            let block = MemoryBlock::new(ptr, 256);
            self.blocks.push(block);
            Ok(block)
        }

        fn release_last(&mut self) {
            self.blocks.pop();
        }

        fn len(&self) -> usize {
            self.blocks.len()
        }

        fn next_block_size(&self) -> usize {
            256
        }

        fn block(&self, index: usize) -> Option<MemoryBlock> {
            self.blocks.get(index).copied()
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "already released")]
    fn test_marker_into_replaced_block_is_caught() {
        let source = NeverReused {
            storage: Vec::new(),
            blocks: Vec::new(),
        };
        let stack = MemoryStack::from_source(source).unwrap();
        let bottom = stack.top();

        let _ = stack.allocate(200, 8).unwrap();
        let _ = stack.allocate(200, 8).unwrap();
        let stale = stack.top();
        unsafe { stack.unwind(bottom) };

        // regrow past the stale marker's block index with fresh blocks
        for _ in 0..3 {
            let _ = stack.allocate(200, 8).unwrap();
        }
        assert_eq!(stack.block_count(), 3);

        unsafe { stack.unwind(stale) };
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "different memory stack")]
    fn test_foreign_marker_is_caught() {
        let a = quiet(256);
        let b = quiet(256);
        let marker = a.top();
        unsafe { b.unwind(marker) };
    }

    #[test]
    fn test_debug_format() {
        let stack = quiet(256);
        let debug = format!("{stack:?}");
        assert!(debug.contains("MemoryStack"));
        assert!(debug.contains("blocks: 1"));
    }
}
