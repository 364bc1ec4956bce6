//! Heap allocator implementation
//!
//! Wraps the system's default memory allocator behind [`RawAllocator`]. It is
//! the default upstream provider for [`BlockList`](super::BlockList) and the
//! general-purpose counterpart to the arena-backed
//! [`StackAllocator`](super::StackAllocator).

use core::alloc::Layout;
use core::ptr::NonNull;
use std::alloc::{GlobalAlloc, System};

use super::{AllocError, AllocResult, RawAllocator};

/// Wrapper for the system's default allocator
///
/// Stateless and zero-sized; copies are free. Thread-safe, as the platform
/// allocator is.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapAllocator;

impl HeapAllocator {
    /// Creates a new HeapAllocator
    #[inline]
    pub const fn new() -> Self {
        HeapAllocator
    }

    #[inline]
    fn layout(size: usize, alignment: usize) -> AllocResult<Layout> {
        if !alignment.is_power_of_two() {
            return Err(AllocError::invalid_alignment(alignment));
        }
        Layout::from_size_align(size, alignment)
            .map_err(|_| AllocError::size_overflow("heap layout"))
    }
}

// SAFETY: every non-empty node comes straight from `System.alloc` with a
// matching layout; zero-size nodes are aligned dangling pointers that are
// never dereferenced or freed.
unsafe impl RawAllocator for HeapAllocator {
    #[inline]
    fn allocate_node(&self, size: usize, alignment: usize) -> AllocResult<NonNull<u8>> {
        let layout = Self::layout(size, alignment)?;

        if layout.size() == 0 {
            // Aligned dangling pointer: alignment is a non-zero power of two.
            let addr = core::ptr::without_provenance_mut::<u8>(layout.align());
            return NonNull::new(addr).ok_or_else(|| AllocError::invalid_alignment(alignment));
        }

        // SAFETY: layout has non-zero size (checked above).
        let ptr = unsafe { System.alloc(layout) };
        NonNull::new(ptr).ok_or_else(|| AllocError::allocation_failed_with_layout(layout))
    }

    #[inline]
    unsafe fn deallocate_node(&self, ptr: NonNull<u8>, size: usize, alignment: usize) {
        if size == 0 {
            return;
        }

        // SAFETY: caller guarantees size/alignment match the allocation, which
        // was created from this exact layout.
        unsafe {
            let layout = Layout::from_size_align_unchecked(size, alignment);
            System.dealloc(ptr.as_ptr(), layout);
        }
    }

    fn max_node_size(&self) -> usize {
        isize::MAX as usize
    }
}
