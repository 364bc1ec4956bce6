//! Generic allocation capability set
//!
//! Allocation-aware code is written once against [`RawAllocator`] and then
//! runs on any backend: the system heap ([`HeapAllocator`]) or a memory stack
//! ([`StackAllocator`]).
//!
//! # Safety
//!
//! [`RawAllocator`] is an `unsafe trait`: implementors promise that every
//! pointer returned from `allocate_node` is valid for reads and writes of
//! `size` bytes, aligned to `alignment`, and not aliased by any other live
//! allocation of the same allocator. Memory content is uninitialized.
//!
//! [`HeapAllocator`]: super::HeapAllocator
//! [`StackAllocator`]: super::StackAllocator

use core::mem;
use core::ptr::NonNull;

use super::{AllocError, AllocResult};

/// Raw node/array allocation interface
///
/// # Safety
///
/// Implementors must uphold the contract described in the module docs.
pub unsafe trait RawAllocator {
    /// Allocates `size` bytes aligned to `alignment`
    ///
    /// `alignment` must be a power of two; implementations reject anything
    /// else with [`AllocError::InvalidAlignment`].
    fn allocate_node(&self, size: usize, alignment: usize) -> AllocResult<NonNull<u8>>;

    /// Returns a node to the allocator
    ///
    /// Allocators are free to treat this as a no-op.
    ///
    /// # Safety
    /// - `ptr` must come from `allocate_node` on this allocator
    /// - `size` and `alignment` must match the original request
    /// - `ptr` must not be used afterwards
    unsafe fn deallocate_node(&self, ptr: NonNull<u8>, size: usize, alignment: usize);

    /// Allocates a contiguous array of `count` elements of `size` bytes
    fn allocate_array(
        &self,
        count: usize,
        size: usize,
        alignment: usize,
    ) -> AllocResult<NonNull<u8>> {
        let total = count
            .checked_mul(size)
            .ok_or_else(|| AllocError::size_overflow("array allocation size"))?;
        self.allocate_node(total, alignment)
    }

    /// Returns an array obtained from `allocate_array`
    ///
    /// # Safety
    /// Same requirements as [`deallocate_node`](Self::deallocate_node), with
    /// `count`, `size` and `alignment` matching the original request.
    unsafe fn deallocate_array(
        &self,
        ptr: NonNull<u8>,
        count: usize,
        size: usize,
        alignment: usize,
    ) {
        // SAFETY: forwarded caller contract; the product cannot overflow since
        // allocate_array succeeded with the same arguments.
        unsafe { self.deallocate_node(ptr, count.saturating_mul(size), alignment) };
    }

    /// Largest single node the allocator guarantees to serve
    fn max_node_size(&self) -> usize;

    /// Largest single array (in bytes) the allocator guarantees to serve
    fn max_array_size(&self) -> usize {
        self.max_node_size()
    }
}

// SAFETY: forwards every call to the underlying allocator, preserving its
// guarantees.
unsafe impl<T: RawAllocator + ?Sized> RawAllocator for &T {
    #[inline]
    fn allocate_node(&self, size: usize, alignment: usize) -> AllocResult<NonNull<u8>> {
        (**self).allocate_node(size, alignment)
    }

    #[inline]
    unsafe fn deallocate_node(&self, ptr: NonNull<u8>, size: usize, alignment: usize) {
        // SAFETY: forwarded caller contract.
        unsafe { (**self).deallocate_node(ptr, size, alignment) }
    }

    #[inline]
    fn allocate_array(
        &self,
        count: usize,
        size: usize,
        alignment: usize,
    ) -> AllocResult<NonNull<u8>> {
        (**self).allocate_array(count, size, alignment)
    }

    #[inline]
    unsafe fn deallocate_array(
        &self,
        ptr: NonNull<u8>,
        count: usize,
        size: usize,
        alignment: usize,
    ) {
        // SAFETY: forwarded caller contract.
        unsafe { (**self).deallocate_array(ptr, count, size, alignment) }
    }

    #[inline]
    fn max_node_size(&self) -> usize {
        (**self).max_node_size()
    }

    #[inline]
    fn max_array_size(&self) -> usize {
        (**self).max_array_size()
    }
}

/// Typed convenience layer over [`RawAllocator`]
///
/// Sizes and alignments come from `T`, so callers cannot get them wrong.
/// Values written by [`alloc_init`](Self::alloc_init) are never dropped by
/// the allocator; arena-backed storage in particular is reclaimed in bulk.
///
/// # Examples
///
/// ```rust
/// use cairn_memory::allocator::{HeapAllocator, TypedAllocator};
///
/// let heap = HeapAllocator::new();
/// let value = heap.alloc_init(42u64).unwrap();
/// unsafe {
///     assert_eq!(*value.as_ptr(), 42);
///     heap.dealloc_typed(value);
/// }
/// ```
pub trait TypedAllocator: RawAllocator {
    /// Allocates uninitialized storage for one `T`
    fn alloc_typed<T>(&self) -> AllocResult<NonNull<T>> {
        let ptr = self.allocate_node(mem::size_of::<T>(), mem::align_of::<T>())?;
        Ok(ptr.cast())
    }

    /// Allocates storage for `value` and moves it in
    fn alloc_init<T>(&self, value: T) -> AllocResult<NonNull<T>> {
        let ptr = self.alloc_typed::<T>()?;
        // SAFETY: ptr is valid for writes of one T and properly aligned
        // (RawAllocator contract with size_of/align_of T).
        unsafe { ptr.as_ptr().write(value) };
        Ok(ptr)
    }

    /// Allocates uninitialized storage for `count` values of `T`
    fn alloc_array<T>(&self, count: usize) -> AllocResult<NonNull<T>> {
        let ptr = self.allocate_array(count, mem::size_of::<T>(), mem::align_of::<T>())?;
        Ok(ptr.cast())
    }

    /// Returns storage obtained from `alloc_typed`/`alloc_init`
    ///
    /// The value is not dropped.
    ///
    /// # Safety
    /// `ptr` must come from this allocator and must not be used afterwards.
    unsafe fn dealloc_typed<T>(&self, ptr: NonNull<T>) {
        // SAFETY: forwarded caller contract.
        unsafe { self.deallocate_node(ptr.cast(), mem::size_of::<T>(), mem::align_of::<T>()) };
    }

    /// Returns storage obtained from `alloc_array`
    ///
    /// # Safety
    /// `ptr` and `count` must match an earlier `alloc_array` call on this
    /// allocator, and `ptr` must not be used afterwards.
    unsafe fn dealloc_array<T>(&self, ptr: NonNull<T>, count: usize) {
        // SAFETY: forwarded caller contract.
        unsafe {
            self.deallocate_array(
                ptr.cast(),
                count,
                mem::size_of::<T>(),
                mem::align_of::<T>(),
            );
        }
    }
}

impl<A: RawAllocator + ?Sized> TypedAllocator for A {}
