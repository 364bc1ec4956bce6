//! [`RawAllocator`] handle over a memory stack

use core::fmt;
use core::ptr::NonNull;

use super::MemoryStack;
use crate::allocator::{AllocResult, BlockList, BlockSource, RawAllocator};

/// Non-owning [`RawAllocator`] view of a [`MemoryStack`]
///
/// Lets code written against the allocator interface draw from a stack.
/// Node deallocation is a no-op; memory comes back when the stack is
/// unwound or dropped. The handle borrows the stack, so it cannot outlive it.
///
/// # Examples
///
/// ```
/// use cairn_memory::allocator::{MemoryStack, RawAllocator};
///
/// let stack = MemoryStack::new(1024)?;
/// let alloc = stack.allocator();
///
/// let ptr = alloc.allocate_node(32, 8)?;
/// // SAFETY: ptr came from this allocator with the same size and alignment.
/// unsafe { alloc.deallocate_node(ptr, 32, 8) };
/// # Ok::<(), cairn_memory::MemoryError>(())
/// ```
pub struct StackAllocator<'a, S: BlockSource = BlockList> {
    stack: &'a MemoryStack<S>,
}

impl<'a, S: BlockSource> StackAllocator<'a, S> {
    /// Wraps `stack`
    pub fn new(stack: &'a MemoryStack<S>) -> Self {
        Self { stack }
    }

    /// The underlying memory stack
    pub fn memory_stack(&self) -> &'a MemoryStack<S> {
        self.stack
    }
}

impl<S: BlockSource> Clone for StackAllocator<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: BlockSource> Copy for StackAllocator<'_, S> {}

impl<'a, S: BlockSource> From<&'a MemoryStack<S>> for StackAllocator<'a, S> {
    fn from(stack: &'a MemoryStack<S>) -> Self {
        Self::new(stack)
    }
}

impl<S: BlockSource> fmt::Debug for StackAllocator<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackAllocator")
            .field("stack", self.stack)
            .finish()
    }
}

// SAFETY: allocations come from MemoryStack::allocate, which never hands out
// overlapping ranges and keeps them valid until the stack is unwound or
// dropped; the handle cannot outlive the stack.
unsafe impl<S: BlockSource> RawAllocator for StackAllocator<'_, S> {
    #[inline]
    fn allocate_node(&self, size: usize, alignment: usize) -> AllocResult<NonNull<u8>> {
        self.stack.allocate(size, alignment)
    }

    #[inline]
    unsafe fn deallocate_node(&self, _ptr: NonNull<u8>, _size: usize, _alignment: usize) {}

    fn max_node_size(&self) -> usize {
        self.stack.next_capacity()
    }

    fn max_array_size(&self) -> usize {
        self.stack.next_capacity()
    }
}
