//! RAII scope over a memory stack

use core::ops::Deref;

use super::{MemoryStack, StackMarker};
use crate::allocator::{BlockList, BlockSource};

/// RAII guard that unwinds a memory stack to the position it was opened at
///
/// Created by [`MemoryStack::scope`] or, for nested scopes,
/// [`StackFrame::scope`]. Both take `&mut self`, so an inner frame always
/// ends before its parent and unwinds happen in nested order without any
/// `unsafe` at the call site.
///
/// Dereferences to the stack, so allocations go straight through the frame.
///
/// # Examples
///
/// ```
/// use cairn_memory::allocator::MemoryStack;
///
/// let mut stack = MemoryStack::new(1024)?;
/// let before = stack.capacity();
///
/// {
///     let mut frame = stack.scope();
///     frame.allocate(64, 8)?;
///     {
///         let inner = frame.scope();
///         inner.allocate(128, 16)?;
///     }
/// }
///
/// assert_eq!(stack.capacity(), before);
/// # Ok::<(), cairn_memory::MemoryError>(())
/// ```
#[must_use = "StackFrame does nothing unless held"]
pub struct StackFrame<'a, S: BlockSource = BlockList> {
    stack: &'a MemoryStack<S>,
    marker: StackMarker,
    active: bool,
}

impl<'a, S: BlockSource> StackFrame<'a, S> {
    pub(super) fn new(stack: &'a mut MemoryStack<S>) -> Self {
        Self::open(stack)
    }

    fn open(stack: &'a MemoryStack<S>) -> Self {
        Self {
            marker: stack.top(),
            stack,
            active: true,
        }
    }

    /// Opens a nested frame
    pub fn scope(&mut self) -> StackFrame<'_, S> {
        StackFrame::open(self.stack)
    }

    /// Frees everything allocated in this frame so far
    ///
    /// The frame stays open and unwinds again on drop.
    pub fn unwind(&mut self) {
        // SAFETY: the marker belongs to this stack and every frame opened
        // after it borrowed `self` mutably, so none of them is still alive.
        unsafe { self.stack.unwind(self.marker) };
    }

    /// Keeps everything allocated in this frame alive past its end
    pub fn leak(mut self) {
        self.active = false;
    }

    /// Position the frame unwinds to
    pub fn marker(&self) -> StackMarker {
        self.marker
    }
}

impl<S: BlockSource> Deref for StackFrame<'_, S> {
    type Target = MemoryStack<S>;

    fn deref(&self) -> &Self::Target {
        self.stack
    }
}

impl<S: BlockSource> Drop for StackFrame<'_, S> {
    fn drop(&mut self) {
        if self.active {
            self.unwind();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::{HeapAllocator, StackConfig};

    fn stack(block_size: usize) -> MemoryStack {
        let config = StackConfig::default()
            .with_initial_block_size(block_size)
            .with_patterns(None, None);
        MemoryStack::with_config(config, HeapAllocator::new()).unwrap()
    }

    #[test]
    fn test_frame_unwinds_on_drop() {
        let mut stack = stack(256);
        let _ = stack.allocate(16, 8).unwrap();
        let before = stack.capacity();

        {
            let frame = stack.scope();
            let _ = frame.allocate(400, 8).unwrap();
            assert_eq!(frame.block_count(), 2);
        }

        assert_eq!(stack.capacity(), before);
        assert_eq!(stack.block_count(), 1);
    }

    #[test]
    fn test_nested_frames() {
        let mut stack = stack(256);
        let start = stack.capacity();

        let mut outer = stack.scope();
        let _ = outer.allocate(32, 8).unwrap();
        let after_outer = outer.capacity();
        {
            let inner = outer.scope();
            let _ = inner.allocate(64, 8).unwrap();
            assert_eq!(inner.capacity(), after_outer - 64);
        }
        assert_eq!(outer.capacity(), after_outer);
        drop(outer);

        assert_eq!(stack.capacity(), start);
    }

    #[test]
    fn test_manual_unwind_keeps_frame_open() {
        let mut stack = stack(256);
        let mut frame = stack.scope();
        let first = frame.allocate(8, 8).unwrap();
        frame.unwind();

        let second = frame.allocate(8, 8).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_leaked_frame_keeps_allocations() {
        let mut stack = stack(256);
        let start = stack.capacity();

        let frame = stack.scope();
        let _ = frame.allocate(40, 8).unwrap();
        frame.leak();

        assert_eq!(stack.capacity(), start - 40);
    }
}
