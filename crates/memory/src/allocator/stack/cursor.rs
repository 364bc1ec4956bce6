//! Free-space span over the active block

use core::ptr::NonNull;

use crate::allocator::MemoryBlock;
use crate::utils::padding_needed;

/// Unused tail of the active block
///
/// ```text
/// [block.start]----[used]----[start]----[free]----[end]----[block.end]
/// ```
///
/// Invariant: `start <= end <= block.len()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cursor {
    pub(crate) block: MemoryBlock,
    pub(crate) start: usize,
    pub(crate) end: usize,
}

impl Cursor {
    /// Cursor covering the whole of `block`
    #[inline]
    pub(crate) const fn spanning(block: MemoryBlock) -> Self {
        Self {
            block,
            start: 0,
            end: block.len(),
        }
    }

    /// Bytes left between the cursors
    #[inline(always)]
    pub(crate) const fn remaining(&self) -> usize {
        self.end - self.start
    }

    /// Absolute address of the first free byte
    #[inline(always)]
    pub(crate) fn address(&self) -> usize {
        self.block.address() + self.start
    }

    /// Padding needed before a `size`-byte request aligned to `alignment`,
    /// or `None` if it does not fit
    ///
    /// Zero-size requests still need one free byte so the returned address
    /// lies inside the block.
    #[inline(always)]
    pub(crate) fn fit(&self, size: usize, alignment: usize) -> Option<usize> {
        let padding = padding_needed(self.address(), alignment);
        let needed = padding.checked_add(size.max(1))?;
        (needed <= self.remaining()).then_some(padding)
    }

    /// Advances past `padding + size` bytes and returns the aligned start
    ///
    /// The caller must have obtained `padding` from [`fit`](Self::fit) for the
    /// same `size`.
    #[inline(always)]
    pub(crate) fn bump(&mut self, padding: usize, size: usize) -> NonNull<u8> {
        debug_assert!(padding + size <= self.remaining());
        let offset = self.start + padding;
        self.start = offset + size;
        // SAFETY: offset <= end <= block.len(), so the result stays inside
        // (or one past the end of) the block, which is non-null.
        unsafe { NonNull::new_unchecked(self.block.as_ptr().add(offset)) }
    }
}
