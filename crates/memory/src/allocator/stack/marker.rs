//! Stack marker for position tracking

use super::cursor::Cursor;

/// Marker representing a position in a memory stack
///
/// Obtained from [`MemoryStack::top`](super::MemoryStack::top) and consumed by
/// [`MemoryStack::unwind`](super::MemoryStack::unwind), which frees
/// everything allocated after the marker was taken. Markers must be unwound
/// in nested (stack) order.
#[derive(Debug, Clone, Copy)]
pub struct StackMarker {
    /// Number of blocks held when the marker was taken
    pub(super) index: usize,
    pub(super) cursor: Cursor,
    /// Identity of the owning stack, checked on unwind in debug builds
    #[cfg(debug_assertions)]
    pub(super) owner: u64,
}
