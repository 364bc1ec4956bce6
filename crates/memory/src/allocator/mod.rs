//! Allocators
//!
//! - [`RawAllocator`] / [`TypedAllocator`]: the allocation interface
//! - [`HeapAllocator`]: system heap backend
//! - [`BlockSource`] / [`BlockList`]: block supply for memory stacks
//! - [`MemoryStack`]: growable stack allocator with markers

mod block;
mod heap;
pub mod stack;
mod traits;

pub use crate::error::{AllocError, AllocResult};

pub use block::{BLOCK_ALIGNMENT, BlockList, BlockSource, MIN_BLOCK_SIZE, MemoryBlock};
pub use heap::HeapAllocator;
pub use stack::{
    MemoryStack, StackAllocator, StackConfig, StackFrame, StackMarker, StackStats,
};
pub use traits::{RawAllocator, TypedAllocator};
