//! # cairn-memory
//!
//! Stack-discipline arena allocation with marker-based bulk rewind.
//!
//! This crate provides:
//! - A growable memory stack that bumps through geometrically sized blocks
//! - Markers that free everything allocated after them in one step
//! - RAII frames that unwind automatically at end of scope
//! - A generic allocator interface shared by the heap and memory stacks
//!
//! ## Quick Start
//!
//! ```rust
//! use cairn_memory::prelude::*;
//!
//! let stack = MemoryStack::new(4096)?;
//!
//! let marker = stack.top();
//! let scratch = stack.allocate(256, 16)?;
//! assert_eq!(scratch.as_ptr() as usize % 16, 0);
//!
//! // Free everything allocated since `marker`
//! // SAFETY: `scratch` is not used after this point.
//! unsafe { stack.unwind(marker) };
//! # Ok::<(), MemoryError>(())
//! ```
//!
//! ## Features
//!
//! - `logging` (default): structured logging through `tracing`
//!
//! ## Architecture
//!
//! - [`allocator::BlockSource`] supplies blocks in LIFO order
//! - [`allocator::MemoryStack`] carves allocations out of the newest block
//! - [`allocator::StackAllocator`] exposes a stack through
//!   [`allocator::RawAllocator`]
//! - Standalone error handling via the [`error`] module

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rust_2018_idioms)]
// Allocator internals are raw-pointer code by nature
#![allow(unsafe_code)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
// Explicit lifetimes are clearer in unsafe/arena code even when elidable
#![allow(clippy::elidable_lifetime_names)]
#![allow(clippy::double_must_use)]

// Error types
pub mod error;

// Core modules
pub mod allocator;
pub mod utils;

pub use crate::error::{MemoryError, MemoryResult, Result};

// Public API exports
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::error::{MemoryError, MemoryResult, Result};

    pub use crate::allocator::{
        AllocError, AllocResult, BlockList, BlockSource, HeapAllocator, MemoryBlock, MemoryStack,
        RawAllocator, StackAllocator, StackConfig, StackFrame, StackMarker, StackStats,
        TypedAllocator,
    };
}

// Re-export allocator types at crate root for convenience
pub use crate::allocator::{AllocError, AllocResult, MemoryStack, StackMarker};
