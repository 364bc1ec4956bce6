//! Growable stack allocator with marker-based unwinding
//!
//! # Overview
//!
//! A [`MemoryStack`] bumps through blocks handed out by a
//! [`BlockSource`](super::BlockSource). Individual allocations are never
//! freed; instead a [`StackMarker`] captures the current top and unwinding to
//! it frees everything allocated since, returning surplus blocks to the
//! source.
//!
//! - [`StackFrame`]: RAII scope that unwinds on drop
//! - [`StackAllocator`]: [`RawAllocator`](super::RawAllocator) view for
//!   allocator-generic code
//! - [`StackConfig`]: growth policy and debug diagnostics
//! - [`StackStats`]: optional activity counters

mod adapter;
mod config;
pub(crate) mod cursor;
mod frame;
mod marker;
mod memory_stack;
mod stats;

pub use adapter::StackAllocator;
pub use config::StackConfig;
pub use frame::StackFrame;
pub use marker::StackMarker;
pub use memory_stack::MemoryStack;
pub use stats::StackStats;
