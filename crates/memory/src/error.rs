//! Standalone error types for cairn-memory
//!
//! Uses thiserror for clean, idiomatic Rust error definitions.
//!
//! Errors fall into two groups:
//! - **precondition violations**: the request could never succeed against this
//!   arena (bad alignment, a request larger than any block the growth policy
//!   hands out, invalid configuration)
//! - **resource exhaustion**: the upstream provider could not supply a block

use core::alloc::Layout;
use thiserror::Error;

#[cfg(feature = "logging")]
use tracing::{error, warn};

// ============================================================================
// Main Error Types
// ============================================================================

/// Memory management errors
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    // --- Resource Exhaustion ---
    #[error("Memory allocation failed: {size} bytes with {align} byte alignment")]
    AllocationFailed { size: usize, align: usize },

    // --- Precondition Violations ---
    #[error("Invalid alignment: {alignment} (must be a power of two)")]
    InvalidAlignment { alignment: usize },

    #[error(
        "Block too small: {size} bytes with {alignment} byte alignment do not fit a fresh \
         {block_size} byte block"
    )]
    BlockTooSmall {
        size: usize,
        alignment: usize,
        block_size: usize,
    },

    #[error("Size overflow during operation: {operation}")]
    SizeOverflow { operation: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl MemoryError {
    /// Get error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::AllocationFailed { .. } => "MEM:ALLOC:FAILED",
            Self::InvalidAlignment { .. } => "MEM:ALLOC:ALIGN",
            Self::BlockTooSmall { .. } => "MEM:STACK:BLOCK_TOO_SMALL",
            Self::SizeOverflow { .. } => "MEM:ALLOC:OVERFLOW",
            Self::InvalidConfig { .. } => "MEM:CONFIG:INVALID",
        }
    }

    /// The request can never be satisfied by this allocator as configured
    #[must_use]
    pub fn is_precondition_violation(&self) -> bool {
        !self.is_exhaustion()
    }

    /// The upstream provider ran out of memory
    #[must_use]
    pub fn is_exhaustion(&self) -> bool {
        matches!(self, Self::AllocationFailed { .. })
    }

    /// Check if this is an invalid alignment error
    #[must_use]
    pub fn is_invalid_alignment(&self) -> bool {
        matches!(self, Self::InvalidAlignment { .. })
    }

    // ============================================================================
    // Convenience Constructors
    // ============================================================================

    /// Create allocation failed error
    pub fn allocation_failed(size: usize, align: usize) -> Self {
        #[cfg(feature = "logging")]
        error!(size, align, "upstream memory provider exhausted");

        Self::AllocationFailed { size, align }
    }

    /// Create allocation failed error from layout
    pub fn allocation_failed_with_layout(layout: Layout) -> Self {
        Self::allocation_failed(layout.size(), layout.align())
    }

    /// Create invalid alignment error
    pub fn invalid_alignment(alignment: usize) -> Self {
        Self::InvalidAlignment { alignment }
    }

    /// Create block too small error
    pub fn block_too_small(size: usize, alignment: usize, block_size: usize) -> Self {
        #[cfg(feature = "logging")]
        warn!(
            size,
            alignment, block_size, "request does not fit a freshly acquired block"
        );

        Self::BlockTooSmall {
            size,
            alignment,
            block_size,
        }
    }

    /// Create size overflow error
    pub fn size_overflow(operation: &str) -> Self {
        Self::SizeOverflow {
            operation: operation.to_string(),
        }
    }

    /// Create invalid config error
    pub fn invalid_config(reason: &str) -> Self {
        Self::InvalidConfig {
            reason: reason.to_string(),
        }
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result type for memory operations
pub type MemoryResult<T> = core::result::Result<T, MemoryError>;

/// Generic result type alias
pub type Result<T> = MemoryResult<T>;

/// Type aliases used throughout the allocator module
pub type AllocError = MemoryError;
pub type AllocResult<T> = MemoryResult<T>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_error_creation() {
        let error = MemoryError::allocation_failed(1024, 8);
        assert!(error.to_string().contains("1024"));
    }

    #[test]
    fn test_error_with_layout() {
        let layout = Layout::new::<u64>();
        let error = MemoryError::allocation_failed_with_layout(layout);
        assert!(error.to_string().contains(&layout.size().to_string()));
    }

    #[test]
    fn test_block_too_small_message() {
        let error = MemoryError::block_too_small(2000, 8, 1024);
        let message = error.to_string();
        assert!(message.contains("2000"));
        assert!(message.contains("1024"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            MemoryError::allocation_failed(1024, 8).code(),
            "MEM:ALLOC:FAILED"
        );
        assert_eq!(MemoryError::invalid_alignment(3).code(), "MEM:ALLOC:ALIGN");
        assert_eq!(
            MemoryError::block_too_small(1, 1, 0).code(),
            "MEM:STACK:BLOCK_TOO_SMALL"
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(MemoryError::allocation_failed(64, 8).is_exhaustion());
        assert!(!MemoryError::allocation_failed(64, 8).is_precondition_violation());

        assert!(MemoryError::invalid_alignment(3).is_precondition_violation());
        assert!(MemoryError::block_too_small(2000, 8, 1024).is_precondition_violation());
        assert!(MemoryError::size_overflow("array").is_precondition_violation());
        assert!(MemoryError::invalid_config("zero block size").is_precondition_violation());
    }

    #[test]
    fn test_invalid_alignment_predicate() {
        assert!(MemoryError::invalid_alignment(3).is_invalid_alignment());
        assert!(!MemoryError::allocation_failed(8, 8).is_invalid_alignment());
    }
}
