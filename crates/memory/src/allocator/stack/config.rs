//! Memory stack configuration

use crate::error::{MemoryError, MemoryResult};

/// Configuration for [`MemoryStack`](super::MemoryStack)
#[derive(Debug, Clone, PartialEq)]
pub struct StackConfig {
    /// Size of the first block in bytes
    pub initial_block_size: usize,

    /// Multiplier applied to the previous block size when growing (>= 1.0)
    pub growth_factor: f64,

    /// Upper bound for any block size
    pub max_block_size: usize,

    /// Enable statistics tracking
    pub track_stats: bool,

    /// Fill patterns for debugging
    pub alloc_pattern: Option<u8>,
    pub dealloc_pattern: Option<u8>,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            initial_block_size: 4 * 1024,
            growth_factor: 2.0,
            max_block_size: 16 * 1024 * 1024, // 16MB
            track_stats: cfg!(debug_assertions),
            alloc_pattern: if cfg!(debug_assertions) { Some(0xCC) } else { None },
            dealloc_pattern: if cfg!(debug_assertions) { Some(0xDD) } else { None },
        }
    }
}

impl StackConfig {
    /// Production configuration - optimized for performance
    pub fn production() -> Self {
        Self {
            initial_block_size: 64 * 1024,
            growth_factor: 2.0,
            max_block_size: 64 * 1024 * 1024, // 64MB
            track_stats: false,
            alloc_pattern: None,
            dealloc_pattern: None,
        }
    }

    /// Debug configuration - optimized for debugging
    pub fn debug() -> Self {
        Self {
            initial_block_size: 4 * 1024,
            growth_factor: 2.0,
            max_block_size: 16 * 1024 * 1024,
            track_stats: true,
            alloc_pattern: Some(0xCC),
            dealloc_pattern: Some(0xDD),
        }
    }

    /// Performance configuration - minimal overhead, slower growth
    pub fn performance() -> Self {
        Self {
            initial_block_size: 256 * 1024,
            growth_factor: 1.5,
            max_block_size: 256 * 1024 * 1024, // 256MB
            track_stats: false,
            alloc_pattern: None,
            dealloc_pattern: None,
        }
    }

    /// Sets the first block size
    #[must_use]
    pub fn with_initial_block_size(mut self, size: usize) -> Self {
        self.initial_block_size = size;
        self
    }

    /// Sets growth factor (must be >= 1.0)
    #[must_use]
    pub fn with_growth_factor(mut self, factor: f64) -> Self {
        self.growth_factor = factor;
        self
    }

    /// Sets the block size cap
    #[must_use]
    pub fn with_max_block_size(mut self, size: usize) -> Self {
        self.max_block_size = size;
        self
    }

    /// Enables or disables statistics tracking
    #[must_use]
    pub fn with_stats(mut self, enabled: bool) -> Self {
        self.track_stats = enabled;
        self
    }

    /// Sets the debug fill patterns
    #[must_use]
    pub fn with_patterns(mut self, alloc: Option<u8>, dealloc: Option<u8>) -> Self {
        self.alloc_pattern = alloc;
        self.dealloc_pattern = dealloc;
        self
    }

    /// Validates configuration
    pub fn validate(&self) -> MemoryResult<()> {
        if self.initial_block_size == 0 {
            return Err(MemoryError::invalid_config(
                "initial_block_size must be greater than 0",
            ));
        }

        if !self.growth_factor.is_finite() || self.growth_factor < 1.0 {
            return Err(MemoryError::invalid_config(
                "growth_factor must be a finite value >= 1.0",
            ));
        }

        if self.max_block_size < self.initial_block_size {
            return Err(MemoryError::invalid_config(
                "max_block_size must be >= initial_block_size",
            ));
        }

        Ok(())
    }
}
