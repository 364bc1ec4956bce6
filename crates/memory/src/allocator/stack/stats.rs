//! Memory stack statistics

use core::cell::Cell;
use core::fmt;

/// Snapshot of memory stack activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StackStats {
    /// Successful allocations
    pub allocations: usize,
    /// Bytes handed out, excluding padding
    pub bytes_allocated: usize,
    /// Bytes skipped to satisfy alignment
    pub padding_bytes: usize,
    /// Blocks acquired from the block source, including the initial one
    pub blocks_acquired: usize,
    /// Blocks handed back by unwinding
    pub blocks_released: usize,
    /// Calls to unwind
    pub unwinds: usize,
    /// Highest number of blocks held at once
    pub peak_blocks: usize,
}

impl fmt::Display for StackStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StackStats {{ allocations: {}, allocated: {} bytes, padding: {} bytes, \
             blocks: +{}/-{} (peak {}), unwinds: {} }}",
            self.allocations,
            self.bytes_allocated,
            self.padding_bytes,
            self.blocks_acquired,
            self.blocks_released,
            self.peak_blocks,
            self.unwinds
        )
    }
}

/// Single-threaded counters behind [`StackStats`]
#[derive(Debug, Default)]
pub(super) struct StackCounters {
    allocations: Cell<usize>,
    bytes_allocated: Cell<usize>,
    padding_bytes: Cell<usize>,
    blocks_acquired: Cell<usize>,
    blocks_released: Cell<usize>,
    unwinds: Cell<usize>,
    peak_blocks: Cell<usize>,
}

#[inline]
fn bump(cell: &Cell<usize>, by: usize) {
    cell.set(cell.get().saturating_add(by));
}

impl StackCounters {
    #[inline]
    pub(super) fn record_allocation(&self, size: usize, padding: usize) {
        bump(&self.allocations, 1);
        bump(&self.bytes_allocated, size);
        bump(&self.padding_bytes, padding);
    }

    pub(super) fn record_block_acquired(&self, held: usize) {
        bump(&self.blocks_acquired, 1);
        self.peak_blocks.set(self.peak_blocks.get().max(held));
    }

    pub(super) fn record_unwind(&self, released: usize) {
        bump(&self.unwinds, 1);
        bump(&self.blocks_released, released);
    }

    pub(super) fn snapshot(&self) -> StackStats {
        StackStats {
            allocations: self.allocations.get(),
            bytes_allocated: self.bytes_allocated.get(),
            padding_bytes: self.padding_bytes.get(),
            blocks_acquired: self.blocks_acquired.get(),
            blocks_released: self.blocks_released.get(),
            unwinds: self.unwinds.get(),
            peak_blocks: self.peak_blocks.get(),
        }
    }

    /// Clears all counters; peak restarts from the blocks currently held
    pub(super) fn reset(&self, held: usize) {
        self.allocations.set(0);
        self.bytes_allocated.set(0);
        self.padding_bytes.set(0);
        self.blocks_acquired.set(0);
        self.blocks_released.set(0);
        self.unwinds.set(0);
        self.peak_blocks.set(held);
    }
}
