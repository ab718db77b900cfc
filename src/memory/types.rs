/*!
 * Memory Types
 * Common types for memory accounting
 */

use crate::core::types::{Address, Size};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Memory operation result
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Memory errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("Out of memory: requested {requested} bytes, available {available} bytes ({used} used / {total} total)")]
    OutOfMemory {
        requested: usize,
        available: usize,
        used: usize,
        total: usize,
    },

    #[error("Invalid memory address: 0x{0:x}")]
    InvalidAddress(Address),

    #[error("Size overflow: {count} elements of {element_size} bytes")]
    SizeOverflow { count: usize, element_size: usize },

    #[error("Zero-sized allocation requested")]
    ZeroSized,

    #[error("Invalid layout for {size} bytes: {reason}")]
    LayoutError { size: usize, reason: String },

    #[error("System allocator refused {0} bytes")]
    AllocatorRefused(Size),
}

/// Allocator family a block was obtained from
///
/// Blocks must be returned to the family that produced them; the block
/// itself carries the family so release can never cross families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocatorFamily {
    /// Boxed byte slices from the global allocator via `Vec`
    Array,
    /// Raw regions from `std::alloc` with an explicit layout
    Raw,
}

impl std::fmt::Display for AllocatorFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            AllocatorFamily::Array => write!(f, "array"),
            AllocatorFamily::Raw => write!(f, "raw"),
        }
    }
}

/// Accounting record for one live block
#[derive(Debug, Clone, Serialize)]
pub struct MemoryBlock {
    pub address: Address,
    pub size: Size,
    pub family: AllocatorFamily,
    pub label: &'static str,
}

/// Memory statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_memory: usize,
    pub used_memory: usize,
    pub available_memory: usize,
    pub live_blocks: usize,
    pub array_blocks: usize,
    pub raw_blocks: usize,
    pub total_allocations: u64,
    pub total_deallocations: u64,
}

impl MemoryStats {
    /// True when every allocation has been matched by a deallocation
    pub fn is_balanced(&self) -> bool {
        self.live_blocks == 0
            && self.used_memory == 0
            && self.total_allocations == self.total_deallocations
    }
}

/// Multiply an element count by an element size, rejecting overflow and zero
///
/// Replaces unchecked `count * size` arithmetic when sizing buffers.
pub fn checked_buffer_size(count: usize, element_size: usize) -> MemoryResult<Size> {
    let total = count
        .checked_mul(element_size)
        .ok_or(MemoryError::SizeOverflow {
            count,
            element_size,
        })?;

    if total == 0 {
        return Err(MemoryError::ZeroSized);
    }

    Ok(total)
}
