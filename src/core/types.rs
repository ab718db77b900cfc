/*!
 * Core Types
 * Common types used across the crate
 */

/// Address type for accounted memory blocks
pub type Address = usize;

/// Size type for memory operations
pub type Size = usize;

/// File descriptor number assigned by the file manager
pub type Fd = u32;

/// Identifier of a worker task
pub type TaskId = u64;

/// Result type for every fallible library operation
pub type ResourceResult<T> = Result<T, super::errors::ResourceError>;
