/*!
 * Memory Module
 * Accounted allocation for resource buffers
 */

pub mod manager;
pub mod types;

// Re-export for convenience
pub use manager::{Allocation, MemoryManager};
pub use types::*;
