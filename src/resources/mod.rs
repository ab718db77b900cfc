/*!
 * Resources
 *
 * Value-like entities that own memory and file handles.
 *
 * - `ManagedResource`: one buffer plus one open write target
 * - `ExtendedResource`: a managed resource plus an extra raw allocation
 *
 * Both implement [`Resource`], so destruction through a `Box<dyn Resource>`
 * always reaches the concrete release logic.
 */

mod extended;
mod managed;
mod traits;

pub use extended::ExtendedResource;
pub use managed::ManagedResource;
pub use traits::Resource;

use crate::fs::{FileManager, OpenMode};
use crate::memory::MemoryManager;

/// Allocation and handle accounting shared by every resource
#[derive(Clone, Default)]
pub struct ResourceContext {
    pub memory: MemoryManager,
    pub files: FileManager,
    pub open_mode: OpenMode,
}

impl ResourceContext {
    pub fn new(memory: MemoryManager, files: FileManager) -> Self {
        Self {
            memory,
            files,
            open_mode: OpenMode::default(),
        }
    }

    /// Use `mode` when creating (not cloning) resources
    pub fn with_open_mode(mut self, mode: OpenMode) -> Self {
        self.open_mode = mode;
        self
    }

    /// True when no memory block and no file handle is outstanding
    pub fn is_balanced(&self) -> bool {
        self.memory.stats().is_balanced() && self.files.stats().is_balanced()
    }
}
