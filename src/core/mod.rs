/*!
 * Core Module
 * Fundamental types, limits, configuration and error handling
 */

pub mod config;
pub mod errors;
pub mod guard;
pub mod limits;
pub mod types;

// Re-export for convenience
pub use config::ResourceConfig;
pub use errors::*;
pub use guard::{release_all, FdGuard, Guard, GuardDrop, GuardError, GuardMetadata, GuardResult, MemoryGuard, MemoryGuardExt};
pub use types::*;
