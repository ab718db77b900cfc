/*!
 * Resource Kernel Library
 *
 * Resource-owning objects with explicit copy and destroy semantics, plus a
 * thread-safe shared-state core:
 * - `ManagedResource` / `ExtendedResource`: buffer + file ownership
 * - `SharedCounterStore`: counter and bounded text behind one lock
 * - `SingletonRegistry`: lazily constructed, explicitly shut down instance
 * - `WorkerTask` / `WorkerPool`: concurrent users of the shared state
 */

pub mod core;
pub mod fs;
pub mod interop;
pub mod memory;
pub mod monitoring;
pub mod registry;
pub mod resources;
pub mod store;
pub mod worker;

// Re-exports
pub use crate::core::errors::{ResourceError, SerializableError};
pub use crate::core::{ResourceConfig, ResourceResult};
pub use fs::{FileManager, HandleStats, OpenMode};
pub use interop::{process_native_string, LocalString, NativeStringSource};
pub use memory::{checked_buffer_size, AllocatorFamily, MemoryError, MemoryManager, MemoryStats};
pub use monitoring::{init_tracing, LifecycleSpan};
pub use registry::{RegistryStatus, ServiceContext, SingletonRegistry};
pub use resources::{ExtendedResource, ManagedResource, Resource, ResourceContext};
pub use store::{SharedCounterStore, StoreSnapshot};
pub use worker::{PoolReport, TaskCompletion, WorkerPool, WorkerTask};
