/*!
 * Limits and Constants
 *
 * Default sizes and capacities, grouped by subsystem.
 */

// =============================================================================
// MEMORY
// =============================================================================

/// Default accounted memory pool (64MB)
pub const DEFAULT_MEMORY_POOL: usize = 64 * 1024 * 1024;

// =============================================================================
// RESOURCES
// =============================================================================

/// Default managed buffer size (1KB)
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Default extra allocation for extended resources (2KB)
pub const DEFAULT_EXTRA_SIZE: usize = 2048;

/// Largest single resource buffer accepted from configuration (16MB)
pub const MAX_RESOURCE_BUFFER: usize = 16 * 1024 * 1024;

// =============================================================================
// SHARED STATE
// =============================================================================

/// Default capacity of the shared text buffer in bytes
pub const DEFAULT_SHARED_TEXT_CAPACITY: usize = 64;

/// Per-run scratch allocation taken by each worker task
pub const WORKER_SCRATCH_SIZE: usize = 1000;

/// Data allocation held by the registry's service context
pub const SERVICE_CONTEXT_DATA_SIZE: usize = 1000 * std::mem::size_of::<i32>();

/// Default number of workers spawned by the binary
pub const DEFAULT_WORKER_COUNT: usize = 2;

/// Upper bound on workers accepted from configuration
pub const MAX_WORKER_COUNT: usize = 10_000;

// =============================================================================
// INTEROP
// =============================================================================

/// Maximum length of a string produced for the native bridge
pub const MAX_INTEROP_OUTPUT: usize = 4096;
