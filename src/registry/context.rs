/*!
 * Service Context
 * The instance held by the process-wide singleton registry
 */

use super::SingletonRegistry;
use crate::core::guard::{MemoryGuard, MemoryGuardExt};
use crate::core::limits::SERVICE_CONTEXT_DATA_SIZE;
use crate::core::types::{ResourceResult, Size};
use crate::memory::{AllocatorFamily, MemoryManager};
use tracing::debug;
use uuid::Uuid;

/// Shared, read-only context with one accounted data block
#[derive(Debug)]
pub struct ServiceContext {
    id: Uuid,
    data: MemoryGuard,
}

impl ServiceContext {
    pub fn new(memory: &MemoryManager, data_size: Size) -> ResourceResult<Self> {
        let data = memory.allocate_guard(data_size, AllocatorFamily::Array, "service_context")?;
        let id = Uuid::new_v4();
        debug!(%id, data_size, "service context created");
        Ok(Self { id, data })
    }

    /// Registry whose factory builds a context from `memory`
    pub fn registry(memory: MemoryManager) -> SingletonRegistry<ServiceContext> {
        Self::registry_with_size(memory, SERVICE_CONTEXT_DATA_SIZE)
    }

    pub fn registry_with_size(memory: MemoryManager, data_size: Size) -> SingletonRegistry<ServiceContext> {
        SingletonRegistry::new(move || ServiceContext::new(&memory, data_size))
    }

    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    pub fn data_size(&self) -> Size {
        self.data.size()
    }
}

impl Drop for ServiceContext {
    fn drop(&mut self) {
        debug!(id = %self.id, "service context dropped");
    }
}
