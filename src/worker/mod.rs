/*!
 * Worker Tasks
 *
 * A task increments the shared counter, writes the shared text when the
 * store has text storage, and reads the registry's shared instance. Tasks
 * own nothing beyond an optional scratch block, which is released on every
 * exit path.
 */

mod pool;

pub use pool::{PoolReport, TaskFailure, WorkerPool};

use crate::core::guard::MemoryGuardExt;
use crate::core::limits::WORKER_SCRATCH_SIZE;
use crate::core::types::{ResourceResult, TaskId};
use crate::memory::{AllocatorFamily, MemoryManager};
use crate::registry::{ServiceContext, SingletonRegistry};
use crate::store::SharedCounterStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, trace};
use uuid::Uuid;

/// Text written by workers when none is configured
pub const DEFAULT_WORKER_MESSAGE: &str = "Thread was here";

/// Completion signal returned by [`WorkerTask::run`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskCompletion {
    pub task_id: TaskId,
    /// Counter value right after this task's increment
    pub counter: u64,
    pub wrote_text: bool,
    pub instance_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct WorkerTask {
    id: TaskId,
    store: Arc<SharedCounterStore>,
    registry: Option<Arc<SingletonRegistry<ServiceContext>>>,
    scratch: Option<MemoryManager>,
    message: Arc<str>,
}

impl WorkerTask {
    pub fn new(id: TaskId, store: Arc<SharedCounterStore>) -> Self {
        Self {
            id,
            store,
            registry: None,
            scratch: None,
            message: Arc::from(DEFAULT_WORKER_MESSAGE),
        }
    }

    /// Read the shared instance from `registry` on each run
    pub fn with_registry(mut self, registry: Arc<SingletonRegistry<ServiceContext>>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Take a scoped scratch block from `memory` on each run
    pub fn with_scratch(mut self, memory: MemoryManager) -> Self {
        self.scratch = Some(memory);
        self
    }

    pub fn with_message(mut self, message: impl Into<Arc<str>>) -> Self {
        self.message = message.into();
        self
    }

    /// Same configuration under a different id
    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = id;
        self
    }

    #[inline]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Run once
    ///
    /// Any store or registry error is returned to the caller.
    pub fn run(&self) -> ResourceResult<TaskCompletion> {
        // Dropped on every return below, including `?` exits
        let _scratch = match &self.scratch {
            Some(memory) => {
                let mut block =
                    memory.allocate_guard(WORKER_SCRATCH_SIZE, AllocatorFamily::Array, "worker_scratch")?;
                let bytes = block.bytes_mut()?;
                let len = self.message.len().min(bytes.len());
                bytes[..len].copy_from_slice(&self.message.as_bytes()[..len]);
                Some(block)
            }
            None => None,
        };

        let counter = self.store.increment()?;

        let wrote_text = self.store.write_shared_text_if_present(&self.message)?;
        if !wrote_text {
            trace!(task_id = self.id, "no shared text storage, skipping write");
        }

        let instance_id = match &self.registry {
            Some(registry) => Some(registry.get_or_create()?.id()),
            None => None,
        };

        debug!(task_id = self.id, counter, wrote_text, "worker task completed");
        Ok(TaskCompletion {
            task_id: self.id,
            counter,
            wrote_text,
            instance_id,
        })
    }
}
