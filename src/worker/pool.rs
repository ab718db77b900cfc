/*!
 * Worker Pool
 * Runs worker tasks on independent OS threads
 */

use super::{TaskCompletion, WorkerTask};
use crate::core::errors::{ResourceError, SerializableError};
use crate::core::types::{ResourceResult, TaskId};
use serde::Serialize;
use std::thread::{self, JoinHandle};
use tracing::{error, info, warn};

/// A task that returned an error
#[derive(Debug, Clone, Serialize)]
pub struct TaskFailure {
    pub task_id: TaskId,
    pub error: SerializableError,
}

/// Outcome of one [`WorkerPool::run`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct PoolReport {
    pub completions: Vec<TaskCompletion>,
    pub failures: Vec<TaskFailure>,
    /// Threads that panicked instead of reporting
    pub panicked: usize,
}

impl PoolReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.panicked == 0
    }
}

/// Spawns copies of a template task, one per thread
pub struct WorkerPool {
    template: WorkerTask,
}

impl WorkerPool {
    /// Every spawned task is `template` with its own id
    pub fn new(template: WorkerTask) -> Self {
        Self { template }
    }

    /// Run `count` tasks concurrently and wait for all of them
    ///
    /// Ids are assigned 1..=count.
    pub fn run(&self, count: usize) -> ResourceResult<PoolReport> {
        let (tx, rx) = flume::unbounded::<(TaskId, ResourceResult<TaskCompletion>)>();
        let mut handles = Vec::with_capacity(count);

        for index in 0..count {
            let task = self.template.clone().with_id(index as TaskId + 1);
            let tx = tx.clone();
            let handle = thread::Builder::new()
                .name(format!("worker-{}", task.id()))
                .spawn(move || {
                    let result = task.run();
                    // Receiver outlives every sender in `run`
                    let _ = tx.send((task.id(), result));
                })
                .map_err(|e| ResourceError::io("spawn worker thread", e))?;
            handles.push(handle);
        }
        drop(tx);

        let mut report = PoolReport::default();
        for handle in handles {
            if handle.join().is_err() {
                report.panicked += 1;
            }
        }

        for (task_id, result) in rx.drain() {
            match result {
                Ok(completion) => report.completions.push(completion),
                Err(e) => {
                    warn!(task_id, error = %e, "worker task failed");
                    report.failures.push(TaskFailure {
                        task_id,
                        error: SerializableError::from(&e),
                    });
                }
            }
        }
        report.completions.sort_by_key(|c| c.task_id);

        if report.panicked > 0 {
            error!(panicked = report.panicked, "worker threads panicked");
        }
        info!(
            spawned = count,
            completed = report.completions.len(),
            failed = report.failures.len(),
            "worker pool finished"
        );
        Ok(report)
    }

    /// Start one task without waiting for it
    ///
    /// The owner may drop the handle to abandon the task.
    pub fn spawn_detached(&self, id: TaskId) -> ResourceResult<JoinHandle<ResourceResult<TaskCompletion>>> {
        let task = self.template.clone().with_id(id);
        thread::Builder::new()
            .name(format!("worker-{}", id))
            .spawn(move || task.run())
            .map_err(|e| ResourceError::io("spawn worker thread", e))
    }
}
