/*!
 * Worker Task and Pool Tests
 */

use pretty_assertions::assert_eq;
use resource_kernel::worker::DEFAULT_WORKER_MESSAGE;
use resource_kernel::{MemoryManager, ServiceContext, SharedCounterStore, WorkerPool, WorkerTask};
use std::collections::HashSet;
use std::sync::Arc;

#[test]
fn test_pool_of_workers_shares_one_instance() {
    let memory = MemoryManager::new();
    let store = Arc::new(SharedCounterStore::new().with_shared_text(64));
    let registry = Arc::new(ServiceContext::registry(memory.clone()));

    let pool = WorkerPool::new(
        WorkerTask::new(0, Arc::clone(&store))
            .with_registry(Arc::clone(&registry))
            .with_scratch(memory.clone()),
    );
    let report = pool.run(10).unwrap();

    assert!(report.is_success());
    assert_eq!(report.completions.len(), 10);
    assert_eq!(store.read_counter(), 10);
    assert_eq!(store.read_shared_text().as_deref(), Some(DEFAULT_WORKER_MESSAGE));

    let ids: HashSet<_> = report.completions.iter().map(|c| c.instance_id).collect();
    assert_eq!(ids.len(), 1);
    assert_eq!(registry.construction_count(), 1);

    // Only the singleton's data block remains
    assert_eq!(memory.live_blocks(), 1);
    registry.shutdown();
    assert!(memory.stats().is_balanced());
}

#[test]
fn test_zero_workers() {
    let store = Arc::new(SharedCounterStore::new());
    let report = WorkerPool::new(WorkerTask::new(0, Arc::clone(&store)))
        .run(0)
        .unwrap();

    assert!(report.completions.is_empty());
    assert_eq!(store.read_counter(), 0);
}

#[test]
fn test_workers_after_shutdown_report_closed_registry() {
    let memory = MemoryManager::new();
    let store = Arc::new(SharedCounterStore::new());
    let registry = Arc::new(ServiceContext::registry(memory.clone()));
    registry.shutdown();

    let report = WorkerPool::new(WorkerTask::new(0, Arc::clone(&store)).with_registry(registry))
        .run(3)
        .unwrap();

    assert_eq!(report.failures.len(), 3);
    assert!(report
        .failures
        .iter()
        .all(|f| f.error.error_type == "registry_closed_error"));
    assert_eq!(store.read_counter(), 3);
}

#[test]
fn test_report_serializes() {
    let store = Arc::new(SharedCounterStore::new().with_shared_text(64));
    let report = WorkerPool::new(WorkerTask::new(0, store).with_message("custom"))
        .run(2)
        .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["completions"].as_array().unwrap().len(), 2);
    assert_eq!(json["panicked"], 0);
}

#[test]
fn test_pool_increments_are_linearized() {
    for workers in [0usize, 1, 10, 1000] {
        let store = Arc::new(SharedCounterStore::with_initial(5).with_shared_text(64));
        let report = WorkerPool::new(WorkerTask::new(0, Arc::clone(&store)))
            .run(workers)
            .unwrap();

        assert!(report.is_success(), "workers = {}", workers);
        assert_eq!(report.completions.len(), workers);
        assert_eq!(store.read_counter(), 5 + workers as u64, "workers = {}", workers);

        // Each task observed a distinct post-increment value
        let mut seen: Vec<u64> = report.completions.iter().map(|c| c.counter).collect();
        seen.sort_unstable();
        assert_eq!(seen, (6..6 + workers as u64).collect::<Vec<_>>());
    }
}
