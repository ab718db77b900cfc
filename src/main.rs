/*!
 * Resource Kernel - Main Entry Point
 *
 * Runs one full lifecycle over the library:
 * - managed and extended resources (create, clone, persist, destroy)
 * - shared counter store and singleton registry
 * - a pool of worker threads
 *
 * Usage: `resource-kernel [config.json]`. Without a path the configuration
 * comes from `RESOURCE_*` variables. A JSON run report goes to stdout.
 */

use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use resource_kernel::{
    init_tracing, process_native_string, ExtendedResource, FileManager, HandleStats, LifecycleSpan,
    LocalString, ManagedResource, MemoryManager, MemoryStats, PoolReport, Resource,
    ResourceConfig, ResourceContext, ResourceError, ServiceContext, SharedCounterStore,
    StoreSnapshot, WorkerPool, WorkerTask,
};

const MAIN_MESSAGE: &str = "Main thread was here";

#[derive(Debug, Serialize)]
struct ResourceSummary {
    kind: &'static str,
    size: usize,
    extra_size: Option<usize>,
    clone_fd: Option<u32>,
}

#[derive(Debug, Serialize)]
struct RunReport {
    config: ResourceConfig,
    resources: Vec<ResourceSummary>,
    store: StoreSnapshot,
    workers: PoolReport,
    singleton_constructions: u64,
    interop_output: String,
    memory: MemoryStats,
    handles: HandleStats,
}

fn main() -> Result<()> {
    init_tracing();

    let config = match std::env::args().nth(1) {
        Some(path) => ResourceConfig::load(path)?,
        None => ResourceConfig::from_env()?,
    };
    info!(storage_dir = %config.storage_dir.display(), workers = config.worker_count, "resource kernel starting");

    std::fs::create_dir_all(&config.storage_dir)
        .map_err(|e| ResourceError::io(format!("create {}", config.storage_dir.display()), e))?;

    let memory = MemoryManager::with_capacity(config.memory_capacity);
    let files = FileManager::new();
    let ctx = ResourceContext::new(memory.clone(), files.clone()).with_open_mode(config.open_mode);

    let mut resources = Vec::new();
    resources.push(run_managed(&ctx, &config.storage_dir.join("managed.dat"), config.buffer_size)?);
    resources.push(run_extended(
        &ctx,
        &config.storage_dir.join("extended.dat"),
        config.buffer_size,
        config.extra_size,
    )?);

    let store = Arc::new(SharedCounterStore::new().with_shared_text(config.shared_text_capacity));
    store.increment()?;
    store.write_shared_text(MAIN_MESSAGE)?;

    let registry = Arc::new(ServiceContext::registry(memory.clone()));
    let main_context = registry.get_or_create()?;
    info!(id = %main_context.id(), "service context ready");
    drop(main_context);

    let template = WorkerTask::new(0, Arc::clone(&store))
        .with_registry(Arc::clone(&registry))
        .with_scratch(memory.clone());
    let workers = WorkerPool::new(template).run(config.worker_count)?;

    let interop_output = process_native_string(&LocalString::new(MAIN_MESSAGE))?;

    registry.shutdown();

    let report = RunReport {
        config,
        resources,
        store: store.snapshot(),
        singleton_constructions: registry.construction_count(),
        workers,
        interop_output,
        memory: memory.stats(),
        handles: files.stats(),
    };
    println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);

    if !report.memory.is_balanced() || !report.handles.is_balanced() {
        warn!(memory = ?report.memory, handles = ?report.handles, "resources leaked");
        return Err(miette::miette!("resource accounting is unbalanced after shutdown"));
    }
    if !report.workers.is_success() {
        return Err(miette::miette!(
            "{} worker(s) failed, {} panicked",
            report.workers.failures.len(),
            report.workers.panicked
        ));
    }

    info!("resource kernel finished");
    Ok(())
}

fn run_managed(ctx: &ResourceContext, path: &Path, size: usize) -> Result<ResourceSummary> {
    let span = LifecycleSpan::new("managed_resource");
    let _entered = span.enter();

    let mut resource = ManagedResource::create(ctx, path, size)?;
    let len = MAIN_MESSAGE.len().min(resource.size());
    resource.buffer_mut()?[..len].copy_from_slice(&MAIN_MESSAGE.as_bytes()[..len]);
    resource.persist_buffer()?;

    let mut copy = resource.try_clone()?;
    copy.write_file(b"\n")?;
    copy.persist_buffer()?;
    let clone_fd = copy.fd();

    copy.dispose()?;
    resource.dispose()?;
    span.record_outcome(true);

    Ok(ResourceSummary {
        kind: "managed",
        size,
        extra_size: None,
        clone_fd: Some(clone_fd),
    })
}

fn run_extended(ctx: &ResourceContext, path: &Path, size: usize, extra_size: usize) -> Result<ResourceSummary> {
    let span = LifecycleSpan::new("extended_resource");
    let _entered = span.enter();

    let extended = ExtendedResource::create(ctx, path, size, extra_size)?;
    let copy = extended.try_clone()?;
    let clone_fd = copy.base().fd();
    copy.dispose()?;

    // Destroy through the trait object; the extra block goes first
    let mut boxed: Box<dyn Resource> = Box::new(extended);
    boxed.base_mut().persist_buffer()?;
    boxed.destroy()?;
    span.record_outcome(true);

    Ok(ResourceSummary {
        kind: "extended",
        size,
        extra_size: Some(extra_size),
        clone_fd: Some(clone_fd),
    })
}
