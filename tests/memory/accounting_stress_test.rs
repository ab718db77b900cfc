/*!
 * Accounting Stress Tests
 * Concurrent allocate/release against the shared memory and handle tables
 */

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use resource_kernel::core::guard::MemoryGuardExt;
use resource_kernel::{
    AllocatorFamily, ExtendedResource, FileManager, ManagedResource, MemoryManager, ResourceContext,
};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 16;
const ROUNDS: usize = 200;

#[test]
fn test_concurrent_guards_balance() {
    let manager = MemoryManager::with_capacity(THREADS * 64 * 1024);
    let failures = Arc::new(AtomicU64::new(0));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let manager = manager.clone();
            let failures = Arc::clone(&failures);
            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(t as u64);
                for _ in 0..ROUNDS {
                    let size = rng.gen_range(1..4096);
                    let family = if rng.gen_bool(0.5) {
                        AllocatorFamily::Array
                    } else {
                        AllocatorFamily::Raw
                    };
                    match manager.allocate_guard(size, family, "stress") {
                        Ok(mut guard) => guard.bytes_mut().unwrap().fill(t as u8),
                        Err(_) => {
                            failures.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(failures.load(Ordering::Relaxed), 0);
    let stats = manager.stats();
    assert!(stats.is_balanced(), "unbalanced: {:?}", stats);
    assert_eq!(stats.total_allocations, (THREADS * ROUNDS) as u64);
}

#[test]
fn test_pool_exhaustion_under_contention_never_overcommits() {
    const BLOCK: usize = 512;
    let capacity = 8 * 1024;
    let manager = MemoryManager::with_capacity(capacity);
    let peak = Arc::new(AtomicUsize::new(0));
    // Every thread keeps its blocks until all threads have finished allocating
    let all_allocated = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let manager = manager.clone();
            let peak = Arc::clone(&peak);
            let all_allocated = Arc::clone(&all_allocated);
            thread::spawn(move || {
                let mut held = Vec::new();
                for _ in 0..32 {
                    if let Ok(guard) = manager.allocate_guard(BLOCK, AllocatorFamily::Raw, "exhaust") {
                        peak.fetch_max(manager.used_memory(), Ordering::SeqCst);
                        held.push(guard);
                    }
                }
                all_allocated.wait();
                held.len()
            })
        })
        .collect();

    let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(total, capacity / BLOCK);
    assert!(peak.load(Ordering::SeqCst) <= capacity);
    assert!(manager.stats().is_balanced());
}

#[test]
fn test_concurrent_resources_balance() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ResourceContext::new(MemoryManager::new(), FileManager::new());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let ctx = ctx.clone();
            let path = dir.path().join(format!("r{}.dat", t));
            thread::spawn(move || {
                for round in 0..10 {
                    if round % 2 == 0 {
                        let resource = ManagedResource::create(&ctx, &path, 256).unwrap();
                        drop(resource.try_clone().unwrap());
                    } else {
                        let _ = ExtendedResource::create(&ctx, &path, 256, 512).unwrap();
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert!(ctx.is_balanced());
    assert_eq!(ctx.files.stats().total_opened, (THREADS * 15) as u64);
}
