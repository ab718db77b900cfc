/*!
 * Memory Manager Unit Tests
 */

use pretty_assertions::assert_eq;
use resource_kernel::core::guard::{Guard, MemoryGuardExt};
use resource_kernel::{checked_buffer_size, AllocatorFamily, MemoryError, MemoryManager};

#[test]
fn test_allocation_is_zeroed() {
    let manager = MemoryManager::with_capacity(4096);
    for family in [AllocatorFamily::Array, AllocatorFamily::Raw] {
        let allocation = manager.allocate(256, family, "test").unwrap();
        assert!(allocation.as_slice().iter().all(|&b| b == 0));
        manager.deallocate(allocation).unwrap();
    }
    assert!(manager.stats().is_balanced());
}

#[test]
fn test_out_of_memory_reports_accounting() {
    let manager = MemoryManager::with_capacity(1000);
    let held = manager.allocate(600, AllocatorFamily::Array, "test").unwrap();

    let err = manager.allocate(500, AllocatorFamily::Raw, "test").unwrap_err();
    assert_eq!(
        err,
        MemoryError::OutOfMemory {
            requested: 500,
            available: 400,
            used: 600,
            total: 1000,
        }
    );
    manager.deallocate(held).unwrap();
    assert_eq!(manager.used_memory(), 0);
}

#[test]
fn test_family_counts() {
    let manager = MemoryManager::with_capacity(64 * 1024);
    let a = manager.allocate_guard(10, AllocatorFamily::Array, "a").unwrap();
    let b = manager.allocate_guard(10, AllocatorFamily::Raw, "b").unwrap();
    let c = manager.allocate_guard(10, AllocatorFamily::Raw, "c").unwrap();

    let stats = manager.stats();
    assert_eq!(stats.array_blocks, 1);
    assert_eq!(stats.raw_blocks, 2);
    assert_eq!(stats.used_memory, 30);

    drop((a, b, c));
    assert!(manager.stats().is_balanced());
}

#[test]
fn test_guard_release_once() {
    let manager = MemoryManager::with_capacity(4096);
    let mut guard = manager.allocate_guard(128, AllocatorFamily::Array, "g").unwrap();
    let address = guard.address();

    assert!(manager.is_valid(address));
    guard.release().unwrap();
    assert!(!guard.is_active());
    assert!(!manager.is_valid(address));
    assert!(guard.release().is_err());
    assert_eq!(manager.stats().total_deallocations, 1);
}

#[test]
fn test_checked_buffer_size() {
    assert_eq!(checked_buffer_size(1000, 4), Ok(4000));
    assert_eq!(checked_buffer_size(0, 4), Err(MemoryError::ZeroSized));
    assert!(matches!(
        checked_buffer_size(usize::MAX, 2),
        Err(MemoryError::SizeOverflow { .. })
    ));
}
