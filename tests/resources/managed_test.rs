/*!
 * Managed Resource Tests
 */

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use resource_kernel::{
    FileManager, ManagedResource, MemoryError, MemoryManager, Resource, ResourceContext,
    ResourceError, ResourceResult,
};
use std::fs;

fn context(capacity: usize) -> ResourceContext {
    ResourceContext::new(MemoryManager::with_capacity(capacity), FileManager::new())
}

#[test]
fn test_create_then_destroy_is_balanced() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(1024 * 1024);

    let resource = ManagedResource::create(&ctx, dir.path().join("a.dat"), 1024).unwrap();
    assert_eq!(resource.size(), 1024);
    assert!(resource.buffer().unwrap().iter().all(|&b| b == 0));
    assert_eq!(ctx.memory.live_blocks(), 1);
    assert_eq!(ctx.files.open_count(), 1);

    resource.dispose().unwrap();
    assert!(ctx.is_balanced());
}

#[test]
fn test_scope_exit_releases_on_error_path() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(1024 * 1024);

    let result: ResourceResult<()> = (|| {
        let mut resource = ManagedResource::create(&ctx, dir.path().join("a.dat"), 64)?;
        resource.write_file(b"partial")?;
        Err(ResourceError::Configuration("caller failed midway".into()))
    })();

    assert!(result.is_err());
    assert!(ctx.is_balanced());
}

#[test]
fn test_allocation_failure_closes_file() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(128);

    let result = ManagedResource::create(&ctx, dir.path().join("a.dat"), 4096);
    assert!(matches!(
        result,
        Err(ResourceError::Allocation(MemoryError::OutOfMemory { .. }))
    ));
    assert_eq!(ctx.files.open_count(), 0);
    assert_eq!(ctx.files.stats().total_opened, ctx.files.stats().total_closed);
}

#[test]
fn test_unopenable_path_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(1024 * 1024);

    let result = ManagedResource::create(&ctx, dir.path().join("missing").join("a.dat"), 16);
    assert!(matches!(result, Err(ResourceError::Io { .. })));
    assert!(ctx.is_balanced());
}

#[test]
fn test_zero_size_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(1024);

    let result = ManagedResource::create(&ctx, dir.path().join("a.dat"), 0);
    assert!(matches!(
        result,
        Err(ResourceError::Allocation(MemoryError::ZeroSized))
    ));
    assert!(ctx.is_balanced());
}

#[test]
fn test_clone_never_aliases() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(1024 * 1024);

    let mut source = ManagedResource::create_with(&ctx, dir.path().join("a.dat"), b"abcd").unwrap();
    let mut copy = source.try_clone().unwrap();

    assert_ne!(source.buffer_address(), copy.buffer_address());
    assert_ne!(source.fd(), copy.fd());
    assert_eq!(copy.buffer().unwrap(), b"abcd");

    copy.buffer_mut().unwrap()[0] = b'z';
    assert_eq!(source.buffer().unwrap(), b"abcd");

    // Destroying the source leaves the copy fully usable
    source.destroy().unwrap();
    assert_eq!(copy.buffer().unwrap(), b"zbcd");
    copy.persist_buffer().unwrap();
    drop(copy);
    drop(source);

    assert!(ctx.is_balanced());
}

#[test]
fn test_clone_appends_to_same_target() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.dat");
    let ctx = context(1024 * 1024);

    let mut source = ManagedResource::create_with(&ctx, &path, b"one").unwrap();
    source.persist_buffer().unwrap();
    source.flush().unwrap();

    let mut copy = source.try_clone().unwrap();
    copy.write_file(b"-two").unwrap();
    copy.dispose().unwrap();
    source.dispose().unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "one-two");
}

#[test]
fn test_destroy_is_idempotent_and_inert() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(1024 * 1024);

    let mut resource = ManagedResource::create(&ctx, dir.path().join("a.dat"), 32).unwrap();
    resource.destroy().unwrap();
    resource.destroy().unwrap();

    assert!(resource.is_destroyed());
    assert!(!resource.is_active());
    assert!(matches!(resource.buffer(), Err(ResourceError::Released(_))));
    assert!(matches!(resource.try_clone(), Err(ResourceError::Released(_))));
    assert_eq!(ctx.memory.stats().total_deallocations, 1);
    assert_eq!(ctx.files.stats().total_closed, 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_create_clone_destroy_balances(size in 1usize..8192, fill in any::<u8>()) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(64 * 1024);

        let mut resource = ManagedResource::create(&ctx, dir.path().join("p.dat"), size).unwrap();
        resource.buffer_mut().unwrap().fill(fill);
        let copy = resource.try_clone().unwrap();
        prop_assert_eq!(copy.buffer().unwrap(), resource.buffer().unwrap());

        drop(copy);
        drop(resource);
        prop_assert!(ctx.is_balanced());
    }
}
