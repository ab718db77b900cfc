/*!
 * Extended Resource Tests
 */

use resource_kernel::{
    AllocatorFamily, ExtendedResource, FileManager, MemoryError, MemoryManager, Resource,
    ResourceContext, ResourceError,
};

fn context(capacity: usize) -> ResourceContext {
    ResourceContext::new(MemoryManager::with_capacity(capacity), FileManager::new())
}

#[test]
fn test_extra_uses_raw_family() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(1024 * 1024);

    let resource = ExtendedResource::create(&ctx, dir.path().join("e.dat"), 1024, 2048).unwrap();
    assert_eq!(resource.extra_size(), 2048);
    assert_eq!(ctx.memory.live_blocks_in(AllocatorFamily::Array), 1);
    assert_eq!(ctx.memory.live_blocks_in(AllocatorFamily::Raw), 1);

    drop(resource);
    assert!(ctx.is_balanced());
}

#[test]
fn test_destroy_through_trait_object_releases_extra() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(1024 * 1024);

    let mut boxed: Box<dyn Resource> =
        Box::new(ExtendedResource::create(&ctx, dir.path().join("e.dat"), 64, 128).unwrap());
    assert_eq!(boxed.owned_bytes(), 192);

    boxed.destroy().unwrap();
    assert_eq!(ctx.memory.live_blocks(), 0);
    assert_eq!(ctx.files.open_count(), 0);

    drop(boxed);
    assert!(ctx.is_balanced());
}

#[test]
fn test_dropping_trait_object_releases_extra() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(1024 * 1024);

    let resources: Vec<Box<dyn Resource>> = vec![
        Box::new(ExtendedResource::create(&ctx, dir.path().join("a.dat"), 16, 32).unwrap()),
        Box::new(ExtendedResource::create(&ctx, dir.path().join("b.dat"), 16, 32).unwrap()),
    ];
    assert_eq!(ctx.memory.live_blocks(), 4);

    drop(resources);
    assert!(ctx.is_balanced());
}

#[test]
fn test_extra_failure_releases_base() {
    let dir = tempfile::tempdir().unwrap();
    // Room for the base buffer but not the extra block
    let ctx = context(1024);

    let result = ExtendedResource::create(&ctx, dir.path().join("e.dat"), 512, 4096);
    assert!(matches!(
        result,
        Err(ResourceError::Allocation(MemoryError::OutOfMemory { .. }))
    ));
    assert!(ctx.is_balanced());
    assert_eq!(ctx.memory.stats().total_allocations, 1);
}

#[test]
fn test_clone_copies_extra() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(1024 * 1024);

    let mut source = ExtendedResource::create(&ctx, dir.path().join("e.dat"), 8, 8).unwrap();
    source.extra_mut().unwrap().copy_from_slice(b"extra!!!");

    let copy = source.try_clone().unwrap();
    assert_ne!(copy.extra_address(), source.extra_address());
    assert_eq!(copy.extra().unwrap(), b"extra!!!");

    drop(source);
    assert_eq!(copy.extra().unwrap(), b"extra!!!");
    drop(copy);
    assert!(ctx.is_balanced());
}

#[test]
fn test_repeated_destroy() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(1024 * 1024);

    let mut resource = ExtendedResource::create(&ctx, dir.path().join("e.dat"), 8, 8).unwrap();
    resource.destroy().unwrap();
    resource.destroy().unwrap();
    assert!(matches!(resource.extra(), Err(ResourceError::Released(_))));
    assert_eq!(ctx.memory.stats().total_deallocations, 2);
}
