/*!
 * Guard Traits
 *
 * Owning handles that can be released by hand or on drop, and ordered
 * release of several guards that make up one resource.
 */

use super::{GuardError, GuardMetadata, GuardResult};

/// An owned resource with single-shot release
pub trait Guard: Send {
    /// Resource type name for logging
    fn resource_type(&self) -> &'static str;

    fn metadata(&self) -> &GuardMetadata;

    fn is_active(&self) -> bool;

    /// Release the resource now
    ///
    /// Returns `AlreadyReleased` on every call after the first.
    fn release(&mut self) -> GuardResult<()>;
}

/// Drop-time cleanup; implementations log failures instead of panicking
pub trait GuardDrop: Guard {
    fn on_drop(&mut self);
}

/// Release `guards` front to back, attempting every one
///
/// A failing guard does not stop the ones after it. Failures are returned
/// in release order.
pub fn release_all(guards: &mut [&mut dyn Guard]) -> Vec<GuardError> {
    let mut failures = Vec::new();
    for guard in guards.iter_mut() {
        let metadata = guard.metadata();
        let (kind, size, lifetime) = (
            guard.resource_type(),
            metadata.size_bytes,
            metadata.lifetime_micros(),
        );
        match guard.release() {
            Ok(()) => log::trace!("released {} ({} bytes) after {}us", kind, size, lifetime),
            Err(e) => {
                log::warn!("release of {} failed: {}", kind, e);
                failures.push(e);
            }
        }
    }
    failures
}
