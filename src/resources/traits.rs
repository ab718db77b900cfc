/*!
 * Resource Traits
 */

use super::ManagedResource;
use crate::core::types::{ResourceResult, Size};

/// Capability every resource-owning type implements
///
/// `destroy` is the single teardown path: `Drop` calls it, and so does a
/// caller holding only a `Box<dyn Resource>`.
pub trait Resource: Send {
    /// Resource type name for logging
    fn resource_type(&self) -> &'static str;

    /// False once the resource has been destroyed
    fn is_active(&self) -> bool;

    /// Release everything the resource owns
    ///
    /// Repeated calls are no-ops returning `Ok(())`.
    fn destroy(&mut self) -> ResourceResult<()>;

    /// The managed part of the resource
    fn base(&self) -> &ManagedResource;

    /// Mutable access to the managed part of the resource
    fn base_mut(&mut self) -> &mut ManagedResource;

    /// Total bytes of memory held
    fn owned_bytes(&self) -> Size;

    /// Destroy and consume, surfacing any release error
    fn dispose(mut self) -> ResourceResult<()>
    where
        Self: Sized,
    {
        self.destroy()
    }
}
