/*!
 * Extended Resource
 *
 * A managed resource composed with one extra allocation from the raw
 * allocator family. Teardown releases the extra block first, then the
 * managed part, whether the value is dropped as itself or as a
 * `Box<dyn Resource>`.
 */

use super::managed::ManagedResource;
use super::traits::Resource;
use super::ResourceContext;
use crate::core::errors::ResourceError;
use crate::core::guard::{Guard, GuardError, MemoryGuard, MemoryGuardExt};
use crate::core::types::{ResourceResult, Size};
use crate::memory::AllocatorFamily;
use std::path::Path;
use tracing::{debug, error, warn};

const RESOURCE_TYPE: &str = "extended_resource";

pub struct ExtendedResource {
    base: ManagedResource,
    extra: MemoryGuard,
    destroyed: bool,
}

impl ExtendedResource {
    /// Build the managed part, then allocate `extra_size` raw bytes
    ///
    /// If the extra allocation fails the managed part is destroyed before
    /// the error is returned.
    pub fn create(
        ctx: &ResourceContext,
        path: impl AsRef<Path>,
        size: Size,
        extra_size: Size,
    ) -> ResourceResult<Self> {
        let base = ManagedResource::create(ctx, path, size)?;
        Self::extend(ctx, base, extra_size)
    }

    fn extend(ctx: &ResourceContext, mut base: ManagedResource, extra_size: Size) -> ResourceResult<Self> {
        let extra = match ctx
            .memory
            .allocate_guard(extra_size, AllocatorFamily::Raw, "extended_extra")
        {
            Ok(extra) => extra,
            Err(e) => {
                warn!(extra_size, error = %e, "extra allocation failed, releasing base");
                if let Err(release) = base.destroy() {
                    error!(error = %release, "base release failed while unwinding");
                }
                return Err(ResourceError::Allocation(e));
            }
        };

        debug!(
            fd = base.fd(),
            extra_address = extra.address(),
            extra_size,
            "extended resource created"
        );

        Ok(Self {
            base,
            extra,
            destroyed: false,
        })
    }

    /// Deep copy of both the managed part and the extra block
    pub fn try_clone(&self) -> ResourceResult<Self> {
        if self.destroyed {
            return Err(ResourceError::Released(RESOURCE_TYPE));
        }

        let base = self.base.try_clone()?;
        let mut extra = self
            .extra
            .manager()
            .allocate_guard(self.extra_size(), AllocatorFamily::Raw, "extended_extra")?;
        extra.bytes_mut()?.copy_from_slice(self.extra()?);

        Ok(Self {
            base,
            extra,
            destroyed: false,
        })
    }

    #[inline]
    pub fn extra_size(&self) -> Size {
        self.extra.size()
    }

    /// Address of the extra block in the memory manager's accounting
    #[inline]
    pub fn extra_address(&self) -> usize {
        self.extra.address()
    }

    pub fn extra(&self) -> ResourceResult<&[u8]> {
        self.extra.bytes().map_err(Self::released)
    }

    pub fn extra_mut(&mut self) -> ResourceResult<&mut [u8]> {
        self.extra.bytes_mut().map_err(Self::released)
    }

    fn released(err: GuardError) -> ResourceError {
        match err {
            GuardError::AlreadyReleased => ResourceError::Released(RESOURCE_TYPE),
            other => other.into(),
        }
    }
}

impl Resource for ExtendedResource {
    fn resource_type(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn is_active(&self) -> bool {
        !self.destroyed
    }

    fn destroy(&mut self) -> ResourceResult<()> {
        if self.destroyed {
            return Ok(());
        }
        self.destroyed = true;

        // Release the extra block first; the base is released regardless
        let extra = self.extra.release();
        let base = self.base.destroy();

        debug!(extra_address = self.extra.address(), "extended resource destroyed");

        match (extra, base) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(e), base) => {
                if let Err(other) = base {
                    error!(error = %other, "base release failed after extra release failure");
                }
                Err(e.into())
            }
            (Ok(()), Err(e)) => Err(e),
        }
    }

    fn base(&self) -> &ManagedResource {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ManagedResource {
        &mut self.base
    }

    fn owned_bytes(&self) -> Size {
        if self.destroyed {
            0
        } else {
            self.base.owned_bytes() + self.extra_size()
        }
    }
}

impl Drop for ExtendedResource {
    fn drop(&mut self) {
        if let Err(e) = self.destroy() {
            error!(error = %e, "extended resource release failed during drop");
        }
    }
}

impl std::fmt::Debug for ExtendedResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtendedResource")
            .field("base", &self.base)
            .field("extra", &self.extra)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}
