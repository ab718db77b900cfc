/*!
 * Managed Resource
 *
 * Owns one zero-initialized buffer and one open write target.
 *
 * Acquisition order is file then buffer; release order is the reverse,
 * buffer then file. Copying is only available through `try_clone`, which
 * allocates a fresh buffer and opens a fresh handle.
 */

use super::traits::Resource;
use super::ResourceContext;
use crate::core::errors::ResourceError;
use crate::core::guard::{release_all, FdGuard, Guard, GuardError, MemoryGuard, MemoryGuardExt};
use crate::core::types::{Fd, ResourceResult, Size};
use crate::fs::{FileManager, OpenMode};
use crate::memory::AllocatorFamily;
use std::io::Write;
use std::path::Path;
use tracing::{debug, error, warn};

const RESOURCE_TYPE: &str = "managed_resource";

/// Buffer plus file, released together exactly once
pub struct ManagedResource {
    buffer: MemoryGuard,
    file: FdGuard,
    files: FileManager,
    destroyed: bool,
}

impl ManagedResource {
    /// Allocate a zeroed buffer of `size` bytes and open `path` for writing
    ///
    /// Either both resources exist afterwards or neither does.
    pub fn create(ctx: &ResourceContext, path: impl AsRef<Path>, size: Size) -> ResourceResult<Self> {
        Self::acquire(ctx, path.as_ref(), size, ctx.open_mode)
    }

    /// Like [`create`](Self::create), with the buffer initialized from `initial`
    pub fn create_with(
        ctx: &ResourceContext,
        path: impl AsRef<Path>,
        initial: &[u8],
    ) -> ResourceResult<Self> {
        let mut resource = Self::create(ctx, path, initial.len())?;
        resource.buffer_mut()?.copy_from_slice(initial);
        Ok(resource)
    }

    fn acquire(ctx: &ResourceContext, path: &Path, size: Size, mode: OpenMode) -> ResourceResult<Self> {
        let file = ctx.files.open(path, mode)?;

        // A failed allocation drops `file`, closing it before we return
        let buffer = ctx
            .memory
            .allocate_guard(size, AllocatorFamily::Array, "managed_buffer")
            .map_err(|e| {
                warn!(path = %path.display(), size, error = %e, "buffer allocation failed, closing file");
                ResourceError::from(e)
            })?;

        debug!(
            fd = file.fd(),
            address = buffer.address(),
            size,
            path = %path.display(),
            "managed resource created"
        );

        Ok(Self {
            buffer,
            file,
            files: ctx.files.clone(),
            destroyed: false,
        })
    }

    /// Deep copy: new buffer with equal content, new handle to the same target
    ///
    /// The copy's handle appends, so it never truncates what the source wrote.
    pub fn try_clone(&self) -> ResourceResult<Self> {
        self.ensure_active()?;

        let file = self.files.open(self.file.path(), OpenMode::Append)?;
        let mut buffer = self.buffer.manager().allocate_guard(
            self.size(),
            self.buffer.family(),
            "managed_buffer",
        )?;
        buffer.bytes_mut()?.copy_from_slice(self.buffer()?);

        debug!(
            source_fd = self.file.fd(),
            fd = file.fd(),
            address = buffer.address(),
            "managed resource cloned"
        );

        Ok(Self {
            buffer,
            file,
            files: self.files.clone(),
            destroyed: false,
        })
    }

    #[inline]
    pub fn size(&self) -> Size {
        self.buffer.size()
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    #[inline]
    pub fn fd(&self) -> Fd {
        self.file.fd()
    }

    /// Address of the buffer in the memory manager's accounting
    #[inline]
    pub fn buffer_address(&self) -> usize {
        self.buffer.address()
    }

    pub fn buffer(&self) -> ResourceResult<&[u8]> {
        self.buffer.bytes().map_err(Self::released)
    }

    pub fn buffer_mut(&mut self) -> ResourceResult<&mut [u8]> {
        self.buffer.bytes_mut().map_err(Self::released)
    }

    /// Write `data` through the owned handle
    pub fn write_file(&mut self, data: &[u8]) -> ResourceResult<()> {
        self.ensure_active()?;
        let path = self.file.path().display().to_string();
        let file = self.file.file_mut()?;
        file.write_all(data).map_err(|e| ResourceError::io(path, e))
    }

    /// Write the whole buffer through the owned handle
    pub fn persist_buffer(&mut self) -> ResourceResult<()> {
        self.ensure_active()?;
        let path = self.file.path().display().to_string();
        let bytes = self.buffer.bytes()?;
        let file = self.file.file_mut()?;
        file.write_all(bytes).map_err(|e| ResourceError::io(path, e))
    }

    pub fn flush(&mut self) -> ResourceResult<()> {
        self.ensure_active()?;
        let path = self.file.path().display().to_string();
        self.file
            .file_mut()?
            .flush()
            .map_err(|e| ResourceError::io(path, e))
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn ensure_active(&self) -> ResourceResult<()> {
        if self.destroyed {
            Err(ResourceError::Released(RESOURCE_TYPE))
        } else {
            Ok(())
        }
    }

    fn released(err: GuardError) -> ResourceError {
        match err {
            GuardError::AlreadyReleased => ResourceError::Released(RESOURCE_TYPE),
            other => other.into(),
        }
    }
}

impl Resource for ManagedResource {
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

        // Reverse of acquisition: buffer, then file
        let mut guards: [&mut dyn Guard; 2] = [&mut self.buffer, &mut self.file];
        let errors = release_all(&mut guards);

        debug!(fd = self.file.fd(), address = self.buffer.address(), "managed resource destroyed");

        let mut errors = errors.into_iter();
        match errors.next() {
            None => Ok(()),
            Some(first) => {
                for other in errors {
                    error!(error = %other, "additional release failure");
                }
                Err(first.into())
            }
        }
    }

    fn base(&self) -> &ManagedResource {
        self
    }

    fn base_mut(&mut self) -> &mut ManagedResource {
        self
    }

    fn owned_bytes(&self) -> Size {
        if self.destroyed {
            0
        } else {
            self.size()
        }
    }
}

impl Drop for ManagedResource {
    fn drop(&mut self) {
        if let Err(e) = self.destroy() {
            error!(error = %e, "managed resource release failed during drop");
        }
    }
}

impl std::fmt::Debug for ManagedResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedResource")
            .field("buffer", &self.buffer)
            .field("file", &self.file)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}
