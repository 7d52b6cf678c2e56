//! Unix Implementation



use std::{ffi::c_void, fs::File, mem::ManuallyDrop, num::NonZeroUsize, ptr::NonNull};

use nix::{
    libc::off_t,
    sys::mman::{mmap, mmap_anonymous, msync, munmap, MapFlags, MsFlags, ProtFlags},
    unistd::{sysconf, SysconfVar},
};

use super::{Protection, ReleaseError, Sharing, SyncMode};
use crate::{Error, Result};



/// A raw memory mapping.
///
/// # Safety
/// - It will unmap itself when dropped.
pub(crate) struct View {
    addr: NonNull<c_void>,
    len: usize,
}

impl View {
    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.addr.as_ptr().cast()
    }

    pub(crate) fn flush(&self, mode: SyncMode) -> Result<()> {
        // SAFETY: `addr` and `len` describe a live mapping owned by `self`.
        unsafe { flush(self.addr.cast(), self.len, mode) }
    }

    /// Unmap the view. On failure the view is handed back, still mapped.
    pub(crate) fn release(self) -> std::result::Result<(), ReleaseError> {
        let view = ManuallyDrop::new(self);
        match unsafe { munmap(view.addr, view.len) } {
            Ok(()) => Ok(()),
            Err(e) => Err(ReleaseError {
                view: Some(ManuallyDrop::into_inner(view)),
                error: Error::Unmap(e.into()),
            }),
        }
    }
}

#[cfg(test)]
impl View {
    /// Wrap a region without checking that it is a mapping.
    ///
    /// # Safety
    /// The result must not be dropped unless `addr..addr + len` really is a mapping.
    pub(crate) unsafe fn from_raw_parts(addr: NonNull<u8>, len: usize) -> Self {
        View { addr: addr.cast(), len }
    }
}

impl Drop for View {
    fn drop(&mut self) {
        if let Err(e) = unsafe { munmap(self.addr, self.len) } {
            log::warn!("failed to `munmap` {} bytes at {:p}: {}", self.len, self.addr, e);
        }
    }
}

fn prot_flags(protection: Protection) -> ProtFlags {
    match protection {
        Protection::ReadOnly => ProtFlags::PROT_READ,
        Protection::ReadWrite => ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
    }
}

fn map_flags(sharing: Sharing) -> MapFlags {
    match sharing {
        Sharing::Private => MapFlags::MAP_PRIVATE,
        Sharing::Shared => MapFlags::MAP_SHARED,
    }
}

/// Map `len` bytes of `file` starting at `offset`, which must be a multiple of
/// [`allocation_granularity`].
pub(crate) fn map_file_view(
    file: &File,
    protection: Protection,
    sharing: Sharing,
    offset: u64,
    len: usize,
) -> Result<View> {
    let length = NonZeroUsize::new(len).ok_or(Error::MapSizeZero)?;
    let offset = off_t::try_from(offset).map_err(|_| Error::TooLarge(offset))?;

    let addr = unsafe {
        mmap(None, length, prot_flags(protection), map_flags(sharing), file, offset)
    }
    .map_err(|e| Error::MapFile(e.into()))?;

    Ok(View { addr, len })
}

/// Map `len` bytes of zeroed memory with no file behind it.
pub(crate) fn map_anonymous_view(
    len: usize,
    protection: Protection,
    sharing: Sharing,
) -> Result<View> {
    let length = NonZeroUsize::new(len).ok_or(Error::MapSizeZero)?;

    let addr = unsafe {
        mmap_anonymous(None, length, prot_flags(protection), map_flags(sharing))
    }
    .map_err(|e| Error::MapAnonymous(e.into()))?;

    Ok(View { addr, len })
}

/// Write dirty pages in `addr..addr + len` back to their backing object.
///
/// # Safety
/// `addr` must be the page-aligned start of a mapping at least `len` bytes long.
pub(crate) unsafe fn flush(addr: NonNull<u8>, len: usize, mode: SyncMode) -> Result<()> {
    let flags = match mode {
        SyncMode::Sync => MsFlags::MS_SYNC,
        SyncMode::Async => MsFlags::MS_ASYNC,
    };
    msync(addr.cast(), len, flags).map_err(|e| Error::Sync(e.into()))
}

/// The alignment `mmap` requires of file offsets.
pub(crate) fn allocation_granularity() -> usize {
    match sysconf(SysconfVar::PAGE_SIZE) {
        Ok(Some(size)) if size > 0 => size as usize,
        _ => 4096,
    }
}
