//! Windows Implementation



use std::{
    ffi::c_void,
    fs::File,
    io,
    mem::{ManuallyDrop, MaybeUninit},
    os::windows::io::AsRawHandle,
    ptr::{null, NonNull},
};

use windows_sys::Win32::{
    Foundation::{CloseHandle, HANDLE, INVALID_HANDLE_VALUE},
    System::{
        Memory::{
            CreateFileMappingW, FlushViewOfFile, MapViewOfFile, UnmapViewOfFile, FILE_MAP_COPY,
            FILE_MAP_READ, FILE_MAP_WRITE, MEMORY_MAPPED_VIEW_ADDRESS, PAGE_READONLY,
            PAGE_READWRITE, PAGE_WRITECOPY,
        },
        SystemInformation::{GetSystemInfo, SYSTEM_INFO},
    },
};

use super::{Protection, ReleaseError, Sharing, SyncMode};
use crate::{Error, Result};

// https://learn.microsoft.com/en-us/windows/win32/api/memoryapi/nf-memoryapi-createfilemappingw
// https://learn.microsoft.com/en-us/windows/win32/api/memoryapi/nf-memoryapi-mapviewoffile
// https://learn.microsoft.com/en-us/windows/win32/api/memoryapi/nf-memoryapi-flushviewoffile



/// A mapped view together with the file mapping object it was created from.
///
/// # Safety
/// - It will unmap the view and close the mapping object when dropped.
pub(crate) struct View {
    addr: NonNull<c_void>,
    len: usize,
    section: HANDLE,
}

impl View {
    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.addr.as_ptr().cast()
    }

    pub(crate) fn flush(&self, mode: SyncMode) -> Result<()> {
        // SAFETY: `addr` and `len` describe a live view owned by `self`.
        unsafe { flush(self.addr.cast(), self.len, mode) }
    }

    /// Unmap the view, then close the mapping object.
    ///
    /// If unmapping fails the view is handed back untouched. If only closing the mapping object
    /// fails, the memory is gone and no view is returned.
    pub(crate) fn release(self) -> std::result::Result<(), ReleaseError> {
        let view = ManuallyDrop::new(self);

        let unmapped = unsafe {
            UnmapViewOfFile(MEMORY_MAPPED_VIEW_ADDRESS { Value: view.addr.as_ptr() })
        };
        if unmapped == 0 {
            let error = Error::Unmap(io::Error::last_os_error());
            return Err(ReleaseError { view: Some(ManuallyDrop::into_inner(view)), error });
        }

        if unsafe { CloseHandle(view.section) } == 0 {
            let error = Error::CloseHandle(io::Error::last_os_error());
            return Err(ReleaseError { view: None, error });
        }

        Ok(())
    }
}

impl Drop for View {
    fn drop(&mut self) {
        let view = MEMORY_MAPPED_VIEW_ADDRESS { Value: self.addr.as_ptr() };
        if unsafe { UnmapViewOfFile(view) } == 0 {
            log::warn!("failed to `UnmapViewOfFile`: {}", io::Error::last_os_error());
        }
        if unsafe { CloseHandle(self.section) } == 0 {
            log::warn!("failed to `CloseHandle` file mapping: {}", io::Error::last_os_error());
        }
    }
}

/// Page protection for the mapping object and access for the view.
fn flags(protection: Protection, sharing: Sharing) -> (u32, u32) {
    match (protection, sharing) {
        (Protection::ReadOnly, _) => (PAGE_READONLY, FILE_MAP_READ),
        (Protection::ReadWrite, Sharing::Shared) => (PAGE_READWRITE, FILE_MAP_WRITE),
        (Protection::ReadWrite, Sharing::Private) => (PAGE_WRITECOPY, FILE_MAP_COPY),
    }
}

fn split(value: u64) -> (u32, u32) {
    ((value >> 32) as u32, value as u32)
}

/// Map `section` into the address space, closing it if the view cannot be created.
fn map_view(section: HANDLE, access: u32, offset: u64, len: usize) -> io::Result<View> {
    let (offset_high, offset_low) = split(offset);
    let addr = unsafe { MapViewOfFile(section, access, offset_high, offset_low, len) };

    match NonNull::new(addr.Value) {
        Some(addr) => Ok(View { addr, len, section }),
        None => {
            let error = io::Error::last_os_error();
            unsafe { CloseHandle(section) };
            Err(error)
        }
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
    if len == 0 {
        return Err(Error::MapSizeZero);
    }
    let (page_protection, access) = flags(protection, sharing);

    // A maximum size of zero sizes the mapping object to the file.
    let section = unsafe {
        CreateFileMappingW(file.as_raw_handle(), null(), page_protection, 0, 0, null())
    };
    if section.is_null() {
        return Err(Error::MapFile(io::Error::last_os_error()));
    }

    map_view(section, access, offset, len).map_err(Error::MapFile)
}

/// Map `len` bytes of page-file backed memory.
///
/// An unnamed section is only reachable through its handle, which never leaves the view, so
/// `Private` and `Shared` behave the same here.
pub(crate) fn map_anonymous_view(
    len: usize,
    protection: Protection,
    sharing: Sharing,
) -> Result<View> {
    if len == 0 {
        return Err(Error::MapSizeZero);
    }
    let (page_protection, access) = match (protection, sharing) {
        (Protection::ReadOnly, _) => (PAGE_READONLY, FILE_MAP_READ),
        (Protection::ReadWrite, _) => (PAGE_READWRITE, FILE_MAP_WRITE),
    };
    let (size_high, size_low) = split(len as u64);

    let section = unsafe {
        CreateFileMappingW(
            INVALID_HANDLE_VALUE,
            null(),
            page_protection,
            size_high,
            size_low,
            null(),
        )
    };
    if section.is_null() {
        return Err(Error::MapAnonymous(io::Error::last_os_error()));
    }

    map_view(section, access, 0, len).map_err(Error::MapAnonymous)
}

/// Write dirty pages in `addr..addr + len` to the backing file.
///
/// `FlushViewOfFile` only hands the pages to the system; durability needs `FlushFileBuffers` on
/// the file handle, which the caller does for [`SyncMode::Sync`].
///
/// # Safety
/// `addr` must point into a mapped view at least `len` bytes long.
pub(crate) unsafe fn flush(addr: NonNull<u8>, len: usize, _mode: SyncMode) -> Result<()> {
    if FlushViewOfFile(addr.as_ptr().cast_const().cast(), len) == 0 {
        return Err(Error::Sync(io::Error::last_os_error()));
    }
    Ok(())
}

/// The alignment `MapViewOfFile` requires of file offsets.
pub(crate) fn allocation_granularity() -> usize {
    let info = unsafe {
        let mut info = MaybeUninit::<SYSTEM_INFO>::uninit();
        GetSystemInfo(info.as_mut_ptr());
        info.assume_init()
    };
    info.dwAllocationGranularity as usize
}
