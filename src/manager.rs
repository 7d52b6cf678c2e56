//! Memory Map Manager



use std::{fmt, fs::File, path::Path, ptr::{self, NonNull}, slice};

use shared_memory::{Shmem, ShmemConf, ShmemError};

use crate::{
    map::{self, os, MapCfg, Protection, ReleaseError, Sharing, SyncMode},
    Error, LastError, Result,
};



/// The memory behind an active mapping.
enum Region {
    View(os::View),
    Shm(Shmem),
}

impl Region {
    fn base(&self) -> *mut u8 {
        match self {
            Region::View(view) => view.as_ptr(),
            Region::Shm(shm) => shm.as_ptr(),
        }
    }

    fn flush(&self, mode: SyncMode) -> Result<()> {
        match self {
            Region::View(view) => view.flush(mode),
            Region::Shm(shm) => {
                let addr = NonNull::new(shm.as_ptr()).ok_or(Error::NotMapped)?;
                // SAFETY: the segment stays mapped for as long as `shm` is alive.
                unsafe { os::flush(addr, shm.len(), mode) }
            }
        }
    }
}

struct Active {
    region: Region,
    /// Kept open for the lifetime of a file mapping.
    file: Option<File>,
    /// Distance from the start of the region to the first requested byte.
    delta: usize,
    len: usize,
    protection: Protection,
    sharing: Sharing,
}

impl Active {
    fn data_ptr(&self) -> *mut u8 {
        // SAFETY: `delta` is less than the granularity and the region is `delta + len` bytes.
        unsafe { self.region.base().add(self.delta) }
    }

    /// Release the memory, then the backing file.
    ///
    /// When the memory could not be released the mapping is handed back intact.
    fn release(self) -> std::result::Result<(), (Option<Active>, Error)> {
        let Active { region, file, delta, len, protection, sharing } = self;

        match region {
            Region::View(view) => match view.release() {
                Ok(()) => {}
                Err(ReleaseError { view: Some(view), error }) => {
                    let region = Region::View(view);
                    let active = Active { region, file, delta, len, protection, sharing };
                    return Err((Some(active), error));
                }
                Err(ReleaseError { view: None, error }) => {
                    drop(file);
                    return Err((None, error));
                }
            },
            Region::Shm(shm) => drop(shm),
        }

        drop(file);
        Ok(())
    }
}



/// Owns at most one memory mapping.
///
/// Mapping again releases the current mapping first. Dropping the `MemoryMap` releases whatever is
/// still mapped.
///
/// Fallible operations return `false` on failure and record why in [`last_error`]. Successful
/// operations leave the recorded failure alone, so a stale message can outlive the failure that
/// produced it.
///
/// [`last_error`]: MemoryMap::last_error
#[derive(Default)]
pub struct MemoryMap {
    active: Option<Active>,
    last_error: LastError,
}

impl MemoryMap {
    /// Create an empty, unmapped instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a file, or part of one, as described by `cfg`.
    pub fn map_file(&mut self, path: impl AsRef<Path>, cfg: &MapCfg) -> bool {
        let result = self.try_map_file(path.as_ref(), cfg);
        self.record(result)
    }

    /// Map `len` bytes of memory with no file behind it.
    ///
    /// Shared anonymous memory is visible to child processes forked after mapping it.
    pub fn map_anonymous(&mut self, len: usize, protection: Protection, sharing: Sharing) -> bool {
        let result = self.try_map_anonymous(len, protection, sharing);
        self.record(result)
    }

    /// Map the shared memory segment linked at `link`, creating a `len` byte segment if there is
    /// none.
    ///
    /// An existing segment is opened at its own size and `len` is ignored. The instance that
    /// created the segment removes it when unmapping.
    pub fn map_shared(&mut self, link: impl AsRef<Path>, len: usize) -> bool {
        let result = self.try_map_shared(link.as_ref(), len);
        self.record(result)
    }

    /// Release the current mapping. Returns `true` straight away when nothing is mapped.
    ///
    /// If the memory cannot be released the mapping stays intact and the call can be repeated.
    pub fn unmap(&mut self) -> bool {
        if self.active.is_none() {
            return true;
        }

        let size = self.size();
        let result = self.release();
        if result.is_ok() {
            log::debug!("unmapped {} bytes", size);
        }
        self.record(result)
    }

    /// Write dirty pages back and wait for them to reach stable storage.
    pub fn sync(&mut self) -> bool {
        self.sync_with(SyncMode::Sync)
    }

    /// Schedule dirty pages for write-back without waiting.
    pub fn sync_async(&mut self) -> bool {
        self.sync_with(SyncMode::Async)
    }

    pub fn sync_with(&mut self, mode: SyncMode) -> bool {
        let result = self.try_sync(mode);
        self.record(result)
    }

    /// Pointer to the first mapped byte, or null when unmapped.
    ///
    /// The pointer is only valid until the mapping is released.
    pub fn as_ptr(&self) -> *const u8 {
        self.active.as_ref().map_or(ptr::null(), |active| active.data_ptr().cast_const())
    }

    /// The mapped bytes.
    ///
    /// For shared mappings, other mappers can change these bytes at any time.
    pub fn data(&self) -> Option<&[u8]> {
        let active = self.active.as_ref()?;
        Some(unsafe { slice::from_raw_parts(active.data_ptr(), active.len) })
    }

    /// The mapped bytes, if the mapping is writable.
    pub fn data_mut(&mut self) -> Option<&mut [u8]> {
        let active = self.active.as_ref()?;
        if !active.protection.is_writable() {
            return None;
        }
        Some(unsafe { slice::from_raw_parts_mut(active.data_ptr(), active.len) })
    }

    pub fn size(&self) -> usize {
        self.active.as_ref().map_or(0, |active| active.len)
    }

    pub fn is_mapped(&self) -> bool {
        self.active.is_some()
    }

    pub fn protection(&self) -> Option<Protection> {
        self.active.as_ref().map(|active| active.protection)
    }

    pub fn sharing(&self) -> Option<Sharing> {
        self.active.as_ref().map(|active| active.sharing)
    }

    pub fn is_file_backed(&self) -> bool {
        self.active.as_ref().is_some_and(|active| active.file.is_some())
    }

    /// Returns `true` if a shared memory segment is mapped and this instance created it.
    pub fn is_owner(&self) -> bool {
        match &self.active {
            Some(Active { region: Region::Shm(shm), .. }) => shm.is_owner(),
            _ => false,
        }
    }

    /// The message of the most recent failure, or `""` if nothing has failed yet.
    pub fn last_error(&self) -> &str {
        self.last_error.message()
    }

    /// The most recent failure.
    pub fn error(&self) -> Option<&Error> {
        self.last_error.error()
    }

    pub fn clear_last_error(&mut self) {
        self.last_error.clear();
    }

    pub(crate) fn try_map_file(&mut self, path: &Path, cfg: &MapCfg) -> Result<()> {
        self.release_for_remap()?;

        let file = map::open(path, cfg.protection)?;
        let file_size = file.metadata().map_err(Error::Stat)?.len();
        let len = map::resolve_len(file_size, cfg.offset, cfg.len)?;

        let (aligned_offset, delta) = map::align_offset(cfg.offset, os::allocation_granularity());
        let map_len = len.checked_add(delta).ok_or(Error::TooLarge(len as u64))?;
        let view = os::map_file_view(&file, cfg.protection, cfg.sharing, aligned_offset, map_len)?;

        log::debug!(
            "mapped {} bytes of {} at offset {} ({}, {})",
            len,
            path.display(),
            cfg.offset,
            cfg.protection,
            cfg.sharing,
        );
        self.active = Some(Active {
            region: Region::View(view),
            file: Some(file),
            delta,
            len,
            protection: cfg.protection,
            sharing: cfg.sharing,
        });

        Ok(())
    }

    fn try_map_anonymous(
        &mut self,
        len: usize,
        protection: Protection,
        sharing: Sharing,
    ) -> Result<()> {
        self.release_for_remap()?;

        if len == 0 {
            return Err(Error::MapSizeZero);
        }
        let view = os::map_anonymous_view(len, protection, sharing)?;

        log::debug!("mapped {} anonymous bytes ({}, {})", len, protection, sharing);
        self.active = Some(Active {
            region: Region::View(view),
            file: None,
            delta: 0,
            len,
            protection,
            sharing,
        });

        Ok(())
    }

    fn try_map_shared(&mut self, link: &Path, len: usize) -> Result<()> {
        self.release_for_remap()?;

        let shm = if len == 0 {
            if !link.exists() {
                return Err(Error::MapSizeZero);
            }
            ShmemConf::new().flink(link).open()?
        } else {
            match ShmemConf::new().size(len).flink(link).create() {
                Ok(shm) => shm,
                Err(ShmemError::LinkExists) => ShmemConf::new().flink(link).open()?,
                Err(e) => return Err(e.into()),
            }
        };

        let len = shm.len();
        log::debug!(
            "mapped {} bytes of shared memory at {} (owner: {})",
            len,
            link.display(),
            shm.is_owner(),
        );
        self.active = Some(Active {
            region: Region::Shm(shm),
            file: None,
            delta: 0,
            len,
            protection: Protection::ReadWrite,
            sharing: Sharing::Shared,
        });

        Ok(())
    }

    fn try_sync(&self, mode: SyncMode) -> Result<()> {
        let active = self.active.as_ref().ok_or(Error::NotMapped)?;
        active.region.flush(mode)?;

        // Only a writable shared mapping can leave the file itself dirty.
        if mode == SyncMode::Sync
            && active.protection.is_writable()
            && active.sharing == Sharing::Shared
        {
            if let Some(file) = &active.file {
                file.sync_all().map_err(Error::FlushFile)?;
            }
        }

        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        let Some(active) = self.active.take() else {
            return Ok(());
        };

        active.release().map_err(|(kept, error)| {
            self.active = kept;
            error
        })
    }

    /// Release the current mapping ahead of a new one.
    ///
    /// A mapping whose memory is gone no longer blocks the new one, even if some of its cleanup
    /// failed.
    fn release_for_remap(&mut self) -> Result<()> {
        match self.release() {
            Ok(()) => Ok(()),
            Err(e) if self.active.is_none() => {
                log::warn!("previous mapping released with an error: {}", e);
                self.last_error.set(e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn record(&mut self, result: Result<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                log::debug!("memory map operation failed: {}", e);
                self.last_error.set(e);
                false
            }
        }
    }
}

impl Drop for MemoryMap {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::warn!("failed to release mapping on drop: {}", e);
        }
    }
}

impl fmt::Debug for MemoryMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryMap")
            .field("data", &self.as_ptr())
            .field("size", &self.size())
            .field("protection", &self.protection())
            .field("sharing", &self.sharing())
            .field("last_error", &self.last_error())
            .finish()
    }
}



#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn scratch_file(dir: &TempDir, name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn read_write() -> MapCfg {
        MapCfg::new().protection(Protection::ReadWrite)
    }

    /// Open descriptors and mapped regions of this process that refer to `path`.
    #[cfg(target_os = "linux")]
    fn handles_to(path: &Path) -> (usize, usize) {
        let fds = std::fs::read_dir("/proc/self/fd")
            .unwrap()
            .filter_map(|entry| std::fs::read_link(entry.ok()?.path()).ok())
            .filter(|target| target == path)
            .count();
        let maps = std::fs::read_to_string("/proc/self/maps")
            .unwrap()
            .lines()
            .filter(|line| line.ends_with(&*path.to_string_lossy()))
            .count();
        (fds, maps)
    }

    #[test]
    fn anonymous_scratch_buffer() {
        let mut map = MemoryMap::new();
        assert!(map.map_anonymous(4096, Protection::ReadWrite, Sharing::Private));
        assert!(map.is_mapped());
        assert_eq!(map.size(), 4096);
        assert!(!map.is_file_backed());

        map.data_mut().unwrap().fill(0xAB);
        assert!(map.data().unwrap().iter().all(|&b| b == 0xAB));

        assert!(map.unmap());
        assert!(!map.is_mapped());
        assert_eq!(map.size(), 0);
        assert!(map.as_ptr().is_null());
        assert!(map.data().is_none());
    }

    #[test]
    fn anonymous_memory_starts_zeroed() {
        let mut map = MemoryMap::new();
        assert!(map.map_anonymous(10_000, Protection::ReadWrite, Sharing::Shared));
        assert!(map.data().unwrap().iter().all(|&b| b == 0));
        assert_eq!(map.sharing(), Some(Sharing::Shared));
        assert!(map.sync_async());
        assert!(map.sync());
    }

    #[test]
    fn anonymous_zero_length_fails() {
        let mut map = MemoryMap::new();
        assert!(!map.map_anonymous(0, Protection::ReadWrite, Sharing::Private));
        assert!(matches!(map.error(), Some(Error::MapSizeZero)));
        assert!(!map.is_mapped());
    }

    #[test]
    fn missing_file_fails() {
        let dir = TempDir::new("mapman").unwrap();
        let mut map = MemoryMap::new();
        assert!(!map.map_file(dir.path().join("missing.bin"), &MapCfg::new()));
        assert!(!map.last_error().is_empty());
        assert!(map.last_error().contains("missing.bin"));
        assert!(matches!(map.error(), Some(Error::Open { .. })));
        assert!(!map.is_mapped());
    }

    #[test]
    fn sync_without_mapping_fails() {
        let mut map = MemoryMap::new();
        assert!(!map.sync());
        assert!(matches!(map.error(), Some(Error::NotMapped)));
        assert_eq!(map.last_error(), "no mapped memory to sync");
        assert!(!map.is_mapped());
    }

    #[test]
    fn unmap_is_idempotent() {
        let mut map = MemoryMap::new();
        assert!(map.unmap());
        assert_eq!(map.last_error(), "");

        assert!(!map.sync());
        assert!(map.unmap());
        assert!(map.unmap());
        assert_eq!(map.last_error(), "no mapped memory to sync");
    }

    #[test]
    fn whole_file_read_only() {
        let dir = TempDir::new("mapman").unwrap();
        let path = scratch_file(&dir, "data.bin", b"hello, mapping");

        let mut map = MemoryMap::new();
        assert!(map.map_file(&path, &MapCfg::new()));
        assert_eq!(map.size(), 14);
        assert_eq!(map.data().unwrap(), b"hello, mapping");
        assert_eq!(map.protection(), Some(Protection::ReadOnly));
        assert!(map.is_file_backed());
        assert!(map.data_mut().is_none());
        assert!(map.sync());
    }

    #[test]
    fn shared_writes_reach_the_file() {
        let dir = TempDir::new("mapman").unwrap();
        let path = scratch_file(&dir, "shared.bin", &[0u8; 64]);

        let mut map = MemoryMap::new();
        assert!(map.map_file(&path, &read_write()));
        map.data_mut().unwrap()[..5].copy_from_slice(b"12345");
        assert!(map.sync());

        let contents = std::fs::read(&path).unwrap();
        assert_eq!(&contents[..5], b"12345");
        assert!(contents[5..].iter().all(|&b| b == 0));
        assert!(map.unmap());
    }

    #[test]
    fn async_sync_on_a_shared_file() {
        let dir = TempDir::new("mapman").unwrap();
        let path = scratch_file(&dir, "async.bin", &[0u8; 32]);

        let mut map = MemoryMap::new();
        assert!(map.map_file(&path, &read_write()));
        map.data_mut().unwrap()[8..13].copy_from_slice(b"later");
        assert!(map.sync_async());
        assert!(map.sync_with(SyncMode::Async));
        assert_eq!(map.last_error(), "");

        assert_eq!(&std::fs::read(&path).unwrap()[8..13], b"later");
        assert!(map.unmap());
    }

    #[test]
    fn private_writes_stay_private() {
        let dir = TempDir::new("mapman").unwrap();
        let path = scratch_file(&dir, "private.bin", b"original");

        let mut map = MemoryMap::new();
        assert!(map.map_file(&path, &read_write().sharing(Sharing::Private)));
        map.data_mut().unwrap().copy_from_slice(b"modified");
        assert!(map.sync());
        assert_eq!(map.data().unwrap(), b"modified");

        assert_eq!(std::fs::read(&path).unwrap(), b"original");
        assert!(map.unmap());
        assert_eq!(std::fs::read(&path).unwrap(), b"original");
    }

    #[test]
    fn remap_releases_the_previous_file() {
        let dir = TempDir::new("mapman").unwrap();
        let first = scratch_file(&dir, "first.bin", b"first");
        let second = scratch_file(&dir, "second.bin", b"second!");

        let mut map = MemoryMap::new();
        assert!(map.map_file(&first, &read_write()));
        #[cfg(target_os = "linux")]
        let first = std::fs::canonicalize(&first).unwrap();
        #[cfg(target_os = "linux")]
        assert_eq!(handles_to(&first), (1, 1));

        assert!(map.map_file(&second, &MapCfg::new()));
        assert_eq!(map.size(), 7);
        assert_eq!(map.data().unwrap(), b"second!");
        #[cfg(target_os = "linux")]
        assert_eq!(handles_to(&first), (0, 0));

        std::fs::remove_file(&first).unwrap();
        std::fs::write(&first, b"again").unwrap();
        assert_eq!(std::fs::read(&first).unwrap(), b"again");
    }

    #[test]
    fn remap_from_anonymous_to_file() {
        let dir = TempDir::new("mapman").unwrap();
        let path = scratch_file(&dir, "data.bin", b"abc");

        let mut map = MemoryMap::new();
        assert!(map.map_anonymous(8192, Protection::ReadWrite, Sharing::Private));
        assert!(map.map_file(&path, &MapCfg::new()));
        assert_eq!(map.size(), 3);
        assert!(map.is_file_backed());
    }

    #[test]
    fn failed_remap_leaves_nothing_mapped() {
        let dir = TempDir::new("mapman").unwrap();
        let mut map = MemoryMap::new();
        assert!(map.map_anonymous(4096, Protection::ReadWrite, Sharing::Private));
        assert!(!map.map_file(dir.path().join("missing.bin"), &MapCfg::new()));
        assert!(!map.is_mapped());
        assert_eq!(map.size(), 0);
    }

    #[test]
    fn offset_beyond_end_fails() {
        let dir = TempDir::new("mapman").unwrap();
        let path = scratch_file(&dir, "short.bin", &[1u8; 16]);

        let mut map = MemoryMap::new();
        assert!(!map.map_file(&path, &MapCfg::new().offset(17)));
        assert!(matches!(
            map.error(),
            Some(Error::OffsetBeyondEnd { offset: 17, file_size: 16 }),
        ));
        assert!(!map.is_mapped());
        assert!(map.as_ptr().is_null());
    }

    #[test]
    fn range_beyond_end_fails() {
        let dir = TempDir::new("mapman").unwrap();
        let path = scratch_file(&dir, "short.bin", &[1u8; 16]);

        let mut map = MemoryMap::new();
        assert!(!map.map_file(&path, &MapCfg::new().offset(8).len(9)));
        assert!(matches!(map.error(), Some(Error::RangeBeyondEnd { .. })));
        assert!(!map.is_mapped());
    }

    #[test]
    fn empty_file_is_rejected() {
        let dir = TempDir::new("mapman").unwrap();
        let path = scratch_file(&dir, "empty.bin", &[]);

        let mut map = MemoryMap::new();
        assert!(!map.map_file(&path, &MapCfg::new()));
        assert!(matches!(map.error(), Some(Error::MapSizeZero)));
        assert!(!map.is_mapped());
    }

    #[test]
    fn unaligned_offset_maps_the_requested_bytes() {
        let dir = TempDir::new("mapman").unwrap();
        let contents: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let path = scratch_file(&dir, "pattern.bin", &contents);

        let mut map = MemoryMap::new();
        assert!(map.map_file(&path, &MapCfg::new().offset(5000).len(100)));
        assert_eq!(map.size(), 100);
        assert_eq!(map.data().unwrap(), &contents[5000..5100]);

        assert!(map.map_file(&path, &MapCfg::new().offset(9_999)));
        assert_eq!(map.data().unwrap(), &contents[9_999..]);
    }

    #[test]
    fn unaligned_shared_write_lands_at_offset() {
        let dir = TempDir::new("mapman").unwrap();
        let path = scratch_file(&dir, "window.bin", &[0u8; 5000]);

        let mut map = MemoryMap::new();
        assert!(map.map_file(&path, &read_write().offset(4097).len(3)));
        map.data_mut().unwrap().copy_from_slice(b"xyz");
        assert!(map.sync());
        assert!(map.unmap());

        let contents = std::fs::read(&path).unwrap();
        assert_eq!(&contents[4097..4100], b"xyz");
        assert_eq!(contents[4096], 0);
        assert_eq!(contents[4100], 0);
    }

    #[test]
    fn stale_error_survives_success() {
        let mut map = MemoryMap::new();
        assert!(!map.sync());
        assert!(map.map_anonymous(4096, Protection::ReadWrite, Sharing::Private));
        assert!(map.sync());
        assert_eq!(map.last_error(), "no mapped memory to sync");

        map.clear_last_error();
        assert_eq!(map.last_error(), "");
        assert!(map.error().is_none());
    }

    #[test]
    fn drop_releases_the_mapping() {
        let dir = TempDir::new("mapman").unwrap();
        let path = scratch_file(&dir, "dropped.bin", b"bytes");
        #[cfg(target_os = "linux")]
        let path = std::fs::canonicalize(&path).unwrap();
        {
            let mut map = MemoryMap::new();
            assert!(map.map_file(&path, &read_write()));
            #[cfg(target_os = "linux")]
            assert_eq!(handles_to(&path), (1, 1));
        }
        #[cfg(target_os = "linux")]
        assert_eq!(handles_to(&path), (0, 0));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn cfg_open_returns_a_mapped_instance() {
        let dir = TempDir::new("mapman").unwrap();
        let path = scratch_file(&dir, "cfg.bin", b"configured");

        let map = MapCfg::new().offset(3).open(&path).unwrap();
        assert_eq!(map.data().unwrap(), b"figured");

        let err = MapCfg::new().open(dir.path().join("missing.bin")).unwrap_err();
        assert!(matches!(err, Error::Open { .. }));
    }

    #[test]
    fn shared_memory_is_visible_between_maps() {
        let dir = TempDir::new("mapman").unwrap();
        let link = dir.path().join("segment");

        let mut owner = MemoryMap::new();
        assert!(owner.map_shared(&link, 64));
        assert!(owner.is_owner());
        assert_eq!(owner.size(), 64);

        let mut other = MemoryMap::new();
        assert!(other.map_shared(&link, 0));
        assert!(!other.is_owner());
        assert!(other.size() >= 64);

        owner.data_mut().unwrap()[..4].copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(&other.data().unwrap()[..4], &[1, 2, 3, 4]);
        assert!(other.sync());

        assert!(other.unmap());
        assert!(owner.unmap());
    }

    #[test]
    fn shared_memory_needs_a_size_to_create() {
        let dir = TempDir::new("mapman").unwrap();
        let mut map = MemoryMap::new();
        assert!(!map.map_shared(dir.path().join("nothing"), 0));
        assert!(matches!(map.error(), Some(Error::MapSizeZero)));
    }

    #[cfg(unix)]
    #[test]
    fn failed_unmap_keeps_the_mapping() {
        let page = os::allocation_granularity();
        let real = os::map_anonymous_view(2 * page, Protection::ReadWrite, Sharing::Private)
            .unwrap();

        // `munmap` rejects the misaligned address, so this view can never be released.
        let misaligned = NonNull::new(real.as_ptr().wrapping_add(1)).unwrap();
        let bogus = unsafe { os::View::from_raw_parts(misaligned, page) };

        let mut map = MemoryMap::new();
        map.active = Some(Active {
            region: Region::View(bogus),
            file: None,
            delta: 0,
            len: page,
            protection: Protection::ReadWrite,
            sharing: Sharing::Private,
        });

        assert!(!map.unmap());
        assert!(map.is_mapped());
        assert_eq!(map.size(), page);
        assert_eq!(map.as_ptr(), misaligned.as_ptr().cast_const());
        assert!(matches!(map.error(), Some(Error::Unmap(_))));

        map.clear_last_error();
        assert!(!map.map_anonymous(page, Protection::ReadWrite, Sharing::Private));
        assert!(matches!(map.error(), Some(Error::Unmap(_))));
        assert_eq!(map.as_ptr(), misaligned.as_ptr().cast_const());

        std::mem::forget(map.active.take());
        assert!(real.release().is_ok());
    }
}
