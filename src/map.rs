//! Mapping



#[cfg(unix)]
pub(crate) mod unix;
#[cfg(unix)]
pub(crate) use unix as os;

#[cfg(windows)]
pub(crate) mod windows;
#[cfg(windows)]
pub(crate) use windows as os;

use std::{fmt, fs::{File, OpenOptions}, path::Path, str::FromStr};

use crate::{Error, MemoryMap, Result};



/// Access rights of a mapping. Fixed for the lifetime of the mapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Protection {
    #[default]
    ReadOnly,
    ReadWrite,
}

impl Protection {
    pub fn is_writable(self) -> bool {
        self == Protection::ReadWrite
    }
}

impl FromStr for Protection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "readonly" | "r" => Ok(Protection::ReadOnly),
            "readwrite" | "rw" => Ok(Protection::ReadWrite),
            _ => Err(Error::InvalidProtection(s.to_string())),
        }
    }
}

impl fmt::Display for Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protection::ReadOnly => "readonly",
            Protection::ReadWrite => "readwrite",
        })
    }
}

/// Whether writes reach other mappers of the same object (`Shared`) or stay copy-on-write
/// (`Private`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Sharing {
    Private,
    #[default]
    Shared,
}

impl FromStr for Sharing {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "private" => Ok(Sharing::Private),
            "shared" => Ok(Sharing::Shared),
            _ => Err(Error::InvalidSharing(s.to_string())),
        }
    }
}

impl fmt::Display for Sharing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sharing::Private => "private",
            Sharing::Shared => "shared",
        })
    }
}

/// How [`MemoryMap::sync_with`] waits for write-back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// Wait until the data reaches stable storage.
    #[default]
    Sync,
    /// Schedule the write-back and return.
    Async,
}



/// Options for mapping a file.
///
/// The defaults map the whole file read-only and shared.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MapCfg {
    pub(crate) protection: Protection,
    pub(crate) sharing: Sharing,
    pub(crate) offset: u64,
    pub(crate) len: usize,
}

impl MapCfg {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protection(mut self, protection: Protection) -> Self {
        self.protection = protection;
        self
    }

    pub fn sharing(mut self, sharing: Sharing) -> Self {
        self.sharing = sharing;
        self
    }

    /// Byte offset into the file. It does not have to be aligned.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Number of bytes to map. Zero maps from the offset to the end of the file.
    pub fn len(mut self, len: usize) -> Self {
        self.len = len;
        self
    }

    /// Map the file at `path` into a new [`MemoryMap`].
    pub fn open(self, path: impl AsRef<Path>) -> Result<MemoryMap> {
        let mut map = MemoryMap::new();
        map.try_map_file(path.as_ref(), &self)?;
        Ok(map)
    }
}



/// A view that could not be fully released.
pub(crate) struct ReleaseError {
    /// The view, if its memory is still mapped.
    pub(crate) view: Option<os::View>,
    pub(crate) error: Error,
}

/// Open `path` with access matching `protection`.
pub(crate) fn open(path: &Path, protection: Protection) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(protection.is_writable())
        .open(path)
        .map_err(|source| Error::Open { path: path.to_path_buf(), source })
}

/// Work out how many bytes of a `file_size` byte file a request for `len` bytes at `offset`
/// covers.
pub(crate) fn resolve_len(file_size: u64, offset: u64, len: usize) -> Result<usize> {
    let len = if len == 0 {
        if offset > file_size {
            return Err(Error::OffsetBeyondEnd { offset, file_size });
        }
        file_size - offset
    } else {
        let end = offset.checked_add(len as u64).ok_or(Error::TooLarge(len as u64))?;
        if end > file_size {
            return Err(Error::RangeBeyondEnd { offset, end, file_size });
        }
        len as u64
    };

    match usize::try_from(len) {
        Ok(0) => Err(Error::MapSizeZero),
        Ok(len) => Ok(len),
        Err(_) => Err(Error::TooLarge(len)),
    }
}

/// Split `offset` into the aligned offset the OS accepts and the distance from there to `offset`.
pub(crate) fn align_offset(offset: u64, granularity: usize) -> (u64, usize) {
    let delta = offset % granularity as u64;
    (offset - delta, delta as usize)
}
