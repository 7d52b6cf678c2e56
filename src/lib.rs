//! Memory map manager
//!
//! A [`MemoryMap`] owns at most one memory mapping at a time. The mapping can be backed by a file,
//! by anonymous memory, or by a named shared memory segment. Every fallible operation reports
//! success as a `bool` and records the reason for a failure, which stays readable through
//! [`MemoryMap::last_error`] until the next failure replaces it.
//!
//! ```no_run
//! use mapman::{MapCfg, MemoryMap, Protection};
//!
//! let mut map = MemoryMap::new();
//! if !map.map_file("data.bin", &MapCfg::new().protection(Protection::ReadWrite)) {
//!     eprintln!("mapping failed: {}", map.last_error());
//!     return;
//! }
//! if let Some(bytes) = map.data_mut() {
//!     bytes[0] = 0xff;
//! }
//! map.sync();
//! map.unmap();
//! ```

pub mod last_error;
pub mod manager;
mod map;

pub use last_error::*;
pub use manager::*;
pub use map::{MapCfg, Protection, Sharing, SyncMode};

use std::path::PathBuf;



pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Generic shared memory error.
    #[error("shared memory error: {0}")]
    Shm(#[from] shared_memory::ShmemError),
    /// Attempted to create a map that was of length zero.
    #[error("cannot map a region of length zero")]
    MapSizeZero,
    /// The requested offset lies past the end of the file.
    #[error("offset {offset} is beyond the end of the file ({file_size} bytes)")]
    OffsetBeyondEnd { offset: u64, file_size: u64 },
    /// The requested range extends past the end of the file.
    #[error("range {offset}..{end} extends past the end of the file ({file_size} bytes)")]
    RangeBeyondEnd { offset: u64, end: u64, file_size: u64 },
    /// The requested region cannot be addressed on this platform.
    #[error("a region of {0} bytes does not fit in the address space")]
    TooLarge(u64),
    #[error("unknown protection `{0}`, expected `readonly` or `readwrite`")]
    InvalidProtection(String),
    #[error("unknown sharing mode `{0}`, expected `private` or `shared`")]
    InvalidSharing(String),
    #[error("failed to open file {}: {source}", .path.display())]
    Open { path: PathBuf, source: std::io::Error },
    #[error("failed to get file size: {0}")]
    Stat(std::io::Error),
    #[error("failed to map file: {0}")]
    MapFile(std::io::Error),
    #[error("failed to create anonymous mapping: {0}")]
    MapAnonymous(std::io::Error),
    #[error("failed to unmap memory: {0}")]
    Unmap(std::io::Error),
    /// The view was released but the mapping object handle could not be closed.
    #[error("failed to close mapping handle: {0}")]
    CloseHandle(std::io::Error),
    /// Attempted to sync while nothing is mapped.
    #[error("no mapped memory to sync")]
    NotMapped,
    #[error("failed to sync memory: {0}")]
    Sync(std::io::Error),
    #[error("failed to flush file buffers: {0}")]
    FlushFile(std::io::Error),
}
