// src/engine/io.rs
//
// Input sources and output destinations for the entry/exit operations.
// Sources are cheap to clone; file paths are memory-mapped on load so large
// inputs never get copied into the heap.

use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;
use parking_lot::Mutex;

use crate::error::PipeError;

/// Shared grow-only byte buffer used by [`Destination::Buffer`].
pub type SharedBuffer = Arc<Mutex<Vec<u8>>>;

// =============================================================================
// SOURCE
// =============================================================================

/// Where the entry operation reads encoded image bytes from.
#[derive(Clone)]
pub enum Source {
    /// Bytes already in memory.
    Memory(Arc<Vec<u8>>),
    /// A memory-mapped file.
    Mapped { map: Arc<Mmap>, path: PathBuf },
    /// A path, mapped lazily when the pipeline runs.
    Path(PathBuf),
}

impl Source {
    /// Map a file into memory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PipeError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PipeError::file_not_found(path.display().to_string()));
        }
        let file = File::open(path)
            .map_err(|e| PipeError::file_read_failed(path.display().to_string(), e))?;
        // Safety: the map is read-only and we never hand out mutable views.
        let map = unsafe { Mmap::map(&file) }
            .map_err(|e| PipeError::mmap_failed(path.display().to_string(), e))?;
        Ok(Self::Mapped {
            map: Arc::new(map),
            path: path.to_path_buf(),
        })
    }

    /// Buffer a reader to completion.
    ///
    /// Streaming inputs are drained fully before decoding starts; decode
    /// never begins on a partial stream.
    pub fn from_reader(mut reader: impl Read) -> Result<Self, PipeError> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| PipeError::StreamReadFailed { source: e })?;
        Ok(Self::Memory(Arc::new(bytes)))
    }

    /// The encoded bytes, resolving `Path` sources on demand.
    pub fn load(&self) -> Result<Loaded<'_>, PipeError> {
        match self {
            Self::Memory(bytes) => Ok(Loaded::Borrowed(bytes)),
            Self::Mapped { map, .. } => Ok(Loaded::Borrowed(map)),
            Self::Path(path) => {
                if !path.exists() {
                    return Err(PipeError::file_not_found(path.display().to_string()));
                }
                let bytes = std::fs::read(path)
                    .map_err(|e| PipeError::file_read_failed(path.display().to_string(), e))?;
                Ok(Loaded::Owned(bytes))
            }
        }
    }

    /// A short human-readable name for error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Memory(bytes) => format!("<memory: {} bytes>", bytes.len()),
            Self::Mapped { path, .. } | Self::Path(path) => path.display().to_string(),
        }
    }
}

/// Bytes produced by [`Source::load`], borrowed where possible.
pub enum Loaded<'a> {
    Borrowed(&'a [u8]),
    Owned(Vec<u8>),
}

impl Loaded<'_> {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Loaded::Borrowed(b) => b,
            Loaded::Owned(v) => v,
        }
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory(bytes) => write!(f, "Source::Memory({} bytes)", bytes.len()),
            Self::Mapped { path, map } => {
                write!(f, "Source::Mapped({}, {} bytes)", path.display(), map.len())
            }
            Self::Path(path) => write!(f, "Source::Path({})", path.display()),
        }
    }
}

impl From<Vec<u8>> for Source {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Memory(Arc::new(bytes))
    }
}

impl From<&[u8]> for Source {
    fn from(bytes: &[u8]) -> Self {
        Self::Memory(Arc::new(bytes.to_vec()))
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<&str> for Source {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

// =============================================================================
// DESTINATION
// =============================================================================

/// Where the exit operation writes encoded bytes to.
pub enum Destination {
    Path(PathBuf),
    Writer(Box<dyn Write + Send>),
    Buffer(SharedBuffer),
}

impl Destination {
    pub fn buffer() -> (Self, SharedBuffer) {
        let buf: SharedBuffer = Arc::new(Mutex::new(Vec::new()));
        (Self::Buffer(buf.clone()), buf)
    }

    /// Write the encoded bytes out.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), PipeError> {
        match self {
            Self::Path(path) => std::fs::write(&*path, bytes)
                .map_err(|e| PipeError::file_write_failed(path.display().to_string(), e)),
            Self::Writer(w) => {
                w.write_all(bytes)
                    .and_then(|_| w.flush())
                    .map_err(|e| PipeError::StreamWriteFailed { source: e })
            }
            Self::Buffer(buf) => {
                let mut guard = buf.lock();
                guard.clear();
                guard.extend_from_slice(bytes);
                Ok(())
            }
        }
    }

    /// The destination path, if it is one. Used for extension-based format
    /// inference.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Path(p) => Some(p),
            _ => None,
        }
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "Destination::Path({})", path.display()),
            Self::Writer(_) => write!(f, "Destination::Writer(..)"),
            Self::Buffer(buf) => write!(f, "Destination::Buffer({} bytes)", buf.lock().len()),
        }
    }
}

impl From<PathBuf> for Destination {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for Destination {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<&str> for Destination {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<SharedBuffer> for Destination {
    fn from(buf: SharedBuffer) -> Self {
        Self::Buffer(buf)
    }
}
