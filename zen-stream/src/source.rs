//! Concrete stream backends.

use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use memmap2::Mmap;
use tracing::debug;

use crate::error::Result;

/// An in-memory stream over an owned byte buffer.
///
/// Used for archive/script blobs that are already fully loaded (e.g. a VOb
/// header's packed field range, or a Daedalus module's bytecode segment).
pub type MemoryStream = Cursor<Vec<u8>>;

/// A read-only file-backed stream.
///
/// Memory-maps the file when possible for zero-copy random access, falling
/// back to a buffered file handle (e.g. on platforms or filesystems where
/// mmap is unavailable). Either way the stream implements `Read + Seek`.
pub enum FileStream {
    Mapped { mmap: Mmap, pos: u64 },
    Buffered(BufReader<File>),
}

impl FileStream {
    /// Opens `path`, preferring a memory map and falling back to buffered
    /// reads if the mapping fails (e.g. a zero-length file, or a filesystem
    /// that doesn't support `mmap`).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        match unsafe { Mmap::map(&file) } {
            Ok(mmap) => {
                debug!(path = %path.display(), len = mmap.len(), "memory-mapped file stream");
                Ok(Self::Mapped { mmap, pos: 0 })
            }
            Err(err) => {
                debug!(path = %path.display(), %err, "mmap failed, falling back to buffered reads");
                Ok(Self::Buffered(BufReader::new(file)))
            }
        }
    }

    pub fn len(&self) -> Result<u64> {
        match self {
            Self::Mapped { mmap, .. } => Ok(mmap.len() as u64),
            Self::Buffered(reader) => Ok(reader.get_ref().metadata()?.len()),
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Read for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Mapped { mmap, pos } => {
                let start = (*pos).min(mmap.len() as u64) as usize;
                let available = &mmap[start..];
                let n = available.len().min(buf.len());
                buf[..n].copy_from_slice(&available[..n]);
                *pos += n as u64;
                Ok(n)
            }
            Self::Buffered(reader) => reader.read(buf),
        }
    }
}

impl Seek for FileStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Self::Mapped { mmap, pos: cur } => {
                let len = mmap.len() as i64;
                let new_pos = match pos {
                    SeekFrom::Start(offset) => offset as i64,
                    SeekFrom::Current(offset) => *cur as i64 + offset,
                    SeekFrom::End(offset) => len + offset,
                };
                if new_pos < 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "seek to a negative position",
                    ));
                }
                *cur = new_pos as u64;
                Ok(*cur)
            }
            Self::Buffered(reader) => reader.seek(pos),
        }
    }
}
