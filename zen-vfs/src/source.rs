//! Lazy handles a [`crate::VfsNode::File`] uses to open a stream on demand.

use std::io::{self, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;

/// A `Read + Seek` stream over a byte range shared with other entries of the
/// same disk container, without copying the container's bytes per entry.
pub struct DiskEntryStream {
    data: Arc<Vec<u8>>,
    start: usize,
    len: usize,
    pos: usize,
}

impl DiskEntryStream {
    fn new(data: Arc<Vec<u8>>, start: usize, len: usize) -> Self {
        Self {
            data,
            start,
            len,
            pos: 0,
        }
    }
}

impl Read for DiskEntryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.len.saturating_sub(self.pos);
        let n = remaining.min(buf.len());
        let from = self.start + self.pos;
        buf[..n].copy_from_slice(&self.data[from..from + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Seek for DiskEntryStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::Current(offset) => self.pos as i64 + offset,
            SeekFrom::End(offset) => self.len as i64 + offset,
        };
        if new_pos < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative position",
            ));
        }
        self.pos = new_pos as usize;
        Ok(self.pos as u64)
    }
}

/// Where a [`crate::VfsNode::File`]'s bytes live, and how to open them.
#[derive(Clone)]
pub enum FileSource {
    /// A byte range inside a mounted disk container's data block.
    Disk {
        data: Arc<Vec<u8>>,
        offset: u32,
        size: u32,
    },
    /// A regular file somewhere on the host filesystem.
    Host { path: PathBuf },
}

impl FileSource {
    pub fn len(&self) -> Result<u64> {
        match self {
            Self::Disk { size, .. } => Ok(u64::from(*size)),
            Self::Host { path } => Ok(std::fs::metadata(path)?.len()),
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Opens a fresh `Read + Seek` stream positioned at the start of this
    /// file's bytes.
    pub fn open(&self) -> Result<Box<dyn ReadSeek>> {
        match self {
            Self::Disk { data, offset, size } => Ok(Box::new(DiskEntryStream::new(
                Arc::clone(data),
                *offset as usize,
                *size as usize,
            ))),
            Self::Host { path } => Ok(Box::new(zen_stream::FileStream::open(path)?)),
        }
    }
}

/// Convenience alias for a boxed bidirectional stream.
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}
