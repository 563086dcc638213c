//! The "disk" flat-file container format: a 300-byte header followed by a
//! flat catalog of fixed 80-byte entries, followed by file data.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use zen_stream::{ReadExt, WriteExt};

use crate::dos_time::{datetime_to_dos, dos_to_datetime};
use crate::error::{Result, VfsError};
use crate::node::{Directory, FileEntry, VfsNode};
use crate::policy::OverwritePolicy;
use crate::source::FileSource;

const COMMENT_LEN: usize = 256;
const SIGNATURE_LEN: usize = 16;
const CATALOG_ENTRY_LEN: usize = 80;
const NAME_LEN: usize = 64;
const REQUIRED_VERSION: u32 = 1;
const REQUIRED_ALIGNMENT: u32 = 80;
const HEADER_LEN: usize = COMMENT_LEN + SIGNATURE_LEN + 4 * 7;

const ENTRY_TYPE_DIRECTORY: u32 = 1 << 31;
const ENTRY_TYPE_LAST: u32 = 1 << 30;

/// Identifies which toolchain produced a disk container. All three share the
/// same header and catalog layout; only the signature bytes differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskDialect {
    /// `PSVDSC_V2.00\r\n\r\n`
    Legacy,
    /// `PSVDSC_V2.00\n\r\n\r`
    Modern,
    /// A third, compressed-catalog variant this library does not write and
    /// cannot read (its alignment is never 80).
    Compressed,
}

impl DiskDialect {
    const LEGACY_BYTES: &'static [u8; SIGNATURE_LEN] = b"PSVDSC_V2.00\r\n\r\n";
    const MODERN_BYTES: &'static [u8; SIGNATURE_LEN] = b"PSVDSC_V2.00\n\r\n\r";
    const COMPRESSED_BYTES: &'static [u8; SIGNATURE_LEN] = b"PSVDSC_V2.00cmpr";

    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            b if b == Self::LEGACY_BYTES => Some(Self::Legacy),
            b if b == Self::MODERN_BYTES => Some(Self::Modern),
            b if b == Self::COMPRESSED_BYTES => Some(Self::Compressed),
            _ => None,
        }
    }

    fn as_bytes(self) -> &'static [u8; SIGNATURE_LEN] {
        match self {
            Self::Legacy => Self::LEGACY_BYTES,
            Self::Modern => Self::MODERN_BYTES,
            Self::Compressed => Self::COMPRESSED_BYTES,
        }
    }
}

struct CatalogEntry {
    name: String,
    offset: u32,
    size: u32,
    type_bits: u32,
}

impl CatalogEntry {
    fn is_directory(&self) -> bool {
        self.type_bits & ENTRY_TYPE_DIRECTORY != 0
    }

    fn is_last_in_parent(&self) -> bool {
        self.type_bits & ENTRY_TYPE_LAST != 0
    }
}

/// Parses a disk container from `bytes` and returns its root directory node
/// plus the dialect it was written in.
pub fn parse(label: &str, bytes: Vec<u8>) -> Result<(VfsNode, DiskDialect)> {
    let mut cursor = std::io::Cursor::new(&bytes[..]);

    let _comment = cursor.read_bytes(COMMENT_LEN)?;
    let signature = cursor.read_bytes(SIGNATURE_LEN)?;
    let dialect = DiskDialect::from_bytes(&signature).ok_or_else(|| VfsError::BrokenSignature {
        path: label.to_string(),
    })?;

    let entry_count = cursor.read_u32()?;
    let _file_count = cursor.read_u32()?;
    let timestamp_dos = cursor.read_u32()?;
    let _total_size = cursor.read_u32()?;
    let catalog_offset = cursor.read_u32()?;
    let version = cursor.read_u32()?;
    let alignment = cursor.read_u32()?;

    if version != REQUIRED_VERSION {
        return Err(VfsError::UnsupportedVersion {
            path: label.to_string(),
            found: version,
        });
    }
    if alignment != REQUIRED_ALIGNMENT || dialect == DiskDialect::Compressed {
        return Err(VfsError::UnsupportedAlignment {
            path: label.to_string(),
            found: alignment,
        });
    }

    let modified = dos_to_datetime(timestamp_dos);
    debug!(label, entry_count, ?dialect, %modified, "parsed disk container header");

    let mut entries = Vec::with_capacity(entry_count as usize);
    let mut entry_cursor = std::io::Cursor::new(&bytes[catalog_offset as usize..]);
    for _ in 0..entry_count {
        let name_bytes = entry_cursor.read_bytes(NAME_LEN)?;
        let name = String::from_utf8_lossy(&name_bytes)
            .trim_end()
            .to_string();
        let offset = entry_cursor.read_u32()?;
        let size = entry_cursor.read_u32()?;
        let type_bits = entry_cursor.read_u32()?;
        let _attributes = entry_cursor.read_u32()?;
        entries.push(CatalogEntry {
            name,
            offset,
            size,
            type_bits,
        });
    }
    debug_assert_eq!(CATALOG_ENTRY_LEN, NAME_LEN + 4 * 4);

    let data = Arc::new(bytes);
    let mut root = Directory::new(String::new());
    root.modified = Some(modified);
    if !entries.is_empty() {
        build_children(&entries, 0, &mut root, &data, modified)?;
    }
    Ok((VfsNode::Directory(root), dialect))
}

/// Populates `dir` with the run of sibling entries starting at `start`,
/// stopping after (and including) the entry marked last-in-parent.
fn build_children(
    entries: &[CatalogEntry],
    start: usize,
    dir: &mut Directory,
    data: &Arc<Vec<u8>>,
    container_modified: DateTime<Utc>,
) -> Result<()> {
    let mut index = start;
    loop {
        let entry = entries
            .get(index)
            .ok_or_else(|| VfsError::BrokenSignature {
                path: format!("catalog index {index} out of range"),
            })?;

        if entry.is_directory() {
            let mut child = Directory::new(entry.name.clone());
            child.modified = Some(container_modified);
            let child_start = entry.offset as usize;
            if child_start < entries.len() {
                build_children(entries, child_start, &mut child, data, container_modified)?;
            }
            dir.merge_child(VfsNode::Directory(child), OverwritePolicy::All)?;
        } else {
            let file = FileEntry {
                name: entry.name.clone(),
                modified: container_modified,
                source: FileSource::Disk {
                    data: Arc::clone(data),
                    offset: entry.offset,
                    size: entry.size,
                },
            };
            dir.merge_child(VfsNode::File(file), OverwritePolicy::All)?;
        }

        if entry.is_last_in_parent() {
            break;
        }
        index += 1;
    }
    Ok(())
}

/// A directory's children, read fully into memory and ready to be laid out
/// into a flat catalog.
enum PendingEntry {
    Directory { name: String, children: Vec<PendingEntry> },
    File { name: String, bytes: Vec<u8> },
}

fn collect_pending(dir: &Directory) -> Result<Vec<PendingEntry>> {
    let mut out = Vec::new();
    for node in dir.iter() {
        match node {
            VfsNode::Directory(child) => out.push(PendingEntry::Directory {
                name: child.name.clone(),
                children: collect_pending(child)?,
            }),
            VfsNode::File(file) => {
                let mut bytes = Vec::new();
                file.source.open()?.read_to_end(&mut bytes)?;
                out.push(PendingEntry::File {
                    name: file.name.clone(),
                    bytes,
                });
            }
        }
    }
    Ok(out)
}

struct FlatEntry {
    name: String,
    is_dir: bool,
    last_in_parent: bool,
    children_start: u32,
    bytes: Option<Vec<u8>>,
}

/// Lays `pending` out breadth-first so every directory's catalog entries
/// precede any of its descendants' file data, and each directory entry's
/// `children_start` is the catalog index its children begin at.
fn flatten(pending: Vec<PendingEntry>) -> Vec<FlatEntry> {
    let mut flat = Vec::new();
    let mut queue: VecDeque<(Option<usize>, Vec<PendingEntry>)> = VecDeque::new();
    queue.push_back((None, pending));

    while let Some((parent_index, siblings)) = queue.pop_front() {
        let start = flat.len();
        if let Some(parent) = parent_index {
            flat[parent].children_start = start as u32;
        }

        let count = siblings.len();
        for (i, entry) in siblings.into_iter().enumerate() {
            let last_in_parent = i + 1 == count;
            match entry {
                PendingEntry::Directory { name, children } => {
                    let index = flat.len();
                    let empty = children.is_empty();
                    flat.push(FlatEntry {
                        name,
                        is_dir: true,
                        last_in_parent,
                        // Resolved below once the final catalog length is
                        // known: an empty directory's offset must point
                        // past the end of the catalog, not at whatever
                        // entry happens to be queued next.
                        children_start: if empty { u32::MAX } else { 0 },
                        bytes: None,
                    });
                    if !empty {
                        queue.push_back((Some(index), children));
                    }
                }
                PendingEntry::File { name, bytes } => {
                    flat.push(FlatEntry {
                        name,
                        is_dir: false,
                        last_in_parent,
                        children_start: 0,
                        bytes: Some(bytes),
                    });
                }
            }
        }
    }

    let total = flat.len() as u32;
    for entry in &mut flat {
        if entry.is_dir && entry.children_start == u32::MAX {
            entry.children_start = total;
        }
    }

    flat
}

/// Serializes `root` as a disk container in the given dialect.
pub fn write<W: Write>(
    writer: &mut W,
    root: &Directory,
    dialect: DiskDialect,
    timestamp: DateTime<Utc>,
) -> Result<()> {
    let pending = collect_pending(root)?;
    let flat = flatten(pending);

    let catalog_bytes = flat.len() * CATALOG_ENTRY_LEN;
    let data_start = HEADER_LEN + catalog_bytes;

    let mut data_offsets = Vec::with_capacity(flat.len());
    let mut cursor = data_start as u32;
    for entry in &flat {
        if let Some(bytes) = &entry.bytes {
            data_offsets.push(cursor);
            cursor = cursor.saturating_add(bytes.len() as u32);
        } else {
            data_offsets.push(0);
        }
    }
    let total_size = cursor;
    let file_count = flat.iter().filter(|e| !e.is_dir).count() as u32;

    writer.write_bytes(&[0u8; COMMENT_LEN])?;
    writer.write_bytes(dialect.as_bytes())?;
    writer.write_u32(flat.len() as u32)?;
    writer.write_u32(file_count)?;
    writer.write_u32(datetime_to_dos(timestamp))?;
    writer.write_u32(total_size)?;
    writer.write_u32(HEADER_LEN as u32)?;
    writer.write_u32(REQUIRED_VERSION)?;
    writer.write_u32(REQUIRED_ALIGNMENT)?;

    for (entry, &data_offset) in flat.iter().zip(data_offsets.iter()) {
        writer.write_fixed_string(&entry.name, NAME_LEN)?;
        let offset = if entry.is_dir {
            entry.children_start
        } else {
            data_offset
        };
        writer.write_u32(offset)?;
        writer.write_u32(entry.bytes.as_ref().map(|b| b.len() as u32).unwrap_or(0))?;
        let mut type_bits = 0u32;
        if entry.is_dir {
            type_bits |= ENTRY_TYPE_DIRECTORY;
        }
        if entry.last_in_parent {
            type_bits |= ENTRY_TYPE_LAST;
        }
        writer.write_u32(type_bits)?;
        writer.write_u32(0)?; // attributes, ignored
    }

    for entry in &flat {
        if let Some(bytes) = &entry.bytes {
            writer.write_bytes(bytes)?;
        }
    }

    Ok(())
}
