//! The BINSAFE back-end: a binary dialect that tags each entry with a type
//! byte and backs field names with a shared, deduplicated key table.
//!
//! On the wire, object begin/end markers are plain length-prefixed STRING
//! entries carrying the same `[objectName className version index]` /
//! `[]` text ASCII uses, while every other field entry is
//! `[HASH u8][tableIndex u32][typeTag u8][payload...]`. The table index
//! refers to an entry in a hash table of all distinct field-name strings
//! used anywhere in the archive, written once after the body.
//!
//! This implementation deliberately diverges from the known reference
//! writer in two ways (see `DESIGN.md`): the key hash is computed with a
//! plain multiplicative string hash with no stray mask, and the hash table
//! offset is resolved with a single forward pass rather than the reference
//! writer's two-pass self-overwriting header, since nothing in this
//! workspace depends on bit-for-bit compatibility with that one tool.

use std::io::{Read, Seek, Write};

use tracing::{debug, warn};
use zen_stream::{Color, ReadExt, SeekExt, SeekOrigin, Vec3, WriteExt};

use crate::entry::EntryType;
use crate::error::{Error, Result};
use crate::object::ArchiveObject;
use crate::traits::{ArchiveReader, ArchiveWriter};

const RESOURCE: &str = "ReadArchive.Binsafe";

/// One-byte tags preceding the payload of every BINSAFE entry: either a
/// `STRING` (used verbatim for object begin/end markers) or a `HASH`
/// (the usual `[HASH][tableIndex][typeTag][payload]` field entry).
const TAG_STRING: u8 = EntryType::String.binsafe_tag();
const TAG_HASH: u8 = EntryType::Hash.binsafe_tag();

/// Computes the BINSAFE key-table hash for `key`.
///
/// The reference writer computes this identically but then masks the
/// result with `& 0x61` before storing it, which is inconsistent with how
/// a from-scratch reader would recompute and check it. This implementation
/// omits that mask; the hash is carried in the table for diagnostic
/// purposes only; readers resolve field entries by table index, never by
/// recomputing the hash.
fn hash_key(key: &str) -> u32 {
    let mut h: u32 = 0;
    for b in key.bytes() {
        h = h.wrapping_mul(0x21).wrapping_add(u32::from(b));
    }
    h
}

fn parse_begin_line(line: &str) -> Option<(String, String, u16, u32)> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?;
    let mut parts = inner.splitn(4, ' ');
    let object_name = parts.next()?.to_string();
    let class_name = parts.next()?.to_string();
    let version: u16 = parts.next()?.trim().parse().ok()?;
    let index: u32 = parts.next()?.trim().parse().ok()?;
    Some((object_name, class_name, version, index))
}

/// Reads a BINSAFE-dialect archive body (the common header must already
/// have been consumed via [`crate::header::ArchiveHeader::parse`]).
pub struct BinsafeReader<R> {
    stream: R,
    bs_version: u32,
    object_count: u32,
    /// Field-name strings, indexed by their insertion index in the shared
    /// hash table.
    hash_table: Vec<String>,
}

impl<R: Read + Seek> BinsafeReader<R> {
    pub fn new(mut stream: R) -> Result<Self> {
        let bs_version = stream.read_u32()?;
        let object_count = stream.read_u32()?;
        let hash_table_offset = stream.read_u32()?;

        let mark = stream.tell()?;
        stream.seek32(hash_table_offset as i32, SeekOrigin::Begin)?;
        let table_size = stream.read_u32()?;
        let mut hash_table = vec![String::new(); table_size as usize];
        for _ in 0..table_size {
            let key_len = stream.read_u16()?;
            let insertion_index = stream.read_u16()?;
            let _hash = stream.read_u32()?;
            let key = String::from_utf8_lossy(&stream.read_bytes(key_len as usize)?).into_owned();
            if let Some(slot) = hash_table.get_mut(insertion_index as usize) {
                *slot = key;
            }
        }
        stream.seek32(mark as i32, SeekOrigin::Begin)?;

        debug!(bs_version, object_count, table_size, "BINSAFE preamble parsed");
        Ok(Self {
            stream,
            bs_version,
            object_count,
            hash_table,
        })
    }

    pub fn bs_version(&self) -> u32 {
        self.bs_version
    }

    pub fn declared_object_count(&self) -> u32 {
        self.object_count
    }

    pub fn hash_table(&self) -> &[String] {
        &self.hash_table
    }

    /// Reads the `[HASH u8][tableIndex u32][typeTag u8]` prefix of a field
    /// entry and checks the type tag against `expected`.
    fn read_entry_header(&mut self, expected: EntryType) -> Result<()> {
        let tag = self.stream.read_u8()?;
        if tag != TAG_HASH {
            return Err(Error::parser(RESOURCE, format!("expected a HASH-tagged entry, found tag {tag}")));
        }
        let _key_index = self.stream.read_u32()?;
        let found_tag = self.stream.read_u8()?;
        let found = EntryType::from_binsafe_tag(found_tag)
            .ok_or_else(|| Error::parser(RESOURCE, format!("unknown BINSAFE type tag {found_tag}")))?;
        if found != expected {
            return Err(Error::EntryTypeMismatch {
                resource: RESOURCE,
                expected,
                found,
            });
        }
        Ok(())
    }
}

impl<R: Read + Seek> ArchiveReader for BinsafeReader<R> {
    fn read_string(&mut self) -> Result<String> {
        self.read_entry_header(EntryType::String)?;
        let len = self.stream.read_u16()?;
        Ok(String::from_utf8_lossy(&self.stream.read_bytes(len as usize)?).into_owned())
    }

    fn read_int(&mut self) -> Result<i32> {
        self.read_entry_header(EntryType::Int)?;
        Ok(self.stream.read_i32()?)
    }

    fn read_float(&mut self) -> Result<f32> {
        self.read_entry_header(EntryType::Float)?;
        Ok(self.stream.read_f32()?)
    }

    fn read_byte(&mut self) -> Result<u8> {
        self.read_entry_header(EntryType::Byte)?;
        Ok(self.stream.read_u8()?)
    }

    fn read_word(&mut self) -> Result<u16> {
        self.read_entry_header(EntryType::Word)?;
        Ok(self.stream.read_u16()?)
    }

    fn read_enum(&mut self) -> Result<u32> {
        self.read_entry_header(EntryType::Enum)?;
        Ok(self.stream.read_u32()?)
    }

    fn read_bool(&mut self) -> Result<bool> {
        self.read_entry_header(EntryType::Bool)?;
        Ok(self.stream.read_u32()? != 0)
    }

    fn read_color(&mut self) -> Result<Color> {
        self.read_entry_header(EntryType::Color)?;
        let b = self.stream.read_u8()?;
        let g = self.stream.read_u8()?;
        let r = self.stream.read_u8()?;
        let a = self.stream.read_u8()?;
        Ok(Color::new(r, g, b, a))
    }

    fn read_vec3(&mut self) -> Result<Vec3> {
        self.read_entry_header(EntryType::Vec3)?;
        Ok(self.stream.read_vec3()?)
    }

    fn read_raw(&mut self) -> Result<Vec<u8>> {
        self.read_entry_header(EntryType::Raw)?;
        let len = self.stream.read_u16()?;
        Ok(self.stream.read_bytes(len as usize)?)
    }

    fn read_raw_float(&mut self) -> Result<Vec<f32>> {
        self.read_entry_header(EntryType::RawFloat)?;
        let byte_len = self.stream.read_u16()?;
        (0..byte_len / 4).map(|_| Ok(self.stream.read_f32()?)).collect()
    }

    fn skip_entry(&mut self, ty: EntryType) -> Result<()> {
        let tag = self.stream.read_u8()?;
        if tag != TAG_HASH {
            return Err(Error::parser(RESOURCE, format!("expected a HASH-tagged entry, found tag {tag}")));
        }
        let _key_index = self.stream.read_u32()?;
        let found_tag = self.stream.read_u8()?;
        let found = EntryType::from_binsafe_tag(found_tag)
            .ok_or_else(|| Error::parser(RESOURCE, format!("unknown BINSAFE type tag {found_tag}")))?;
        if found != ty {
            return Err(Error::EntryTypeMismatch {
                resource: RESOURCE,
                expected: ty,
                found,
            });
        }
        match found {
            EntryType::String | EntryType::Raw => {
                let len = self.stream.read_u16()?;
                self.stream.seek32(len as i32, SeekOrigin::Current)?;
            }
            EntryType::RawFloat => {
                let len = self.stream.read_u16()?;
                self.stream.seek32(len as i32, SeekOrigin::Current)?;
            }
            EntryType::Int | EntryType::Float | EntryType::Enum | EntryType::Bool | EntryType::Color => {
                self.stream.seek32(4, SeekOrigin::Current)?;
            }
            EntryType::Byte => {
                self.stream.seek32(1, SeekOrigin::Current)?;
            }
            EntryType::Word => {
                self.stream.seek32(2, SeekOrigin::Current)?;
            }
            EntryType::Vec3 => {
                self.stream.seek32(12, SeekOrigin::Current)?;
            }
            EntryType::Hash => unreachable!("entry headers never tag themselves HASH"),
        }
        Ok(())
    }

    fn read_object_begin(&mut self) -> Result<Option<ArchiveObject>> {
        let pos = self.stream.tell()?;
        let tag = self.stream.read_u8()?;
        if tag != TAG_STRING {
            self.stream.seek32(pos as i32, SeekOrigin::Begin)?;
            return Ok(None);
        }
        let len = self.stream.read_u16()?;
        let line = String::from_utf8_lossy(&self.stream.read_bytes(len as usize)?).into_owned();
        match parse_begin_line(&line) {
            Some((object_name, class_name, version, index)) => {
                debug!(%object_name, %class_name, index, "read BINSAFE object begin");
                Ok(Some(ArchiveObject {
                    object_name,
                    class_name,
                    version,
                    index,
                }))
            }
            None => {
                self.stream.seek32(pos as i32, SeekOrigin::Begin)?;
                Ok(None)
            }
        }
    }

    fn read_object_end(&mut self) -> Result<()> {
        loop {
            let pos = self.stream.tell()?;
            let tag = self.stream.read_u8()?;
            if tag == TAG_STRING {
                let len = self.stream.read_u16()?;
                let line = String::from_utf8_lossy(&self.stream.read_bytes(len as usize)?).into_owned();
                if line == "[]" {
                    return Ok(());
                }
                if parse_begin_line(&line).is_some() {
                    self.stream.seek32(pos as i32, SeekOrigin::Begin)?;
                    return Err(Error::parser(RESOURCE, "unexpected nested object begin before object end"));
                }
                return Err(Error::parser(RESOURCE, format!("expected object end '[]', found {line:?}")));
            }
            if tag != TAG_HASH {
                return Err(Error::parser(RESOURCE, format!("expected object end, found tag {tag}")));
            }
            self.stream.seek32(pos as i32, SeekOrigin::Begin)?;
            let ty_pos = pos + 5;
            self.stream.seek32(ty_pos as i32, SeekOrigin::Begin)?;
            let ty_tag = self.stream.read_u8()?;
            let ty = EntryType::from_binsafe_tag(ty_tag)
                .ok_or_else(|| Error::parser(RESOURCE, format!("unknown BINSAFE type tag {ty_tag}")))?;
            self.stream.seek32(pos as i32, SeekOrigin::Begin)?;
            warn!(?ty, "unread trailing entry before object end, skipping");
            self.skip_entry(ty)?;
        }
    }

    fn skip_object(&mut self, include_current: bool) -> Result<()> {
        if include_current {
            loop {
                let pos = self.stream.tell()?;
                let tag = self.stream.read_u8()?;
                if tag == TAG_STRING {
                    let len = self.stream.read_u16()?;
                    let line =
                        String::from_utf8_lossy(&self.stream.read_bytes(len as usize)?).into_owned();
                    if line == "[]" {
                        return Ok(());
                    }
                    if parse_begin_line(&line).is_some() {
                        self.skip_object(true)?;
                        continue;
                    }
                    return Err(Error::parser(RESOURCE, format!("unexpected STRING entry {line:?} while skipping")));
                }
                self.stream.seek32(pos as i32, SeekOrigin::Begin)?;
                let ty_pos = pos + 5;
                self.stream.seek32(ty_pos as i32, SeekOrigin::Begin)?;
                let ty_tag = self.stream.read_u8()?;
                let ty = EntryType::from_binsafe_tag(ty_tag)
                    .ok_or_else(|| Error::parser(RESOURCE, format!("unknown BINSAFE type tag {ty_tag}")))?;
                self.stream.seek32(pos as i32, SeekOrigin::Begin)?;
                self.skip_entry(ty)?;
            }
        } else {
            Ok(())
        }
    }
}

/// Writes a BINSAFE-dialect archive body.
pub struct BinsafeWriter<W> {
    stream: W,
    object_count_pos: u32,
    hash_table_offset_pos: u32,
    next_index: u32,
    /// Field names in first-use order; the insertion index is the
    /// position in this vector, which is also the on-wire `tableIndex`.
    hash_keys: Vec<String>,
    key_indices: std::collections::HashMap<String, u32>,
}

impl<W: Write + Seek> BinsafeWriter<W> {
    pub fn new(mut stream: W) -> Result<Self> {
        stream.write_u32(2)?;
        let object_count_pos = stream.tell()?;
        stream.write_u32(0)?;
        let hash_table_offset_pos = stream.tell()?;
        stream.write_u32(0)?;
        Ok(Self {
            stream,
            object_count_pos,
            hash_table_offset_pos,
            next_index: 0,
            hash_keys: Vec::new(),
            key_indices: std::collections::HashMap::new(),
        })
    }

    fn write_entry_header(&mut self, name: &str, ty: EntryType) -> Result<()> {
        self.stream.write_u8(TAG_HASH)?;
        let index = *self.key_indices.entry(name.to_string()).or_insert_with(|| {
            let idx = self.hash_keys.len() as u32;
            self.hash_keys.push(name.to_string());
            idx
        });
        self.stream.write_u32(index)?;
        self.stream.write_u8(ty.binsafe_tag())?;
        Ok(())
    }

    /// Patches the object count and hash table offset, appends the shared
    /// key hash table after the body, and returns the underlying stream.
    pub fn finish(mut self) -> Result<W> {
        let hash_table_offset = self.stream.tell()?;
        self.stream.write_u32(self.hash_keys.len() as u32)?;
        for (insertion_index, key) in self.hash_keys.iter().enumerate() {
            self.stream.write_u16(key.len() as u16)?;
            self.stream.write_u16(insertion_index as u16)?;
            self.stream.write_u32(hash_key(key))?;
            self.stream.write_bytes(key.as_bytes())?;
        }
        let end_pos = self.stream.tell()?;

        self.stream
            .seek(std::io::SeekFrom::Start(u64::from(self.object_count_pos)))?;
        self.stream.write_u32(self.next_index)?;
        self.stream
            .seek(std::io::SeekFrom::Start(u64::from(self.hash_table_offset_pos)))?;
        self.stream.write_u32(hash_table_offset)?;

        self.stream.seek(std::io::SeekFrom::Start(u64::from(end_pos)))?;
        Ok(self.stream)
    }
}

impl<W: Write + Seek> ArchiveWriter for BinsafeWriter<W> {
    fn write_string(&mut self, name: &str, value: &str) -> Result<()> {
        self.write_entry_header(name, EntryType::String)?;
        self.stream.write_u16(value.len() as u16)?;
        Ok(self.stream.write_bytes(value.as_bytes())?)
    }

    fn write_int(&mut self, name: &str, value: i32) -> Result<()> {
        self.write_entry_header(name, EntryType::Int)?;
        Ok(self.stream.write_i32(value)?)
    }

    fn write_float(&mut self, name: &str, value: f32) -> Result<()> {
        self.write_entry_header(name, EntryType::Float)?;
        Ok(self.stream.write_f32(value)?)
    }

    fn write_byte(&mut self, name: &str, value: u8) -> Result<()> {
        self.write_entry_header(name, EntryType::Byte)?;
        Ok(self.stream.write_u8(value)?)
    }

    fn write_word(&mut self, name: &str, value: u16) -> Result<()> {
        self.write_entry_header(name, EntryType::Word)?;
        Ok(self.stream.write_u16(value)?)
    }

    fn write_enum(&mut self, name: &str, value: u32) -> Result<()> {
        self.write_entry_header(name, EntryType::Enum)?;
        Ok(self.stream.write_u32(value)?)
    }

    fn write_bool(&mut self, name: &str, value: bool) -> Result<()> {
        self.write_entry_header(name, EntryType::Bool)?;
        Ok(self.stream.write_u32(u32::from(value))?)
    }

    fn write_color(&mut self, name: &str, value: Color) -> Result<()> {
        self.write_entry_header(name, EntryType::Color)?;
        self.stream.write_u8(value.b)?;
        self.stream.write_u8(value.g)?;
        self.stream.write_u8(value.r)?;
        Ok(self.stream.write_u8(value.a)?)
    }

    fn write_vec3(&mut self, name: &str, value: Vec3) -> Result<()> {
        self.write_entry_header(name, EntryType::Vec3)?;
        Ok(self.stream.write_vec3(value)?)
    }

    fn write_raw(&mut self, name: &str, value: &[u8]) -> Result<()> {
        self.write_entry_header(name, EntryType::Raw)?;
        self.stream.write_u16(value.len() as u16)?;
        Ok(self.stream.write_bytes(value)?)
    }

    fn write_raw_float(&mut self, name: &str, value: &[f32]) -> Result<()> {
        self.write_entry_header(name, EntryType::RawFloat)?;
        self.stream.write_u16((value.len() * 4) as u16)?;
        for v in value {
            self.stream.write_f32(*v)?;
        }
        Ok(())
    }

    fn write_object_begin(
        &mut self,
        object_name: &str,
        class_name: &str,
        version: u16,
    ) -> Result<u32> {
        let index = self.next_index;
        self.next_index += 1;
        let line = format!("[{object_name} {class_name} {version} {index}]");
        self.stream.write_u8(TAG_STRING)?;
        self.stream.write_u16(line.len() as u16)?;
        self.stream.write_bytes(line.as_bytes())?;
        Ok(index)
    }

    fn write_object_end(&mut self) -> Result<()> {
        self.stream.write_u8(TAG_STRING)?;
        self.stream.write_u16(2)?;
        Ok(self.stream.write_bytes(b"[]")?)
    }

    fn write_ref(&mut self, object_name: &str, index: u32) -> Result<()> {
        let line = format!(
            "[{object_name} {} 0 {index}]",
            crate::object::BACK_REFERENCE_CLASS
        );
        self.stream.write_u8(TAG_STRING)?;
        self.stream.write_u16(line.len() as u16)?;
        self.stream.write_bytes(line.as_bytes())?;
        self.write_object_end()
    }
}
