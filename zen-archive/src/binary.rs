//! The BINARY back-end: a compact, untagged, length-prefixed dialect.
//!
//! Entries carry no field name and no type tag on the wire — the caller
//! (the VOb loader) must read them in exactly the order they were written,
//! which is why [`ArchiveReader::skip_entry`] and
//! [`ArchiveWriter`]'s sibling calls take an explicit [`EntryType`]. Each
//! object's payload is preceded by a 32-bit byte length so a reader that
//! can't or won't construct the object can skip its whole subtree (nested
//! children included) in one seek, without walking begin/end markers.

use std::io::{Read, Seek, SeekFrom, Write};

use tracing::{debug, warn};
use zen_stream::{Color, ReadExt, SeekExt, SeekOrigin, Vec3, WriteExt};

use crate::entry::EntryType;
use crate::error::{Error, Result};
use crate::object::ArchiveObject;
use crate::traits::{ArchiveReader, ArchiveWriter};

const RESOURCE: &str = "ReadArchive.Binary";

/// Reads a BINARY-dialect archive body (the common header must already have
/// been consumed via [`crate::header::ArchiveHeader::parse`]).
pub struct BinaryReader<R> {
    stream: R,
    /// Absolute end-of-payload offset for each currently open object, so
    /// `read_object_end`/`skip_object` can jump straight to it rather than
    /// walking entries.
    object_ends: Vec<u32>,
}

impl<R: Read + Seek> BinaryReader<R> {
    pub fn new(stream: R) -> Self {
        Self {
            stream,
            object_ends: Vec::new(),
        }
    }

    fn skip_bytes(&mut self, len: u32) -> Result<()> {
        self.stream.seek32(len as i32, SeekOrigin::Current)?;
        Ok(())
    }
}

impl<R: Read + Seek> ArchiveReader for BinaryReader<R> {
    fn read_string(&mut self) -> Result<String> {
        Ok(self.stream.read_cstring()?)
    }

    fn read_int(&mut self) -> Result<i32> {
        Ok(self.stream.read_i32()?)
    }

    fn read_float(&mut self) -> Result<f32> {
        Ok(self.stream.read_f32()?)
    }

    fn read_byte(&mut self) -> Result<u8> {
        Ok(self.stream.read_u8()?)
    }

    fn read_word(&mut self) -> Result<u16> {
        Ok(self.stream.read_u16()?)
    }

    fn read_enum(&mut self) -> Result<u32> {
        Ok(self.stream.read_u32()?)
    }

    fn read_bool(&mut self) -> Result<bool> {
        Ok(self.stream.read_u8()? != 0)
    }

    fn read_color(&mut self) -> Result<Color> {
        Ok(self.stream.read_color()?)
    }

    fn read_vec3(&mut self) -> Result<Vec3> {
        Ok(self.stream.read_vec3()?)
    }

    fn read_raw(&mut self) -> Result<Vec<u8>> {
        let len = self.stream.read_u32()?;
        Ok(self.stream.read_bytes(len as usize)?)
    }

    fn read_raw_float(&mut self) -> Result<Vec<f32>> {
        let count = self.stream.read_u32()?;
        (0..count).map(|_| Ok(self.stream.read_f32()?)).collect()
    }

    fn skip_entry(&mut self, ty: EntryType) -> Result<()> {
        match ty {
            EntryType::String => {
                let _ = self.stream.read_cstring()?;
            }
            EntryType::Int | EntryType::Float | EntryType::Enum | EntryType::Color => {
                self.skip_bytes(4)?;
            }
            EntryType::Byte => self.skip_bytes(1)?,
            EntryType::Word => self.skip_bytes(2)?,
            EntryType::Bool => self.skip_bytes(1)?,
            EntryType::Vec3 => self.skip_bytes(12)?,
            EntryType::Raw => {
                let len = self.stream.read_u32()?;
                self.skip_bytes(len)?;
            }
            EntryType::RawFloat => {
                let count = self.stream.read_u32()?;
                self.skip_bytes(count * 4)?;
            }
            EntryType::Hash => {
                return Err(Error::parser(RESOURCE, "Hash entries do not exist in BINARY"));
            }
        }
        Ok(())
    }

    fn read_object_begin(&mut self) -> Result<Option<ArchiveObject>> {
        let pos = self.stream.tell()?;
        let object_name = match self.stream.read_cstring() {
            Ok(name) => name,
            Err(_) => {
                self.stream.seek32(pos as i32, SeekOrigin::Begin)?;
                return Ok(None);
            }
        };
        let class_name = self.stream.read_cstring()?;
        let version = self.stream.read_u16()?;
        let index = self.stream.read_u32()?;
        let payload_len = self.stream.read_u32()?;
        let payload_start = self.stream.tell()?;
        self.object_ends.push(payload_start + payload_len);
        debug!(%object_name, %class_name, index, "read binary object begin");
        Ok(Some(ArchiveObject {
            object_name,
            class_name,
            version,
            index,
        }))
    }

    fn read_object_end(&mut self) -> Result<()> {
        let end = self.object_ends.pop().ok_or_else(|| {
            Error::parser(RESOURCE, "read_object_end called without a matching begin")
        })?;
        let pos = self.stream.tell()?;
        if pos < end {
            warn!(unread_bytes = end - pos, "unread trailing fields before object end, skipping");
        } else if pos > end {
            return Err(Error::parser(RESOURCE, "object payload overrun"));
        }
        self.stream.seek32(end as i32, SeekOrigin::Begin)?;
        Ok(())
    }

    fn skip_object(&mut self, include_current: bool) -> Result<()> {
        if include_current {
            let end = self.object_ends.pop().ok_or_else(|| {
                Error::parser(RESOURCE, "skip_object called without a matching begin")
            })?;
            self.stream.seek32(end as i32, SeekOrigin::Begin)?;
        }
        Ok(())
    }
}

/// Writes a BINARY-dialect archive body.
pub struct BinaryWriter<W> {
    stream: W,
    next_index: u32,
    /// Stack of `(size_field_pos)` for each currently open object.
    size_fields: Vec<u32>,
}

impl<W: Write + Seek> BinaryWriter<W> {
    pub fn new(stream: W) -> Self {
        Self {
            stream,
            next_index: 0,
            size_fields: Vec::new(),
        }
    }

    pub fn finish(self) -> W {
        self.stream
    }
}

impl<W: Write + Seek> ArchiveWriter for BinaryWriter<W> {
    fn write_string(&mut self, _name: &str, value: &str) -> Result<()> {
        Ok(self.stream.write_cstring(value)?)
    }

    fn write_int(&mut self, _name: &str, value: i32) -> Result<()> {
        Ok(self.stream.write_i32(value)?)
    }

    fn write_float(&mut self, _name: &str, value: f32) -> Result<()> {
        Ok(self.stream.write_f32(value)?)
    }

    fn write_byte(&mut self, _name: &str, value: u8) -> Result<()> {
        Ok(self.stream.write_u8(value)?)
    }

    fn write_word(&mut self, _name: &str, value: u16) -> Result<()> {
        Ok(self.stream.write_u16(value)?)
    }

    fn write_enum(&mut self, _name: &str, value: u32) -> Result<()> {
        Ok(self.stream.write_u32(value)?)
    }

    fn write_bool(&mut self, _name: &str, value: bool) -> Result<()> {
        Ok(self.stream.write_u8(u8::from(value))?)
    }

    fn write_color(&mut self, _name: &str, value: Color) -> Result<()> {
        Ok(self.stream.write_color(value)?)
    }

    fn write_vec3(&mut self, _name: &str, value: Vec3) -> Result<()> {
        Ok(self.stream.write_vec3(value)?)
    }

    fn write_raw(&mut self, _name: &str, value: &[u8]) -> Result<()> {
        self.stream.write_u32(value.len() as u32)?;
        Ok(self.stream.write_bytes(value)?)
    }

    fn write_raw_float(&mut self, _name: &str, value: &[f32]) -> Result<()> {
        self.stream.write_u32(value.len() as u32)?;
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
        self.stream.write_cstring(object_name)?;
        self.stream.write_cstring(class_name)?;
        self.stream.write_u16(version)?;
        self.stream.write_u32(index)?;
        let size_field_pos = self.stream.tell()?;
        self.stream.write_u32(0)?;
        self.size_fields.push(size_field_pos);
        Ok(index)
    }

    fn write_object_end(&mut self) -> Result<()> {
        let size_field_pos = self.size_fields.pop().ok_or_else(|| {
            Error::parser(RESOURCE, "write_object_end called without a matching begin")
        })?;
        let end_pos = self.stream.tell()?;
        let payload_len = end_pos - (size_field_pos + 4);
        self.stream.seek(SeekFrom::Start(u64::from(size_field_pos)))?;
        self.stream.write_u32(payload_len)?;
        self.stream.seek(SeekFrom::Start(u64::from(end_pos)))?;
        Ok(())
    }

    fn write_ref(&mut self, object_name: &str, index: u32) -> Result<()> {
        self.stream.write_cstring(object_name)?;
        self.stream
            .write_cstring(crate::object::BACK_REFERENCE_CLASS)?;
        self.stream.write_u16(0)?;
        self.stream.write_u32(index)?;
        self.stream.write_u32(0)?;
        Ok(())
    }
}
