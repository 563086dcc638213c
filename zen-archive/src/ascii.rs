//! The ASCII back-end: a human-readable, line-oriented dialect.

use std::io::{Read, Seek, Write};

use tracing::{debug, warn};
use zen_stream::{Color, ReadExt, SeekExt, SeekOrigin, Vec3, WriteExt};

use crate::entry::EntryType;
use crate::error::{Error, Result};
use crate::header::ArchiveHeader;
use crate::object::ArchiveObject;
use crate::traits::{ArchiveReader, ArchiveWriter};

const RESOURCE: &str = "ReadArchive.Ascii";

fn parse_begin_line(line: &str) -> Option<(String, String, u16, u32)> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?;
    let mut parts = inner.splitn(4, ' ');
    let object_name = parts.next()?.to_string();
    let class_name = parts.next()?.to_string();
    let version: u16 = parts.next()?.trim().parse().ok()?;
    let index: u32 = parts.next()?.trim().parse().ok()?;
    Some((object_name, class_name, version, index))
}

fn parse_entry_line(line: &str) -> Option<(&str, EntryType, &str)> {
    let (name, rest) = line.split_once('=')?;
    let (type_str, value) = rest.split_once(':')?;
    let ty = EntryType::from_ascii_keyword(type_str)?;
    Some((name, ty, value))
}

/// Reads an ASCII-dialect archive body (the header must already have been
/// consumed via [`ArchiveHeader::parse`]).
pub struct AsciiReader<R> {
    stream: R,
    declared_object_count: u32,
}

impl<R: Read + Seek> AsciiReader<R> {
    /// Consumes the ASCII-specific preamble (`objects N` then `END`) that
    /// follows the common archive header.
    pub fn new(mut stream: R) -> Result<Self> {
        let objects_line = stream.read_line(true)?;
        let count: u32 = objects_line
            .strip_prefix("objects ")
            .and_then(|v| v.trim().parse().ok())
            .ok_or_else(|| {
                Error::parser(RESOURCE, format!("expected 'objects N', found {objects_line:?}"))
            })?;
        let end_line = stream.read_line(true)?;
        if end_line != "END" {
            return Err(Error::parser(RESOURCE, format!("expected END, found {end_line:?}")));
        }
        debug!(declared_object_count = count, "ASCII preamble parsed");
        Ok(Self {
            stream,
            declared_object_count: count,
        })
    }

    pub fn declared_object_count(&self) -> u32 {
        self.declared_object_count
    }

    fn read_typed_entry(&mut self, expected: EntryType) -> Result<String> {
        let pos = self.stream.tell()?;
        let line = self.stream.read_line(true)?;
        let Some((_name, ty, value)) = parse_entry_line(&line) else {
            self.stream.seek32(pos as i32, SeekOrigin::Begin)?;
            return Err(Error::parser(RESOURCE, format!("expected an entry line, found {line:?}")));
        };
        if ty != expected {
            return Err(Error::EntryTypeMismatch {
                resource: RESOURCE,
                expected,
                found: ty,
            });
        }
        Ok(value.to_string())
    }
}

impl<R: Read + Seek> ArchiveReader for AsciiReader<R> {
    fn read_string(&mut self) -> Result<String> {
        self.read_typed_entry(EntryType::String)
    }

    fn read_int(&mut self) -> Result<i32> {
        let value = self.read_typed_entry(EntryType::Int)?;
        value
            .trim()
            .parse()
            .map_err(|_| Error::parser(RESOURCE, format!("invalid int {value:?}")))
    }

    fn read_float(&mut self) -> Result<f32> {
        let value = self.read_typed_entry(EntryType::Float)?;
        value
            .trim()
            .parse()
            .map_err(|_| Error::parser(RESOURCE, format!("invalid float {value:?}")))
    }

    fn read_byte(&mut self) -> Result<u8> {
        let value = self.read_typed_entry(EntryType::Byte)?;
        value
            .trim()
            .parse()
            .map_err(|_| Error::parser(RESOURCE, format!("invalid byte {value:?}")))
    }

    fn read_word(&mut self) -> Result<u16> {
        let value = self.read_typed_entry(EntryType::Word)?;
        value
            .trim()
            .parse()
            .map_err(|_| Error::parser(RESOURCE, format!("invalid word {value:?}")))
    }

    fn read_enum(&mut self) -> Result<u32> {
        let value = self.read_typed_entry(EntryType::Enum)?;
        value
            .trim()
            .parse()
            .map_err(|_| Error::parser(RESOURCE, format!("invalid enum {value:?}")))
    }

    fn read_bool(&mut self) -> Result<bool> {
        let value = self.read_typed_entry(EntryType::Bool)?;
        Ok(value.trim() != "0")
    }

    fn read_color(&mut self) -> Result<Color> {
        let value = self.read_typed_entry(EntryType::Color)?;
        let mut parts = value.split_whitespace();
        let mut next = || -> Result<u8> {
            parts
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or_else(|| Error::parser(RESOURCE, "malformed color entry"))
        };
        Ok(Color::new(next()?, next()?, next()?, next()?))
    }

    fn read_vec3(&mut self) -> Result<Vec3> {
        let value = self.read_typed_entry(EntryType::Vec3)?;
        let mut parts = value.split_whitespace();
        let mut next = || -> Result<f32> {
            parts
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or_else(|| Error::parser(RESOURCE, "malformed vec3 entry"))
        };
        Ok(Vec3::new(next()?, next()?, next()?))
    }

    fn read_raw(&mut self) -> Result<Vec<u8>> {
        let value = self.read_typed_entry(EntryType::Raw)?;
        hex::decode(value.trim()).map_err(|e| Error::parser(RESOURCE, format!("malformed raw hex: {e}")))
    }

    fn read_raw_float(&mut self) -> Result<Vec<f32>> {
        let value = self.read_typed_entry(EntryType::RawFloat)?;
        value
            .split_whitespace()
            .map(|p| {
                p.parse()
                    .map_err(|_| Error::parser(RESOURCE, format!("invalid float in rawFloat: {p:?}")))
            })
            .collect()
    }

    fn skip_entry(&mut self, _ty: EntryType) -> Result<()> {
        let line = self.stream.read_line(true)?;
        if parse_entry_line(&line).is_none() {
            return Err(Error::parser(RESOURCE, format!("expected an entry line to skip, found {line:?}")));
        }
        Ok(())
    }

    fn read_object_begin(&mut self) -> Result<Option<ArchiveObject>> {
        let pos = self.stream.tell()?;
        let line = self.stream.read_line(true)?;
        match parse_begin_line(&line) {
            Some((object_name, class_name, version, index)) => Ok(Some(ArchiveObject {
                object_name,
                class_name,
                version,
                index,
            })),
            None => {
                self.stream.seek32(pos as i32, SeekOrigin::Begin)?;
                Ok(None)
            }
        }
    }

    fn read_object_end(&mut self) -> Result<()> {
        loop {
            let pos = self.stream.tell()?;
            let line = self.stream.read_line(true)?;
            if line == "[]" {
                return Ok(());
            }
            if parse_entry_line(&line).is_some() {
                warn!(%line, "unread trailing entry before object end, skipping");
                continue;
            }
            self.stream.seek32(pos as i32, SeekOrigin::Begin)?;
            return Err(Error::parser(RESOURCE, format!("expected object end '[]', found {line:?}")));
        }
    }

    fn skip_object(&mut self, include_current: bool) -> Result<()> {
        if include_current {
            loop {
                let line = self.stream.read_line(true)?;
                if line == "[]" {
                    return Ok(());
                }
                if parse_begin_line(&line).is_some() {
                    self.skip_object(true)?;
                }
            }
        } else {
            // Only nested children already begun need skipping; the
            // current object's own terminator is left for the caller.
            Ok(())
        }
    }
}

/// Writes an ASCII-dialect archive body.
pub struct AsciiWriter<W> {
    stream: W,
    count_field_pos: u64,
    object_count: u32,
    next_index: u32,
    depth: usize,
}

impl<W: Write + Seek> AsciiWriter<W> {
    /// Writes the ASCII-specific preamble that follows the common archive
    /// header, reserving space for the object count to be patched in by
    /// [`Self::finish`].
    pub fn new(mut stream: W) -> Result<Self> {
        write!(stream, "objects ")?;
        let count_field_pos = stream.stream_position()?;
        writeln!(stream, "{:<10}", 0)?;
        writeln!(stream, "END")?;
        writeln!(stream)?;
        Ok(Self {
            stream,
            count_field_pos,
            object_count: 0,
            next_index: 0,
            depth: 0,
        })
    }

    fn write_indent(&mut self) -> Result<()> {
        for _ in 0..self.depth {
            self.stream.write_bytes(b"\t")?;
        }
        Ok(())
    }

    /// Patches the reserved object-count field with the true count and
    /// returns the underlying stream.
    pub fn finish(mut self) -> Result<W> {
        let end_pos = self.stream.stream_position()?;
        self.stream
            .seek(std::io::SeekFrom::Start(self.count_field_pos))?;
        write!(self.stream, "{:<10}", self.object_count)?;
        self.stream.seek(std::io::SeekFrom::Start(end_pos))?;
        Ok(self.stream)
    }
}

impl<W: Write + Seek> ArchiveWriter for AsciiWriter<W> {
    fn write_string(&mut self, name: &str, value: &str) -> Result<()> {
        self.write_indent()?;
        writeln!(self.stream, "{name}=string:{value}")?;
        Ok(())
    }

    fn write_int(&mut self, name: &str, value: i32) -> Result<()> {
        self.write_indent()?;
        writeln!(self.stream, "{name}=int:{value}")?;
        Ok(())
    }

    fn write_float(&mut self, name: &str, value: f32) -> Result<()> {
        self.write_indent()?;
        writeln!(self.stream, "{name}=float:{value}")?;
        Ok(())
    }

    fn write_byte(&mut self, name: &str, value: u8) -> Result<()> {
        self.write_indent()?;
        writeln!(self.stream, "{name}=byte:{value}")?;
        Ok(())
    }

    fn write_word(&mut self, name: &str, value: u16) -> Result<()> {
        self.write_indent()?;
        writeln!(self.stream, "{name}=word:{value}")?;
        Ok(())
    }

    fn write_enum(&mut self, name: &str, value: u32) -> Result<()> {
        self.write_indent()?;
        writeln!(self.stream, "{name}=enum:{value}")?;
        Ok(())
    }

    fn write_bool(&mut self, name: &str, value: bool) -> Result<()> {
        self.write_indent()?;
        writeln!(self.stream, "{name}=bool:{}", u8::from(value))?;
        Ok(())
    }

    fn write_color(&mut self, name: &str, value: Color) -> Result<()> {
        self.write_indent()?;
        writeln!(
            self.stream,
            "{name}=color:{} {} {} {}",
            value.r, value.g, value.b, value.a
        )?;
        Ok(())
    }

    fn write_vec3(&mut self, name: &str, value: Vec3) -> Result<()> {
        self.write_indent()?;
        writeln!(self.stream, "{name}=vec3:{} {} {}", value.x, value.y, value.z)?;
        Ok(())
    }

    fn write_raw(&mut self, name: &str, value: &[u8]) -> Result<()> {
        self.write_indent()?;
        writeln!(self.stream, "{name}=raw:{}", hex::encode(value))?;
        Ok(())
    }

    fn write_raw_float(&mut self, name: &str, value: &[f32]) -> Result<()> {
        self.write_indent()?;
        let joined = value
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(self.stream, "{name}=rawFloat:{joined}")?;
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
        self.object_count += 1;
        self.write_indent()?;
        writeln!(self.stream, "[{object_name} {class_name} {version} {index}]")?;
        self.depth += 1;
        Ok(index)
    }

    fn write_object_end(&mut self) -> Result<()> {
        self.depth = self.depth.saturating_sub(1);
        self.write_indent()?;
        writeln!(self.stream, "[]")?;
        Ok(())
    }

    fn write_ref(&mut self, object_name: &str, index: u32) -> Result<()> {
        self.write_indent()?;
        writeln!(
            self.stream,
            "[{object_name} {} 0 {index}]",
            crate::object::BACK_REFERENCE_CLASS
        )?;
        self.write_indent()?;
        writeln!(self.stream, "[]")?;
        Ok(())
    }
}

/// Parses just the common header and confirms it names the ASCII format;
/// returns the header for inspection alongside the positioned reader.
pub fn parse_header<R: Read>(reader: &mut R) -> Result<ArchiveHeader> {
    ArchiveHeader::parse(reader)
}
