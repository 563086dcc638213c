//! Extension traits adding typed little-endian I/O to any `Read`/`Write`/`Seek`.
//!
//! Mirrors the blanket-impl style used for binary parsing throughout this
//! stack: call `reader.read_u32le()` etc. directly on a `File`, `Cursor`, or
//! memory-mapped byte slice without wrapping it in a bespoke type.

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::error::{Error, Result};
use crate::geom::{Aabb, Color, Mat3, Mat4, Vec3};
use crate::origin::SeekOrigin;

/// Typed reads, little-endian, built on [`std::io::Read`].
pub trait ReadExt: Read {
    fn read_u8(&mut self) -> Result<u8> {
        let mut b = [0u8; 1];
        self.read_exact(&mut b)?;
        Ok(b[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        let mut b = [0u8; 2];
        self.read_exact(&mut b)?;
        Ok(u16::from_le_bytes(b))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut b = [0u8; 4];
        self.read_exact(&mut b)?;
        Ok(u32::from_le_bytes(b))
    }

    fn read_i32(&mut self) -> Result<i32> {
        let mut b = [0u8; 4];
        self.read_exact(&mut b)?;
        Ok(i32::from_le_bytes(b))
    }

    fn read_f32(&mut self) -> Result<f32> {
        let mut b = [0u8; 4];
        self.read_exact(&mut b)?;
        Ok(f32::from_le_bytes(b))
    }

    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Reads exactly `len` bytes and decodes them as (lossy) UTF-8, trimming
    /// trailing NUL padding. Used for length-prefixed string fields whose
    /// length has already been read from a preceding field.
    fn read_fixed_string(&mut self, len: usize) -> Result<String> {
        let buf = self.read_bytes(len)?;
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
    }

    /// Reads bytes until a NUL terminator (exclusive) or returns an I/O error
    /// if the stream ends first.
    fn read_cstring(&mut self) -> Result<String> {
        let mut buf = Vec::new();
        loop {
            let b = self.read_u8()?;
            if b == 0 {
                break;
            }
            buf.push(b);
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Reads a single line up to (and excluding) `\n`, stripping a trailing
    /// `\r`. If `trim` is set, surrounding ASCII whitespace is also removed.
    /// Reaching EOF with a non-empty partial line returns that line instead
    /// of propagating the I/O error (the final line of a file need not end
    /// in a newline).
    fn read_line(&mut self, trim: bool) -> Result<String> {
        let mut buf = Vec::new();
        loop {
            match self.read_u8() {
                Ok(b'\n') => break,
                Ok(b) => buf.push(b),
                Err(Error::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    if buf.is_empty() {
                        return Err(Error::Io(e));
                    }
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        let s = String::from_utf8_lossy(&buf).into_owned();
        Ok(if trim { s.trim().to_string() } else { s })
    }

    fn read_vec3(&mut self) -> Result<Vec3> {
        Ok(Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    /// Row-major 3x3 matrix: nine floats, row by row.
    fn read_mat3(&mut self) -> Result<Mat3> {
        let mut rows = [[0.0f32; 3]; 3];
        for row in &mut rows {
            for v in row.iter_mut() {
                *v = self.read_f32()?;
            }
        }
        Ok(Mat3 { rows })
    }

    /// Row-major 4x4 matrix: sixteen floats, row by row.
    fn read_mat4(&mut self) -> Result<Mat4> {
        let mut rows = [[0.0f32; 4]; 4];
        for row in &mut rows {
            for v in row.iter_mut() {
                *v = self.read_f32()?;
            }
        }
        Ok(Mat4 { rows })
    }

    /// Reads four bytes in RGBA order.
    fn read_color(&mut self) -> Result<Color> {
        let r = self.read_u8()?;
        let g = self.read_u8()?;
        let b = self.read_u8()?;
        let a = self.read_u8()?;
        Ok(Color::new(r, g, b, a))
    }

    fn read_bbox(&mut self) -> Result<Aabb> {
        Ok(Aabb {
            min: self.read_vec3()?,
            max: self.read_vec3()?,
        })
    }
}

impl<R: Read + ?Sized> ReadExt for R {}

/// Typed writes, little-endian, built on [`std::io::Write`].
pub trait WriteExt: Write {
    fn write_u8(&mut self, v: u8) -> Result<()> {
        self.write_all(&[v])?;
        Ok(())
    }

    fn write_u16(&mut self, v: u16) -> Result<()> {
        self.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    fn write_u32(&mut self, v: u32) -> Result<()> {
        self.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    fn write_i32(&mut self, v: i32) -> Result<()> {
        self.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    fn write_f32(&mut self, v: f32) -> Result<()> {
        self.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    fn write_bytes(&mut self, v: &[u8]) -> Result<()> {
        self.write_all(v)?;
        Ok(())
    }

    /// Writes `s` padded or truncated to exactly `len` bytes, NUL-padded.
    fn write_fixed_string(&mut self, s: &str, len: usize) -> Result<()> {
        let mut buf = vec![0u8; len];
        let bytes = s.as_bytes();
        let copy_len = bytes.len().min(len);
        buf[..copy_len].copy_from_slice(&bytes[..copy_len]);
        self.write_bytes(&buf)
    }

    fn write_cstring(&mut self, s: &str) -> Result<()> {
        self.write_bytes(s.as_bytes())?;
        self.write_u8(0)
    }

    fn write_line(&mut self, s: &str) -> Result<()> {
        self.write_bytes(s.as_bytes())?;
        self.write_u8(b'\n')
    }

    fn write_vec3(&mut self, v: Vec3) -> Result<()> {
        self.write_f32(v.x)?;
        self.write_f32(v.y)?;
        self.write_f32(v.z)
    }

    fn write_mat3(&mut self, m: Mat3) -> Result<()> {
        for row in m.rows {
            for v in row {
                self.write_f32(v)?;
            }
        }
        Ok(())
    }

    fn write_mat4(&mut self, m: Mat4) -> Result<()> {
        for row in m.rows {
            for v in row {
                self.write_f32(v)?;
            }
        }
        Ok(())
    }

    fn write_color(&mut self, c: Color) -> Result<()> {
        self.write_u8(c.r)?;
        self.write_u8(c.g)?;
        self.write_u8(c.b)?;
        self.write_u8(c.a)
    }

    fn write_bbox(&mut self, b: Aabb) -> Result<()> {
        self.write_vec3(b.min)?;
        self.write_vec3(b.max)
    }
}

impl<W: Write + ?Sized> WriteExt for W {}

/// 32-bit positioned seeking and position query, built on [`std::io::Seek`].
pub trait SeekExt: Seek {
    fn tell(&mut self) -> Result<u32> {
        Ok(self.stream_position()? as u32)
    }

    fn seek32(&mut self, offset: i32, origin: SeekOrigin) -> Result<u32> {
        let from = match origin {
            SeekOrigin::Begin => SeekFrom::Start(offset as u64),
            SeekOrigin::Current => SeekFrom::Current(i64::from(offset)),
            SeekOrigin::End => SeekFrom::End(i64::from(offset)),
        };
        let pos = self.seek(from).map_err(Error::Io)?;
        Ok(pos as u32)
    }
}

impl<S: Seek + ?Sized> SeekExt for S {}
