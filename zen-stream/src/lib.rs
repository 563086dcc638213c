//! Typed little-endian binary I/O shared by the archive, VFS, VOb and
//! Daedalus crates.
//!
//! Every other crate in this workspace reads and writes bytes through the
//! [`ReadExt`]/[`WriteExt`]/[`SeekExt`] traits defined here rather than
//! through a bespoke stream type — they're blanket-implemented for anything
//! that already implements [`std::io::Read`], [`std::io::Write`] or
//! [`std::io::Seek`], so a `File`, a `Cursor<Vec<u8>>`, or a memory-mapped
//! [`FileStream`] all work the same way.
//!
//! ```no_run
//! use zen_stream::{FileStream, ReadExt};
//!
//! # fn run() -> zen_stream::Result<()> {
//! let mut stream = FileStream::open("GOTHIC.DAT")?;
//! let version = stream.read_u32()?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod ext;
pub mod geom;
pub mod origin;
pub mod source;

pub use error::{Error, Result};
pub use ext::{ReadExt, SeekExt, WriteExt};
pub use geom::{Aabb, Color, Mat3, Mat4, Vec3};
pub use origin::SeekOrigin;
pub use source::{FileStream, MemoryStream};
