//! Archive header, the three interchangeable back-ends (ASCII, BINARY,
//! BINSAFE), and the object registry/cache that resolves a wire class name
//! to a constructed, deduplicated object graph.
//!
//! Callers open an [`ArchiveHeader`] to detect the back-end, then drive one
//! of [`AsciiReader`]/[`BinaryReader`]/[`BinsafeReader`] (or their writer
//! counterparts) through the shared [`ArchiveReader`]/[`ArchiveWriter`]
//! traits. [`begin_object`] wraps the back-reference/absent/unknown-class
//! resolution that every caller needs around `read_object_begin`.

pub mod ascii;
pub mod binary;
pub mod binsafe;
pub mod entry;
pub mod error;
pub mod header;
pub mod object;
pub mod registry;
pub mod traits;

pub use ascii::{AsciiReader, AsciiWriter};
pub use binary::{BinaryReader, BinaryWriter};
pub use binsafe::{BinsafeReader, BinsafeWriter};
pub use entry::EntryType;
pub use error::{Error, Result};
pub use header::{ArchiveHeader, Format};
pub use object::{ArchiveObject, ABSENT_CLASS, BACK_REFERENCE_CLASS};
pub use registry::{Game, ObjectCache, ObjectRegistry};
pub use traits::{begin_object, ArchiveReader, ArchiveWriter, ObjectOutcome};
