use tracing::warn;
use zen_stream::{Color, Vec3};

use crate::entry::EntryType;
use crate::error::Result;
use crate::object::{ArchiveObject, ABSENT_CLASS, BACK_REFERENCE_CLASS};
use crate::registry::{ObjectCache, ObjectRegistry};

/// Object-safe read protocol shared by the ASCII, BINARY and BINSAFE
/// back-ends. Entries are read positionally/sequentially: callers (the VOb
/// loaders) know the expected field order and type from their own schema.
pub trait ArchiveReader {
    fn read_string(&mut self) -> Result<String>;
    fn read_int(&mut self) -> Result<i32>;
    fn read_float(&mut self) -> Result<f32>;
    fn read_byte(&mut self) -> Result<u8>;
    fn read_word(&mut self) -> Result<u16>;
    fn read_enum(&mut self) -> Result<u32>;
    fn read_bool(&mut self) -> Result<bool>;
    fn read_color(&mut self) -> Result<Color>;
    fn read_vec3(&mut self) -> Result<Vec3>;
    fn read_raw(&mut self) -> Result<Vec<u8>>;
    fn read_raw_float(&mut self) -> Result<Vec<f32>>;

    /// Skips one entry of the given type without the caller needing to know
    /// its field name.
    fn skip_entry(&mut self, ty: EntryType) -> Result<()>;

    /// Attempts to read the next object's metadata prefix. Returns `Ok(None)`
    /// (after rewinding) if no more objects remain at this nesting level.
    fn read_object_begin(&mut self) -> Result<Option<ArchiveObject>>;

    /// Consumes the object's terminating marker, skipping any entries the
    /// caller left unread (logged as a warning).
    fn read_object_end(&mut self) -> Result<()>;

    /// Skips a whole object subtree using begin/end events. If
    /// `include_current` is set, the current object's own remaining entries
    /// and terminator are consumed too; otherwise only nested child objects
    /// already encountered are skipped.
    fn skip_object(&mut self, include_current: bool) -> Result<()>;
}

/// Object-safe write protocol mirroring [`ArchiveReader`].
pub trait ArchiveWriter {
    fn write_string(&mut self, name: &str, value: &str) -> Result<()>;
    fn write_int(&mut self, name: &str, value: i32) -> Result<()>;
    fn write_float(&mut self, name: &str, value: f32) -> Result<()>;
    fn write_byte(&mut self, name: &str, value: u8) -> Result<()>;
    fn write_word(&mut self, name: &str, value: u16) -> Result<()>;
    fn write_enum(&mut self, name: &str, value: u32) -> Result<()>;
    fn write_bool(&mut self, name: &str, value: bool) -> Result<()>;
    fn write_color(&mut self, name: &str, value: Color) -> Result<()>;
    fn write_vec3(&mut self, name: &str, value: Vec3) -> Result<()>;
    fn write_raw(&mut self, name: &str, value: &[u8]) -> Result<()>;
    fn write_raw_float(&mut self, name: &str, value: &[f32]) -> Result<()>;

    /// Begins an object, assigning it a fresh index, and returns that index.
    fn write_object_begin(&mut self, object_name: &str, class_name: &str, version: u16)
        -> Result<u32>;
    fn write_object_end(&mut self) -> Result<()>;

    /// Writes a `"§"` back reference to a previously written object.
    fn write_ref(&mut self, object_name: &str, index: u32) -> Result<()>;
}

/// Outcome of attempting to read the next object header, with back
/// references and absent slots already resolved against `cache`.
pub enum ObjectOutcome<T> {
    NoMoreObjects,
    Absent,
    BackReference(T),
    UnknownClass,
    New {
        object: T,
        object_name: String,
        version: u16,
        index: u32,
    },
}

/// Reads the next object header and resolves back references / absent
/// slots / unknown class names against `registry` and `cache`.
///
/// For the [`ObjectOutcome::New`] case, the caller is responsible for
/// loading the object's fields (and any children), inserting it into
/// `cache` under `index`, and then calling
/// [`ArchiveReader::read_object_end`] — in that order, so that sibling
/// objects loaded later can back-reference it only once it is fully
/// populated.
pub fn begin_object<T: Clone>(
    reader: &mut dyn ArchiveReader,
    registry: &ObjectRegistry<T>,
    cache: &ObjectCache<T>,
) -> Result<ObjectOutcome<T>> {
    let header = match reader.read_object_begin()? {
        Some(header) => header,
        None => return Ok(ObjectOutcome::NoMoreObjects),
    };

    if header.class_name == BACK_REFERENCE_CLASS {
        reader.skip_object(true)?;
        return Ok(match cache.get(header.index) {
            Some(object) => ObjectOutcome::BackReference(object),
            None => {
                warn!(index = header.index, "back reference to unknown object index");
                ObjectOutcome::Absent
            }
        });
    }

    if header.class_name == ABSENT_CLASS {
        reader.skip_object(true)?;
        return Ok(ObjectOutcome::Absent);
    }

    match registry.construct(&header.class_name) {
        Some(object) => Ok(ObjectOutcome::New {
            object,
            object_name: header.object_name,
            version: header.version,
            index: header.index,
        }),
        None => {
            warn!(class = %header.class_name, "unknown archive class name, skipping subtree");
            reader.skip_object(true)?;
            Ok(ObjectOutcome::UnknownClass)
        }
    }
}
