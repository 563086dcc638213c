use std::io::Cursor;

use pretty_assertions::assert_eq;

use zen_archive::{ArchiveReader, ArchiveWriter, BinaryReader, BinaryWriter};

/// BINARY entries carry no field name or type tag, so the reader must
/// replay the exact write order; the length-prefixed payload lets an
/// uninterested caller skip a whole object (including nested children)
/// in one seek.
#[test]
fn binary_round_trip_preserves_field_order() {
    let mut writer = BinaryWriter::new(Cursor::new(Vec::<u8>::new()));
    writer.write_object_begin("root", "C", 3).unwrap();
    writer.write_int("a", 7).unwrap();
    writer.write_string("b", "hi").unwrap();
    writer.write_float("c", 1.5).unwrap();
    writer.write_object_begin("child", "C", 3).unwrap();
    writer.write_int("a", 9).unwrap();
    writer.write_object_end().unwrap();
    writer.write_object_end().unwrap();
    let buf = writer.finish().into_inner();

    let mut reader = BinaryReader::new(Cursor::new(buf));
    let root = reader.read_object_begin().unwrap().unwrap();
    assert_eq!(root.object_name, "root");
    assert_eq!(root.version, 3);
    assert_eq!(reader.read_int().unwrap(), 7);
    assert_eq!(reader.read_string().unwrap(), "hi");
    assert_eq!(reader.read_float().unwrap(), 1.5);

    let child = reader.read_object_begin().unwrap().unwrap();
    assert_eq!(child.object_name, "child");
    assert_eq!(reader.read_int().unwrap(), 9);
    reader.read_object_end().unwrap();
    reader.read_object_end().unwrap();

    assert!(reader.read_object_begin().unwrap().is_none());
}

/// A reader uninterested in an object's fields can skip its payload
/// (children included) in one jump using the length prefix, landing
/// exactly on the next sibling.
#[test]
fn binary_skip_object_jumps_over_nested_children() {
    let mut writer = BinaryWriter::new(Cursor::new(Vec::<u8>::new()));
    writer.write_object_begin("skip-me", "C", 1).unwrap();
    writer.write_int("a", 1).unwrap();
    writer.write_object_begin("nested", "C", 1).unwrap();
    writer.write_int("b", 2).unwrap();
    writer.write_object_end().unwrap();
    writer.write_object_end().unwrap();
    writer.write_object_begin("sibling", "C", 1).unwrap();
    writer.write_object_end().unwrap();
    let buf = writer.finish().into_inner();

    let mut reader = BinaryReader::new(Cursor::new(buf));
    reader.read_object_begin().unwrap().unwrap();
    reader.skip_object(true).unwrap();

    let sibling = reader.read_object_begin().unwrap().unwrap();
    assert_eq!(sibling.object_name, "sibling");
}
