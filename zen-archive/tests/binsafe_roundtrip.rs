use std::io::Cursor;

use pretty_assertions::assert_eq;

use zen_archive::{ArchiveReader, ArchiveWriter, BinsafeReader, BinsafeWriter};

/// Scenario (b): writing a single `foo=42` INTEGER entry through the
/// BINSAFE back-end must read back as `42`, and the key table emitted by
/// the writer must contain `"foo"` exactly once.
#[test]
fn single_integer_entry_round_trip() {
    let mut writer = BinsafeWriter::new(Cursor::new(Vec::<u8>::new())).unwrap();
    let index = writer.write_object_begin("root", "TestClass", 1).unwrap();
    assert_eq!(index, 0);
    writer.write_int("foo", 42).unwrap();
    writer.write_object_end().unwrap();
    let buf = writer.finish().unwrap().into_inner();

    let mut reader = BinsafeReader::new(Cursor::new(buf)).unwrap();
    assert_eq!(reader.declared_object_count(), 1);

    let object = reader.read_object_begin().unwrap().expect("one object");
    assert_eq!(object.object_name, "root");
    assert_eq!(object.class_name, "TestClass");
    assert_eq!(object.version, 1);
    assert_eq!(object.index, 0);

    assert_eq!(reader.read_int().unwrap(), 42);
    reader.read_object_end().unwrap();

    let keys: Vec<&str> = reader.hash_table().iter().map(String::as_str).collect();
    assert_eq!(keys.iter().filter(|k| **k == "foo").count(), 1);
}

/// Multiple entries sharing the same field name dedupe to a single hash
/// table slot, referenced by table index from every entry that uses it.
#[test]
fn repeated_field_name_shares_one_table_slot() {
    let mut writer = BinsafeWriter::new(Cursor::new(Vec::<u8>::new())).unwrap();
    writer.write_object_begin("a", "C", 1).unwrap();
    writer.write_int("value", 1).unwrap();
    writer.write_object_end().unwrap();
    writer.write_object_begin("b", "C", 1).unwrap();
    writer.write_int("value", 2).unwrap();
    writer.write_object_end().unwrap();
    let buf = writer.finish().unwrap().into_inner();

    let mut reader = BinsafeReader::new(Cursor::new(buf)).unwrap();
    assert_eq!(reader.declared_object_count(), 2);

    reader.read_object_begin().unwrap().unwrap();
    assert_eq!(reader.read_int().unwrap(), 1);
    reader.read_object_end().unwrap();

    reader.read_object_begin().unwrap().unwrap();
    assert_eq!(reader.read_int().unwrap(), 2);
    reader.read_object_end().unwrap();

    let keys: Vec<&str> = reader.hash_table().iter().map(String::as_str).collect();
    assert_eq!(keys.iter().filter(|k| **k == "value").count(), 1);
}

/// A type mismatch between the declared entry tag and what the caller asks
/// for is reported as a typed error rather than silently misreading bytes.
#[test]
fn type_mismatch_is_reported() {
    let mut writer = BinsafeWriter::new(Cursor::new(Vec::<u8>::new())).unwrap();
    writer.write_object_begin("a", "C", 1).unwrap();
    writer.write_string("name", "hello").unwrap();
    writer.write_object_end().unwrap();
    let buf = writer.finish().unwrap().into_inner();

    let mut reader = BinsafeReader::new(Cursor::new(buf)).unwrap();
    reader.read_object_begin().unwrap().unwrap();
    assert!(reader.read_int().is_err());
}
