use std::io::Cursor;

use pretty_assertions::assert_eq;

use zen_archive::{AsciiReader, ArchiveHeader, ArchiveReader, Format};

const SAMPLE: &str = "ZenGin Archive\r\nver 1\r\nzCArchiverGeneric\r\nASCII\r\nsaveGame 0\r\nEND\r\nobjects 1          \r\nEND\r\n\r\n[root zCVob 12289 0]\r\n\tpack=int:0\r\n\tpresetName=string:\r\n\tbbox3DWS=rawFloat:0 0 0 1 1 1\r\n\ttrafoOSToWSRot=raw:000000000000000000000000000000000000000000000000000000000000000000000000\r\n\ttrafoOSToWSPos=rawFloat:0 0 0\r\n\tvobName=string:hello\r\n\tvisual=string:\r\n\tshowVisual=bool:1\r\n\tvisualCamAlign=enum:0\r\n[]\r\n";

/// Scenario (a): parsing the documented single-`zCVob` ASCII archive
/// recovers the header, the object metadata prefix, and every field value
/// in the order they were written.
#[test]
fn ascii_archive_round_trip() {
    let mut cursor = Cursor::new(SAMPLE.as_bytes().to_vec());

    let header = ArchiveHeader::parse(&mut cursor).unwrap();
    assert_eq!(header.version, 1);
    assert_eq!(header.format, Format::Ascii);
    assert!(!header.save);
    assert_eq!(header.archiver, "zCArchiverGeneric");

    let mut reader = AsciiReader::new(cursor).unwrap();
    assert_eq!(reader.declared_object_count(), 1);

    let object = reader.read_object_begin().unwrap().expect("one object");
    assert_eq!(object.object_name, "root");
    assert_eq!(object.class_name, "zCVob");
    assert_eq!(object.version, 12289);
    assert_eq!(object.index, 0);

    assert_eq!(reader.read_int().unwrap(), 0); // pack
    assert_eq!(reader.read_string().unwrap(), ""); // presetName
    assert_eq!(reader.read_raw_float().unwrap(), vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]); // bbox3DWS
    assert_eq!(reader.read_raw().unwrap().len(), 36); // trafoOSToWSRot
    assert_eq!(reader.read_raw_float().unwrap(), vec![0.0, 0.0, 0.0]); // trafoOSToWSPos
    assert_eq!(reader.read_string().unwrap(), "hello"); // vobName
    assert_eq!(reader.read_string().unwrap(), ""); // visual
    assert!(reader.read_bool().unwrap()); // showVisual
    assert_eq!(reader.read_enum().unwrap(), 0); // visualCamAlign

    reader.read_object_end().unwrap();

    // No further objects at this nesting level.
    assert!(reader.read_object_begin().unwrap().is_none());
}

/// `read_object_end` tolerates trailing whitespace before the `[]`
/// end-marker, and skips (with a warning) any entries the caller left
/// unread rather than failing.
#[test]
fn ascii_object_end_skips_unread_trailing_fields() {
    let body = "ZenGin Archive\nver 1\narchiver\nASCII\nsaveGame 0\nEND\nobjects 1\nEND\n\n[o C 1 0]\n\tfoo=int:1\n\tbar=int:2\n[]   \n";
    let mut cursor = Cursor::new(body.as_bytes().to_vec());
    ArchiveHeader::parse(&mut cursor).unwrap();
    let mut reader = AsciiReader::new(cursor).unwrap();

    reader.read_object_begin().unwrap().unwrap();
    // Deliberately don't read "foo" or "bar" before ending the object.
    reader.read_object_end().unwrap();
}
