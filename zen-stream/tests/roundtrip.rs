use pretty_assertions::assert_eq;
use std::io::Cursor;

use zen_stream::{Aabb, Color, Mat3, Mat4, ReadExt, SeekExt, SeekOrigin, Vec3, WriteExt};

#[test]
fn scalar_roundtrip() {
    let mut buf: Vec<u8> = Vec::new();
    buf.write_u8(0xAB).unwrap();
    buf.write_u16(0x1234).unwrap();
    buf.write_u32(0xDEAD_BEEF).unwrap();
    buf.write_i32(-42).unwrap();
    buf.write_f32(3.5).unwrap();

    let mut cursor = Cursor::new(buf);
    assert_eq!(cursor.read_u8().unwrap(), 0xAB);
    assert_eq!(cursor.read_u16().unwrap(), 0x1234);
    assert_eq!(cursor.read_u32().unwrap(), 0xDEAD_BEEF);
    assert_eq!(cursor.read_i32().unwrap(), -42);
    assert_eq!(cursor.read_f32().unwrap(), 3.5);
}

#[test]
fn fixed_string_trims_nul_padding() {
    let mut buf: Vec<u8> = Vec::new();
    buf.write_fixed_string("Gothic", 16).unwrap();

    let mut cursor = Cursor::new(buf);
    let s = cursor.read_fixed_string(16).unwrap();
    assert_eq!(s, "Gothic");
}

#[test]
fn fixed_string_truncates_when_too_long() {
    let mut buf: Vec<u8> = Vec::new();
    buf.write_fixed_string("ThisStringIsWayTooLong", 4).unwrap();
    assert_eq!(buf.len(), 4);

    let mut cursor = Cursor::new(buf);
    let s = cursor.read_fixed_string(4).unwrap();
    assert_eq!(s, "This");
}

#[test]
fn cstring_roundtrip() {
    let mut buf: Vec<u8> = Vec::new();
    buf.write_cstring("NewWorld.zen").unwrap();
    buf.write_cstring("").unwrap();

    let mut cursor = Cursor::new(buf);
    assert_eq!(cursor.read_cstring().unwrap(), "NewWorld.zen");
    assert_eq!(cursor.read_cstring().unwrap(), "");
}

#[test]
fn cstring_missing_terminator_is_io_error() {
    let mut cursor = Cursor::new(b"no terminator".to_vec());
    assert!(cursor.read_cstring().is_err());
}

#[test]
fn line_strips_crlf_and_trims() {
    let mut cursor = Cursor::new(b"  key=value  \r\nnext\n".to_vec());
    assert_eq!(cursor.read_line(true).unwrap(), "key=value");
    assert_eq!(cursor.read_line(false).unwrap(), "next");
}

#[test]
fn final_line_without_newline_is_returned() {
    let mut cursor = Cursor::new(b"no trailing newline".to_vec());
    assert_eq!(cursor.read_line(false).unwrap(), "no trailing newline");
}

#[test]
fn empty_stream_line_is_io_error() {
    let mut cursor = Cursor::new(Vec::<u8>::new());
    assert!(cursor.read_line(false).is_err());
}

#[test]
fn geometry_roundtrip() {
    let mut buf: Vec<u8> = Vec::new();
    let v = Vec3::new(1.0, 2.0, 3.0);
    let m3 = Mat3::IDENTITY;
    let m4 = Mat4::IDENTITY;
    let c = Color::new(10, 20, 30, 255);
    let bbox = Aabb {
        min: Vec3::ZERO,
        max: v,
    };

    buf.write_vec3(v).unwrap();
    buf.write_mat3(m3).unwrap();
    buf.write_mat4(m4).unwrap();
    buf.write_color(c).unwrap();
    buf.write_bbox(bbox).unwrap();

    let mut cursor = Cursor::new(buf);
    assert_eq!(cursor.read_vec3().unwrap(), v);
    assert_eq!(cursor.read_mat3().unwrap(), m3);
    assert_eq!(cursor.read_mat4().unwrap(), m4);
    assert_eq!(cursor.read_color().unwrap(), c);
    assert_eq!(cursor.read_bbox().unwrap(), bbox);
}

#[test]
fn seek32_from_each_origin() {
    let mut cursor = Cursor::new(vec![0u8; 16]);
    assert_eq!(cursor.seek32(4, SeekOrigin::Begin).unwrap(), 4);
    assert_eq!(cursor.tell().unwrap(), 4);
    assert_eq!(cursor.seek32(2, SeekOrigin::Current).unwrap(), 6);
    assert_eq!(cursor.seek32(-1, SeekOrigin::End).unwrap(), 15);
}
