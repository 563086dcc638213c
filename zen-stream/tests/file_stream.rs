use std::io::Write as _;

use zen_stream::{FileStream, ReadExt, SeekExt, SeekOrigin};

#[test]
fn mmap_backed_stream_reads_and_seeks() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&0xCAFE_BABEu32.to_le_bytes()).unwrap();
    file.write_all(b"Gothic").unwrap();
    file.flush().unwrap();

    let mut stream = FileStream::open(file.path()).unwrap();
    assert_eq!(stream.len().unwrap(), 10);
    assert_eq!(stream.read_u32().unwrap(), 0xCAFE_BABE);
    assert_eq!(stream.read_fixed_string(6).unwrap(), "Gothic");

    stream.seek32(0, SeekOrigin::Begin).unwrap();
    assert_eq!(stream.tell().unwrap(), 0);
    assert_eq!(stream.read_u32().unwrap(), 0xCAFE_BABE);
}

#[test]
fn empty_file_reports_empty() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let stream = FileStream::open(file.path()).unwrap();
    assert!(stream.is_empty().unwrap());
}
