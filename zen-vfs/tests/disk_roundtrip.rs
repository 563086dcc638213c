use std::io::Read;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use zen_vfs::{DiskDialect, OverwritePolicy, Vfs};

#[test]
fn mounts_a_saved_disk_container_and_resolves_case_insensitively() {
    let mut source = Vfs::new();
    source.mkdir("TEXTURES").unwrap();
    source
        .mount(
            zen_vfs::VfsNode::File(zen_vfs::FileEntry {
                name: "WALL.TGA".to_string(),
                modified: Utc.with_ymd_and_hms(2001, 6, 1, 0, 0, 0).unwrap(),
                source: zen_vfs::FileSource::Host {
                    path: write_temp_file(b"tga-bytes"),
                },
            }),
            "TEXTURES",
            OverwritePolicy::All,
        )
        .unwrap();

    let mut buf = Vec::new();
    source
        .save(
            &mut buf,
            DiskDialect::Legacy,
            Some(Utc.with_ymd_and_hms(2001, 6, 1, 0, 0, 0).unwrap()),
        )
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let disk_path = dir.path().join("Data.vdf");
    std::fs::write(&disk_path, &buf).unwrap();

    let mut loaded = Vfs::new();
    loaded.mount_disk(&disk_path, OverwritePolicy::None).unwrap();

    let node = loaded.resolve("textures/wall.tga").expect("file resolves");
    let file = node.as_file().expect("is a file");
    let mut contents = Vec::new();
    file.source.open().unwrap().read_to_end(&mut contents).unwrap();
    assert_eq!(contents, b"tga-bytes");

    assert!(loaded.resolve("Textures/Wall.TGA").is_some());
    assert!(loaded.resolve("TEXTURES/WALL.TGA").is_some());
}

#[test]
fn broken_signature_is_rejected() {
    let mut bytes = vec![0u8; 300];
    bytes[256..272].copy_from_slice(b"NOT_A_SIGNATURE\0");
    let err = zen_vfs::disk::parse("bad.vdf", bytes).unwrap_err();
    assert!(matches!(err, zen_vfs::VfsError::BrokenSignature { .. }));
}

fn write_temp_file(bytes: &[u8]) -> std::path::PathBuf {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    use std::io::Write;
    file.write_all(bytes).unwrap();
    file.keep().unwrap().1
}
