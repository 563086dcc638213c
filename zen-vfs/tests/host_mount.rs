use zen_vfs::{OverwritePolicy, Vfs};

#[test]
fn mount_host_skips_empty_files_and_preserves_tree_shape() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("textures")).unwrap();
    std::fs::write(dir.path().join("textures/wall.tga"), b"pixels").unwrap();
    std::fs::write(dir.path().join("textures/empty.tga"), b"").unwrap();

    let mut vfs = Vfs::new();
    vfs.mount_host(dir.path(), "", OverwritePolicy::All).unwrap();

    assert!(vfs.resolve("textures/wall.tga").is_some());
    assert!(vfs.resolve("textures/empty.tga").is_none());
    assert!(vfs.resolve("Textures/Wall.TGA").is_some());
}

#[test]
fn mount_host_at_nested_mount_point() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), b"hi").unwrap();

    let mut vfs = Vfs::new();
    vfs.mount_host(dir.path(), "mods/patch1", OverwritePolicy::All)
        .unwrap();

    assert!(vfs.resolve("mods/patch1/a.txt").is_some());
}
