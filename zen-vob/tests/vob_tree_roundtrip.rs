use std::collections::HashMap;
use std::io::Cursor;

use pretty_assertions::assert_eq;

use zen_archive::{ArchiveReader, ArchiveWriter, BinaryReader, BinaryWriter, Game};
use zen_vob::{build_registry, read_root_vob, write_vob_tree, Vob, VobNode};

fn sample_tree() -> VobNode {
    let mut root = zen_vob::VirtualObjectBase {
        vob_name: "hello".to_string(),
        show_visual: true,
        ..Default::default()
    };
    root.id = 0;

    let mut light_base = zen_vob::VirtualObjectBase {
        vob_name: "torch".to_string(),
        ..Default::default()
    };
    light_base.id = 1;
    let light = zen_vob::Light {
        base: light_base,
        light_type: 0,
        range: 500.0,
        color: zen_stream::Color::new(255, 200, 100, 255),
        cone_angle: 0.0,
        is_static: true,
        ..Default::default()
    };

    VobNode {
        vob: Vob::Generic(root),
        children: vec![VobNode {
            vob: Vob::Light(light),
            children: Vec::new(),
        }],
    }
}

/// A VOb tree written through the BINARY back-end and read back produces
/// the same logical graph: same names, same field values, same child
/// shape (invariant 1 for the VOb subsystem; scenario (a)'s `vob_name`/
/// `show_visual`/empty-children assertions generalized to a tree).
#[test]
fn vob_tree_round_trips_through_binary_backend() {
    let tree = sample_tree();

    let mut writer = BinaryWriter::new(Cursor::new(Vec::<u8>::new()));
    write_vob_tree(&mut writer, &tree, Game::G1, false).unwrap();
    let buf = writer.finish().into_inner();

    let mut reader = BinaryReader::new(Cursor::new(buf));
    let registry = build_registry();
    let mut cache = HashMap::new();
    let loaded = read_root_vob(&mut reader, &registry, &mut cache, Game::G1, false)
        .unwrap()
        .expect("one root vob");

    match &loaded.vob {
        Vob::Generic(base) => {
            assert_eq!(base.vob_name, "hello");
            assert!(base.show_visual);
            assert_eq!(base.id, 0);
        }
        other => panic!("expected a generic vob, got {other:?}"),
    }
    assert_eq!(loaded.children.len(), 1);

    match &loaded.children[0].vob {
        Vob::Light(light) => {
            assert_eq!(light.base.vob_name, "torch");
            assert_eq!(light.range, 500.0);
            assert!(light.is_static);
            assert_eq!(light.color, zen_stream::Color::new(255, 200, 100, 255));
        }
        other => panic!("expected a light vob, got {other:?}"),
    }
    assert!(loaded.children[0].children.is_empty());
}

/// Every VOb reachable from a loaded world has a distinct `id` (invariant
/// 2's first half); back-reference resolution to a duplicate `"§"` class
/// name is exercised end-to-end via [`zen_archive`]'s own tests.
#[test]
fn sibling_vobs_keep_distinct_ids() {
    let tree = sample_tree();
    let root_id = tree.vob.base().id;
    let child_id = tree.children[0].vob.base().id;
    assert_ne!(root_id, child_id);
}
