use std::io::Cursor;

use pretty_assertions::assert_eq;

use zen_archive::{ArchiveReader, BinaryReader, BinaryWriter, Game};
use zen_vob::{Container, Item, VirtualObjectBase};

/// Outside a save game, a container's embedded `oCItem` list is neither
/// written nor read at all.
#[test]
fn container_round_trips_without_items_outside_save_games() {
    let container = Container {
        base: VirtualObjectBase::default(),
        locked: true,
        key_instance: "ITKE_LOCKPICK".to_string(),
        pick_lock: "".to_string(),
        contents: "ITMI_GOLD:10".to_string(),
        items: Vec::new(),
    };

    let mut writer = BinaryWriter::new(Cursor::new(Vec::<u8>::new()));
    container.save(&mut writer, Game::G2, false).unwrap();
    let buf = writer.finish().into_inner();

    let mut reader = BinaryReader::new(Cursor::new(buf));
    let loaded = Container::load(&mut reader, VirtualObjectBase::default(), Game::G2, false).unwrap();

    assert!(loaded.locked);
    assert_eq!(loaded.key_instance, "ITKE_LOCKPICK");
    assert_eq!(loaded.contents, "ITMI_GOLD:10");
    assert!(loaded.items.is_empty());
}

/// In a save game, each embedded `oCItem:zCVob` is written as a nested
/// object with its own `VirtualObject` base and reads back in the same
/// order with matching instance/amount/flags.
#[test]
fn container_round_trips_embedded_items_in_save_games() {
    let container = Container {
        base: VirtualObjectBase::default(),
        locked: false,
        key_instance: "".to_string(),
        pick_lock: "".to_string(),
        contents: "".to_string(),
        items: vec![
            Item {
                index: 0,
                base: VirtualObjectBase::default(),
                instance: "ITMI_GOLD".to_string(),
                amount: Some(50),
                flags: Some(0),
            },
            Item {
                index: 0,
                base: VirtualObjectBase::default(),
                instance: "ITFO_APPLE".to_string(),
                amount: Some(1),
                flags: Some(1),
            },
        ],
    };

    let mut writer = BinaryWriter::new(Cursor::new(Vec::<u8>::new()));
    container.save(&mut writer, Game::G1, true).unwrap();
    let buf = writer.finish().into_inner();

    let mut reader = BinaryReader::new(Cursor::new(buf));
    let loaded = Container::load(&mut reader, VirtualObjectBase::default(), Game::G1, true).unwrap();

    assert_eq!(loaded.items.len(), 2);
    assert_eq!(loaded.items[0].instance, "ITMI_GOLD");
    assert_eq!(loaded.items[0].amount, Some(50));
    assert_eq!(loaded.items[1].instance, "ITFO_APPLE");
    assert_eq!(loaded.items[1].flags, Some(1));
}
