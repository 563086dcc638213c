use std::io::Cursor;

use pretty_assertions::assert_eq;

use zen_archive::{BinaryReader, BinaryWriter, Game};
use zen_stream::{Aabb, Vec3};
use zen_vob::{AnimationType, ShadowType, SpriteAlignment, Visual, VisualDecal, VisualType, VirtualObjectBase};

/// The common `VirtualObject` fields round-trip through the writer's
/// packed encoding in G1: bbox/position/rotation, the bit-packed flags,
/// and a nested `zCDecal` visual sub-object.
#[test]
fn base_round_trips_in_gothic_1_with_decal_visual() {
    let base = VirtualObjectBase {
        id: 42,
        bbox: Aabb {
            min: Vec3::new(-1.0, -1.0, -1.0),
            max: Vec3::new(1.0, 1.0, 1.0),
        },
        position: Vec3::new(10.0, 20.0, 30.0),
        vob_name: "MYVOB".to_string(),
        show_visual: true,
        sprite_align: SpriteAlignment::Full,
        cd_static: true,
        cd_dynamic: false,
        vob_static: true,
        dynamic_shadows: ShadowType::Blob,
        physics_enabled: false,
        visual: Some(Visual {
            class_name: "zCDecal".to_string(),
            visual_type: VisualType::Decal,
            decal: Some(VisualDecal {
                name: "OCAM".to_string(),
                dim_x: 1.0,
                dim_y: 1.0,
                two_sided: true,
                ..Default::default()
            }),
        }),
        ..Default::default()
    };

    let mut writer = BinaryWriter::new(Cursor::new(Vec::<u8>::new()));
    base.save(&mut writer, Game::G1, false).unwrap();
    let buf = writer.finish().into_inner();

    let mut reader = BinaryReader::new(Cursor::new(buf));
    let loaded = VirtualObjectBase::load(&mut reader, 42, Game::G1, false).unwrap();

    assert_eq!(loaded.vob_name, "MYVOB");
    assert!(loaded.show_visual);
    assert_eq!(loaded.sprite_align, SpriteAlignment::Full);
    assert!(loaded.cd_static);
    assert!(loaded.vob_static);
    assert_eq!(loaded.dynamic_shadows, ShadowType::Blob);
    assert_eq!(loaded.position, Vec3::new(10.0, 20.0, 30.0));

    let visual = loaded.visual.expect("decal visual present");
    assert_eq!(visual.visual_type, VisualType::Decal);
    let decal = visual.decal.expect("decal payload present");
    assert_eq!(decal.name, "OCAM");
    assert!(decal.two_sided);
}

/// The G2 packed encoding carries the extra `animStrength`/`farClipScale`
/// floats and the wider `AnimationType`/ambient/bias bitfield.
#[test]
fn base_round_trips_in_gothic_2_extra_fields() {
    let base = VirtualObjectBase {
        anim_mode: AnimationType::Wind,
        bias: 5,
        ambient: true,
        anim_strength: 0.75,
        far_clip_scale: 2.0,
        ..Default::default()
    };

    let mut writer = BinaryWriter::new(Cursor::new(Vec::<u8>::new()));
    base.save(&mut writer, Game::G2, false).unwrap();
    let buf = writer.finish().into_inner();

    let mut reader = BinaryReader::new(Cursor::new(buf));
    let loaded = VirtualObjectBase::load(&mut reader, 0, Game::G2, false).unwrap();

    assert_eq!(loaded.anim_mode, AnimationType::Wind);
    assert_eq!(loaded.bias, 5);
    assert!(loaded.ambient);
    assert_eq!(loaded.anim_strength, 0.75);
    assert_eq!(loaded.far_clip_scale, 2.0);
}

/// Save-game-only trailer fields (`sleepMode`/`nextOnTimer`) round-trip
/// when `save` is set, and are absent otherwise.
#[test]
fn base_round_trips_save_game_trailer() {
    let base = VirtualObjectBase {
        sleep_mode: Some(2),
        next_on_timer: Some(12.5),
        ..Default::default()
    };

    let mut writer = BinaryWriter::new(Cursor::new(Vec::<u8>::new()));
    base.save(&mut writer, Game::G1, true).unwrap();
    let buf = writer.finish().into_inner();

    let mut reader = BinaryReader::new(Cursor::new(buf));
    let loaded = VirtualObjectBase::load(&mut reader, 0, Game::G1, true).unwrap();

    assert_eq!(loaded.sleep_mode, Some(2));
    assert_eq!(loaded.next_on_timer, Some(12.5));
}
