use std::io::Cursor;

use pretty_assertions::assert_eq;

use zen_archive::{BinaryReader, BinaryWriter, Game};
use zen_stream::Color;
use zen_vob::{Light, LightColorKey, VirtualObjectBase};

/// A dynamic (non-static) light writes and reads its full animation block,
/// including the mixed gray/RGB `colorAniList` tokens and the G2-only
/// `lightCanMove` flag.
#[test]
fn dynamic_light_round_trips_animation_fields() {
    let light = Light {
        base: VirtualObjectBase::default(),
        light_type: 0,
        range: 300.0,
        color: Color::new(255, 0, 0, 255),
        cone_angle: 0.0,
        is_static: false,
        on: Some(true),
        range_ani_scale: Some(vec![0.5, 1.0, 0.5]),
        range_ani_fps: Some(4.0),
        range_ani_smooth: Some(true),
        color_ani_list: Some(vec![LightColorKey::Gray(128), LightColorKey::Rgb(255, 0, 0)]),
        color_ani_fps: Some(2.0),
        color_ani_smooth: Some(false),
        can_move: Some(false),
    };

    let mut writer = BinaryWriter::new(Cursor::new(Vec::<u8>::new()));
    light.save(&mut writer, Game::G2).unwrap();
    let buf = writer.finish().into_inner();

    let mut reader = BinaryReader::new(Cursor::new(buf));
    let loaded = Light::load(&mut reader, VirtualObjectBase::default(), Game::G2).unwrap();

    assert_eq!(loaded.range_ani_scale, Some(vec![0.5, 1.0, 0.5]));
    assert_eq!(loaded.range_ani_fps, Some(4.0));
    assert_eq!(
        loaded.color_ani_list,
        Some(vec![LightColorKey::Gray(128), LightColorKey::Rgb(255, 0, 0)])
    );
    assert_eq!(loaded.can_move, Some(false));
}

/// A static light skips the whole animation block on both write and read.
#[test]
fn static_light_omits_animation_fields() {
    let light = Light {
        color: Color::new(10, 20, 30, 255),
        range: 100.0,
        is_static: true,
        ..Default::default()
    };

    let mut writer = BinaryWriter::new(Cursor::new(Vec::<u8>::new()));
    light.save(&mut writer, Game::G1).unwrap();
    let buf = writer.finish().into_inner();

    let mut reader = BinaryReader::new(Cursor::new(buf));
    let loaded = Light::load(&mut reader, VirtualObjectBase::default(), Game::G1).unwrap();

    assert_eq!(loaded.color, Color::new(10, 20, 30, 255));
    assert_eq!(loaded.on, None);
    assert_eq!(loaded.range_ani_scale, None);
    assert_eq!(loaded.can_move, None);
}

/// A static G2 light has no `lightCanMove` entry at all: the flag only
/// follows the animation block, which static lights skip entirely.
#[test]
fn static_g2_light_omits_can_move() {
    let light = Light {
        color: Color::new(5, 5, 5, 255),
        range: 50.0,
        is_static: true,
        ..Default::default()
    };

    let mut writer = BinaryWriter::new(Cursor::new(Vec::<u8>::new()));
    light.save(&mut writer, Game::G2).unwrap();
    let buf = writer.finish().into_inner();

    let mut reader = BinaryReader::new(Cursor::new(buf));
    let loaded = Light::load(&mut reader, VirtualObjectBase::default(), Game::G2).unwrap();

    assert_eq!(loaded.can_move, None);
}
