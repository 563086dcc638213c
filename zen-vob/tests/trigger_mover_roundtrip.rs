use std::io::Cursor;

use pretty_assertions::assert_eq;

use zen_archive::{BinaryReader, BinaryWriter, Game};
use zen_stream::Vec3;
use zen_vob::{
    Mover, MoverBehavior, MoverKeyframe, MoverLerpMode, MoverSpeedType, OpaqueRef, Trigger, VirtualObjectBase,
};

/// A standalone trigger's fields, including the save-game-only
/// next-triggerable/other-vob/count-remaining/enabled quartet, round-trip
/// through the BINARY back-end.
#[test]
fn trigger_round_trips_with_save_game_fields() {
    let trigger = Trigger {
        base: VirtualObjectBase::default(),
        target_name: "TRAP_01".to_string(),
        flags: 1,
        filter_flags: 2,
        vob_target: "".to_string(),
        max_activation_count: -1,
        retrigger_delay: 0.0,
        damage_threshold: 0.0,
        fire_delay: 0.0,
        next_triggerable: Some(12.0),
        other_vob: None,
        count_remaining: Some(3),
        enabled: Some(true),
    };

    let mut writer = BinaryWriter::new(Cursor::new(Vec::<u8>::new()));
    trigger.save(&mut writer, Game::G2, true).unwrap();
    let buf = writer.finish().into_inner();

    let mut reader = BinaryReader::new(Cursor::new(buf));
    let loaded = Trigger::load(&mut reader, VirtualObjectBase::default(), Game::G2, true).unwrap();

    assert_eq!(loaded.target_name, "TRAP_01");
    assert_eq!(loaded.flags, 1);
    assert_eq!(loaded.max_activation_count, -1);
    assert_eq!(loaded.next_triggerable, Some(12.0));
    assert_eq!(loaded.other_vob, None);
    assert_eq!(loaded.count_remaining, Some(3));
    assert_eq!(loaded.enabled, Some(true));
}

/// When `savedOtherVob` holds a real back-reference (not the absent-class
/// sentinel), it round-trips in between `nextTimeTriggerable` and
/// `numTriggerIsActivated` without disturbing either neighbor.
#[test]
fn trigger_round_trips_saved_other_vob_reference() {
    let trigger = Trigger {
        target_name: "TRAP_02".to_string(),
        next_triggerable: Some(7.5),
        other_vob: Some(OpaqueRef {
            index: 4,
            class_name: "zCVob".to_string(),
        }),
        count_remaining: Some(1),
        enabled: Some(false),
        ..Default::default()
    };

    let mut writer = BinaryWriter::new(Cursor::new(Vec::<u8>::new()));
    trigger.save(&mut writer, Game::G2, true).unwrap();
    let buf = writer.finish().into_inner();

    let mut reader = BinaryReader::new(Cursor::new(buf));
    let loaded = Trigger::load(&mut reader, VirtualObjectBase::default(), Game::G2, true).unwrap();

    assert_eq!(loaded.next_triggerable, Some(7.5));
    assert_eq!(loaded.other_vob.map(|r| r.index), Some(4));
    assert_eq!(loaded.count_remaining, Some(1));
    assert_eq!(loaded.enabled, Some(false));
}

/// A mover's keyframe path (raw position + quaternion floats) and its
/// `zCTrigger` base round-trip together, with `autoRotate` gated on G2.
#[test]
fn mover_round_trips_keyframes_and_trigger_base() {
    let trigger = Trigger {
        target_name: "DOOR_01".to_string(),
        ..Default::default()
    };
    let mover = Mover {
        trigger,
        behavior: MoverBehavior::Loop,
        touch_damage: 0.0,
        stay_open_seconds: 5.0,
        locked: true,
        auto_link: false,
        auto_rotate: Some(true),
        speed: 50.0,
        lerp_mode: MoverLerpMode::Linear,
        speed_type: MoverSpeedType::SlowStartEnd,
        keyframes: vec![
            MoverKeyframe {
                position: Vec3::new(1.0, 2.0, 3.0),
                rotation: [0.0, 0.0, 0.0, 1.0],
            },
            MoverKeyframe {
                position: Vec3::new(4.0, 5.0, 6.0),
                rotation: [0.0, 1.0, 0.0, 0.0],
            },
        ],
        save_state: None,
        sfx_open: "OPEN".to_string(),
        sfx_close: "CLOSE".to_string(),
        sfx_move: "MOVE".to_string(),
        sfx_lock: "LOCK".to_string(),
        sfx_unlock: "UNLOCK".to_string(),
        sfx_use_locked: "LOCKED".to_string(),
    };

    let mut writer = BinaryWriter::new(Cursor::new(Vec::<u8>::new()));
    mover.trigger.save(&mut writer, Game::G2, false).unwrap();
    mover.save(&mut writer, Game::G2, false).unwrap();
    let buf = writer.finish().into_inner();

    let mut reader = BinaryReader::new(Cursor::new(buf));
    let trigger = Trigger::load(&mut reader, VirtualObjectBase::default(), Game::G2, false).unwrap();
    let loaded = Mover::load(&mut reader, trigger, Game::G2, false).unwrap();

    assert_eq!(loaded.trigger.target_name, "DOOR_01");
    assert_eq!(loaded.behavior, MoverBehavior::Loop);
    assert_eq!(loaded.auto_rotate, Some(true));
    assert_eq!(loaded.keyframes.len(), 2);
    assert_eq!(loaded.keyframes[0].position, Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(loaded.keyframes[1].rotation, [0.0, 1.0, 0.0, 0.0]);
    assert_eq!(loaded.sfx_open, "OPEN");
    assert_eq!(loaded.sfx_use_locked, "LOCKED");
}
