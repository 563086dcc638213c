use std::io::Cursor;

use pretty_assertions::assert_eq;

use zen_archive::{ArchiveReader, BinaryReader, BinaryWriter};
use zen_vob::{Sound, SoundMode, SoundVolumeType, VirtualObjectBase};

/// A sound emitter's fields round-trip positionally through the BINARY
/// back-end, including the save-game-only running/allowed-to-run pair.
#[test]
fn sound_round_trips_with_save_game_fields() {
    let sound = Sound {
        base: VirtualObjectBase::default(),
        volume: 80.0,
        mode: SoundMode::Random,
        random_delay_mean: 2.5,
        random_delay_var: 0.5,
        initially_playing: true,
        ambient_3d: true,
        obstruction: false,
        cone_angle: 0.0,
        volume_type: SoundVolumeType::Ellipsoidal,
        radius: 1500.0,
        sound_name: "FIRE_LOOP".to_string(),
        running: Some(true),
        allowed_to_run: Some(false),
    };

    let mut writer = BinaryWriter::new(Cursor::new(Vec::<u8>::new()));
    sound.save(&mut writer, true).unwrap();
    let buf = writer.finish().into_inner();

    let mut reader = BinaryReader::new(Cursor::new(buf));
    let loaded = Sound::load(&mut reader, VirtualObjectBase::default(), true).unwrap();

    assert_eq!(loaded.volume, sound.volume);
    assert_eq!(loaded.mode, sound.mode);
    assert_eq!(loaded.volume_type, sound.volume_type);
    assert_eq!(loaded.radius, sound.radius);
    assert_eq!(loaded.sound_name, sound.sound_name);
    assert_eq!(loaded.running, Some(true));
    assert_eq!(loaded.allowed_to_run, Some(false));
}

/// Outside a save game, the running/allowed-to-run pair is neither written
/// nor read, so loading such an archive leaves both fields `None`.
#[test]
fn sound_omits_running_fields_outside_save_games() {
    let sound = Sound {
        sound_name: "WIND".to_string(),
        ..Default::default()
    };

    let mut writer = BinaryWriter::new(Cursor::new(Vec::<u8>::new()));
    sound.save(&mut writer, false).unwrap();
    let buf = writer.finish().into_inner();

    let mut reader = BinaryReader::new(Cursor::new(buf));
    let loaded = Sound::load(&mut reader, VirtualObjectBase::default(), false).unwrap();

    assert_eq!(loaded.sound_name, "WIND");
    assert_eq!(loaded.running, None);
    assert_eq!(loaded.allowed_to_run, None);
}
