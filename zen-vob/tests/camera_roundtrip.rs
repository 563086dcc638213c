use std::io::Cursor;

use pretty_assertions::assert_eq;

use zen_archive::{ArchiveReader, ArchiveWriter, BinaryReader, BinaryWriter, Game};
use zen_stream::Mat4;
use zen_vob::{Camera, CameraLerpType, CameraLoopMode, CameraTrajectoryFrame, VirtualObjectBase};

fn sample_frame(time: f32) -> CameraTrajectoryFrame {
    CameraTrajectoryFrame {
        base: VirtualObjectBase::default(),
        time,
        roll_angle: 0.0,
        fov_scale: 1.0,
        motion_type: 0,
        motion_type_fov: 0,
        motion_type_roll: 0,
        motion_type_time_scale: 0,
        tension: 0.0,
        bias: 0.0,
        continuity: 0.0,
        time_scale: 1.0,
        time_fixed: false,
        original_pose: Mat4::IDENTITY,
    }
}

/// A cutscene camera's trajectory and target keyframe lists round-trip as
/// nested `zCCamTrj_KeyFrame` objects, with the `numPos`/`numTargets`
/// counts driving how many the reader expects back.
#[test]
fn camera_round_trips_trajectory_and_target_frames() {
    let camera = Camera {
        base: VirtualObjectBase::default(),
        trajectory_for: 0,
        target_trajectory_for: 0,
        loop_mode: CameraLoopMode::PingPong,
        lerp_mode: CameraLerpType::Path,
        ignore_for_vob_rotation: false,
        ignore_for_vob_rotation_target: false,
        adapt_to_surroundings: true,
        ease_to_first_key: true,
        ease_from_last_key: false,
        total_duration: 10.0,
        auto_focus_vob: "HERO".to_string(),
        auto_player_movable: false,
        auto_untrigger_last: true,
        auto_untrigger_last_delay: 0.5,
        trajectory_frames: vec![sample_frame(0.0), sample_frame(5.0)],
        target_frames: vec![sample_frame(0.0)],
        paused: None,
        started: None,
        goto_time_mode: None,
        cs_time: None,
    };

    let mut writer = BinaryWriter::new(Cursor::new(Vec::<u8>::new()));
    camera.save(&mut writer, Game::G1, false).unwrap();
    let buf = writer.finish().into_inner();

    let mut reader = BinaryReader::new(Cursor::new(buf));
    let loaded = Camera::load(&mut reader, VirtualObjectBase::default(), Game::G1, false).unwrap();

    assert_eq!(loaded.loop_mode, CameraLoopMode::PingPong);
    assert_eq!(loaded.lerp_mode, CameraLerpType::Path);
    assert_eq!(loaded.auto_focus_vob, "HERO");
    assert_eq!(loaded.trajectory_frames.len(), 2);
    assert_eq!(loaded.trajectory_frames[1].time, 5.0);
    assert_eq!(loaded.target_frames.len(), 1);
}

/// In a G2 save game, the camera carries an extra paused/started/
/// goto-time-mode/cs-time tail that a non-save-game or G1 archive omits.
#[test]
fn camera_save_game_g2_tail_round_trips() {
    let camera = Camera {
        paused: Some(true),
        started: Some(false),
        goto_time_mode: Some(true),
        cs_time: Some(3.5),
        ..Default::default()
    };

    let mut writer = BinaryWriter::new(Cursor::new(Vec::<u8>::new()));
    camera.save(&mut writer, Game::G2, true).unwrap();
    let buf = writer.finish().into_inner();

    let mut reader = BinaryReader::new(Cursor::new(buf));
    let loaded = Camera::load(&mut reader, VirtualObjectBase::default(), Game::G2, true).unwrap();

    assert_eq!(loaded.paused, Some(true));
    assert_eq!(loaded.started, Some(false));
    assert_eq!(loaded.goto_time_mode, Some(true));
    assert_eq!(loaded.cs_time, Some(3.5));
}

/// A single trajectory keyframe's fields, including its raw `originalPose`
/// matrix, survive an independent round trip.
#[test]
fn trajectory_frame_round_trips_original_pose() {
    let frame = CameraTrajectoryFrame {
        time: 1.25,
        roll_angle: 15.0,
        ..sample_frame(1.25)
    };

    let mut writer = BinaryWriter::new(Cursor::new(Vec::<u8>::new()));
    frame.save(&mut writer, Game::G1, false).unwrap();
    writer.write_object_begin("next", "C", 0).unwrap();
    writer.write_object_end().unwrap();
    let buf = writer.finish().into_inner();

    let mut reader = BinaryReader::new(Cursor::new(buf));
    let header = reader.read_object_begin().unwrap().unwrap();
    let loaded = CameraTrajectoryFrame::load(&mut reader, header.index, Game::G1, false).unwrap();
    assert_eq!(loaded.roll_angle, 15.0);
    assert_eq!(loaded.original_pose, Mat4::IDENTITY);

    let next = reader.read_object_begin().unwrap().unwrap();
    assert_eq!(next.object_name, "next");
}
