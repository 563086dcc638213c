//! `zCCSCamera`: a scripted cutscene camera trajectory, and the
//! `zCCamTrj_KeyFrame` nested objects that make up its path.

use std::io::Cursor;

use zen_archive::{ArchiveReader, ArchiveWriter, Game};
use zen_stream::{Mat4, ReadExt, WriteExt};

use crate::base::VirtualObjectBase;
use crate::error::{Error, Result};

const RESOURCE: &str = "zen-vob::camera";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraLoopMode {
    #[default]
    None,
    Restart,
    PingPong,
}

impl CameraLoopMode {
    fn from_enum(v: u32) -> Self {
        match v {
            1 => Self::Restart,
            2 => Self::PingPong,
            _ => Self::None,
        }
    }
    fn to_enum(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Restart => 1,
            Self::PingPong => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraLerpType {
    #[default]
    Undefined,
    Path,
    PathIgnoreRoll,
    PathRotationSamples,
}

impl CameraLerpType {
    fn from_enum(v: u32) -> Self {
        match v {
            1 => Self::Path,
            2 => Self::PathIgnoreRoll,
            3 => Self::PathRotationSamples,
            _ => Self::Undefined,
        }
    }
    fn to_enum(self) -> u32 {
        match self {
            Self::Undefined => 0,
            Self::Path => 1,
            Self::PathIgnoreRoll => 2,
            Self::PathRotationSamples => 3,
        }
    }
}

/// A `zCCamTrj_KeyFrame` sub-object: one point in a cutscene camera's
/// trajectory or target path. A full VOb in its own right (it carries the
/// common `VirtualObject` fields) rather than a plain inline record.
#[derive(Debug, Clone, Default)]
pub struct CameraTrajectoryFrame {
    pub base: VirtualObjectBase,
    pub time: f32,
    pub roll_angle: f32,
    pub fov_scale: f32,
    pub motion_type: u32,
    pub motion_type_fov: u32,
    pub motion_type_roll: u32,
    pub motion_type_time_scale: u32,
    pub tension: f32,
    pub bias: f32,
    pub continuity: f32,
    pub time_scale: f32,
    pub time_fixed: bool,
    pub original_pose: Mat4,
}

impl CameraTrajectoryFrame {
    /// Reads the object header, full `VirtualObject` base and frame fields,
    /// and the terminating `[]` marker. The caller is expected to have
    /// already confirmed the header's class name is
    /// `zCCamTrj_KeyFrame:zCVob`.
    pub fn load(reader: &mut dyn ArchiveReader, id: u32, game: Game, save: bool) -> Result<Self> {
        let base = VirtualObjectBase::load(reader, id, game, save)?;
        let time = reader.read_float()?;
        let roll_angle = reader.read_float()?;
        let fov_scale = reader.read_float()?;
        let motion_type = reader.read_enum()?;
        let motion_type_fov = reader.read_enum()?;
        let motion_type_roll = reader.read_enum()?;
        let motion_type_time_scale = reader.read_enum()?;
        let tension = reader.read_float()?;
        let bias = reader.read_float()?;
        let continuity = reader.read_float()?;
        let time_scale = reader.read_float()?;
        let time_fixed = reader.read_bool()?;

        let raw_pose = reader.read_raw()?;
        let original_pose = Cursor::new(&raw_pose)
            .read_mat4()
            .map_err(|_| Error::parser(RESOURCE, "truncated originalPose matrix".to_string()))?;

        reader.read_object_end()?;

        Ok(Self {
            base,
            time,
            roll_angle,
            fov_scale,
            motion_type,
            motion_type_fov,
            motion_type_roll,
            motion_type_time_scale,
            tension,
            bias,
            continuity,
            time_scale,
            time_fixed,
            original_pose,
        })
    }

    pub fn save(&self, writer: &mut dyn ArchiveWriter, game: Game, save: bool) -> Result<()> {
        writer.write_object_begin("", "zCCamTrj_KeyFrame:zCVob", 0)?;
        self.base.save(writer, game, save)?;
        writer.write_float("time", self.time)?;
        writer.write_float("angleRollDeg", self.roll_angle)?;
        writer.write_float("camFOVScale", self.fov_scale)?;
        writer.write_enum("motionType", self.motion_type)?;
        writer.write_enum("motionTypeFOV", self.motion_type_fov)?;
        writer.write_enum("motionTypeRoll", self.motion_type_roll)?;
        writer.write_enum("motionTypeTimeScale", self.motion_type_time_scale)?;
        writer.write_float("tension", self.tension)?;
        writer.write_float("bias", self.bias)?;
        writer.write_float("continuity", self.continuity)?;
        writer.write_float("timeScale", self.time_scale)?;
        writer.write_bool("timeIsFixed", self.time_fixed)?;

        let mut buf = Cursor::new(Vec::new());
        buf.write_mat4(self.original_pose)?;
        writer.write_raw("originalPose", &buf.into_inner())?;

        writer.write_object_end()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Camera {
    pub base: VirtualObjectBase,
    pub trajectory_for: u32,
    pub target_trajectory_for: u32,
    pub loop_mode: CameraLoopMode,
    pub lerp_mode: CameraLerpType,
    pub ignore_for_vob_rotation: bool,
    pub ignore_for_vob_rotation_target: bool,
    pub adapt_to_surroundings: bool,
    pub ease_to_first_key: bool,
    pub ease_from_last_key: bool,
    pub total_duration: f32,
    pub auto_focus_vob: String,
    pub auto_player_movable: bool,
    pub auto_untrigger_last: bool,
    pub auto_untrigger_last_delay: f32,
    pub trajectory_frames: Vec<CameraTrajectoryFrame>,
    pub target_frames: Vec<CameraTrajectoryFrame>,
    pub paused: Option<bool>,
    pub started: Option<bool>,
    pub goto_time_mode: Option<bool>,
    pub cs_time: Option<f32>,
}

impl Camera {
    pub fn load(reader: &mut dyn ArchiveReader, base: VirtualObjectBase, game: Game, save: bool) -> Result<Self> {
        let trajectory_for = reader.read_enum()?;
        let target_trajectory_for = reader.read_enum()?;
        let loop_mode = CameraLoopMode::from_enum(reader.read_enum()?);
        let lerp_mode = CameraLerpType::from_enum(reader.read_enum()?);
        let ignore_for_vob_rotation = reader.read_bool()?;
        let ignore_for_vob_rotation_target = reader.read_bool()?;
        let adapt_to_surroundings = reader.read_bool()?;
        let ease_to_first_key = reader.read_bool()?;
        let ease_from_last_key = reader.read_bool()?;
        let total_duration = reader.read_float()?;
        let auto_focus_vob = reader.read_string()?;
        let auto_player_movable = reader.read_bool()?;
        let auto_untrigger_last = reader.read_bool()?;
        let auto_untrigger_last_delay = reader.read_float()?;
        let position_count = reader.read_int()?.max(0);
        let target_count = reader.read_int()?.max(0);

        let mut trajectory_frames = Vec::with_capacity(position_count as usize);
        for _ in 0..position_count {
            let header = reader
                .read_object_begin()?
                .ok_or_else(|| Error::parser(RESOURCE, "expected trajectory frame object header".to_string()))?;
            trajectory_frames.push(CameraTrajectoryFrame::load(reader, header.index, game, save)?);
        }

        let mut target_frames = Vec::with_capacity(target_count as usize);
        for _ in 0..target_count {
            let header = reader
                .read_object_begin()?
                .ok_or_else(|| Error::parser(RESOURCE, "expected target frame object header".to_string()))?;
            target_frames.push(CameraTrajectoryFrame::load(reader, header.index, game, save)?);
        }

        let (paused, started, goto_time_mode, cs_time) = if save && game == Game::G2 {
            (
                Some(reader.read_bool()?),
                Some(reader.read_bool()?),
                Some(reader.read_bool()?),
                Some(reader.read_float()?),
            )
        } else {
            (None, None, None, None)
        };

        Ok(Self {
            base,
            trajectory_for,
            target_trajectory_for,
            loop_mode,
            lerp_mode,
            ignore_for_vob_rotation,
            ignore_for_vob_rotation_target,
            adapt_to_surroundings,
            ease_to_first_key,
            ease_from_last_key,
            total_duration,
            auto_focus_vob,
            auto_player_movable,
            auto_untrigger_last,
            auto_untrigger_last_delay,
            trajectory_frames,
            target_frames,
            paused,
            started,
            goto_time_mode,
            cs_time,
        })
    }

    pub fn save(&self, writer: &mut dyn ArchiveWriter, game: Game, save: bool) -> Result<()> {
        writer.write_enum("camTrjFOR", self.trajectory_for)?;
        writer.write_enum("targetTrjFOR", self.target_trajectory_for)?;
        writer.write_enum("loopMode", self.loop_mode.to_enum())?;
        writer.write_enum("splLerpMode", self.lerp_mode.to_enum())?;
        writer.write_bool("ignoreFORVobRotCam", self.ignore_for_vob_rotation)?;
        writer.write_bool("ignoreFORVobRotTarget", self.ignore_for_vob_rotation_target)?;
        writer.write_bool("adaptToSurroundings", self.adapt_to_surroundings)?;
        writer.write_bool("easeToFirstKey", self.ease_to_first_key)?;
        writer.write_bool("easeFromLastKey", self.ease_from_last_key)?;
        writer.write_float("totalTime", self.total_duration)?;
        writer.write_string("autoCamFocusVobName", &self.auto_focus_vob)?;
        writer.write_bool("autoCamPlayerMovable", self.auto_player_movable)?;
        writer.write_bool("autoCamUntriggerOnLastKey", self.auto_untrigger_last)?;
        writer.write_float("autoCamUntriggerOnLastKeyDelay", self.auto_untrigger_last_delay)?;
        writer.write_int("numPos", self.trajectory_frames.len() as i32)?;
        writer.write_int("numTargets", self.target_frames.len() as i32)?;

        for frame in &self.trajectory_frames {
            frame.save(writer, game, save)?;
        }
        for frame in &self.target_frames {
            frame.save(writer, game, save)?;
        }

        if save && game == Game::G2 {
            writer.write_bool("paused", self.paused.unwrap_or(false))?;
            writer.write_bool("started", self.started.unwrap_or(false))?;
            writer.write_bool("gotoTimeMode", self.goto_time_mode.unwrap_or(false))?;
            writer.write_float("csTime", self.cs_time.unwrap_or(0.0))?;
        }
        Ok(())
    }
}
