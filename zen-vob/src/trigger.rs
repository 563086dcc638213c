//! `zCTrigger` and its `zCMover` subclass: world geometry that reacts to
//! player/NPC/item events.

use zen_archive::{ArchiveReader, ArchiveWriter, Game, ABSENT_CLASS};
use zen_stream::Vec3;

use crate::base::{OpaqueRef, VirtualObjectBase};
use crate::error::{Error, Result};

const RESOURCE: &str = "zen-vob::trigger";

#[derive(Debug, Clone, Default)]
pub struct Trigger {
    pub base: VirtualObjectBase,
    pub target_name: String,
    pub flags: u8,
    pub filter_flags: u8,
    pub vob_target: String,
    pub max_activation_count: i32,
    pub retrigger_delay: f32,
    pub damage_threshold: f32,
    pub fire_delay: f32,
    pub next_triggerable: Option<f32>,
    pub other_vob: Option<OpaqueRef>,
    pub count_remaining: Option<i32>,
    pub enabled: Option<bool>,
}

impl Trigger {
    pub fn load(reader: &mut dyn ArchiveReader, base: VirtualObjectBase, game: Game, save: bool) -> Result<Self> {
        let target_name = reader.read_string()?;
        let flags = reader.read_byte()?;
        let filter_flags = reader.read_byte()?;
        let vob_target = reader.read_string()?;
        let max_activation_count = reader.read_int()?;
        let retrigger_delay = reader.read_float()?;
        let damage_threshold = reader.read_float()?;
        let fire_delay = reader.read_float()?;

        let mut this = Self {
            base,
            target_name,
            flags,
            filter_flags,
            vob_target,
            max_activation_count,
            retrigger_delay,
            damage_threshold,
            fire_delay,
            ..Default::default()
        };

        if save {
            this.next_triggerable = Some(reader.read_float()?);
            this.other_vob = read_saved_other_vob(reader)?;
            this.count_remaining = Some(reader.read_int()?);
            if game == Game::G2 {
                this.enabled = Some(reader.read_bool()?);
            }
        }

        Ok(this)
    }

    pub fn save(&self, writer: &mut dyn ArchiveWriter, game: Game, save: bool) -> Result<()> {
        writer.write_string("triggerTarget", &self.target_name)?;
        writer.write_byte("flags", self.flags)?;
        writer.write_byte("filterFlags", self.filter_flags)?;
        writer.write_string("respondToVobName", &self.vob_target)?;
        writer.write_int("numCanBeActivated", self.max_activation_count)?;
        writer.write_float("retriggerWaitSec", self.retrigger_delay)?;
        writer.write_float("damageThreshold", self.damage_threshold)?;
        writer.write_float("fireDelaySec", self.fire_delay)?;

        if save {
            writer.write_float("nextTimeTriggerable", self.next_triggerable.unwrap_or(0.0))?;
            write_saved_other_vob(writer, self.other_vob.as_ref())?;
            writer.write_int("numTriggerIsActivated", self.count_remaining.unwrap_or(0))?;
            if game == Game::G2 {
                writer.write_bool("isEnabled", self.enabled.unwrap_or(true))?;
            }
        }
        Ok(())
    }
}

/// Reads the `savedOtherVob` object nested between `nextTimeTriggerable` and
/// `countCanBeActivated` in a save-game trigger. Almost always absent
/// (`%`); when present it back-references another VOb elsewhere in the
/// tree, same as `npc`'s `carryVob`/`enemy`.
fn read_saved_other_vob(reader: &mut dyn ArchiveReader) -> Result<Option<OpaqueRef>> {
    let header = reader
        .read_object_begin()?
        .ok_or_else(|| Error::parser(RESOURCE, "expected savedOtherVob object header".to_string()))?;
    let class_name = header.class_name.clone();
    let index = header.index;
    reader.skip_object(true)?;
    if class_name == ABSENT_CLASS {
        Ok(None)
    } else {
        Ok(Some(OpaqueRef { index, class_name }))
    }
}

fn write_saved_other_vob(writer: &mut dyn ArchiveWriter, reference: Option<&OpaqueRef>) -> Result<()> {
    match reference {
        Some(reference) => writer.write_ref("savedOtherVob", reference.index)?,
        None => {
            writer.write_object_begin("savedOtherVob", ABSENT_CLASS, 0)?;
            writer.write_object_end()?;
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoverBehavior {
    #[default]
    Toggle,
    TriggerControl,
    OpenTime,
    Loop,
    SingleKeys,
}

impl MoverBehavior {
    fn from_enum(v: u32) -> Self {
        match v {
            1 => Self::TriggerControl,
            2 => Self::OpenTime,
            3 => Self::Loop,
            4 => Self::SingleKeys,
            _ => Self::Toggle,
        }
    }
    fn to_enum(self) -> u32 {
        match self {
            Self::Toggle => 0,
            Self::TriggerControl => 1,
            Self::OpenTime => 2,
            Self::Loop => 3,
            Self::SingleKeys => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoverLerpMode {
    #[default]
    Curve,
    Linear,
}

impl MoverLerpMode {
    fn from_enum(v: u32) -> Self {
        if v == 1 {
            Self::Linear
        } else {
            Self::Curve
        }
    }
    fn to_enum(self) -> u32 {
        match self {
            Self::Curve => 0,
            Self::Linear => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoverSpeedType {
    #[default]
    Constant,
    SlowStartEnd,
    SlowStart,
    SlowEnd,
    SegmentSlowStartEnd,
    SegmentSlowStart,
    SegmentSlowEnd,
}

impl MoverSpeedType {
    fn from_enum(v: u32) -> Self {
        match v {
            1 => Self::SlowStartEnd,
            2 => Self::SlowStart,
            3 => Self::SlowEnd,
            4 => Self::SegmentSlowStartEnd,
            5 => Self::SegmentSlowStart,
            6 => Self::SegmentSlowEnd,
            _ => Self::Constant,
        }
    }
    fn to_enum(self) -> u32 {
        match self {
            Self::Constant => 0,
            Self::SlowStartEnd => 1,
            Self::SlowStart => 2,
            Self::SlowEnd => 3,
            Self::SegmentSlowStartEnd => 4,
            Self::SegmentSlowStart => 5,
            Self::SegmentSlowEnd => 6,
        }
    }
}

/// One keyframe of a mover's motion path: position plus an XYZW quaternion.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoverKeyframe {
    pub position: Vec3,
    pub rotation: [f32; 4],
}

#[derive(Debug, Clone, Default)]
pub struct Mover {
    pub trigger: Trigger,
    pub behavior: MoverBehavior,
    pub touch_damage: f32,
    pub stay_open_seconds: f32,
    pub locked: bool,
    pub auto_link: bool,
    pub auto_rotate: Option<bool>,
    pub speed: f32,
    pub lerp_mode: MoverLerpMode,
    pub speed_type: MoverSpeedType,
    pub keyframes: Vec<MoverKeyframe>,
    pub save_state: Option<[f32; 9]>,
    pub sfx_open: String,
    pub sfx_close: String,
    pub sfx_move: String,
    pub sfx_lock: String,
    pub sfx_unlock: String,
    pub sfx_use_locked: String,
}

impl Mover {
    pub fn load(reader: &mut dyn ArchiveReader, trigger: Trigger, game: Game, save: bool) -> Result<Self> {
        let behavior = MoverBehavior::from_enum(reader.read_enum()?);
        let touch_damage = reader.read_float()?;
        let stay_open_seconds = reader.read_float()?;
        let locked = reader.read_bool()?;
        let auto_link = reader.read_bool()?;
        let auto_rotate = if game == Game::G2 {
            Some(reader.read_bool()?)
        } else {
            None
        };
        let speed = reader.read_float()?;
        let lerp_mode = MoverLerpMode::from_enum(reader.read_enum()?);
        let speed_type = MoverSpeedType::from_enum(reader.read_enum()?);
        let num_keyframes = reader.read_int()?;

        let mut keyframes = Vec::with_capacity(num_keyframes.max(0) as usize);
        for _ in 0..num_keyframes.max(0) {
            let values = reader.read_raw_float()?;
            keyframes.push(MoverKeyframe {
                position: Vec3::new(
                    values.first().copied().unwrap_or(0.0),
                    values.get(1).copied().unwrap_or(0.0),
                    values.get(2).copied().unwrap_or(0.0),
                ),
                rotation: [
                    values.get(3).copied().unwrap_or(0.0),
                    values.get(4).copied().unwrap_or(0.0),
                    values.get(5).copied().unwrap_or(0.0),
                    values.get(6).copied().unwrap_or(1.0),
                ],
            });
        }

        let save_state = if save {
            let mut state = [0.0f32; 9];
            for slot in &mut state {
                *slot = reader.read_float()?;
            }
            Some(state)
        } else {
            None
        };

        let sfx_open = reader.read_string()?;
        let sfx_close = reader.read_string()?;
        let sfx_move = reader.read_string()?;
        let sfx_lock = reader.read_string()?;
        let sfx_unlock = reader.read_string()?;
        let sfx_use_locked = reader.read_string()?;

        Ok(Self {
            trigger,
            behavior,
            touch_damage,
            stay_open_seconds,
            locked,
            auto_link,
            auto_rotate,
            speed,
            lerp_mode,
            speed_type,
            keyframes,
            save_state,
            sfx_open,
            sfx_close,
            sfx_move,
            sfx_lock,
            sfx_unlock,
            sfx_use_locked,
        })
    }

    pub fn save(&self, writer: &mut dyn ArchiveWriter, game: Game, save: bool) -> Result<()> {
        writer.write_enum("moverBehavior", self.behavior.to_enum())?;
        writer.write_float("touchBlockerDamage", self.touch_damage)?;
        writer.write_float("stayOpenTimeSec", self.stay_open_seconds)?;
        writer.write_bool("moverLocked", self.locked)?;
        writer.write_bool("autoLinkEnabled", self.auto_link)?;
        if game == Game::G2 {
            writer.write_bool("autoRotate", self.auto_rotate.unwrap_or(false))?;
        }
        writer.write_float("moveSpeed", self.speed)?;
        writer.write_enum("posLerpType", self.lerp_mode.to_enum())?;
        writer.write_enum("speedType", self.speed_type.to_enum())?;
        writer.write_int("numKeyframes", self.keyframes.len() as i32)?;
        for keyframe in &self.keyframes {
            let values = [
                keyframe.position.x,
                keyframe.position.y,
                keyframe.position.z,
                keyframe.rotation[0],
                keyframe.rotation[1],
                keyframe.rotation[2],
                keyframe.rotation[3],
            ];
            writer.write_raw_float("keyframe", &values)?;
        }
        if save {
            for (i, value) in self.save_state.unwrap_or_default().iter().enumerate() {
                writer.write_float(&format!("moverState{i}"), *value)?;
            }
        }
        writer.write_string("sfxOpenStart", &self.sfx_open)?;
        writer.write_string("sfxCloseStart", &self.sfx_close)?;
        writer.write_string("sfxTransitioning", &self.sfx_move)?;
        writer.write_string("sfxLock", &self.sfx_lock)?;
        writer.write_string("sfxUnlock", &self.sfx_unlock)?;
        writer.write_string("sfxUseLocked", &self.sfx_use_locked)?;
        Ok(())
    }
}
