//! `zCVobSound`: an ambient or triggered 3D sound emitter.

use zen_archive::ArchiveReader;

use crate::base::VirtualObjectBase;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoundMode {
    #[default]
    Loop,
    Once,
    Random,
}

impl SoundMode {
    fn from_enum(v: u32) -> Self {
        match v {
            1 => Self::Once,
            2 => Self::Random,
            _ => Self::Loop,
        }
    }

    fn to_enum(self) -> u32 {
        match self {
            Self::Loop => 0,
            Self::Once => 1,
            Self::Random => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoundVolumeType {
    #[default]
    Spherical,
    Ellipsoidal,
}

impl SoundVolumeType {
    fn from_enum(v: u32) -> Self {
        match v {
            1 => Self::Ellipsoidal,
            _ => Self::Spherical,
        }
    }

    fn to_enum(self) -> u32 {
        match self {
            Self::Spherical => 0,
            Self::Ellipsoidal => 1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Sound {
    pub base: VirtualObjectBase,
    pub volume: f32,
    pub mode: SoundMode,
    pub random_delay_mean: f32,
    pub random_delay_var: f32,
    pub initially_playing: bool,
    pub ambient_3d: bool,
    pub obstruction: bool,
    pub cone_angle: f32,
    pub volume_type: SoundVolumeType,
    pub radius: f32,
    pub sound_name: String,
    pub running: Option<bool>,
    pub allowed_to_run: Option<bool>,
}

impl Sound {
    pub fn load(reader: &mut dyn ArchiveReader, base: VirtualObjectBase, save: bool) -> Result<Self> {
        let volume = reader.read_float()?;
        let mode = SoundMode::from_enum(reader.read_enum()?);
        let random_delay_mean = reader.read_float()?;
        let random_delay_var = reader.read_float()?;
        let initially_playing = reader.read_bool()?;
        let ambient_3d = reader.read_bool()?;
        let obstruction = reader.read_bool()?;
        let cone_angle = reader.read_float()?;
        let volume_type = SoundVolumeType::from_enum(reader.read_enum()?);
        let radius = reader.read_float()?;
        let sound_name = reader.read_string()?;

        let (running, allowed_to_run) = if save {
            (Some(reader.read_bool()?), Some(reader.read_bool()?))
        } else {
            (None, None)
        };

        Ok(Self {
            base,
            volume,
            mode,
            random_delay_mean,
            random_delay_var,
            initially_playing,
            ambient_3d,
            obstruction,
            cone_angle,
            volume_type,
            radius,
            sound_name,
            running,
            allowed_to_run,
        })
    }

    pub fn save(&self, writer: &mut dyn zen_archive::ArchiveWriter, save: bool) -> Result<()> {
        writer.write_float("sndVolume", self.volume)?;
        writer.write_enum("sndMode", self.mode.to_enum())?;
        writer.write_float("sndRandDelay", self.random_delay_mean)?;
        writer.write_float("sndRandDelayVar", self.random_delay_var)?;
        writer.write_bool("sndStartOn", self.initially_playing)?;
        writer.write_bool("sndAmbient3D", self.ambient_3d)?;
        writer.write_bool("sndObstruction", self.obstruction)?;
        writer.write_float("sndConeAngle", self.cone_angle)?;
        writer.write_enum("sndVolType", self.volume_type.to_enum())?;
        writer.write_float("sndRadius", self.radius)?;
        writer.write_string("sndName", &self.sound_name)?;
        if save {
            writer.write_bool("sndIsRunning", self.running.unwrap_or(false))?;
            writer.write_bool("sndAllowedToRun", self.allowed_to_run.unwrap_or(true))?;
        }
        Ok(())
    }
}
