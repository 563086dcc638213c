//! The `visual` sub-object tagged union. Only `zCDecal` carries encoded
//! fields; every other visual class is an empty record distinguished by
//! its archive class name alone.

use zen_archive::{ArchiveReader, ArchiveWriter, Game};

use crate::error::Result;

/// Which concrete visual class backs a VOb's `visual` slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisualType {
    Decal,
    Mesh,
    MultiResolutionMesh,
    ParticleEffect,
    AiCamera,
    Model,
    MorphMesh,
    #[default]
    Unknown,
}

impl VisualType {
    pub fn from_class_name(class_name: &str) -> Self {
        match class_name {
            "zCDecal" => Self::Decal,
            "zCMesh" => Self::Mesh,
            "zCProgMeshProto" => Self::MultiResolutionMesh,
            "zCParticleFX" => Self::ParticleEffect,
            "zCAICamera" => Self::AiCamera,
            "zCModel" => Self::Model,
            "zCMorphMesh" => Self::MorphMesh,
            _ => Self::Unknown,
        }
    }
}

/// A `zCDecal` visual: a flat, alpha-blended texture quad. The only visual
/// class with encoded fields beyond its class name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisualDecal {
    pub name: String,
    pub dim_x: f32,
    pub dim_y: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub two_sided: bool,
    pub alpha_func: u32,
    pub texture_anim_fps: f32,
    pub alpha_weight: Option<u8>,
    pub ignore_daylight: Option<bool>,
}

impl VisualDecal {
    pub fn load(reader: &mut dyn ArchiveReader, game: Game) -> Result<Self> {
        let name = reader.read_string()?;
        let dim_x = reader.read_float()?;
        let dim_y = reader.read_float()?;
        let offset_x = reader.read_float()?;
        let offset_y = reader.read_float()?;
        let two_sided = reader.read_bool()?;
        let alpha_func = reader.read_enum()?;
        let texture_anim_fps = reader.read_float()?;

        let (alpha_weight, ignore_daylight) = if game == Game::G2 {
            (Some(reader.read_byte()?), Some(reader.read_bool()?))
        } else {
            (None, None)
        };

        Ok(Self {
            name,
            dim_x,
            dim_y,
            offset_x,
            offset_y,
            two_sided,
            alpha_func,
            texture_anim_fps,
            alpha_weight,
            ignore_daylight,
        })
    }

    pub fn save(&self, writer: &mut dyn ArchiveWriter, game: Game) -> Result<()> {
        writer.write_string("name", &self.name)?;
        writer.write_float("decalDimX", self.dim_x)?;
        writer.write_float("decalDimY", self.dim_y)?;
        writer.write_float("decalOffsetX", self.offset_x)?;
        writer.write_float("decalOffsetY", self.offset_y)?;
        writer.write_bool("decal2Sided", self.two_sided)?;
        writer.write_enum("decalAlphaFunc", self.alpha_func)?;
        writer.write_float("decalTexAniFPS", self.texture_anim_fps)?;
        if game == Game::G2 {
            writer.write_byte("decalAlphaWeight", self.alpha_weight.unwrap_or(0))?;
            writer.write_bool("ignoreDayLight", self.ignore_daylight.unwrap_or(false))?;
        }
        Ok(())
    }
}

/// A VOb's `visual` sub-object, as nested in the archive right after its
/// common fields. Only `zCDecal`'s fields are modeled; every other visual
/// class is tracked by class name alone so its identity survives a
/// read/write round trip without this core needing its full schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Visual {
    pub class_name: String,
    pub visual_type: VisualType,
    pub decal: Option<VisualDecal>,
}
