//! `zCVobLight`: a point/spot light source with optional animated range and
//! color.

use zen_archive::{ArchiveReader, ArchiveWriter, Game};
use zen_stream::Color;

use crate::base::VirtualObjectBase;
use crate::error::Result;

/// One keyframe of a `colorAniList`: either a grayscale value or an RGB
/// triple, matching the mixed textual encoding the engine uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightColorKey {
    Gray(u8),
    Rgb(u8, u8, u8),
}

impl LightColorKey {
    fn parse_token(token: &str) -> Option<Self> {
        if let Some(inner) = token.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
            let mut parts = inner.split_whitespace();
            let r = parts.next()?.parse().ok()?;
            let g = parts.next()?.parse().ok()?;
            let b = parts.next()?.parse().ok()?;
            Some(Self::Rgb(r, g, b))
        } else {
            token.parse().ok().map(Self::Gray)
        }
    }

    fn to_token(self) -> String {
        match self {
            Self::Gray(v) => v.to_string(),
            Self::Rgb(r, g, b) => format!("({r} {g} {b})"),
        }
    }
}

fn parse_color_ani_list(s: &str) -> Vec<LightColorKey> {
    s.split_whitespace()
        .filter_map(LightColorKey::parse_token)
        .collect()
}

fn format_color_ani_list(keys: &[LightColorKey]) -> String {
    keys.iter()
        .map(|k| k.to_token())
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_float_list(s: &str) -> Vec<f32> {
    s.split_whitespace().filter_map(|t| t.parse().ok()).collect()
}

fn format_float_list(values: &[f32]) -> String {
    values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, Default)]
pub struct Light {
    pub base: VirtualObjectBase,
    pub light_type: u32,
    pub range: f32,
    pub color: Color,
    pub cone_angle: f32,
    pub is_static: bool,
    pub on: Option<bool>,
    pub range_ani_scale: Option<Vec<f32>>,
    pub range_ani_fps: Option<f32>,
    pub range_ani_smooth: Option<bool>,
    pub color_ani_list: Option<Vec<LightColorKey>>,
    pub color_ani_fps: Option<f32>,
    pub color_ani_smooth: Option<bool>,
    pub can_move: Option<bool>,
}

impl Light {
    pub fn load(reader: &mut dyn ArchiveReader, base: VirtualObjectBase, game: Game) -> Result<Self> {
        let light_type = reader.read_enum()?;
        let range = reader.read_float()?;
        let color = reader.read_color()?;
        let cone_angle = reader.read_float()?;
        let is_static = reader.read_bool()?;

        let mut this = Self {
            base,
            light_type,
            range,
            color,
            cone_angle,
            is_static,
            ..Default::default()
        };

        if !is_static {
            this.on = Some(reader.read_bool()?);
            this.range_ani_scale = Some(parse_float_list(&reader.read_string()?));
            this.range_ani_fps = Some(reader.read_float()?);
            this.range_ani_smooth = Some(reader.read_bool()?);
            this.color_ani_list = Some(parse_color_ani_list(&reader.read_string()?));
            this.color_ani_fps = Some(reader.read_float()?);
            this.color_ani_smooth = Some(reader.read_bool()?);

            if game == Game::G2 {
                this.can_move = Some(reader.read_bool()?);
            }
        }

        Ok(this)
    }

    pub fn save(&self, writer: &mut dyn ArchiveWriter, game: Game) -> Result<()> {
        writer.write_enum("lightType", self.light_type)?;
        writer.write_float("lightRange", self.range)?;
        writer.write_color("lightColor", self.color)?;
        writer.write_float("lightConeAngle", self.cone_angle)?;
        writer.write_bool("lightStatic", self.is_static)?;

        if !self.is_static {
            writer.write_bool("lightDynOn", self.on.unwrap_or(false))?;
            writer.write_string(
                "lightDynRangeAniScale",
                &format_float_list(self.range_ani_scale.as_deref().unwrap_or_default()),
            )?;
            writer.write_float("lightDynRangeAniFPS", self.range_ani_fps.unwrap_or(0.0))?;
            writer.write_bool("lightDynRangeAniSmooth", self.range_ani_smooth.unwrap_or(false))?;
            writer.write_string(
                "lightDynColorAniList",
                &format_color_ani_list(self.color_ani_list.as_deref().unwrap_or_default()),
            )?;
            writer.write_float("lightDynColorAniFPS", self.color_ani_fps.unwrap_or(0.0))?;
            writer.write_bool("lightDynColorAniSmooth", self.color_ani_smooth.unwrap_or(false))?;

            if game == Game::G2 {
                writer.write_bool("lightCanMove", self.can_move.unwrap_or(true))?;
            }
        }

        Ok(())
    }
}
