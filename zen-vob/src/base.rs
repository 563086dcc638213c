//! The common `VirtualObject` fields shared by every concrete VOb class,
//! plus its packed/unpacked on-wire encodings.

use std::io::Cursor;

use zen_archive::{ArchiveReader, ArchiveWriter, Game, ABSENT_CLASS};
use zen_stream::{Aabb, Mat3, ReadExt, Vec3, WriteExt};

use crate::error::{Error, Result};
use crate::visual::{Visual, VisualDecal, VisualType};

const RESOURCE: &str = "VirtualObject";

/// How a VOb's `sprite` visual is billboarded relative to the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpriteAlignment {
    #[default]
    None,
    Yaw,
    Full,
}

impl SpriteAlignment {
    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            1 => Self::Yaw,
            2 => Self::Full,
            _ => Self::None,
        }
    }

    fn to_bits(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Yaw => 1,
            Self::Full => 2,
        }
    }
}

/// Dynamic shadow rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadowType {
    #[default]
    None,
    Blob,
}

impl ShadowType {
    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            1 => Self::Blob,
            _ => Self::None,
        }
    }

    fn to_bits(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Blob => 1,
        }
    }
}

/// G2-only animation playback mode for a VOb's visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationType {
    #[default]
    None,
    Wind,
    WindAlt,
}

impl AnimationType {
    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            1 => Self::Wind,
            2 => Self::WindAlt,
            _ => Self::None,
        }
    }

    fn to_bits(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Wind => 1,
            Self::WindAlt => 2,
        }
    }
}

/// Save-game-only physics state, present when `physics_enabled` and G2.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RigidBody {
    pub velocity: Vec3,
    pub mode: i32,
    pub gravity_enabled: bool,
    pub gravity_scale: f32,
    pub slide_direction: Vec3,
}

impl RigidBody {
    pub fn load(reader: &mut dyn ArchiveReader) -> Result<Self> {
        Ok(Self {
            velocity: reader.read_vec3()?,
            mode: reader.read_int()?,
            gravity_enabled: reader.read_bool()?,
            gravity_scale: reader.read_float()?,
            slide_direction: reader.read_vec3()?,
        })
    }

    pub fn save(&self, writer: &mut dyn ArchiveWriter) -> Result<()> {
        writer.write_vec3("vel", self.velocity)?;
        writer.write_int("mode", self.mode)?;
        writer.write_bool("gravOn", self.gravity_enabled)?;
        writer.write_float("gravScale", self.gravity_scale)?;
        writer.write_vec3("slideDir", self.slide_direction)?;
        Ok(())
    }
}

/// A generic reference to a nested object whose concrete schema is outside
/// this core's scope (AI state machines, event managers): captures enough
/// of the archive metadata to round-trip its identity without modeling its
/// fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueRef {
    pub index: u32,
    pub class_name: String,
}

/// Fields common to every VOb: transform, visibility, collision and
/// shadow flags, and the nested visual/AI/event-manager sub-objects.
#[derive(Debug, Clone, Default)]
pub struct VirtualObjectBase {
    pub id: u32,
    pub bbox: Aabb,
    pub position: Vec3,
    pub rotation: Mat3,
    pub preset_name: String,
    pub vob_name: String,
    pub visual_name: String,
    pub show_visual: bool,
    pub sprite_align: SpriteAlignment,
    pub cd_static: bool,
    pub cd_dynamic: bool,
    pub vob_static: bool,
    pub dynamic_shadows: ShadowType,
    pub anim_mode: AnimationType,
    pub anim_strength: f32,
    pub far_clip_scale: f32,
    pub bias: i32,
    pub ambient: bool,
    pub physics_enabled: bool,
    pub visual: Option<Visual>,
    pub ai: Option<OpaqueRef>,
    pub event_manager: Option<OpaqueRef>,
    pub sleep_mode: Option<u8>,
    pub next_on_timer: Option<f32>,
    pub rigid_body: Option<RigidBody>,
}

impl VirtualObjectBase {
    /// Loads the common fields, choosing packed or unpacked encoding from
    /// the leading `pack` entry, followed by the nested `visual`/`ai`/
    /// `event_manager` sub-objects every VOb carries at this position.
    /// Does not read the `childs0` count or child subtree — callers own
    /// that, since only they know the concrete class's own fields
    /// interleave with them.
    pub fn load(reader: &mut dyn ArchiveReader, id: u32, game: Game, save: bool) -> Result<Self> {
        let mut this = Self {
            id,
            ..Default::default()
        };

        let packed = reader.read_int()? != 0;
        let mut has_visual_object = true;
        let mut has_ai_object = true;
        let mut has_event_manager = false;

        if packed {
            let raw = reader.read_raw()?;
            let expected_len = if game == Game::G1 { 74 } else { 83 };
            if raw.len() < expected_len {
                return Err(Error::parser(
                    RESOURCE,
                    format!("packed VOb blob too short: {} < {expected_len}", raw.len()),
                ));
            }
            let mut cursor = Cursor::new(raw);
            this.bbox = cursor.read_bbox()?;
            this.position = cursor.read_vec3()?;
            this.rotation = cursor.read_mat3()?;

            let bit0 = cursor.read_u8()?;
            let bit1: u16 = if game == Game::G1 {
                u16::from(cursor.read_u8()?)
            } else {
                cursor.read_u16()?
            };

            this.show_visual = bit0 & 0b0000_0001 != 0;
            this.sprite_align = SpriteAlignment::from_bits((bit0 & 0b0000_0110) >> 1);
            this.cd_static = bit0 & 0b0000_1000 != 0;
            this.cd_dynamic = bit0 & 0b0001_0000 != 0;
            this.vob_static = bit0 & 0b0010_0000 != 0;
            this.dynamic_shadows = ShadowType::from_bits((bit0 & 0b1100_0000) >> 6);

            let has_preset_name = bit1 & 0b0000_0000_0000_0001 != 0;
            let has_vob_name = bit1 & 0b0000_0000_0000_0010 != 0;
            let has_visual_name = bit1 & 0b0000_0000_0000_0100 != 0;
            has_visual_object = bit1 & 0b0000_0000_0000_1000 != 0;
            has_ai_object = bit1 & 0b0000_0000_0001_0000 != 0;
            has_event_manager = bit1 & 0b0000_0000_0010_0000 != 0 && save;

            if game == Game::G1 {
                this.physics_enabled = bit1 & 0b0000_0000_1000_0000 != 0;
            } else {
                this.physics_enabled = bit1 & 0b0000_0000_0100_0000 != 0;
                this.anim_mode = AnimationType::from_bits(((bit1 & 0b0000_0001_1000_0000) >> 7) as u8);
                this.bias = i32::from((bit1 & 0b0011_1110_0000_0000) >> 9);
                this.ambient = bit1 & 0b0100_0000_0000_0000 != 0;
                this.anim_strength = cursor.read_f32()?;
                this.far_clip_scale = cursor.read_f32()?;
            }

            if has_preset_name {
                this.preset_name = reader.read_string()?;
            }
            if has_vob_name {
                this.vob_name = reader.read_string()?;
            }
            if has_visual_name {
                this.visual_name = reader.read_string()?;
            }
        } else {
            this.preset_name = reader.read_string()?;
            let bbox = reader.read_raw_float()?;
            if bbox.len() < 6 {
                return Err(Error::parser(
                    RESOURCE,
                    format!("bbox3DWS rawFloat entry too short: {} < 6", bbox.len()),
                ));
            }
            this.bbox.min = Vec3::new(bbox[0], bbox[1], bbox[2]);
            this.bbox.max = Vec3::new(bbox[3], bbox[4], bbox[5]);
            this.rotation = mat3_from_column_major_bytes(&reader.read_raw()?);
            this.position = reader.read_vec3()?;
            this.vob_name = reader.read_string()?;
            this.visual_name = reader.read_string()?;
            this.show_visual = reader.read_bool()?;
            this.sprite_align = SpriteAlignment::from_bits(reader.read_enum()? as u8);

            if game == Game::G1 {
                this.cd_static = reader.read_bool()?;
                this.cd_dynamic = reader.read_bool()?;
                this.vob_static = reader.read_bool()?;
                this.dynamic_shadows = ShadowType::from_bits(reader.read_enum()? as u8);
            } else {
                this.anim_mode = AnimationType::from_bits(reader.read_enum()? as u8);
                this.anim_strength = reader.read_float()?;
                this.far_clip_scale = reader.read_float()?;
                this.cd_static = reader.read_bool()?;
                this.cd_dynamic = reader.read_bool()?;
                this.vob_static = reader.read_bool()?;
                this.dynamic_shadows = ShadowType::from_bits(reader.read_enum()? as u8);
                this.bias = reader.read_int()?;
                this.ambient = reader.read_bool()?;
            }
        }

        this.visual = if has_visual_object {
            load_nested_visual(reader, game)?
        } else {
            None
        };

        this.ai = if has_ai_object {
            load_nested_opaque(reader)?
        } else {
            None
        };

        // Event manager sub-objects' own fields aren't modeled; only
        // their identity is kept, same as `ai`.
        this.event_manager = if has_event_manager {
            load_nested_opaque(reader)?
        } else {
            None
        };

        if save {
            this.sleep_mode = Some(reader.read_byte()?);
            this.next_on_timer = Some(reader.read_float()?);
            if this.physics_enabled && game == Game::G2 {
                this.rigid_body = Some(RigidBody::load(reader)?);
            }
        }

        Ok(this)
    }

    /// Writes the common fields in the packed encoding. The writer always
    /// emits packed form; a single consistent writer form is simpler than
    /// reproducing both encodings a real archive might use.
    pub fn save(&self, writer: &mut dyn ArchiveWriter, game: Game, save: bool) -> Result<()> {
        writer.write_int("pack", 1)?;

        let mut buf = Cursor::new(Vec::new());
        buf.write_bbox(self.bbox)?;
        buf.write_vec3(self.position)?;
        buf.write_mat3(self.rotation)?;

        let mut bit0 = 0u8;
        bit0 |= u8::from(self.show_visual);
        bit0 |= self.sprite_align.to_bits() << 1;
        bit0 |= u8::from(self.cd_static) << 3;
        bit0 |= u8::from(self.cd_dynamic) << 4;
        bit0 |= u8::from(self.vob_static) << 5;
        bit0 |= self.dynamic_shadows.to_bits() << 6;
        buf.write_u8(bit0)?;

        let write_event_manager = save && self.event_manager.is_some();

        let mut bit1: u16 = 0;
        bit1 |= u16::from(!self.preset_name.is_empty());
        bit1 |= u16::from(!self.vob_name.is_empty()) << 1;
        bit1 |= u16::from(!self.visual_name.is_empty()) << 2;
        bit1 |= u16::from(self.visual.is_some()) << 3;
        bit1 |= u16::from(self.ai.is_some()) << 4;
        bit1 |= u16::from(write_event_manager) << 5;

        if game == Game::G1 {
            bit1 |= u16::from(self.physics_enabled) << 7;
            buf.write_u8(bit1 as u8)?;
        } else {
            bit1 |= u16::from(self.physics_enabled && self.rigid_body.is_some()) << 6;
            bit1 |= u16::from(self.anim_mode.to_bits()) << 7;
            bit1 |= ((self.bias as u16) & 0b1_1111) << 9;
            bit1 |= u16::from(self.ambient) << 14;
            buf.write_u16(bit1)?;
            buf.write_f32(self.anim_strength)?;
            buf.write_f32(self.far_clip_scale)?;
        }

        writer.write_raw("dataRaw", &buf.into_inner())?;

        if !self.preset_name.is_empty() {
            writer.write_string("presetName", &self.preset_name)?;
        }
        if !self.vob_name.is_empty() {
            writer.write_string("vobName", &self.vob_name)?;
        }
        if !self.visual_name.is_empty() {
            writer.write_string("visualName", &self.visual_name)?;
        }

        save_nested_visual(writer, &self.visual, game)?;
        save_nested_opaque(writer, self.ai.as_ref())?;
        if write_event_manager {
            save_nested_opaque(writer, self.event_manager.as_ref())?;
        }

        if save {
            writer.write_byte("sleepMode", self.sleep_mode.unwrap_or(0))?;
            writer.write_float("nextOnTimer", self.next_on_timer.unwrap_or(0.0))?;
            if let Some(rigid_body) = &self.rigid_body {
                if self.physics_enabled && game == Game::G2 {
                    rigid_body.save(writer)?;
                }
            }
        }

        Ok(())
    }
}

/// Reads the `visual` sub-object nested right after the common fields.
/// `zCDecal` is the only class with a modeled payload; every other class is
/// tracked by name only and its body is skipped whole.
fn load_nested_visual(reader: &mut dyn ArchiveReader, game: Game) -> Result<Option<Visual>> {
    let header = reader
        .read_object_begin()?
        .ok_or_else(|| Error::parser(RESOURCE, "expected visual sub-object header".to_string()))?;

    if header.is_absent() || header.is_back_reference() {
        reader.skip_object(true)?;
        return Ok(None);
    }

    let visual_type = VisualType::from_class_name(&header.class_name);
    let decal = if visual_type == VisualType::Decal {
        let decal = VisualDecal::load(reader, game)?;
        reader.read_object_end()?;
        Some(decal)
    } else {
        reader.skip_object(true)?;
        None
    };

    Ok(Some(Visual {
        class_name: header.class_name,
        visual_type,
        decal,
    }))
}

fn save_nested_visual(writer: &mut dyn ArchiveWriter, visual: &Option<Visual>, game: Game) -> Result<()> {
    match visual {
        Some(visual) => {
            writer.write_object_begin("", &visual.class_name, 0)?;
            if let Some(decal) = &visual.decal {
                decal.save(writer, game)?;
            }
            writer.write_object_end()?;
        }
        None => {
            writer.write_object_begin("", ABSENT_CLASS, 0)?;
            writer.write_object_end()?;
        }
    }
    Ok(())
}

/// Reads an `ai`/`event_manager` sub-object, keeping only its archive
/// identity: neither schema is modeled by this core.
fn load_nested_opaque(reader: &mut dyn ArchiveReader) -> Result<Option<OpaqueRef>> {
    let header = reader
        .read_object_begin()?
        .ok_or_else(|| Error::parser(RESOURCE, "expected ai/event manager sub-object header".to_string()))?;

    if header.is_absent() || header.is_back_reference() {
        reader.skip_object(true)?;
        return Ok(None);
    }

    let reference = OpaqueRef {
        index: header.index,
        class_name: header.class_name.clone(),
    };
    reader.skip_object(true)?;
    Ok(Some(reference))
}

fn save_nested_opaque(writer: &mut dyn ArchiveWriter, reference: Option<&OpaqueRef>) -> Result<()> {
    match reference {
        Some(reference) => {
            writer.write_object_begin("", &reference.class_name, 0)?;
            writer.write_object_end()?;
        }
        None => {
            writer.write_object_begin("", ABSENT_CLASS, 0)?;
            writer.write_object_end()?;
        }
    }
    Ok(())
}

/// Decodes a 3x3 rotation matrix stored as 9 little-endian floats in
/// column-major order (the ASCII back-end's `raw:` hex encoding for
/// `trafoOSToWSRot`), transposing back to the row-major in-memory form.
fn mat3_from_column_major_bytes(bytes: &[u8]) -> Mat3 {
    let mut values = [0.0f32; 9];
    for (i, chunk) in bytes.chunks_exact(4).take(9).enumerate() {
        values[i] = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    let mut rows = [[0.0f32; 3]; 3];
    for col in 0..3 {
        for row in 0..3 {
            rows[row][col] = values[col * 3 + row];
        }
    }
    Mat3 { rows }
}
