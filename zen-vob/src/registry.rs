//! Tagged dispatch over every concrete VOb class this core knows how to
//! parse, plus the tree walk that reads a VOb and its `childs0` subtree.

use std::collections::HashMap;

use zen_archive::{ArchiveReader, ArchiveWriter, Game, ObjectRegistry, ABSENT_CLASS, BACK_REFERENCE_CLASS};

use crate::base::VirtualObjectBase;
use crate::camera::Camera;
use crate::container::Container;
use crate::error::Result;
use crate::light::Light;
use crate::npc::Npc;
use crate::sound::Sound;
use crate::trigger::{Mover, Trigger};

/// A concrete VOb, tagged by which representative class it was parsed as.
///
/// Classes outside this set are left unregistered entirely: `zCVob`'s own
/// field layout is the only one safe to assume for an object this core
/// doesn't otherwise recognize, and most of the engine's other subclasses
/// add their own trailing fields that would desync the stream if
/// misparsed as plain `zCVob`. Unregistered classes are skipped whole,
/// matching the archive's own "can't construct, skip subtree" contract.
#[derive(Debug, Clone)]
pub enum Vob {
    Generic(VirtualObjectBase),
    Light(Light),
    Sound(Sound),
    Trigger(Trigger),
    Mover(Mover),
    Camera(Camera),
    Container(Container),
    Npc(Npc),
}

impl Vob {
    pub fn base(&self) -> &VirtualObjectBase {
        match self {
            Self::Generic(base) => base,
            Self::Light(light) => &light.base,
            Self::Sound(sound) => &sound.base,
            Self::Trigger(trigger) => &trigger.base,
            Self::Mover(mover) => &mover.trigger.base,
            Self::Camera(camera) => &camera.base,
            Self::Container(container) => &container.base,
            Self::Npc(npc) => &npc.base,
        }
    }

    fn class_name(&self) -> &'static str {
        match self {
            Self::Generic(_) => "zCVob",
            Self::Light(_) => "zCVobLight:zCVob",
            Self::Sound(_) => "zCVobSound:zCVob",
            Self::Trigger(_) => "zCTrigger:zCVob",
            Self::Mover(_) => "zCMover:zCTrigger:zCVob",
            Self::Camera(_) => "zCCSCamera:zCVob",
            Self::Container(_) => "oCMobContainer:oCMobInter:oCMOB:zCVob",
            Self::Npc(_) => "oCNpc:zCVob",
        }
    }
}

/// A VOb together with its child subtree, as produced by walking the
/// `childs0`-delimited recursive tree each object carries.
#[derive(Debug, Clone)]
pub struct VobNode {
    pub vob: Vob,
    pub children: Vec<VobNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VobTag {
    Generic,
    Light,
    Sound,
    Trigger,
    Mover,
    Camera,
    Container,
    Npc,
}

fn tag_generic() -> VobTag {
    VobTag::Generic
}
fn tag_light() -> VobTag {
    VobTag::Light
}
fn tag_sound() -> VobTag {
    VobTag::Sound
}
fn tag_trigger() -> VobTag {
    VobTag::Trigger
}
fn tag_mover() -> VobTag {
    VobTag::Mover
}
fn tag_camera() -> VobTag {
    VobTag::Camera
}
fn tag_container() -> VobTag {
    VobTag::Container
}
fn tag_npc() -> VobTag {
    VobTag::Npc
}

/// Builds the class-name-to-tag table for every representative class.
pub fn build_registry() -> ObjectRegistry<VobTag> {
    let mut registry = ObjectRegistry::new();
    registry.register("zCVob", 0, 0, tag_generic);
    registry.register("zCVobLight:zCVob", 0, 0, tag_light);
    registry.register("zCVobSpot:zCVob", 0, 0, tag_light);
    registry.register("zCVobSound:zCVob", 0, 0, tag_sound);
    registry.register("zCVobSoundDaytime:zCVobSound:zCVob", 0, 0, tag_sound);
    registry.register("zCTrigger:zCVob", 0, 0, tag_trigger);
    registry.register("zCTriggerList:zCTrigger:zCVob", 0, 0, tag_trigger);
    registry.register("oCTriggerScript:zCTrigger:zCVob", 0, 0, tag_trigger);
    registry.register("oCTriggerChangeLevel:zCTrigger:zCVob", 0, 0, tag_trigger);
    registry.register("oCCSTrigger:zCTrigger:zCVob", 0, 0, tag_trigger);
    registry.register("zCMover:zCTrigger:zCVob", 0, 0, tag_mover);
    registry.register("zCCSCamera:zCVob", 0, 0, tag_camera);
    registry.register("oCMobContainer:oCMobInter:oCMOB:zCVob", 0, 0, tag_container);
    registry.register("oCNpc:zCVob", 0, 0, tag_npc);
    registry
}

/// Reads the next object header at the current nesting level and resolves
/// it against `registry`/`cache`, returning `Ok(None)` once no more
/// objects remain (mirrors [`zen_archive::begin_object`], specialized so
/// that back references resolve to a fully-loaded [`Vob`] rather than a
/// registry skeleton).
fn begin_vob(
    reader: &mut dyn ArchiveReader,
    registry: &ObjectRegistry<VobTag>,
    cache: &HashMap<u32, Vob>,
) -> Result<Option<VobStep>> {
    let header = match reader.read_object_begin()? {
        Some(header) => header,
        None => return Ok(None),
    };

    if header.class_name == BACK_REFERENCE_CLASS {
        reader.skip_object(true)?;
        return Ok(Some(match cache.get(&header.index) {
            Some(vob) => VobStep::BackReference(vob.clone()),
            None => VobStep::Absent,
        }));
    }

    if header.class_name == ABSENT_CLASS {
        reader.skip_object(true)?;
        return Ok(Some(VobStep::Absent));
    }

    match registry.construct(&header.class_name) {
        Some(tag) => Ok(Some(VobStep::New {
            tag,
            index: header.index,
        })),
        None => {
            reader.skip_object(true)?;
            Ok(Some(VobStep::UnknownClass))
        }
    }
}

enum VobStep {
    Absent,
    UnknownClass,
    BackReference(Vob),
    New { tag: VobTag, index: u32 },
}

/// Reads one VOb object's fields (identified by `tag`/`index`) and its
/// `childs0`-delimited child subtree, inserting the loaded object into
/// `cache` before the children are read so siblings can back-reference it.
pub fn read_vob_tree(
    reader: &mut dyn ArchiveReader,
    registry: &ObjectRegistry<VobTag>,
    cache: &mut HashMap<u32, Vob>,
    tag: VobTag,
    index: u32,
    game: Game,
    save: bool,
) -> Result<VobNode> {
    let base = VirtualObjectBase::load(reader, index, game, save)?;

    let vob = match tag {
        VobTag::Generic => Vob::Generic(base),
        VobTag::Light => Vob::Light(Light::load(reader, base, game)?),
        VobTag::Sound => Vob::Sound(Sound::load(reader, base, save)?),
        VobTag::Trigger => Vob::Trigger(Trigger::load(reader, base, game, save)?),
        VobTag::Mover => {
            let trigger = Trigger::load(reader, base, game, save)?;
            Vob::Mover(Mover::load(reader, trigger, game, save)?)
        }
        VobTag::Camera => Vob::Camera(Camera::load(reader, base, game, save)?),
        VobTag::Container => Vob::Container(Container::load(reader, base, game, save)?),
        VobTag::Npc => Vob::Npc(Npc::load(reader, base, game, save)?),
    };

    cache.insert(index, vob.clone());
    reader.read_object_end()?;

    let child_count = reader.read_int()?.max(0);
    let mut children = Vec::with_capacity(child_count as usize);
    for _ in 0..child_count {
        match begin_vob(reader, registry, cache)? {
            None | Some(VobStep::Absent) | Some(VobStep::UnknownClass) => continue,
            Some(VobStep::BackReference(vob)) => children.push(VobNode {
                vob,
                children: Vec::new(),
            }),
            Some(VobStep::New { tag, index }) => {
                let node = read_vob_tree(reader, registry, cache, tag, index, game, save)?;
                children.push(node);
            }
        }
    }

    Ok(VobNode { vob, children })
}

/// Reads one top-level VOb tree, or `Ok(None)` once the archive's object
/// list at this nesting level is exhausted.
pub fn read_root_vob(
    reader: &mut dyn ArchiveReader,
    registry: &ObjectRegistry<VobTag>,
    cache: &mut HashMap<u32, Vob>,
    game: Game,
    save: bool,
) -> Result<Option<VobNode>> {
    match begin_vob(reader, registry, cache)? {
        None | Some(VobStep::Absent) | Some(VobStep::UnknownClass) => Ok(None),
        Some(VobStep::BackReference(vob)) => Ok(Some(VobNode {
            vob,
            children: Vec::new(),
        })),
        Some(VobStep::New { tag, index }) => {
            Ok(Some(read_vob_tree(reader, registry, cache, tag, index, game, save)?))
        }
    }
}

/// Writes one VOb and its child subtree.
pub fn write_vob_tree(writer: &mut dyn ArchiveWriter, node: &VobNode, game: Game, save: bool) -> Result<()> {
    let class_name = node.vob.class_name();
    let object_name = node.vob.base().vob_name.clone();
    let version = 0u16;
    writer.write_object_begin(&object_name, class_name, version)?;

    match &node.vob {
        Vob::Generic(base) => base.save(writer, game, save)?,
        Vob::Light(light) => {
            light.base.save(writer, game, save)?;
            light.save(writer, game)?;
        }
        Vob::Sound(sound) => {
            sound.base.save(writer, game, save)?;
            sound.save(writer, save)?;
        }
        Vob::Trigger(trigger) => {
            trigger.base.save(writer, game, save)?;
            trigger.save(writer, game, save)?;
        }
        Vob::Mover(mover) => {
            mover.trigger.base.save(writer, game, save)?;
            mover.trigger.save(writer, game, save)?;
            mover.save(writer, game, save)?;
        }
        Vob::Camera(camera) => {
            camera.base.save(writer, game, save)?;
            camera.save(writer, game, save)?;
        }
        Vob::Container(container) => {
            container.base.save(writer, game, save)?;
            container.save(writer, game, save)?;
        }
        Vob::Npc(npc) => {
            npc.base.save(writer, game, save)?;
            npc.save(writer, game, save)?;
        }
    }

    writer.write_object_end()?;
    writer.write_int("childs0", node.children.len() as i32)?;
    for child in &node.children {
        write_vob_tree(writer, child, game, save)?;
    }
    Ok(())
}
