//! `oCMobContainer`: a lockable, lootable container.
//!
//! The engine's real class chain is `oCMobContainer : oCMobInter : oCMOB :
//! zCVob`, but the intervening `MovableObject`/`InteractiveObject` fields
//! (hit points, focus name, trigger target, ...) are gameplay-interaction
//! state out of scope here; only the fields a container itself adds are
//! modeled.

use zen_archive::{ArchiveReader, ArchiveWriter, Game};

use crate::base::VirtualObjectBase;
use crate::error::{Error, Result};
use crate::npc::Item;

const RESOURCE: &str = "zen-vob::container";

#[derive(Debug, Clone, Default)]
pub struct Container {
    pub base: VirtualObjectBase,
    pub locked: bool,
    pub key_instance: String,
    pub pick_lock: String,
    pub contents: String,
    /// Embedded `oCItem:zCVob` entries, present in save-games only.
    pub items: Vec<Item>,
}

impl Container {
    pub fn load(reader: &mut dyn ArchiveReader, base: VirtualObjectBase, game: Game, save: bool) -> Result<Self> {
        let locked = reader.read_bool()?;
        let key_instance = reader.read_string()?;
        let pick_lock = reader.read_string()?;
        let contents = reader.read_string()?;

        let mut items = Vec::new();
        if save {
            let item_count = reader.read_int()?.max(0);
            items.reserve(item_count as usize);
            for _ in 0..item_count {
                let header = reader
                    .read_object_begin()?
                    .ok_or_else(|| Error::parser(RESOURCE, "expected container item object header".to_string()))?;
                let item_base = VirtualObjectBase::load(reader, header.index, game, save)?;
                let item = Item::load(reader, item_base, header.index, save)?;
                reader.read_object_end()?;
                items.push(item);
            }
        }

        Ok(Self {
            base,
            locked,
            key_instance,
            pick_lock,
            contents,
            items,
        })
    }

    pub fn save(&self, writer: &mut dyn ArchiveWriter, game: Game, save: bool) -> Result<()> {
        writer.write_bool("locked", self.locked)?;
        writer.write_string("keyInstance", &self.key_instance)?;
        writer.write_string("pickLockStr", &self.pick_lock)?;
        writer.write_string("contains", &self.contents)?;
        if save {
            writer.write_int("NumOfEntries", self.items.len() as i32)?;
            for item in &self.items {
                writer.write_object_begin("item", "oCItem:zCVob", 0)?;
                item.base.save(writer, game, save)?;
                writer.write_string("itemInstance", &item.instance)?;
                writer.write_int("amount", item.amount.unwrap_or(1))?;
                writer.write_int("flags", item.flags.unwrap_or(0))?;
                writer.write_object_end()?;
            }
        }
        Ok(())
    }
}
