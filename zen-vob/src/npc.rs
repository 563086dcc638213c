//! `oCNpc`: the largest VOb record, carrying gameplay, AI and inventory
//! state. Fields and ordering are transcribed directly rather than
//! regrouped, since the on-wire layout is the only thing that matters here.

use std::io::Cursor;

use zen_archive::{ArchiveReader, ArchiveWriter, Game, ABSENT_CLASS};
use zen_stream::{ReadExt, Vec3, WriteExt};

use crate::base::{OpaqueRef, VirtualObjectBase};
use crate::error::{Error, Result};

const RESOURCE: &str = "zen-vob::npc";

/// `[talent oCNpcTalent version index]` sub-object. May be absent (`%`).
#[derive(Debug, Clone, Copy, Default)]
pub struct Talent {
    pub talent: i32,
    pub value: i32,
    pub skill: i32,
}

/// Embedded `oCItem:zCVob` inventory entry.
#[derive(Debug, Clone, Default)]
pub struct Item {
    pub index: u32,
    pub base: VirtualObjectBase,
    pub instance: String,
    pub amount: Option<i32>,
    pub flags: Option<i32>,
}

impl Item {
    pub fn load(reader: &mut dyn ArchiveReader, base: VirtualObjectBase, index: u32, save: bool) -> Result<Self> {
        let instance = reader.read_string()?;
        let (amount, flags) = if save {
            (Some(reader.read_int()?), Some(reader.read_int()?))
        } else {
            (None, None)
        };
        Ok(Self {
            index,
            base,
            instance,
            amount,
            flags,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct InventorySlot {
    pub used: bool,
    pub name: String,
    pub item: Option<OpaqueRef>,
    pub in_inventory: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AiStateRef {
    pub valid: bool,
    pub name: String,
    pub program_index: i32,
    pub is_routine: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Npc {
    pub base: VirtualObjectBase,
    pub instance: String,
    pub model_scale: Vec3,
    pub model_fatness: f32,
    pub overlays: Vec<String>,
    pub flags: i32,
    pub guild: i32,
    pub guild_true: i32,
    pub level: i32,
    pub xp: i32,
    pub xp_next_level: i32,
    pub lp: i32,
    pub talents: Vec<Option<Talent>>,
    pub fight_tactic: i32,
    pub fight_mode: i32,
    pub wounded: bool,
    pub mad: bool,
    pub mad_time: i32,
    pub is_player: bool,
    pub attributes: [i32; 8],
    pub hit_chances: Vec<i32>,
    pub missions: [i32; 5],
    pub start_ai_state: String,
    pub ai_vars: Vec<i32>,
    pub script_waypoint: String,
    pub attitude: i32,
    pub attitude_temp: i32,
    pub name_nr: i32,
    pub spells: [u8; 4],
    pub carry_vob: Option<OpaqueRef>,
    pub enemy: Option<OpaqueRef>,
    pub move_lock: bool,
    pub packed: [String; 9],
    pub items: Vec<Item>,
    pub slots: Vec<InventorySlot>,
    pub current_state: AiStateRef,
    pub next_state: AiStateRef,
    pub last_ai_state: i32,
    pub has_routine: bool,
    pub routine_changed: bool,
    pub routine_overlay: bool,
    pub routine_overlay_count: i32,
    pub walkmode_routine: i32,
    pub weaponmode_routine: bool,
    pub start_new_routine: bool,
    pub ai_state_driven: i32,
    pub ai_state_pos: Vec3,
    pub current_routine: String,
    pub respawn: bool,
    pub respawn_time: i32,
    pub protection: [i32; 8],
    pub bs_interruptable_override: Option<i32>,
    pub npc_type: Option<i32>,
    pub spell_mana: Option<i32>,
}

fn parse_ints(bytes: &[u8], count: usize) -> Result<Vec<i32>> {
    let mut cursor = Cursor::new(bytes);
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(cursor.read_i32().map_err(|_| {
            Error::parser(RESOURCE, "truncated raw int block".to_string())
        })?);
    }
    Ok(values)
}

impl Npc {
    pub fn load(reader: &mut dyn ArchiveReader, base: VirtualObjectBase, game: Game, save: bool) -> Result<Self> {
        let instance = reader.read_string()?;
        let model_scale = reader.read_vec3()?;
        let model_fatness = reader.read_float()?;

        let overlay_count = reader.read_int()?.max(0);
        let mut overlays = Vec::with_capacity(overlay_count as usize);
        for _ in 0..overlay_count {
            overlays.push(reader.read_string()?);
        }

        let flags = reader.read_int()?;
        let guild = reader.read_int()?;
        let guild_true = reader.read_int()?;
        let level = reader.read_int()?;
        let xp = reader.read_int()?;
        let xp_next_level = reader.read_int()?;
        let lp = reader.read_int()?;

        let talent_count = reader.read_int()?.max(0) as usize;
        let mut talents = Vec::with_capacity(talent_count);
        for _ in 0..talent_count {
            let header = reader
                .read_object_begin()?
                .ok_or_else(|| Error::parser(RESOURCE, "expected oCNpcTalent object header".to_string()))?;
            if header.class_name == ABSENT_CLASS {
                reader.skip_object(true)?;
                talents.push(None);
                continue;
            }
            let talent = Talent {
                talent: reader.read_int()?,
                value: reader.read_int()?,
                skill: reader.read_int()?,
            };
            reader.read_object_end()?;
            talents.push(Some(talent));
        }

        let fight_tactic = reader.read_int()?;
        let fight_mode = reader.read_int()?;
        let wounded = reader.read_bool()?;
        let mad = reader.read_bool()?;
        let mad_time = reader.read_int()?;
        let is_player = reader.read_bool()?;

        let mut attributes = [0i32; 8];
        for attribute in &mut attributes {
            *attribute = reader.read_int()?;
        }

        let hit_chances = if game == Game::G2 {
            let mut hcs = vec![0i32; 8];
            for hc in &mut hcs {
                *hc = reader.read_int()?;
            }
            hcs
        } else {
            Vec::new()
        };

        let mut missions = [0i32; 5];
        for mission in &mut missions {
            *mission = reader.read_int()?;
        }

        let start_ai_state = reader.read_string()?;

        let var_count = if game == Game::G1 { 50 } else { 100 };
        let raw_vars = reader.read_raw()?;
        let ai_vars = parse_ints(&raw_vars, var_count)?;

        let script_waypoint = reader.read_string()?;
        let attitude = reader.read_int()?;
        let attitude_temp = reader.read_int()?;
        let name_nr = reader.read_int()?;

        let raw_spells = reader.read_raw()?;
        let mut spells = [0u8; 4];
        for (slot, byte) in spells.iter_mut().zip(raw_spells.iter()) {
            *slot = *byte;
        }

        let news_count = reader.read_int()?;
        if news_count != 0 {
            return Err(Error::parser(
                RESOURCE,
                "news entries are not supported".to_string(),
            ));
        }

        let carry_vob = read_opaque_ref(reader)?;
        let enemy = read_opaque_ref(reader)?;

        let move_lock = reader.read_bool()?;

        let mut packed: [String; 9] = Default::default();
        if game == Game::G1 {
            for slot in &mut packed {
                *slot = reader.read_string()?;
            }
        } else {
            let joined = reader.read_string()?;
            for (slot, part) in packed.iter_mut().zip(joined.split(';')) {
                *slot = part.to_string();
            }
        }

        let item_count = reader.read_int()?.max(0) as usize;
        let mut items = Vec::with_capacity(item_count);
        for _ in 0..item_count {
            let header = reader
                .read_object_begin()?
                .ok_or_else(|| Error::parser(RESOURCE, "expected item object header".to_string()))?;
            let item_base = VirtualObjectBase::load(reader, header.index, game, save)?;
            let item = Item::load(reader, item_base, header.index, save)?;
            reader.read_object_end()?;

            if let Some(flags) = item.flags {
                if flags & 0x200 != 0 {
                    reader.read_int()?;
                }
            }
            items.push(item);
        }

        let inv_slot_count = reader.read_int()?.max(0) as usize;
        let mut slots = Vec::with_capacity(inv_slot_count);
        for _ in 0..inv_slot_count {
            let used = reader.read_bool()?;
            let name = reader.read_string()?;
            let mut item_ref = None;
            let mut in_inventory = false;
            if used {
                item_ref = read_opaque_ref(reader)?;
                in_inventory = reader.read_bool()?;
            }
            slots.push(InventorySlot {
                used,
                name,
                item: item_ref,
                in_inventory,
            });
        }

        let current_state = AiStateRef {
            valid: reader.read_bool()?,
            name: reader.read_string()?,
            program_index: reader.read_int()?,
            is_routine: reader.read_bool()?,
        };
        let next_state = AiStateRef {
            valid: reader.read_bool()?,
            name: reader.read_string()?,
            program_index: reader.read_int()?,
            is_routine: reader.read_bool()?,
        };
        let last_ai_state = reader.read_int()?;
        let has_routine = reader.read_bool()?;
        let routine_changed = reader.read_bool()?;
        let routine_overlay = reader.read_bool()?;
        let routine_overlay_count = reader.read_int()?;
        let walkmode_routine = reader.read_int()?;
        let weaponmode_routine = reader.read_bool()?;
        let start_new_routine = reader.read_bool()?;
        let ai_state_driven = reader.read_int()?;
        let ai_state_pos = reader.read_vec3()?;
        let current_routine = reader.read_string()?;
        let respawn = reader.read_bool()?;
        let respawn_time = reader.read_int()?;

        let raw_protection = reader.read_raw()?;
        let protection_values = parse_ints(&raw_protection, 8)?;
        let mut protection = [0i32; 8];
        protection.copy_from_slice(&protection_values);

        let (bs_interruptable_override, npc_type, spell_mana) = if game == Game::G2 {
            (
                Some(reader.read_int()?),
                Some(reader.read_int()?),
                Some(reader.read_int()?),
            )
        } else {
            (None, None, None)
        };

        Ok(Self {
            base,
            instance,
            model_scale,
            model_fatness,
            overlays,
            flags,
            guild,
            guild_true,
            level,
            xp,
            xp_next_level,
            lp,
            talents,
            fight_tactic,
            fight_mode,
            wounded,
            mad,
            mad_time,
            is_player,
            attributes,
            hit_chances,
            missions,
            start_ai_state,
            ai_vars,
            script_waypoint,
            attitude,
            attitude_temp,
            name_nr,
            spells,
            carry_vob,
            enemy,
            move_lock,
            packed,
            items,
            slots,
            current_state,
            next_state,
            last_ai_state,
            has_routine,
            routine_changed,
            routine_overlay,
            routine_overlay_count,
            walkmode_routine,
            weaponmode_routine,
            start_new_routine,
            ai_state_driven,
            ai_state_pos,
            current_routine,
            respawn,
            respawn_time,
            protection,
            bs_interruptable_override,
            npc_type,
            spell_mana,
        })
    }

    pub fn save(&self, writer: &mut dyn ArchiveWriter, game: Game, save: bool) -> Result<()> {
        writer.write_string("npcInstance", &self.instance)?;
        writer.write_vec3("modelScale", self.model_scale)?;
        writer.write_float("modelFatness", self.model_fatness)?;

        writer.write_int("numOverlays", self.overlays.len() as i32)?;
        for overlay in &self.overlays {
            writer.write_string("overlay", overlay)?;
        }

        writer.write_int("flags", self.flags)?;
        writer.write_int("guild", self.guild)?;
        writer.write_int("guildTrue", self.guild_true)?;
        writer.write_int("level", self.level)?;
        writer.write_int("xp", self.xp)?;
        writer.write_int("xpnl", self.xp_next_level)?;
        writer.write_int("lp", self.lp)?;

        writer.write_int("numTalents", self.talents.len() as i32)?;
        for talent in &self.talents {
            match talent {
                None => {
                    writer.write_object_begin("talent", ABSENT_CLASS, 0)?;
                    writer.write_object_end()?;
                }
                Some(talent) => {
                    writer.write_object_begin("talent", "oCNpcTalent", 0)?;
                    writer.write_int("talent", talent.talent)?;
                    writer.write_int("value", talent.value)?;
                    writer.write_int("skill", talent.skill)?;
                    writer.write_object_end()?;
                }
            }
        }

        writer.write_int("fightTactic", self.fight_tactic)?;
        writer.write_int("fightMode", self.fight_mode)?;
        writer.write_bool("wounded", self.wounded)?;
        writer.write_bool("mad", self.mad)?;
        writer.write_int("madTime", self.mad_time)?;
        writer.write_bool("player", self.is_player)?;

        for (i, attribute) in self.attributes.iter().enumerate() {
            writer.write_int(&format!("atr{i}"), *attribute)?;
        }

        if game == Game::G2 {
            for (i, hc) in self.hit_chances.iter().enumerate() {
                writer.write_int(&format!("hc{}", i + 1), *hc)?;
            }
        }

        for (i, mission) in self.missions.iter().enumerate() {
            writer.write_int(&format!("mission{i}"), *mission)?;
        }

        writer.write_string("startAIState", &self.start_ai_state)?;

        let mut vars_buf = Cursor::new(Vec::new());
        for value in &self.ai_vars {
            vars_buf.write_i32(*value)?;
        }
        writer.write_raw("scriptVars", &vars_buf.into_inner())?;

        writer.write_string("scriptWp", &self.script_waypoint)?;
        writer.write_int("attitude", self.attitude)?;
        writer.write_int("tmpAttitude", self.attitude_temp)?;
        writer.write_int("nameNr", self.name_nr)?;
        writer.write_raw("spells", &self.spells)?;
        writer.write_int("NumOfEntries", 0)?;

        write_opaque_ref(writer, "carryVob", self.carry_vob.as_ref())?;
        write_opaque_ref(writer, "enemy", self.enemy.as_ref())?;

        writer.write_bool("moveLock", self.move_lock)?;

        if game == Game::G1 {
            for part in &self.packed {
                writer.write_string("packed", part)?;
            }
        } else {
            writer.write_string("packed", &self.packed.join(";"))?;
        }

        writer.write_int("itemCount", self.items.len() as i32)?;
        for item in &self.items {
            writer.write_object_begin("item", "oCItem:zCVob", 0)?;
            item.base.save(writer, game, save)?;
            writer.write_string("itemInstance", &item.instance)?;
            if save {
                writer.write_int("amount", item.amount.unwrap_or(1))?;
                writer.write_int("flags", item.flags.unwrap_or(0))?;
            }
            writer.write_object_end()?;
            if let Some(flags) = item.flags {
                if flags & 0x200 != 0 {
                    writer.write_int("shortKey", 0)?;
                }
            }
        }

        writer.write_int("numInvSlots", self.slots.len() as i32)?;
        for slot in &self.slots {
            writer.write_bool("used", slot.used)?;
            writer.write_string("name", &slot.name)?;
            if slot.used {
                write_opaque_ref(writer, "vob", slot.item.as_ref())?;
                writer.write_bool("inInv", slot.in_inventory)?;
            }
        }

        writer.write_bool("curState.valid", self.current_state.valid)?;
        writer.write_string("curState.name", &self.current_state.name)?;
        writer.write_int("curState.prgIndex", self.current_state.program_index)?;
        writer.write_bool("curState.isRtnState", self.current_state.is_routine)?;
        writer.write_bool("nextState.valid", self.next_state.valid)?;
        writer.write_string("nextState.name", &self.next_state.name)?;
        writer.write_int("nextState.prgIndex", self.next_state.program_index)?;
        writer.write_bool("nextState.isRtnState", self.next_state.is_routine)?;
        writer.write_int("lastAIState", self.last_ai_state)?;
        writer.write_bool("hasRoutine", self.has_routine)?;
        writer.write_bool("rtnChanged", self.routine_changed)?;
        writer.write_bool("rtnOverlay", self.routine_overlay)?;
        writer.write_int("rtnOverlayCount", self.routine_overlay_count)?;
        writer.write_int("walkmode_routine", self.walkmode_routine)?;
        writer.write_bool("weaponmode_routine", self.weaponmode_routine)?;
        writer.write_bool("startNewRoutine", self.start_new_routine)?;
        writer.write_int("aiStateDriven", self.ai_state_driven)?;
        writer.write_vec3("aiStatePos", self.ai_state_pos)?;
        writer.write_string("curRoutine", &self.current_routine)?;
        writer.write_bool("respawn", self.respawn)?;
        writer.write_int("respawnTime", self.respawn_time)?;

        let mut protection_buf = Cursor::new(Vec::new());
        for value in &self.protection {
            protection_buf.write_i32(*value)?;
        }
        writer.write_raw("protection", &protection_buf.into_inner())?;

        if game == Game::G2 {
            writer.write_int("bsInterruptableOverride", self.bs_interruptable_override.unwrap_or(0))?;
            writer.write_int("npcType", self.npc_type.unwrap_or(0))?;
            writer.write_int("spellMana", self.spell_mana.unwrap_or(0))?;
        }

        Ok(())
    }
}

fn read_opaque_ref(reader: &mut dyn ArchiveReader) -> Result<Option<OpaqueRef>> {
    let header = reader
        .read_object_begin()?
        .ok_or_else(|| Error::parser(RESOURCE, "expected vob reference object header".to_string()))?;
    let class_name = header.class_name.clone();
    let index = header.index;
    reader.skip_object(true)?;
    if class_name == ABSENT_CLASS {
        Ok(None)
    } else {
        Ok(Some(OpaqueRef { index, class_name }))
    }
}

fn write_opaque_ref(writer: &mut dyn ArchiveWriter, object_name: &str, reference: Option<&OpaqueRef>) -> Result<()> {
    match reference {
        Some(reference) => writer.write_ref(object_name, reference.index)?,
        None => {
            writer.write_object_begin(object_name, ABSENT_CLASS, 0)?;
            writer.write_object_end()?;
        }
    }
    Ok(())
}
