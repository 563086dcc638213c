//! A single entry in a Daedalus module's symbol table.

use std::any::TypeId;
use std::collections::HashMap;

use zen_stream::{ReadExt, SeekExt, SeekOrigin};

use crate::error::SymbolError;
use crate::instance::{Instance, InstanceRef, MemberBinding};
use crate::opcode::{symbol_flag, DataType};

/// Per-symbol storage. Member symbols (`is_member() == true`) carry no
/// storage of their own here — their value lives in whatever [`Instance`]
/// is passed as context, reached through [`MemberBindings`].
#[derive(Debug, Clone)]
pub enum SymbolStorage {
    None,
    Ints(Vec<i32>),
    Floats(Vec<f32>),
    Strings(Vec<String>),
    Instance(Option<InstanceRef>),
}

/// Registered member accessors, keyed by the `MEMBER` symbol's index.
///
/// Kept separate from [`Symbol`] itself (rather than embedded per-symbol)
/// so that [`Symbol`] stays plain data and the accessor closures live in one
/// place the VM already has a reference to.
#[derive(Default)]
pub struct MemberBindings {
    pub(crate) bindings: HashMap<u32, MemberBinding>,
}

impl MemberBindings {
    pub fn insert(&mut self, symbol_index: u32, binding: MemberBinding) {
        self.bindings.insert(symbol_index, binding);
    }

    pub fn get(&self, symbol_index: u32) -> Option<&MemberBinding> {
        self.bindings.get(&symbol_index)
    }
}

/// A compiled Daedalus symbol: a variable, constant, function, class,
/// prototype, or instance declaration.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub index: u32,
    pub address: i32,
    pub parent: i32,
    pub count: u32,
    pub ty: DataType,
    pub flags: u32,
    pub member_offset: u32,
    pub class_size: u32,
    pub class_offset: i32,
    pub return_type: DataType,
    pub file_index: u32,
    pub line_start: u32,
    pub line_count: u32,
    pub char_start: u32,
    pub char_count: u32,
    pub generated: bool,
    pub storage: SymbolStorage,
    pub registered_to: Option<TypeId>,
    /// Base index into an opaque instance's arena, assigned by
    /// `register_as_opaque`. Plays the role the original's byte-level
    /// `member_offset` plays for host bindings, but as a slot index rather
    /// than a byte offset (Design Note "Opaque instance layout", option (a)
    /// generalized: Rust has no portable way to hand-compute field offsets
    /// of a type nobody declared, so the arena is laid out and addressed by
    /// logical slot instead).
    pub opaque_slot: Option<usize>,
}

impl Symbol {
    pub fn is_const(&self) -> bool {
        self.flags & symbol_flag::CONST != 0
    }
    pub fn is_member(&self) -> bool {
        self.flags & symbol_flag::MEMBER != 0
    }
    pub fn is_external(&self) -> bool {
        self.flags & symbol_flag::EXTERNAL != 0
    }
    pub fn is_merged(&self) -> bool {
        self.flags & symbol_flag::MERGED != 0
    }
    pub fn has_access_trap(&self) -> bool {
        self.flags & symbol_flag::TRAP_ACCESS != 0
    }
    pub fn has_return(&self) -> bool {
        self.flags & symbol_flag::RETURN != 0
    }
    pub fn has_local_variables_enabled(&self) -> bool {
        self.flags & symbol_flag::FUNC_LOCALS != 0
    }

    pub fn set_access_trap_enable(&mut self, enable: bool) {
        if enable {
            self.flags |= symbol_flag::TRAP_ACCESS;
        } else {
            self.flags &= !symbol_flag::TRAP_ACCESS;
        }
    }

    pub fn set_local_variables_enable(&mut self, enable: bool) {
        if enable {
            self.flags |= symbol_flag::FUNC_LOCALS;
        } else {
            self.flags &= !symbol_flag::FUNC_LOCALS;
        }
    }

    fn check_index(&self, index: u16) -> Result<(), SymbolError> {
        if u32::from(index) >= self.count.max(1) {
            return Err(SymbolError::IllegalIndexAccess {
                name: self.name.clone(),
                index,
                count: self.count,
            });
        }
        Ok(())
    }

    /// Resolves a member access against `context` through `bindings`,
    /// dispatching to opaque-arena or host-accessor storage as appropriate.
    fn member_get_int(
        &self,
        index: u16,
        context: &Instance,
        bindings: &MemberBindings,
    ) -> Result<i32, SymbolError> {
        use crate::instance::InstanceData;
        match &context.data {
            InstanceData::Opaque(slots) => {
                let base = self.opaque_slot.ok_or_else(|| SymbolError::UnboundMemberAccess(self.name.clone()))?;
                match slots.get(base + index as usize) {
                    Some(crate::instance::OpaqueValue::Int(v)) => Ok(*v),
                    _ => Err(SymbolError::IllegalTypeAccess {
                        name: self.name.clone(),
                        expected: DataType::Int,
                        found: self.ty,
                    }),
                }
            }
            InstanceData::Transient(t) => Ok(t.get_int(&self.name, index)),
            InstanceData::Host(_) => {
                let binding = bindings
                    .get(self.index)
                    .ok_or_else(|| SymbolError::UnboundMemberAccess(self.name.clone()))?;
                match binding {
                    MemberBinding::Int { get, .. } => get(context, index),
                    _ => Err(SymbolError::IllegalTypeAccess {
                        name: self.name.clone(),
                        expected: DataType::Int,
                        found: self.ty,
                    }),
                }
            }
        }
    }

    fn member_set_int(
        &self,
        index: u16,
        value: i32,
        context: &mut Instance,
        bindings: &MemberBindings,
    ) -> Result<(), SymbolError> {
        use crate::instance::InstanceData;
        match &mut context.data {
            InstanceData::Opaque(slots) => {
                let base = self.opaque_slot.ok_or_else(|| SymbolError::UnboundMemberAccess(self.name.clone()))?;
                let slot = slots
                    .get_mut(base + index as usize)
                    .ok_or_else(|| SymbolError::IllegalIndexAccess {
                        name: self.name.clone(),
                        index,
                        count: self.count,
                    })?;
                *slot = crate::instance::OpaqueValue::Int(value);
                Ok(())
            }
            InstanceData::Transient(t) => {
                t.set_int(&self.name, index, value);
                Ok(())
            }
            InstanceData::Host(_) => {
                let binding = bindings
                    .get(self.index)
                    .ok_or_else(|| SymbolError::UnboundMemberAccess(self.name.clone()))?;
                match binding {
                    MemberBinding::Int { set, .. } => set(context, index, value),
                    _ => Err(SymbolError::IllegalTypeAccess {
                        name: self.name.clone(),
                        expected: DataType::Int,
                        found: self.ty,
                    }),
                }
            }
        }
    }

    fn member_get_float(
        &self,
        index: u16,
        context: &Instance,
        bindings: &MemberBindings,
    ) -> Result<f32, SymbolError> {
        use crate::instance::InstanceData;
        match &context.data {
            InstanceData::Opaque(slots) => {
                let base = self.opaque_slot.ok_or_else(|| SymbolError::UnboundMemberAccess(self.name.clone()))?;
                match slots.get(base + index as usize) {
                    Some(crate::instance::OpaqueValue::Float(v)) => Ok(*v),
                    _ => Err(SymbolError::IllegalTypeAccess {
                        name: self.name.clone(),
                        expected: DataType::Float,
                        found: self.ty,
                    }),
                }
            }
            InstanceData::Transient(t) => Ok(t.get_float(&self.name, index)),
            InstanceData::Host(_) => {
                let binding = bindings
                    .get(self.index)
                    .ok_or_else(|| SymbolError::UnboundMemberAccess(self.name.clone()))?;
                match binding {
                    MemberBinding::Float { get, .. } => get(context, index),
                    _ => Err(SymbolError::IllegalTypeAccess {
                        name: self.name.clone(),
                        expected: DataType::Float,
                        found: self.ty,
                    }),
                }
            }
        }
    }

    fn member_set_float(
        &self,
        index: u16,
        value: f32,
        context: &mut Instance,
        bindings: &MemberBindings,
    ) -> Result<(), SymbolError> {
        use crate::instance::InstanceData;
        match &mut context.data {
            InstanceData::Opaque(slots) => {
                let base = self.opaque_slot.ok_or_else(|| SymbolError::UnboundMemberAccess(self.name.clone()))?;
                let slot = slots
                    .get_mut(base + index as usize)
                    .ok_or_else(|| SymbolError::IllegalIndexAccess {
                        name: self.name.clone(),
                        index,
                        count: self.count,
                    })?;
                *slot = crate::instance::OpaqueValue::Float(value);
                Ok(())
            }
            InstanceData::Transient(t) => {
                t.set_float(&self.name, index, value);
                Ok(())
            }
            InstanceData::Host(_) => {
                let binding = bindings
                    .get(self.index)
                    .ok_or_else(|| SymbolError::UnboundMemberAccess(self.name.clone()))?;
                match binding {
                    MemberBinding::Float { set, .. } => set(context, index, value),
                    _ => Err(SymbolError::IllegalTypeAccess {
                        name: self.name.clone(),
                        expected: DataType::Float,
                        found: self.ty,
                    }),
                }
            }
        }
    }

    fn member_get_string(
        &self,
        index: u16,
        context: &Instance,
        bindings: &MemberBindings,
    ) -> Result<String, SymbolError> {
        use crate::instance::InstanceData;
        match &context.data {
            InstanceData::Opaque(slots) => {
                let base = self.opaque_slot.ok_or_else(|| SymbolError::UnboundMemberAccess(self.name.clone()))?;
                match slots.get(base + index as usize) {
                    Some(crate::instance::OpaqueValue::String(v)) => Ok(v.clone()),
                    _ => Err(SymbolError::IllegalTypeAccess {
                        name: self.name.clone(),
                        expected: DataType::String,
                        found: self.ty,
                    }),
                }
            }
            InstanceData::Transient(t) => Ok(t.get_string(&self.name, index)),
            InstanceData::Host(_) => {
                let binding = bindings
                    .get(self.index)
                    .ok_or_else(|| SymbolError::UnboundMemberAccess(self.name.clone()))?;
                match binding {
                    MemberBinding::String { get, .. } => get(context, index),
                    _ => Err(SymbolError::IllegalTypeAccess {
                        name: self.name.clone(),
                        expected: DataType::String,
                        found: self.ty,
                    }),
                }
            }
        }
    }

    fn member_set_string(
        &self,
        index: u16,
        value: &str,
        context: &mut Instance,
        bindings: &MemberBindings,
    ) -> Result<(), SymbolError> {
        use crate::instance::InstanceData;
        match &mut context.data {
            InstanceData::Opaque(slots) => {
                let base = self.opaque_slot.ok_or_else(|| SymbolError::UnboundMemberAccess(self.name.clone()))?;
                let slot = slots
                    .get_mut(base + index as usize)
                    .ok_or_else(|| SymbolError::IllegalIndexAccess {
                        name: self.name.clone(),
                        index,
                        count: self.count,
                    })?;
                *slot = crate::instance::OpaqueValue::String(value.to_string());
                Ok(())
            }
            InstanceData::Transient(t) => {
                t.set_string(&self.name, index, value);
                Ok(())
            }
            InstanceData::Host(_) => {
                let binding = bindings
                    .get(self.index)
                    .ok_or_else(|| SymbolError::UnboundMemberAccess(self.name.clone()))?;
                match binding {
                    MemberBinding::String { set, .. } => set(context, index, value),
                    _ => Err(SymbolError::IllegalTypeAccess {
                        name: self.name.clone(),
                        expected: DataType::String,
                        found: self.ty,
                    }),
                }
            }
        }
    }

    pub fn get_int(
        &self,
        index: u16,
        context: Option<&Instance>,
        bindings: &MemberBindings,
    ) -> Result<i32, SymbolError> {
        if self.ty != DataType::Int && self.ty != DataType::Function {
            return Err(SymbolError::IllegalTypeAccess {
                name: self.name.clone(),
                expected: DataType::Int,
                found: self.ty,
            });
        }
        self.check_index(index)?;

        if self.is_member() {
            let context = context.ok_or_else(|| SymbolError::NoContext(self.name.clone()))?;
            return self.member_get_int(index, context, bindings);
        }

        match &self.storage {
            SymbolStorage::Ints(v) => Ok(v[index as usize]),
            // A `const func` symbol has no backing storage of its own —
            // its "value" as an int is the function's bytecode address.
            SymbolStorage::None if self.ty == DataType::Function => Ok(self.address),
            _ => unreachable!("int symbol without int storage"),
        }
    }

    pub fn set_int(
        &mut self,
        index: u16,
        value: i32,
        context: Option<&mut Instance>,
        bindings: &MemberBindings,
    ) -> Result<(), SymbolError> {
        if self.ty != DataType::Int && self.ty != DataType::Function {
            return Err(SymbolError::IllegalTypeAccess {
                name: self.name.clone(),
                expected: DataType::Int,
                found: self.ty,
            });
        }
        self.check_index(index)?;

        if self.is_member() {
            let context = context.ok_or_else(|| SymbolError::NoContext(self.name.clone()))?;
            return self.member_set_int(index, value, context, bindings);
        }

        match &mut self.storage {
            SymbolStorage::Ints(v) => {
                v[index as usize] = value;
                Ok(())
            }
            _ => unreachable!("int symbol without int storage"),
        }
    }

    pub fn get_float(
        &self,
        index: u16,
        context: Option<&Instance>,
        bindings: &MemberBindings,
    ) -> Result<f32, SymbolError> {
        if self.ty != DataType::Float {
            return Err(SymbolError::IllegalTypeAccess {
                name: self.name.clone(),
                expected: DataType::Float,
                found: self.ty,
            });
        }
        self.check_index(index)?;

        if self.is_member() {
            let context = context.ok_or_else(|| SymbolError::NoContext(self.name.clone()))?;
            return self.member_get_float(index, context, bindings);
        }

        match &self.storage {
            SymbolStorage::Floats(v) => Ok(v[index as usize]),
            _ => unreachable!("float symbol without float storage"),
        }
    }

    pub fn set_float(
        &mut self,
        index: u16,
        value: f32,
        context: Option<&mut Instance>,
        bindings: &MemberBindings,
    ) -> Result<(), SymbolError> {
        if self.ty != DataType::Float {
            return Err(SymbolError::IllegalTypeAccess {
                name: self.name.clone(),
                expected: DataType::Float,
                found: self.ty,
            });
        }
        self.check_index(index)?;

        if self.is_member() {
            let context = context.ok_or_else(|| SymbolError::NoContext(self.name.clone()))?;
            return self.member_set_float(index, value, context, bindings);
        }

        match &mut self.storage {
            SymbolStorage::Floats(v) => {
                v[index as usize] = value;
                Ok(())
            }
            _ => unreachable!("float symbol without float storage"),
        }
    }

    pub fn get_string(
        &self,
        index: u16,
        context: Option<&Instance>,
        bindings: &MemberBindings,
    ) -> Result<String, SymbolError> {
        if self.ty != DataType::String {
            return Err(SymbolError::IllegalTypeAccess {
                name: self.name.clone(),
                expected: DataType::String,
                found: self.ty,
            });
        }
        self.check_index(index)?;

        if self.is_member() {
            let context = context.ok_or_else(|| SymbolError::NoContext(self.name.clone()))?;
            return self.member_get_string(index, context, bindings);
        }

        match &self.storage {
            SymbolStorage::Strings(v) => Ok(v[index as usize].clone()),
            _ => unreachable!("string symbol without string storage"),
        }
    }

    pub fn set_string(
        &mut self,
        index: u16,
        value: &str,
        context: Option<&mut Instance>,
        bindings: &MemberBindings,
    ) -> Result<(), SymbolError> {
        if self.ty != DataType::String {
            return Err(SymbolError::IllegalTypeAccess {
                name: self.name.clone(),
                expected: DataType::String,
                found: self.ty,
            });
        }
        self.check_index(index)?;

        if self.is_member() {
            let context = context.ok_or_else(|| SymbolError::NoContext(self.name.clone()))?;
            return self.member_set_string(index, value, context, bindings);
        }

        match &mut self.storage {
            SymbolStorage::Strings(v) => {
                v[index as usize] = value.to_string();
                Ok(())
            }
            _ => unreachable!("string symbol without string storage"),
        }
    }

    pub fn get_instance(&self) -> Result<Option<InstanceRef>, SymbolError> {
        if self.ty != DataType::Instance {
            return Err(SymbolError::IllegalTypeAccess {
                name: self.name.clone(),
                expected: DataType::Instance,
                found: self.ty,
            });
        }
        match &self.storage {
            SymbolStorage::Instance(v) => Ok(v.clone()),
            _ => unreachable!("instance symbol without instance storage"),
        }
    }

    pub fn set_instance(&mut self, value: Option<InstanceRef>) -> Result<(), SymbolError> {
        if self.ty != DataType::Instance {
            return Err(SymbolError::IllegalTypeAccess {
                name: self.name.clone(),
                expected: DataType::Instance,
                found: self.ty,
            });
        }
        self.storage = SymbolStorage::Instance(value);
        Ok(())
    }
}

/// Strips the compiler's `\n`/`\t` escape sequences from a raw string
/// constant, as the loader's `zk_internal_escape` does.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some('n') => {
                    out.push('\n');
                    chars.next();
                }
                Some('t') => {
                    out.push('\t');
                    chars.next();
                }
                _ => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Parses one symbol record from the module's symbol table.
pub fn read_symbol<R: ReadExt + SeekExt>(r: &mut R, index: u32) -> Result<Symbol, SymbolError> {
    let mut name = String::new();
    let mut generated = false;
    if r.read_u32()? != 0 {
        name = r.read_line(false)?;
        // A leading 0xFF byte (not valid UTF-8 on its own, so it surfaces
        // here as U+FFFD) marks a symbol the compiler generated rather than
        // one written in source.
        if name.starts_with('\u{FFFD}') {
            name.replace_range(..'\u{FFFD}'.len_utf8(), "$");
            generated = true;
        }
    }

    let vary = r.read_u32()?;
    let properties = r.read_u32()?;

    let count = properties & 0xFFF;
    let ty = DataType::from_u32((properties >> 12) & 0xF);
    let flags = (properties >> 16) & 0x3F;

    let mut member_offset = 0u32;
    let mut class_size = 0u32;
    let mut return_type = DataType::Void;

    let is_member = flags & symbol_flag::MEMBER != 0;
    if is_member {
        member_offset = vary;
    } else if ty == DataType::Class {
        class_size = vary;
    } else if ty == DataType::Function {
        return_type = DataType::from_u32(vary);
    }

    let file_index = r.read_u32()? & 0x7FFFF;
    let line_start = r.read_u32()? & 0x7FFFF;
    let line_count = r.read_u32()? & 0x7FFFF;
    let char_start = r.read_u32()? & 0xFFFFFF;
    let char_count = r.read_u32()? & 0xFFFFFF;

    let mut address = -1i32;
    let mut class_offset = -1i32;
    let mut storage = SymbolStorage::None;
    let is_const = flags & symbol_flag::CONST != 0;

    if !is_member {
        match ty {
            DataType::Float => {
                let mut values = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    values.push(r.read_f32()?);
                }
                storage = SymbolStorage::Floats(values);
            }
            DataType::Int => {
                let mut values = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    values.push(r.read_i32()?);
                }
                storage = SymbolStorage::Ints(values);
            }
            DataType::String => {
                let mut values = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    values.push(unescape(&r.read_line(false)?));
                }
                storage = SymbolStorage::Strings(values);
            }
            DataType::Class => {
                class_offset = r.read_i32()?;
            }
            DataType::Instance => {
                address = r.read_i32()?;
                storage = SymbolStorage::Instance(None);
            }
            DataType::Function => {
                address = r.read_i32()?;
                if !is_const {
                    storage = SymbolStorage::Ints(vec![0]);
                }
            }
            DataType::Prototype => {
                address = r.read_i32()?;
            }
            DataType::Void => {}
        }
    }

    let mut parent = r.read_i32()?;

    // Non-member const string symbols may have a spurious whitespace byte
    // emitted before the parent int by the original compiler. When the low
    // byte of what we just read as `parent` looks like ASCII whitespace,
    // back up and re-read at a one-byte offset, up to four times, looking
    // for a plausible sentinel (-1, "no parent").
    if ty == DataType::String && !is_member && is_const && ((parent & 0xFF) as u8).is_ascii_whitespace() {
        let savepoint = r.tell()?;
        let mut recovered = None;
        for _ in 0..4 {
            r.seek32(-3, SeekOrigin::Current)?;
            let candidate = r.read_i32()?;
            if candidate == -1 {
                recovered = Some(candidate);
                break;
            }
        }
        match recovered {
            Some(p) => parent = p,
            None => {
                r.seek32(savepoint as i32, SeekOrigin::Begin)?;
                parent = r.read_i32()?;
                tracing::warn!("DaedalusSymbol: heuristic parent recovery found no valid endpoint");
            }
        }
    }

    Ok(Symbol {
        name,
        index,
        address,
        parent,
        count,
        ty,
        flags,
        member_offset,
        class_size,
        class_offset,
        return_type,
        file_index,
        line_start,
        line_count,
        char_start,
        char_count,
        generated,
        storage,
        registered_to: None,
        opaque_slot: None,
    })
}
