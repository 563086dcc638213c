//! Loads a compiled Daedalus module and indexes its symbol table.

use std::any::TypeId;
use std::collections::HashMap;
use std::io::Cursor;

use zen_stream::{ReadExt, SeekExt, SeekOrigin};

use crate::error::SymbolError;
use crate::instance::{bind_array, opaque_arena, MemberBinding};
use crate::opcode::{DataType, Instruction};
use crate::symbol::{read_symbol, MemberBindings, Symbol, SymbolStorage};

/// A compiled Daedalus script: a symbol table plus an executable bytecode
/// blob. Immutable once loaded and safe to share across readers
/// (`&Script` is `Sync`); a [`crate::vm::Vm`] wraps one and owns the
/// mutable execution state.
pub struct Script {
    pub(crate) symbols: Vec<Symbol>,
    by_name: HashMap<String, u32>,
    by_address: HashMap<u32, u32>,
    pub(crate) bindings: MemberBindings,
    text: Vec<u8>,
    version: u8,
}

fn normalize(name: &str) -> String {
    name.to_ascii_uppercase()
}

impl Script {
    /// Parses a compiled module from `bytes`: version byte, symbol count,
    /// a lexicographic sort table (skipped — symbols
    /// are kept in on-disk order and looked up by name through a hash map
    /// instead), the symbol records themselves, then the bytecode text.
    pub fn load(bytes: &[u8]) -> Result<Self, SymbolError> {
        let mut r = Cursor::new(bytes);

        let version = r.read_u8()?;
        let symbol_count = r.read_u32()?;

        // Sort table: `symbol_count` u32 indices, sorted lexicographically
        // by name. Only used by tools doing name lookups against the raw
        // file; this loader builds its own hash map instead.
        r.seek32((symbol_count as i64 * 4) as i32, SeekOrigin::Current)?;

        let mut symbols = Vec::with_capacity(symbol_count as usize);
        let mut by_name = HashMap::with_capacity(symbol_count as usize + 1);
        let mut by_address = HashMap::with_capacity(symbol_count as usize);

        for i in 0..symbol_count {
            let sym = read_symbol(&mut r, i)?;
            by_name.insert(normalize(&sym.name), i);

            if sym.ty == DataType::Prototype
                || sym.ty == DataType::Instance
                || (sym.ty == DataType::Function && sym.is_const() && !sym.is_member())
            {
                by_address.insert(sym.address as u32, i);
            }

            symbols.push(sym);
        }

        let text_size = r.read_u32()?;
        let text = r.read_bytes(text_size as usize)?;

        tracing::debug!(
            symbol_count,
            text_size,
            version,
            "loaded Daedalus module"
        );

        Ok(Self {
            symbols,
            by_name,
            by_address,
            bindings: MemberBindings::default(),
            text,
            version,
        })
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn size(&self) -> u32 {
        self.text.len() as u32
    }

    pub fn find_symbol_by_index(&self, index: u32) -> Option<&Symbol> {
        self.symbols.get(index as usize)
    }

    pub fn find_symbol_by_index_mut(&mut self, index: u32) -> Option<&mut Symbol> {
        self.symbols.get_mut(index as usize)
    }

    pub fn find_symbol_by_name(&self, name: &str) -> Option<&Symbol> {
        self.by_name
            .get(&normalize(name))
            .and_then(|&i| self.symbols.get(i as usize))
    }

    pub fn find_symbol_by_name_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        let idx = *self.by_name.get(&normalize(name))?;
        self.symbols.get_mut(idx as usize)
    }

    pub fn find_symbol_by_address(&self, address: u32) -> Option<&Symbol> {
        self.by_address
            .get(&address)
            .and_then(|&i| self.symbols.get(i as usize))
    }

    /// Decodes the instruction at `address`. `address` is validated by the
    /// VM's `jump` before this is called.
    pub fn instruction_at(&self, address: u32) -> Result<Instruction, SymbolError> {
        let mut cursor = Cursor::new(&self.text[address as usize..]);
        Instruction::decode(&mut cursor).map_err(SymbolError::Io)
    }

    /// Parameter symbols for an (external or regular) function: the
    /// `count` symbols immediately following it in the table.
    pub fn find_parameters_for_function(&self, parent: &Symbol) -> Vec<&Symbol> {
        (0..parent.count)
            .filter_map(|i| self.find_symbol_by_index(parent.index + i + 1))
            .collect()
    }

    /// Local variable symbols for a function with `FUNC_LOCALS` enabled:
    /// every symbol immediately after its parameters whose `parent` still
    /// points back to it, stopping at the first symbol that belongs to
    /// something else (the compiler lays a function's locals out
    /// contiguously right after its parameters).
    pub fn find_locals_for_function(&self, parent: &Symbol) -> Vec<&Symbol> {
        let mut out = Vec::new();
        let mut i = parent.index + parent.count + 1;
        while let Some(sym) = self.find_symbol_by_index(i) {
            if sym.parent != parent.index as i32 {
                break;
            }
            out.push(sym);
            i += 1;
        }
        out
    }

    pub fn find_class_members(&self, class: &Symbol) -> Vec<&Symbol> {
        self.symbols
            .iter()
            .filter(|s| s.is_member() && s.parent == class.index as i32)
            .collect()
    }

    /// Invokes `callback` for every const instance symbol descending from
    /// the class (or one of its prototypes) named `class_name`.
    pub fn enumerate_instances_by_class_name(&self, class_name: &str, mut callback: impl FnMut(&Symbol)) {
        let Some(class) = self.find_symbol_by_name(class_name) else {
            return;
        };
        let class_index = class.index;

        let prototypes: Vec<u32> = self
            .symbols
            .iter()
            .filter(|s| s.ty == DataType::Prototype && s.parent == class_index as i32)
            .map(|s| s.index)
            .collect();

        for sym in &self.symbols {
            if sym.ty == DataType::Instance
                && sym.is_const()
                && (prototypes.contains(&(sym.parent as u32)) || sym.parent == class_index as i32)
            {
                callback(sym);
            }
        }
    }

    /// Validates that `name` names a `MEMBER` symbol of the given
    /// `expected` type and records the host type `T` on the member's
    /// owning class symbol, enforcing that a class is only ever bound to
    /// one host type.
    fn prepare_member_registration<T: 'static>(
        &mut self,
        name: &str,
        expected: DataType,
    ) -> Result<u32, SymbolError> {
        let idx = *self
            .by_name
            .get(&normalize(name))
            .ok_or_else(|| SymbolError::NotFound(name.to_string()))?;

        let sym = &self.symbols[idx as usize];
        if !sym.is_member() {
            return Err(SymbolError::MemberRegistration {
                name: name.to_string(),
                reason: "not a member".to_string(),
            });
        }
        if sym.ty != expected {
            return Err(SymbolError::InvalidRegistrationDataType {
                name: name.to_string(),
                given: expected.name(),
                expected: sym.ty,
            });
        }
        let parent_index = sym.parent;

        let type_id = TypeId::of::<T>();
        let parent = self
            .symbols
            .get_mut(parent_index as usize)
            .ok_or_else(|| SymbolError::MemberRegistration {
                name: name.to_string(),
                reason: "no parent found".to_string(),
            })?;
        match parent.registered_to {
            None => parent.registered_to = Some(type_id),
            Some(existing) if existing != type_id => {
                return Err(SymbolError::MemberRegistration {
                    name: name.to_string(),
                    reason: "parent class is already registered with a different host type"
                        .to_string(),
                })
            }
            _ => {}
        }

        self.symbols[idx as usize].registered_to = Some(type_id);
        Ok(idx)
    }

    /// Registers an int array member field (`count > 1`, e.g. `var int x[4]`).
    pub fn register_member_int_array<T: 'static>(
        &mut self,
        name: &str,
        get_array: impl Fn(&T) -> &[i32] + Clone + 'static,
        get_array_mut: impl Fn(&mut T) -> &mut [i32] + Clone + 'static,
    ) -> Result<(), SymbolError> {
        let idx = self.prepare_member_registration::<T>(name, DataType::Int)?;
        let static_name: &'static str = Box::leak(self.symbols[idx as usize].name.clone().into_boxed_str());
        let (get, set) = bind_array::<T, i32>(static_name, get_array, get_array_mut);
        self.bindings.insert(idx, MemberBinding::Int { get, set });
        Ok(())
    }

    /// Registers a scalar (`count == 1`) int member field.
    pub fn register_member_int<T: 'static>(
        &mut self,
        name: &str,
        get: impl Fn(&T) -> i32 + 'static,
        set: impl Fn(&mut T, i32) + 'static,
    ) -> Result<(), SymbolError> {
        // No backing slice to borrow for a scalar field, so this is wired up
        // directly rather than adapted through `bind_array`.
        let idx = self.prepare_member_registration::<T>(name, DataType::Int)?;
        let static_name: &'static str = Box::leak(self.symbols[idx as usize].name.clone().into_boxed_str());
        let get_boxed: Box<dyn Fn(&crate::instance::Instance, u16) -> Result<i32, SymbolError>> =
            Box::new(move |inst, index| {
                let host = inst
                    .downcast_ref::<T>()
                    .ok_or_else(|| SymbolError::IllegalContextType { name: static_name.to_string() })?;
                if index != 0 {
                    return Err(SymbolError::IllegalIndexAccess { name: static_name.to_string(), index, count: 1 });
                }
                Ok(get(host))
            });
        let set_boxed: Box<dyn Fn(&mut crate::instance::Instance, u16, i32) -> Result<(), SymbolError>> =
            Box::new(move |inst, index, value| {
                let host = inst
                    .downcast_mut::<T>()
                    .ok_or_else(|| SymbolError::IllegalContextType { name: static_name.to_string() })?;
                if index != 0 {
                    return Err(SymbolError::IllegalIndexAccess { name: static_name.to_string(), index, count: 1 });
                }
                set(host, value);
                Ok(())
            });
        self.bindings.insert(idx, MemberBinding::Int { get: get_boxed, set: set_boxed });
        Ok(())
    }

    /// Registers a float array member field.
    pub fn register_member_float_array<T: 'static>(
        &mut self,
        name: &str,
        get_array: impl Fn(&T) -> &[f32] + Clone + 'static,
        get_array_mut: impl Fn(&mut T) -> &mut [f32] + Clone + 'static,
    ) -> Result<(), SymbolError> {
        let idx = self.prepare_member_registration::<T>(name, DataType::Float)?;
        let static_name: &'static str = Box::leak(self.symbols[idx as usize].name.clone().into_boxed_str());
        let (get, set) = bind_array::<T, f32>(static_name, get_array, get_array_mut);
        self.bindings.insert(idx, MemberBinding::Float { get, set });
        Ok(())
    }

    /// Registers a scalar (`count == 1`) float member field.
    pub fn register_member_float<T: 'static>(
        &mut self,
        name: &str,
        get: impl Fn(&T) -> f32 + 'static,
        set: impl Fn(&mut T, f32) + 'static,
    ) -> Result<(), SymbolError> {
        let idx = self.prepare_member_registration::<T>(name, DataType::Float)?;
        let static_name: &'static str = Box::leak(self.symbols[idx as usize].name.clone().into_boxed_str());
        let get_boxed: Box<dyn Fn(&crate::instance::Instance, u16) -> Result<f32, SymbolError>> =
            Box::new(move |inst, index| {
                let host = inst
                    .downcast_ref::<T>()
                    .ok_or_else(|| SymbolError::IllegalContextType { name: static_name.to_string() })?;
                if index != 0 {
                    return Err(SymbolError::IllegalIndexAccess { name: static_name.to_string(), index, count: 1 });
                }
                Ok(get(host))
            });
        let set_boxed: Box<dyn Fn(&mut crate::instance::Instance, u16, f32) -> Result<(), SymbolError>> =
            Box::new(move |inst, index, value| {
                let host = inst
                    .downcast_mut::<T>()
                    .ok_or_else(|| SymbolError::IllegalContextType { name: static_name.to_string() })?;
                if index != 0 {
                    return Err(SymbolError::IllegalIndexAccess { name: static_name.to_string(), index, count: 1 });
                }
                set(host, value);
                Ok(())
            });
        self.bindings.insert(idx, MemberBinding::Float { get: get_boxed, set: set_boxed });
        Ok(())
    }

    /// Registers a scalar string member field. `String` isn't `Copy`, so
    /// this goes through its own accessor pair rather than [`bind_array`].
    pub fn register_member_string<T: 'static>(
        &mut self,
        name: &str,
        get: impl Fn(&T) -> &str + 'static,
        set: impl Fn(&mut T, &str) + 'static,
    ) -> Result<(), SymbolError> {
        let idx = self.prepare_member_registration::<T>(name, DataType::String)?;
        let static_name: &'static str = Box::leak(self.symbols[idx as usize].name.clone().into_boxed_str());
        let get_boxed: Box<dyn Fn(&crate::instance::Instance, u16) -> Result<String, SymbolError>> =
            Box::new(move |inst, index| {
                let host = inst
                    .downcast_ref::<T>()
                    .ok_or_else(|| SymbolError::IllegalContextType { name: static_name.to_string() })?;
                if index != 0 {
                    return Err(SymbolError::IllegalIndexAccess { name: static_name.to_string(), index, count: 1 });
                }
                Ok(get(host).to_string())
            });
        let set_boxed: Box<dyn Fn(&mut crate::instance::Instance, u16, &str) -> Result<(), SymbolError>> =
            Box::new(move |inst, index, value| {
                let host = inst
                    .downcast_mut::<T>()
                    .ok_or_else(|| SymbolError::IllegalContextType { name: static_name.to_string() })?;
                if index != 0 {
                    return Err(SymbolError::IllegalIndexAccess { name: static_name.to_string(), index, count: 1 });
                }
                set(host, value);
                Ok(())
            });
        self.bindings.insert(idx, MemberBinding::String { get: get_boxed, set: set_boxed });
        Ok(())
    }

    /// Lays out every class with no host binding as an opaque arena
    /// (`DaedalusScript::register_as_opaque`): each member gets a base
    /// slot index instead of a byte offset (`opaque_slot`), sized by the
    /// member's declared `count`.
    pub fn register_as_opaque(&mut self, class_name: &str) -> Result<(), SymbolError> {
        let class_idx = *self
            .by_name
            .get(&normalize(class_name))
            .ok_or_else(|| SymbolError::NotFound(class_name.to_string()))?;

        let member_indices: Vec<u32> = self
            .symbols
            .iter()
            .filter(|s| s.is_member() && s.parent == class_idx as i32)
            .map(|s| s.index)
            .collect();

        let mut slot = 0usize;
        for idx in &member_indices {
            let sym = &mut self.symbols[*idx as usize];
            sym.opaque_slot = Some(slot);
            sym.registered_to = Some(TypeId::of::<crate::instance::OpaqueMarker>());
            slot += sym.count.max(1) as usize;
        }

        let class = &mut self.symbols[class_idx as usize];
        class.registered_to = Some(TypeId::of::<crate::instance::OpaqueMarker>());
        class.class_size = slot as u32;
        Ok(())
    }

    /// Builds an arena for an instance of `class`, in the layout
    /// `register_as_opaque` assigned.
    pub fn opaque_layout_for(&self, class: &Symbol) -> Vec<(DataType, u32)> {
        self.symbols
            .iter()
            .filter(|s| s.is_member() && s.parent == class.index as i32)
            .map(|s| (s.ty, s.count.max(1)))
            .collect()
    }

    pub fn new_opaque_arena(&self, class: &Symbol) -> Vec<crate::instance::OpaqueValue> {
        opaque_arena(&self.opaque_layout_for(class))
    }

    /// Adds the internal symbol used to stash temporary string literals
    /// produced by `push_string`. Mirrors `add_temporary_strings_symbol`.
    pub(crate) fn add_temporary_strings_symbol(&mut self) -> u32 {
        let index = self.symbols.len() as u32;
        self.symbols.push(Symbol {
            name: "$PHOENIX_FAKE_STRINGS".to_string(),
            index,
            address: -1,
            parent: -1,
            count: 1,
            ty: DataType::String,
            flags: 0,
            member_offset: 0,
            class_size: 0,
            class_offset: -1,
            return_type: DataType::Void,
            file_index: 0,
            line_start: 0,
            line_count: 0,
            char_start: 0,
            char_count: 0,
            generated: true,
            storage: SymbolStorage::Strings(vec![String::new()]),
            registered_to: None,
            opaque_slot: None,
        });
        index
    }
}
