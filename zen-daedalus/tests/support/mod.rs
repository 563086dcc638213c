//! Hand-built `.DAT` module fixtures.
//!
//! There's no Daedalus compiler in this tree, so these tests assemble the
//! same byte layout `read_symbol`/`Script::load` parse: a version byte, a
//! symbol count, a (skipped) sort table, the symbol records themselves, and
//! a bytecode blob.

#![allow(dead_code)]

use zen_stream::WriteExt;

pub const TY_VOID: u32 = 0;
pub const TY_FLOAT: u32 = 1;
pub const TY_INT: u32 = 2;
pub const TY_STRING: u32 = 3;
pub const TY_CLASS: u32 = 4;
pub const TY_FUNCTION: u32 = 5;
pub const TY_PROTOTYPE: u32 = 6;
pub const TY_INSTANCE: u32 = 7;

pub const F_CONST: u32 = 1 << 0;
pub const F_RETURN: u32 = 1 << 1;
pub const F_MEMBER: u32 = 1 << 2;
pub const F_EXTERNAL: u32 = 1 << 3;

/// One symbol record, fields named to match what `read_symbol` expects on
/// the wire rather than the parsed `Symbol` struct's field names.
pub struct SymSpec {
    pub name: &'static str,
    pub ty: u32,
    pub flags: u32,
    pub parent: i32,
    pub count: u32,
    pub ints: Vec<i32>,
    pub floats: Vec<f32>,
    pub strings: Vec<String>,
    pub member_offset: u32,
    pub class_size: u32,
    pub class_offset: i32,
    pub return_type: u32,
    pub address: i32,
}

impl SymSpec {
    pub fn blank(name: &'static str, ty: u32, flags: u32, parent: i32) -> Self {
        Self {
            name,
            ty,
            flags,
            parent,
            count: 1,
            ints: Vec::new(),
            floats: Vec::new(),
            strings: Vec::new(),
            member_offset: 0,
            class_size: 0,
            class_offset: 0,
            return_type: TY_VOID,
            address: -1,
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        if self.name.is_empty() {
            out.write_u32(0).unwrap();
        } else {
            out.write_u32(1).unwrap();
            out.write_line(self.name).unwrap();
        }

        let is_member = self.flags & F_MEMBER != 0;
        let vary = if is_member {
            self.member_offset
        } else {
            match self.ty {
                TY_CLASS => self.class_size,
                TY_FUNCTION => self.return_type,
                _ => 0,
            }
        };
        out.write_u32(vary).unwrap();

        let properties = (self.count & 0xFFF) | ((self.ty & 0xF) << 12) | ((self.flags & 0x3F) << 16);
        out.write_u32(properties).unwrap();

        out.write_u32(0).unwrap(); // file_index
        out.write_u32(0).unwrap(); // line_start
        out.write_u32(0).unwrap(); // line_count
        out.write_u32(0).unwrap(); // char_start
        out.write_u32(0).unwrap(); // char_count

        if !is_member {
            match self.ty {
                TY_FLOAT => {
                    for i in 0..self.count {
                        out.write_f32(self.floats.get(i as usize).copied().unwrap_or(0.0)).unwrap();
                    }
                }
                TY_INT => {
                    for i in 0..self.count {
                        out.write_i32(self.ints.get(i as usize).copied().unwrap_or(0)).unwrap();
                    }
                }
                TY_STRING => {
                    if self.count == 0 {
                        out.write_line("").unwrap();
                    } else {
                        for i in 0..self.count {
                            out.write_line(self.strings.get(i as usize).map(String::as_str).unwrap_or("")).unwrap();
                        }
                    }
                }
                TY_CLASS => out.write_i32(self.class_offset).unwrap(),
                TY_INSTANCE | TY_FUNCTION | TY_PROTOTYPE => out.write_i32(self.address).unwrap(),
                _ => {}
            }
        }

        out.write_i32(self.parent).unwrap();
    }
}

pub fn int_var(name: &'static str, value: i32) -> SymSpec {
    let mut sym = SymSpec::blank(name, TY_INT, 0, -1);
    sym.ints.push(value);
    sym
}

pub fn const_int(name: &'static str, value: i32) -> SymSpec {
    let mut sym = int_var(name, value);
    sym.flags = F_CONST;
    sym
}

pub fn class(name: &'static str) -> SymSpec {
    SymSpec::blank(name, TY_CLASS, 0, -1)
}

pub fn member_int(name: &'static str, parent: i32) -> SymSpec {
    SymSpec::blank(name, TY_INT, F_MEMBER, parent)
}

pub fn instance(name: &'static str, parent: i32) -> SymSpec {
    SymSpec::blank(name, TY_INSTANCE, F_CONST, parent)
}

pub fn const_func(name: &'static str, address: i32, return_type: u32) -> SymSpec {
    let mut sym = SymSpec::blank(name, TY_FUNCTION, F_CONST | F_RETURN, -1);
    sym.count = 0;
    sym.address = address;
    sym.return_type = return_type;
    sym
}

pub fn const_void_func(name: &'static str, address: i32) -> SymSpec {
    let mut sym = SymSpec::blank(name, TY_FUNCTION, F_CONST, -1);
    sym.count = 0;
    sym.address = address;
    sym
}

pub fn build_module(version: u8, symbols: &[SymSpec], text: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u8(version).unwrap();
    out.write_u32(symbols.len() as u32).unwrap();
    for i in 0..symbols.len() {
        out.write_u32(i as u32).unwrap();
    }
    for sym in symbols {
        sym.encode(&mut out);
    }
    out.write_u32(text.len() as u32).unwrap();
    out.write_bytes(text).unwrap();
    out
}

/// Assembles a bytecode blob, tracking each opcode's address so callers can
/// wire up `BL`/`B` targets without hand-counting byte offsets.
#[derive(Default)]
pub struct CodeBuilder {
    buf: Vec<u8>,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn addr(&self) -> u32 {
        self.buf.len() as u32
    }

    pub fn pushi(&mut self, value: i32) -> &mut Self {
        self.buf.push(64);
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn pushv(&mut self, symbol: u32) -> &mut Self {
        self.buf.push(65);
        self.buf.extend_from_slice(&symbol.to_le_bytes());
        self
    }

    pub fn add(&mut self) -> &mut Self {
        self.buf.push(0);
        self
    }

    pub fn mul(&mut self) -> &mut Self {
        self.buf.push(2);
        self
    }

    pub fn movi(&mut self) -> &mut Self {
        self.buf.push(9);
        self
    }

    pub fn rsr(&mut self) -> &mut Self {
        self.buf.push(60);
        self
    }

    pub fn bl(&mut self, address: u32) -> &mut Self {
        self.buf.push(61);
        self.buf.extend_from_slice(&address.to_le_bytes());
        self
    }

    pub fn finish(&self) -> Vec<u8> {
        self.buf.clone()
    }
}
