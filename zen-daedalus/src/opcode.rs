//! Daedalus value types, opcodes, and instruction decoding.

use zen_stream::ReadExt;

/// Daedalus's closed set of value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Void,
    Float,
    Int,
    String,
    Class,
    Function,
    Prototype,
    Instance,
}

impl DataType {
    pub fn from_u32(v: u32) -> Self {
        match v & 0xF {
            1 => Self::Float,
            2 => Self::Int,
            3 => Self::String,
            4 => Self::Class,
            5 => Self::Function,
            6 => Self::Prototype,
            7 => Self::Instance,
            _ => Self::Void,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Float => "float",
            Self::Int => "int",
            Self::String => "string",
            Self::Class => "class",
            Self::Function => "function",
            Self::Prototype => "prototype",
            Self::Instance => "instance",
        }
    }
}

/// Bitset flags stored in a symbol's packed `properties` word.
pub mod symbol_flag {
    pub const CONST: u32 = 1 << 0;
    pub const RETURN: u32 = 1 << 1;
    pub const MEMBER: u32 = 1 << 2;
    pub const EXTERNAL: u32 = 1 << 3;
    pub const MERGED: u32 = 1 << 4;
    pub const TRAP_ACCESS: u32 = 1 << 6;
    pub const FUNC_LOCALS: u32 = 1 << 7;
}

/// All opcodes understood by the stack VM.
///
/// In operand documentation, `a`/`b` are popped ints, `m`/`n` are popped
/// values of any non-reference type, and `x`/`y` are popped references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Or,
    Andb,
    Lt,
    Gt,
    Movi,
    Orr,
    And,
    Lsl,
    Lsr,
    Lte,
    Eq,
    Neq,
    Gte,
    Addmovi,
    Submovi,
    Mulmovi,
    Divmovi,
    Plus,
    Negate,
    Not,
    Cmpl,
    Nop,
    Rsr,
    Bl,
    Be,
    Pushi,
    Pushv,
    Pushvi,
    Movs,
    Movss,
    Movvf,
    Movf,
    Movvi,
    B,
    Bz,
    Gmovi,
    Pushvv,
    /// An opcode byte the loader doesn't recognize. Kept rather than
    /// rejected outright since badly-compiled scripts in the wild do
    /// contain stray bytes that are never actually reached at runtime.
    Unknown(u8),
}

impl Opcode {
    fn from_byte(b: u8) -> Self {
        match b {
            0 => Self::Add,
            1 => Self::Sub,
            2 => Self::Mul,
            3 => Self::Div,
            4 => Self::Mod,
            5 => Self::Or,
            6 => Self::Andb,
            7 => Self::Lt,
            8 => Self::Gt,
            9 => Self::Movi,
            11 => Self::Orr,
            12 => Self::And,
            13 => Self::Lsl,
            14 => Self::Lsr,
            15 => Self::Lte,
            16 => Self::Eq,
            17 => Self::Neq,
            18 => Self::Gte,
            19 => Self::Addmovi,
            20 => Self::Submovi,
            21 => Self::Mulmovi,
            22 => Self::Divmovi,
            30 => Self::Plus,
            31 => Self::Negate,
            32 => Self::Not,
            33 => Self::Cmpl,
            45 => Self::Nop,
            60 => Self::Rsr,
            61 => Self::Bl,
            62 => Self::Be,
            64 => Self::Pushi,
            65 => Self::Pushv,
            67 => Self::Pushvi,
            70 => Self::Movs,
            71 => Self::Movss,
            72 => Self::Movvf,
            73 => Self::Movf,
            74 => Self::Movvi,
            75 => Self::B,
            76 => Self::Bz,
            80 => Self::Gmovi,
            245 => Self::Pushvv,
            other => Self::Unknown(other),
        }
    }
}

/// A single decoded bytecode instruction plus its size in bytes, so the
/// VM can advance the program counter past whichever operands were read.
#[derive(Debug, Clone, Copy)]
pub struct Instruction {
    pub op: Opcode,
    pub address: u32,
    pub symbol: u32,
    pub immediate: i32,
    pub index: u8,
    pub size: u32,
}

impl Instruction {
    pub fn decode(r: &mut impl ReadExt) -> zen_stream::Result<Self> {
        let op = Opcode::from_byte(r.read_u8()?);
        let mut size = 1u32;
        let mut address = 0;
        let mut symbol = 0;
        let mut immediate = 0;
        let mut index = 0;

        match op {
            Opcode::Bl | Opcode::Bz | Opcode::B => {
                address = r.read_u32()?;
                size += 4;
            }
            Opcode::Pushi => {
                immediate = r.read_i32()?;
                size += 4;
            }
            Opcode::Be | Opcode::Pushv | Opcode::Pushvi | Opcode::Gmovi => {
                symbol = r.read_u32()?;
                size += 4;
            }
            Opcode::Pushvv => {
                symbol = r.read_u32()?;
                index = r.read_u8()?;
                size += 5;
            }
            _ => {}
        }

        Ok(Self {
            op,
            address,
            symbol,
            immediate,
            index,
            size,
        })
    }
}
