/// Tag identifying the wire type of a single archive entry.
///
/// ASCII spells these out textually (`name=type:value`); BINSAFE stores them
/// as a one-byte tag per entry; BINARY carries no tag at all and relies on
/// the caller (the VOb loader) to know the field's type from its schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    String,
    Int,
    Float,
    Byte,
    Word,
    Enum,
    Bool,
    Color,
    Vec3,
    RawFloat,
    Raw,
    /// BINSAFE-only: a pointer into the shared hash/key table, used for
    /// the special back-reference and absent-object class name fields.
    Hash,
}

impl EntryType {
    /// The lowercase keyword ASCII uses for this type, e.g. `rawFloat`.
    pub fn ascii_keyword(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Byte => "byte",
            Self::Word => "word",
            Self::Enum => "enum",
            Self::Bool => "bool",
            Self::Color => "color",
            Self::Vec3 => "vec3",
            Self::RawFloat => "rawFloat",
            Self::Raw => "raw",
            Self::Hash => "hash",
        }
    }

    pub fn from_ascii_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "string" => Self::String,
            "int" => Self::Int,
            "float" => Self::Float,
            "byte" => Self::Byte,
            "word" => Self::Word,
            "enum" => Self::Enum,
            "bool" => Self::Bool,
            "color" => Self::Color,
            "vec3" => Self::Vec3,
            "rawFloat" => Self::RawFloat,
            "raw" => Self::Raw,
            _ => return None,
        })
    }

    /// The one-byte BINSAFE type tag.
    pub const fn binsafe_tag(self) -> u8 {
        match self {
            Self::String => 1,
            Self::Int => 2,
            Self::Float => 3,
            Self::Byte => 4,
            Self::Word => 5,
            Self::Bool => 6,
            Self::Vec3 => 7,
            Self::Color => 8,
            Self::Raw => 9,
            Self::RawFloat => 10,
            Self::Enum => 11,
            Self::Hash => 12,
        }
    }

    pub fn from_binsafe_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            1 => Self::String,
            2 => Self::Int,
            3 => Self::Float,
            4 => Self::Byte,
            5 => Self::Word,
            6 => Self::Bool,
            7 => Self::Vec3,
            8 => Self::Color,
            9 => Self::Raw,
            10 => Self::RawFloat,
            11 => Self::Enum,
            12 => Self::Hash,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[EntryType] = &[
        EntryType::String,
        EntryType::Int,
        EntryType::Float,
        EntryType::Byte,
        EntryType::Word,
        EntryType::Enum,
        EntryType::Bool,
        EntryType::Color,
        EntryType::Vec3,
        EntryType::RawFloat,
        EntryType::Raw,
        EntryType::Hash,
    ];

    #[test]
    fn binsafe_tag_round_trips_for_every_variant() {
        for ty in ALL {
            let tag = ty.binsafe_tag();
            assert_eq!(EntryType::from_binsafe_tag(tag), Some(*ty));
        }
    }

    #[test]
    fn ascii_keyword_round_trips_for_every_variant_but_hash() {
        for ty in ALL {
            if *ty == EntryType::Hash {
                continue;
            }
            let keyword = ty.ascii_keyword();
            assert_eq!(EntryType::from_ascii_keyword(keyword), Some(*ty));
        }
    }

    #[test]
    fn unknown_ascii_keyword_is_none() {
        assert_eq!(EntryType::from_ascii_keyword("nonsense"), None);
    }
}
