//! Error types for archive header/back-end parsing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stream error: {0}")]
    Stream(#[from] zen_stream::Error),

    #[error("{resource}: {context}")]
    Parser {
        resource: &'static str,
        context: String,
    },

    #[error("{resource}: expected entry type {expected:?}, found {found:?}")]
    EntryTypeMismatch {
        resource: &'static str,
        expected: crate::entry::EntryType,
        found: crate::entry::EntryType,
    },

    #[error("back reference to unknown object index {0}")]
    UnknownBackReference(u32),

    #[error("archive version {found} is not supported (expected 1)")]
    UnsupportedVersion { found: u32 },
}

impl Error {
    pub fn parser(resource: &'static str, context: impl Into<String>) -> Self {
        Self::Parser {
            resource,
            context: context.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
