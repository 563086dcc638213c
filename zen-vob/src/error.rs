//! Error types for VOb loading/saving.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("archive error: {0}")]
    Archive(#[from] zen_archive::Error),

    #[error("{resource}: {context}")]
    Parser {
        resource: &'static str,
        context: String,
    },
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
