//! Error types for the stream abstraction

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid UTF-8 in stream: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("seek to {offset} from {origin:?} is out of bounds (stream length {len})")]
    SeekOutOfBounds {
        offset: i64,
        origin: crate::SeekOrigin,
        len: u64,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
