//! Error types for the virtual file system

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VfsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("stream error: {0}")]
    Stream(#[from] zen_stream::Error),

    #[error("broken disk signature in {path}")]
    BrokenSignature { path: String },

    #[error("disk version {found} at {path} is not supported (expected 1)")]
    UnsupportedVersion { path: String, found: u32 },

    #[error("disk catalog alignment {found} at {path} is not supported (expected 80)")]
    UnsupportedAlignment { path: String, found: u32 },

    #[error("path not found: {0}")]
    NotFound(String),

    #[error("a {kind} already exists at {path}")]
    AlreadyExists { path: String, kind: &'static str },

    #[error("{path} is not a directory")]
    NotADirectory { path: String },

    #[error("{path} is not a file")]
    NotAFile { path: String },
}

pub type Result<T> = std::result::Result<T, VfsError>;
