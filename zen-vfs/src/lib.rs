//! A case-insensitive virtual file system overlaying ZenGin disk containers
//! and host directories under a single `/`-separated namespace.
//!
//! ```no_run
//! use zen_vfs::{OverwritePolicy, Vfs};
//!
//! # fn run() -> zen_vfs::Result<()> {
//! let mut vfs = Vfs::new();
//! vfs.mount_disk("Data/Worlds.vdf", OverwritePolicy::None)?;
//! vfs.mount_host("mods/", "", OverwritePolicy::Newer)?;
//! let node = vfs.resolve("Textures/Wall.TGA");
//! # Ok(())
//! # }
//! ```

pub mod disk;
mod dos_time;
pub mod error;
pub mod node;
pub mod policy;
pub mod source;
mod vfs;

pub use disk::DiskDialect;
pub use error::{Result, VfsError};
pub use node::{Directory, FileEntry, VfsNode};
pub use policy::OverwritePolicy;
pub use source::{FileSource, ReadSeek};
pub use vfs::Vfs;
