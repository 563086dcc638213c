use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::disk::{self, DiskDialect};
use crate::error::{Result, VfsError};
use crate::node::{Directory, FileEntry, VfsNode};
use crate::policy::OverwritePolicy;
use crate::source::FileSource;

fn split_path(path: &str) -> Vec<&str> {
    path.split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// A single hierarchical namespace assembled from mounted disk containers
/// and host directories. Names are resolved case-insensitively with `/` as
/// the path separator.
pub struct Vfs {
    root: Directory,
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new()
    }
}

impl Vfs {
    pub fn new() -> Self {
        Self {
            root: Directory::new(String::new()),
        }
    }

    pub fn root(&self) -> &Directory {
        &self.root
    }

    /// Parses the disk container at `path` and merges its tree into the
    /// root under `policy`.
    pub fn mount_disk(&mut self, path: impl AsRef<Path>, policy: OverwritePolicy) -> Result<()> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let bytes = fs::read(path)?;
        let (node, dialect) = disk::parse(&label, bytes)?;
        debug!(path = %label, ?dialect, "mounted disk container");
        self.mount(node, "", policy)
    }

    /// Recursively walks a host directory and merges it into the root at
    /// `mount_point`, skipping zero-byte files.
    pub fn mount_host(
        &mut self,
        path: impl AsRef<Path>,
        mount_point: &str,
        policy: OverwritePolicy,
    ) -> Result<()> {
        let path = path.as_ref();
        let node = walk_host_dir(path, path.file_name().and_then(|n| n.to_str()).unwrap_or(""))?;
        debug!(path = %path.display(), mount_point, "mounted host directory");
        self.mount(node, mount_point, policy)
    }

    /// Merges `node` into the tree at `parent`, resolving collisions per
    /// `policy`. A directory's children are merged individually into the
    /// target (the directory's own name, typically synthetic, is not
    /// itself inserted); a file is merged under its own name.
    pub fn mount(&mut self, node: VfsNode, parent: &str, policy: OverwritePolicy) -> Result<()> {
        let segments = split_path(parent);
        let target = navigate_create(&mut self.root, &segments)?;
        match node {
            VfsNode::Directory(dir) => {
                for (_, child) in dir.into_children() {
                    target.merge_child(child, policy)?;
                }
                Ok(())
            }
            VfsNode::File(_) => target.merge_child(node, policy),
        }
    }

    /// Resolves a `/`-separated path to a node, case-insensitively.
    pub fn resolve(&self, path: &str) -> Option<&VfsNode> {
        let segments = split_path(path);
        if segments.is_empty() {
            return None;
        }
        let mut current = &self.root;
        for (i, segment) in segments.iter().enumerate() {
            let child = current.get(segment)?;
            if i + 1 == segments.len() {
                return Some(child);
            }
            current = child.as_directory()?;
        }
        None
    }

    /// Recursively searches the whole tree for a node whose own name matches
    /// `name` (case-insensitively), depth-first.
    pub fn find(&self, name: &str) -> Option<&VfsNode> {
        find_in(&self.root, name)
    }

    /// Creates (and returns) the directory at `path`, creating intermediate
    /// directories as needed.
    pub fn mkdir(&mut self, path: &str) -> Result<()> {
        let segments = split_path(path);
        navigate_create(&mut self.root, &segments)?;
        Ok(())
    }

    /// Removes the node at `path`. Fails with `NotFound` if no such node
    /// exists.
    pub fn remove(&mut self, path: &str) -> Result<()> {
        let segments = split_path(path);
        let (parent_segments, name) = match segments.split_last() {
            Some((last, rest)) => (rest, *last),
            None => return Err(VfsError::NotFound(path.to_string())),
        };
        let parent = navigate(&mut self.root, parent_segments)
            .ok_or_else(|| VfsError::NotFound(path.to_string()))?;
        parent
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| VfsError::NotFound(path.to_string()))
    }

    /// Serializes the tree as a disk container of the given dialect.
    pub fn save<W: Write>(
        &self,
        writer: &mut W,
        dialect: DiskDialect,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<()> {
        disk::write(writer, &self.root, dialect, timestamp.unwrap_or_else(Utc::now))
    }
}

fn navigate<'a>(root: &'a mut Directory, segments: &[&str]) -> Option<&'a mut Directory> {
    let mut current = root;
    for segment in segments {
        current = current.get_mut(segment)?.as_directory_mut()?;
    }
    Some(current)
}

fn navigate_create<'a>(root: &'a mut Directory, segments: &[&str]) -> Result<&'a mut Directory> {
    let mut current = root;
    for segment in segments {
        if current.get(segment).is_none() {
            current
                .merge_child(
                    VfsNode::Directory(Directory::new((*segment).to_string())),
                    OverwritePolicy::None,
                )
                .expect("inserting into a name slot just checked to be empty cannot fail");
        }
        current = current
            .get_mut(segment)
            .and_then(VfsNode::as_directory_mut)
            .ok_or_else(|| VfsError::NotADirectory {
                path: segment.to_string(),
            })?;
    }
    Ok(current)
}

fn find_in<'a>(dir: &'a Directory, name: &str) -> Option<&'a VfsNode> {
    for child in dir.iter() {
        if child.name().eq_ignore_ascii_case(name) {
            return Some(child);
        }
        if let Some(sub) = child.as_directory() {
            if let Some(found) = find_in(sub, name) {
                return Some(found);
            }
        }
    }
    None
}

fn walk_host_dir(path: &Path, name: &str) -> Result<VfsNode> {
    let mut dir = Directory::new(name.to_string());
    let metadata = fs::metadata(path)?;
    dir.modified = Some(metadata.modified().map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now()));

    let mut entries: Vec<_> = fs::read_dir(path)?.collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let entry_path = entry.path();
        let file_type = entry.file_type()?;
        let entry_name = entry.file_name().to_string_lossy().into_owned();

        if file_type.is_dir() {
            let child = walk_host_dir(&entry_path, &entry_name)?;
            dir.merge_child(child, OverwritePolicy::All)?;
        } else if file_type.is_file() {
            let metadata = entry.metadata()?;
            if metadata.len() == 0 {
                warn!(path = %entry_path.display(), "skipping zero-byte host file");
                continue;
            }
            let modified = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            dir.merge_child(
                VfsNode::File(FileEntry {
                    name: entry_name,
                    modified,
                    source: FileSource::Host { path: entry_path },
                }),
                OverwritePolicy::All,
            )?;
        }
    }

    Ok(VfsNode::Directory(dir))
}
