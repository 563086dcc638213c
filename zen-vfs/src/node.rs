use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::policy::OverwritePolicy;
use crate::source::FileSource;

/// A node in the virtual file system tree: either a directory holding
/// further nodes, or a file whose bytes are opened on demand.
#[derive(Clone)]
pub enum VfsNode {
    Directory(Directory),
    File(FileEntry),
}

/// A directory's children, keyed by lowercased name so that both uniqueness
/// and iteration order (sorted, case-insensitive) fall out of the map's own
/// invariants.
#[derive(Clone, Default)]
pub struct Directory {
    pub name: String,
    pub modified: Option<DateTime<Utc>>,
    children: BTreeMap<String, VfsNode>,
}

#[derive(Clone)]
pub struct FileEntry {
    pub name: String,
    pub modified: DateTime<Utc>,
    pub source: FileSource,
}

fn lookup_key(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

impl VfsNode {
    pub fn new_root() -> Self {
        Self::Directory(Directory {
            name: String::new(),
            modified: None,
            children: BTreeMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Directory(d) => &d.name,
            Self::File(f) => &f.name,
        }
    }

    pub fn modified(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Directory(d) => d.modified,
            Self::File(f) => Some(f.modified),
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    pub fn as_directory(&self) -> Option<&Directory> {
        match self {
            Self::Directory(d) => Some(d),
            Self::File(_) => None,
        }
    }

    pub fn as_directory_mut(&mut self) -> Option<&mut Directory> {
        match self {
            Self::Directory(d) => Some(d),
            Self::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileEntry> {
        match self {
            Self::File(f) => Some(f),
            Self::Directory(_) => None,
        }
    }
}

impl Directory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modified: None,
            children: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&VfsNode> {
        self.children.get(&lookup_key(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut VfsNode> {
        self.children.get_mut(&lookup_key(name))
    }

    /// Children in case-insensitive sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &VfsNode> {
        self.children.values()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn remove(&mut self, name: &str) -> Option<VfsNode> {
        self.children.remove(&lookup_key(name))
    }

    /// Consumes the directory, yielding its children keyed by lookup key.
    pub(crate) fn into_children(self) -> BTreeMap<String, VfsNode> {
        self.children
    }

    /// Inserts `node` under its own name, resolving a name collision against
    /// `policy`. If `node` and the existing entry are both directories, their
    /// children are merged pairwise rather than one replacing the other.
    pub fn merge_child(&mut self, node: VfsNode, policy: OverwritePolicy) -> Result<()> {
        let key = lookup_key(node.name());
        match self.children.remove(&key) {
            None => {
                self.children.insert(key, node);
                Ok(())
            }
            Some(VfsNode::Directory(mut existing)) => match node {
                VfsNode::Directory(incoming) => {
                    for (_, child) in incoming.children {
                        existing.merge_child(child, policy)?;
                    }
                    if let Some(ts) = incoming.modified {
                        let existing_ts = existing.modified.unwrap_or_else(Utc::now);
                        if policy.should_replace(existing_ts, ts) {
                            existing.modified = Some(ts);
                        }
                    }
                    self.children.insert(key, VfsNode::Directory(existing));
                    Ok(())
                }
                VfsNode::File(incoming) => {
                    let existing_ts = existing.modified.unwrap_or_else(Utc::now);
                    let replace = policy.should_replace(existing_ts, incoming.modified);
                    self.children.insert(
                        key,
                        if replace {
                            VfsNode::File(incoming)
                        } else {
                            VfsNode::Directory(existing)
                        },
                    );
                    Ok(())
                }
            },
            Some(VfsNode::File(existing)) => match node {
                VfsNode::File(incoming) => {
                    let replace = policy.should_replace(existing.modified, incoming.modified);
                    self.children.insert(
                        key,
                        if replace {
                            VfsNode::File(incoming)
                        } else {
                            VfsNode::File(existing)
                        },
                    );
                    Ok(())
                }
                VfsNode::Directory(incoming) => {
                    let incoming_ts = incoming.modified.unwrap_or_else(Utc::now);
                    let replace = policy.should_replace(existing.modified, incoming_ts);
                    self.children.insert(
                        key,
                        if replace {
                            VfsNode::Directory(incoming)
                        } else {
                            VfsNode::File(existing)
                        },
                    );
                    Ok(())
                }
            },
        }
    }
}

impl std::fmt::Debug for VfsNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Directory(d) => f
                .debug_struct("Directory")
                .field("name", &d.name)
                .field("children", &d.children.len())
                .finish(),
            Self::File(file) => f
                .debug_struct("File")
                .field("name", &file.name)
                .field("modified", &file.modified)
                .finish(),
        }
    }
}
