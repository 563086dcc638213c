use chrono::{DateTime, Utc};

/// Controls how a node being merged into an existing tree resolves a name
/// collision, whether the collision is file-vs-file, directory-vs-directory,
/// or a file replacing a directory (or vice versa).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwritePolicy {
    /// Keep the existing node; discard the incoming one.
    None,
    /// Always replace the existing node with the incoming one.
    All,
    /// Keep whichever node has the newer timestamp.
    Newer,
    /// Keep whichever node has the older timestamp.
    Older,
}

impl OverwritePolicy {
    /// Returns `true` if the incoming node (with timestamp `incoming`)
    /// should replace the existing node (with timestamp `existing`).
    pub fn should_replace(self, existing: DateTime<Utc>, incoming: DateTime<Utc>) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::Newer => incoming > existing,
            Self::Older => incoming < existing,
        }
    }
}
