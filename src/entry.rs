use crate::error::RemoteError;

/// What a size probe revealed about a listing entry.
///
/// Listings carry bare names with no type flag, so the only portable signal
/// is whether the server will report a size for the name.
#[derive(Debug)]
pub enum EntryKind {
    /// A regular file of exactly this many bytes.
    File(u64),

    /// The server refused to size it because it is not a regular file.
    Directory,

    /// Neither sizeable nor recognisably a directory: broken links, device
    /// files, server oddities. Carries the probe's error for diagnostics.
    Unknown(RemoteError),
}

impl EntryKind {
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory)
    }
}

/// A directory position during traversal.
///
/// `display` is the logical path used in diagnostics (parent + names as the
/// caller spelled them). `remote` is the absolute path the cursor is moved
/// back to after a child has been explored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathContext {
    pub display: String,
    pub remote: String,
}

impl PathContext {
    pub fn new(display: impl Into<String>, remote: impl Into<String>) -> Self {
        Self {
            display: display.into(),
            remote: remote.into(),
        }
    }

    /// The context of `name` inside this directory.
    pub fn child(&self, name: &str) -> Self {
        Self {
            display: join_remote(&self.display, name),
            remote: join_remote(&self.remote, name),
        }
    }
}

/// Join remote path segments with `/`. Empty segments are no-ops.
pub(crate) fn join_remote(parent: &str, name: &str) -> String {
    if name.is_empty() {
        parent.to_string()
    } else if parent.is_empty() {
        name.to_string()
    } else if parent.ends_with('/') {
        format!("{parent}{name}")
    } else {
        format!("{parent}/{name}")
    }
}
