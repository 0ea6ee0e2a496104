use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::RemoteError;
use crate::traits::Connection;

/// A [`Connection`] over the local filesystem.
///
/// Behaves the way an FTP server does towards the estimator: listings
/// include `.` and `..`, and sizing a directory is refused with
/// `<name>: not a regular file`. Handy for estimating a mirrored copy and
/// for exercising the traversal without a server.
///
/// The cursor is tracked lexically, so `..` after entering a symlinked
/// directory returns to where the link was, as on most FTP servers.
pub struct LocalConnection {
    cwd: PathBuf,
}

impl LocalConnection {
    /// Start with the cursor at `start`, made absolute.
    pub fn new(start: impl AsRef<Path>) -> Result<Self, RemoteError> {
        let start = start.as_ref();
        let cwd = if start.is_absolute() {
            normalize(start)
        } else {
            normalize(&std::env::current_dir()?.join(start))
        };

        if !fs::metadata(&cwd).map_err(|e| refusal(start, e))?.is_dir() {
            return Err(not_a_directory(start));
        }

        Ok(Self { cwd })
    }
}

impl Connection for LocalConnection {
    fn change_directory(&mut self, path: &str) -> Result<(), RemoteError> {
        let target = normalize(&self.cwd.join(path));
        let meta = fs::metadata(&target).map_err(|e| refusal(Path::new(path), e))?;
        if !meta.is_dir() {
            return Err(not_a_directory(Path::new(path)));
        }
        self.cwd = target;
        Ok(())
    }

    fn current_path(&mut self) -> Result<String, RemoteError> {
        Ok(self.cwd.to_string_lossy().into_owned())
    }

    fn list_entries(&mut self) -> Result<Vec<String>, RemoteError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.cwd).map_err(|e| refusal(&self.cwd, e))? {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();

        let mut listing = vec![".".to_string(), "..".to_string()];
        listing.extend(names);
        Ok(listing)
    }

    fn size_of(&mut self, name: &str) -> Result<u64, RemoteError> {
        // Follows symlinks: a dangling one fails here as NotFound
        let meta = fs::metadata(self.cwd.join(name))?;
        if meta.is_file() {
            Ok(meta.len())
        } else if meta.is_dir() {
            Err(RemoteError::Permission {
                code:    550,
                message: format!("{name}: not a regular file"),
            })
        } else {
            Err(RemoteError::Permission {
                code:    550,
                message: format!("{name}: special file"),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Map a filesystem refusal onto the FTP-style permanent error a server
/// would send, keeping other IO failures as they are.
fn refusal(path: &Path, err: io::Error) -> RemoteError {
    match err.kind() {
        io::ErrorKind::NotFound => RemoteError::Permission {
            code:    550,
            message: format!("{}: No such file or directory", path.display()),
        },
        io::ErrorKind::PermissionDenied => RemoteError::Permission {
            code:    550,
            message: format!("{}: Permission denied", path.display()),
        },
        _ => RemoteError::Io(err),
    }
}

fn not_a_directory(path: &Path) -> RemoteError {
    RemoteError::Permission {
        code:    550,
        message: format!("{}: Not a directory", path.display()),
    }
}
