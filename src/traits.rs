use crate::error::RemoteError;

/// A remote session with a stateful working-directory cursor.
///
/// Implement this to estimate anything that can be browsed one directory at
/// a time: FTP servers ([`FtpConnection`](crate::FtpConnection)), a local
/// mirror ([`LocalConnection`](crate::LocalConnection)), or a test double.
///
/// # Cursor contract
///
/// The estimator borrows the connection mutably for the whole traversal and
/// moves the cursor with [`change_directory`](Connection::change_directory).
/// Every call it makes leaves the cursor where the caller had it, including
/// after a failed descent.
///
/// # Error Handling
///
/// [`size_of`](Connection::size_of) on something that is not a regular file
/// must fail with [`RemoteError::Permission`] and a message that says so
/// (the default directory sentinel is `not a regular file`). Any other
/// failure marks the entry as unclassifiable.
///
/// # Example
///
/// ```rust,ignore
/// use ftpdu::{Connection, RemoteError};
///
/// struct Flat(Vec<(String, u64)>);
///
/// impl Connection for Flat {
///     fn change_directory(&mut self, path: &str) -> Result<(), RemoteError> {
///         Err(RemoteError::Permission { code: 550, message: format!("{path}: no such directory") })
///     }
///     fn current_path(&mut self) -> Result<String, RemoteError> {
///         Ok("/".into())
///     }
///     fn list_entries(&mut self) -> Result<Vec<String>, RemoteError> {
///         Ok(self.0.iter().map(|(n, _)| n.clone()).collect())
///     }
///     fn size_of(&mut self, name: &str) -> Result<u64, RemoteError> {
///         self.0.iter().find(|(n, _)| n == name).map(|(_, s)| *s).ok_or_else(|| {
///             RemoteError::Permission { code: 550, message: format!("{name}: not a regular file") }
///         })
///     }
/// }
/// ```
pub trait Connection {
    /// Move the cursor to `path`, absolute or relative to the cursor.
    fn change_directory(&mut self, path: &str) -> Result<(), RemoteError>;

    /// The absolute path of the cursor.
    fn current_path(&mut self) -> Result<String, RemoteError>;

    /// Names in the cursor's directory. May include `.` and `..`.
    fn list_entries(&mut self) -> Result<Vec<String>, RemoteError>;

    /// Exact size of the regular file `name`, relative to the cursor.
    fn size_of(&mut self, name: &str) -> Result<u64, RemoteError>;

    /// End the session. The default does nothing.
    fn close(&mut self) -> Result<(), RemoteError> {
        Ok(())
    }
}

/// Decides which entries are skipped outright: never sized, never entered.
///
/// Typical use is hiding control-panel or access-restricted system
/// directories that would always fail or pollute the diagnostics.
/// For a fixed set of names, prefer `.skipping()` on the builder.
///
/// # Example
///
/// ```rust
/// use ftpdu::Blacklist;
///
/// struct Hidden;
///
/// impl Blacklist for Hidden {
///     fn is_blacklisted(&self, name: &str, _path: &str) -> bool {
///         name.starts_with('.')
///     }
/// }
/// ```
pub trait Blacklist {
    /// `name` is the bare entry name, `path` its logical path.
    fn is_blacklisted(&self, name: &str, path: &str) -> bool;
}
