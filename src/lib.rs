//! # ftpdu
//!
//! Approximate disk usage of a directory tree reached over FTP.
//!
//! FTP listings are bare names with no type flag, so ftpdu probes every entry
//! with a size query: a size means a file, a "not a regular file" refusal
//! means a directory to descend into, anything else is counted as zero and
//! reported. Descent is depth-limited; a branch past the limit is credited a
//! fixed estimate instead of being listed.
//!
//! The result is a best-effort figure. [`Report::is_approximate`] says
//! whether any branch was estimated, skipped after an error, or held entries
//! that could not be classified.
//!
//! ftpdu owns the traversal, the [`Connection`] contract and the report. The
//! FTP transport ([`FtpConnection`]) and a local-filesystem stand-in
//! ([`LocalConnection`]) ship with it; any other session type can implement
//! [`Connection`].
//!
//! # Quick Start
//!
//! ```rust
//! use ftpdu::{Connection, RemoteError};
//!
//! // A flat in-memory directory for demonstration
//! struct Flat(Vec<(&'static str, u64)>);
//!
//! impl Connection for Flat {
//!     fn change_directory(&mut self, path: &str) -> Result<(), RemoteError> {
//!         Err(RemoteError::Permission { code: 550, message: format!("{path}: no such directory") })
//!     }
//!     fn current_path(&mut self) -> Result<String, RemoteError> {
//!         Ok("/srv".into())
//!     }
//!     fn list_entries(&mut self) -> Result<Vec<String>, RemoteError> {
//!         Ok(self.0.iter().map(|(n, _)| n.to_string()).collect())
//!     }
//!     fn size_of(&mut self, name: &str) -> Result<u64, RemoteError> {
//!         self.0.iter().find(|(n, _)| *n == name).map(|(_, s)| *s).ok_or_else(|| {
//!             RemoteError::Permission { code: 550, message: format!("{name}: No such file") }
//!         })
//!     }
//! }
//!
//! let mut conn = Flat(vec![("index.html", 1200), ("style.css", 800)]);
//! let report = ftpdu::estimate()
//!     .subtree(&mut conn, "", "/srv")
//!     .unwrap();
//!
//! assert_eq!(report.total_bytes, 2000);
//! assert!(!report.is_approximate());
//! ```
//!
//! # Over FTP
//!
//! ```rust,no_run
//! use ftpdu::{Connection, FtpConnection};
//!
//! let mut ftp = FtpConnection::connect_and_login("example.com", "bob", "secret")?;
//! ftp.change_directory("public_html/wp-content")?;
//! let parent = ftp.current_path()?;
//!
//! let report = ftpdu::estimate()
//!     .skipping([".cpanel"])
//!     .subtree(&mut ftp, "", &parent)?;
//! println!("{} Bytes", report.total_bytes);
//!
//! ftp.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]

mod builder;
mod classify;
mod engine;
mod entry;
mod error;
mod ftp;
mod local;
mod results;
mod traits;

// ── Public re-exports ─────────────────────────────────────────────────────────

pub use builder::{EstimateBuilder, DEFAULT_MAX_DEPTH, DEFAULT_UNEXPLORED_ESTIMATE};
pub use classify::{
    classify, entry_name, refuses_non_regular_file, sanitize, Listing, DEFAULT_DIRECTORY_SENTINEL,
};
pub use entry::{EntryKind, PathContext};
pub use error::{EstimateError, RemoteError};
pub use ftp::{FtpConfig, FtpConnection, DEFAULT_FTP_PORT};
pub use local::LocalConnection;
pub use results::{Report, ScanStats};
pub use traits::{Blacklist, Connection};

// ── Entry points ──────────────────────────────────────────────────────────────

/// Create a new [`EstimateBuilder`] to configure and run an estimate.
///
/// # Example
///
/// ```rust
/// use ftpdu::LocalConnection;
///
/// let dir = std::env::temp_dir();
/// let mut conn = LocalConnection::new(&dir).unwrap();
/// let parent = dir.to_string_lossy().into_owned();
///
/// let report = ftpdu::estimate()
///     .max_depth(0)
///     .subtree(&mut conn, "", &parent)
///     .unwrap();
///
/// println!("~{} bytes directly in {}", report.total_bytes, parent);
/// ```
pub fn estimate() -> EstimateBuilder {
    EstimateBuilder::default()
}

/// Approximate size in bytes of `path` below `parent`, where the cursor is.
///
/// Shorthand for `estimate()` with no blacklist and the default sentinel.
/// Problems are logged and folded into the figure; use the builder to
/// inspect them.
pub fn estimate_subtree<C>(
    conn: &mut C,
    path: &str,
    parent: &str,
    max_depth: usize,
    unexplored_estimate: u64,
) -> u64
where
    C: Connection + ?Sized,
{
    estimate()
        .max_depth(max_depth)
        .unexplored_estimate(unexplored_estimate)
        .subtree(conn, path, parent)
        .map_or(0, |report| report.total_bytes)
}

/// Approximate size in bytes of `parent`, from a pre-supplied listing of
/// its entries rather than the server's.
///
/// See [`estimate_subtree`] for the shorthand's defaults.
pub fn estimate_from_listing<C, I, S>(
    conn: &mut C,
    names: I,
    parent: &str,
    max_depth: usize,
    unexplored_estimate: u64,
) -> u64
where
    C: Connection + ?Sized,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    estimate()
        .max_depth(max_depth)
        .unexplored_estimate(unexplored_estimate)
        .listing(conn, names, parent)
        .map_or(0, |report| report.total_bytes)
}
