use tracing::debug;

use crate::entry::EntryKind;
use crate::error::RemoteError;
use crate::traits::Connection;

/// Sentinel the estimator looks for in a refused size query, unless
/// configured otherwise. ProFTPD and the local connection both say it.
pub const DEFAULT_DIRECTORY_SENTINEL: &str = "not a regular file";

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Probe `name` with a size query and classify it.
///
/// Does not move the cursor.
pub fn classify<C>(conn: &mut C, name: &str, sentinel: &str) -> EntryKind
where
    C: Connection + ?Sized,
{
    match conn.size_of(name) {
        Ok(size) => EntryKind::File(size),
        Err(e) if refuses_non_regular_file(&e, sentinel) => EntryKind::Directory,
        Err(e) => EntryKind::Unknown(e),
    }
}

/// Whether `err` is the server refusing to size something that is not a
/// regular file.
///
/// This reads the server's free-form reply text, which differs between
/// implementations; it is the one place that knowledge lives.
pub fn refuses_non_regular_file(err: &RemoteError, sentinel: &str) -> bool {
    match err {
        RemoteError::Permission { message, .. } => {
            message.to_lowercase().contains(&sentinel.to_lowercase())
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Sanitizing
// ---------------------------------------------------------------------------

/// A raw listing split by what each entry turned out to be.
#[derive(Debug, Default)]
pub struct Listing {
    /// Regular files with their exact sizes.
    pub files: Vec<(String, u64)>,

    /// Entries to descend into.
    pub directories: Vec<String>,

    /// Entries that could not be classified, with the probe's error.
    pub unknown: Vec<(String, RemoteError)>,
}

impl Listing {
    /// Sum of the file sizes.
    pub fn file_bytes(&self) -> u64 {
        self.files.iter().map(|(_, size)| *size).fold(0, u64::saturating_add)
    }
}

/// Normalise one raw listing name.
///
/// Returns `None` for the `.`/`..` pseudo-entries and blanks. Some servers
/// answer NLST with `dir/name`; only the last segment is kept. Pre-supplied
/// listings are checked for such names before they get here.
pub fn entry_name(raw: &str) -> Option<&str> {
    let trimmed = raw.trim_end_matches(&['\r', '\n'][..]);
    let name = trimmed.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    match name {
        "" | "." | ".." => None,
        name => Some(name),
    }
}

/// Classify every entry of a raw listing, in input order.
///
/// Duplicates are kept; callers handing in a pre-supplied list own its
/// cleanliness.
pub fn sanitize<C, I, S>(conn: &mut C, names: I, sentinel: &str) -> Listing
where
    C: Connection + ?Sized,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut listing = Listing::default();

    for raw in names {
        let Some(name) = entry_name(raw.as_ref()) else {
            continue;
        };

        match classify(conn, name, sentinel) {
            EntryKind::File(size) => {
                debug!(name, size, "file");
                listing.files.push((name.to_string(), size));
            }
            EntryKind::Directory => {
                debug!(name, "directory");
                listing.directories.push(name.to_string());
            }
            EntryKind::Unknown(err) => {
                debug!(name, error = %err, "unclassifiable");
                listing.unknown.push((name.to_string(), err));
            }
        }
    }

    listing
}
