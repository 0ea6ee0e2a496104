use std::collections::HashSet;

use crate::classify::DEFAULT_DIRECTORY_SENTINEL;
use crate::engine::{run_listing, run_subtree, EngineOptions, WalkConfig};
use crate::error::EstimateError;
use crate::results::Report;
use crate::traits::{Blacklist, Connection};

/// Directory levels explored below the start when not configured.
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Bytes credited to a branch the depth limit leaves unexplored.
pub const DEFAULT_UNEXPLORED_ESTIMATE: u64 = 50_000;

// ---------------------------------------------------------------------------
// EstimateBuilder
// ---------------------------------------------------------------------------

/// Entry point for configuring and running an estimate.
///
/// Created via [`ftpdu::estimate()`](crate::estimate). Configure with chained
/// builder methods, then call [`subtree()`](EstimateBuilder::subtree) or
/// [`listing()`](EstimateBuilder::listing) with a connection.
///
/// # Example
///
/// ```rust,ignore
/// let report = ftpdu::estimate()
///     .max_depth(3)
///     .unexplored_estimate(100_000)
///     .skipping([".cpanel", ".trash"])
///     .subtree(&mut conn, "", "public_html")?;
/// ```
pub struct EstimateBuilder {
    blacklist:           Option<Box<dyn Blacklist>>,
    max_depth:           usize,
    unexplored_estimate: u64,
    sentinel:            String,
}

impl Default for EstimateBuilder {
    fn default() -> Self {
        Self {
            blacklist:           None,
            max_depth:           DEFAULT_MAX_DEPTH,
            unexplored_estimate: DEFAULT_UNEXPLORED_ESTIMATE,
            sentinel:            DEFAULT_DIRECTORY_SENTINEL.to_string(),
        }
    }
}

impl EstimateBuilder {
    // ── Depth ─────────────────────────────────────────────────────────────

    /// How many directory levels may be entered. `0` sizes only the files
    /// directly in the start directory and estimates every subdirectory.
    /// Defaults to [`DEFAULT_MAX_DEPTH`].
    pub fn max_depth(mut self, d: usize) -> Self {
        self.max_depth = d;
        self
    }

    /// Bytes credited for each directory the depth limit leaves unexplored.
    /// Defaults to [`DEFAULT_UNEXPLORED_ESTIMATE`].
    pub fn unexplored_estimate(mut self, bytes: u64) -> Self {
        self.unexplored_estimate = bytes;
        self
    }

    // ── Blacklist ─────────────────────────────────────────────────────────

    /// Set a custom blacklist.
    ///
    /// For skipping a fixed set of names, prefer `.skipping()`.
    pub fn with_blacklist(mut self, b: impl Blacklist + 'static) -> Self {
        self.blacklist = Some(Box::new(b));
        self
    }

    /// Shorthand for an exact-name blacklist.
    ///
    /// Equivalent to `.with_blacklist()` with a set of names. Matching is
    /// case-sensitive, as remote filesystems usually are.
    pub fn skipping<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklist = Some(Box::new(NameBlacklist {
            names: names.into_iter().map(Into::into).collect(),
        }));
        self
    }

    // ── Classification ────────────────────────────────────────────────────

    /// Substring of the server's refusal that marks an entry as a directory
    /// when its size is queried. Case-insensitive. Defaults to
    /// [`DEFAULT_DIRECTORY_SENTINEL`].
    pub fn directory_sentinel(mut self, s: impl Into<String>) -> Self {
        self.sentinel = s.into();
        self
    }

    // ── Execute ───────────────────────────────────────────────────────────

    /// Estimate the subtree `name` below `parent`.
    ///
    /// The cursor must be at `parent`; it is there again when this returns.
    /// An empty `name` estimates `parent` itself.
    ///
    /// # Errors
    ///
    /// Returns `Err` only for an invalid configuration (empty sentinel).
    /// Problems met on the remote side are recovered per branch and listed
    /// in [`Report::problems`].
    pub fn subtree<C>(self, conn: &mut C, name: &str, parent: &str) -> Result<Report, EstimateError>
    where
        C: Connection + ?Sized,
    {
        let opts = self.into_options()?;
        Ok(run_subtree(conn, &opts, name, parent))
    }

    /// Estimate `parent` from a pre-supplied first-level listing.
    ///
    /// Useful when the directory is too large to list cheaply or its
    /// listing is unreliable. Each name is classified against `parent`;
    /// directories are estimated as by [`subtree()`](EstimateBuilder::subtree).
    ///
    /// # Errors
    ///
    /// Same as [`subtree()`](EstimateBuilder::subtree).
    pub fn listing<C, I, S>(self, conn: &mut C, names: I, parent: &str) -> Result<Report, EstimateError>
    where
        C: Connection + ?Sized,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let opts = self.into_options()?;
        Ok(run_listing(conn, &opts, names, parent))
    }

    fn into_options(self) -> Result<EngineOptions, EstimateError> {
        if self.sentinel.trim().is_empty() {
            return Err(EstimateError::InvalidConfig(
                "directory sentinel must not be empty".into(),
            ));
        }

        // Default blacklist: skip nothing
        let blacklist: Box<dyn Blacklist> = match self.blacklist {
            Some(b) => b,
            None    => Box::new(NoBlacklist),
        };

        Ok(EngineOptions {
            config: WalkConfig {
                max_depth:           self.max_depth,
                unexplored_estimate: self.unexplored_estimate,
            },
            blacklist,
            sentinel: self.sentinel,
        })
    }
}

// ---------------------------------------------------------------------------
// Built-in blacklists
// ---------------------------------------------------------------------------

/// Skips entries whose name is in the set.
struct NameBlacklist {
    names: HashSet<String>,
}

impl Blacklist for NameBlacklist {
    fn is_blacklisted(&self, name: &str, _path: &str) -> bool {
        self.names.contains(name)
    }
}

/// Skips nothing. Used when no blacklist is specified.
struct NoBlacklist;

impl Blacklist for NoBlacklist {
    fn is_blacklisted(&self, _name: &str, _path: &str) -> bool {
        false
    }
}
