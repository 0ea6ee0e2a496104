use std::ops::{Deref, DerefMut};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::classify::{entry_name, sanitize};
use crate::entry::PathContext;
use crate::error::{EstimateError, RemoteError};
use crate::results::{Report, ScanStats};
use crate::traits::{Blacklist, Connection};

// ---------------------------------------------------------------------------
// WalkConfig
// ---------------------------------------------------------------------------

/// Traversal parameters passed from the builder to the engine.
pub(crate) struct WalkConfig {
    /// Directory levels that may still be entered below the start.
    pub max_depth: usize,
    /// Bytes credited for each directory the depth limit leaves unexplored.
    pub unexplored_estimate: u64,
}

// ---------------------------------------------------------------------------
// Engine options
// ---------------------------------------------------------------------------

/// Internal options passed from the builder to the `run_*` functions.
pub(crate) struct EngineOptions {
    pub config: WalkConfig,
    pub blacklist: Box<dyn Blacklist>,
    pub sentinel: String,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Estimate the subtree `name` below `parent`, where the cursor is.
///
/// An empty `name` estimates `parent` itself from its own listing.
pub(crate) fn run_subtree<C>(conn: &mut C, opts: &EngineOptions, name: &str, parent: &str) -> Report
where
    C: Connection + ?Sized,
{
    let start = Instant::now();
    let mut walk = Walk::new(conn, opts);
    let root = walk.anchor(parent);

    let total = if name.is_empty() {
        walk.list_here(&root, opts.config.max_depth)
    } else if walk.skips(name, &root) {
        0
    } else {
        walk.enter(name, &root, opts.config.max_depth)
    };

    walk.finish(total, start)
}

/// Estimate `parent` from a pre-supplied first-level listing instead of
/// asking the server for one.
pub(crate) fn run_listing<C, I, S>(conn: &mut C, opts: &EngineOptions, names: I, parent: &str) -> Report
where
    C: Connection + ?Sized,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let start = Instant::now();
    let mut walk = Walk::new(conn, opts);
    let root = walk.anchor(parent);

    // A supplied name must sit directly under `parent`. Cutting `dir/name`
    // down to `name` would size some other entry of `parent`.
    let mut direct = Vec::new();
    for raw in names {
        let name = raw.as_ref().trim_end_matches(&['\r', '\n'][..]).trim_end_matches('/');
        if name.contains('/') {
            let path = root.child(name).display;
            warn!(path = %path, "listed name is not a direct entry, counted as 0 bytes");
            walk.problems.push(EstimateError::NotDirectEntry { path });
        } else {
            direct.push(name.to_string());
        }
    }

    let total = walk.sum_entries(&root, direct, opts.config.max_depth);
    walk.finish(total, start)
}

// ---------------------------------------------------------------------------
// Walk
// ---------------------------------------------------------------------------

/// One traversal: the borrowed connection plus everything tallied so far.
struct Walk<'a, C: Connection + ?Sized> {
    conn:     &'a mut C,
    opts:     &'a EngineOptions,
    stats:    ScanStats,
    problems: Vec<EstimateError>,
}

impl<'a, C: Connection + ?Sized> Walk<'a, C> {
    fn new(conn: &'a mut C, opts: &'a EngineOptions) -> Self {
        Self {
            conn,
            opts,
            stats:    ScanStats::default(),
            problems: Vec::new(),
        }
    }

    /// Pin the starting directory. The server's absolute path is what the
    /// cursor gets restored to; `parent` is only used for display unless the
    /// server cannot say where it is.
    fn anchor(&mut self, parent: &str) -> PathContext {
        match self.conn.current_path() {
            Ok(remote) => PathContext::new(parent, remote),
            Err(e) => {
                debug!(parent, error = %e, "working directory unknown, restoring by display path");
                PathContext::new(parent, parent)
            }
        }
    }

    fn finish(self, total: u64, start: Instant) -> Report {
        let stats = self.stats.finish(start.elapsed());
        info!(
            total,
            files = stats.files,
            dirs = stats.dirs,
            cutoffs = stats.cutoffs,
            problems = self.problems.len(),
            "estimate complete"
        );
        Report {
            total_bytes: total,
            stats,
            problems: self.problems,
        }
    }

    /// Sum the directory the cursor is in.
    fn list_here(&mut self, here: &PathContext, depth: usize) -> u64 {
        match self.conn.list_entries() {
            Ok(names) => self.sum_entries(here, names, depth),
            Err(source) => {
                warn!(path = %here.display, error = %source, "listing failed, counted as 0 bytes");
                self.problems.push(EstimateError::ListingFailed {
                    path: here.display.clone(),
                    source,
                });
                0
            }
        }
    }

    /// Sum a listing of the directory the cursor is in: exact sizes for
    /// files, a recursive estimate per directory.
    fn sum_entries<I, S>(&mut self, here: &PathContext, names: I, depth: usize) -> u64
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut kept = Vec::new();
        for raw in names {
            if let Some(name) = entry_name(raw.as_ref()) {
                if !self.skips(name, here) {
                    kept.push(name.to_string());
                }
            }
        }

        let listing = sanitize(&mut *self.conn, &kept, &self.opts.sentinel);
        self.stats.files += listing.files.len();
        let mut total = listing.file_bytes();

        for (name, source) in listing.unknown {
            let path = here.child(&name).display;
            warn!(path = %path, error = %source, "unclassifiable entry, counted as 0 bytes");
            self.stats.unknown += 1;
            self.problems.push(EstimateError::Unclassifiable { path, source });
        }

        for name in &listing.directories {
            total = total.saturating_add(self.enter(name, here, depth));
        }

        total
    }

    fn skips(&mut self, name: &str, here: &PathContext) -> bool {
        let path = here.child(name).display;
        if self.opts.blacklist.is_blacklisted(name, &path) {
            debug!(path = %path, "blacklisted, skipped");
            self.stats.blacklisted += 1;
            true
        } else {
            false
        }
    }

    /// Estimate directory `name` inside `here`. The cursor is back at `here`
    /// when this returns, whatever happened below.
    fn enter(&mut self, name: &str, here: &PathContext, depth: usize) -> u64 {
        self.stats.dirs += 1;
        let path = here.child(name);

        if depth == 0 {
            debug!(
                path = %path.display,
                estimate = self.opts.config.unexplored_estimate,
                "depth exhausted, branch estimated"
            );
            self.stats.cutoffs += 1;
            return self.opts.config.unexplored_estimate;
        }

        let mut scope = Restore::new(self, here);
        let outcome = scope.descend(name, &path, depth - 1);
        match outcome {
            Ok(bytes) => bytes,
            Err(source) => {
                warn!(path = %path.display, error = %source, "descent failed, counted as 0 bytes");
                scope.problems.push(EstimateError::DescentFailed {
                    path: path.display,
                    source,
                });
                0
            }
        }
    }

    fn descend(&mut self, name: &str, path: &PathContext, depth: usize) -> Result<u64, RemoteError> {
        debug!(path = %path.display, depth, "descending");
        self.conn.change_directory(name)?;
        let names = self.conn.list_entries()?;
        Ok(self.sum_entries(path, names, depth))
    }
}

// ---------------------------------------------------------------------------
// Cursor restoration
// ---------------------------------------------------------------------------

/// Moves the cursor back to `to` when dropped, on every exit path.
struct Restore<'w, 'a, C: Connection + ?Sized> {
    walk: &'w mut Walk<'a, C>,
    to:   &'w PathContext,
}

impl<'w, 'a, C: Connection + ?Sized> Restore<'w, 'a, C> {
    fn new(walk: &'w mut Walk<'a, C>, to: &'w PathContext) -> Self {
        Self { walk, to }
    }
}

impl<'a, C: Connection + ?Sized> Deref for Restore<'_, 'a, C> {
    type Target = Walk<'a, C>;

    fn deref(&self) -> &Self::Target {
        &*self.walk
    }
}

impl<C: Connection + ?Sized> DerefMut for Restore<'_, '_, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.walk
    }
}

impl<C: Connection + ?Sized> Drop for Restore<'_, '_, C> {
    fn drop(&mut self) {
        if let Err(source) = self.walk.conn.change_directory(&self.to.remote) {
            warn!(path = %self.to.display, error = %source, "could not restore working directory");
            self.walk.problems.push(EstimateError::RestoreFailed {
                path: self.to.display.clone(),
                source,
            });
        }
    }
}
