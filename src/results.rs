use std::time::Duration;

use crate::error::EstimateError;

/// The output of a completed estimate.
///
/// `total_bytes` is a best-effort figure. It is exact only when
/// [`is_approximate`](Report::is_approximate) returns `false`.
pub struct Report {
    /// Sum of every sized file plus one estimate per unexplored branch.
    pub total_bytes: u64,

    /// Traversal statistics.
    pub stats: ScanStats,

    /// Problems recovered from during the traversal, in the order they were
    /// met. Each carries the offending path (see [`EstimateError::path`]).
    pub problems: Vec<EstimateError>,
}

impl Report {
    /// Whether anything was estimated or left out: a depth cutoff, an
    /// unclassifiable entry, or a branch that could not be explored.
    pub fn is_approximate(&self) -> bool {
        self.stats.cutoffs > 0 || self.stats.unknown > 0 || !self.problems.is_empty()
    }
}

/// Statistics for a completed estimate.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScanStats {
    /// Regular files sized.
    pub files: usize,

    /// Directories encountered, explored or not.
    pub dirs: usize,

    /// Entries that could not be classified.
    pub unknown: usize,

    /// Entries skipped by the blacklist.
    pub blacklisted: usize,

    /// Directories replaced by the unexplored-branch estimate.
    pub cutoffs: usize,

    /// Wall-clock time from start to completion.
    pub duration: Duration,

    /// Size probes per second. Equals
    /// `(files + dirs + unknown) / duration.as_secs_f64()`, clamped to 0 on
    /// zero-duration runs.
    pub probes_per_sec: usize,
}

impl ScanStats {
    /// Stamp the duration and compute `probes_per_sec`.
    pub(crate) fn finish(mut self, duration: Duration) -> Self {
        let probes = self.files + self.dirs + self.unknown;
        self.probes_per_sec = if duration.as_secs_f64() > 0.0 {
            (probes as f64 / duration.as_secs_f64()) as usize
        } else {
            0
        };
        self.duration = duration;
        self
    }
}
