//! Decide what to copy and what to delete by comparing two listings

use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::event::{Observer, SyncEvent};
use crate::plan::SyncPlan;
use crate::scan::Listing;

/// Per-file modification time lookup
pub trait Timestamps {
    /// Modification time of the file at `path`
    ///
    /// # Errors
    /// Returns an error if the time cannot be read.
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;
}

/// Reads modification times from the filesystem, following symlinks
#[derive(Debug, Default, Clone, Copy)]
pub struct FsTimestamps;

impl Timestamps for FsTimestamps {
    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        std::fs::metadata(path)?.modified()
    }
}

/// Whole seconds since the Unix epoch, truncated toward zero
#[must_use]
pub fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_secs()).unwrap_or(i64::MAX),
        Err(before) => i64::try_from(before.duration().as_secs()).map_or(i64::MIN, |s| -s),
    }
}

/// Compares an input listing against an output listing
///
/// Files are matched by relative path only. Two matched files count as
/// different when their modification times, truncated to whole seconds, are
/// more than `tolerance` seconds apart. Size and content are never looked at.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler {
    tolerance: u64,
}

impl Reconciler {
    #[must_use]
    pub fn new(tolerance: u64) -> Self {
        Self { tolerance }
    }

    /// Whether two modification times are far enough apart to copy
    #[must_use]
    pub fn differs(&self, input: SystemTime, output: SystemTime) -> bool {
        unix_seconds(input).abs_diff(unix_seconds(output)) > self.tolerance
    }

    /// Relative paths that must be copied from input to output
    ///
    /// A file whose timestamp cannot be read on either side is reported
    /// and left out for this run.
    pub fn files_to_copy(
        &self,
        input: &Listing,
        output: &Listing,
        timestamps: &impl Timestamps,
        observer: &mut dyn Observer,
    ) -> Vec<PathBuf> {
        let mut to_copy = Vec::new();

        for path in input.files() {
            if !output.contains(path) {
                tracing::debug!(path = %path.display(), "new file");
                to_copy.push(path.clone());
                continue;
            }

            let Some(input_time) = read_time(timestamps, input.root(), path, observer) else {
                continue;
            };
            let Some(output_time) = read_time(timestamps, output.root(), path, observer) else {
                continue;
            };

            if self.differs(input_time, output_time) {
                tracing::debug!(path = %path.display(), "modified file");
                to_copy.push(path.clone());
            }
        }

        to_copy
    }

    /// Absolute output paths with no counterpart in the input
    #[must_use]
    pub fn files_to_delete(&self, input: &Listing, output: &Listing) -> Vec<PathBuf> {
        output
            .files()
            .iter()
            .filter(|path| !input.contains(path))
            .map(|path| output.root().join(path))
            .collect()
    }

    /// Build the full plan for two listings
    pub fn plan(
        &self,
        input: &Listing,
        output: &Listing,
        timestamps: &impl Timestamps,
        observer: &mut dyn Observer,
    ) -> SyncPlan {
        let to_copy = self.files_to_copy(input, output, timestamps, observer);
        let to_delete = self.files_to_delete(input, output);
        SyncPlan::new(to_copy, to_delete)
    }
}

fn read_time(
    timestamps: &impl Timestamps,
    root: &Path,
    relative: &Path,
    observer: &mut dyn Observer,
) -> Option<SystemTime> {
    let path = root.join(relative);
    match timestamps.modified(&path) {
        Ok(time) => Some(time),
        Err(err) => {
            let message = err.to_string();
            observer.event(SyncEvent::TimestampFailed {
                path: &path,
                error: &message,
            });
            None
        }
    }
}
