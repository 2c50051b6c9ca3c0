//! Structured events emitted while listing, reconciling and applying
//!
//! The engine never formats output. Every per-file outcome is reported to an
//! [`Observer`], and rendering (console lines, log records, progress bars) is
//! left to whoever implements it.

use std::path::Path;

/// Phase of the apply step a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Copy,
    Delete,
}

/// A single diagnostic event
#[derive(Debug, Clone, Copy)]
pub enum SyncEvent<'a> {
    /// A directory is about to be enumerated
    DirectoryEntered { path: &'a Path },
    /// A regular file was found (path relative to `root`)
    FileListed { root: &'a Path, path: &'a Path },
    /// A directory or entry could not be read; its subtree is skipped
    ListingFailed {
        path: Option<&'a Path>,
        error: &'a str,
    },
    /// The modification time of a file could not be read
    TimestampFailed { path: &'a Path, error: &'a str },
    /// A file was copied to the destination (path relative to the roots)
    Copied { path: &'a Path, bytes: u64 },
    /// A file could not be copied (path relative to the roots)
    CopyFailed { path: &'a Path, error: &'a str },
    /// A destination file was removed (absolute path)
    Deleted { path: &'a Path },
    /// A destination file could not be removed (absolute path)
    DeleteFailed { path: &'a Path, error: &'a str },
    /// A deletion was not attempted because the delete phase was aborted
    DeleteSkipped { path: &'a Path },
    /// The last-sync marker was written
    MarkerWritten { path: &'a Path },
    /// The last-sync marker could not be written
    MarkerFailed { path: &'a Path, error: &'a str },
}

/// Receiver of [`SyncEvent`]s
pub trait Observer {
    fn event(&mut self, event: SyncEvent<'_>);
}

impl<F> Observer for F
where
    F: FnMut(SyncEvent<'_>),
{
    fn event(&mut self, event: SyncEvent<'_>) {
        self(event);
    }
}

/// Discards every event
impl Observer for () {
    fn event(&mut self, _event: SyncEvent<'_>) {}
}

/// Target of every record emitted by [`TracingObserver`]
pub const EVENT_TARGET: &str = module_path!();

/// Renders events as `tracing` records
///
/// Per-file listing noise goes to `trace`, mutations to `info`, and every
/// failure to `warn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn event(&mut self, event: SyncEvent<'_>) {
        match event {
            SyncEvent::DirectoryEntered { path } => {
                tracing::trace!(path = %path.display(), "entering directory");
            }
            SyncEvent::FileListed { root, path } => {
                tracing::trace!(root = %root.display(), path = %path.display(), "file detected");
            }
            SyncEvent::ListingFailed { path, error } => match path {
                Some(path) => tracing::warn!(path = %path.display(), "cannot list: {error}"),
                None => tracing::warn!("cannot list: {error}"),
            },
            SyncEvent::TimestampFailed { path, error } => {
                tracing::warn!(path = %path.display(), "cannot read modification time: {error}");
            }
            SyncEvent::Copied { path, bytes } => {
                tracing::info!(path = %path.display(), bytes, "copied");
            }
            SyncEvent::CopyFailed { path, error } => {
                tracing::warn!(path = %path.display(), "cannot copy: {error}");
            }
            SyncEvent::Deleted { path } => {
                tracing::info!(path = %path.display(), "deleted");
            }
            SyncEvent::DeleteFailed { path, error } => {
                tracing::warn!(path = %path.display(), "cannot delete: {error}");
            }
            SyncEvent::DeleteSkipped { path } => {
                tracing::warn!(path = %path.display(), "deletion skipped after abort");
            }
            SyncEvent::MarkerWritten { path } => {
                tracing::debug!(path = %path.display(), "last-sync marker written");
            }
            SyncEvent::MarkerFailed { path, error } => {
                tracing::warn!(path = %path.display(), "cannot write last-sync marker: {error}");
            }
        }
    }
}

/// Forwards every event to two observers in order
pub struct Tee<A, B>(pub A, pub B);

impl<A: Observer, B: Observer> Observer for Tee<A, B> {
    fn event(&mut self, event: SyncEvent<'_>) {
        self.0.event(event);
        self.1.event(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_observer_receives_events() {
        let mut seen = Vec::new();
        let mut observer = |event: SyncEvent<'_>| {
            if let SyncEvent::Deleted { path } = event {
                seen.push(path.to_path_buf());
            }
        };

        observer.event(SyncEvent::Deleted {
            path: Path::new("/out/a.txt"),
        });
        observer.event(SyncEvent::DirectoryEntered {
            path: Path::new("/out"),
        });

        assert_eq!(seen, vec![Path::new("/out/a.txt").to_path_buf()]);
    }

    #[test]
    fn test_tee_forwards_to_both() {
        let mut first = 0;
        let mut second = 0;
        {
            let mut tee = Tee(|_: SyncEvent<'_>| first += 1, |_: SyncEvent<'_>| second += 1);
            tee.event(SyncEvent::MarkerWritten {
                path: Path::new("lastSync.txt"),
            });
        }
        assert_eq!((first, second), (1, 1));
    }
}
