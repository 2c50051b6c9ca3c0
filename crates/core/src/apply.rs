//! Execute a confirmed plan against the destination tree
//!
//! Copies always run to completion before any deletion starts, so an
//! interrupted run can leave stale extra files behind but never loses data
//! that was still waiting to be copied.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use filetime::FileTime;

use crate::config::DeletePolicy;
use crate::event::{Observer, Phase, SyncEvent};
use crate::plan::SyncPlan;

/// A file that could not be copied or deleted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Relative path for copies, absolute destination path for deletions
    pub path: PathBuf,
    pub phase: Phase,
    pub message: String,
}

/// Outcome of applying a plan
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    copied: usize,
    deleted: usize,
    bytes_copied: u64,
    failures: Vec<Failure>,
    skipped_deletions: usize,
    aborted: bool,
}

impl ApplyReport {
    /// Number of files successfully copied
    #[must_use]
    pub fn copied(&self) -> usize {
        self.copied
    }

    /// Number of files successfully deleted
    #[must_use]
    pub fn deleted(&self) -> usize {
        self.deleted
    }

    #[must_use]
    pub fn bytes_copied(&self) -> u64 {
        self.bytes_copied
    }

    #[must_use]
    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// Deletions never attempted because the delete phase was aborted
    #[must_use]
    pub fn skipped_deletions(&self) -> usize {
        self.skipped_deletions
    }

    /// Whether the delete phase stopped early under [`DeletePolicy::Abort`]
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    fn fail(&mut self, path: &Path, phase: Phase, err: &io::Error) {
        self.failures.push(Failure {
            path: path.to_path_buf(),
            phase,
            message: err.to_string(),
        });
    }
}

/// Applies plans: copy phase, then delete phase
#[derive(Debug, Clone, Copy, Default)]
pub struct Applier {
    delete_policy: DeletePolicy,
}

impl Applier {
    #[must_use]
    pub fn new(delete_policy: DeletePolicy) -> Self {
        Self { delete_policy }
    }

    /// Copy then delete, best effort per file
    ///
    /// A failed copy is reported and skipped. A failed deletion is reported
    /// and, depending on the delete policy, either skipped or ends the phase.
    pub fn apply(
        &self,
        plan: &SyncPlan,
        input_root: &Path,
        output_root: &Path,
        observer: &mut dyn Observer,
    ) -> ApplyReport {
        let mut report = ApplyReport::default();

        tracing::debug!(files = plan.to_copy().len(), "copy phase");
        for relative in plan.to_copy() {
            let from = input_root.join(relative);
            let to = output_root.join(relative);

            match copy_file(&from, &to) {
                Ok(bytes) => {
                    report.copied += 1;
                    report.bytes_copied += bytes;
                    observer.event(SyncEvent::Copied {
                        path: relative,
                        bytes,
                    });
                }
                Err(err) => {
                    let message = err.to_string();
                    observer.event(SyncEvent::CopyFailed {
                        path: relative,
                        error: &message,
                    });
                    report.fail(relative, Phase::Copy, &err);
                }
            }
        }

        tracing::debug!(files = plan.to_delete().len(), "delete phase");
        let mut remaining = plan.to_delete().iter();
        while let Some(path) = remaining.next() {
            match fs::remove_file(path) {
                Ok(()) => {
                    report.deleted += 1;
                    observer.event(SyncEvent::Deleted { path });
                }
                Err(err) => {
                    let message = err.to_string();
                    observer.event(SyncEvent::DeleteFailed {
                        path,
                        error: &message,
                    });
                    report.fail(path, Phase::Delete, &err);

                    if self.delete_policy == DeletePolicy::Abort {
                        report.aborted = true;
                        for skipped in remaining.by_ref() {
                            report.skipped_deletions += 1;
                            observer.event(SyncEvent::DeleteSkipped { path: skipped });
                        }
                    }
                }
            }
        }

        report
    }
}

/// Copy `from` over `to`, carrying permissions and timestamps
///
/// Contents go to a temporary file next to `to` which is then renamed over
/// it, so the destination is either the old file or the complete new one.
/// Returns the number of bytes copied.
///
/// # Errors
/// Returns an error if the source cannot be read, the destination directory
/// cannot be created or the final rename fails.
pub fn copy_file(from: &Path, to: &Path) -> io::Result<u64> {
    let parent = to
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "destination has no parent"))?;
    fs::create_dir_all(parent)?;

    let mut source = File::open(from)?;
    let metadata = source.metadata()?;
    if !metadata.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a regular file", from.display()),
        ));
    }

    let mut staged = tempfile::Builder::new()
        .prefix(".backsync-")
        .suffix(".part")
        .tempfile_in(parent)?;
    let bytes = io::copy(&mut source, staged.as_file_mut())?;

    let file = staged.as_file();
    filetime::set_file_handle_times(
        file,
        Some(FileTime::from_last_access_time(&metadata)),
        Some(FileTime::from_last_modification_time(&metadata)),
    )?;
    file.set_permissions(metadata.permissions())?;

    staged.persist(to).map_err(|e| e.error)?;
    Ok(bytes)
}
