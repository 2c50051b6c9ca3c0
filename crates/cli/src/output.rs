//! Cargo-style console output for backsync
//!
//! ```text
//!    Scanning 1532 files
//!      Copied photos/2024/beach.jpg
//!     Deleted old/notes.txt
//!      Synced 12 copied, 3 deleted (4.20 MiB) in 1.32s
//! ```

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use backsync_core::display::{relative_display, truncate_path};
use backsync_core::{ApplyReport, Observer, SyncEvent, SyncPlan};

/// Status verbs for cargo-style output (right-aligned to 12 chars)
struct Status;

impl Status {
    const SCANNING: &str = "Scanning";
    const COPIED: &str = "Copied";
    const DELETED: &str = "Deleted";
    const FAILED: &str = "Failed";
    const SYNCED: &str = "Synced";
    const ABORTED: &str = "Aborted";
}

/// Print a cargo-style status line
pub fn print_status(status: &str, message: &str) {
    let mut term = console::Term::stderr();
    let style = console::Style::new().green().bold();
    let _ = writeln!(term, "{:>12} {}", style.apply_to(status), message);
}

fn print_warning(status: &str, message: &str) {
    let mut term = console::Term::stderr();
    let style = console::Style::new().yellow().bold();
    let _ = writeln!(term, "{:>12} {}", style.apply_to(status), message);
}

/// Print the copy and delete lists with totals
pub fn print_plan(plan: &SyncPlan, output_root: &Path, max_len: Option<usize>) {
    if plan.is_empty() {
        eprintln!("There are no changes.");
        return;
    }

    eprintln!("There are changes to sync");
    if plan.to_copy().is_empty() {
        eprintln!("There are no files to copy");
    } else {
        eprintln!("Files to copy:");
        for path in plan.to_copy() {
            eprintln!("  {}", truncate_path(path, max_len));
        }
    }

    if plan.to_delete().is_empty() {
        eprintln!("There are no files to delete");
    } else {
        eprintln!("Files to delete:");
        for path in plan.to_delete() {
            eprintln!(
                "  {}",
                truncate_path(relative_display(path, output_root), max_len)
            );
        }
    }

    eprintln!(
        "There are total {} file(s) to copy and {} file(s) to delete",
        plan.to_copy().len(),
        plan.to_delete().len()
    );
}

/// Only an explicit `y` or `Y` accepts
#[must_use]
pub fn is_affirmative(key: char) -> bool {
    key.eq_ignore_ascii_case(&'y')
}

/// Ask for a single keystroke; anything but yes is a no
pub fn prompt_confirm() -> bool {
    let term = console::Term::stderr();
    let _ = term.write_str("Execute changes? [y/N] ");
    let key = if term.features().is_attended() {
        term.read_char().ok()
    } else {
        // Piped stdin: take the first character of the first line
        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .ok()
            .and_then(|_| line.trim().chars().next())
    };
    let _ = term.write_line("");
    key.is_some_and(is_affirmative)
}

/// Spinner counting listed files while both trees are scanned
pub fn scan_spinner() -> indicatif::ProgressBar {
    let pb = indicatif::ProgressBar::new_spinner();
    pb.set_style(
        indicatif::ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg:>12} {pos} files")
            .expect("valid template"),
    );
    pb.set_message(Status::SCANNING);
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Replace the spinner with a static status line; no-op once finished
pub fn finish_scan(pb: &indicatif::ProgressBar) {
    if pb.is_finished() {
        return;
    }
    pb.finish_and_clear();
    print_status(Status::SCANNING, &format!("{} files", pb.position()));
}

/// Renders per-file events on the console
pub struct ConsoleObserver {
    output_root: PathBuf,
    max_len: Option<usize>,
    scan: indicatif::ProgressBar,
}

impl ConsoleObserver {
    /// `scan` is ticked once per listed file
    pub fn new(output_root: &Path, max_len: Option<usize>, scan: indicatif::ProgressBar) -> Self {
        Self {
            output_root: output_root.to_path_buf(),
            max_len,
            scan,
        }
    }

    fn display(&self, path: &Path) -> String {
        truncate_path(path, self.max_len)
    }

    /// Run `f` without the spinner drawing over its output
    fn print(&self, f: impl FnOnce()) {
        self.scan.suspend(f);
    }

    /// Warning line for a failure event, `None` for everything else
    fn failure(&self, event: &SyncEvent<'_>) -> Option<(&'static str, String)> {
        let line = match *event {
            // The walker's error text already names the path
            SyncEvent::ListingFailed { error, .. } => {
                (Status::FAILED, format!("cannot list: {error}"))
            }
            SyncEvent::TimestampFailed { path, error } => (
                Status::FAILED,
                format!("cannot read time of {}: {error}", path.display()),
            ),
            SyncEvent::CopyFailed { path, error } => {
                (Status::FAILED, format!("copy {}: {error}", self.display(path)))
            }
            SyncEvent::DeleteFailed { path, error } => {
                let relative = relative_display(path, &self.output_root);
                (
                    Status::FAILED,
                    format!("delete {}: {error}", self.display(relative)),
                )
            }
            SyncEvent::DeleteSkipped { path } => {
                let relative = relative_display(path, &self.output_root);
                (
                    Status::ABORTED,
                    format!("not deleted {}", self.display(relative)),
                )
            }
            SyncEvent::MarkerFailed { path, error } => (
                Status::FAILED,
                format!("last-sync marker {}: {error}", path.display()),
            ),
            _ => return None,
        };
        Some(line)
    }
}

impl Observer for ConsoleObserver {
    fn event(&mut self, event: SyncEvent<'_>) {
        if let Some((status, message)) = self.failure(&event) {
            self.print(|| print_warning(status, &message));
            return;
        }

        match event {
            SyncEvent::FileListed { .. } => self.scan.inc(1),
            SyncEvent::Copied { path, .. } => {
                print_status(Status::COPIED, &self.display(path));
            }
            SyncEvent::Deleted { path } => {
                let relative = relative_display(path, &self.output_root);
                print_status(Status::DELETED, &self.display(relative));
            }
            _ => {}
        }
    }
}

/// Final summary after applying
pub fn print_summary(report: &ApplyReport, started: Instant) {
    let elapsed = started.elapsed();
    let elapsed_str = if elapsed.as_secs() >= 1 {
        format!("{:.2}s", elapsed.as_secs_f64())
    } else {
        format!("{}ms", elapsed.as_millis())
    };
    let size_str = humansize::format_size(report.bytes_copied(), humansize::BINARY);

    eprintln!("Number of copied files: {}", report.copied());
    eprintln!("Number of deleted files: {}", report.deleted());

    if report.failures().is_empty() && !report.is_aborted() {
        print_status(
            Status::SYNCED,
            &format!(
                "{} copied, {} deleted ({size_str}) in {elapsed_str}",
                report.copied(),
                report.deleted()
            ),
        );
    } else {
        print_warning(
            if report.is_aborted() {
                Status::ABORTED
            } else {
                "Finished"
            },
            &format!(
                "{} copied, {} deleted, {} failed, {} not attempted in {elapsed_str}",
                report.copied(),
                report.deleted(),
                report.failures().len(),
                report.skipped_deletions()
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_yes_is_affirmative() {
        assert!(is_affirmative('y'));
        assert!(is_affirmative('Y'));
        assert!(!is_affirmative('n'));
        assert!(!is_affirmative('\n'));
        assert!(!is_affirmative('x'));
    }

    #[test]
    fn test_console_observer_counts_listed_files() {
        let scan = indicatif::ProgressBar::hidden();
        let mut observer = ConsoleObserver::new(Path::new("/out"), None, scan.clone());
        observer.event(SyncEvent::FileListed {
            root: Path::new("/in"),
            path: Path::new("a.txt"),
        });
        observer.event(SyncEvent::FileListed {
            root: Path::new("/out"),
            path: Path::new("a.txt"),
        });
        assert_eq!(scan.position(), 2);
    }

    #[test]
    fn test_listing_failure_names_path_once() {
        let observer =
            ConsoleObserver::new(Path::new("/out"), None, indicatif::ProgressBar::hidden());
        let error = "IO error for operation on /out/missing: No such file or directory";
        let (status, message) = observer
            .failure(&SyncEvent::ListingFailed {
                path: Some(Path::new("/out/missing")),
                error,
            })
            .unwrap();

        assert_eq!(status, Status::FAILED);
        assert_eq!(message, format!("cannot list: {error}"));
        assert_eq!(message.matches("/out/missing").count(), 1);
    }

    #[test]
    fn test_failure_lines_use_destination_relative_paths() {
        let observer =
            ConsoleObserver::new(Path::new("/out"), None, indicatif::ProgressBar::hidden());
        let (status, message) = observer
            .failure(&SyncEvent::DeleteSkipped {
                path: Path::new("/out/old/notes.txt"),
            })
            .unwrap();

        assert_eq!(status, Status::ABORTED);
        assert_eq!(message, "not deleted old/notes.txt");
        assert!(
            observer
                .failure(&SyncEvent::Copied {
                    path: Path::new("a.txt"),
                    bytes: 1,
                })
                .is_none()
        );
    }
}
