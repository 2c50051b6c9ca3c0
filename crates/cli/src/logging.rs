//! Logging setup: console on stderr plus a detailed log file
//!
//! The log file lands next to the input tree by default, named
//! `backsync-YYYY-MM-DD_HH-MM.log`.

use std::path::{Path, PathBuf};

use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::Layer as _;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Keeps the non-blocking file writer alive; flushes on drop
pub struct LogGuard {
    _guard: Option<tracing_appender::non_blocking::WorkerGuard>,
    pub log_path: Option<PathBuf>,
}

impl LogGuard {
    fn console_only() -> Self {
        Self {
            _guard: None,
            log_path: None,
        }
    }
}

/// Default directory for the log file: the parent of the input root
#[must_use]
pub fn default_log_dir(input_root: &Path) -> Option<PathBuf> {
    input_root
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

/// Log file name for a run started at `now`
#[must_use]
pub fn log_file_name(now: chrono::DateTime<chrono::Local>) -> String {
    format!("backsync-{}.log", now.format("%Y-%m-%d_%H-%M"))
}

/// Open `dir/file_name` for appending.
///
/// # Errors
/// Returns an error if the directory cannot be created or the file cannot be
/// opened, e.g. when `dir` is not writable.
pub fn file_appender(dir: &Path, file_name: &str) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
}

/// Console-only logging, for commands that never touch a backup
pub fn init_console(verbose: bool) {
    tracing_subscriber::registry()
        .with(console_layer(verbose))
        .init();
}

/// Console plus file logging.
///
/// The guard must be kept alive for the duration of the program. A log
/// directory that is missing or cannot be written to falls back to console
/// logging with a warning.
pub fn init(verbose: bool, log_dir: Option<&Path>) -> LogGuard {
    let Some(dir) = log_dir.filter(|dir| dir.is_dir()) else {
        init_console(verbose);
        return LogGuard::console_only();
    };

    let file_name = log_file_name(chrono::Local::now());
    let log_path = dir.join(&file_name);

    let appender = match file_appender(dir, &file_name) {
        Ok(appender) => appender,
        Err(err) => {
            init_console(verbose);
            tracing::warn!("cannot write log file {}: {err}", log_path.display());
            return LogGuard::console_only();
        }
    };
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    // File filter: everything from our crates at debug, overridable by RUST_LOG
    let file_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,backsync=debug,backsync_core=debug"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_filter(file_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer(verbose))
        .init();

    LogGuard {
        _guard: Some(guard),
        log_path: Some(log_path),
    }
}

/// Console filter: per-file event records are rendered by the console
/// observer, so their target is switched off here.
fn console_targets(verbose: bool) -> Targets {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    Targets::new()
        .with_default(level)
        .with_target(backsync_core::event::EVENT_TARGET, LevelFilter::OFF)
}

fn console_layer<S>(verbose: bool) -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_targets(verbose))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tracing::Level;

    #[test]
    fn test_log_file_name() {
        let at = chrono::Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 0).unwrap();
        assert_eq!(log_file_name(at), "backsync-2024-03-09_07-05.log");
    }

    #[test]
    fn test_default_log_dir_is_input_parent() {
        assert_eq!(
            default_log_dir(Path::new("/home/me/documents")),
            Some(PathBuf::from("/home/me"))
        );
        assert_eq!(default_log_dir(Path::new("/")), None);
    }

    #[test]
    fn test_file_appender_creates_named_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let appender = file_appender(dir.path(), "backsync-test.log").unwrap();
        drop(appender);
        assert!(dir.path().join("backsync-test.log").is_file());
    }

    // Nobody, root included, can create regular files under /proc
    #[cfg(target_os = "linux")]
    #[test]
    fn test_unwritable_log_dir_falls_back_to_console() {
        assert!(file_appender(Path::new("/proc"), "backsync-test.log").is_err());

        let guard = init(false, Some(Path::new("/proc")));
        assert!(guard.log_path.is_none());
    }

    #[test]
    fn test_console_skips_event_records() {
        let quiet = console_targets(false);
        assert!(!quiet.would_enable(backsync_core::event::EVENT_TARGET, &Level::WARN));
        assert!(quiet.would_enable("backsync", &Level::WARN));
        assert!(!quiet.would_enable("backsync", &Level::INFO));

        let verbose = console_targets(true);
        assert!(!verbose.would_enable(backsync_core::event::EVENT_TARGET, &Level::INFO));
        assert!(verbose.would_enable("backsync_core::sync", &Level::DEBUG));
    }
}
