//! Recursive tree listing built on the `ignore` crate's walker

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use serde::Serialize;

use crate::event::{Observer, SyncEvent};
use crate::marker::LAST_SYNC_FILE;

/// All regular files under a root, as root-relative paths
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    root: PathBuf,
    files: BTreeSet<PathBuf>,
    errors: usize,
}

impl Listing {
    /// Build a listing from already-known relative paths
    #[must_use]
    pub fn from_paths(root: impl Into<PathBuf>, files: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: files.into_iter().collect(),
            errors: 0,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relative paths in sorted order
    #[must_use]
    pub fn files(&self) -> &BTreeSet<PathBuf> {
        &self.files
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Number of directories or entries that could not be read
    #[must_use]
    pub fn errors(&self) -> usize {
        self.errors
    }
}

/// Lists every regular file below a root directory
///
/// Unlike a source-tree scanner this never honours ignore files: a backup
/// must contain hidden and gitignored files too. The last-sync marker is the
/// only file ever left out.
pub struct Scanner {
    root: PathBuf,
    follow_links: bool,
}

impl Scanner {
    /// Create a scanner for the given root, following symlinks
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            follow_links: true,
        }
    }

    /// Whether symlinked directories are descended into
    ///
    /// When following, the walker detects links that point back at an
    /// ancestor and reports them as errors instead of looping.
    #[must_use]
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    fn walk_builder(&self) -> WalkBuilder {
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .standard_filters(false)
            .follow_links(self.follow_links);
        builder
    }

    /// Enumerate the tree
    ///
    /// Never fails: an unreadable root or subdirectory is reported through
    /// the observer and counted in [`Listing::errors`], and listing carries
    /// on with whatever remains readable.
    pub fn list(&self, observer: &mut dyn Observer) -> Listing {
        let mut files = BTreeSet::new();
        let mut errors = 0;

        for result in self.walk_builder().build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    errors += 1;
                    let message = err.to_string();
                    observer.event(SyncEvent::ListingFailed {
                        path: error_path(&err),
                        error: &message,
                    });
                    continue;
                }
            };

            let Some(file_type) = entry.file_type() else {
                continue;
            };
            let path = entry.path();

            if file_type.is_dir() {
                observer.event(SyncEvent::DirectoryEntered { path });
                continue;
            }

            // Unfollowed directory links, dangling links, sockets and fifos
            if !path.is_file() {
                continue;
            }

            if entry.file_name() == LAST_SYNC_FILE {
                continue;
            }

            let Ok(relative) = path.strip_prefix(&self.root) else {
                continue;
            };
            observer.event(SyncEvent::FileListed {
                root: &self.root,
                path: relative,
            });
            files.insert(relative.to_path_buf());
        }

        tracing::debug!(
            root = %self.root.display(),
            files = files.len(),
            errors,
            "listing complete"
        );

        Listing {
            root: self.root.clone(),
            files,
            errors,
        }
    }
}

/// Best-effort extraction of the path an `ignore` error refers to
fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        ignore::Error::Loop { child, .. } => Some(child.as_path()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn list(root: &Path) -> Listing {
        Scanner::new(root).list(&mut ())
    }

    #[test]
    fn test_list_simple_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("file1.txt"), "hello").unwrap();
        fs::write(dir.path().join("file2.txt"), "world").unwrap();

        let listing = list(dir.path());

        assert_eq!(listing.len(), 2);
        assert!(listing.contains(Path::new("file1.txt")));
        assert!(listing.contains(Path::new("file2.txt")));
        assert_eq!(listing.errors(), 0);
    }

    #[test]
    fn test_list_nested_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("sub/dir")).unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();
        fs::write(dir.path().join("root.txt"), "root").unwrap();
        fs::write(dir.path().join("sub/nested.txt"), "nested").unwrap();
        fs::write(dir.path().join("sub/dir/deep.txt"), "deep").unwrap();

        let listing = list(dir.path());

        let paths: Vec<_> = listing.files().iter().cloned().collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("root.txt"),
                PathBuf::from("sub/dir/deep.txt"),
                PathBuf::from("sub/nested.txt"),
            ]
        );
    }

    #[test]
    fn test_list_includes_hidden_and_gitignored() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".gitignore"), "*.log\n").unwrap();
        fs::write(dir.path().join("build.log"), "log").unwrap();
        fs::write(dir.path().join(".env"), "SECRET=1").unwrap();

        let listing = list(dir.path());

        assert!(listing.contains(Path::new("build.log")), "{listing:?}");
        assert!(listing.contains(Path::new(".env")), "{listing:?}");
        assert!(listing.contains(Path::new(".gitignore")), "{listing:?}");
    }

    #[test]
    fn test_list_excludes_marker_at_any_depth() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join(LAST_SYNC_FILE), "Jan 1, 2024").unwrap();
        fs::write(dir.path().join("sub").join(LAST_SYNC_FILE), "x").unwrap();
        fs::write(dir.path().join("keep.txt"), "keep").unwrap();

        let listing = list(dir.path());

        assert_eq!(listing.len(), 1);
        assert!(listing.contains(Path::new("keep.txt")));
    }

    #[test]
    fn test_list_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");

        let mut failures = 0;
        let listing = Scanner::new(&missing).list(&mut |event: SyncEvent<'_>| {
            if matches!(event, SyncEvent::ListingFailed { .. }) {
                failures += 1;
            }
        });

        assert!(listing.is_empty());
        assert_eq!(listing.errors(), 1);
        assert_eq!(failures, 1);
    }

    #[test]
    fn test_list_reports_files_to_observer() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("a/one.txt"), "1").unwrap();

        let mut listed = Vec::new();
        let mut directories = 0;
        Scanner::new(dir.path()).list(&mut |event: SyncEvent<'_>| match event {
            SyncEvent::FileListed { path, .. } => listed.push(path.to_path_buf()),
            SyncEvent::DirectoryEntered { .. } => directories += 1,
            _ => {}
        });

        assert_eq!(listed, vec![PathBuf::from("a/one.txt")]);
        // root and `a`
        assert_eq!(directories, 2);
    }

    #[test]
    fn test_listing_serializes_to_json() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        let listing = list(dir.path());
        let json = serde_json::to_value(&listing).unwrap();

        assert_eq!(json["files"], serde_json::json!(["a.txt"]));
        assert_eq!(json["errors"], 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_list_follows_symlinked_directory() {
        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("linked.txt"), "linked").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        let listing = list(dir.path());
        assert!(listing.contains(Path::new("link/linked.txt")), "{listing:?}");

        let unfollowed = Scanner::new(dir.path()).follow_links(false).list(&mut ());
        assert!(unfollowed.is_empty(), "{unfollowed:?}");
    }

    #[cfg(unix)]
    #[test]
    fn test_list_terminates_on_symlink_cycle() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/file.txt"), "x").unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("sub/back")).unwrap();

        let listing = list(dir.path());

        assert!(listing.contains(Path::new("sub/file.txt")));
        assert!(listing.errors() >= 1);
    }
}
