//! Path formatting helpers for plan listings and per-file output

use std::path::Path;

/// Render `path`, keeping only its last `max_len` characters when longer
///
/// `None` disables truncation.
#[must_use]
pub fn truncate_path(path: &Path, max_len: Option<usize>) -> String {
    let rendered = path.display().to_string();
    let Some(max_len) = max_len else {
        return rendered;
    };

    let len = rendered.chars().count();
    if len <= max_len {
        return rendered;
    }

    rendered.chars().skip(len - max_len).collect()
}

/// Render an absolute destination path relative to its root
#[must_use]
pub fn relative_display<'a>(path: &'a Path, root: &Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_tail() {
        let path = Path::new("photos/2024/holiday/beach.jpg");
        assert_eq!(truncate_path(path, Some(9)), "beach.jpg");
        assert_eq!(truncate_path(path, Some(16)), "holiday/beach.jpg"[1..]);
    }

    #[test]
    fn test_truncate_short_path_untouched() {
        let path = Path::new("a.txt");
        assert_eq!(truncate_path(path, Some(5)), "a.txt");
        assert_eq!(truncate_path(path, Some(80)), "a.txt");
        assert_eq!(truncate_path(path, None), "a.txt");
    }

    #[test]
    fn test_truncate_counts_characters() {
        let path = Path::new("zdjęcia/żółw.png");
        assert_eq!(truncate_path(path, Some(8)), "żółw.png");
    }

    #[test]
    fn test_relative_display() {
        let root = Path::new("/backup");
        assert_eq!(
            relative_display(Path::new("/backup/docs/a.txt"), root),
            Path::new("docs/a.txt")
        );
        assert_eq!(
            relative_display(Path::new("/elsewhere/a.txt"), root),
            Path::new("/elsewhere/a.txt")
        );
    }
}
