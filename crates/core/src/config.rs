//! backsync configuration file parsing (backsync.toml)

use std::path::{Path, PathBuf};

use color_eyre::eyre::{bail, eyre};
use serde::Deserialize;

/// Config file name looked up in the working directory
pub const CONFIG_FILE: &str = "backsync.toml";

/// What to do when a destination file cannot be deleted
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// Report the failure and keep deleting
    #[default]
    Continue,
    /// Stop the delete phase at the first failure
    Abort,
}

impl std::str::FromStr for DeletePolicy {
    type Err = color_eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "continue" => Ok(Self::Continue),
            "abort" => Ok(Self::Abort),
            other => Err(eyre!(
                "unknown delete policy {other:?}, expected \"continue\" or \"abort\""
            )),
        }
    }
}

/// Raw file contents; every key optional so command-line flags can fill gaps
///
/// The upper-case and camel-case aliases are the property names used by
/// earlier versions of the tool.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(alias = "INPUT_DIR")]
    pub input_dir: Option<PathBuf>,

    #[serde(alias = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Timestamp tolerance in seconds
    #[serde(alias = "datePrecision")]
    pub date_precision: Option<u64>,

    /// Display truncation; zero or negative disables it
    #[serde(alias = "MAX_PATH_LENGTH")]
    pub max_path_length: Option<i64>,

    pub delete_policy: Option<DeletePolicy>,

    pub follow_links: Option<bool>,
}

impl ConfigFile {
    /// Load from `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> color_eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre!("cannot read config {}: {e}", path.display()))?;
        Self::parse(&content).map_err(|e| eyre!("invalid config {}: {e}", path.display()))
    }

    /// Load from `path` if it exists, defaults otherwise.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load_or_default(path: &Path) -> color_eyre::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse TOML content.
    ///
    /// # Errors
    /// Returns an error on malformed TOML, unknown keys or mistyped values.
    pub fn parse(content: &str) -> color_eyre::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Values present in `overrides` replace those in `self`
    #[must_use]
    pub fn merge(self, overrides: Self) -> Self {
        Self {
            input_dir: overrides.input_dir.or(self.input_dir),
            output_dir: overrides.output_dir.or(self.output_dir),
            date_precision: overrides.date_precision.or(self.date_precision),
            max_path_length: overrides.max_path_length.or(self.max_path_length),
            delete_policy: overrides.delete_policy.or(self.delete_policy),
            follow_links: overrides.follow_links.or(self.follow_links),
        }
    }

    /// Validate and resolve paths against the working directory `cwd`
    ///
    /// # Errors
    /// Returns an error if the input, output or tolerance is missing.
    pub fn resolve(self, cwd: &Path) -> color_eyre::Result<SyncConfig> {
        let Some(input_dir) = self.input_dir else {
            bail!("input directory is not set (input_dir / INPUT_DIR)");
        };
        let Some(output_dir) = self.output_dir else {
            bail!("output directory is not set (output_dir / OUTPUT_DIR)");
        };
        let Some(tolerance) = self.date_precision else {
            bail!("timestamp tolerance is not set (date_precision / datePrecision)");
        };

        let max_path_length = self
            .max_path_length
            .filter(|&len| len > 0)
            .map(|len| usize::try_from(len).unwrap_or(usize::MAX));

        Ok(SyncConfig {
            input_root: resolve_input(&input_dir, cwd),
            output_root: resolve_output(&output_dir, cwd),
            tolerance,
            max_path_length,
            delete_policy: self.delete_policy.unwrap_or_default(),
            follow_links: self.follow_links.unwrap_or(true),
        })
    }
}

/// Validated settings for one run
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Absolute source root
    pub input_root: PathBuf,
    /// Absolute destination root
    pub output_root: PathBuf,
    /// Seconds two modification times may differ and still count as equal
    pub tolerance: u64,
    /// Keep only this many trailing characters when displaying paths
    pub max_path_length: Option<usize>,
    pub delete_policy: DeletePolicy,
    pub follow_links: bool,
}

impl SyncConfig {
    /// Config with defaults for everything but the roots and tolerance
    #[must_use]
    pub fn new(input_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>, tolerance: u64) -> Self {
        Self {
            input_root: input_root.into(),
            output_root: output_root.into(),
            tolerance,
            max_path_length: None,
            delete_policy: DeletePolicy::default(),
            follow_links: true,
        }
    }
}

/// Relative input paths are taken from the working directory
fn resolve_input(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Relative output paths are taken from the root of the working directory's
/// volume, so `backup/home` means `/backup/home` (or `D:\backup\home` when
/// running from drive `D:`)
fn resolve_output(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let volume_root = cwd.ancestors().last().unwrap_or(cwd);
    volume_root.join(path)
}
