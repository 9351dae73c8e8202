// src/watch/filter.rs

//! Watch filters: predicates deciding which changes are worth a restart.
//!
//! The supervisor only sees the [`WatchFilter`] trait; the built-in filters
//! here are just the predicates the CLI plugs in.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::warn;

use crate::types::{ChangeKind, FilterMode};

/// Directory names ignored by [`DefaultFilter`] anywhere in a path.
pub const DEFAULT_IGNORE_DIRS: &[&str] = &[
    "__pycache__",
    ".git",
    ".hg",
    ".svn",
    ".tox",
    ".venv",
    ".idea",
    "node_modules",
    ".mypy_cache",
    ".pytest_cache",
    ".hypothesis",
    "target",
];

/// File name globs ignored by [`DefaultFilter`] (editor swap files, compiled
/// python files, etc).
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    "*.py[cod]",
    "*.___jb_*___",
    "*.sw?",
    "*~",
    ".#*",
    ".DS_Store",
    "flycheck_*",
];

/// Extensions watched by the `extensions` mode when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &["py", "pyx", "pyd"];

/// Predicate over a single change. `None` in place of a filter accepts all.
pub trait WatchFilter: Send + Sync {
    fn accept(&self, kind: ChangeKind, path: &Path) -> bool;
}

impl<F> WatchFilter for F
where
    F: Fn(ChangeKind, &Path) -> bool + Send + Sync,
{
    fn accept(&self, kind: ChangeKind, path: &Path) -> bool {
        self(kind, path)
    }
}

/// Ignores well-known junk directories, editor artifacts and any
/// user-provided `ignore_paths` prefixes.
#[derive(Clone)]
pub struct DefaultFilter {
    ignore_dirs: Vec<String>,
    ignore_set: GlobSet,
    ignore_paths: Vec<PathBuf>,
}

impl fmt::Debug for DefaultFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultFilter")
            .field("ignore_dirs", &self.ignore_dirs)
            .field("ignore_paths", &self.ignore_paths)
            .finish_non_exhaustive()
    }
}

impl DefaultFilter {
    pub fn new<D, P>(ignore_dirs: D, ignore_patterns: P, ignore_paths: Vec<PathBuf>) -> Result<Self>
    where
        D: IntoIterator,
        D::Item: Into<String>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        for pattern in ignore_patterns {
            let pattern = pattern.as_ref();
            let glob = Glob::new(pattern)
                .with_context(|| format!("invalid ignore pattern '{pattern}'"))?;
            builder.add(glob);
        }
        let ignore_set = builder.build().context("building ignore pattern set")?;

        Ok(Self {
            ignore_dirs: ignore_dirs.into_iter().map(Into::into).collect(),
            ignore_set,
            ignore_paths,
        })
    }

    /// Default directories and patterns, plus the given ignored paths.
    pub fn with_ignore_paths(ignore_paths: Vec<PathBuf>) -> Result<Self> {
        Self::new(
            DEFAULT_IGNORE_DIRS.iter().copied(),
            DEFAULT_IGNORE_PATTERNS.iter().copied(),
            ignore_paths,
        )
    }

    pub fn ignore_paths(&self) -> &[PathBuf] {
        &self.ignore_paths
    }
}

impl WatchFilter for DefaultFilter {
    fn accept(&self, _kind: ChangeKind, path: &Path) -> bool {
        let in_ignored_dir = path.components().any(|c| {
            let name = c.as_os_str().to_string_lossy();
            self.ignore_dirs.iter().any(|d| *d == name)
        });
        if in_ignored_dir {
            return false;
        }

        if let Some(name) = path.file_name() {
            if self.ignore_set.is_match(Path::new(name)) {
                return false;
            }
        }

        !self.ignore_paths.iter().any(|p| path.starts_with(p))
    }
}

/// [`DefaultFilter`] restricted to files with one of the given extensions.
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    base: DefaultFilter,
    extensions: Vec<String>,
}

impl ExtensionFilter {
    /// Extensions may be given with or without the leading dot.
    pub fn new<I, S>(extensions: I, base: DefaultFilter) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_string())
            .filter(|e| !e.is_empty())
            .collect();
        Self { base, extensions }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

impl WatchFilter for ExtensionFilter {
    fn accept(&self, kind: ChangeKind, path: &Path) -> bool {
        let ext_ok = path
            .extension()
            .map(|ext| {
                let ext = ext.to_string_lossy();
                self.extensions.iter().any(|e| *e == ext)
            })
            .unwrap_or(false);
        ext_ok && self.base.accept(kind, path)
    }
}

/// Build the filter for a given mode.
///
/// Options that make no sense for the chosen mode are ignored with a warning
/// rather than rejected.
pub fn build_filter(
    mode: FilterMode,
    extensions: &[String],
    ignore_paths: Vec<PathBuf>,
) -> Result<Option<Box<dyn WatchFilter>>> {
    if mode != FilterMode::Extensions && !extensions.is_empty() {
        warn!(
            ?mode,
            "\"extensions\" ignored as the \"{}\" filter was selected",
            filter_mode_name(mode)
        );
    }

    match mode {
        FilterMode::All => {
            if !ignore_paths.is_empty() {
                warn!("\"ignore_paths\" ignored as the \"all\" filter was selected");
            }
            Ok(None)
        }
        FilterMode::Default => Ok(Some(Box::new(DefaultFilter::with_ignore_paths(
            ignore_paths,
        )?))),
        FilterMode::Extensions => {
            let base = DefaultFilter::with_ignore_paths(ignore_paths)?;
            let filter = if extensions.is_empty() {
                ExtensionFilter::new(DEFAULT_EXTENSIONS.iter().copied(), base)
            } else {
                ExtensionFilter::new(extensions, base)
            };
            Ok(Some(Box::new(filter)))
        }
    }
}

fn filter_mode_name(mode: FilterMode) -> &'static str {
    match mode {
        FilterMode::Default => "default",
        FilterMode::Extensions => "extensions",
        FilterMode::All => "all",
    }
}
