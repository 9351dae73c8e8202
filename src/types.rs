// src/types.rs

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Category of a filesystem change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

impl ChangeKind {
    /// Lowercase name used in logs and in `WATCHFILES_CHANGES`.
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
        }
    }

    /// Map the raw numeric codes (1 = added, 2 = modified, 3 = deleted).
    pub fn from_raw(code: u8) -> Option<Self> {
        match code {
            1 => Some(ChangeKind::Added),
            2 => Some(ChangeKind::Modified),
            3 => Some(ChangeKind::Deleted),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "added" => Ok(ChangeKind::Added),
            "modified" => Ok(ChangeKind::Modified),
            "deleted" => Ok(ChangeKind::Deleted),
            other => Err(format!(
                "invalid change kind: {other} (expected \"added\", \"modified\" or \"deleted\")"
            )),
        }
    }
}

/// A single `(kind, path)` change. Compared and hashed by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub path: PathBuf,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.path.display())
    }
}

/// Set of changes accumulated during one debounce window.
///
/// Duplicates collapse to one entry; iteration follows the order in which
/// each distinct event was first seen.
#[derive(Debug, Clone, Default)]
pub struct ChangeBatch {
    order: Vec<ChangeEvent>,
    seen: HashSet<ChangeEvent>,
}

impl ChangeBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an event, returning `false` if it was already present.
    pub fn insert(&mut self, event: ChangeEvent) -> bool {
        if self.seen.contains(&event) {
            return false;
        }
        self.seen.insert(event.clone());
        self.order.push(event);
        true
    }

    pub fn contains(&self, event: &ChangeEvent) -> bool {
        self.seen.contains(event)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChangeEvent> {
        self.order.iter()
    }
}

impl PartialEq for ChangeBatch {
    fn eq(&self, other: &Self) -> bool {
        self.seen == other.seen
    }
}

impl Eq for ChangeBatch {}

impl Extend<ChangeEvent> for ChangeBatch {
    fn extend<I: IntoIterator<Item = ChangeEvent>>(&mut self, iter: I) {
        for event in iter {
            self.insert(event);
        }
    }
}

impl FromIterator<ChangeEvent> for ChangeBatch {
    fn from_iter<I: IntoIterator<Item = ChangeEvent>>(iter: I) -> Self {
        let mut batch = ChangeBatch::new();
        batch.extend(iter);
        batch
    }
}

impl<'a> IntoIterator for &'a ChangeBatch {
    type Item = &'a ChangeEvent;
    type IntoIter = std::slice::Iter<'a, ChangeEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.iter()
    }
}

/// Which built-in watch filter to apply.
///
/// - `Default`: ignore VCS/cache directories and editor artifacts.
/// - `Extensions`: like `Default`, but only accept files with one of the
///   configured extensions (`py`, `pyx`, `pyd` when none are configured).
/// - `All`: accept every change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    Default,
    Extensions,
    All,
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "default" => Ok(FilterMode::Default),
            "extensions" => Ok(FilterMode::Extensions),
            "all" => Ok(FilterMode::All),
            other => Err(format!(
                "invalid filter mode: {other} (expected \"default\", \"extensions\" or \"all\")"
            )),
        }
    }
}
