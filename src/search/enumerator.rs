//! Directory enumeration
//!
//! Walks a search root and lazily yields the relative paths of regular files,
//! pruning hidden entries and well-known dependency/cache directories. The walk
//! is sorted by file name so the same tree always yields the same sequence, and
//! symlinks are never followed so cycles cannot occur.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Ceiling on files yielded by one walk
pub const DEFAULT_MAX_FILES: usize = 5_000;

/// Directory names pruned together with their whole subtree
pub const PRUNED_DIRS: [&str; 3] = ["node_modules", ".git", "__pycache__"];

/// Enumeration failure
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("cannot read {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        /// Depth below the root; 0 is the root itself
        depth: usize,
        #[source]
        source: io::Error,
    },
}

impl WalkError {
    fn from_walkdir(err: walkdir::Error, root: &Path) -> Self {
        let path = err.path().unwrap_or(root).to_path_buf();
        let depth = err.depth();
        let source = err
            .into_io_error()
            .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
        WalkError::Io {
            path,
            depth,
            source,
        }
    }

    /// The path the walk failed at
    pub fn path(&self) -> &Path {
        match self {
            WalkError::Io { path, .. } => path,
        }
    }

    /// Whether the search root itself could not be read
    pub fn at_root(&self) -> bool {
        match self {
            WalkError::Io { depth, .. } => *depth == 0,
        }
    }

    pub fn kind(&self) -> io::ErrorKind {
        match self {
            WalkError::Io { source, .. } => source.kind(),
        }
    }
}

/// What to do when an entry cannot be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnreadablePolicy {
    /// Fail the whole enumeration
    #[default]
    Abort,
    /// Log and keep walking
    Skip,
}

/// A path relative to the active search root.
///
/// Never empty and never starts with a path separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidatePath(String);

impl CandidatePath {
    /// Build from a relative path; `None` for empty, absolute or non UTF-8 paths
    pub fn from_relative(path: &Path) -> Option<Self> {
        if path.as_os_str().is_empty() || path.has_root() {
            return None;
        }
        let text = path.to_str()?;
        if text.starts_with(std::path::is_separator) {
            return None;
        }
        Some(Self(text.to_string()))
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// File budget for a single walk
#[derive(Debug, Clone)]
pub struct EnumerationBudget {
    max_files: usize,
    current_count: usize,
}

impl Default for EnumerationBudget {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILES)
    }
}

impl EnumerationBudget {
    pub fn new(max_files: usize) -> Self {
        Self {
            max_files,
            current_count: 0,
        }
    }

    pub fn current_count(&self) -> usize {
        self.current_count
    }

    pub fn is_exhausted(&self) -> bool {
        self.current_count >= self.max_files
    }

    fn record(&mut self) {
        self.current_count += 1;
    }
}

/// Whether an entry survives the prune rules.
///
/// The walk root itself is always kept so that roots such as `.` work.
fn is_visible(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return true;
    }

    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') {
        return false;
    }

    !(entry.file_type().is_dir() && PRUNED_DIRS.contains(&name.as_ref()))
}

type FilteredWalk = walkdir::FilterEntry<walkdir::IntoIter, fn(&DirEntry) -> bool>;

/// Lazy, single-use walk over a search root
pub struct Enumeration {
    root: PathBuf,
    walker: FilteredWalk,
    budget: EnumerationBudget,
    policy: UnreadablePolicy,
    finished: bool,
}

/// Start a fresh walk of `root`; unreadable entries abort it
pub fn enumerate(root: &Path, budget: EnumerationBudget) -> Enumeration {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(is_visible as fn(&DirEntry) -> bool);

    Enumeration {
        root: root.to_path_buf(),
        walker,
        budget,
        policy: UnreadablePolicy::default(),
        finished: false,
    }
}

impl Enumeration {
    pub fn with_unreadable_policy(mut self, policy: UnreadablePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Files yielded so far
    pub fn yielded(&self) -> usize {
        self.budget.current_count()
    }

    /// Drain the walk, failing on the first error
    pub fn collect_candidates(mut self) -> Result<Vec<CandidatePath>, WalkError> {
        let candidates = self.by_ref().collect::<Result<Vec<_>, _>>()?;
        debug!("Walked {} files under {}", self.yielded(), self.root.display());
        Ok(candidates)
    }
}

impl Iterator for Enumeration {
    type Item = Result<CandidatePath, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished || self.budget.is_exhausted() {
                self.finished = true;
                return None;
            }

            let entry = match self.walker.next() {
                None => {
                    self.finished = true;
                    return None;
                }
                Some(Ok(entry)) => entry,
                Some(Err(err)) => match self.policy {
                    UnreadablePolicy::Skip => {
                        debug!("Skipping unreadable entry: {}", err);
                        continue;
                    }
                    UnreadablePolicy::Abort => {
                        self.finished = true;
                        return Some(Err(WalkError::from_walkdir(err, &self.root)));
                    }
                },
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };

            let Some(candidate) = CandidatePath::from_relative(relative) else {
                debug!("Skipping non UTF-8 path: {}", entry.path().display());
                continue;
            };

            self.budget.record();
            return Some(Ok(candidate));
        }
    }
}

impl std::iter::FusedIterator for Enumeration {}
