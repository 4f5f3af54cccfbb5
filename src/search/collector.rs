//! Result collection
//!
//! Drains the engine's output channel, drops protocol noise (blank lines and
//! the query echo) and turns each matched relative path into a
//! [`SearchResult`] by stat-ing it under the search root.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::debug;

/// One matched file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Path relative to the search root
    pub path: String,
    /// Base name of `path`
    pub filename: String,
    /// Size in bytes
    pub size: u64,
}

impl SearchResult {
    pub fn new(path: String, size: u64) -> Self {
        let filename = Path::new(&path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone());
        Self {
            path,
            filename,
            size,
        }
    }
}

/// Accumulates results for one search
pub struct ResultCollector {
    root: PathBuf,
    query: String,
    max_results: usize,
    results: Vec<SearchResult>,
    dropped: usize,
}

impl ResultCollector {
    pub fn new(root: impl Into<PathBuf>, query: impl Into<String>, max_results: usize) -> Self {
        Self {
            root: root.into(),
            query: query.into().trim().to_string(),
            max_results,
            results: Vec::new(),
            dropped: 0,
        }
    }

    /// Whether a trimmed engine line is a real candidate.
    ///
    /// Every line equal to the query is treated as the echo, wherever it
    /// appears, so a path identical to the query is never reported.
    fn accepts(&self, line: &str) -> bool {
        !line.is_empty() && line != self.query
    }

    /// Stat one matched line and keep it if the file still exists
    pub async fn push(&mut self, raw: &str) {
        let line = raw.trim();
        if !self.accepts(line) {
            return;
        }

        if self.results.len() >= self.max_results {
            self.dropped += 1;
            return;
        }

        match tokio::fs::metadata(self.root.join(line)).await {
            Ok(metadata) => {
                self.results.push(SearchResult::new(line.to_string(), metadata.len()));
            }
            Err(e) => {
                debug!("Dropping match {}: {}", line, e);
            }
        }
    }

    /// Consume the output channel until it closes.
    ///
    /// Keeps receiving after `max_results` is reached so the engine never
    /// blocks on a full channel.
    pub async fn drain(mut self, mut output: mpsc::Receiver<String>) -> Vec<SearchResult> {
        while let Some(line) = output.recv().await {
            self.push(&line).await;
        }

        if self.dropped > 0 {
            debug!("Result limit reached, {} matches discarded", self.dropped);
        }

        self.results
    }
}
