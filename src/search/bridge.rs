//! Search pipeline
//!
//! Wires one request's enumeration into the match engine and the engine's
//! output into the result collector:
//!
//! ```text
//! enumerate ──> producer ──[input, pre-sized]──> engine ──[output, bounded]──> collector ──oneshot──> caller
//! ```
//!
//! The input channel is sized to the candidate count so the producer never
//! blocks; the output channel is bounded and drained by its own task so the
//! engine can always make progress. The caller only waits on the oneshot and
//! the engine's exit status.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, warn};

use super::collector::{ResultCollector, SearchResult};
use super::engine::{EngineError, EngineExit, MatchEngine};
use super::enumerator::{enumerate, EnumerationBudget, UnreadablePolicy, DEFAULT_MAX_FILES};
use crate::error::AppError;

/// Hard cap on candidates handed to the engine
pub const DEFAULT_MAX_CANDIDATES: usize = 10_000;

/// Capacity of the engine output channel
pub const DEFAULT_OUTPUT_CAPACITY: usize = 100;

/// Default deadline for one search
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-request limits.
///
/// `max_files` bounds the walk and `max_candidates` bounds what reaches the
/// engine; the effective cap is the smaller of the two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchLimits {
    pub max_files: usize,
    pub max_candidates: usize,
    pub max_results: usize,
    pub output_capacity: usize,
    /// `None` waits for the engine indefinitely
    pub timeout: Option<Duration>,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_MAX_FILES,
            max_candidates: DEFAULT_MAX_CANDIDATES,
            max_results: DEFAULT_MAX_CANDIDATES,
            output_capacity: DEFAULT_OUTPUT_CAPACITY,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

impl SearchLimits {
    pub fn candidate_cap(&self) -> usize {
        self.max_files.min(self.max_candidates)
    }
}

/// Outcome of one pipeline run
#[derive(Debug)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub candidates: usize,
    pub exit: EngineExit,
    pub elapsed: Duration,
}

/// Runs searches against a shared engine
#[derive(Clone)]
pub struct SearchPipeline {
    engine: Arc<dyn MatchEngine>,
    limits: SearchLimits,
    unreadable: UnreadablePolicy,
}

impl SearchPipeline {
    pub fn new(engine: Arc<dyn MatchEngine>, limits: SearchLimits) -> Self {
        Self {
            engine,
            limits,
            unreadable: UnreadablePolicy::default(),
        }
    }

    pub fn with_unreadable_policy(mut self, policy: UnreadablePolicy) -> Self {
        self.unreadable = policy;
        self
    }

    /// Walk `root` on the blocking pool
    async fn enumerate(&self, root: &Path) -> Result<Vec<String>, AppError> {
        let root = root.to_path_buf();
        let budget = EnumerationBudget::new(self.limits.max_files);
        let policy = self.unreadable;

        let mut candidates = tokio::task::spawn_blocking(move || {
            enumerate(&root, budget)
                .with_unreadable_policy(policy)
                .collect_candidates()
        })
        .await
        .map_err(|e| AppError::Internal(format!("enumeration task failed: {}", e)))??;

        let cap = self.limits.candidate_cap();
        if candidates.len() > cap {
            debug!("Truncating {} candidates to {}", candidates.len(), cap);
            candidates.truncate(cap);
        }

        Ok(candidates.into_iter().map(|c| c.into_string()).collect())
    }

    /// Run one search of `query` under `root`.
    ///
    /// The deadline covers the walk as well as matching.
    pub async fn run(&self, root: &Path, query: &str) -> Result<SearchOutcome, AppError> {
        let started = Instant::now();

        let finished = match self.limits.timeout {
            Some(deadline) => match tokio::time::timeout(deadline, self.execute(root, query)).await
            {
                Ok(finished) => finished,
                Err(_) => {
                    warn!(
                        "Search for {:?} in {} exceeded {:?}",
                        query,
                        root.display(),
                        deadline
                    );
                    return Err(AppError::Timeout(format!(
                        "search exceeded {} seconds",
                        deadline.as_secs_f64()
                    )));
                }
            },
            None => self.execute(root, query).await,
        };

        let (results, candidates, exit) = finished.inspect_err(|e| {
            warn!(
                "Search for {:?} in {} failed [{}]: {}",
                query,
                root.display(),
                e.error_code(),
                e
            );
        })?;

        Ok(SearchOutcome {
            results,
            candidates,
            exit,
            elapsed: started.elapsed(),
        })
    }

    async fn execute(
        &self,
        root: &Path,
        query: &str,
    ) -> Result<(Vec<SearchResult>, usize, EngineExit), AppError> {
        let candidates = self.enumerate(root).await?;
        let candidate_count = candidates.len();

        let (input_tx, input_rx) = mpsc::channel::<String>(candidate_count.max(1));
        let (output_tx, output_rx) = mpsc::channel::<String>(self.limits.output_capacity.max(1));
        let (done_tx, done_rx) = oneshot::channel::<Vec<SearchResult>>();
        let mut tasks = AbortOnDrop::default();

        let collector = ResultCollector::new(PathBuf::from(root), query, self.limits.max_results);
        tasks.push(tokio::spawn(async move {
            let results = collector.drain(output_rx).await;
            let _ = done_tx.send(results);
        }));

        let engine = Arc::clone(&self.engine);
        let engine_query = query.to_string();
        let engine_task = tokio::task::spawn_blocking(move || {
            engine.run(&engine_query, input_rx, output_tx)
        });

        tasks.push(tokio::spawn(async move {
            for candidate in candidates {
                if input_tx.send(candidate).await.is_err() {
                    break;
                }
            }
        }));

        let results = done_rx
            .await
            .map_err(|_| AppError::Internal("result collector stopped".to_string()))?;

        let exit = match engine_task.await {
            Ok(Ok(exit)) => exit,
            Ok(Err(e)) => return Err(AppError::from(e)),
            Err(e) => return Err(AppError::from(EngineError::Aborted(e.to_string()))),
        };
        debug!("Engine {} finished: {:?}", self.engine.name(), exit);

        Ok((results, candidate_count, exit))
    }
}

/// Aborts the producer and collector when a search is abandoned.
///
/// Dropping their channel ends lets a blocking engine unwind on its own.
#[derive(Default)]
struct AbortOnDrop(Vec<AbortHandle>);

impl AbortOnDrop {
    fn push(&mut self, task: JoinHandle<()>) {
        self.0.push(task.abort_handle());
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}
