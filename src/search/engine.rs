//! Match engine contract and the bundled nucleo-backed engine
//!
//! An engine consumes candidate lines from an input channel and writes matching
//! lines to an output channel, in filter mode: the first output line echoes the
//! query, every following line is a matched candidate. Engines are blocking and
//! run on the blocking thread pool; they return when the input channel closes.

use nucleo_matcher::pattern::{CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Config, Matcher, Utf32Str};
use thiserror::Error;
use tokio::sync::mpsc;
use unicode_normalization::UnicodeNormalization;

/// Engine failure, surfaced to the caller as a search error
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("output channel closed before all matches were delivered")]
    OutputClosed,
    #[error("match engine exited abnormally: {0}")]
    Aborted(String),
}

/// Normal engine outcomes; neither is a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineExit {
    /// At least one candidate matched
    Matched,
    /// Ran to completion without a match
    NoMatch,
}

/// Streaming fuzzy matcher.
///
/// `run` blocks the calling thread and must only be called from a blocking
/// context (`tokio::task::spawn_blocking` or a plain thread). It must drop
/// `output` on return so the consumer observes end of stream.
pub trait MatchEngine: Send + Sync {
    /// Short engine name for logs
    fn name(&self) -> &'static str;

    fn run(
        &self,
        query: &str,
        input: mpsc::Receiver<String>,
        output: mpsc::Sender<String>,
    ) -> Result<EngineExit, EngineError>;
}

/// Options for [`NucleoEngine`]
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Emit the query as the first output line
    pub print_query: bool,
    /// Emit matches best-first instead of in input order
    pub sort_by_score: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            print_query: true,
            sort_by_score: false,
        }
    }
}

/// Fuzzy engine backed by nucleo-matcher.
///
/// Accepts fzf-style patterns: whitespace separated terms that must all match,
/// `'exact`, `^prefix`, `suffix$` and `!negation`. Case is smart (case
/// sensitive only when the query has uppercase characters) and scoring uses
/// the path-aware bonus configuration.
#[derive(Debug, Clone, Default)]
pub struct NucleoEngine {
    options: EngineOptions,
}

impl NucleoEngine {
    pub fn with_options(options: EngineOptions) -> Self {
        Self { options }
    }
}

fn send(output: &mpsc::Sender<String>, line: String) -> Result<(), EngineError> {
    output.blocking_send(line).map_err(|_| EngineError::OutputClosed)
}

impl MatchEngine for NucleoEngine {
    fn name(&self) -> &'static str {
        "nucleo"
    }

    fn run(
        &self,
        query: &str,
        mut input: mpsc::Receiver<String>,
        output: mpsc::Sender<String>,
    ) -> Result<EngineExit, EngineError> {
        let pattern = Pattern::parse(query, CaseMatching::Smart, Normalization::Smart);
        let mut matcher = Matcher::new(Config::DEFAULT.match_paths());
        let mut buf = Vec::new();

        if self.options.print_query {
            send(&output, query.to_string())?;
        }

        let mut matched = 0usize;
        let mut ranked: Vec<(u32, String)> = Vec::new();

        while let Some(candidate) = input.blocking_recv() {
            let haystack: String = candidate.nfc().collect();
            let Some(score) = pattern.score(Utf32Str::new(&haystack, &mut buf), &mut matcher)
            else {
                continue;
            };

            matched += 1;
            if self.options.sort_by_score {
                ranked.push((score, candidate));
            } else {
                send(&output, candidate)?;
            }
        }

        if self.options.sort_by_score {
            // stable, so equal scores keep input order
            ranked.sort_by(|a, b| b.0.cmp(&a.0));
            for (_, candidate) in ranked {
                send(&output, candidate)?;
            }
        }

        Ok(if matched > 0 {
            EngineExit::Matched
        } else {
            EngineExit::NoMatch
        })
    }
}
