//! Streaming filename search
//!
//! enumerator -> bridge -> engine -> collector, one short-lived pipeline per request.

pub mod bridge;
pub mod collector;
pub mod engine;
pub mod enumerator;

pub use bridge::{SearchLimits, SearchPipeline};
pub use collector::SearchResult;
pub use engine::{EngineError, EngineOptions, NucleoEngine};
pub use enumerator::{UnreadablePolicy, WalkError};
