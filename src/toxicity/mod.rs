// Toxicity scoring — trait-based abstraction for swappable oracles.
//
// The ToxicityScorer trait defines the transport. PerspectiveScorer implements
// it using Google's Perspective API. ScoringClient wraps any scorer with the
// governor, a timeout and score cleanup, and is what the engine calls.

pub mod client;
pub mod perspective;
pub mod traits;

pub use client::{ScoreSource, ScoredText, ScoringClient};
pub use perspective::PerspectiveScorer;
pub use traits::{MalformedResponse, NoopScorer, RawScores, ToxicityScorer};
