// Text analysis — normalization and pattern matching.
//
// Everything here is pure: no I/O, no shared mutable state. Safe to call
// from any number of concurrent evaluations.

pub mod confusables;
pub mod normalize;
pub mod patterns;

pub use normalize::{normalize, NormalizedText};
pub use patterns::PatternMatcher;
