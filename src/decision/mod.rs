// Decision aggregation and the decision data model.

pub mod aggregate;
pub mod models;

pub use aggregate::Aggregator;
pub use models::{AttributeScores, ModerationDecision, ViolationSet, EVASION_ATTEMPT};
