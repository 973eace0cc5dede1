// Gatekeeper: moderation decisions for chat messages
//
// This is the library root. Each module corresponds to one stage of the
// decision pipeline, plus the configuration and output around it.

pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod governor;
pub mod output;
pub mod pipeline;
pub mod policy;
pub mod text;
pub mod toxicity;

pub use decision::ModerationDecision;
pub use engine::{Evaluation, ModerationEngine};
pub use error::{ModerationError, UnavailableReason};
