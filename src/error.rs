// Error types for the moderation engine.
//
// Only two things can go wrong: the oracle can't give us scores for a message
// (recoverable, the decision falls back to pattern evidence), or the policy
// handed to us at startup is broken (fatal, the engine refuses to start).

use std::time::Duration;

/// Why the scoring client couldn't produce scores for a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    /// Network failure or a non-2xx response from the oracle.
    Unreachable(String),
    /// The oracle didn't answer within the configured timeout.
    TimedOut(Duration),
    /// The oracle answered with something we can't use.
    Malformed(String),
    /// The per-minute call budget is spent for the current window.
    RateExhausted,
    /// The sampling policy skipped this message.
    SampledOut,
    /// No oracle is configured (e.g. missing API key).
    Disabled,
}

impl UnavailableReason {
    /// Governor denials are expected under load and aren't worth a warning.
    pub fn is_denial(&self) -> bool {
        matches!(self, Self::RateExhausted | Self::SampledOut)
    }
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreachable(msg) => write!(f, "oracle unreachable: {msg}"),
            Self::TimedOut(after) => write!(f, "oracle timed out after {}ms", after.as_millis()),
            Self::Malformed(msg) => write!(f, "malformed oracle response: {msg}"),
            Self::RateExhausted => write!(f, "oracle call budget exhausted"),
            Self::SampledOut => write!(f, "skipped by sampling policy"),
            Self::Disabled => write!(f, "no oracle configured"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    #[error("scoring unavailable: {0}")]
    ScoringUnavailable(UnavailableReason),

    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),
}

impl ModerationError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigurationInvalid(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ModerationError>;
