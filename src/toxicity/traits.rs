// Toxicity scorer trait — the swap-ready oracle abstraction.
//
// The engine only ever sees this trait. Perspective is the production
// implementation; tests plug in fakes that count, fail or stall.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

/// Raw per-attribute scores as the oracle reported them. Unclamped and
/// possibly missing attributes; the scoring client cleans them up.
pub type RawScores = HashMap<String, f64>;

/// Tag for transport errors caused by a response we couldn't interpret
/// (as opposed to one we never got). Attach it with `anyhow::Error::new`
/// so the scoring client can tell the two apart.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct MalformedResponse(pub String);

/// Trait for scoring text against a set of attributes. Implementations must
/// be async because the oracle sits behind an HTTP API.
#[async_trait]
pub trait ToxicityScorer: Send + Sync {
    /// Score one text for every attribute in `attributes` with a single call.
    async fn score_text(&self, text: &str, attributes: &[String]) -> Result<RawScores>;

    /// Whether this scorer talks to a real oracle. The scoring client never
    /// spends budget on a scorer that doesn't.
    fn is_enabled(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str;
}

/// Stand-in used when no oracle is configured. Every decision then rests on
/// trigger patterns alone.
pub struct NoopScorer;

#[async_trait]
impl ToxicityScorer for NoopScorer {
    async fn score_text(&self, _text: &str, _attributes: &[String]) -> Result<RawScores> {
        anyhow::bail!("no scoring oracle configured (set PERSPECTIVE_API_KEY)")
    }

    fn is_enabled(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_scorer_refuses_to_score() {
        let scorer = NoopScorer;
        assert!(!scorer.is_enabled());
        let err = scorer
            .score_text("hello", &["TOXICITY".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("PERSPECTIVE_API_KEY"));
    }

    #[test]
    fn test_malformed_tag_survives_context() {
        use anyhow::Context;
        let err: anyhow::Error = anyhow::Error::new(MalformedResponse("no scores".into()));
        let err = Err::<(), _>(err).context("Perspective call failed").unwrap_err();
        assert!(err.downcast_ref::<MalformedResponse>().is_some());
    }
}
