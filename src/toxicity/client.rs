// Scoring client — the only path from the engine to the oracle.
//
// Every call goes through the governor first (cache, sampling, budget).
// Only a `Proceed` admission reaches the scorer, and that call is bounded
// by a timeout with no retry. Anything short of clean scores becomes a
// `ScoringUnavailable` error, which the engine treats as "no scores".

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use super::traits::{MalformedResponse, RawScores, ToxicityScorer};
use crate::decision::AttributeScores;
use crate::error::{ModerationError, Result, UnavailableReason};
use crate::governor::{Admission, Governor};
use crate::output::truncate_chars;
use crate::text::NormalizedText;

/// Where a set of scores came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    Oracle,
    Cache,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredText {
    pub scores: AttributeScores,
    pub source: ScoreSource,
}

pub struct ScoringClient {
    scorer: Arc<dyn ToxicityScorer>,
    governor: Arc<Governor>,
    attributes: Vec<String>,
    timeout: Duration,
}

impl ScoringClient {
    pub fn new(
        scorer: Arc<dyn ToxicityScorer>,
        governor: Arc<Governor>,
        attributes: Vec<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            scorer,
            governor,
            attributes,
            timeout,
        }
    }

    /// Attributes requested on every oracle call.
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn governor(&self) -> &Governor {
        &self.governor
    }

    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn score(&self, text: &NormalizedText) -> Result<ScoredText> {
        if !self.scorer.is_enabled() {
            return Err(unavailable(UnavailableReason::Disabled));
        }

        match self.governor.acquire(text) {
            Admission::CacheHit(scores) => {
                return Ok(ScoredText {
                    scores,
                    source: ScoreSource::Cache,
                })
            }
            Admission::Denied(denial) => return Err(unavailable(denial.into())),
            Admission::Proceed => {}
        }

        debug!(
            scorer = self.scorer.name(),
            text_preview = %truncate_chars(text.as_str(), 50),
            "Calling scoring oracle"
        );

        let call = self.scorer.score_text(text.as_str(), &self.attributes);
        let raw = match tokio::time::timeout(self.timeout, call).await {
            Err(_) => return Err(unavailable(UnavailableReason::TimedOut(self.timeout))),
            Ok(Err(e)) => return Err(unavailable(classify(&e))),
            Ok(Ok(raw)) => raw,
        };

        let scores = clean_scores(&self.attributes, &raw).map_err(unavailable)?;
        self.governor.record(text, scores.clone());

        Ok(ScoredText {
            scores,
            source: ScoreSource::Oracle,
        })
    }
}

fn unavailable(reason: UnavailableReason) -> ModerationError {
    ModerationError::ScoringUnavailable(reason)
}

fn classify(err: &anyhow::Error) -> UnavailableReason {
    if err.downcast_ref::<MalformedResponse>().is_some() {
        UnavailableReason::Malformed(format!("{err:#}"))
    } else {
        UnavailableReason::Unreachable(format!("{err:#}"))
    }
}

/// Keep exactly the requested attributes. One the oracle left out scores 0;
/// a non-finite score poisons the whole response.
fn clean_scores(
    attributes: &[String],
    raw: &RawScores,
) -> std::result::Result<AttributeScores, UnavailableReason> {
    let mut scores = AttributeScores::new();
    for attribute in attributes {
        let value = raw.get(attribute).copied().unwrap_or(0.0);
        if !value.is_finite() {
            return Err(UnavailableReason::Malformed(format!(
                "non-finite score for {attribute}"
            )));
        }
        scores.insert(attribute.as_str(), value);
    }
    Ok(scores)
}
