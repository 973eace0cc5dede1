// Moderation engine — the single entry point enforcement calls.
//
// raw text -> normalize -> { pattern matching, scoring client } -> aggregate
//
// Matching is synchronous and cheap; the oracle call is the only await.
// Nothing here fails per message: scoring problems degrade the decision to
// pattern evidence and are logged, never returned.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::decision::{Aggregator, AttributeScores, ModerationDecision};
use crate::error::{ModerationError, Result, UnavailableReason};
use crate::governor::Governor;
use crate::output::truncate_chars;
use crate::policy::Policy;
use crate::text::{normalize, NormalizedText, PatternMatcher};
use crate::toxicity::{ScoreSource, ScoringClient, ToxicityScorer};

/// How scoring went for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScoringOutcome {
    Scored {
        source: ScoreSource,
        scores: AttributeScores,
    },
    Unavailable {
        reason: String,
        #[serde(skip)]
        detail: UnavailableReason,
    },
    /// The engine is switched off; nothing was matched or scored.
    Skipped,
}

impl ScoringOutcome {
    pub fn scores(&self) -> Option<&AttributeScores> {
        match self {
            Self::Scored { scores, .. } => Some(scores),
            _ => None,
        }
    }

    pub fn source(&self) -> Option<ScoreSource> {
        match self {
            Self::Scored { source, .. } => Some(*source),
            _ => None,
        }
    }

    pub fn unavailable_reason(&self) -> Option<&UnavailableReason> {
        match self {
            Self::Unavailable { detail, .. } => Some(detail),
            _ => None,
        }
    }
}

/// Full evidence trail for one message, for the inspection report and
/// audit logging.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub original_text: String,
    pub enabled: bool,
    pub trigger_matches: BTreeSet<String>,
    pub indicator_matches: BTreeSet<String>,
    pub scoring: ScoringOutcome,
    pub decision: ModerationDecision,
    pub evaluated_at: DateTime<Utc>,
}

pub struct ModerationEngine {
    matcher: PatternMatcher,
    aggregator: Aggregator,
    client: ScoringClient,
    enabled: bool,
}

impl ModerationEngine {
    /// Build an engine from a validated policy. Fails if the policy is invalid.
    pub fn new(policy: &Policy, client: ScoringClient, enabled: bool) -> Result<Self> {
        policy.validate()?;
        let matcher = PatternMatcher::compile(policy)?;
        let aggregator = Aggregator::new(policy.thresholds.clone());

        if client.attributes() != policy.attributes().as_slice() {
            return Err(ModerationError::config(
                "scoring client attributes don't match the policy thresholds",
            ));
        }

        Ok(Self {
            matcher,
            aggregator,
            client,
            enabled,
        })
    }

    /// Wire up policy, governor and scorer from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let policy = config.load_policy()?;
        Self::with_scorer(config, &policy, config.build_scorer())
    }

    /// Like `from_config`, with an explicit policy and scorer.
    pub fn with_scorer(
        config: &Config,
        policy: &Policy,
        scorer: Arc<dyn ToxicityScorer>,
    ) -> Result<Self> {
        let governor = Arc::new(Governor::new(config.governor_settings()));
        let client = ScoringClient::new(scorer, governor, policy.attributes(), config.timeout);
        Self::new(policy, client, config.enabled)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn matcher(&self) -> &PatternMatcher {
        &self.matcher
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn client(&self) -> &ScoringClient {
        &self.client
    }

    /// Decide one message. Never fails.
    pub async fn evaluate(&self, text: &str) -> ModerationDecision {
        self.inspect(text).await.decision
    }

    /// Decide one message and keep the intermediate evidence.
    pub async fn inspect(&self, text: &str) -> Evaluation {
        let normalized = normalize(text);

        if !self.enabled {
            return Evaluation {
                original_text: text.to_string(),
                enabled: false,
                trigger_matches: BTreeSet::new(),
                indicator_matches: BTreeSet::new(),
                scoring: ScoringOutcome::Skipped,
                decision: self.aggregator.decide(normalized, &BTreeSet::new(), &BTreeSet::new(), None),
                evaluated_at: Utc::now(),
            };
        }

        let trigger_matches = self.matcher.match_triggers(&normalized);
        let indicator_matches = self.matcher.match_evasion_indicators(&normalized);

        let scoring = self.score(&normalized).await;
        let decision = self.aggregator.decide(
            normalized,
            &trigger_matches,
            &indicator_matches,
            scoring.scores().cloned(),
        );

        debug!(
            text_preview = %truncate_chars(decision.normalized_text().as_str(), 50),
            triggers = trigger_matches.len(),
            indicators = indicator_matches.len(),
            scored = scoring.scores().is_some(),
            "Evaluated message"
        );

        if decision.triggered() {
            info!(
                violations = %decision.violations(),
                text_preview = %truncate_chars(decision.normalized_text().as_str(), 50),
                "Message flagged"
            );
        }

        Evaluation {
            original_text: text.to_string(),
            enabled: true,
            trigger_matches,
            indicator_matches,
            scoring,
            decision,
            evaluated_at: Utc::now(),
        }
    }

    async fn score(&self, text: &NormalizedText) -> ScoringOutcome {
        match self.client.score(text).await {
            Ok(scored) => ScoringOutcome::Scored {
                source: scored.source,
                scores: scored.scores,
            },
            Err(ModerationError::ScoringUnavailable(reason)) => {
                if !reason.is_denial() && reason != UnavailableReason::Disabled {
                    warn!(%reason, "Scoring unavailable, deciding on patterns alone");
                }
                ScoringOutcome::Unavailable {
                    reason: reason.to_string(),
                    detail: reason,
                }
            }
            Err(other) => {
                warn!(error = %other, "Scoring failed, deciding on patterns alone");
                let reason = UnavailableReason::Unreachable(other.to_string());
                ScoringOutcome::Unavailable {
                    reason: reason.to_string(),
                    detail: reason,
                }
            }
        }
    }
}
