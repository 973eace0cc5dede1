// Batch scan: run many messages through the engine concurrently.
//
// Used by `gatekeeper scan` to replay a message log (one message per line)
// against the active policy. Every message is independent, so they are
// evaluated with bounded concurrency and results arrive in completion order.

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use serde::Serialize;

use crate::engine::{Evaluation, ModerationEngine, ScoringOutcome};
use crate::toxicity::ScoreSource;

/// Counts across one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub total: usize,
    pub flagged: usize,
    pub scored_by_oracle: usize,
    pub served_from_cache: usize,
    /// Decided on pattern evidence alone because scoring was unavailable.
    pub degraded: usize,
}

impl ScanSummary {
    pub fn record(&mut self, evaluation: &Evaluation) {
        self.total += 1;
        if evaluation.decision.triggered() {
            self.flagged += 1;
        }
        match &evaluation.scoring {
            ScoringOutcome::Scored {
                source: ScoreSource::Oracle,
                ..
            } => self.scored_by_oracle += 1,
            ScoringOutcome::Scored {
                source: ScoreSource::Cache,
                ..
            } => self.served_from_cache += 1,
            ScoringOutcome::Unavailable { .. } => self.degraded += 1,
            ScoringOutcome::Skipped => {}
        }
    }
}

pub struct ScanReport {
    /// Evaluations in completion order, not input order.
    pub evaluations: Vec<Evaluation>,
    pub summary: ScanSummary,
}

impl ScanReport {
    pub fn flagged(&self) -> impl Iterator<Item = &Evaluation> {
        self.evaluations.iter().filter(|e| e.decision.triggered())
    }
}

/// Evaluate `messages` with at most `concurrency` in flight. Blank lines
/// are skipped. `progress`, if given, ticks once per finished message.
pub async fn run(
    engine: &ModerationEngine,
    messages: Vec<String>,
    concurrency: usize,
    progress: Option<&ProgressBar>,
) -> ScanReport {
    let evaluations: Vec<Evaluation> = stream::iter(
        messages
            .into_iter()
            .filter(|m| !m.trim().is_empty())
            .map(|message| async move { engine.inspect(&message).await }),
    )
    .buffer_unordered(concurrency.max(1))
    .inspect(|_| {
        if let Some(pb) = progress {
            pb.inc(1);
        }
    })
    .collect()
    .await;

    let mut summary = ScanSummary::default();
    for evaluation in &evaluations {
        summary.record(evaluation);
    }

    ScanReport {
        evaluations,
        summary,
    }
}
