// Decision aggregation — merges pattern evidence with oracle scores.
//
// Two tiers of evidence:
//   - trigger matches are sufficient on their own
//   - evasion-indicator matches need the oracle to score the same attribute
//     at or above its threshold; without that they contribute nothing
//
// Oracle scores also stand on their own: any attribute at or over its
// threshold is a violation whether or not a pattern matched.

use std::collections::{BTreeMap, BTreeSet};

use super::models::{AttributeScores, ModerationDecision, ViolationSet, EVASION_ATTEMPT};
use crate::text::NormalizedText;

/// Applies the threshold and corroboration rules. Holds only the immutable
/// threshold table, so one instance is shared by all evaluations.
#[derive(Debug, Clone)]
pub struct Aggregator {
    thresholds: BTreeMap<String, f64>,
}

impl Aggregator {
    pub fn new(thresholds: BTreeMap<String, f64>) -> Self {
        Self { thresholds }
    }

    pub fn threshold(&self, attribute: &str) -> Option<f64> {
        self.thresholds.get(attribute).copied()
    }

    /// Whether `attribute` scored at or above its threshold. Attributes
    /// without a configured threshold never count.
    fn clears_threshold(&self, scores: &AttributeScores, attribute: &str) -> bool {
        match (scores.get(attribute), self.threshold(attribute)) {
            (Some(score), Some(threshold)) => score >= threshold,
            _ => false,
        }
    }

    /// Build the final decision. `scores` is `None` when the oracle couldn't
    /// be consulted; the decision then rests on trigger matches alone.
    pub fn decide(
        &self,
        text: NormalizedText,
        trigger_matches: &BTreeSet<String>,
        evasion_matches: &BTreeSet<String>,
        scores: Option<AttributeScores>,
    ) -> ModerationDecision {
        let mut violations = ViolationSet::new();

        for category in trigger_matches {
            violations.insert(category.as_str());
        }

        if let Some(scores) = &scores {
            for (attribute, _) in scores.iter() {
                if self.clears_threshold(scores, attribute) {
                    violations.insert(attribute);
                }
            }

            for attribute in evasion_matches {
                if self.clears_threshold(scores, attribute) {
                    violations.insert(attribute.as_str());
                    violations.insert(EVASION_ATTEMPT);
                }
            }
        }

        ModerationDecision::new(text, violations, scores.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::normalize;

    fn aggregator() -> Aggregator {
        Aggregator::new(
            [("INSULT", 0.85), ("THREAT", 0.85), ("TOXICITY", 0.85)]
                .into_iter()
                .map(|(a, t)| (a.to_string(), t))
                .collect(),
        )
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_trigger_alone_flags_without_scores() {
        let decision = aggregator().decide(normalize("x"), &set(&["slur"]), &set(&[]), None);
        assert!(decision.triggered());
        assert!(decision.violations().contains("slur"));
        assert!(decision.scores().is_empty());
    }

    #[test]
    fn test_indicator_without_scores_contributes_nothing() {
        let decision = aggregator().decide(normalize("x"), &set(&[]), &set(&["INSULT"]), None);
        assert!(!decision.triggered());
        assert!(decision.violations().is_empty());
    }

    #[test]
    fn test_indicator_below_threshold_contributes_nothing() {
        let scores: AttributeScores = [("INSULT", 0.40)].into_iter().collect();
        let decision =
            aggregator().decide(normalize("x"), &set(&[]), &set(&["INSULT"]), Some(scores));
        assert!(!decision.triggered());
    }

    #[test]
    fn test_corroborated_indicator_adds_attribute_and_marker() {
        let scores: AttributeScores = [("INSULT", 0.90)].into_iter().collect();
        let decision =
            aggregator().decide(normalize("x"), &set(&[]), &set(&["INSULT"]), Some(scores));
        assert!(decision.triggered());
        assert!(decision.violations().contains("INSULT"));
        assert!(decision.violations().contains(EVASION_ATTEMPT));
    }

    #[test]
    fn test_score_alone_over_threshold_is_violation_without_marker() {
        let scores: AttributeScores = [("THREAT", 0.95), ("INSULT", 0.1)].into_iter().collect();
        let decision = aggregator().decide(normalize("x"), &set(&[]), &set(&[]), Some(scores));
        assert!(decision.triggered());
        assert!(decision.violations().contains("THREAT"));
        assert!(!decision.violations().contains(EVASION_ATTEMPT));
        assert_eq!(decision.violations().len(), 1);
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        let scores: AttributeScores = [("TOXICITY", 0.85)].into_iter().collect();
        let decision = aggregator().decide(normalize("x"), &set(&[]), &set(&[]), Some(scores));
        assert!(decision.violations().contains("TOXICITY"));
    }

    #[test]
    fn test_indicator_for_other_attribute_is_not_corroborated() {
        // THREAT indicator, but only INSULT scored high
        let scores: AttributeScores = [("INSULT", 0.9), ("THREAT", 0.2)].into_iter().collect();
        let decision =
            aggregator().decide(normalize("x"), &set(&[]), &set(&["THREAT"]), Some(scores));
        assert!(decision.violations().contains("INSULT"));
        assert!(!decision.violations().contains("THREAT"));
        assert!(!decision.violations().contains(EVASION_ATTEMPT));
    }

    #[test]
    fn test_unconfigured_attribute_is_ignored() {
        let scores: AttributeScores = [("FLIRTATION", 0.99)].into_iter().collect();
        let decision = aggregator().decide(normalize("x"), &set(&[]), &set(&[]), Some(scores));
        assert!(!decision.triggered());
    }

    #[test]
    fn test_all_evidence_combines() {
        let scores: AttributeScores = [("INSULT", 0.9), ("TOXICITY", 0.5)].into_iter().collect();
        let decision =
            aggregator().decide(normalize("x"), &set(&["slur"]), &set(&["INSULT"]), Some(scores));
        let violations: Vec<&str> = decision.violations().iter().collect();
        assert_eq!(violations, vec![EVASION_ATTEMPT, "INSULT", "slur"]);
    }
}
