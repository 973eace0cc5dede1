// Decision data model — what the engine hands to enforcement.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::text::NormalizedText;

/// Synthetic violation added when an evasion indicator is corroborated by
/// the oracle.
pub const EVASION_ATTEMPT: &str = "EVASION_ATTEMPT";

/// Per-attribute oracle scores for one text, each in [0, 1].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AttributeScores(BTreeMap<String, f64>);

impl AttributeScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a score, clamped into [0, 1].
    pub fn insert(&mut self, attribute: impl Into<String>, score: f64) {
        self.0.insert(attribute.into(), score.clamp(0.0, 1.0));
    }

    pub fn get(&self, attribute: &str) -> Option<f64> {
        self.0.get(attribute).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Highest score across all attributes, if any.
    pub fn max(&self) -> Option<(&str, f64)> {
        self.iter().max_by(|a, b| a.1.total_cmp(&b.1))
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for AttributeScores {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut scores = Self::new();
        for (attribute, score) in iter {
            scores.insert(attribute, score);
        }
        scores
    }
}

/// The set of reasons a message was flagged. Order-independent; adding
/// the same violation twice is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ViolationSet(BTreeSet<String>);

impl ViolationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, violation: impl Into<String>) -> bool {
        self.0.insert(violation.into())
    }

    pub fn contains(&self, violation: &str) -> bool {
        self.0.contains(violation)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ViolationSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        write!(f, "{}", joined.join(", "))
    }
}

impl<S: Into<String>> FromIterator<S> for ViolationSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// The verdict for one message. Enforcement acts on `triggered` and
/// `violations` alone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModerationDecision {
    triggered: bool,
    violations: ViolationSet,
    scores: AttributeScores,
    normalized_text: NormalizedText,
}

impl ModerationDecision {
    /// `triggered` is derived from the violations so the two can't disagree.
    pub(crate) fn new(
        normalized_text: NormalizedText,
        violations: ViolationSet,
        scores: AttributeScores,
    ) -> Self {
        Self {
            triggered: !violations.is_empty(),
            violations,
            scores,
            normalized_text,
        }
    }

    pub fn triggered(&self) -> bool {
        self.triggered
    }

    pub fn violations(&self) -> &ViolationSet {
        &self.violations
    }

    /// Oracle scores used for this decision; empty when scoring was unavailable.
    pub fn scores(&self) -> &AttributeScores {
        &self.scores
    }

    pub fn normalized_text(&self) -> &NormalizedText {
        &self.normalized_text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_are_clamped() {
        let scores: AttributeScores = [("INSULT", 1.7), ("THREAT", -0.2)].into_iter().collect();
        assert_eq!(scores.get("INSULT"), Some(1.0));
        assert_eq!(scores.get("THREAT"), Some(0.0));
    }

    #[test]
    fn test_max_score() {
        let scores: AttributeScores = [("INSULT", 0.4), ("THREAT", 0.9), ("TOXICITY", 0.6)]
            .into_iter()
            .collect();
        assert_eq!(scores.max(), Some(("THREAT", 0.9)));
        assert_eq!(AttributeScores::new().max(), None);
    }

    #[test]
    fn test_violations_collapse_duplicates() {
        let mut violations = ViolationSet::new();
        assert!(violations.insert("INSULT"));
        assert!(!violations.insert("INSULT"));
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn test_violation_display_is_sorted() {
        let violations: ViolationSet = ["THREAT", "INSULT", "slur"].into_iter().collect();
        assert_eq!(violations.to_string(), "INSULT, THREAT, slur");
    }

    #[test]
    fn test_decision_serializes_for_audit_log() {
        let decision = ModerationDecision::new(
            crate::text::normalize("Hello"),
            ["INSULT"].into_iter().collect(),
            [("INSULT", 0.9)].into_iter().collect(),
        );
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["triggered"], true);
        assert_eq!(json["violations"][0], "INSULT");
        assert_eq!(json["normalized_text"], "hello");
        assert!((json["scores"]["INSULT"].as_f64().unwrap() - 0.9).abs() < 1e-12);
    }
}
