// Moderation policy — the static tables that drive pattern matching and
// aggregation: per-attribute thresholds, trigger categories, evasion
// indicators and the indicator allowlist.
//
// A policy is loaded once at startup (built-in defaults, or a JSON file named
// by MODERATION_POLICY), validated, and never mutated afterwards. Anything
// wrong with it is fatal: an engine running a half-valid policy would quietly
// let content through.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::decision::EVASION_ATTEMPT;
use crate::error::{ModerationError, Result};
use crate::text::patterns::PatternMatcher;

/// Attributes requested from the oracle by the built-in policy.
pub const DEFAULT_ATTRIBUTES: [&str; 7] = [
    "TOXICITY",
    "SEVERE_TOXICITY",
    "INSULT",
    "THREAT",
    "PROFANITY",
    "IDENTITY_ATTACK",
    "OBSCENE",
];

pub const DEFAULT_THRESHOLD: f64 = 0.85;

/// Words that don't count as a target in the direct-targeting indicator
/// ("you are the best", "you are this close"). Only rules with
/// `allowlisted` set consult it.
pub const DEFAULT_ALLOWLIST: [&str; 10] = [
    "the", "this", "that", "all", "with", "was", "it", "game", "thing", "shit",
];

/// An evasion-indicator rule: a pattern that only counts once the oracle
/// scores `attribute` over its threshold on the same text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndicatorRule {
    pub pattern: String,
    pub attribute: String,
    /// Drop matches whose span is made up of allowlisted words.
    #[serde(default)]
    pub allowlisted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Policy {
    /// Attribute name -> score threshold in [0, 1]. The keys are also the
    /// set of attributes requested from the oracle.
    pub thresholds: BTreeMap<String, f64>,
    /// Trigger category -> ordered patterns. Any match flags the message.
    #[serde(default)]
    pub triggers: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub indicators: Vec<IndicatorRule>,
    #[serde(default)]
    pub allowlist: Vec<String>,
}

impl Policy {
    /// The built-in policy, with every attribute at `threshold`.
    pub fn builtin(threshold: f64) -> Self {
        let thresholds = DEFAULT_ATTRIBUTES
            .iter()
            .map(|a| (a.to_string(), threshold))
            .collect();

        let triggers = builtin_triggers()
            .iter()
            .map(|(category, patterns)| {
                (
                    category.to_string(),
                    patterns.iter().map(|p| p.to_string()).collect(),
                )
            })
            .collect();

        let indicators = builtin_indicators()
            .iter()
            .map(|&(pattern, attribute, allowlisted)| IndicatorRule {
                pattern: pattern.to_string(),
                attribute: attribute.to_string(),
                allowlisted,
            })
            .collect();

        Self {
            thresholds,
            triggers,
            indicators,
            allowlist: DEFAULT_ALLOWLIST.iter().map(|w| w.to_string()).collect(),
        }
    }

    /// Parse and validate a JSON policy document.
    pub fn from_json(json: &str) -> Result<Self> {
        let policy: Policy = serde_json::from_str(json)
            .map_err(|e| ModerationError::config(format!("policy is not valid JSON: {e}")))?;
        policy.validate()?;
        Ok(policy)
    }

    /// Read, parse and validate a JSON policy file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ModerationError::config(format!("cannot read policy file {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Attributes to request from the oracle, in stable order.
    pub fn attributes(&self) -> Vec<String> {
        self.thresholds.keys().cloned().collect()
    }

    /// Check every invariant the engine relies on, including that all
    /// patterns compile.
    pub fn validate(&self) -> Result<()> {
        if self.thresholds.is_empty() {
            return Err(ModerationError::config("policy defines no attribute thresholds"));
        }

        for (attribute, &threshold) in &self.thresholds {
            if attribute.trim().is_empty() {
                return Err(ModerationError::config("attribute names must not be empty"));
            }
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ModerationError::config(format!(
                    "threshold for {attribute} is {threshold}, expected a value in [0, 1]"
                )));
            }
        }

        for (category, patterns) in &self.triggers {
            if category.trim().is_empty() {
                return Err(ModerationError::config("trigger category names must not be empty"));
            }
            if category == EVASION_ATTEMPT {
                return Err(ModerationError::config(format!(
                    "{EVASION_ATTEMPT} is reserved and can't be used as a trigger category"
                )));
            }
            if patterns.is_empty() {
                return Err(ModerationError::config(format!(
                    "trigger category {category} has no patterns"
                )));
            }
        }

        for rule in &self.indicators {
            if !self.thresholds.contains_key(&rule.attribute) {
                return Err(ModerationError::config(format!(
                    "indicator pattern {:?} maps to {}, which has no threshold",
                    rule.pattern, rule.attribute
                )));
            }
        }

        PatternMatcher::compile(self).map(|_| ())
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::builtin(DEFAULT_THRESHOLD)
    }
}

/// Curated, high-precision patterns. A hit is enough on its own.
///
/// Patterns see normalized text, where any run of 3+ identical characters is
/// already down to one ("killl" -> "kil"), so stretched letters are matched
/// with `+` rather than exact counts.
fn builtin_triggers() -> &'static [(&'static str, &'static [&'static str])] {
    &[
        (
            "slur",
            &[
                r"\bn+i+g(?:g+(?:a|ah|uh|er|az)|a|ah|uh|az)s?\b",
                // "nigggers" collapses to "nigers"; the singular is left out
                // so the country name doesn't trigger
                r"\bn+i+gers\b",
                r"\bf+a+g+(?:o+t+)?s?\b",
                r"\br+e+t+a+r+d+(?:s|ed)?\b",
                r"\bk+i+k+e+s?\b",
                r"\bc+h+i+n+k+s?\b",
                r"\bt+r+a+n+(?:y|ie)s?\b",
            ],
        ),
        (
            "explicit_threat",
            &[
                r"\b(?:i will|ill|im gonna|im going to|i am gonna|i am going to|imma)\s+(?:k+i+l+|m+u+r+d+e+r+|s+t+a+b+|s+h+o+t+|s+t+r+a+n+g+l+e+)\s+(?:you|u|ya|your family)\b",
                r"\bk+i+l+\s+(?:yourself|your self|urself|yoself)\b",
                r"\bk+y+s+\b",
            ],
        ),
    ]
}

/// Heuristic patterns for obfuscated abuse, as (pattern, attribute,
/// allowlisted). They only count when the oracle agrees on the same
/// attribute. Patterns run on normalized text, so spacing, casing, stretched
/// letters and most leetspeak are already gone.
fn builtin_indicators() -> &'static [(&'static str, &'static str, bool)] {
    &[
        (r"\bf+(?:[uv]+c*|c+)k+(?:ing|in|er|ers|ed|s)?\b", "PROFANITY", false),
        (r"\bf+a+k+\b", "PROFANITY", false),
        (r"\bs+h+i+t+(?:s|ty|ter)?\b", "PROFANITY", false),
        (r"\bs+h+e+t+\b", "PROFANITY", false),
        (r"\bb+i+t*c+h+(?:es|y)?\b", "INSULT", false),
        (r"\bb+e+t+c+h+", "INSULT", false),
        (r"\ba+s{2,}(?:hole|holes|hat)?\b", "INSULT", false),
        (
            r"\b(?:you|u)\s*(?:are|r|re)\s+(?:an?\s+|such\s+an?\s+|so\s+)?(\w+)",
            "INSULT",
            true,
        ),
        (r"\bk+i+l+(?:ing|ed)?\b", "THREAT", false),
        (r"\br+a+p+e+(?:d|s|ist)?\b", "THREAT", false),
        (r"\bp+o+r+n+", "OBSCENE", false),
        (r"\bs+e+x+", "OBSCENE", false),
        (r"\bg+a+y+\s?b+o+[iy]+\b", "IDENTITY_ATTACK", false),
    ]
}
