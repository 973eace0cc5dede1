// Pattern matching over normalized text.
//
// Two families of patterns, compiled once from the policy and shared
// read-only by every evaluation:
//
// - trigger patterns: curated, high precision, a match flags the message
//   on its own.
// - evasion indicators: heuristics for obfuscated abuse, each tied to an
//   oracle attribute. A match is only evidence; the aggregator decides
//   whether the oracle corroborates it.
//
// Indicators marked `allowlisted` drop matches whose span consists entirely
// of allowlisted words. When such an indicator has capture groups, the
// captured text is the span that's checked ("you are (the) best" -> "the");
// otherwise the whole match is. Other indicators and all trigger patterns
// ignore the allowlist.

use std::collections::{BTreeSet, HashSet};

use regex_lite::{Regex, RegexBuilder};
use tracing::trace;

use super::normalize::{normalize, NormalizedText};
use crate::error::{ModerationError, Result};
use crate::policy::Policy;

struct TriggerCategory {
    name: String,
    patterns: Vec<Regex>,
}

struct EvasionIndicator {
    attribute: String,
    pattern: Regex,
    allowlisted: bool,
}

pub struct PatternMatcher {
    triggers: Vec<TriggerCategory>,
    indicators: Vec<EvasionIndicator>,
    allowlist: HashSet<String>,
}

impl PatternMatcher {
    /// Compile every pattern in the policy. Fails on the first pattern that
    /// doesn't compile, naming where it came from.
    pub fn compile(policy: &Policy) -> Result<Self> {
        let triggers = policy
            .triggers
            .iter()
            .map(|(name, patterns)| {
                let patterns = patterns
                    .iter()
                    .map(|p| compile_pattern(p, &format!("trigger category {name}")))
                    .collect::<Result<Vec<_>>>()?;
                Ok(TriggerCategory {
                    name: name.clone(),
                    patterns,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let indicators = policy
            .indicators
            .iter()
            .map(|rule| {
                Ok(EvasionIndicator {
                    attribute: rule.attribute.clone(),
                    pattern: compile_pattern(
                        &rule.pattern,
                        &format!("indicator for {}", rule.attribute),
                    )?,
                    allowlisted: rule.allowlisted,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // Allowlist entries go through the same normalizer as messages so
        // "THE" or "th3" in a policy file still line up with normalized text
        let allowlist = policy
            .allowlist
            .iter()
            .map(|w| normalize(w).into_string())
            .filter(|w| !w.is_empty())
            .collect();

        Ok(Self {
            triggers,
            indicators,
            allowlist,
        })
    }

    /// Every trigger category with at least one matching pattern.
    pub fn match_triggers(&self, text: &NormalizedText) -> BTreeSet<String> {
        self.triggers
            .iter()
            .filter(|category| category.patterns.iter().any(|p| p.is_match(text.as_str())))
            .map(|category| category.name.clone())
            .collect()
    }

    /// Every attribute with at least one indicator match that survives the
    /// allowlist.
    pub fn match_evasion_indicators(&self, text: &NormalizedText) -> BTreeSet<String> {
        self.indicators
            .iter()
            .filter(|indicator| self.has_unsuppressed_match(indicator, text.as_str()))
            .map(|indicator| indicator.attribute.clone())
            .collect()
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.iter().map(|c| c.patterns.len()).sum()
    }

    pub fn indicator_count(&self) -> usize {
        self.indicators.len()
    }

    fn has_unsuppressed_match(&self, indicator: &EvasionIndicator, text: &str) -> bool {
        if !indicator.allowlisted {
            return indicator.pattern.is_match(text);
        }

        indicator.pattern.captures_iter(text).any(|caps| {
            let span: Vec<&str> = if caps.len() > 1 {
                (1..caps.len())
                    .filter_map(|i| caps.get(i))
                    .map(|m| m.as_str())
                    .collect()
            } else {
                caps.get(0).map(|m| m.as_str()).into_iter().collect()
            };

            let suppressed = self.is_allowlisted(&span);
            if suppressed {
                trace!(span = ?span, "Indicator match suppressed by allowlist");
            }
            !suppressed
        })
    }

    fn is_allowlisted(&self, span: &[&str]) -> bool {
        let mut words = span
            .iter()
            .flat_map(|s| s.split(|c: char| !c.is_alphanumeric()))
            .filter(|w| !w.is_empty())
            .peekable();

        // An empty span has nothing to excuse it
        words.peek().is_some() && words.all(|w| self.allowlist.contains(w))
    }
}

fn compile_pattern(pattern: &str, origin: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| ModerationError::config(format!("bad pattern {pattern:?} in {origin}: {e}")))
}
