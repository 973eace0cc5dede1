// Colored terminal output for inspection reports, scans and policy.
//
// main.rs delegates all human-readable display here. JSON output goes
// straight through serde_json and never touches this module.

use colored::Colorize;

use super::{percent, truncate_chars};
use crate::config::Config;
use crate::decision::EVASION_ATTEMPT;
use crate::engine::{Evaluation, ModerationEngine, ScoringOutcome};
use crate::pipeline::scan::ScanSummary;
use crate::policy::Policy;
use crate::toxicity::ScoreSource;

/// Display the full evidence trail for one message (the `check` report).
pub fn display_evaluation(evaluation: &Evaluation, engine: &ModerationEngine) {
    println!("\n{}", "=== Moderation Check ===".bold());
    println!("  Message:    {}", evaluation.original_text);
    println!(
        "  Normalized: {}",
        evaluation.decision.normalized_text().as_str().dimmed()
    );

    if !evaluation.enabled {
        println!(
            "\n  {} moderation is disabled (ENABLE_AI_MOD=false), nothing was checked",
            "~".yellow()
        );
        return;
    }

    println!("\n  Trigger matches:   {}", list_or_none(&evaluation.trigger_matches));
    println!("  Evasion indicators: {}", list_or_none(&evaluation.indicator_matches));

    match &evaluation.scoring {
        ScoringOutcome::Scored { source, scores } => {
            let source = match source {
                ScoreSource::Oracle => "oracle".normal(),
                ScoreSource::Cache => "cache".cyan(),
            };
            println!("\n  Scores ({source}):");
            for (attribute, score) in scores.iter() {
                let threshold = engine.aggregator().threshold(attribute);
                let over = threshold.is_some_and(|t| score >= t);
                let value = if over {
                    percent(score).red().bold()
                } else {
                    percent(score).normal()
                };
                let threshold = threshold.map(percent).unwrap_or_else(|| "-".to_string());
                println!(
                    "    {:<18} {:>5}  {}",
                    attribute,
                    value,
                    format!("(threshold {threshold})").dimmed()
                );
            }
        }
        ScoringOutcome::Unavailable { reason, .. } => {
            println!("\n  Scores: {} {}", "unavailable".yellow(), format!("({reason})").dimmed());
        }
        ScoringOutcome::Skipped => {}
    }

    let decision = &evaluation.decision;
    println!();
    if decision.triggered() {
        println!("  Verdict: {}", "FLAGGED".red().bold());
        println!("  Violations: {}", colorize_violations(decision.violations().iter()));
    } else {
        println!("  Verdict: {}", "clean".green());
    }
}

/// One line per flagged message during a scan.
pub fn display_flagged(evaluation: &Evaluation) {
    println!(
        "  {} {:<40} {}",
        "!".red().bold(),
        truncate_chars(&evaluation.original_text, 40),
        colorize_violations(evaluation.decision.violations().iter()),
    );
}

pub fn display_scan_summary(summary: &ScanSummary) {
    println!(
        "\n{}",
        format!("=== Scan Summary ({} messages) ===", summary.total).bold()
    );
    let flagged = if summary.flagged > 0 {
        summary.flagged.to_string().red().bold()
    } else {
        summary.flagged.to_string().green()
    };
    println!("  Flagged:           {flagged}");
    println!("  Scored by oracle:  {}", summary.scored_by_oracle);
    println!("  Served from cache: {}", summary.served_from_cache);
    if summary.degraded > 0 {
        println!("  Pattern-only:      {}", summary.degraded.to_string().yellow());
    } else {
        println!("  Pattern-only:      0");
    }
}

/// Display the active policy and the settings around it.
pub fn display_policy(policy: &Policy, config: &Config, engine: &ModerationEngine) {
    println!("\n{}", "=== Moderation Policy ===".bold());
    let source = match &config.policy_path {
        Some(path) => path.display().to_string(),
        None => "built-in".to_string(),
    };
    println!("  Source: {source}");
    let enabled = if config.enabled {
        "enabled".green()
    } else {
        "disabled".yellow()
    };
    println!("  Engine: {enabled}");
    let client = engine.client();
    let oracle = if config.has_perspective() {
        client.scorer_name().normal()
    } else {
        format!("{} (pattern-only)", client.scorer_name()).yellow()
    };
    println!("  Oracle: {oracle}");

    println!("\n  Thresholds:");
    for (attribute, threshold) in &policy.thresholds {
        println!("    {:<18} {:>5}", attribute, percent(*threshold));
    }

    println!("\n  Trigger categories:");
    if policy.triggers.is_empty() {
        println!("    {}", "(none)".dimmed());
    }
    for (category, patterns) in &policy.triggers {
        println!("    {:<18} {} patterns", category, patterns.len());
    }

    let matcher = engine.matcher();
    println!("  Compiled trigger patterns: {}", matcher.trigger_count());
    println!("\n  Evasion indicators: {}", matcher.indicator_count());
    if !policy.allowlist.is_empty() {
        println!("  Allowlist: {}", policy.allowlist.join(", ").dimmed());
    }

    println!("\n  Governor:");
    println!("    Budget:      {} calls/min", config.rate_limit);
    println!("    Sample rate: {}", percent(config.sample_rate));
    println!(
        "    Cache:       {} entries, {}s TTL",
        config.cache_max_size,
        config.cache_ttl.as_secs()
    );
    println!("    Timeout:     {}ms", client.timeout().as_millis());
}

fn list_or_none<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    let joined: Vec<&str> = items.into_iter().map(String::as_str).collect();
    if joined.is_empty() {
        "none".dimmed().to_string()
    } else {
        joined.join(", ")
    }
}

fn colorize_violations<'a>(violations: impl Iterator<Item = &'a str>) -> String {
    violations
        .map(|v| {
            if v == EVASION_ATTEMPT {
                v.magenta().to_string()
            } else {
                v.red().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
