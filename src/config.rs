use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ModerationError, Result};
use crate::governor::GovernorSettings;
use crate::policy::{Policy, DEFAULT_THRESHOLD};
use crate::toxicity::perspective::DEFAULT_API_URL;
use crate::toxicity::{NoopScorer, PerspectiveScorer, ToxicityScorer};

/// Central configuration loaded from environment variables.
///
/// All secrets come from env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy. Every value is read
/// once; changing the environment later has no effect.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// ENABLE_AI_MOD — anything but "false" leaves moderation on.
    pub enabled: bool,
    /// Empty means no oracle: decisions rest on trigger patterns alone.
    pub perspective_api_key: String,
    pub perspective_api_url: String,
    /// Threshold applied to every attribute of the built-in policy.
    /// Ignored when a policy file is used.
    pub toxicity_threshold: f64,
    pub sample_rate: f64,
    /// Oracle calls allowed per minute.
    pub rate_limit: u32,
    pub cache_ttl: Duration,
    pub cache_max_size: usize,
    pub timeout: Duration,
    /// JSON policy file replacing the built-in policy.
    pub policy_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary key lookup. `load` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let enabled = var("ENABLE_AI_MOD")
            .map(|v| !v.trim().eq_ignore_ascii_case("false"))
            .unwrap_or(true);

        let toxicity_threshold = parse(&var, "TOXICITY_THRESHOLD", DEFAULT_THRESHOLD)?;
        if !(0.0..=1.0).contains(&toxicity_threshold) {
            return Err(ModerationError::config(format!(
                "TOXICITY_THRESHOLD must be in [0, 1], got {toxicity_threshold}"
            )));
        }

        let sample_rate = parse(&var, "MOD_SAMPLE_RATE", 1.0_f64)?;
        if !(0.0..=1.0).contains(&sample_rate) {
            return Err(ModerationError::config(format!(
                "MOD_SAMPLE_RATE must be in [0, 1], got {sample_rate}"
            )));
        }

        let rate_limit = parse(&var, "PERSPECTIVE_RATE_LIMIT", 30_u32)?;
        if rate_limit == 0 {
            return Err(ModerationError::config(
                "PERSPECTIVE_RATE_LIMIT must be at least 1",
            ));
        }

        let timeout_ms = parse(&var, "PERSPECTIVE_TIMEOUT_MS", 3000_u64)?;
        if timeout_ms == 0 {
            return Err(ModerationError::config(
                "PERSPECTIVE_TIMEOUT_MS must be at least 1",
            ));
        }

        Ok(Self {
            enabled,
            perspective_api_key: var("PERSPECTIVE_API_KEY").unwrap_or_default(),
            perspective_api_url: var("PERSPECTIVE_API_URL")
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            toxicity_threshold,
            sample_rate,
            rate_limit,
            cache_ttl: Duration::from_secs(parse(&var, "MODERATION_CACHE_TTL_SECS", 1800_u64)?),
            cache_max_size: parse(&var, "MODERATION_CACHE_MAX_SIZE", 100_usize)?,
            timeout: Duration::from_millis(timeout_ms),
            policy_path: var("MODERATION_POLICY").map(PathBuf::from),
        })
    }

    pub fn has_perspective(&self) -> bool {
        !self.perspective_api_key.is_empty()
    }

    /// The active policy: the file named by MODERATION_POLICY, or the
    /// built-in policy at TOXICITY_THRESHOLD. Always validated.
    pub fn load_policy(&self) -> Result<Policy> {
        match &self.policy_path {
            Some(path) => Policy::load(path),
            None => {
                let policy = Policy::builtin(self.toxicity_threshold);
                policy.validate()?;
                Ok(policy)
            }
        }
    }

    pub fn governor_settings(&self) -> GovernorSettings {
        GovernorSettings {
            calls_per_window: self.rate_limit,
            window: Duration::from_secs(60),
            cache_capacity: self.cache_max_size,
            cache_ttl: self.cache_ttl,
            sample_rate: self.sample_rate,
        }
    }

    /// Perspective when a key is configured, otherwise the no-op scorer.
    pub fn build_scorer(&self) -> Arc<dyn ToxicityScorer> {
        if self.has_perspective() {
            Arc::new(PerspectiveScorer::new(
                self.perspective_api_key.clone(),
                self.perspective_api_url.clone(),
            ))
        } else {
            Arc::new(NoopScorer)
        }
    }
}

fn parse<T, F>(var: &F, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e| {
            ModerationError::config(format!("{name}={raw:?} is not valid: {e}"))
        }),
    }
}
