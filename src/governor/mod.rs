// Rate governor — decides whether a text may reach the scoring oracle.
//
// Order of checks for each text:
//   1. cache: fresh scores for the same normalized text are reused for free
//   2. sampling: a miss is only forwarded with probability `sample_rate`
//   3. budget: at most `calls_per_window` oracle calls per window
//
// Sampling runs before the budget so a sampled-out miss costs nothing.
// Cache and budget share one mutex, which makes check-and-consume atomic
// across concurrent evaluations. The lock is never held across an await.

pub mod cache;
pub mod clock;
pub mod rate_limiter;
pub mod sampling;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::decision::AttributeScores;
use crate::error::UnavailableReason;
use crate::text::NormalizedText;

pub use cache::ScoreCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use rate_limiter::RateBudget;
pub use sampling::{FixedSampler, RandomSampler, Sampler, SamplingPolicy};

/// Tunables for one governor instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GovernorSettings {
    pub calls_per_window: u32,
    pub window: Duration,
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
    /// Fraction of cache misses forwarded to the oracle, in [0, 1].
    pub sample_rate: f64,
}

impl Default for GovernorSettings {
    fn default() -> Self {
        Self {
            calls_per_window: 30,
            window: Duration::from_secs(60),
            cache_capacity: 100,
            cache_ttl: Duration::from_secs(30 * 60),
            sample_rate: 1.0,
        }
    }
}

/// Why a miss was not forwarded to the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    RateExhausted,
    SampledOut,
}

impl From<Denial> for UnavailableReason {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::RateExhausted => UnavailableReason::RateExhausted,
            Denial::SampledOut => UnavailableReason::SampledOut,
        }
    }
}

/// Outcome of asking the governor for permission to score a text.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// Fresh scores were cached; no call needed.
    CacheHit(AttributeScores),
    /// One unit of budget was consumed; the caller should call the oracle.
    Proceed,
    Denied(Denial),
}

/// Point-in-time view of governor state, for status output and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GovernorSnapshot {
    pub remaining_calls: u32,
    pub cached_entries: usize,
    pub resets_in: Duration,
}

struct GovernorState {
    cache: ScoreCache,
    budget: RateBudget,
    /// Window start for which exhaustion was last logged.
    exhaustion_logged_for: Option<Instant>,
}

pub struct Governor {
    state: Mutex<GovernorState>,
    sampling: SamplingPolicy,
    clock: Arc<dyn Clock>,
}

impl Governor {
    /// Governor on the system clock with random sampling.
    pub fn new(settings: GovernorSettings) -> Self {
        Self::with_parts(settings, Arc::new(SystemClock), Box::new(RandomSampler))
    }

    /// Governor with an injected clock and sampler.
    pub fn with_parts(
        settings: GovernorSettings,
        clock: Arc<dyn Clock>,
        sampler: Box<dyn Sampler>,
    ) -> Self {
        let now = clock.now();
        Self {
            state: Mutex::new(GovernorState {
                cache: ScoreCache::new(settings.cache_capacity, settings.cache_ttl),
                budget: RateBudget::new(settings.calls_per_window, settings.window, now),
                exhaustion_logged_for: None,
            }),
            sampling: SamplingPolicy::new(settings.sample_rate, sampler),
            clock,
        }
    }

    // A panic while holding the lock can't leave cache or budget in a torn
    // state (every mutation is a single step), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, GovernorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn acquire(&self, text: &NormalizedText) -> Admission {
        let now = self.clock.now();
        let mut state = self.lock();

        if let Some(scores) = state.cache.get(text, now) {
            debug!(text = %text, "Score cache hit");
            return Admission::CacheHit(scores);
        }

        if !self.sampling.admits() {
            debug!(rate = self.sampling.rate(), "Cache miss sampled out");
            return Admission::Denied(Denial::SampledOut);
        }

        if !state.budget.try_take(now) {
            let window = state.budget.window_start();
            if state.exhaustion_logged_for != Some(window) {
                state.exhaustion_logged_for = Some(window);
                info!(
                    capacity = state.budget.capacity(),
                    resets_in_secs = state.budget.resets_in(now).as_secs(),
                    "Scoring budget exhausted, falling back to pattern-only decisions"
                );
            }
            return Admission::Denied(Denial::RateExhausted);
        }

        Admission::Proceed
    }

    /// Cache scores from a successful oracle call.
    pub fn record(&self, text: &NormalizedText, scores: AttributeScores) {
        let now = self.clock.now();
        self.lock().cache.insert(text.clone(), scores, now);
    }

    pub fn snapshot(&self) -> GovernorSnapshot {
        let now = self.clock.now();
        let mut state = self.lock();
        state.cache.purge_expired(now);
        GovernorSnapshot {
            remaining_calls: state.budget.remaining(now),
            cached_entries: state.cache.len(),
            resets_in: state.budget.resets_in(now),
        }
    }
}
