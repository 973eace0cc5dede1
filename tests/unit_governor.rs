// Governor tests — budget windows, cache TTL and eviction, sampling, and
// the budget bound under concurrent callers. Time is driven by ManualClock.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use gatekeeper::decision::AttributeScores;
use gatekeeper::governor::{
    Admission, Denial, FixedSampler, Governor, GovernorSettings, ManualClock,
};
use gatekeeper::text::normalize;

fn settings(calls_per_window: u32) -> GovernorSettings {
    GovernorSettings {
        calls_per_window,
        ..GovernorSettings::default()
    }
}

fn governor(settings: GovernorSettings) -> (Governor, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let governor = Governor::with_parts(settings, clock.clone(), Box::new(FixedSampler(0.0)));
    (governor, clock)
}

fn scores(insult: f64) -> AttributeScores {
    [("INSULT", insult)].into_iter().collect()
}

#[test]
fn budget_is_per_window_and_resets() {
    let (governor, clock) = governor(settings(3));

    for i in 0..3 {
        assert_eq!(governor.acquire(&normalize(&format!("msg {i}"))), Admission::Proceed);
    }
    assert_eq!(
        governor.acquire(&normalize("msg 3")),
        Admission::Denied(Denial::RateExhausted)
    );

    clock.advance(Duration::from_secs(59));
    assert_eq!(
        governor.acquire(&normalize("msg 3")),
        Admission::Denied(Denial::RateExhausted)
    );

    clock.advance(Duration::from_secs(1));
    assert_eq!(governor.acquire(&normalize("msg 3")), Admission::Proceed);
    assert_eq!(governor.snapshot().remaining_calls, 2);
}

#[test]
fn cache_hit_still_served_when_budget_is_spent() {
    let (governor, _clock) = governor(settings(1));
    let text = normalize("you are a loser");

    assert_eq!(governor.acquire(&text), Admission::Proceed);
    governor.record(&text, scores(0.4));

    assert_eq!(
        governor.acquire(&normalize("something else")),
        Admission::Denied(Denial::RateExhausted)
    );
    assert_eq!(
        governor.acquire(&normalize("YOU are a   loser")),
        Admission::CacheHit(scores(0.4))
    );
}

#[test]
fn ttl_runs_from_insertion() {
    let (governor, clock) = governor(GovernorSettings {
        cache_ttl: Duration::from_secs(100),
        ..GovernorSettings::default()
    });
    let text = normalize("hello");
    governor.record(&text, scores(0.1));

    clock.advance(Duration::from_secs(60));
    assert!(matches!(governor.acquire(&text), Admission::CacheHit(_)));

    // the hit above didn't refresh the entry
    clock.advance(Duration::from_secs(40));
    assert_eq!(governor.acquire(&text), Admission::Proceed);
}

#[test]
fn full_cache_evicts_oldest_insertion() {
    let (governor, _clock) = governor(GovernorSettings {
        cache_capacity: 2,
        ..GovernorSettings::default()
    });
    governor.record(&normalize("first"), scores(0.1));
    governor.record(&normalize("second"), scores(0.2));
    governor.record(&normalize("third"), scores(0.3));

    assert_eq!(governor.snapshot().cached_entries, 2);
    assert_eq!(governor.acquire(&normalize("first")), Admission::Proceed);
    assert_eq!(
        governor.acquire(&normalize("third")),
        Admission::CacheHit(scores(0.3))
    );
}

#[test]
fn zero_capacity_disables_cache() {
    let (governor, _clock) = governor(GovernorSettings {
        cache_capacity: 0,
        ..GovernorSettings::default()
    });
    let text = normalize("hello");
    governor.record(&text, scores(0.1));
    assert_eq!(governor.acquire(&text), Admission::Proceed);
}

#[test]
fn sampling_denies_without_spending_budget() {
    let clock = Arc::new(ManualClock::new());
    let governor = Governor::with_parts(
        GovernorSettings {
            calls_per_window: 2,
            sample_rate: 0.3,
            ..GovernorSettings::default()
        },
        clock,
        Box::new(FixedSampler(0.7)),
    );

    for i in 0..10 {
        assert_eq!(
            governor.acquire(&normalize(&format!("msg {i}"))),
            Admission::Denied(Denial::SampledOut)
        );
    }
    assert_eq!(governor.snapshot().remaining_calls, 2);
}

#[test]
fn budget_holds_under_concurrent_callers() {
    let (governor, _clock) = governor(settings(25));
    let governor = Arc::new(governor);
    let proceeded = Arc::new(AtomicU32::new(0));

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let governor = governor.clone();
            let proceeded = proceeded.clone();
            thread::spawn(move || {
                for i in 0..20 {
                    let text = normalize(&format!("worker {worker} message {i}"));
                    if governor.acquire(&text) == Admission::Proceed {
                        proceeded.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(proceeded.load(Ordering::SeqCst), 25);
    assert_eq!(governor.snapshot().remaining_calls, 0);
}

#[test]
fn snapshot_reports_time_to_reset() {
    let (governor, clock) = governor(settings(1));
    clock.advance(Duration::from_secs(15));
    assert_eq!(governor.snapshot().resets_in, Duration::from_secs(45));
}
