//! Scheduler tests. Time is paused so sleeps resolve as soon as the clock
//! is advanced.

use std::time::Duration;

use ladders_tick::{TickConfig, TickPolicy, TickScheduler};

#[test]
fn test_default_config_is_twenty_hertz() {
    let cfg = TickConfig::default();
    assert_eq!(cfg.tick_rate_hz, 20);
    assert_eq!(cfg.tick_duration(), Duration::from_millis(50));
    assert_eq!(cfg.policy, TickPolicy::Skip);
}

#[test]
fn test_validated_clamps_rate() {
    assert_eq!(TickConfig::with_rate(0).validated().tick_rate_hz, 1);
    assert_eq!(
        TickConfig::with_rate(1000).validated().tick_rate_hz,
        TickConfig::MAX_TICK_RATE_HZ
    );
    assert_eq!(TickConfig::with_rate(20).validated().tick_rate_hz, 20);
}

#[test]
fn test_validated_clamps_threshold() {
    let cfg = TickConfig {
        budget_warn_threshold: 3.0,
        ..TickConfig::default()
    }
    .validated();
    assert_eq!(cfg.budget_warn_threshold, 1.0);
}

#[test]
fn test_scheduler_initial_state() {
    let s = TickScheduler::with_rate(10);
    assert_eq!(s.tick_count(), 0);
    assert_eq!(s.overruns(), 0);
    assert_eq!(s.tick_rate_hz(), 10);
    assert_eq!(s.tick_duration(), Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn test_ticks_are_numbered_from_one() {
    let mut s = TickScheduler::with_rate(20);
    for expected in 1..=5 {
        let info = s.wait_for_tick().await;
        assert_eq!(info.tick, expected);
        assert!(!info.overrun);
    }
    assert_eq!(s.tick_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_ticks_are_spaced_one_period_apart() {
    let mut s = TickScheduler::with_rate(20);
    let start = tokio::time::Instant::now();
    s.wait_for_tick().await;
    s.wait_for_tick().await;
    assert_eq!(start.elapsed(), Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn test_skip_policy_reports_lost_ticks() {
    let mut s = TickScheduler::with_rate(20);
    s.wait_for_tick().await;

    // Stall for three and a half periods.
    tokio::time::advance(Duration::from_millis(175)).await;
    let info = s.wait_for_tick().await;

    assert!(info.overrun);
    assert_eq!(info.ticks_skipped, 2);
    assert_eq!(s.overruns(), 1);

    // Next tick is a full period after the late one.
    let before = tokio::time::Instant::now();
    let info = s.wait_for_tick().await;
    assert!(!info.overrun);
    assert_eq!(before.elapsed(), Duration::from_millis(50));
}

#[tokio::test(start_paused = true)]
async fn test_drop_policy_keeps_cadence() {
    let mut s = TickScheduler::new(TickConfig {
        policy: TickPolicy::Drop,
        ..TickConfig::with_rate(20)
    });
    let start = tokio::time::Instant::now();
    s.wait_for_tick().await;

    tokio::time::advance(Duration::from_millis(70)).await;
    let info = s.wait_for_tick().await;
    assert!(info.overrun);
    assert_eq!(info.ticks_skipped, 0);

    // Third tick stays on the original grid at 150 ms.
    s.wait_for_tick().await;
    assert_eq!(start.elapsed(), Duration::from_millis(150));
}

#[tokio::test(start_paused = true)]
async fn test_record_tick_end_needs_a_tick() {
    let mut s = TickScheduler::with_rate(20);
    assert_eq!(s.record_tick_end(), None);

    s.wait_for_tick().await;
    let utilization = s.record_tick_end().expect("tick in progress");
    assert!(utilization >= 0.0);
    assert_eq!(s.record_tick_end(), None);
}
