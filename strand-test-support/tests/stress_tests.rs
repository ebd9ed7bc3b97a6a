//! Short stress runs over every wait strategy and producer mode.
//!
//! Run with `--nocapture` to see progress output.

use std::time::Duration;

use strand::disruptor::WaitStrategyType;
use strand_test_support::stress::print_summary;
use strand_test_support::{ StressConfig, StressRunner };

fn run(config: StressConfig) {
    let expected = config.total_events();
    let metrics = StressRunner::new(config).run().unwrap();
    print_summary(&metrics);

    assert_eq!(metrics.errors, 0, "ordering violations");
    assert_eq!(metrics.events_published, expected);
    assert_eq!(metrics.events_processed, expected);
    assert_eq!(metrics.lost(), 0);
}

#[test]
fn test_stress_single_producer_busy_spin() {
    strand::init_tracing();
    run(StressConfig::new(200_000).with_producers(1).with_wait_strategy(WaitStrategyType::BusySpin));
}

#[test]
fn test_stress_multi_producer_yielding_with_jitter() {
    run(
        StressConfig::new(50_000)
            .with_producers(4)
            .with_ring_size(256)
            .with_wait_strategy(WaitStrategyType::Yielding)
            .with_jitter(7)
    );
}

#[test]
fn test_stress_multi_producer_blocking_batches() {
    run(
        StressConfig::new(50_000)
            .with_producers(3)
            .with_ring_size(512)
            .with_batch_size(16)
            .with_wait_strategy(WaitStrategyType::Blocking)
    );
}

#[test]
fn test_stress_sleeping_small_ring() {
    run(
        StressConfig::new(20_000)
            .with_producers(2)
            .with_ring_size(16)
            .with_wait_strategy(WaitStrategyType::Sleeping)
    );
}

#[test]
fn test_stress_timeout_blocking() {
    run(
        StressConfig::new(20_000)
            .with_producers(2)
            .with_ring_size(64)
            .with_wait_strategy(WaitStrategyType::TimeoutBlocking(Duration::from_millis(1)))
    );
}
