//! Criterion benchmarks for sequencers and full pipelines
//!
//! Run: cargo bench --bench bench_sequencer

use criterion::{ criterion_group, criterion_main, BenchmarkId, Criterion, Throughput };
use std::hint::black_box;
use std::sync::Arc;
use std::thread;

use strand::disruptor::{
    BatchEventProcessor,
    BusySpinWaitStrategy,
    EventProcessor,
    MultiProducerSequencer,
    Publisher,
    RingBuffer,
    Sequencer,
    SingleProducerSequencer,
    WaitStrategy,
    WaitStrategyType,
};

const RING_SIZE: usize = 64 * 1024;
const BATCH_SIZE: usize = 256;
const CLAIMS: u64 = 1_000_000;
const TOTAL_EVENTS: u64 = 2_000_000;

/// Claim + publish with nothing gating the producer
fn claim_publish<S: Sequencer>(mut sequencer: S, claims: u64) -> i64 {
    let mut last = -1;
    for _ in 0..claims {
        last = sequencer.next(1);
        sequencer.publish(last);
    }
    last
}

/// One producer, one consumer; returns the number of events pushed through
fn pipeline<W: WaitStrategy + 'static>(strategy: W, events: u64, batch: usize) -> u64 {
    let ring = Arc::new(RingBuffer::<u64>::new(RING_SIZE).unwrap());
    let sequencer = SingleProducerSequencer::new(RING_SIZE, strategy).unwrap();

    let handler = {
        let mut sum = 0u64;
        move |value: &u64, _seq: i64, end_of_batch: bool| {
            sum = sum.wrapping_add(*value);
            if end_of_batch {
                black_box(sum);
            }
            anyhow::Ok(())
        }
    };
    let mut processor = BatchEventProcessor::new(ring.clone(), sequencer.new_barrier(&[]), handler);
    sequencer.add_gating_sequences(&[processor.sequence()]);
    let handle = processor.handle();
    let consumer = thread::spawn(move || processor.run());

    let mut publisher = Publisher::new(ring, sequencer).unwrap();
    let mut sent = 0u64;
    while sent < events {
        let n = (batch as u64).min(events - sent) as usize;
        publisher.publish_events(n, |slot, _, i| {
            *slot = sent + (i as u64);
        });
        sent += n as u64;
    }

    let progress = handle.sequence();
    while progress.get() < (events as i64) - 1 {
        std::hint::spin_loop();
    }
    handle.halt();
    consumer.join().unwrap().unwrap();
    events
}

fn benchmark_claim_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("Claim + Publish (uncontended)");
    group.throughput(Throughput::Elements(CLAIMS));

    group.bench_function("single-producer", |b| {
        b.iter(|| {
            let sequencer = SingleProducerSequencer::new(RING_SIZE, BusySpinWaitStrategy).unwrap();
            claim_publish(sequencer, CLAIMS)
        })
    });

    group.bench_function("multi-producer", |b| {
        b.iter(|| {
            let sequencer = MultiProducerSequencer::new(RING_SIZE, BusySpinWaitStrategy).unwrap();
            claim_publish(sequencer, CLAIMS)
        })
    });

    group.finish();
}

fn benchmark_wait_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("Pipeline by Wait Strategy");
    group.throughput(Throughput::Elements(TOTAL_EVENTS));
    group.sample_size(10);

    for strategy in [WaitStrategyType::BusySpin, WaitStrategyType::Yielding, WaitStrategyType::Blocking] {
        group.bench_function(BenchmarkId::new("strand", format!("{:?}", strategy)), |b| {
            b.iter(|| pipeline(strategy.build(), TOTAL_EVENTS, BATCH_SIZE))
        });
    }

    group.finish();
}

fn benchmark_batch_vs_per_event(c: &mut Criterion) {
    let mut group = c.benchmark_group("Batch vs Per-Event");
    group.throughput(Throughput::Elements(TOTAL_EVENTS));
    group.sample_size(10);

    group.bench_function("batch (256/claim)", |b| {
        b.iter(|| pipeline(BusySpinWaitStrategy, TOTAL_EVENTS, BATCH_SIZE))
    });

    group.bench_function("per-event (1/claim)", |b| {
        b.iter(|| pipeline(BusySpinWaitStrategy, TOTAL_EVENTS, 1))
    });

    group.finish();
}

criterion_group!(benches, benchmark_claim_publish, benchmark_wait_strategies, benchmark_batch_vs_per_event);
criterion_main!(benches);
