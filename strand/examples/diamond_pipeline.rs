//! Diamond Pipeline - Average and Parity of 1..=1,000,000
//!
//! One producer publishes numbers. Two independent consumers run in parallel
//! (A sums, B counts even numbers); a third consumer C depends on both and
//! reports running results once A and B have seen each entry.
//!
//! ```text
//!             ┌─> A (sum) ───┐
//! producer ──>│              ├─> C (report)
//!             └─> B (evens) ─┘
//! ```
//!
//! Run: cargo run --release --example diamond_pipeline --features metrics

use std::sync::atomic::{ AtomicU64, Ordering };
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use strand::disruptor::{
    BatchEventProcessor,
    EventHandler,
    EventProcessor,
    ProducerType,
    Publisher,
    RingBuffer,
    RingBufferConfig,
    Sequencer,
    SharedSequence,
    SingleProducerSequencer,
    WaitStrategyType,
};

const RING_SIZE: usize = 64 * 1024;
const BATCH_SIZE: usize = 1024;
const MAX_NUMBER: u64 = 1_000_000;

#[derive(Debug, Default, Clone, Copy)]
struct Number {
    value: u64,
}

/// Publishes its running total once per batch
struct Summer {
    sum: u64,
    shared: Arc<AtomicU64>,
}

impl EventHandler<Number> for Summer {
    fn on_event(&mut self, event: &Number, _sequence: i64, end_of_batch: bool) -> anyhow::Result<()> {
        self.sum += event.value;
        if end_of_batch {
            self.shared.store(self.sum, Ordering::Release);
        }
        Ok(())
    }
}

struct EvenCounter {
    evens: u64,
    shared: Arc<AtomicU64>,
}

impl EventHandler<Number> for EvenCounter {
    fn on_event(&mut self, event: &Number, _sequence: i64, end_of_batch: bool) -> anyhow::Result<()> {
        if event.value % 2 == 0 {
            self.evens += 1;
        }
        if end_of_batch {
            self.shared.store(self.evens, Ordering::Release);
        }
        Ok(())
    }
}

/// Runs behind A and B, so their totals already cover everything it sees
struct Reporter {
    upstream: [SharedSequence; 2],
    sum: Arc<AtomicU64>,
    evens: Arc<AtomicU64>,
    reports: u64,
}

impl EventHandler<Number> for Reporter {
    fn on_event(&mut self, event: &Number, sequence: i64, _end: bool) -> anyhow::Result<()> {
        if self.upstream.iter().any(|s| s.get() < sequence) {
            anyhow::bail!("reporter ran ahead of its dependencies at {}", sequence);
        }
        if event.value % 250_000 == 0 {
            self.reports += 1;
            tracing::info!(
                value = event.value,
                sum = self.sum.load(Ordering::Acquire),
                evens = self.evens.load(Ordering::Acquire),
                "checkpoint"
            );
        }
        Ok(())
    }

    fn on_shutdown(&mut self) {
        tracing::info!(reports = self.reports, "reporter done");
    }
}

fn main() -> anyhow::Result<()> {
    strand::init_tracing();

    let config = RingBufferConfig::new(RING_SIZE)?
        .with_producer_type(ProducerType::Single)
        .with_wait_strategy(WaitStrategyType::Yielding);

    let ring = Arc::new(RingBuffer::<Number>::from_config(&config)?);
    let sequencer = SingleProducerSequencer::new(config.size, config.wait_strategy.build())?;

    let sum = Arc::new(AtomicU64::new(0));
    let evens = Arc::new(AtomicU64::new(0));

    let a = BatchEventProcessor::new(
        ring.clone(),
        sequencer.new_barrier(&[]),
        Summer { sum: 0, shared: sum.clone() }
    );
    let b = BatchEventProcessor::new(
        ring.clone(),
        sequencer.new_barrier(&[]),
        EvenCounter { evens: 0, shared: evens.clone() }
    );
    let c = BatchEventProcessor::new(
        ring.clone(),
        sequencer.new_barrier(&[a.sequence(), b.sequence()]),
        Reporter {
            upstream: [a.sequence(), b.sequence()],
            sum: sum.clone(),
            evens: evens.clone(),
            reports: 0,
        }
    );
    sequencer.add_gating_sequences(&[c.sequence()]);

    let handles = [a.handle(), b.handle(), c.handle()];
    let done = c.sequence();
    let workers: Vec<_> = [
        Box::new(a) as Box<dyn EventProcessor>,
        Box::new(b),
        Box::new(c),
    ]
        .into_iter()
        .map(|mut processor| thread::spawn(move || processor.run()))
        .collect();

    let start = Instant::now();
    let mut publisher = Publisher::new(ring, sequencer)?;
    let mut number = 1u64;
    while number <= MAX_NUMBER {
        let n = BATCH_SIZE.min((MAX_NUMBER - number + 1) as usize);
        publisher.publish_events(n, |slot, _, i| {
            slot.value = number + (i as u64);
        });
        number += n as u64;
    }

    while done.get() < (MAX_NUMBER as i64) - 1 {
        thread::yield_now();
    }
    let elapsed = start.elapsed();

    for handle in &handles {
        handle.halt();
    }
    for worker in workers {
        worker.join().map_err(|_| anyhow::anyhow!("processor thread panicked"))??;
    }

    let total = sum.load(Ordering::Acquire);
    println!("\nNumbers:   1..={}", MAX_NUMBER);
    println!("Sum:       {}", total);
    println!("Average:   {:.1}", (total as f64) / (MAX_NUMBER as f64));
    println!("Evens:     {}", evens.load(Ordering::Acquire));
    println!("Elapsed:   {:?} ({:.1} M events/s)", elapsed, (MAX_NUMBER as f64) / elapsed.as_secs_f64() / 1e6);
    println!("Metrics:   {}", strand::METRICS.snapshot());
    Ok(())
}
