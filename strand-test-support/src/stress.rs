//! Stress testing utilities: many producers, one verifying consumer.

use std::sync::atomic::{ AtomicBool, AtomicU64, Ordering };
use std::sync::Arc;
use std::thread::{ self, JoinHandle };
use std::time::{ Duration, Instant };

use anyhow::{ anyhow, bail, Context };
use crossbeam_channel::{ Receiver, RecvTimeoutError };
use hdrhistogram::Histogram;

use strand::disruptor::{
    AnyWaitStrategy,
    BatchEventProcessor,
    EventHandler,
    EventProcessor,
    MultiProducerSequencer,
    Publisher,
    RingBuffer,
    Sequencer,
    SingleProducerSequencer,
    WaitStrategyType,
};

use crate::chaos::Jitter;
use crate::verify::{ CheckResult, SequenceChecker };

/// Configuration for stress tests
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Events each producer publishes
    pub events_per_producer: u64,
    /// Number of producer threads (1 uses the single-producer sequencer)
    pub producers: usize,
    pub ring_size: usize,
    pub wait_strategy: WaitStrategyType,
    /// Events claimed per `next` call
    pub batch_size: usize,
    /// Seed for producer jitter; `None` disables it
    pub jitter_seed: Option<u64>,
    /// Print progress every interval
    pub report_interval: Duration,
    /// Give up if the consumer has not caught up by then
    pub drain_timeout: Duration,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            events_per_producer: 100_000,
            producers: (num_cpus::get() / 2).clamp(1, 4),
            ring_size: 4096,
            wait_strategy: WaitStrategyType::Yielding,
            batch_size: 1,
            jitter_seed: None,
            report_interval: Duration::from_secs(1),
            drain_timeout: Duration::from_secs(60),
        }
    }
}

impl StressConfig {
    pub fn new(events_per_producer: u64) -> Self {
        Self {
            events_per_producer,
            ..Default::default()
        }
    }

    pub fn with_producers(mut self, n: usize) -> Self {
        self.producers = n;
        self
    }

    pub fn with_ring_size(mut self, size: usize) -> Self {
        self.ring_size = size;
        self
    }

    pub fn with_wait_strategy(mut self, strategy: WaitStrategyType) -> Self {
        self.wait_strategy = strategy;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_jitter(mut self, seed: u64) -> Self {
        self.jitter_seed = Some(seed);
        self
    }

    pub fn total_events(&self) -> u64 {
        self.events_per_producer * (self.producers as u64)
    }
}

/// Slot payload used by the stress runner
#[derive(Debug, Default, Clone, Copy)]
pub struct StressEvent {
    pub producer: u32,
    /// Per-producer counter, starting at 0
    pub value: u64,
    /// Nanoseconds since the run started, taken just before publishing
    pub published_ns: u64,
}

/// Metrics collected during stress testing
#[derive(Debug, Clone, Default)]
pub struct StressMetrics {
    pub events_published: u64,
    pub events_processed: u64,
    /// Ordering violations seen by the consumer
    pub errors: u64,
    pub duration: Duration,
    pub peak_rate: f64,
    pub latency_p50_ns: u64,
    pub latency_p99_ns: u64,
    pub latency_p999_ns: u64,
    pub latency_max_ns: u64,
}

impl StressMetrics {
    pub fn publish_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.events_published as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn process_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.events_processed as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Published but never processed
    pub fn lost(&self) -> u64 {
        self.events_published.saturating_sub(self.events_processed)
    }
}

/// Shared counters for stress testing
#[derive(Debug)]
pub struct StressCounters {
    pub published: AtomicU64,
    pub processed: AtomicU64,
    pub errors: AtomicU64,
    pub running: AtomicBool,
}

impl StressCounters {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_publish(&self, count: u64) {
        self.published.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_process(&self, count: u64) {
        self.processed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StressMetrics {
        StressMetrics {
            events_published: self.published.load(Ordering::Relaxed),
            events_processed: self.processed.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            ..Default::default()
        }
    }
}

impl Default for StressCounters {
    fn default() -> Self {
        Self {
            published: AtomicU64::new(0),
            processed: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            running: AtomicBool::new(true),
        }
    }
}

/// Consumer side of a stress run: per-producer order checks and latency
struct StressHandler {
    checkers: Vec<SequenceChecker>,
    latency: Histogram<u64>,
    start: Instant,
    counters: Arc<StressCounters>,
    pending: u64,
}

impl EventHandler<StressEvent> for StressHandler {
    fn on_event(&mut self, event: &StressEvent, sequence: i64, end_of_batch: bool) -> anyhow::Result<()> {
        let checker = self.checkers
            .get_mut(event.producer as usize)
            .ok_or_else(|| anyhow!("unknown producer {} at sequence {}", event.producer, sequence))?;

        if checker.check(event.value) != CheckResult::InOrder {
            self.counters.record_error();
        }

        let now_ns = self.start.elapsed().as_nanos() as u64;
        self.latency.saturating_record(now_ns.saturating_sub(event.published_ns).max(1));

        self.pending += 1;
        if end_of_batch {
            self.counters.record_process(self.pending);
            self.pending = 0;
        }
        Ok(())
    }
}

/// Runner for stress tests with progress reporting
pub struct StressRunner {
    config: StressConfig,
    counters: Arc<StressCounters>,
}

impl StressRunner {
    pub fn new(config: StressConfig) -> Self {
        Self {
            config,
            counters: StressCounters::new(),
        }
    }

    pub fn counters(&self) -> Arc<StressCounters> {
        self.counters.clone()
    }

    pub fn config(&self) -> &StressConfig {
        &self.config
    }

    /// Publish `total_events()` events and wait until the consumer has seen all of them
    pub fn run(&self) -> anyhow::Result<StressMetrics> {
        let config = &self.config;
        if config.producers == 0 {
            bail!("stress run needs at least one producer");
        }

        let ring = Arc::new(RingBuffer::<StressEvent>::new(config.ring_size)?);
        let strategy = config.wait_strategy.build();
        let start = Instant::now();

        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let reporter = self.spawn_reporter(start, stop_rx)?;

        let outcome = if config.producers == 1 {
            let sequencer = SingleProducerSequencer::new(config.ring_size, strategy)?;
            self.drive(ring, vec![sequencer], start)
        } else {
            let sequencer = MultiProducerSequencer::new(config.ring_size, strategy)?;
            let handles = (0..config.producers).map(|_| sequencer.clone()).collect();
            self.drive(ring, handles, start)
        };

        drop(stop_tx);
        self.counters.stop();
        let peak_rate = reporter.join().unwrap_or(0.0);
        let handler = outcome?;

        let mut metrics = self.counters.snapshot();
        metrics.duration = start.elapsed();
        metrics.peak_rate = peak_rate;
        metrics.latency_p50_ns = handler.latency.value_at_quantile(0.5);
        metrics.latency_p99_ns = handler.latency.value_at_quantile(0.99);
        metrics.latency_p999_ns = handler.latency.value_at_quantile(0.999);
        metrics.latency_max_ns = handler.latency.max();

        for (producer, checker) in handler.checkers.iter().enumerate() {
            if checker.expected_next() != config.events_per_producer {
                bail!(
                    "producer {} stopped at {} of {} events",
                    producer,
                    checker.expected_next(),
                    config.events_per_producer
                );
            }
        }
        Ok(metrics)
    }

    fn drive<S>(&self, ring: Arc<RingBuffer<StressEvent>>, sequencers: Vec<S>, start: Instant) -> anyhow::Result<StressHandler>
        where S: Sequencer<Wait = AnyWaitStrategy> + 'static
    {
        let config = self.config.clone();
        let first = sequencers.first().context("no sequencer handles")?;

        let handler = StressHandler {
            checkers: vec![SequenceChecker::new(); config.producers],
            latency: Histogram::new_with_bounds(1, 60_000_000_000, 3)?,
            start,
            counters: self.counters.clone(),
            pending: 0,
        };
        let mut processor = BatchEventProcessor::new(ring.clone(), first.new_barrier(&[]), handler);
        first.add_gating_sequences(&[processor.sequence()]);
        let handle = processor.handle();

        let consumer = thread::Builder::new()
            .name("stress-consumer".into())
            .spawn(move || -> anyhow::Result<StressHandler> {
                processor.run()?;
                Ok(processor.into_handler())
            })?;

        let batch = config.batch_size.clamp(1, config.ring_size);
        let producers = sequencers
            .into_iter()
            .enumerate()
            .map(|(id, sequencer)| {
                let ring = ring.clone();
                let counters = self.counters.clone();
                let events = config.events_per_producer;
                let seed = config.jitter_seed;

                thread::Builder::new()
                    .name(format!("stress-producer-{}", id))
                    .spawn(move || -> anyhow::Result<()> {
                        let mut publisher = Publisher::new(ring, sequencer)?;
                        let mut jitter = seed.map(|s| Jitter::new(s.wrapping_add(id as u64)));

                        let mut value = 0u64;
                        while value < events {
                            let n = (batch as u64).min(events - value) as usize;
                            publisher.publish_events(n, |slot, _, i| {
                                *slot = StressEvent {
                                    producer: id as u32,
                                    value: value + (i as u64),
                                    published_ns: start.elapsed().as_nanos() as u64,
                                };
                            });
                            value += n as u64;
                            counters.record_publish(n as u64);

                            if let Some(jitter) = jitter.as_mut() {
                                jitter.pause();
                            }
                        }
                        Ok(())
                    })
            })
            .collect::<std::io::Result<Vec<JoinHandle<anyhow::Result<()>>>>>()?;

        for producer in producers {
            let result = producer
                .join()
                .map_err(|_| anyhow!("producer thread panicked"))
                .and_then(|result| result);
            if let Err(err) = result {
                handle.halt();
                return Err(err);
            }
        }

        let last = (config.total_events() as i64) - 1;
        let progress = handle.sequence();
        let deadline = Instant::now() + config.drain_timeout;
        while progress.get() < last {
            if Instant::now() >= deadline {
                handle.halt();
                bail!("consumer stuck at {} of {}", progress.get(), last);
            }
            thread::sleep(Duration::from_millis(1));
        }

        handle.halt();
        consumer.join().map_err(|_| anyhow!("consumer thread panicked"))?
    }

    fn spawn_reporter(&self, start: Instant, stop: Receiver<()>) -> anyhow::Result<JoinHandle<f64>> {
        let counters = self.counters.clone();
        let interval = self.config.report_interval;

        let reporter = thread::Builder::new()
            .name("stress-reporter".into())
            .spawn(move || {
                let mut last_published = 0u64;
                let mut peak_rate = 0.0f64;

                loop {
                    match stop.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) if counters.is_running() => {}
                        _ => break,
                    }

                    let published = counters.published.load(Ordering::Relaxed);
                    let processed = counters.processed.load(Ordering::Relaxed);
                    let errors = counters.errors.load(Ordering::Relaxed);

                    let rate = (published - last_published) as f64 / interval.as_secs_f64();
                    peak_rate = peak_rate.max(rate);
                    last_published = published;

                    eprintln!(
                        "[{:>5.1}s] published: {:>10}, processed: {:>10}, rate: {:>10.0}/s, errors: {}",
                        start.elapsed().as_secs_f64(),
                        published,
                        processed,
                        rate,
                        errors
                    );
                }

                peak_rate
            })?;
        Ok(reporter)
    }
}

/// Print a summary of stress test results
pub fn print_summary(metrics: &StressMetrics) {
    eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
    eprintln!("║                    STRESS TEST RESULTS                       ║");
    eprintln!("╠══════════════════════════════════════════════════════════════╣");
    eprintln!("║  Duration:        {:>10.2}s                                ║", metrics.duration.as_secs_f64());
    eprintln!("║  Published:       {:>10}                                  ║", metrics.events_published);
    eprintln!("║  Processed:       {:>10}                                  ║", metrics.events_processed);
    eprintln!("║  Publish Rate:    {:>10.0} evt/s                          ║", metrics.publish_rate());
    eprintln!("║  Peak Rate:       {:>10.0} evt/s                          ║", metrics.peak_rate);
    eprintln!("║  Latency p50:     {:>10} ns                             ║", metrics.latency_p50_ns);
    eprintln!("║  Latency p99:     {:>10} ns                             ║", metrics.latency_p99_ns);
    eprintln!("║  Latency p99.9:   {:>10} ns                             ║", metrics.latency_p999_ns);
    eprintln!("║  Latency max:     {:>10} ns                             ║", metrics.latency_max_ns);
    eprintln!("║  Errors:          {:>10}                                  ║", metrics.errors);
    eprintln!("╚══════════════════════════════════════════════════════════════╝");

    if metrics.errors > 0 {
        eprintln!("\nFAILED: {} ordering violations", metrics.errors);
    } else if metrics.lost() > 0 {
        eprintln!("\nFAILED: {} events never processed", metrics.lost());
    } else {
        eprintln!("\nPASSED: all {} events processed in order", metrics.events_processed);
    }
}
