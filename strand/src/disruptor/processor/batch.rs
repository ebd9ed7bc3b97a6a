//! Batch event processor: one consumer's run loop.

use std::fmt;
use std::sync::Arc;

use crate::constants::INITIAL_CURSOR_VALUE;
use crate::disruptor::barrier::SequenceBarrier;
use crate::disruptor::processor::handler::{
    ErrorAction,
    EventHandler,
    ExceptionHandler,
    IgnoreExceptionHandler,
};
use crate::disruptor::processor::{ Control, EventProcessor, ProcessorHandle, ProcessorState };
use crate::disruptor::ring_buffer::RingBuffer;
use crate::disruptor::sequence::{ PaddedSequence, SharedSequence };
use crate::disruptor::wait_strategy::WaitStrategy;
use crate::error::{ Result, StrandError };
use crate::insights;
use crate::metrics::METRICS;

/// Waits on a barrier, hands every available entry to an `EventHandler` in
/// sequence order, then publishes its own sequence once per batch.
///
/// Register `sequence()` with the sequencer (as a gating sequence) or with
/// downstream barriers (as a dependent) before calling `run`.
pub struct BatchEventProcessor<T, H, W>
    where H: EventHandler<T>, W: WaitStrategy
{
    ring: Arc<RingBuffer<T>>,
    handler: H,
    exception_handler: Box<dyn ExceptionHandler<T>>,
    control: Arc<Control<W>>,
}

impl<T, H, W> BatchEventProcessor<T, H, W>
    where T: Send + Sync, H: EventHandler<T>, W: WaitStrategy
{
    pub fn new(ring: Arc<RingBuffer<T>>, barrier: Arc<SequenceBarrier<W>>, handler: H) -> Self {
        let sequence = PaddedSequence::shared(INITIAL_CURSOR_VALUE);
        Self {
            ring,
            handler,
            exception_handler: Box::new(IgnoreExceptionHandler),
            control: Arc::new(Control::new(sequence, barrier)),
        }
    }

    pub fn with_exception_handler<E>(mut self, exception_handler: E) -> Self
        where E: ExceptionHandler<T> + 'static
    {
        self.exception_handler = Box::new(exception_handler);
        self
    }

    pub fn handle(&self) -> ProcessorHandle<W> {
        ProcessorHandle::new(self.control.clone())
    }

    pub fn state(&self) -> ProcessorState {
        self.control.state()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Consume the processor and hand back its handler (after `run` returns)
    pub fn into_handler(self) -> H {
        self.handler
    }

    fn process_events(&mut self) {
        let sequence = self.control.sequence().clone();
        let barrier = self.control.barrier().clone();
        let mut next_sequence = sequence.get() + 1;

        loop {
            if self.control.state() != ProcessorState::Running {
                break;
            }

            match barrier.wait_for(next_sequence) {
                Ok(available) => {
                    let (last, halt) = self.process_batch(next_sequence, available);
                    sequence.set(last);
                    next_sequence = last + 1;

                    if halt {
                        self.control.transition(ProcessorState::Running, ProcessorState::ShuttingDown);
                        break;
                    }
                }
                Err(StrandError::Timeout) => {
                    self.handler.on_timeout(sequence.get());
                }
                Err(StrandError::Alerted) => {
                    break;
                }
                Err(err) => {
                    tracing::error!(error = %err, "unexpected wait failure, halting processor");
                    break;
                }
            }
        }
    }

    /// Returns the last sequence handled and whether the exception handler asked to halt
    fn process_batch(&mut self, low: i64, high: i64) -> (i64, bool) {
        let mut current = low;
        while current <= high {
            // Safety: `current <= high` is available through the barrier and our
            // sequence (still below `current`) keeps producers off this slot.
            let event = unsafe { self.ring.get(current) };

            if let Err(err) = self.handler.on_event(event, current, current == high) {
                METRICS.record_handler_error();
                let action = self.exception_handler.handle_event_error(&err, current, event);
                if action == ErrorAction::Halt {
                    insights::record_processed((current - low + 1) as u64);
                    return (current, true);
                }
            }
            current += 1;
        }

        insights::record_processed((high - low + 1) as u64);
        (high, false)
    }
}

impl<T, H, W> EventProcessor
    for BatchEventProcessor<T, H, W>
    where T: Send + Sync, H: EventHandler<T>, W: WaitStrategy
{
    fn run(&mut self) -> Result<()> {
        // Cleared before leaving Idle: halt() only alerts a Running processor,
        // so its alert can never be wiped out here.
        self.control.barrier().clear_alert();

        if !self.control.transition(ProcessorState::Idle, ProcessorState::Running) {
            let state = self.control.state();
            return Err(StrandError::invalid_state(format!("processor cannot run from {:?}", state)));
        }

        let started_at = self.control.sequence().get();
        tracing::info!(sequence = started_at, "event processor started");
        self.handler.on_start();

        self.process_events();

        self.handler.on_shutdown();
        self.control.set_state(ProcessorState::Halted);
        tracing::info!(sequence = self.control.sequence().get(), "event processor halted");
        Ok(())
    }

    fn sequence(&self) -> SharedSequence {
        self.control.sequence().clone()
    }

    fn halt(&self) {
        self.control.halt();
    }

    fn is_running(&self) -> bool {
        self.control.state() == ProcessorState::Running
    }
}

impl<T, H, W> fmt::Debug
    for BatchEventProcessor<T, H, W>
    where H: EventHandler<T>, W: WaitStrategy
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchEventProcessor")
            .field("state", &self.control.state())
            .field("sequence", &self.control.sequence().get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disruptor::processor::handler::FatalExceptionHandler;
    use crate::disruptor::sequencer::{ Sequencer, SingleProducerSequencer };
    use crate::disruptor::wait_strategy::{ BlockingWaitStrategy, YieldingWaitStrategy };
    use crate::disruptor::Publisher;
    use anyhow::bail;
    use std::thread;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        events: Vec<(u64, i64, bool)>,
        started: bool,
        shut_down: bool,
    }

    impl EventHandler<u64> for Recorder {
        fn on_event(&mut self, event: &u64, sequence: i64, end_of_batch: bool) -> anyhow::Result<()> {
            self.events.push((*event, sequence, end_of_batch));
            Ok(())
        }

        fn on_start(&mut self) {
            self.started = true;
        }

        fn on_shutdown(&mut self) {
            self.shut_down = true;
        }
    }

    struct FailOn(i64, Vec<i64>);

    impl EventHandler<u64> for FailOn {
        fn on_event(&mut self, _event: &u64, sequence: i64, _end: bool) -> anyhow::Result<()> {
            self.1.push(sequence);
            if sequence == self.0 {
                bail!("cannot handle {}", sequence);
            }
            Ok(())
        }
    }

    fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..2_000 {
            if condition() {
                return;
            }
            thread::sleep(Duration::from_millis(1));
        }
        panic!("condition not reached");
    }

    #[test]
    fn test_processes_published_batch_in_order() {
        let ring = Arc::new(RingBuffer::<u64>::new(8).unwrap());
        let sequencer = SingleProducerSequencer::new(8, YieldingWaitStrategy::new()).unwrap();
        let barrier = sequencer.new_barrier(&[]);
        let mut processor = BatchEventProcessor::new(ring.clone(), barrier, Recorder::default());
        sequencer.add_gating_sequences(&[processor.sequence()]);
        let handle = processor.handle();

        let mut publisher = Publisher::new(ring, sequencer).unwrap();
        publisher.publish_events(3, |slot, seq, _| *slot = (seq as u64) + 1);

        let worker = thread::spawn(move || {
            processor.run().unwrap();
            processor
        });

        let sequence = handle.sequence();
        wait_until(|| sequence.get() == 2);
        handle.halt();
        let processor = worker.join().unwrap();

        assert_eq!(processor.state(), ProcessorState::Halted);
        let recorder = processor.into_handler();
        assert!(recorder.started && recorder.shut_down);
        assert_eq!(recorder.events, vec![(1, 0, false), (2, 1, false), (3, 2, true)]);
    }

    #[test]
    fn test_ignore_handler_skips_failed_entry() {
        let ring = Arc::new(RingBuffer::<u64>::new(8).unwrap());
        let sequencer = SingleProducerSequencer::new(8, YieldingWaitStrategy::new()).unwrap();
        let barrier = sequencer.new_barrier(&[]);
        let mut processor = BatchEventProcessor::new(ring.clone(), barrier, FailOn(1, Vec::new()));
        let handle = processor.handle();

        sequencer.publish_range(0, 2);
        let worker = thread::spawn(move || {
            processor.run().unwrap();
            processor
        });

        let sequence = handle.sequence();
        wait_until(|| sequence.get() == 2);
        handle.halt();
        let processor = worker.join().unwrap();
        assert_eq!(processor.handler().1, vec![0, 1, 2]);
    }

    #[test]
    fn test_fatal_handler_halts_past_failed_entry() {
        let ring = Arc::new(RingBuffer::<u64>::new(8).unwrap());
        let sequencer = SingleProducerSequencer::new(8, YieldingWaitStrategy::new()).unwrap();
        let barrier = sequencer.new_barrier(&[]);
        let mut processor = BatchEventProcessor::new(
            ring.clone(),
            barrier,
            FailOn(1, Vec::new())
        ).with_exception_handler(FatalExceptionHandler);

        sequencer.publish_range(0, 3);
        processor.run().unwrap();

        assert_eq!(processor.state(), ProcessorState::Halted);
        assert_eq!(processor.sequence().get(), 1);
        assert_eq!(processor.handler().1, vec![0, 1]);
    }

    #[test]
    fn test_alert_releases_blocked_processor() {
        let ring = Arc::new(RingBuffer::<u64>::new(8).unwrap());
        let sequencer = SingleProducerSequencer::new(8, BlockingWaitStrategy::new()).unwrap();
        let barrier = sequencer.new_barrier(&[]);
        let mut processor = BatchEventProcessor::new(ring, barrier.clone(), Recorder::default());
        let handle = processor.handle();

        let worker = thread::spawn(move || {
            processor.run().unwrap();
            processor
        });
        wait_until(|| handle.is_running());
        thread::sleep(Duration::from_millis(20));

        barrier.alert();
        let processor = worker.join().unwrap();
        assert_eq!(handle.state(), ProcessorState::Halted);
        assert!(processor.handler().events.is_empty());
        assert_eq!(processor.sequence().get(), INITIAL_CURSOR_VALUE);
    }

    #[test]
    fn test_halted_processor_cannot_run() {
        let ring = Arc::new(RingBuffer::<u64>::new(8).unwrap());
        let sequencer = SingleProducerSequencer::new(8, YieldingWaitStrategy::new()).unwrap();
        let mut processor = BatchEventProcessor::new(ring, sequencer.new_barrier(&[]), Recorder::default());

        processor.halt();
        assert_eq!(processor.state(), ProcessorState::Halted);
        assert!(matches!(processor.run(), Err(StrandError::InvalidState { .. })));
        assert!(!processor.handler().started);
    }
}
