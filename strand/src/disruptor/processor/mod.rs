//! Event processors: the consumer run loop and its remote control.
//!
//! A processor moves through `Idle → Running → ShuttingDown → Halted`.
//! `Halted` is terminal; a processor halted before it ever ran goes straight
//! from `Idle` to `Halted`.

pub mod batch;
pub mod handler;

pub use batch::BatchEventProcessor;
pub use handler::{
    EventHandler,
    ErrorAction,
    ExceptionHandler,
    FatalExceptionHandler,
    IgnoreExceptionHandler,
};

use std::fmt;
use std::sync::atomic::{ AtomicU8, Ordering };
use std::sync::Arc;

use crate::disruptor::barrier::SequenceBarrier;
use crate::disruptor::sequence::SharedSequence;
use crate::disruptor::wait_strategy::WaitStrategy;
use crate::error::Result;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    Idle = 0,
    Running = 1,
    ShuttingDown = 2,
    Halted = 3,
}

impl ProcessorState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::ShuttingDown,
            _ => Self::Halted,
        }
    }
}

/// A consumer run loop that can be driven on its own thread
pub trait EventProcessor: Send {
    /// Run until halted or alerted; blocks the calling thread.
    fn run(&mut self) -> Result<()>;

    /// This processor's progress, for gating producers or downstream barriers
    fn sequence(&self) -> SharedSequence;

    fn halt(&self);

    fn is_running(&self) -> bool;
}

/// State shared between a processor and its handles
pub(crate) struct Control<W: WaitStrategy> {
    state: AtomicU8,
    sequence: SharedSequence,
    barrier: Arc<SequenceBarrier<W>>,
}

impl<W: WaitStrategy> Control<W> {
    pub(crate) fn new(sequence: SharedSequence, barrier: Arc<SequenceBarrier<W>>) -> Self {
        Self {
            state: AtomicU8::new(ProcessorState::Idle as u8),
            sequence,
            barrier,
        }
    }

    #[inline]
    pub(crate) fn state(&self) -> ProcessorState {
        ProcessorState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: ProcessorState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub(crate) fn transition(&self, from: ProcessorState, to: ProcessorState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn sequence(&self) -> &SharedSequence {
        &self.sequence
    }

    pub(crate) fn barrier(&self) -> &Arc<SequenceBarrier<W>> {
        &self.barrier
    }

    pub(crate) fn halt(&self) {
        loop {
            match self.state() {
                ProcessorState::Idle => {
                    if self.transition(ProcessorState::Idle, ProcessorState::Halted) {
                        tracing::debug!("processor halted before start");
                        return;
                    }
                }
                ProcessorState::Running => {
                    if self.transition(ProcessorState::Running, ProcessorState::ShuttingDown) {
                        self.barrier.alert();
                        return;
                    }
                }
                ProcessorState::ShuttingDown | ProcessorState::Halted => {
                    return;
                }
            }
        }
    }
}

/// Cloneable handle for halting and observing a processor from another thread
pub struct ProcessorHandle<W: WaitStrategy> {
    control: Arc<Control<W>>,
}

impl<W: WaitStrategy> ProcessorHandle<W> {
    pub(crate) fn new(control: Arc<Control<W>>) -> Self {
        Self { control }
    }

    /// Ask the processor to stop; it finishes the current batch, then exits.
    pub fn halt(&self) {
        self.control.halt();
    }

    pub fn state(&self) -> ProcessorState {
        self.control.state()
    }

    pub fn sequence(&self) -> SharedSequence {
        self.control.sequence().clone()
    }

    pub fn is_running(&self) -> bool {
        self.control.state() == ProcessorState::Running
    }
}

impl<W: WaitStrategy> Clone for ProcessorHandle<W> {
    fn clone(&self) -> Self {
        Self { control: self.control.clone() }
    }
}

impl<W: WaitStrategy> fmt::Debug for ProcessorHandle<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorHandle")
            .field("state", &self.state())
            .field("sequence", &self.control.sequence().get())
            .finish()
    }
}
