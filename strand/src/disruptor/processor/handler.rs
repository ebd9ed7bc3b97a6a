//! Consumer-side callbacks: event handlers and exception handlers.

/// Application logic run by a `BatchEventProcessor` for every entry.
///
/// `end_of_batch` is true for the last entry of the range the barrier made
/// available, which is the natural point to flush buffered work.
pub trait EventHandler<T>: Send {
    fn on_event(&mut self, event: &T, sequence: i64, end_of_batch: bool) -> anyhow::Result<()>;

    /// Called once on the processor thread before the first wait
    fn on_start(&mut self) {}

    /// Called once on the processor thread after the loop exits
    fn on_shutdown(&mut self) {}

    /// Called when a timeout-capable wait strategy gives up; `sequence` is
    /// the last processed sequence.
    fn on_timeout(&mut self, _sequence: i64) {}
}

impl<T, F> EventHandler<T> for F where F: FnMut(&T, i64, bool) -> anyhow::Result<()> + Send {
    #[inline]
    fn on_event(&mut self, event: &T, sequence: i64, end_of_batch: bool) -> anyhow::Result<()> {
        self(event, sequence, end_of_batch)
    }
}

/// What the processor does after a handler error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Skip the failed entry and keep processing
    Continue,
    /// Stop the processor after the failed entry
    Halt,
}

/// Decides the fate of a processor when its `EventHandler` fails.
///
/// Either way the processor's sequence moves past the failed entry, so
/// downstream consumers and producers are never stuck behind it.
pub trait ExceptionHandler<T>: Send {
    fn handle_event_error(&mut self, error: &anyhow::Error, sequence: i64, event: &T) -> ErrorAction;
}

/// Logs the error and continues (the default)
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreExceptionHandler;

impl<T> ExceptionHandler<T> for IgnoreExceptionHandler {
    fn handle_event_error(&mut self, error: &anyhow::Error, sequence: i64, _event: &T) -> ErrorAction {
        tracing::warn!(sequence, error = %error, "event handler failed, skipping entry");
        ErrorAction::Continue
    }
}

/// Logs the error and halts the processor
#[derive(Debug, Default, Clone, Copy)]
pub struct FatalExceptionHandler;

impl<T> ExceptionHandler<T> for FatalExceptionHandler {
    fn handle_event_error(&mut self, error: &anyhow::Error, sequence: i64, _event: &T) -> ErrorAction {
        tracing::error!(sequence, error = %error, "event handler failed, halting processor");
        ErrorAction::Halt
    }
}
