//! The one-shot sink at the end of a continuation.
//!
//! A [`Receiver`] accepts the [`Outcome`] of a continuation exactly once.
//! Delivery consumes the receiver by value, so re-use after completion is
//! rejected at compile time rather than at run time.

use crate::types::Outcome;

/// A single-shot sink that accepts a continuation's outcome.
///
/// Producers receive one of these when the continuation they back is armed,
/// and must invoke it at most once — on the arming thread, on some other
/// thread, or never (leaving the pipeline pending). All delivery methods
/// take `self` by value; the borrow checker enforces the single shot.
pub struct Receiver<T, E> {
    deliver: Box<dyn FnOnce(Outcome<T, E>) + Send>,
}

impl<T, E> Receiver<T, E> {
    /// Wraps a single-use callable as a receiver.
    pub fn new(deliver: impl FnOnce(Outcome<T, E>) + Send + 'static) -> Self {
        Self {
            deliver: Box::new(deliver),
        }
    }

    /// Delivers an outcome, consuming the receiver.
    pub fn complete(self, outcome: Outcome<T, E>) {
        (self.deliver)(outcome);
    }

    /// Delivers a success value.
    pub fn succeed(self, value: T) {
        self.complete(Outcome::Ok(value));
    }

    /// Delivers a failure.
    pub fn fail(self, error: E) {
        self.complete(Outcome::Err(error));
    }

    /// Delivers a cancellation: downstream stages do not run.
    pub fn cancel(self) {
        self.complete(Outcome::Cancelled);
    }
}

impl<T, E> core::fmt::Debug for Receiver<T, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Receiver").finish_non_exhaustive()
    }
}
