#![allow(dead_code)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```
//! mod common;
//! use common::*;
//! ```

use deferral::{Continuation, Outcome};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}

/// The failure type threaded through the test pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestError(pub &'static str);

/// A continuation over the shared test failure type.
pub type TestCont<T> = Continuation<T, TestError>;

/// Arms `continuation` and returns the outcome it delivered, for pipelines
/// whose producers all complete inline on the arming thread.
pub fn collect<T, E>(continuation: Continuation<T, E>) -> Option<Outcome<T, E>>
where
    T: Send + 'static,
    E: Send + 'static,
{
    let slot = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&slot);
    continuation.run(move |outcome| *sink.lock().unwrap() = Some(outcome));
    let outcome = slot.lock().unwrap().take();
    outcome
}

/// Arms `continuation` and blocks until its outcome arrives, for pipelines
/// whose producers complete from other threads.
pub fn await_outcome<T, E>(continuation: Continuation<T, E>) -> Outcome<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    continuation.run(move |outcome| {
        tx.send(outcome).expect("terminal consumer gone");
    });
    rx.recv_timeout(Duration::from_secs(5))
        .expect("pipeline did not complete in time")
}
