//! End-to-end pipeline scenarios.
//!
//! Each test arms a full chain and asserts on the single outcome the
//! terminal consumer observes: value transforms, failure recovery,
//! flattening, cancellation flow, and the composition operators working
//! together.

mod common;

use common::*;
use deferral::{all, any, any_fail_fast, defer, seq, Continuation, Outcome};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

#[test]
fn value_chain_transforms_in_order() {
    init_test_logging();
    let outcome = collect(TestCont::ready(1).then(|x| x + 2).then(|y| y * 10));
    assert_eq!(outcome, Some(Outcome::Ok(30)));
}

#[test]
fn failure_bypasses_success_stages_and_recovers() {
    let outcome = collect(
        TestCont::exceptional(TestError("boom"))
            .then(|_: i32| 99)
            .fail(|_| 7),
    );
    assert_eq!(outcome, Some(Outcome::Ok(7)));
}

#[test]
fn all_feeds_combined_tuple_into_next_stage() {
    let outcome = collect(all((TestCont::ready("a"), TestCont::ready(3))).then(|(s, n)| (s, n, n)));
    assert_eq!(outcome, Some(Outcome::Ok(("a", 3, 3))));
}

#[test]
fn any_fail_fast_surfaces_first_failure_over_later_success() {
    let outcome = collect(any_fail_fast((
        TestCont::<i32>::exceptional(TestError("e1")),
        TestCont::ready(5),
    )));
    assert_eq!(outcome, Some(Outcome::Err(TestError("e1"))));
}

#[test]
fn seq_stops_at_first_failure_and_skips_later_producers() {
    let third_ran = Arc::new(AtomicBool::new(false));
    let marker = Arc::clone(&third_ran);
    let outcome = collect(seq((
        TestCont::ready(1),
        TestCont::<i32>::exceptional(TestError("boom")),
        defer(move || {
            marker.store(true, Ordering::SeqCst);
            3
        }),
    )));
    assert_eq!(outcome, Some(Outcome::Err(TestError("boom"))));
    assert!(!third_ran.load(Ordering::SeqCst));
}

#[test]
fn grouping_is_preserved_across_mixed_operators() {
    // all(a, any(b, c)) has two result slots, not three.
    let outcome = collect(all((
        TestCont::ready(1),
        any((
            TestCont::<&str>::exceptional(TestError("b fails")),
            TestCont::ready("z"),
        )),
    )));
    assert_eq!(outcome, Some(Outcome::Ok((1, "z"))));
}

#[test]
fn flatten_law_continuation_returning_handler() {
    // A handler returning a ready continuation behaves like a plain
    // value transform, modulo the extra stage.
    let via_value = collect(TestCont::ready(6).then(|v| v * 7));
    let via_continuation = collect(TestCont::ready(6).and_then(|v| Continuation::ready(v * 7)));
    assert_eq!(via_value, via_continuation);
}

#[test]
fn identity_transform_delivers_original_value() {
    let outcome = collect(TestCont::ready(41).then(|x| x));
    assert_eq!(outcome, Some(Outcome::Ok(41)));
}

#[test]
fn receiver_fires_exactly_once_per_arm() {
    let deliveries = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&deliveries);
    TestCont::ready(1)
        .then(|x| x + 1)
        .run(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    assert_eq!(deliveries.load(Ordering::SeqCst), 1);
}

#[test]
fn cancellation_skips_both_success_and_failure_handlers() {
    let handler_ran = Arc::new(AtomicBool::new(false));
    let success_marker = Arc::clone(&handler_ran);
    let failure_marker = Arc::clone(&handler_ran);
    let outcome = collect(
        TestCont::<i32>::cancelled()
            .then(move |v| {
                success_marker.store(true, Ordering::SeqCst);
                v
            })
            .fail(move |_| {
                failure_marker.store(true, Ordering::SeqCst);
                0
            }),
    );
    assert_eq!(outcome, Some(Outcome::Cancelled));
    assert!(!handler_ran.load(Ordering::SeqCst));
}

#[test]
fn finally_runs_on_cancellation() {
    let cleanup_ran = Arc::new(AtomicBool::new(false));
    let marker = Arc::clone(&cleanup_ran);
    let outcome = collect(TestCont::<i32>::cancelled().finally(move || {
        marker.store(true, Ordering::SeqCst);
    }));
    assert_eq!(outcome, Some(Outcome::Cancelled));
    assert!(cleanup_ran.load(Ordering::SeqCst));
}

#[test]
fn recovery_chain_continues_after_handled_failure() {
    let recovered = collect(
        TestCont::<i32>::exceptional(TestError("transient"))
            .fail(|_| 0)
            .then(|v| v + 1),
    );
    assert_eq!(recovered, Some(Outcome::Ok(1)));
}

#[test]
fn recover_uses_fallback_pipeline() {
    let outcome = collect(
        TestCont::<i32>::exceptional(TestError("primary down"))
            .recover(TestCont::ready(10).then(|v| v * 2)),
    );
    assert_eq!(outcome, Some(Outcome::Ok(20)));
}

#[test]
fn next_demultiplexes_success_and_failure() {
    let on_success = collect(TestCont::ready(2).next(|outcome| match outcome {
        Outcome::Ok(v) => Outcome::Ok(v * 100),
        Outcome::Err(e) => Outcome::Err(e),
        Outcome::Cancelled => Outcome::Cancelled,
    }));
    assert_eq!(on_success, Some(Outcome::Ok(200)));

    let on_failure = collect(
        TestCont::<i32>::exceptional(TestError("boom")).next(|outcome| match outcome {
            Outcome::Ok(v) => Outcome::Ok(v),
            Outcome::Err(_) => Outcome::Ok(-1),
            Outcome::Cancelled => Outcome::Cancelled,
        }),
    );
    assert_eq!(on_failure, Some(Outcome::Ok(-1)));
}

#[test]
fn deferred_producer_chains_like_any_other() {
    let outcome = collect(defer::<_, TestError>(|| 4).then(|v| v + 1));
    assert_eq!(outcome, Some(Outcome::Ok(5)));
}

#[test]
fn pending_producer_never_completes_the_chain() {
    let delivered = Arc::new(AtomicBool::new(false));
    let marker = Arc::clone(&delivered);
    let pending: TestCont<i32> = Continuation::new(|receiver| {
        // Dropping the receiver is the legal "never completes" behaviour.
        drop(receiver);
    });
    pending.then(|v| v).run(move |_| {
        marker.store(true, Ordering::SeqCst);
    });
    assert!(!delivered.load(Ordering::SeqCst));
}
