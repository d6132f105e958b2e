//! Algebraic law property tests for the continuation operators.
//!
//! # Laws Tested
//!
//! ## Outcome Lattice Laws
//! - `map` preserves severity
//! - `into_result` / `From<Result>` round-trip
//!
//! ## Sequencing Laws
//! - Identity: `ready(v).then(|x| x)` delivers `Ok(v)`
//! - Composition: `then(f).then(g)` equals `then(g ∘ f)`
//! - Flatten: `and_then(|v| ready(f(v)))` equals `then(f)`
//!
//! ## Combinator Laws
//! - `all` preserves arity and input order
//! - `seq` agrees with `all` for immediately-ready children
//! - `any` delivers the successful child's value

mod common;

use common::*;
// `deferral::any` is imported under another name so that proptest's
// `any::<T>()` keeps its usual spelling below.
use deferral::any as any_of;
use deferral::{all, seq, Continuation, Outcome};
use proptest::prelude::*;

fn arb_outcome() -> impl Strategy<Value = Outcome<i64, i64>> {
    prop_oneof![
        any::<i64>().prop_map(Outcome::Ok),
        any::<i64>().prop_map(Outcome::Err),
        Just(Outcome::Cancelled),
    ]
}

proptest! {
    #[test]
    fn map_preserves_severity(outcome in arb_outcome(), k in any::<i64>()) {
        let severity = outcome.severity();
        prop_assert_eq!(outcome.map(|v| v.wrapping_mul(k)).severity(), severity);
    }

    #[test]
    fn result_round_trip(value in any::<i64>(), error in any::<i64>()) {
        let ok: Outcome<i64, i64> = Result::Ok(value).into();
        prop_assert_eq!(ok.into_result(), Ok(value));

        let err: Outcome<i64, i64> = Result::Err(error).into();
        prop_assert!(err.into_result().is_err());
    }

    #[test]
    fn then_identity(value in any::<i64>()) {
        let outcome = collect(TestCont::ready(value).then(|x| x));
        prop_assert_eq!(outcome, Some(Outcome::Ok(value)));
    }

    #[test]
    fn then_composes(value in any::<i64>(), k in any::<i64>(), m in any::<i64>()) {
        let f = move |x: i64| x.wrapping_mul(k);
        let g = move |x: i64| x.wrapping_add(m);

        let stepwise = collect(TestCont::ready(value).then(f).then(g));
        let fused = collect(TestCont::ready(value).then(move |x| g(f(x))));
        prop_assert_eq!(stepwise, fused);
    }

    #[test]
    fn flatten_law(value in any::<i64>(), k in any::<i64>()) {
        let via_value = collect(TestCont::ready(value).then(move |x| x.wrapping_mul(k)));
        let via_continuation = collect(
            TestCont::ready(value).and_then(move |x| Continuation::ready(x.wrapping_mul(k))),
        );
        prop_assert_eq!(via_value, via_continuation);
    }

    #[test]
    fn failure_forwarding_skips_transforms(error in any::<i64>(), k in any::<i64>()) {
        let outcome = collect(
            Continuation::<i64, i64>::exceptional(error).then(move |x| x.wrapping_mul(k)),
        );
        prop_assert_eq!(outcome, Some(Outcome::Err(error)));
    }

    #[test]
    fn all_preserves_arity_and_order(values in proptest::collection::vec(any::<i64>(), 0..8)) {
        let children: Vec<TestCont<i64>> = values.iter().copied().map(TestCont::ready).collect();
        let outcome = collect(all(children));
        prop_assert_eq!(outcome, Some(Outcome::Ok(values)));
    }

    #[test]
    fn seq_agrees_with_all_when_children_are_ready(
        values in proptest::collection::vec(any::<i64>(), 0..8),
    ) {
        let all_children: Vec<TestCont<i64>> = values.iter().copied().map(TestCont::ready).collect();
        let seq_children: Vec<TestCont<i64>> = values.iter().copied().map(TestCont::ready).collect();
        prop_assert_eq!(collect(all(all_children)), collect(seq(seq_children)));
    }

    #[test]
    fn any_delivers_the_successful_child(
        winner in any::<i64>(),
        losers in proptest::collection::vec(any::<i64>(), 0..4),
        winner_position in any::<proptest::sample::Index>(),
    ) {
        let mut children: Vec<TestCont<i64>> = losers
            .iter()
            .map(|_| Continuation::exceptional(TestError("loser")))
            .collect();
        let position = winner_position.index(children.len() + 1);
        children.insert(position, Continuation::ready(winner));

        let outcome = collect(any_of(children));
        prop_assert_eq!(outcome, Some(Outcome::Ok(winner)));
    }
}
