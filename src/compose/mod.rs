//! Composition operators: `all`, `any`, `any_fail_fast`, `seq`.
//!
//! A composition is built in two phases. Combining continuations first
//! produces a handle tagged with a *strategy* instead of a signature; its
//! payload is an ordered list of type-erased children plus a typed
//! reassembly closure. Arming the handle *materialises* it: the finaliser
//! for its strategy installs a coordinator that drives the children and
//! fires the combined receiver exactly once.
//!
//! # Normalisation
//!
//! When two handles are combined under a strategy:
//!
//! - a signature-tagged operand becomes a one-element child list;
//! - an operand already tagged with the *same* strategy contributes its
//!   children directly, so chains like `a.and(b).and(c)` share a single
//!   coordinator;
//! - an operand tagged with a *different* strategy is materialised first,
//!   which preserves grouping: `a.and(b.or(c))` keeps two slots and never
//!   collapses into a three-way `all`.
//!
//! # Semantics
//!
//! - **all** — children may complete concurrently; succeeds with every
//!   child's value in input order; the first failure observed wins; a
//!   cancelled child cancels the whole composition.
//! - **any** — first successful child wins; failures are held back until
//!   every child has finished, then the last failure observed is
//!   delivered; if no child failed and none succeeded, the composition
//!   cancels.
//! - **any_fail_fast** — as `any`, but the first terminal outcome of any
//!   kind wins.
//! - **seq** — children run strictly one at a time in input order; the
//!   first failure or cancellation is delivered immediately and later
//!   children's producers are never invoked.

mod finalize;
mod traverse;

pub use traverse::{ChildSink, Gather, GatherSame};

pub(crate) use finalize::finalize;

use std::any::Any;

use smallvec::SmallVec;

use crate::continuation::{Continuation, Node};
use crate::diagnostics::{self, ContractViolation};
use crate::receiver::Receiver;
use crate::types::ownership::Ownership;
use crate::types::Outcome;

/// The combinator a strategy-tagged continuation will materialise into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Strategy {
    All,
    Any,
    AnyFailFast,
    Seq,
}

impl Strategy {
    pub(crate) const fn name(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Any => "any",
            Self::AnyFailFast => "any-fail-fast",
            Self::Seq => "seq",
        }
    }
}

/// A type-erased child value, produced by one child of a composition.
pub(crate) type SlotValue = Box<dyn Any + Send>;

/// The values delivered by a composition's children, consumed in child
/// order while the typed result is being reassembled.
///
/// Implementation detail of the composition traversal; public only because
/// it appears in [`Gather`]'s interface.
pub struct Slots {
    values: smallvec::IntoIter<[SlotValue; 4]>,
}

impl Slots {
    pub(crate) fn new(values: SmallVec<[SlotValue; 4]>) -> Self {
        Self {
            values: values.into_iter(),
        }
    }

    pub(crate) fn empty() -> Self {
        Self::new(SmallVec::new())
    }

    pub(crate) fn single(value: SlotValue) -> Self {
        let mut values = SmallVec::new();
        values.push(value);
        Self::new(values)
    }

    /// Takes the next slot, downcasting it to its declared type. A missing
    /// or mistyped slot is a contract violation and fatal.
    pub(crate) fn take<T: Send + 'static>(&mut self) -> T {
        let Some(value) = self.values.next() else {
            diagnostics::report(ContractViolation::SlotArityMismatch);
            panic!("composition delivered fewer slots than its signature requires");
        };
        match value.downcast::<T>() {
            Ok(boxed) => *boxed,
            Err(_) => {
                diagnostics::report(ContractViolation::SlotTypeMismatch);
                panic!("composition slot held a value of an unexpected type");
            }
        }
    }
}

/// Rebuilds a typed value from erased child slots.
///
/// Implementation detail of the composition traversal; public only because
/// it appears in [`Gather`]'s interface.
pub type Reassemble<T> = Box<dyn FnOnce(&mut Slots) -> T + Send>;

/// A child of a composition with its signature erased: arming it delivers
/// a boxed value instead of a typed one.
pub(crate) struct ErasedChild<E> {
    run: Box<dyn FnOnce(Receiver<SlotValue, E>) + Send>,
}

impl<E: Send + 'static> ErasedChild<E> {
    pub(crate) fn from_node<T: Send + 'static>(node: Node<T, E>) -> Self {
        Self {
            run: Box::new(move |receiver: Receiver<SlotValue, E>| {
                node.run(Receiver::new(move |outcome: Outcome<T, E>| {
                    receiver.complete(outcome.map(|value| Box::new(value) as SlotValue));
                }));
            }),
        }
    }

    /// A child that never completes; stands in for an operand whose payload
    /// was already gone when it reached a composition.
    pub(crate) fn never() -> Self {
        Self {
            run: Box::new(drop),
        }
    }

    pub(crate) fn arm(self, receiver: Receiver<SlotValue, E>) {
        (self.run)(receiver);
    }
}

/// The payload of a strategy-tagged continuation: the ordered child list
/// and the closure that rebuilds the typed result from their slots.
pub(crate) struct Composition<T, E> {
    pub(crate) strategy: Strategy,
    pub(crate) children: Vec<ErasedChild<E>>,
    pub(crate) reassemble: Reassemble<T>,
}

/// Normalises one operand of a binary combination into a child list and
/// its reassembly closure.
fn normalise<T, E>(
    strategy: Strategy,
    operand: Continuation<T, E>,
) -> (Vec<ErasedChild<E>>, Reassemble<T>)
where
    T: Send + 'static,
    E: Send + 'static,
{
    if !operand.ownership().is_acquired() {
        diagnostics::report(ContractViolation::ComposedReleased);
    }
    let (node, _ownership) = operand.into_parts();
    match node {
        Some(Node::Composed(composition)) if composition.strategy == strategy => {
            (composition.children, composition.reassemble)
        }
        Some(node) => (
            vec![ErasedChild::from_node(node.materialize())],
            Box::new(|slots: &mut Slots| slots.take::<T>()),
        ),
        None => (
            vec![ErasedChild::never()],
            Box::new(|slots: &mut Slots| slots.take::<T>()),
        ),
    }
}

/// Connects two operands with different signatures under `strategy`,
/// pairing their results. Used by `all` and `seq` combination.
pub(crate) fn connect<L, R, E>(
    strategy: Strategy,
    left: Continuation<L, E>,
    right: Continuation<R, E>,
) -> Continuation<(L, R), E>
where
    L: Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    let mut ownership = Ownership::new();
    ownership.merge_frozen(left.ownership());
    ownership.merge_frozen(right.ownership());

    let (mut children, left_reassemble) = normalise(strategy, left);
    let (right_children, right_reassemble) = normalise(strategy, right);
    children.extend(right_children);

    let reassemble: Reassemble<(L, R)> = Box::new(move |slots| {
        let left_value = left_reassemble(slots);
        let right_value = right_reassemble(slots);
        (left_value, right_value)
    });

    Continuation::from_parts(
        Node::Composed(Composition {
            strategy,
            children,
            reassemble,
        }),
        ownership,
    )
}

/// Connects two operands sharing one signature under `strategy`, keeping
/// that signature. Used by `any` combination, where the winner's value is
/// the result.
pub(crate) fn connect_same<T, E>(
    strategy: Strategy,
    left: Continuation<T, E>,
    right: Continuation<T, E>,
) -> Continuation<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    let mut ownership = Ownership::new();
    ownership.merge_frozen(left.ownership());
    ownership.merge_frozen(right.ownership());

    let (mut children, reassemble) = normalise(strategy, left);
    let (right_children, _right_reassemble) = normalise(strategy, right);
    children.extend(right_children);

    Continuation::from_parts(
        Node::Composed(Composition {
            strategy,
            children,
            reassemble,
        }),
        ownership,
    )
}

fn gathered<E, C>(strategy: Strategy, input: C) -> Continuation<C::Output, E>
where
    E: Send + 'static,
    C: Gather<E>,
{
    let mut sink = ChildSink::new();
    let reassemble = input.gather(&mut sink);
    let (children, ownership) = sink.into_parts();
    Continuation::from_parts(
        Node::Composed(Composition {
            strategy,
            children,
            reassemble,
        }),
        ownership,
    )
}

fn gathered_same<E, C>(strategy: Strategy, input: C) -> Continuation<C::Payload, E>
where
    E: Send + 'static,
    C: GatherSame<E>,
{
    let mut sink = ChildSink::new();
    input.gather_same(&mut sink);
    let (children, ownership) = sink.into_parts();
    let reassemble: Reassemble<C::Payload> = Box::new(|slots: &mut Slots| slots.take::<C::Payload>());
    Continuation::from_parts(
        Node::Composed(Composition {
            strategy,
            children,
            reassemble,
        }),
        ownership,
    )
}

/// Combines every continuation in `input` so that all of them run and all
/// must succeed.
///
/// `input` may be a single continuation, a tuple, a `Vec`, a `BTreeMap`,
/// or any nesting of those; the result signature preserves the container
/// shape. Children may complete concurrently; the first failure observed
/// is delivered immediately, and a cancelled child cancels the whole
/// composition.
///
/// # Example
///
/// ```
/// use deferral::{all, ready, Outcome};
///
/// all((ready::<_, String>("a"), ready(3)))
///     .then(|(s, n)| (s, n, n))
///     .run(|outcome| assert_eq!(outcome, Outcome::Ok(("a", 3, 3))));
/// ```
pub fn all<E, C>(input: C) -> Continuation<C::Output, E>
where
    E: Send + 'static,
    C: Gather<E>,
{
    gathered(Strategy::All, input)
}

/// Combines every continuation in `input` so that the first success wins.
///
/// Failures are held back: only when every child has failed (or been
/// cancelled) is the last failure observed delivered. Every leaf must
/// share one signature.
pub fn any<E, C>(input: C) -> Continuation<C::Payload, E>
where
    E: Send + 'static,
    C: GatherSame<E>,
{
    gathered_same(Strategy::Any, input)
}

/// Combines every continuation in `input` so that the first terminal
/// outcome wins, success or not.
///
/// The first child failure is surfaced immediately; children not yet
/// started at that point are dropped.
pub fn any_fail_fast<E, C>(input: C) -> Continuation<C::Payload, E>
where
    E: Send + 'static,
    C: GatherSame<E>,
{
    gathered_same(Strategy::AnyFailFast, input)
}

/// Runs every continuation in `input` one at a time, in input order.
///
/// Child *i + 1*'s producer is invoked only after child *i* delivered a
/// success; the first failure or cancellation is delivered immediately and
/// later producers never run. The result signature preserves the container
/// shape, as with [`all`].
pub fn seq<E, C>(input: C) -> Continuation<C::Output, E>
where
    E: Send + 'static,
    C: Gather<E>,
{
    gathered(Strategy::Seq, input)
}

impl<T: Send + 'static, E: Send + 'static> Continuation<T, E> {
    /// Binary [`all`]: runs `self` and `other`, pairing their results.
    /// Chaining `a.and(b).and(c)` keeps a single coordinator for all three.
    pub fn and<U: Send + 'static>(self, other: Continuation<U, E>) -> Continuation<(T, U), E> {
        connect(Strategy::All, self, other)
    }

    /// Binary [`any`]: first success of `self` and `other` wins.
    pub fn or(self, other: Continuation<T, E>) -> Continuation<T, E> {
        connect_same(Strategy::Any, self, other)
    }

    /// Binary [`seq`]: runs `self`, then `other`, pairing their results.
    pub fn followed_by<U: Send + 'static>(
        self,
        other: Continuation<U, E>,
    ) -> Continuation<(T, U), E> {
        connect(Strategy::Seq, self, other)
    }
}
