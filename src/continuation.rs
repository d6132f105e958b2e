//! The continuation handle.
//!
//! A [`Continuation`] is a lazy, move-only, single-shot handle over an
//! asynchronous computation. Nothing runs until the handle is *armed* with
//! a [`Receiver`]; arming consumes the handle and invokes its producer,
//! which eventually delivers exactly one [`Outcome`].
//!
//! A handle holds one of two payloads:
//!
//! - a **producer** closure, for handles with a known result signature;
//! - an **un-materialised composition** (child list plus strategy tag),
//!   built by the operators in [`compose`](crate::compose). Arming such a
//!   handle first materialises it into a producer.
//!
//! # Lifecycle
//!
//! Created by a constructor or an operator; consumed by arming or by being
//! stored inside a larger composition. Dropping an acquired, un-frozen
//! handle without arming it is a programming error, reported through
//! [`diagnostics`](crate::diagnostics).

use crate::compose::{finalize, Composition};
use crate::diagnostics::{self, ContractViolation};
use crate::receiver::Receiver;
use crate::types::ownership::Ownership;
use crate::types::Outcome;

pub(crate) type BoxProducer<T, E> = Box<dyn FnOnce(Receiver<T, E>) + Send>;

/// The payload of a continuation: a producer for signature-tagged handles,
/// or a pending composition for strategy-tagged ones. Exactly one is
/// attached at any time.
pub(crate) enum Node<T, E> {
    Producer(BoxProducer<T, E>),
    Composed(Composition<T, E>),
}

impl<T: Send + 'static, E: Send + 'static> Node<T, E> {
    /// Drives the node with a final receiver, materialising first when the
    /// node is a pending composition.
    pub(crate) fn run(self, receiver: Receiver<T, E>) {
        match self {
            Self::Producer(producer) => producer(receiver),
            Self::Composed(composition) => finalize(composition)(receiver),
        }
    }

    /// Converts a strategy-tagged node into a producer-tagged one by
    /// installing the finaliser for its strategy. Producer nodes pass
    /// through unchanged.
    pub(crate) fn materialize(self) -> Self {
        match self {
            Self::Producer(producer) => Self::Producer(producer),
            Self::Composed(composition) => Self::Producer(finalize(composition)),
        }
    }
}

/// A lazy, move-only, single-shot handle over a deferred computation.
///
/// `T` is the success signature (a scalar, a tuple, or `()`); `E` is the
/// caller's failure type, which the library only ever forwards.
///
/// # Example
///
/// ```
/// use deferral::{Continuation, Outcome};
///
/// let chain = Continuation::<i32, String>::ready(20).then(|x| x + 1);
/// chain.run(|outcome| assert_eq!(outcome, Outcome::Ok(21)));
/// ```
pub struct Continuation<T, E> {
    node: Option<Node<T, E>>,
    ownership: Ownership,
}

impl<T: Send + 'static, E: Send + 'static> Continuation<T, E> {
    /// Wraps a producer: a single-use callable that receives the final
    /// [`Receiver`] when the continuation is armed.
    ///
    /// The producer decides where and when it completes the receiver —
    /// inline on the arming thread, from another thread, or never.
    pub fn new(producer: impl FnOnce(Receiver<T, E>) + Send + 'static) -> Self {
        Self::from_node(Node::Producer(Box::new(producer)))
    }

    /// A continuation that immediately succeeds with `value` when armed.
    pub fn ready(value: T) -> Self {
        Self::new(move |receiver| receiver.succeed(value))
    }

    /// A continuation that immediately fails with `error` when armed.
    pub fn exceptional(error: E) -> Self {
        Self::new(move |receiver| receiver.fail(error))
    }

    /// A continuation that immediately cancels when armed.
    pub fn cancelled() -> Self {
        Self::new(Receiver::cancel)
    }

    /// Wraps a plain callable: when armed, `f` is invoked and its return
    /// value becomes the success result.
    ///
    /// Cheaper than `ready` followed by [`then`](Continuation::then): the
    /// callable runs directly against the final receiver, with no
    /// intermediate outcome in between.
    pub fn defer(f: impl FnOnce() -> T + Send + 'static) -> Self {
        Self::new(move |receiver| receiver.succeed(f()))
    }

    /// Arms the continuation: consumes the handle and starts the
    /// computation, which will deliver its outcome to `receiver`.
    ///
    /// Arming a handle that is frozen inside a composition is a contract
    /// violation; the receiver is dropped and the pipeline stays pending.
    pub fn arm(mut self, receiver: Receiver<T, E>) {
        if self.ownership.is_frozen() {
            diagnostics::report(ContractViolation::ArmedFrozen);
            return;
        }
        self.ownership.release();
        if let Some(node) = self.node.take() {
            tracing::trace!(target: "deferral", "arming continuation");
            node.run(receiver);
        }
    }

    /// Arms the continuation with a plain callable as the terminal
    /// consumer. Equivalent to `arm(Receiver::new(f))`.
    pub fn run(self, f: impl FnOnce(Outcome<T, E>) + Send + 'static) {
        self.arm(Receiver::new(f));
    }

    pub(crate) fn from_node(node: Node<T, E>) -> Self {
        Self::from_parts(node, Ownership::new())
    }

    pub(crate) fn from_parts(node: Node<T, E>, ownership: Ownership) -> Self {
        Self {
            node: Some(node),
            ownership,
        }
    }

    /// Consumes the handle, returning its payload and the ownership state
    /// it had at that moment. The handle is released; its drop is silent.
    pub(crate) fn into_parts(mut self) -> (Option<Node<T, E>>, Ownership) {
        let ownership = self.ownership;
        self.ownership.release();
        (self.node.take(), ownership)
    }

    pub(crate) fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub(crate) fn freeze(&mut self) {
        self.ownership.freeze();
    }

    pub(crate) fn thaw(&mut self) {
        self.ownership.thaw();
    }

    /// Child count of an un-materialised composition, for inspecting
    /// normalisation in tests.
    #[cfg(test)]
    pub(crate) fn composition_width(&self) -> Option<usize> {
        match &self.node {
            Some(Node::Composed(composition)) => Some(composition.children.len()),
            _ => None,
        }
    }
}

impl<T, E> Drop for Continuation<T, E> {
    fn drop(&mut self) {
        if self.node.is_some() && self.ownership.is_acquired() && !self.ownership.is_frozen() {
            diagnostics::report(ContractViolation::LeakedContinuation);
        }
    }
}

impl<T, E> core::fmt::Debug for Continuation<T, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let annotation = match &self.node {
            Some(Node::Producer(_)) => "producer",
            Some(Node::Composed(c)) => c.strategy.name(),
            None => "released",
        };
        f.debug_struct("Continuation")
            .field("annotation", &annotation)
            .field("ownership", &self.ownership)
            .finish()
    }
}

/// Free-function form of [`Continuation::ready`].
pub fn ready<T: Send + 'static, E: Send + 'static>(value: T) -> Continuation<T, E> {
    Continuation::ready(value)
}

/// Free-function form of [`Continuation::exceptional`].
pub fn exceptional<T: Send + 'static, E: Send + 'static>(error: E) -> Continuation<T, E> {
    Continuation::exceptional(error)
}

/// Free-function form of [`Continuation::cancelled`].
pub fn cancelled<T: Send + 'static, E: Send + 'static>() -> Continuation<T, E> {
    Continuation::cancelled()
}

/// Free-function form of [`Continuation::defer`].
pub fn defer<T: Send + 'static, E: Send + 'static>(
    f: impl FnOnce() -> T + Send + 'static,
) -> Continuation<T, E> {
    Continuation::defer(f)
}
