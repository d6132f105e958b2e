//! Sequencing operators: attaching the next stage to a continuation.
//!
//! Every operator here is built on one primitive, `pipe`, which arms the
//! upstream continuation with an intermediate receiver and hands the
//! upstream outcome plus the downstream receiver to a stage closure. The
//! public operators differ only in how they demultiplex the outcome:
//!
//! - [`then`](Continuation::then) / [`and_then`](Continuation::and_then) /
//!   [`try_then`](Continuation::try_then) run on success and forward
//!   failure and cancellation unchanged;
//! - [`fail`](Continuation::fail) / [`fail_with`](Continuation::fail_with) /
//!   [`try_fail`](Continuation::try_fail) / [`recover`](Continuation::recover)
//!   run on failure and forward success and cancellation unchanged;
//! - [`next`](Continuation::next) sees every outcome;
//! - [`finally`](Continuation::finally) runs on every outcome and forwards
//!   it unchanged.
//!
//! A handler that returns [`Outcome::Err`] makes its stage emit failure; a
//! handler that returns [`Outcome::Cancelled`] stops the chain. Stages
//! observe a happens-before relationship with their upstream's completion.

use crate::continuation::{Continuation, Node};
use crate::receiver::Receiver;
use crate::types::Outcome;

impl<T: Send + 'static, E: Send + 'static> Continuation<T, E> {
    /// The sequencing primitive: the returned continuation, when armed,
    /// arms `self` with an intermediate receiver and feeds the outcome and
    /// the downstream receiver to `stage`.
    fn pipe<U: Send + 'static>(
        self,
        stage: impl FnOnce(Outcome<T, E>, Receiver<U, E>) + Send + 'static,
    ) -> Continuation<U, E> {
        let (node, ownership) = self.into_parts();
        let producer = move |downstream: Receiver<U, E>| {
            if let Some(node) = node {
                node.run(Receiver::new(move |outcome| stage(outcome, downstream)));
            }
        };
        Continuation::from_parts(Node::Producer(Box::new(producer)), ownership)
    }

    /// Attaches a success transform. On upstream failure or cancellation
    /// `f` is not invoked and the outcome is forwarded unchanged.
    ///
    /// # Example
    ///
    /// ```
    /// use deferral::{Continuation, Outcome};
    ///
    /// Continuation::<i32, String>::ready(1)
    ///     .then(|x| x + 2)
    ///     .then(|y| y * 10)
    ///     .run(|outcome| assert_eq!(outcome, Outcome::Ok(30)));
    /// ```
    pub fn then<U: Send + 'static>(
        self,
        f: impl FnOnce(T) -> U + Send + 'static,
    ) -> Continuation<U, E> {
        self.pipe(move |outcome, receiver| match outcome {
            Outcome::Ok(value) => receiver.succeed(f(value)),
            Outcome::Err(error) => receiver.fail(error),
            Outcome::Cancelled => receiver.cancel(),
        })
    }

    /// Attaches a success transform that returns a new continuation. The
    /// returned continuation is armed with the downstream receiver, so the
    /// stage's signature is the returned continuation's signature — never a
    /// continuation of a continuation.
    pub fn and_then<U: Send + 'static>(
        self,
        f: impl FnOnce(T) -> Continuation<U, E> + Send + 'static,
    ) -> Continuation<U, E> {
        self.pipe(move |outcome, receiver| match outcome {
            Outcome::Ok(value) => f(value).arm(receiver),
            Outcome::Err(error) => receiver.fail(error),
            Outcome::Cancelled => receiver.cancel(),
        })
    }

    /// Attaches a success transform with full control over the stage
    /// outcome: returning `Err` fails the stage, returning `Cancelled`
    /// stops the chain.
    pub fn try_then<U: Send + 'static>(
        self,
        f: impl FnOnce(T) -> Outcome<U, E> + Send + 'static,
    ) -> Continuation<U, E> {
        self.pipe(move |outcome, receiver| match outcome {
            Outcome::Ok(value) => receiver.complete(f(value)),
            Outcome::Err(error) => receiver.fail(error),
            Outcome::Cancelled => receiver.cancel(),
        })
    }

    /// Attaches a failure handler that recovers with a value. On upstream
    /// success or cancellation `h` is not invoked and the outcome is
    /// forwarded unchanged.
    pub fn fail(self, h: impl FnOnce(E) -> T + Send + 'static) -> Continuation<T, E> {
        self.pipe(move |outcome, receiver| match outcome {
            Outcome::Ok(value) => receiver.succeed(value),
            Outcome::Err(error) => receiver.succeed(h(error)),
            Outcome::Cancelled => receiver.cancel(),
        })
    }

    /// Attaches a failure handler that recovers with a new continuation,
    /// whose success becomes this stage's success.
    pub fn fail_with(
        self,
        h: impl FnOnce(E) -> Continuation<T, E> + Send + 'static,
    ) -> Continuation<T, E> {
        self.pipe(move |outcome, receiver| match outcome {
            Outcome::Ok(value) => receiver.succeed(value),
            Outcome::Err(error) => h(error).arm(receiver),
            Outcome::Cancelled => receiver.cancel(),
        })
    }

    /// Attaches a failure handler with full control over the stage outcome:
    /// returning `Err` re-raises, returning `Cancelled` stops the chain.
    pub fn try_fail(
        self,
        h: impl FnOnce(E) -> Outcome<T, E> + Send + 'static,
    ) -> Continuation<T, E> {
        self.pipe(move |outcome, receiver| match outcome {
            Outcome::Ok(value) => receiver.succeed(value),
            Outcome::Err(error) => receiver.complete(h(error)),
            Outcome::Cancelled => receiver.cancel(),
        })
    }

    /// Attaches a plain continuation as the recovery source: shorthand for
    /// `fail_with(move |_| fallback)`, with the failure value discarded.
    ///
    /// The fallback is held frozen inside the stage; if the upstream
    /// succeeds it is dropped without ever running, which is not a leak.
    pub fn recover(self, mut fallback: Continuation<T, E>) -> Continuation<T, E> {
        fallback.freeze();
        self.pipe(move |outcome, receiver| match outcome {
            Outcome::Ok(value) => receiver.succeed(value),
            Outcome::Err(_) => {
                let mut fallback = fallback;
                fallback.thaw();
                fallback.arm(receiver);
            }
            Outcome::Cancelled => receiver.cancel(),
        })
    }

    /// Attaches a handler that observes every outcome and chooses the
    /// stage's outcome itself. Success and failure are told apart by
    /// matching on the [`Outcome`].
    pub fn next<U: Send + 'static>(
        self,
        f: impl FnOnce(Outcome<T, E>) -> Outcome<U, E> + Send + 'static,
    ) -> Continuation<U, E> {
        self.pipe(move |outcome, receiver| receiver.complete(f(outcome)))
    }

    /// Runs `f` on any outcome — success, failure, or cancellation — then
    /// forwards the original outcome unchanged.
    pub fn finally(self, f: impl FnOnce() + Send + 'static) -> Continuation<T, E> {
        self.pipe(move |outcome, receiver| {
            f();
            receiver.complete(outcome);
        })
    }
}
