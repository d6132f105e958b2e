//! Per-strategy finalisers.
//!
//! Materialising a strategy-tagged continuation installs one of the
//! producers below. Each producer owns a small heap-allocated coordinator
//! shared by the children's receivers; the coordinator dies with its last
//! reference and guarantees the combined receiver fires exactly once, even
//! when children complete concurrently. No lock is held while a child is
//! being armed or while the combined receiver is being invoked.

use std::collections::VecDeque;
use std::mem;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::continuation::BoxProducer;
use crate::receiver::Receiver;
use crate::types::Outcome;

use super::{Composition, ErasedChild, Reassemble, SlotValue, Slots, Strategy};

/// The combined receiver and the slot-reassembly closure, taken exactly
/// once by whichever child completion ends the composition.
struct Finish<T, E> {
    receiver: Receiver<T, E>,
    reassemble: Reassemble<T>,
}

/// Takes the finish cell, releasing its lock before the caller delivers:
/// the combined receiver is always invoked with no coordinator lock held.
fn take_finish<T, E>(cell: &Mutex<Option<Finish<T, E>>>) -> Option<Finish<T, E>> {
    cell.lock().take()
}

/// Installs the finaliser for the composition's strategy, producing a
/// signature-tagged producer closure.
pub(crate) fn finalize<T, E>(composition: Composition<T, E>) -> BoxProducer<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    let Composition {
        strategy,
        children,
        reassemble,
    } = composition;
    tracing::trace!(
        target: "deferral",
        strategy = strategy.name(),
        children = children.len(),
        "materialising composition"
    );
    match strategy {
        Strategy::All => all_producer(children, reassemble),
        Strategy::Any => any_producer(children, reassemble, false),
        Strategy::AnyFailFast => any_producer(children, reassemble, true),
        Strategy::Seq => seq_producer(children, reassemble),
    }
}

struct AllState<T, E> {
    remaining: AtomicUsize,
    claimed: AtomicBool,
    slots: Mutex<Vec<Option<SlotValue>>>,
    finish: Mutex<Option<Finish<T, E>>>,
}

fn all_producer<T, E>(children: Vec<ErasedChild<E>>, reassemble: Reassemble<T>) -> BoxProducer<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    Box::new(move |receiver: Receiver<T, E>| {
        if children.is_empty() {
            receiver.succeed(reassemble(&mut Slots::empty()));
            return;
        }
        let count = children.len();
        let mut slots = Vec::with_capacity(count);
        slots.resize_with(count, || None);
        let state = Arc::new(AllState {
            remaining: AtomicUsize::new(count),
            claimed: AtomicBool::new(false),
            slots: Mutex::new(slots),
            finish: Mutex::new(Some(Finish {
                receiver,
                reassemble,
            })),
        });
        for (index, child) in children.into_iter().enumerate() {
            if state.claimed.load(Ordering::Acquire) {
                // A sibling already delivered; the rest are dropped unarmed.
                break;
            }
            let state = Arc::clone(&state);
            child.arm(Receiver::new(
                move |outcome: Outcome<SlotValue, E>| match outcome {
                    Outcome::Ok(value) => {
                        state.slots.lock()[index] = Some(value);
                        if state.remaining.fetch_sub(1, Ordering::AcqRel) == 1
                            && !state.claimed.swap(true, Ordering::AcqRel)
                        {
                            if let Some(finish) = take_finish(&state.finish) {
                                let values: SmallVec<[SlotValue; 4]> =
                                    mem::take(&mut *state.slots.lock())
                                        .into_iter()
                                        .map(|slot| slot.expect("every child has delivered"))
                                        .collect();
                                let Finish {
                                    receiver,
                                    reassemble,
                                } = finish;
                                receiver.succeed(reassemble(&mut Slots::new(values)));
                            }
                        }
                    }
                    Outcome::Err(error) => {
                        if !state.claimed.swap(true, Ordering::AcqRel) {
                            if let Some(finish) = take_finish(&state.finish) {
                                finish.receiver.fail(error);
                            }
                        }
                    }
                    Outcome::Cancelled => {
                        if !state.claimed.swap(true, Ordering::AcqRel) {
                            if let Some(finish) = take_finish(&state.finish) {
                                finish.receiver.cancel();
                            }
                        }
                    }
                },
            ));
        }
    })
}

struct AnyState<T, E> {
    remaining: AtomicUsize,
    claimed: AtomicBool,
    last_failure: Mutex<Option<E>>,
    finish: Mutex<Option<Finish<T, E>>>,
}

/// Delivers the held-back failure (or cancellation) once every child has
/// finished without a winner.
fn finish_exhausted_any<T, E>(state: &AnyState<T, E>) {
    if state.remaining.fetch_sub(1, Ordering::AcqRel) == 1
        && !state.claimed.swap(true, Ordering::AcqRel)
    {
        if let Some(finish) = take_finish(&state.finish) {
            let last_failure = state.last_failure.lock().take();
            match last_failure {
                Some(error) => finish.receiver.fail(error),
                None => finish.receiver.cancel(),
            }
        }
    }
}

fn any_producer<T, E>(
    children: Vec<ErasedChild<E>>,
    reassemble: Reassemble<T>,
    fail_fast: bool,
) -> BoxProducer<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    Box::new(move |receiver: Receiver<T, E>| {
        if children.is_empty() {
            // No child can ever claim the result.
            receiver.cancel();
            return;
        }
        let state = Arc::new(AnyState {
            remaining: AtomicUsize::new(children.len()),
            claimed: AtomicBool::new(false),
            last_failure: Mutex::new(None),
            finish: Mutex::new(Some(Finish {
                receiver,
                reassemble,
            })),
        });
        for child in children {
            if state.claimed.load(Ordering::Acquire) {
                // The claim happened while arming; the rest never start.
                break;
            }
            let state = Arc::clone(&state);
            child.arm(Receiver::new(
                move |outcome: Outcome<SlotValue, E>| match outcome {
                    Outcome::Ok(value) => {
                        if !state.claimed.swap(true, Ordering::AcqRel) {
                            if let Some(finish) = take_finish(&state.finish) {
                                let Finish {
                                    receiver,
                                    reassemble,
                                } = finish;
                                receiver.succeed(reassemble(&mut Slots::single(value)));
                            }
                        }
                    }
                    Outcome::Err(error) => {
                        if fail_fast {
                            if !state.claimed.swap(true, Ordering::AcqRel) {
                                if let Some(finish) = take_finish(&state.finish) {
                                    finish.receiver.fail(error);
                                }
                            }
                        } else {
                            *state.last_failure.lock() = Some(error);
                            finish_exhausted_any(&state);
                        }
                    }
                    Outcome::Cancelled => {
                        if fail_fast {
                            if !state.claimed.swap(true, Ordering::AcqRel) {
                                if let Some(finish) = take_finish(&state.finish) {
                                    finish.receiver.cancel();
                                }
                            }
                        } else {
                            finish_exhausted_any(&state);
                        }
                    }
                },
            ));
        }
    })
}

struct SeqState<T, E> {
    pending: Mutex<VecDeque<ErasedChild<E>>>,
    values: Mutex<SmallVec<[SlotValue; 4]>>,
    finish: Mutex<Option<Finish<T, E>>>,
}

/// Arms the next pending child, or delivers the combined success when none
/// remain. Called re-entrantly when a child completes inline, recursing one
/// frame per child.
fn advance_seq<T, E>(state: &Arc<SeqState<T, E>>)
where
    T: Send + 'static,
    E: Send + 'static,
{
    let next = state.pending.lock().pop_front();
    match next {
        Some(child) => {
            let state = Arc::clone(state);
            child.arm(Receiver::new(
                move |outcome: Outcome<SlotValue, E>| match outcome {
                    Outcome::Ok(value) => {
                        state.values.lock().push(value);
                        advance_seq(&state);
                    }
                    Outcome::Err(error) => {
                        // Later producers are never invoked.
                        state.pending.lock().clear();
                        if let Some(finish) = take_finish(&state.finish) {
                            finish.receiver.fail(error);
                        }
                    }
                    Outcome::Cancelled => {
                        state.pending.lock().clear();
                        if let Some(finish) = take_finish(&state.finish) {
                            finish.receiver.cancel();
                        }
                    }
                },
            ));
        }
        None => {
            if let Some(finish) = take_finish(&state.finish) {
                let values = mem::take(&mut *state.values.lock());
                let Finish {
                    receiver,
                    reassemble,
                } = finish;
                receiver.succeed(reassemble(&mut Slots::new(values)));
            }
        }
    }
}

fn seq_producer<T, E>(children: Vec<ErasedChild<E>>, reassemble: Reassemble<T>) -> BoxProducer<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    Box::new(move |receiver: Receiver<T, E>| {
        let state = Arc::new(SeqState {
            pending: Mutex::new(children.into()),
            values: Mutex::new(SmallVec::new()),
            finish: Mutex::new(Some(Finish {
                receiver,
                reassemble,
            })),
        });
        advance_seq(&state);
    })
}
