//! Traversal of composition inputs.
//!
//! The n-ary composition entries accept a single continuation, tuples,
//! `Vec`s, `BTreeMap`s, and arbitrary nestings of those. The traversal
//! visits leaves in a stable pre-order (tuples left to right, vectors in
//! index order, maps in key order), validates and consumes each
//! continuation it encounters, and records how to rebuild the original
//! container shape from the delivered slot values.

use std::collections::BTreeMap;

use crate::continuation::Continuation;
use crate::diagnostics::{self, ContractViolation};
use crate::types::ownership::Ownership;

use super::{ErasedChild, Reassemble, Slots};

/// Accumulates the erased children of a composition during traversal,
/// together with the frozen state inherited from the operands.
///
/// Implementation detail of [`Gather`] and [`GatherSame`].
pub struct ChildSink<E> {
    children: Vec<ErasedChild<E>>,
    frozen: bool,
}

impl<E: Send + 'static> ChildSink<E> {
    pub(crate) fn new() -> Self {
        Self {
            children: Vec::new(),
            frozen: false,
        }
    }

    /// Validates, freezes, materialises, and erases one leaf continuation.
    pub(crate) fn push<T: Send + 'static>(&mut self, leaf: Continuation<T, E>) {
        if !leaf.ownership().is_acquired() {
            diagnostics::report(ContractViolation::ComposedReleased);
        }
        if leaf.ownership().is_frozen() {
            self.frozen = true;
        }
        let (node, _ownership) = leaf.into_parts();
        let child = match node {
            Some(node) => ErasedChild::from_node(node.materialize()),
            None => ErasedChild::never(),
        };
        self.children.push(child);
    }

    pub(crate) fn into_parts(self) -> (Vec<ErasedChild<E>>, Ownership) {
        let mut ownership = Ownership::new();
        if self.frozen {
            ownership.freeze();
        }
        (self.children, ownership)
    }
}

/// Inputs accepted by [`all`](super::all) and [`seq`](super::seq):
/// continuations and containers of them, combined shape-preservingly.
pub trait Gather<E: Send + 'static>: Sized {
    /// The combined success signature; container shapes are preserved.
    type Output: Send + 'static;

    /// Feeds every leaf into `sink` in pre-order and returns the closure
    /// that rebuilds `Self::Output` from the delivered slots.
    #[doc(hidden)]
    fn gather(self, sink: &mut ChildSink<E>) -> Reassemble<Self::Output>;
}

impl<T, E> Gather<E> for Continuation<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = T;

    fn gather(self, sink: &mut ChildSink<E>) -> Reassemble<T> {
        sink.push(self);
        Box::new(|slots: &mut Slots| slots.take::<T>())
    }
}

impl<C, E> Gather<E> for Vec<C>
where
    C: Gather<E>,
    E: Send + 'static,
{
    type Output = Vec<C::Output>;

    fn gather(self, sink: &mut ChildSink<E>) -> Reassemble<Self::Output> {
        let parts: Vec<Reassemble<C::Output>> =
            self.into_iter().map(|item| item.gather(sink)).collect();
        Box::new(move |slots| parts.into_iter().map(|part| part(slots)).collect())
    }
}

impl<K, C, E> Gather<E> for BTreeMap<K, C>
where
    K: Ord + Send + 'static,
    C: Gather<E>,
    E: Send + 'static,
{
    type Output = BTreeMap<K, C::Output>;

    fn gather(self, sink: &mut ChildSink<E>) -> Reassemble<Self::Output> {
        let parts: Vec<(K, Reassemble<C::Output>)> = self
            .into_iter()
            .map(|(key, item)| (key, item.gather(sink)))
            .collect();
        Box::new(move |slots| {
            parts
                .into_iter()
                .map(|(key, part)| (key, part(slots)))
                .collect()
        })
    }
}

macro_rules! impl_gather_for_tuple {
    ($($member:ident => $part:ident),+) => {
        impl<E: Send + 'static, $($member: Gather<E>),+> Gather<E> for ($($member,)+) {
            type Output = ($($member::Output,)+);

            fn gather(self, sink: &mut ChildSink<E>) -> Reassemble<Self::Output> {
                #[allow(non_snake_case)]
                let ($($member,)+) = self;
                $(let $part = $member.gather(sink);)+
                Box::new(move |slots| ($($part(slots),)+))
            }
        }
    };
}

impl_gather_for_tuple!(C0 => p0);
impl_gather_for_tuple!(C0 => p0, C1 => p1);
impl_gather_for_tuple!(C0 => p0, C1 => p1, C2 => p2);
impl_gather_for_tuple!(C0 => p0, C1 => p1, C2 => p2, C3 => p3);
impl_gather_for_tuple!(C0 => p0, C1 => p1, C2 => p2, C3 => p3, C4 => p4);
impl_gather_for_tuple!(C0 => p0, C1 => p1, C2 => p2, C3 => p3, C4 => p4, C5 => p5);

/// Inputs accepted by [`any`](super::any) and
/// [`any_fail_fast`](super::any_fail_fast): continuations and containers of
/// them, where every leaf shares one signature.
pub trait GatherSame<E: Send + 'static>: Sized {
    /// The signature shared by every leaf; the winner's value is the
    /// combined result.
    type Payload: Send + 'static;

    /// Feeds every leaf into `sink` in pre-order.
    #[doc(hidden)]
    fn gather_same(self, sink: &mut ChildSink<E>);
}

impl<T, E> GatherSame<E> for Continuation<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Payload = T;

    fn gather_same(self, sink: &mut ChildSink<E>) {
        sink.push(self);
    }
}

impl<C, E> GatherSame<E> for Vec<C>
where
    C: GatherSame<E>,
    E: Send + 'static,
{
    type Payload = C::Payload;

    fn gather_same(self, sink: &mut ChildSink<E>) {
        for item in self {
            item.gather_same(sink);
        }
    }
}

macro_rules! impl_gather_same_for_tuple {
    ($head:ident, $($tail:ident),+) => {
        impl<E, $head, $($tail),+> GatherSame<E> for ($head, $($tail,)+)
        where
            E: Send + 'static,
            $head: GatherSame<E>,
            $($tail: GatherSame<E, Payload = $head::Payload>,)+
        {
            type Payload = $head::Payload;

            fn gather_same(self, sink: &mut ChildSink<E>) {
                #[allow(non_snake_case)]
                let ($head, $($tail,)+) = self;
                $head.gather_same(sink);
                $($tail.gather_same(sink);)+
            }
        }
    };
}

impl_gather_same_for_tuple!(C0, C1);
impl_gather_same_for_tuple!(C0, C1, C2);
impl_gather_same_for_tuple!(C0, C1, C2, C3);
impl_gather_same_for_tuple!(C0, C1, C2, C3, C4);
impl_gather_same_for_tuple!(C0, C1, C2, C3, C4, C5);
