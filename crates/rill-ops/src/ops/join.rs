// Copyright (c) 2025-2026 Zensical and contributors

// SPDX-License-Identifier: MIT
// All contributions are certified under the DCO

// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to
// deal in the Software without restriction, including without limitation the
// rights to use, copy, modify, merge, publish, distribute, sublicense, and/or
// sell copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:

// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NON-INFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS
// IN THE SOFTWARE.

// ----------------------------------------------------------------------------

//! Symmetric hash join operator.

use ahash::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use rill_element::{Element, Key, Record, StreamData, Tuple, TupleRef};
use rill_pubsub::{BaseOp, BinaryInlet, Outlet, Publish};

use crate::ops::KeyFn;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Residual join predicate.
pub type JoinPredicateFn<L, R> =
    Box<dyn Fn(&TupleRef<L>, &TupleRef<R>) -> bool + Send + Sync>;

/// Combiner producing the output element of a match.
pub type CombineFn<L, R, O> =
    Box<dyn Fn(&TupleRef<L>, &TupleRef<R>) -> O + Send + Sync>;

/// Hash multimaps of both sides.
struct Maps<K, L, R> {
    /// Left-side tuples by key.
    left: HashMap<K, Vec<TupleRef<L>>>,
    /// Right-side tuples by key.
    right: HashMap<K, Vec<TupleRef<R>>>,
}

/// Symmetric hash join operator.
///
/// Joins two streams on equality of per-side key functions plus an
/// optional residual predicate. Each side maintains a hash multimap from
/// key to buffered tuples: an arriving tuple first probes the opposite
/// map, emitting one combined element per match with the arrival's
/// outdated flag, then inserts itself into its own map, or, when
/// outdated, removes one occurrence of itself by handle identity. Failing
/// to find the occurrence is a silent no-op.
///
/// Joins are typically fed by two windows, whose outdated emissions keep
/// the map sizes bounded. The inner product of matching keys is produced
/// on every arrival, so output cardinality is the caller's concern.
/// Punctuations from either side are forwarded, never buffered.
pub struct SHJoin<L, R, K, O>
where
    L: Record,
    R: Record,
{
    /// Left key function.
    left_key: KeyFn<TupleRef<L>, K>,
    /// Right key function.
    right_key: KeyFn<TupleRef<R>, K>,
    /// Residual predicate, if any.
    predicate: Option<JoinPredicateFn<L, R>>,
    /// Match combiner.
    combine: CombineFn<L, R, O>,
    /// Hash multimaps of both sides.
    maps: Mutex<Maps<K, L, R>>,
    /// Input endpoints.
    inlet: BinaryInlet<TupleRef<L>, TupleRef<R>>,
    /// Output endpoints.
    outlet: Outlet<O>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<L, R, K, O> SHJoin<L, R, K, O>
where
    L: Record,
    R: Record,
    K: Key,
    O: StreamData,
{
    /// Creates a join with the given key functions and combiner.
    pub fn new<F>(
        left_key: KeyFn<TupleRef<L>, K>,
        right_key: KeyFn<TupleRef<R>, K>,
        predicate: Option<JoinPredicateFn<L, R>>,
        combine: F,
    ) -> Arc<Self>
    where
        F: Fn(&TupleRef<L>, &TupleRef<R>) -> O + Send + Sync + 'static,
    {
        Arc::new_cyclic(|op: &Weak<Self>| {
            let on_left = {
                let op = op.clone();
                move |element| {
                    if let Some(this) = op.upgrade() {
                        this.process_left(&element);
                    }
                }
            };
            let on_right = {
                let op = op.clone();
                move |element| {
                    if let Some(this) = op.upgrade() {
                        this.process_right(&element);
                    }
                }
            };
            let on_punctuation = {
                let op = op.clone();
                move |punctuation| {
                    if let Some(this) = op.upgrade() {
                        this.outlet.publish_punctuation(punctuation);
                    }
                }
            };
            Self {
                left_key,
                right_key,
                predicate,
                combine: Box::new(combine),
                maps: Mutex::new(Maps {
                    left: HashMap::default(),
                    right: HashMap::default(),
                }),
                inlet: BinaryInlet::new(on_left, on_right, on_punctuation),
                outlet: Outlet::new(),
            }
        })
    }

    /// Handles an element arriving on the left side.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all)
    )]
    fn process_left(&self, element: &Element<TupleRef<L>>) {
        let key = (self.left_key)(&element.data);
        let matches = {
            let mut maps =
                self.maps.lock().unwrap_or_else(PoisonError::into_inner);

            let mut matches = Vec::new();
            if let Some(candidates) = maps.right.get(&key) {
                for candidate in candidates {
                    let accepted = self
                        .predicate
                        .as_ref()
                        .is_none_or(|p| p(&element.data, candidate));
                    if accepted {
                        matches.push((self.combine)(&element.data, candidate));
                    }
                }
            }

            if element.outdated {
                Self::remove(&mut maps.left, &key, &element.data);
            } else {
                maps.left
                    .entry(key)
                    .or_default()
                    .push(element.data.clone());
            }
            matches
        };

        for data in matches {
            self.outlet.publish(data, element.outdated);
        }
    }

    /// Handles an element arriving on the right side.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all)
    )]
    fn process_right(&self, element: &Element<TupleRef<R>>) {
        let key = (self.right_key)(&element.data);
        let matches = {
            let mut maps =
                self.maps.lock().unwrap_or_else(PoisonError::into_inner);

            let mut matches = Vec::new();
            if let Some(candidates) = maps.left.get(&key) {
                for candidate in candidates {
                    let accepted = self
                        .predicate
                        .as_ref()
                        .is_none_or(|p| p(candidate, &element.data));
                    if accepted {
                        matches.push((self.combine)(candidate, &element.data));
                    }
                }
            }

            if element.outdated {
                Self::remove(&mut maps.right, &key, &element.data);
            } else {
                maps.right
                    .entry(key)
                    .or_default()
                    .push(element.data.clone());
            }
            matches
        };

        for data in matches {
            self.outlet.publish(data, element.outdated);
        }
    }

    /// Removes one occurrence of the tuple, identified by handle.
    fn remove<T>(
        map: &mut HashMap<K, Vec<TupleRef<T>>>,
        key: &K,
        tuple: &TupleRef<T>,
    ) where
        T: Record,
    {
        if let Some(bucket) = map.get_mut(key) {
            if let Some(index) =
                bucket.iter().position(|buffered| Tuple::same(buffered, tuple))
            {
                bucket.remove(index);
                if bucket.is_empty() {
                    map.remove(key);
                }
            }
        }
    }

    /// Returns the input endpoints.
    #[inline]
    #[must_use]
    pub fn inlet(&self) -> &BinaryInlet<TupleRef<L>, TupleRef<R>> {
        &self.inlet
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<L, R, K, O> BaseOp for SHJoin<L, R, K, O>
where
    L: Record,
    R: Record,
    K: Key,
    O: StreamData,
{
    fn name(&self) -> &str {
        "SHJoin"
    }
}

impl<L, R, K, O> Publish<O> for SHJoin<L, R, K, O>
where
    L: Record,
    R: Record,
    K: Key,
    O: StreamData,
{
    #[inline]
    fn outlet(&self) -> &Outlet<O> {
        &self.outlet
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    mod join {
        use std::sync::Arc;

        use rill_element::{Tuple, TupleRef};
        use rill_pubsub::{
            link, link_left, link_right, Outlet, Publish, Subscribe,
        };

        use crate::ops::join::SHJoin;
        use crate::ops::sink::CollectSink;

        type Side = TupleRef<(i64, i64)>;

        fn create() -> (
            Outlet<Side>,
            Outlet<Side>,
            Arc<SHJoin<(i64, i64), (i64, i64), i64, TupleRef<(i64, i64, i64, i64)>>>,
        ) {
            let join = SHJoin::new(
                Arc::new(|tuple: &Side| tuple.record().0),
                Arc::new(|tuple: &Side| tuple.record().0),
                None,
                |left: &Side, right: &Side| Tuple::concat(left, right),
            );
            (Outlet::new(), Outlet::new(), join)
        }

        #[test]
        fn joins_on_key_equality() {
            let (left, right, join) = create();
            let sink = CollectSink::new();
            link_left(&left, join.inlet());
            link_right(&right, join.inlet());
            link(join.outlet(), sink.inlet());

            for index in 0..10i64 {
                left.publish(Tuple::new((index, index)), false);
            }
            for index in 0..10i64 {
                right.publish(Tuple::new((index, index)), false);
            }

            let mut results: Vec<(i64, i64, i64, i64)> = sink
                .elements()
                .iter()
                .map(|element| *element.data.record())
                .collect();
            results.sort_unstable();
            assert_eq!(results.len(), 10);
            for (index, row) in results.iter().enumerate() {
                let expected = i64::try_from(index).unwrap();
                assert_eq!(row, &(expected, expected, expected, expected));
            }
        }

        #[test]
        fn result_is_interleaving_independent() {
            let (left, right, join) = create();
            let sink = CollectSink::new();
            link_left(&left, join.inlet());
            link_right(&right, join.inlet());
            link(join.outlet(), sink.inlet());

            // Alternate sides instead of draining one side first
            for index in 0..10i64 {
                if index % 2 == 0 {
                    left.publish(Tuple::new((index, index)), false);
                    right.publish(Tuple::new((index, index)), false);
                } else {
                    right.publish(Tuple::new((index, index)), false);
                    left.publish(Tuple::new((index, index)), false);
                }
            }
            assert_eq!(sink.elements().len(), 10);
        }

        #[test]
        fn residual_predicate_filters_matches() {
            let join = SHJoin::new(
                Arc::new(|tuple: &Side| tuple.record().0),
                Arc::new(|tuple: &Side| tuple.record().0),
                Some(Box::new(|left: &Side, right: &Side| {
                    left.record().1 < right.record().1
                })),
                |left: &Side, right: &Side| Tuple::concat(left, right),
            );
            let (left, right) = (Outlet::new(), Outlet::new());
            let sink = CollectSink::new();
            link_left(&left, join.inlet());
            link_right(&right, join.inlet());
            link(join.outlet(), sink.inlet());

            left.publish(Tuple::new((1i64, 5i64)), false);
            right.publish(Tuple::new((1i64, 3i64)), false);
            right.publish(Tuple::new((1i64, 8i64)), false);

            let results: Vec<(i64, i64, i64, i64)> = sink
                .elements()
                .iter()
                .map(|element| *element.data.record())
                .collect();
            assert_eq!(results, vec![(1, 5, 1, 8)]);
        }

        #[test]
        fn outdated_probes_then_removes_by_handle() {
            let (left, right, join) = create();
            let sink = CollectSink::new();
            link_left(&left, join.inlet());
            link_right(&right, join.inlet());
            link(join.outlet(), sink.inlet());

            let tuple = Tuple::new((1i64, 1i64));
            let twin = Tuple::new((1i64, 1i64));
            left.publish(tuple.clone(), false);
            left.publish(twin, false);
            right.publish(Tuple::new((1i64, 2i64)), false);
            assert_eq!(sink.elements().len(), 2);

            // Revoking one left tuple revokes its join results and removes
            // exactly that handle, leaving the equal-valued twin in place
            left.publish(tuple, true);
            let elements = sink.elements();
            assert_eq!(elements.len(), 3);
            assert!(elements[2].outdated);

            right.publish(Tuple::new((1i64, 3i64)), false);
            assert_eq!(sink.elements().len(), 4);
        }

        #[test]
        fn unseen_revocation_is_noop() {
            let (left, right, join) = create();
            let sink = CollectSink::new();
            link_left(&left, join.inlet());
            link_right(&right, join.inlet());
            link(join.outlet(), sink.inlet());

            left.publish(Tuple::new((1i64, 1i64)), true);
            assert!(sink.elements().is_empty());
        }
    }
}
