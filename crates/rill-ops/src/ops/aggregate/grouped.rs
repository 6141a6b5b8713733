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

//! Grouped aggregation operator.

use ahash::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use rill_element::{
    Element, Key, Kind, Punctuation, PunctuationRef, StreamData, Timestamp,
};
use rill_executor::Periodic;
use rill_pubsub::{BaseOp, Discipline, Inlet, Outlet, Publish, Subscribe};

use super::trigger::Trigger;
use super::AggregateState;
use crate::ops::{KeyFn, TimestampFn};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Aggregate state of one group.
struct Group<S> {
    /// Aggregate state.
    state: S,
    /// Non-outdated arrivals minus outdated ones.
    occupancy: i64,
}

/// Group table and trigger bookkeeping.
struct Inner<K, S> {
    /// Aggregate states by key.
    groups: HashMap<K, Group<S>>,
    /// Elements since the last count-triggered emission.
    counter: u64,
    /// Timestamp of the last timestamp-triggered emission.
    last_trigger: Timestamp,
}

/// Grouped aggregation operator.
///
/// Computes incremental aggregates per key: a non-outdated arrival for an
/// unseen key creates a fresh state, an outdated arrival subtracts and,
/// once the group's occupancy counter reaches zero, removes the group. An
/// outdated arrival for an unseen key is ignored, since upstream should
/// not revoke a tuple that was never seen.
///
/// All table access happens under one mutex, which is never released
/// between reading and writing a single group's state within one arrival;
/// result elements are published after the mutex is released.
pub struct GroupedAggregation<D, K, S>
where
    D: StreamData,
    K: Key,
    S: AggregateState<D>,
{
    /// Key extractor.
    key: KeyFn<D, K>,
    /// Trigger mode.
    trigger: Trigger,
    /// Timestamp extractor, present for timestamp triggers.
    extractor: Option<TimestampFn<D>>,
    /// Group table and trigger bookkeeping.
    inner: Mutex<Inner<K, S>>,
    /// Wall-clock notifier, present for time triggers.
    notifier: Option<Periodic>,
    /// Input endpoints.
    inlet: Inlet<D>,
    /// Output endpoints.
    outlet: Outlet<S::Output>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<D, K, S> GroupedAggregation<D, K, S>
where
    D: StreamData,
    K: Key,
    S: AggregateState<D>,
{
    /// Creates a grouped aggregation with the given key extractor.
    ///
    /// # Panics
    ///
    /// Panics for a timestamp trigger, which needs an extractor; use
    /// [`GroupedAggregation::by_timestamp`] instead.
    #[must_use]
    pub fn new(key: KeyFn<D, K>, trigger: Trigger) -> Arc<Self> {
        assert!(
            !matches!(trigger, Trigger::ByTimestamp(_)),
            "timestamp trigger requires an extractor"
        );
        Self::create(key, trigger, None)
    }

    /// Creates a grouped aggregation triggered by the extracted event time.
    #[must_use]
    pub fn by_timestamp(
        key: KeyFn<D, K>,
        interval: u64,
        extractor: TimestampFn<D>,
    ) -> Arc<Self> {
        Self::create(key, Trigger::ByTimestamp(interval), Some(extractor))
    }

    /// Creates the operator.
    fn create(
        key: KeyFn<D, K>,
        trigger: Trigger,
        extractor: Option<TimestampFn<D>>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|op: &Weak<Self>| {
            let notifier = match trigger {
                Trigger::ByTime(interval) => {
                    let op = op.clone();
                    Some(Periodic::spawn("grouped", interval, move || {
                        if let Some(this) = op.upgrade() {
                            this.slide();
                        }
                    }))
                }
                _ => None,
            };

            let on_data = {
                let op = op.clone();
                move |element| {
                    if let Some(this) = op.upgrade() {
                        this.process(element);
                    }
                }
            };
            let on_punctuation = {
                let op = op.clone();
                move |punctuation| {
                    if let Some(this) = op.upgrade() {
                        this.punctuate(punctuation);
                    }
                }
            };
            Self {
                key,
                trigger,
                extractor,
                inner: Mutex::new(Inner {
                    groups: HashMap::default(),
                    counter: 0,
                    last_trigger: Timestamp::ZERO,
                }),
                notifier,
                inlet: Inlet::new(
                    Discipline::Unsynchronized,
                    on_data,
                    on_punctuation,
                ),
                outlet: Outlet::new(),
            }
        })
    }

    /// Handles an arriving element.
    fn process(&self, element: Element<D>) {
        let mut emissions: Vec<(S::Output, bool)> = Vec::new();
        let mut slide = false;
        {
            let mut inner =
                self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            let key = (self.key)(&element.data);

            match inner.groups.entry(key) {
                Entry::Vacant(entry) => {
                    if !element.outdated {
                        let mut state = S::default();
                        state.iterate(&element.data, false);
                        let group =
                            entry.insert(Group { state, occupancy: 1 });
                        if self.trigger == Trigger::All {
                            emissions.push((group.state.finalize(), false));
                        }
                    }
                }
                Entry::Occupied(mut entry) => {
                    let group = entry.get_mut();
                    group.occupancy += if element.outdated { -1 } else { 1 };
                    group.state.iterate(&element.data, element.outdated);
                    if self.trigger == Trigger::All {
                        emissions
                            .push((group.state.finalize(), element.outdated));
                    }
                    if group.occupancy <= 0 {
                        entry.remove();
                    }
                }
            }

            match self.trigger {
                Trigger::ByCount(count) => {
                    inner.counter += 1;
                    if inner.counter >= count {
                        inner.counter = 0;
                        Self::collect(&inner, &mut emissions);
                        slide = true;
                    }
                }
                Trigger::ByTimestamp(interval) => {
                    let extractor =
                        self.extractor.as_ref().expect("invariant");
                    let timestamp = extractor(&element.data);
                    if timestamp.since(inner.last_trigger) >= interval {
                        inner.last_trigger = timestamp;
                        Self::collect(&inner, &mut emissions);
                        slide = true;
                    }
                }
                Trigger::All | Trigger::ByTime(_) => {}
            }
        }

        for (data, outdated) in emissions {
            self.outlet.publish(data, outdated);
        }
        if slide {
            self.outlet
                .publish_punctuation(Punctuation::new(Kind::SlideExpired));
        }
    }

    /// Handles an arriving punctuation.
    fn punctuate(&self, punctuation: PunctuationRef) {
        if matches!(
            punctuation.kind(),
            Kind::EndOfStream | Kind::WindowExpired | Kind::SlideExpired
        ) {
            self.flush();
        }
        self.outlet.publish_punctuation(punctuation);
    }

    /// Publishes every group's aggregate.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all)
    )]
    fn flush(&self) {
        let mut emissions = Vec::new();
        {
            let inner =
                self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            Self::collect(&inner, &mut emissions);
        }
        for (data, outdated) in emissions {
            self.outlet.publish(data, outdated);
        }
    }

    /// Publishes every group's aggregate and a slide expired punctuation.
    fn slide(&self) {
        self.flush();
        self.outlet
            .publish_punctuation(Punctuation::new(Kind::SlideExpired));
    }

    /// Collects every group's finalized aggregate, in unspecified order.
    fn collect(inner: &Inner<K, S>, emissions: &mut Vec<(S::Output, bool)>) {
        emissions.extend(
            inner
                .groups
                .values()
                .map(|group| (group.state.finalize(), false)),
        );
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<D, K, S> BaseOp for GroupedAggregation<D, K, S>
where
    D: StreamData,
    K: Key,
    S: AggregateState<D>,
{
    fn name(&self) -> &str {
        "GroupedAggregation"
    }
}

impl<D, K, S> Publish<S::Output> for GroupedAggregation<D, K, S>
where
    D: StreamData,
    K: Key,
    S: AggregateState<D>,
{
    #[inline]
    fn outlet(&self) -> &Outlet<S::Output> {
        &self.outlet
    }
}

impl<D, K, S> Subscribe<D> for GroupedAggregation<D, K, S>
where
    D: StreamData,
    K: Key,
    S: AggregateState<D>,
{
    #[inline]
    fn inlet(&self) -> &Inlet<D> {
        &self.inlet
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    mod grouped {
        use std::sync::Arc;

        use rill_element::{Kind, Punctuation, Tuple, TupleRef};
        use rill_pubsub::{link, Outlet, Publish, Subscribe};

        use crate::ops::aggregate::functions::{
            Aggregate, Count, Identity, Sum,
        };
        use crate::ops::aggregate::grouped::GroupedAggregation;
        use crate::ops::aggregate::trigger::Trigger;
        use crate::ops::aggregate::AggregateState;
        use crate::ops::sink::CollectSink;

        /// Key, count and sum over (string key, integer value) tuples.
        #[derive(Default)]
        struct PerKey {
            key: Identity<String>,
            count: Count<i64>,
            sum: Sum<i64>,
        }

        impl AggregateState<TupleRef<(String, i64)>> for PerKey {
            type Output = TupleRef<(String, i64, i64)>;

            fn iterate(&mut self, data: &TupleRef<(String, i64)>, outdated: bool) {
                self.key.iterate(&data.record().0, outdated);
                self.count.iterate(&data.record().1, outdated);
                self.sum.iterate(&data.record().1, outdated);
            }

            fn finalize(&self) -> Self::Output {
                Tuple::new((
                    self.key.value(),
                    self.count.value(),
                    self.sum.value(),
                ))
            }
        }

        #[test]
        fn counts_per_key_at_end_of_stream() {
            let upstream = Outlet::new();
            let grouped = GroupedAggregation::<_, String, PerKey>::new(
                Arc::new(|tuple: &TupleRef<(String, i64)>| {
                    tuple.record().0.clone()
                }),
                Trigger::ByCount(1_000),
            );
            let sink = CollectSink::new();
            link(&upstream, grouped.inlet());
            link(grouped.outlet(), sink.inlet());

            for index in 0..50i64 {
                let key = format!("KEY#{}", index % 5);
                upstream.publish(Tuple::new((key, index)), false);
            }
            upstream.publish_punctuation(Punctuation::new(Kind::EndOfStream));

            let mut results: Vec<(String, i64, i64)> = sink
                .elements()
                .iter()
                .map(|element| element.data.record().clone())
                .collect();
            results.sort();
            assert_eq!(results.len(), 5);
            for (index, (key, count, _)) in results.iter().enumerate() {
                assert_eq!(key, &format!("KEY#{index}"));
                assert_eq!(*count, 10);
            }
            assert_eq!(sink.kinds(), vec![Kind::EndOfStream]);
        }

        #[test]
        fn trigger_all_emits_on_every_arrival() {
            let upstream = Outlet::new();
            let grouped = GroupedAggregation::<_, String, PerKey>::new(
                Arc::new(|tuple: &TupleRef<(String, i64)>| {
                    tuple.record().0.clone()
                }),
                Trigger::All,
            );
            let sink = CollectSink::new();
            link(&upstream, grouped.inlet());
            link(grouped.outlet(), sink.inlet());

            upstream.publish(Tuple::new(("a".to_string(), 1i64)), false);
            upstream.publish(Tuple::new(("a".to_string(), 2i64)), false);
            upstream.publish(Tuple::new(("b".to_string(), 5i64)), false);

            let results: Vec<(String, i64, i64)> = sink
                .elements()
                .iter()
                .map(|element| element.data.record().clone())
                .collect();
            assert_eq!(
                results,
                vec![
                    ("a".to_string(), 1, 1),
                    ("a".to_string(), 2, 3),
                    ("b".to_string(), 1, 5),
                ]
            );
        }

        #[test]
        fn occupancy_removes_empty_groups() {
            let upstream = Outlet::new();
            let grouped = GroupedAggregation::<_, String, PerKey>::new(
                Arc::new(|tuple: &TupleRef<(String, i64)>| {
                    tuple.record().0.clone()
                }),
                Trigger::All,
            );
            let sink = CollectSink::new();
            link(&upstream, grouped.inlet());
            link(grouped.outlet(), sink.inlet());

            let tuple = Tuple::new(("a".to_string(), 1i64));
            upstream.publish(tuple.clone(), false);
            upstream.publish(tuple, true);

            // The group is gone, so end-of-stream flushes nothing
            upstream.publish_punctuation(Punctuation::new(Kind::EndOfStream));
            assert_eq!(sink.elements().len(), 2);
            assert!(sink.elements()[1].outdated);
        }

        #[test]
        fn ignores_unseen_revocations() {
            let upstream = Outlet::new();
            let grouped = GroupedAggregation::<_, String, PerKey>::new(
                Arc::new(|tuple: &TupleRef<(String, i64)>| {
                    tuple.record().0.clone()
                }),
                Trigger::All,
            );
            let sink = CollectSink::new();
            link(&upstream, grouped.inlet());
            link(grouped.outlet(), sink.inlet());

            upstream.publish(Tuple::new(("ghost".to_string(), 1i64)), true);
            assert!(sink.elements().is_empty());
        }
    }
}
