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

//! Aggregation operator.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use rill_element::{
    Element, Kind, Punctuation, PunctuationRef, StreamData, Timestamp,
};
use rill_executor::Periodic;
use rill_pubsub::{BaseOp, Discipline, Inlet, Outlet, Publish, Subscribe};

use super::trigger::Trigger;
use super::AggregateState;
use crate::ops::TimestampFn;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Trigger bookkeeping alongside the aggregate state.
struct Inner<S> {
    /// Aggregate state.
    state: S,
    /// Elements since the last count-triggered emission.
    counter: u64,
    /// Timestamp of the last timestamp-triggered emission.
    last_trigger: Timestamp,
}

/// Aggregation operator.
///
/// Computes incremental aggregates over the whole stream: every input
/// element updates the single aggregate state under the operator's mutex,
/// and depending on the trigger mode a result element is published. The
/// mutex is released before publishing, so a wall-clock notifier thread
/// can never re-enter a downstream operator the arrival path is still in.
///
/// Emissions triggered per element carry the arriving element's outdated
/// flag; count-, time- and timestamp-triggered emissions are non-outdated
/// and are followed by a slide expired punctuation.
pub struct Aggregation<D, S>
where
    D: StreamData,
    S: AggregateState<D>,
{
    /// Trigger mode.
    trigger: Trigger,
    /// Timestamp extractor, present for timestamp triggers.
    extractor: Option<TimestampFn<D>>,
    /// Aggregate state and trigger bookkeeping.
    inner: Mutex<Inner<S>>,
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

impl<D, S> Aggregation<D, S>
where
    D: StreamData,
    S: AggregateState<D>,
{
    /// Creates an aggregation with the given trigger mode.
    ///
    /// # Panics
    ///
    /// Panics for a timestamp trigger, which needs an extractor; use
    /// [`Aggregation::by_timestamp`] instead. This is a configuration
    /// error and therefore fatal at build time.
    #[must_use]
    pub fn new(trigger: Trigger) -> Arc<Self> {
        assert!(
            !matches!(trigger, Trigger::ByTimestamp(_)),
            "timestamp trigger requires an extractor"
        );
        Self::create(trigger, None)
    }

    /// Creates an aggregation triggered by the extracted event time.
    #[must_use]
    pub fn by_timestamp(interval: u64, extractor: TimestampFn<D>) -> Arc<Self> {
        Self::create(Trigger::ByTimestamp(interval), Some(extractor))
    }

    /// Creates the operator.
    fn create(trigger: Trigger, extractor: Option<TimestampFn<D>>) -> Arc<Self> {
        Arc::new_cyclic(|op: &Weak<Self>| {
            let notifier = match trigger {
                Trigger::ByTime(interval) => {
                    let op = op.clone();
                    Some(Periodic::spawn("aggregation", interval, move || {
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
                trigger,
                extractor,
                inner: Mutex::new(Inner {
                    state: S::default(),
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
        let mut emit = None;
        let mut slide = false;
        {
            let mut inner =
                self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.state.iterate(&element.data, element.outdated);

            match self.trigger {
                Trigger::All => {
                    emit = Some((inner.state.finalize(), element.outdated));
                }
                Trigger::ByCount(count) => {
                    inner.counter += 1;
                    if inner.counter >= count {
                        inner.counter = 0;
                        emit = Some((inner.state.finalize(), false));
                        slide = true;
                    }
                }
                Trigger::ByTimestamp(interval) => {
                    // The extractor is present by construction
                    let extractor =
                        self.extractor.as_ref().expect("invariant");
                    let timestamp = extractor(&element.data);
                    if timestamp.since(inner.last_trigger) >= interval {
                        inner.last_trigger = timestamp;
                        emit = Some((inner.state.finalize(), false));
                        slide = true;
                    }
                }
                Trigger::ByTime(_) => {}
            }
        }

        if let Some((data, outdated)) = emit {
            self.outlet.publish(data, outdated);
        }
        if slide {
            self.outlet
                .publish_punctuation(Punctuation::new(Kind::SlideExpired));
        }
    }

    /// Handles an arriving punctuation.
    ///
    /// A window expired, slide expired or end-of-stream punctuation forces
    /// emission before the punctuation is forwarded.
    fn punctuate(&self, punctuation: PunctuationRef) {
        if matches!(
            punctuation.kind(),
            Kind::EndOfStream | Kind::WindowExpired | Kind::SlideExpired
        ) {
            self.flush();
        }
        self.outlet.publish_punctuation(punctuation);
    }

    /// Publishes the current aggregate.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all)
    )]
    fn flush(&self) {
        let data = {
            let inner =
                self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.state.finalize()
        };
        self.outlet.publish(data, false);
    }

    /// Publishes the current aggregate and a slide expired punctuation.
    fn slide(&self) {
        self.flush();
        self.outlet
            .publish_punctuation(Punctuation::new(Kind::SlideExpired));
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<D, S> BaseOp for Aggregation<D, S>
where
    D: StreamData,
    S: AggregateState<D>,
{
    fn name(&self) -> &str {
        "Aggregation"
    }
}

impl<D, S> Publish<S::Output> for Aggregation<D, S>
where
    D: StreamData,
    S: AggregateState<D>,
{
    #[inline]
    fn outlet(&self) -> &Outlet<S::Output> {
        &self.outlet
    }
}

impl<D, S> Subscribe<D> for Aggregation<D, S>
where
    D: StreamData,
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

    mod aggregation {
        use std::sync::Arc;
        use std::time::Duration;

        use rill_element::{Kind, Punctuation, Timestamp, Tuple, TupleRef};
        use rill_pubsub::{link, Outlet, Publish, Subscribe};

        use crate::ops::aggregate::functions::{Aggregate, Avg, Count, Sum};
        use crate::ops::aggregate::trigger::Trigger;
        use crate::ops::aggregate::AggregateState;
        use crate::ops::aggregate::aggregation::Aggregation;
        use crate::ops::sink::CollectSink;

        /// Sum, average and count over field 0.
        #[derive(Default)]
        struct Stats {
            sum: Sum<f64>,
            avg: Avg<f64>,
            count: Count<f64>,
        }

        impl AggregateState<TupleRef<(f64,)>> for Stats {
            type Output = TupleRef<(f64, f64, i64)>;

            fn iterate(&mut self, data: &TupleRef<(f64,)>, outdated: bool) {
                let value = data.record().0;
                self.sum.iterate(&value, outdated);
                self.avg.iterate(&value, outdated);
                self.count.iterate(&value, outdated);
            }

            fn finalize(&self) -> Self::Output {
                Tuple::new((
                    self.sum.value(),
                    self.avg.value(),
                    self.count.value(),
                ))
            }
        }

        #[test]
        fn trigger_all_emits_per_element() {
            let upstream = Outlet::new();
            let aggregation = Aggregation::<_, Stats>::new(Trigger::All);
            let sink = CollectSink::new();
            link(&upstream, aggregation.inlet());
            link(aggregation.outlet(), sink.inlet());

            for value in [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0] {
                upstream.publish(Tuple::new((value,)), false);
            }

            let results: Vec<(f64, f64, i64)> = sink
                .elements()
                .iter()
                .map(|element| *element.data.record())
                .collect();
            assert_eq!(
                results,
                vec![
                    (1.0, 1.0, 1),
                    (3.0, 1.5, 2),
                    (6.0, 2.0, 3),
                    (10.0, 2.5, 4),
                    (15.0, 3.0, 5),
                    (21.0, 3.5, 6),
                ]
            );
        }

        #[test]
        fn trigger_by_count_emits_every_n() {
            let upstream = Outlet::new();
            let aggregation = Aggregation::<_, Stats>::new(Trigger::ByCount(3));
            let sink = CollectSink::new();
            link(&upstream, aggregation.inlet());
            link(aggregation.outlet(), sink.inlet());

            for value in [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0] {
                upstream.publish(Tuple::new((value,)), false);
            }

            let results: Vec<(f64, f64, i64)> = sink
                .elements()
                .iter()
                .map(|element| *element.data.record())
                .collect();
            assert_eq!(results, vec![(6.0, 2.0, 3), (21.0, 3.5, 6)]);
            assert_eq!(
                sink.kinds(),
                vec![Kind::SlideExpired, Kind::SlideExpired]
            );
        }

        #[test]
        fn trigger_by_timestamp_follows_event_time() {
            let upstream = Outlet::new();
            let aggregation = Aggregation::<_, Stats>::by_timestamp(
                100,
                Arc::new(|_| Timestamp::from_micros(0)),
            );
            // A constant event time never advances past the interval
            let sink = CollectSink::new();
            link(&upstream, aggregation.inlet());
            link(aggregation.outlet(), sink.inlet());

            for value in [1.0f64, 2.0] {
                upstream.publish(Tuple::new((value,)), false);
            }
            assert!(sink.elements().is_empty());
        }

        #[test]
        fn forcing_punctuation_flushes_and_forwards() {
            let upstream = Outlet::new();
            let aggregation = Aggregation::<_, Stats>::new(Trigger::ByCount(100));
            let sink = CollectSink::new();
            link(&upstream, aggregation.inlet());
            link(aggregation.outlet(), sink.inlet());

            upstream.publish(Tuple::new((2.0f64,)), false);
            upstream.publish_punctuation(Punctuation::new(Kind::EndOfStream));

            let results = sink.elements();
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].data.record(), &(2.0, 2.0, 1));
            assert_eq!(sink.kinds(), vec![Kind::EndOfStream]);
        }

        #[test]
        fn trigger_by_time_uses_notifier_thread() {
            let upstream = Outlet::new();
            let aggregation = Aggregation::<_, Stats>::new(Trigger::ByTime(
                Duration::from_millis(10),
            ));
            let sink = CollectSink::new();
            link(&upstream, aggregation.inlet());
            link(aggregation.outlet(), sink.inlet());

            upstream.publish(Tuple::new((3.0f64,)), false);
            assert!(sink.wait_for_kind(
                Kind::SlideExpired,
                Duration::from_secs(5)
            ));
            assert!(!sink.elements().is_empty());
        }
    }
}
