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

//! Sliding window operator.

use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, Weak};
use std::time::Duration;

use rill_element::{Element, StreamData};
use rill_executor::Periodic;
use rill_pubsub::{BaseOp, Discipline, Inlet, Outlet, Publish, Subscribe};

use super::{Core, WindowSpec};
use crate::ops::TimestampFn;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Sliding window operator.
///
/// Forwards every arriving element immediately and invalidates buffered
/// elements one by one as they leave the window: a row window evicts the
/// oldest elements while the buffer exceeds its size, a range window
/// evicts elements older than the most recent element's timestamp minus
/// the window width. Every eviction produces exactly one outdated
/// emission, published before the arrival that caused it is forwarded.
///
/// Without an eviction interval, eviction runs only as a side effect of
/// arrivals; with one, a dedicated notifier thread invokes it periodically.
/// Incoming punctuations are consumed, since windows produce their own.
pub struct SlidingWindow<D> {
    /// Shared window internals.
    core: Core<D>,
    /// Periodic evictor, present with an eviction interval.
    evictor: Option<Periodic>,
    /// Input endpoints.
    inlet: Inlet<D>,
    /// Output endpoints.
    outlet: Outlet<D>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<D> SlidingWindow<D>
where
    D: StreamData,
{
    /// Creates a sliding row window of the given size.
    #[must_use]
    pub fn rows(size: usize, evict_every: Option<Duration>) -> Arc<Self> {
        Self::create(WindowSpec::Rows(size), None, evict_every)
    }

    /// Creates a sliding range window of the given width in microseconds.
    #[must_use]
    pub fn range(
        width: u64,
        extractor: TimestampFn<D>,
        evict_every: Option<Duration>,
    ) -> Arc<Self> {
        Self::create(WindowSpec::Range(width), Some(extractor), evict_every)
    }

    /// Creates the operator.
    fn create(
        spec: WindowSpec,
        extractor: Option<TimestampFn<D>>,
        evict_every: Option<Duration>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|op: &Weak<Self>| {
            let evictor = evict_every.map(|interval| {
                let op = op.clone();
                Periodic::spawn("sliding-window", interval, move || {
                    if let Some(this) = op.upgrade() {
                        this.evict();
                    }
                })
            });

            let on_data = {
                let op = op.clone();
                move |element| {
                    if let Some(this) = op.upgrade() {
                        this.process(element);
                    }
                }
            };
            Self {
                core: Core::new(spec, extractor),
                evictor,
                inlet: Inlet::new(Discipline::Unsynchronized, on_data, |_| {}),
                outlet: Outlet::new(),
            }
        })
    }

    /// Handles an arriving element.
    ///
    /// An outdated arrival is re-emitted unchanged; upstream has already
    /// revoked it, so the buffer is not touched.
    fn process(&self, element: Element<D>) {
        if element.outdated {
            self.outlet.publish_element(element);
            return;
        }

        {
            let mut buffer = self
                .core
                .buffer
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            buffer.push_back(element.data.clone());
        }

        // Outdated emissions precede the arrival that displaced them
        if self.evictor.is_none() {
            self.evict();
        }
        self.outlet.publish_element(element);
    }

    /// Evicts elements that left the window and emits them outdated.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all)
    )]
    fn evict(&self) {
        let evicted = {
            let mut buffer = self
                .core
                .buffer
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match self.core.spec {
                WindowSpec::Rows(size) => Self::evict_rows(&mut buffer, size),
                WindowSpec::Range(width) => self.evict_range(&mut buffer, width),
            }
        };
        for data in evicted {
            self.outlet.publish(data, true);
        }
    }

    /// Pops the oldest elements while the buffer exceeds the size.
    fn evict_rows(buffer: &mut VecDeque<D>, size: usize) -> Vec<D> {
        let mut evicted = Vec::new();
        while buffer.len() > size {
            evicted.push(buffer.pop_front().expect("invariant"));
        }
        evicted
    }

    /// Pops elements older than the newest element minus the width.
    fn evict_range(&self, buffer: &mut VecDeque<D>, width: u64) -> Vec<D> {
        let mut evicted = Vec::new();
        let Some(back) = buffer.back() else {
            return evicted;
        };
        let newest = self.core.timestamp(back);

        // Timestamps may be artificial and start near zero, in which case
        // the window has not spanned its full width yet
        let Some(accepted) = newest.micros().checked_sub(width) else {
            return evicted;
        };
        loop {
            let expired = buffer
                .front()
                .is_some_and(|head| self.core.timestamp(head).micros() < accepted);
            if !expired {
                break;
            }
            evicted.push(buffer.pop_front().expect("invariant"));
        }
        evicted
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<D> BaseOp for SlidingWindow<D>
where
    D: StreamData,
{
    fn name(&self) -> &str {
        "SlidingWindow"
    }
}

impl<D> Publish<D> for SlidingWindow<D>
where
    D: StreamData,
{
    #[inline]
    fn outlet(&self) -> &Outlet<D> {
        &self.outlet
    }
}

impl<D> Subscribe<D> for SlidingWindow<D>
where
    D: StreamData,
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

    mod sliding {
        use std::sync::Arc;
        use std::time::Duration;

        use rill_element::{Timestamp, Tuple, TupleRef};
        use rill_pubsub::{link, Outlet, Publish, Subscribe};

        use crate::ops::sink::CollectSink;
        use crate::ops::window::sliding::SlidingWindow;

        #[test]
        fn row_window_revokes_in_arrival_order() {
            let upstream = Outlet::new();
            let window = SlidingWindow::<TupleRef<(i64,)>>::rows(3, None);
            let sink = CollectSink::new();
            link(&upstream, window.inlet());
            link(window.outlet(), sink.inlet());

            for value in 0..5i64 {
                upstream.publish(Tuple::new((value,)), false);
            }

            let trace: Vec<(i64, bool)> = sink
                .elements()
                .iter()
                .map(|element| (element.data.record().0, element.outdated))
                .collect();
            assert_eq!(
                trace,
                vec![
                    (0, false),
                    (1, false),
                    (2, false),
                    // The fourth arrival displaces the first, the revocation
                    // preceding the arrival itself
                    (0, true),
                    (3, false),
                    (1, true),
                    (4, false),
                ]
            );
        }

        #[test]
        fn row_window_forwards_outdated_untouched() {
            let upstream = Outlet::new();
            let window = SlidingWindow::<TupleRef<(i64,)>>::rows(10, None);
            let sink = CollectSink::new();
            link(&upstream, window.inlet());
            link(window.outlet(), sink.inlet());

            let tuple = Tuple::new((7i64,));
            upstream.publish(tuple.clone(), false);
            upstream.publish(tuple, true);

            assert_eq!(sink.elements().len(), 2);
            assert_eq!(sink.outdated_count(), 1);
        }

        #[test]
        fn range_window_evicts_by_timestamp() {
            let upstream = Outlet::new();
            let window = SlidingWindow::<TupleRef<(u64, i64)>>::range(
                100,
                Arc::new(|tuple| Timestamp::from_micros(tuple.record().0)),
                None,
            );
            let sink = CollectSink::new();
            link(&upstream, window.inlet());
            link(window.outlet(), sink.inlet());

            for micros in [0u64, 50, 100, 149, 251] {
                #[allow(clippy::cast_possible_wrap)]
                upstream.publish(Tuple::new((micros, micros as i64)), false);
            }

            let trace: Vec<(u64, bool)> = sink
                .elements()
                .iter()
                .map(|element| (element.data.record().0, element.outdated))
                .collect();
            assert_eq!(
                trace,
                vec![
                    (0, false),
                    (50, false),
                    (100, false),
                    // 149 - 100 = 49: nothing is older than that yet
                    (149, false),
                    // 251 - 100 = 151: 0, 50 and 100 fall out, 149 stays
                    (0, true),
                    (50, true),
                    (100, true),
                    (251, false),
                ]
            );
        }

        #[test]
        fn periodic_eviction_runs_without_arrivals() {
            let upstream = Outlet::new();
            let window = SlidingWindow::<TupleRef<(u64,)>>::range(
                10,
                Arc::new(|tuple| Timestamp::from_micros(tuple.record().0)),
                Some(Duration::from_millis(5)),
            );
            let sink = CollectSink::new();
            link(&upstream, window.inlet());
            link(window.outlet(), sink.inlet());

            upstream.publish(Tuple::new((0u64,)), false);
            upstream.publish(Tuple::new((100u64,)), false);

            // The evictor thread revokes the first element eventually
            assert!(sink.wait_for_count(3, Duration::from_secs(5)));
            assert_eq!(sink.outdated_count(), 1);
        }
    }
}
