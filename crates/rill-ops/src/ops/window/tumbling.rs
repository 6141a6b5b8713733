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

//! Tumbling window operator.

use std::sync::{Arc, PoisonError, Weak};
use std::time::Duration;

use rill_element::{Element, Kind, Punctuation, StreamData};
use rill_executor::Periodic;
use rill_pubsub::{BaseOp, Discipline, Inlet, Outlet, Publish, Subscribe};

use super::{Core, WindowSpec};
use crate::ops::TimestampFn;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Tumbling window operator.
///
/// Forwards every arriving element immediately and, once per window
/// boundary, invalidates the entire buffer at once: a row window flushes
/// when the buffer reaches its size, a range window flushes all but the
/// newest element once the newest element's timestamp exceeds the oldest
/// by at least the window width. Each flush is followed by a window
/// expired punctuation. Incoming punctuations are consumed, since windows
/// produce their own.
pub struct TumblingWindow<D> {
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

impl<D> TumblingWindow<D>
where
    D: StreamData,
{
    /// Creates a tumbling row window of the given size.
    #[must_use]
    pub fn rows(size: usize) -> Arc<Self> {
        Self::create(WindowSpec::Rows(size), None, None)
    }

    /// Creates a tumbling range window of the given width in microseconds.
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
                Periodic::spawn("tumbling-window", interval, move || {
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

        // The arrival is forwarded before the boundary it may have closed
        self.outlet.publish_element(element);
        if self.evictor.is_none() {
            self.evict();
        }
    }

    /// Flushes the buffer if the window boundary was reached.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all)
    )]
    fn evict(&self) {
        let evicted: Vec<D> = {
            let mut buffer = self
                .core
                .buffer
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match self.core.spec {
                WindowSpec::Rows(size) => {
                    if buffer.len() >= size {
                        buffer.drain(..).collect()
                    } else {
                        Vec::new()
                    }
                }
                WindowSpec::Range(width) => {
                    let expired = match (buffer.front(), buffer.back()) {
                        (Some(oldest), Some(newest)) => {
                            let newest = self.core.timestamp(newest);
                            let oldest = self.core.timestamp(oldest);
                            newest.since(oldest) >= width
                        }
                        _ => false,
                    };
                    if expired {
                        // The newest element opens the next window
                        let len = buffer.len();
                        buffer.drain(..len - 1).collect()
                    } else {
                        Vec::new()
                    }
                }
            }
        };

        if !evicted.is_empty() {
            for data in evicted {
                self.outlet.publish(data, true);
            }
            self.outlet
                .publish_punctuation(Punctuation::new(Kind::WindowExpired));
        }
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<D> BaseOp for TumblingWindow<D>
where
    D: StreamData,
{
    fn name(&self) -> &str {
        "TumblingWindow"
    }
}

impl<D> Publish<D> for TumblingWindow<D>
where
    D: StreamData,
{
    #[inline]
    fn outlet(&self) -> &Outlet<D> {
        &self.outlet
    }
}

impl<D> Subscribe<D> for TumblingWindow<D>
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

    mod tumbling {
        use std::sync::Arc;

        use rill_element::{Kind, Timestamp, Tuple, TupleRef};
        use rill_pubsub::{link, Outlet, Publish, Subscribe};

        use crate::ops::sink::CollectSink;
        use crate::ops::window::tumbling::TumblingWindow;

        #[test]
        fn row_window_flushes_at_boundary() {
            let upstream = Outlet::new();
            let window = TumblingWindow::<TupleRef<(i64,)>>::rows(3);
            let sink = CollectSink::new();
            link(&upstream, window.inlet());
            link(window.outlet(), sink.inlet());

            for value in 0..7i64 {
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
                    (0, true),
                    (1, true),
                    (2, true),
                    (3, false),
                    (4, false),
                    (5, false),
                    (3, true),
                    (4, true),
                    (5, true),
                    (6, false),
                ]
            );
            assert_eq!(
                sink.kinds(),
                vec![Kind::WindowExpired, Kind::WindowExpired]
            );
        }

        #[test]
        fn range_window_retains_newest() {
            let upstream = Outlet::new();
            let window = TumblingWindow::<TupleRef<(u64,)>>::range(
                100,
                Arc::new(|tuple| Timestamp::from_micros(tuple.record().0)),
                None,
            );
            let sink = CollectSink::new();
            link(&upstream, window.inlet());
            link(window.outlet(), sink.inlet());

            for micros in [0u64, 40, 80, 120] {
                upstream.publish(Tuple::new((micros,)), false);
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
                    (40, false),
                    (80, false),
                    // 120 - 0 >= 100: everything older than 120 expires
                    (120, false),
                    (0, true),
                    (40, true),
                    (80, true),
                ]
            );
            assert_eq!(sink.kinds(), vec![Kind::WindowExpired]);
        }
    }
}
