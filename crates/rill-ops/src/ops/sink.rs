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

//! Collecting sink.

use std::sync::{Arc, Condvar, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};

use rill_element::{Element, Kind, PunctuationRef, StreamData};
use rill_pubsub::{BaseOp, Discipline, Inlet, Subscribe};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Received elements and punctuations.
struct State<D> {
    /// Elements in arrival order.
    elements: Vec<Element<D>>,
    /// Punctuations in arrival order.
    punctuations: Vec<PunctuationRef>,
}

/// Collecting sink.
///
/// Records every received element and punctuation in arrival order, the
/// stand-in for a real sink adapter in tests and examples. It never
/// re-publishes. Since collected streams often end behind queues or merges
/// running on other threads, the inlet is synchronized and arrival can be
/// awaited with a timeout.
pub struct CollectSink<D> {
    /// Received elements and punctuations.
    state: Mutex<State<D>>,
    /// Signal for new arrivals.
    arrived: Condvar,
    /// Input endpoints.
    inlet: Inlet<D>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<D> CollectSink<D>
where
    D: StreamData,
{
    /// Creates a collecting sink.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|op: &Weak<Self>| {
            let on_data = {
                let op = op.clone();
                move |element| {
                    if let Some(this) = op.upgrade() {
                        let mut state = this
                            .state
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner);
                        state.elements.push(element);
                        this.arrived.notify_all();
                    }
                }
            };
            let on_punctuation = {
                let op = op.clone();
                move |punctuation| {
                    if let Some(this) = op.upgrade() {
                        let mut state = this
                            .state
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner);
                        state.punctuations.push(punctuation);
                        this.arrived.notify_all();
                    }
                }
            };
            Self {
                state: Mutex::new(State {
                    elements: Vec::new(),
                    punctuations: Vec::new(),
                }),
                arrived: Condvar::new(),
                inlet: Inlet::new(
                    Discipline::Synchronized,
                    on_data,
                    on_punctuation,
                ),
            }
        })
    }

    /// Returns the received elements in arrival order.
    #[must_use]
    pub fn elements(&self) -> Vec<Element<D>> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.elements.clone()
    }

    /// Returns the data of all non-outdated received elements.
    #[must_use]
    pub fn values(&self) -> Vec<D> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .elements
            .iter()
            .filter(|element| !element.outdated)
            .map(|element| element.data.clone())
            .collect()
    }

    /// Returns the number of received outdated elements.
    #[must_use]
    pub fn outdated_count(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .elements
            .iter()
            .filter(|element| element.outdated)
            .count()
    }

    /// Returns the kinds of all received punctuations in arrival order.
    #[must_use]
    pub fn kinds(&self) -> Vec<Kind> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .punctuations
            .iter()
            .map(|punctuation| punctuation.kind())
            .collect()
    }

    /// Waits until a punctuation of the given kind has been received.
    ///
    /// Returns false if the timeout elapses first.
    #[must_use]
    pub fn wait_for_kind(&self, kind: Kind, timeout: Duration) -> bool {
        self.wait_until(timeout, |state| {
            state
                .punctuations
                .iter()
                .any(|punctuation| punctuation.kind() == kind)
        })
    }

    /// Waits until at least the given number of elements has been received.
    ///
    /// Returns false if the timeout elapses first.
    #[must_use]
    pub fn wait_for_count(&self, count: usize, timeout: Duration) -> bool {
        self.wait_until(timeout, |state| state.elements.len() >= count)
    }

    /// Waits until the condition holds or the timeout elapses.
    fn wait_until<F>(&self, timeout: Duration, condition: F) -> bool
    where
        F: Fn(&State<D>) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut state =
            self.state.lock().unwrap_or_else(PoisonError::into_inner);
        while !condition(&state) {
            let Some(remaining) = deadline.checked_duration_since(Instant::now())
            else {
                return false;
            };
            let (next, result) = self
                .arrived
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            state = next;
            if result.timed_out() && !condition(&state) {
                return false;
            }
        }
        true
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<D> BaseOp for CollectSink<D>
where
    D: StreamData,
{
    fn name(&self) -> &str {
        "CollectSink"
    }
}

impl<D> Subscribe<D> for CollectSink<D>
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

    mod sink {
        use std::time::Duration;

        use rill_element::{Kind, Punctuation, Tuple, TupleRef};
        use rill_pubsub::{link, Outlet, Subscribe};

        use crate::ops::sink::CollectSink;

        #[test]
        fn records_arrival_order() {
            let upstream = Outlet::new();
            let sink = CollectSink::<TupleRef<(i64,)>>::new();
            link(&upstream, sink.inlet());

            upstream.publish(Tuple::new((1i64,)), false);
            upstream.publish(Tuple::new((2i64,)), true);
            upstream.publish_punctuation(Punctuation::new(Kind::EndOfStream));

            assert_eq!(sink.elements().len(), 2);
            assert_eq!(sink.values().len(), 1);
            assert_eq!(sink.outdated_count(), 1);
            assert!(sink.wait_for_kind(Kind::EndOfStream, Duration::ZERO));
            assert!(!sink.wait_for_kind(Kind::WindowExpired, Duration::ZERO));
        }
    }
}
