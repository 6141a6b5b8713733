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

//! Barrier operator.

use std::sync::{Arc, Condvar, Mutex, PoisonError, Weak};

use rill_element::{Element, StreamData};
use rill_pubsub::{BaseOp, Discipline, Inlet, Outlet, Publish, Subscribe};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Barrier gate.
///
/// The condition variable shared between a barrier operator and the
/// external party that owns the gating state. After changing the state the
/// external party calls [`Gate::notify`], which makes every blocked
/// barrier re-evaluate its predicate.
pub struct Gate {
    /// Lock the predicate is evaluated under.
    lock: Mutex<()>,
    /// Signal for re-evaluation.
    signal: Condvar,
}

/// Barrier predicate.
pub type BarrierFn<D> = Box<dyn Fn(&D) -> bool + Send + Sync>;

/// Barrier operator.
///
/// Gates the forwarding of elements by a predicate that may return false
/// indefinitely. Each arrival blocks the publishing thread on the shared
/// [`Gate`] until the predicate is satisfied, which synchronizes stream
/// progress with an out-of-band event.
pub struct Barrier<D> {
    /// Shared gate.
    gate: Arc<Gate>,
    /// Gating predicate.
    predicate: BarrierFn<D>,
    /// Input endpoints.
    inlet: Inlet<D>,
    /// Output endpoints.
    outlet: Outlet<D>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Gate {
    /// Creates a shared gate.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            lock: Mutex::new(()),
            signal: Condvar::new(),
        })
    }

    /// Wakes all barriers blocked on the gate.
    pub fn notify(&self) {
        let _held = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.signal.notify_all();
    }
}

// ----------------------------------------------------------------------------

impl<D> Barrier<D>
where
    D: StreamData,
{
    /// Creates a barrier with the given gate and predicate.
    pub fn new<P>(gate: Arc<Gate>, predicate: P) -> Arc<Self>
    where
        P: Fn(&D) -> bool + Send + Sync + 'static,
    {
        Arc::new_cyclic(|op: &Weak<Self>| {
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
                        this.outlet.publish_punctuation(punctuation);
                    }
                }
            };
            Self {
                gate,
                predicate: Box::new(predicate),
                inlet: Inlet::new(
                    Discipline::Unsynchronized,
                    on_data,
                    on_punctuation,
                ),
                outlet: Outlet::new(),
            }
        })
    }

    /// Handles an arriving element, blocking until the predicate holds.
    fn process(&self, element: Element<D>) {
        {
            let mut held = self
                .gate
                .lock
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            while !(self.predicate)(&element.data) {
                held = self
                    .gate
                    .signal
                    .wait(held)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }
        self.outlet.publish_element(element);
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<D> BaseOp for Barrier<D>
where
    D: StreamData,
{
    fn name(&self) -> &str {
        "Barrier"
    }
}

impl<D> Publish<D> for Barrier<D>
where
    D: StreamData,
{
    #[inline]
    fn outlet(&self) -> &Outlet<D> {
        &self.outlet
    }
}

impl<D> Subscribe<D> for Barrier<D>
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

    mod barrier {
        use std::sync::atomic::{AtomicI64, Ordering};
        use std::sync::Arc;
        use std::thread;
        use std::time::Duration;

        use rill_element::{Tuple, TupleRef};
        use rill_pubsub::{link, Outlet, Publish, Subscribe};

        use crate::ops::barrier::{Barrier, Gate};
        use crate::ops::sink::CollectSink;

        #[test]
        fn releases_in_stages() {
            let gate = Gate::new();
            let counter = Arc::new(AtomicI64::new(10));

            let upstream = Arc::new(Outlet::new());
            let barrier = {
                let counter = Arc::clone(&counter);
                Barrier::new(Arc::clone(&gate), move |tuple: &TupleRef<(i64,)>| {
                    tuple.record().0 < counter.load(Ordering::SeqCst)
                })
            };
            let sink = CollectSink::new();
            link(&upstream, barrier.inlet());
            link(barrier.outlet(), sink.inlet());

            let producer = {
                let upstream = Arc::clone(&upstream);
                thread::spawn(move || {
                    for value in [1i64, 2, 3, 4, 11, 12, 20, 21, 22] {
                        upstream.publish(Tuple::new((value,)), false);
                    }
                })
            };

            assert!(sink.wait_for_count(4, Duration::from_secs(5)));
            assert_eq!(sink.elements().len(), 4);

            counter.store(13, Ordering::SeqCst);
            gate.notify();
            assert!(sink.wait_for_count(6, Duration::from_secs(5)));
            assert_eq!(sink.elements().len(), 6);

            counter.store(25, Ordering::SeqCst);
            gate.notify();
            assert!(sink.wait_for_count(9, Duration::from_secs(5)));
            producer.join().unwrap();

            let values: Vec<i64> = sink
                .elements()
                .iter()
                .map(|element| element.data.record().0)
                .collect();
            assert_eq!(values, vec![1, 2, 3, 4, 11, 12, 20, 21, 22]);
        }
    }
}
