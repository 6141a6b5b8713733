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

//! Queue operator.

use crossbeam::channel::{bounded, Sender};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use rill_element::{Element, PunctuationRef, StreamData};
use rill_executor::Worker;
use rill_pubsub::{BaseOp, Discipline, Inlet, Outlet, Publish, Subscribe};

// ----------------------------------------------------------------------------
// Enumerations
// ----------------------------------------------------------------------------

/// Queue item.
///
/// Punctuations pass through the same queue as data, so the interleaving
/// of data and punctuations from a single upstream is preserved across the
/// thread boundary.
enum Item<D> {
    /// A data element.
    Data(Element<D>),
    /// A punctuation.
    Punctuation(PunctuationRef),
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Queue operator.
///
/// Decouples tuple producer and consumer: arriving items are pushed into a
/// bounded channel drained by an internal worker thread, which forwards
/// them downstream. The push blocks only when the channel is at capacity.
/// Stopping drops the channel's sender, lets the worker drain what is left
/// and joins the thread; dropping the last handle does the same.
pub struct Queue<D> {
    /// Producing side of the channel.
    sender: Mutex<Option<Sender<Item<D>>>>,
    /// Consuming worker thread.
    worker: Mutex<Option<Worker>>,
    /// Input endpoints.
    inlet: Inlet<D>,
    /// Output endpoints, shared with the worker.
    outlet: Arc<Outlet<D>>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<D> Queue<D>
where
    D: StreamData,
{
    /// Default channel capacity.
    pub const DEFAULT_CAPACITY: usize = 65_536;

    /// Creates a queue with the default capacity.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates a queue with the given channel capacity.
    ///
    /// # Panics
    ///
    /// Panics if the capacity is zero, which would rendezvous producer and
    /// consumer instead of decoupling them.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Arc<Self> {
        assert!(capacity > 0, "queue capacity must be positive");
        let (sender, receiver) = bounded::<Item<D>>(capacity);
        let outlet = Arc::new(Outlet::new());

        // The worker owns the outlet, not the operator, so the last operator
        // handle can drop from any thread without joining itself
        let worker = {
            let outlet = Arc::clone(&outlet);
            Worker::spawn("queue", move || {
                while let Ok(item) = receiver.recv() {
                    match item {
                        Item::Data(element) => outlet.publish_element(element),
                        Item::Punctuation(punctuation) => {
                            outlet.publish_punctuation(punctuation);
                        }
                    }
                }
            })
        };

        Arc::new_cyclic(|op: &Weak<Self>| {
            let on_data = {
                let op = op.clone();
                move |element| {
                    if let Some(this) = op.upgrade() {
                        this.push(Item::Data(element));
                    }
                }
            };
            let on_punctuation = {
                let op = op.clone();
                move |punctuation| {
                    if let Some(this) = op.upgrade() {
                        this.push(Item::Punctuation(punctuation));
                    }
                }
            };
            Self {
                sender: Mutex::new(Some(sender)),
                worker: Mutex::new(Some(worker)),
                inlet: Inlet::new(
                    Discipline::Unsynchronized,
                    on_data,
                    on_punctuation,
                ),
                outlet,
            }
        })
    }

    /// Pushes an item, blocking while the channel is at capacity.
    fn push(&self, item: Item<D>) {
        let sender = {
            let sender =
                self.sender.lock().unwrap_or_else(PoisonError::into_inner);
            sender.clone()
        };
        if let Some(sender) = sender {
            let _ = sender.send(item);
        }
    }

    /// Stops the queue, draining and joining the worker.
    pub fn stop(&self) {
        {
            let mut sender =
                self.sender.lock().unwrap_or_else(PoisonError::into_inner);
            drop(sender.take());
        }
        let worker = {
            let mut worker =
                self.worker.lock().unwrap_or_else(PoisonError::into_inner);
            worker.take()
        };
        drop(worker);
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<D> Drop for Queue<D> {
    /// Stops the queue, draining and joining the worker.
    fn drop(&mut self) {
        {
            let mut sender =
                self.sender.lock().unwrap_or_else(PoisonError::into_inner);
            drop(sender.take());
        }
        let mut worker =
            self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut worker) = worker.take() {
            worker.join();
        }
    }
}

impl<D> BaseOp for Queue<D>
where
    D: StreamData,
{
    fn name(&self) -> &str {
        "Queue"
    }
}

impl<D> Publish<D> for Queue<D>
where
    D: StreamData,
{
    #[inline]
    fn outlet(&self) -> &Outlet<D> {
        &self.outlet
    }
}

impl<D> Subscribe<D> for Queue<D>
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

    mod queue {
        use std::time::Duration;

        use rill_element::{Kind, Punctuation, Tuple, TupleRef};
        use rill_pubsub::{link, Outlet, Publish, Subscribe};

        use crate::ops::queue::Queue;
        use crate::ops::sink::CollectSink;

        #[test]
        fn preserves_order_across_threads() {
            let upstream = Outlet::new();
            let queue = Queue::<TupleRef<(i64,)>>::new();
            let sink = CollectSink::new();
            link(&upstream, queue.inlet());
            link(queue.outlet(), sink.inlet());

            for value in 0..100i64 {
                upstream.publish(Tuple::new((value,)), false);
            }
            upstream.publish_punctuation(Punctuation::new(Kind::EndOfStream));

            assert!(sink.wait_for_kind(Kind::EndOfStream, Duration::from_secs(5)));
            let values: Vec<i64> = sink
                .elements()
                .iter()
                .map(|element| element.data.record().0)
                .collect();
            assert_eq!(values, (0..100).collect::<Vec<_>>());
        }

        #[test]
        fn drains_on_stop() {
            let upstream = Outlet::new();
            let queue = Queue::<TupleRef<(i64,)>>::with_capacity(16);
            let sink = CollectSink::new();
            link(&upstream, queue.inlet());
            link(queue.outlet(), sink.inlet());

            for value in 0..10i64 {
                upstream.publish(Tuple::new((value,)), false);
            }
            queue.stop();

            // Stop drains the channel before joining the worker
            assert_eq!(sink.elements().len(), 10);
        }
    }
}
