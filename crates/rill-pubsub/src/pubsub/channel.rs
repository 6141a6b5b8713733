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

//! Typed channels.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};

// ----------------------------------------------------------------------------
// Enumerations
// ----------------------------------------------------------------------------

/// Delivery discipline of an input channel.
///
/// An operator that is reachable from multiple source threads, e.g. through
/// a merge or a multi-input join, must declare its input channels
/// synchronized; single-predecessor operators should leave them
/// unsynchronized to avoid needless locking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Discipline {
    /// The publishing thread runs the slot inline.
    Unsynchronized,
    /// A mutex is held for the duration of the slot invocation, serializing
    /// concurrent publishers.
    Synchronized,
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Slot of an input channel.
///
/// The slot bundles the receiving handler with the optional serialization
/// guard. It is the unit of subscription: output channels reference slots
/// weakly, so a connection lives only as long as both endpoints do.
struct Slot<E> {
    /// Serialization guard, present on synchronized channels.
    guard: Option<Mutex<()>>,
    /// Receiving handler.
    handler: Box<dyn Fn(E) + Send + Sync>,
}

/// Output channel.
///
/// A fan-out broadcast point. Publishing delivers the element synchronously
/// to every subscribed input channel in registration order, on whichever
/// thread originated the publish. Subscribers whose input endpoint has been
/// dropped are pruned lazily.
///
/// # Examples
///
/// ```
/// use rill_pubsub::{connect, Discipline, InputChannel, OutputChannel};
///
/// // Create channels and connect them
/// let output = OutputChannel::new();
/// let input = InputChannel::new(Discipline::Unsynchronized, |value: i64| {
///     assert_eq!(value, 42);
/// });
/// connect(&output, &input);
///
/// // Publish an element
/// output.publish(42);
/// ```
pub struct OutputChannel<E> {
    /// Subscribed slots in registration order.
    subscribers: Mutex<Vec<Weak<Slot<E>>>>,
}

/// Input channel.
///
/// The subscription sink of an operator. The channel owns its slot; the
/// operator behind it is referenced weakly from the handler, so dropping
/// the operator quiesces the channel.
pub struct InputChannel<E> {
    /// Delivery discipline.
    discipline: Discipline,
    /// Owned slot.
    slot: Arc<Slot<E>>,
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Connects an output channel to an input channel.
///
/// This registers the input as a subscriber of the output. Element types
/// must be identical, which the signature enforces statically, so wiring
/// two channels of incompatible element types is a compile-time error.
/// Dropping either endpoint severs the subscription.
pub fn connect<E>(output: &OutputChannel<E>, input: &InputChannel<E>) {
    let mut subscribers = output
        .subscribers
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    subscribers.push(Arc::downgrade(&input.slot));
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<E> Slot<E> {
    /// Invokes the handler under the channel's discipline.
    fn invoke(&self, element: E) {
        match &self.guard {
            Some(guard) => {
                let _serialized =
                    guard.lock().unwrap_or_else(PoisonError::into_inner);
                (self.handler)(element);
            }
            None => (self.handler)(element),
        }
    }
}

// ----------------------------------------------------------------------------

impl<E> OutputChannel<E> {
    /// Creates an output channel without subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self { subscribers: Mutex::new(Vec::new()) }
    }

    /// Publishes an element to all subscribers.
    ///
    /// The subscriber list is snapshot and pruned first, then the element is
    /// delivered outside the subscriber lock, so a handler may connect
    /// further channels without deadlocking against the publisher.
    pub fn publish(&self, element: E)
    where
        E: Clone,
    {
        let mut slots: Vec<Arc<Slot<E>>> = {
            let mut subscribers = self
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            subscribers.retain(|slot| slot.strong_count() > 0);
            subscribers.iter().filter_map(Weak::upgrade).collect()
        };

        // Deliver in registration order, moving the element into the last
        // slot to save one clone in the common single-subscriber case
        let last = slots.pop();
        for slot in &slots {
            slot.invoke(element.clone());
        }
        if let Some(slot) = last {
            slot.invoke(element);
        }
    }

    /// Returns the number of live subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        let subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers
            .iter()
            .filter(|slot| slot.strong_count() > 0)
            .count()
    }

    /// Returns whether the channel has no live subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ----------------------------------------------------------------------------

impl<E> InputChannel<E> {
    /// Creates an input channel with the given discipline and handler.
    #[must_use]
    pub fn new<F>(discipline: Discipline, handler: F) -> Self
    where
        F: Fn(E) + Send + Sync + 'static,
    {
        let guard = match discipline {
            Discipline::Unsynchronized => None,
            Discipline::Synchronized => Some(Mutex::new(())),
        };
        Self {
            discipline,
            slot: Arc::new(Slot { guard, handler: Box::new(handler) }),
        }
    }

    /// Returns the delivery discipline.
    #[inline]
    #[must_use]
    pub fn discipline(&self) -> Discipline {
        self.discipline
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<E> Default for OutputChannel<E> {
    /// Creates an output channel without subscribers.
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for OutputChannel<E> {
    /// Formats the channel for debugging.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("OutputChannel")
            .field("subscribers", &self.len())
            .finish()
    }
}

impl<E> fmt::Debug for InputChannel<E> {
    /// Formats the channel for debugging.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("InputChannel")
            .field("discipline", &self.discipline)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    mod channel {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::{Arc, Mutex};
        use std::thread;

        use crate::pubsub::channel::{
            connect, Discipline, InputChannel, OutputChannel,
        };

        #[test]
        fn delivers_in_registration_order() {
            let trace = Arc::new(Mutex::new(Vec::new()));
            let output = OutputChannel::new();

            let first = {
                let trace = Arc::clone(&trace);
                InputChannel::new(Discipline::Unsynchronized, move |value: i64| {
                    trace.lock().unwrap().push(("first", value));
                })
            };
            let second = {
                let trace = Arc::clone(&trace);
                InputChannel::new(Discipline::Unsynchronized, move |value: i64| {
                    trace.lock().unwrap().push(("second", value));
                })
            };

            connect(&output, &first);
            connect(&output, &second);
            output.publish(1);
            output.publish(2);

            assert_eq!(
                *trace.lock().unwrap(),
                vec![("first", 1), ("second", 1), ("first", 2), ("second", 2)]
            );
        }

        #[test]
        fn severs_on_drop() {
            let count = Arc::new(AtomicUsize::new(0));
            let output = OutputChannel::new();

            let input = {
                let count = Arc::clone(&count);
                InputChannel::new(Discipline::Unsynchronized, move |_: i64| {
                    count.fetch_add(1, Ordering::SeqCst);
                })
            };

            connect(&output, &input);
            output.publish(1);
            assert_eq!(output.len(), 1);

            drop(input);
            output.publish(2);
            assert_eq!(count.load(Ordering::SeqCst), 1);
            assert!(output.is_empty());
        }

        #[test]
        fn serializes_concurrent_publishers() {
            let count = Arc::new(AtomicUsize::new(0));
            let output = Arc::new(OutputChannel::new());

            let input = {
                let count = Arc::clone(&count);
                InputChannel::new(Discipline::Synchronized, move |_: i64| {
                    // Non-atomic read-modify-write, only safe under the
                    // channel's serialization guard
                    let value = count.load(Ordering::SeqCst);
                    thread::yield_now();
                    count.store(value + 1, Ordering::SeqCst);
                })
            };
            connect(&output, &input);

            let threads: Vec<_> = (0..4)
                .map(|_| {
                    let output = Arc::clone(&output);
                    thread::spawn(move || {
                        for _ in 0..100 {
                            output.publish(1);
                        }
                    })
                })
                .collect();
            for handle in threads {
                handle.join().unwrap();
            }

            assert_eq!(count.load(Ordering::SeqCst), 400);
        }
    }
}
