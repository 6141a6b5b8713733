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

//! Notify operator.

use std::sync::{Arc, Weak};

use rill_element::{Element, Punctuation, StreamData};
use rill_pubsub::{BaseOp, Discipline, Inlet, Outlet, Publish, Subscribe};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Element callback.
pub type NotifyFn<D> = Box<dyn Fn(&D, bool) + Send + Sync>;

/// Punctuation callback.
pub type NotifyPunctuationFn = Box<dyn Fn(&Punctuation) + Send + Sync>;

/// Notify operator.
///
/// Invokes a callback for every element and forwards it unchanged. An
/// optional second callback observes punctuations, which are forwarded
/// either way. The callbacks are the only user-supplied functions allowed
/// to have side effects beyond their own state.
pub struct Notify<D> {
    /// Element callback.
    callback: NotifyFn<D>,
    /// Punctuation callback, if any.
    punctuation_callback: Option<NotifyPunctuationFn>,
    /// Input endpoints.
    inlet: Inlet<D>,
    /// Output endpoints.
    outlet: Outlet<D>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<D> Notify<D>
where
    D: StreamData,
{
    /// Creates a notify operator with the given element callback.
    pub fn new<F>(callback: F) -> Arc<Self>
    where
        F: Fn(&D, bool) + Send + Sync + 'static,
    {
        Self::create(Box::new(callback), None)
    }

    /// Creates a notify operator observing punctuations as well.
    pub fn with_punctuation<F, P>(callback: F, punctuation: P) -> Arc<Self>
    where
        F: Fn(&D, bool) + Send + Sync + 'static,
        P: Fn(&Punctuation) + Send + Sync + 'static,
    {
        Self::create(Box::new(callback), Some(Box::new(punctuation)))
    }

    /// Creates the operator.
    fn create(
        callback: NotifyFn<D>,
        punctuation_callback: Option<NotifyPunctuationFn>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|op: &Weak<Self>| {
            let on_data = {
                let op = op.clone();
                move |element: Element<D>| {
                    if let Some(this) = op.upgrade() {
                        (this.callback)(&element.data, element.outdated);
                        this.outlet.publish_element(element);
                    }
                }
            };
            let on_punctuation = {
                let op = op.clone();
                move |punctuation: rill_element::PunctuationRef| {
                    if let Some(this) = op.upgrade() {
                        if let Some(callback) = &this.punctuation_callback {
                            callback(&punctuation);
                        }
                        this.outlet.publish_punctuation(punctuation);
                    }
                }
            };
            Self {
                callback,
                punctuation_callback,
                inlet: Inlet::new(
                    Discipline::Unsynchronized,
                    on_data,
                    on_punctuation,
                ),
                outlet: Outlet::new(),
            }
        })
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<D> BaseOp for Notify<D>
where
    D: StreamData,
{
    fn name(&self) -> &str {
        "Notify"
    }
}

impl<D> Publish<D> for Notify<D>
where
    D: StreamData,
{
    #[inline]
    fn outlet(&self) -> &Outlet<D> {
        &self.outlet
    }
}

impl<D> Subscribe<D> for Notify<D>
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

    mod notify {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        use rill_element::{Kind, Punctuation, Tuple, TupleRef};
        use rill_pubsub::{link, Outlet, Publish, Subscribe};

        use crate::ops::notify::Notify;
        use crate::ops::sink::CollectSink;

        #[test]
        fn observes_and_forwards() {
            let seen = Arc::new(AtomicUsize::new(0));
            let kinds = Arc::new(AtomicUsize::new(0));

            let upstream = Outlet::new();
            let notify = {
                let seen = Arc::clone(&seen);
                let kinds = Arc::clone(&kinds);
                Notify::with_punctuation(
                    move |_: &TupleRef<(i64,)>, _| {
                        seen.fetch_add(1, Ordering::SeqCst);
                    },
                    move |_| {
                        kinds.fetch_add(1, Ordering::SeqCst);
                    },
                )
            };
            let sink = CollectSink::new();
            link(&upstream, notify.inlet());
            link(notify.outlet(), sink.inlet());

            upstream.publish(Tuple::new((1i64,)), false);
            upstream.publish_punctuation(Punctuation::new(Kind::EndOfStream));

            assert_eq!(seen.load(Ordering::SeqCst), 1);
            assert_eq!(kinds.load(Ordering::SeqCst), 1);
            assert_eq!(sink.elements().len(), 1);
            assert_eq!(sink.kinds(), vec![Kind::EndOfStream]);
        }
    }
}
