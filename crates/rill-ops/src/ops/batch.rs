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

//! Batcher operator.

use std::mem;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use rill_element::{Element, Kind, PunctuationRef, StreamData};
use rill_pubsub::{BaseOp, Discipline, Inlet, Outlet, Publish, Subscribe};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Shared batch of elements.
pub type Batch<D> = Arc<Vec<Element<D>>>;

/// Batcher operator.
///
/// Accumulates arriving elements, outdated flags included, into a
/// fixed-capacity buffer and emits one batched element per full buffer. At
/// end-of-stream any residual batch is flushed before the punctuation is
/// forwarded.
pub struct Batcher<D> {
    /// Batch size.
    size: usize,
    /// Accumulation buffer.
    buffer: Mutex<Vec<Element<D>>>,
    /// Input endpoints.
    inlet: Inlet<D>,
    /// Output endpoints.
    outlet: Outlet<Batch<D>>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<D> Batcher<D>
where
    D: StreamData,
{
    /// Creates a batcher with the given batch size.
    ///
    /// # Panics
    ///
    /// Panics if the batch size is zero.
    pub fn new(size: usize) -> Arc<Self> {
        assert!(size > 0, "batch size must be positive");
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
                        this.punctuate(punctuation);
                    }
                }
            };
            Self {
                size,
                buffer: Mutex::new(Vec::with_capacity(size)),
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
        let full = {
            let mut buffer =
                self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
            buffer.push(element);
            if buffer.len() == self.size {
                Some(mem::replace(&mut *buffer, Vec::with_capacity(self.size)))
            } else {
                None
            }
        };
        if let Some(batch) = full {
            self.outlet.publish(Arc::new(batch), false);
        }
    }

    /// Handles an arriving punctuation.
    fn punctuate(&self, punctuation: PunctuationRef) {
        if punctuation.kind() == Kind::EndOfStream {
            self.flush();
        }
        self.outlet.publish_punctuation(punctuation);
    }

    /// Flushes a residual batch, if any.
    fn flush(&self) {
        let residue = {
            let mut buffer =
                self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
            if buffer.is_empty() {
                None
            } else {
                Some(mem::take(&mut *buffer))
            }
        };
        if let Some(batch) = residue {
            self.outlet.publish(Arc::new(batch), false);
        }
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<D> BaseOp for Batcher<D>
where
    D: StreamData,
{
    fn name(&self) -> &str {
        "Batcher"
    }
}

impl<D> Publish<Batch<D>> for Batcher<D>
where
    D: StreamData,
{
    #[inline]
    fn outlet(&self) -> &Outlet<Batch<D>> {
        &self.outlet
    }
}

impl<D> Subscribe<D> for Batcher<D>
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

    mod batch {
        use rill_element::{Kind, Punctuation, Tuple, TupleRef};
        use rill_pubsub::{link, Outlet, Publish, Subscribe};

        use crate::ops::batch::Batcher;
        use crate::ops::sink::CollectSink;

        #[test]
        fn emits_full_batches_and_flushes_residue() {
            let upstream = Outlet::new();
            let batcher = Batcher::<TupleRef<(i64,)>>::new(3);
            let sink = CollectSink::new();
            link(&upstream, batcher.inlet());
            link(batcher.outlet(), sink.inlet());

            for value in 0..7i64 {
                upstream.publish(Tuple::new((value,)), value == 1);
            }
            upstream.publish_punctuation(Punctuation::new(Kind::EndOfStream));

            let batches = sink.elements();
            assert_eq!(batches.len(), 3);
            assert_eq!(batches[0].data.len(), 3);
            assert!(batches[0].data[1].outdated);
            assert_eq!(batches[1].data.len(), 3);
            assert_eq!(batches[2].data.len(), 1);
            assert_eq!(batches[2].data[0].data.record().0, 6);
            assert_eq!(sink.kinds(), vec![Kind::EndOfStream]);
        }
    }
}
