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

//! Merge operator.

use std::sync::{Arc, Weak};

use rill_element::StreamData;
use rill_pubsub::{BaseOp, Discipline, Inlet, Outlet, Publish, Subscribe};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Merge operator.
///
/// Subscribes to multiple data channels and re-publishes every element on a
/// single output, preserving per-input order but not establishing a global
/// order. Each punctuation is re-published once per arrival; duplicates
/// from the several inputs are not coalesced. Since the inputs publish
/// from different source threads, the inlet is synchronized.
pub struct Merge<D> {
    /// Input endpoints, shared by all upstreams.
    inlet: Inlet<D>,
    /// Output endpoints.
    outlet: Outlet<D>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<D> Merge<D>
where
    D: StreamData,
{
    /// Creates a merge operator.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|op: &Weak<Self>| {
            let on_data = {
                let op = op.clone();
                move |element| {
                    if let Some(this) = op.upgrade() {
                        this.outlet.publish_element(element);
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
                inlet: Inlet::new(
                    Discipline::Synchronized,
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

impl<D> BaseOp for Merge<D>
where
    D: StreamData,
{
    fn name(&self) -> &str {
        "Merge"
    }
}

impl<D> Publish<D> for Merge<D>
where
    D: StreamData,
{
    #[inline]
    fn outlet(&self) -> &Outlet<D> {
        &self.outlet
    }
}

impl<D> Subscribe<D> for Merge<D>
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

    mod merge {
        use rill_element::{Kind, Punctuation, Tuple, TupleRef};
        use rill_pubsub::{link, Outlet, Publish, Subscribe};

        use crate::ops::merge::Merge;
        use crate::ops::sink::CollectSink;

        #[test]
        fn combines_inputs_without_coalescing() {
            let first = Outlet::new();
            let second = Outlet::new();
            let merge = Merge::<TupleRef<(i64,)>>::new();
            let sink = CollectSink::new();
            link(&first, merge.inlet());
            link(&second, merge.inlet());
            link(merge.outlet(), sink.inlet());

            first.publish(Tuple::new((1i64,)), false);
            second.publish(Tuple::new((2i64,)), false);
            first.publish_punctuation(Punctuation::new(Kind::EndOfStream));
            second.publish_punctuation(Punctuation::new(Kind::EndOfStream));

            assert_eq!(sink.elements().len(), 2);
            assert_eq!(sink.kinds(), vec![Kind::EndOfStream, Kind::EndOfStream]);
        }
    }
}
