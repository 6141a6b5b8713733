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

//! Where operator.

use std::sync::{Arc, Weak};

use rill_element::{Element, StreamData};
use rill_pubsub::{BaseOp, Discipline, Inlet, Outlet, Publish, Subscribe};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Filter predicate.
pub type PredicateFn<D> = Box<dyn Fn(&D, bool) -> bool + Send + Sync>;

/// Where operator.
///
/// Forwards all elements satisfying the predicate, which also receives the
/// outdated flag. The flag is preserved on forwarded elements, so outdated
/// tuples flow through unchanged. Punctuations are forwarded verbatim.
///
/// # Examples
///
/// ```
/// use rill_ops::Where;
///
/// // Create filter for even values
/// let filter = Where::new(|value: &i64, _| value % 2 == 0);
/// ```
pub struct Where<D> {
    /// Filter predicate.
    predicate: PredicateFn<D>,
    /// Input endpoints.
    inlet: Inlet<D>,
    /// Output endpoints.
    outlet: Outlet<D>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<D> Where<D>
where
    D: StreamData,
{
    /// Creates a where operator with the given predicate.
    pub fn new<P>(predicate: P) -> Arc<Self>
    where
        P: Fn(&D, bool) -> bool + Send + Sync + 'static,
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

    /// Handles an arriving element.
    fn process(&self, element: Element<D>) {
        if (self.predicate)(&element.data, element.outdated) {
            self.outlet.publish_element(element);
        }
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<D> BaseOp for Where<D>
where
    D: StreamData,
{
    fn name(&self) -> &str {
        "Where"
    }
}

impl<D> Publish<D> for Where<D>
where
    D: StreamData,
{
    #[inline]
    fn outlet(&self) -> &Outlet<D> {
        &self.outlet
    }
}

impl<D> Subscribe<D> for Where<D>
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

    mod filter {
        use rill_element::{Kind, Punctuation, Tuple, TupleRef};
        use rill_pubsub::{link, Outlet, Publish, Subscribe};

        use crate::ops::filter::Where;
        use crate::ops::sink::CollectSink;

        #[test]
        fn preserves_outdated_flag() {
            let upstream = Outlet::new();
            let filter =
                Where::new(|tuple: &TupleRef<(i64,)>, _| tuple.record().0 % 2 == 0);
            let sink = CollectSink::new();
            link(&upstream, filter.inlet());
            link(filter.outlet(), sink.inlet());

            for value in 0..4i64 {
                upstream.publish(Tuple::new((value,)), value == 2);
            }

            let elements = sink.elements();
            assert_eq!(elements.len(), 2);
            assert_eq!(elements[0].data.record().0, 0);
            assert!(!elements[0].outdated);
            assert_eq!(elements[1].data.record().0, 2);
            assert!(elements[1].outdated);
        }

        #[test]
        fn forwards_punctuations() {
            let upstream = Outlet::new();
            let filter = Where::new(|_: &TupleRef<(i64,)>, _| false);
            let sink = CollectSink::new();
            link(&upstream, filter.inlet());
            link(filter.outlet(), sink.inlet());

            upstream.publish_punctuation(Punctuation::new(Kind::EndOfStream));
            assert_eq!(sink.kinds(), vec![Kind::EndOfStream]);
            assert!(sink.elements().is_empty());
        }
    }
}
