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

//! Map operator.

use std::sync::{Arc, Weak};

use rill_element::{Element, StreamData};
use rill_pubsub::{BaseOp, Discipline, Inlet, Outlet, Publish, Subscribe};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Projection function.
pub type MapFn<I, O> = Box<dyn Fn(&I, bool) -> O + Send + Sync>;

/// Map operator.
///
/// Applies a total projection function to every element and emits the
/// result with the incoming outdated flag. Punctuations are forwarded
/// verbatim.
pub struct Map<I, O> {
    /// Projection function.
    function: MapFn<I, O>,
    /// Input endpoints.
    inlet: Inlet<I>,
    /// Output endpoints.
    outlet: Outlet<O>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<I, O> Map<I, O>
where
    I: StreamData,
    O: StreamData,
{
    /// Creates a map operator with the given projection function.
    pub fn new<F>(function: F) -> Arc<Self>
    where
        F: Fn(&I, bool) -> O + Send + Sync + 'static,
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
                function: Box::new(function),
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
    fn process(&self, element: Element<I>) {
        let data = (self.function)(&element.data, element.outdated);
        self.outlet.publish(data, element.outdated);
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<I, O> BaseOp for Map<I, O>
where
    I: StreamData,
    O: StreamData,
{
    fn name(&self) -> &str {
        "Map"
    }
}

impl<I, O> Publish<O> for Map<I, O>
where
    I: StreamData,
    O: StreamData,
{
    #[inline]
    fn outlet(&self) -> &Outlet<O> {
        &self.outlet
    }
}

impl<I, O> Subscribe<I> for Map<I, O>
where
    I: StreamData,
    O: StreamData,
{
    #[inline]
    fn inlet(&self) -> &Inlet<I> {
        &self.inlet
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    mod map {
        use rill_element::{Tuple, TupleRef};
        use rill_pubsub::{link, Outlet, Publish, Subscribe};

        use crate::ops::map::Map;
        use crate::ops::sink::CollectSink;

        #[test]
        fn projects_and_preserves_flag() {
            let upstream = Outlet::new();
            let map = Map::new(|tuple: &TupleRef<(i64, i64)>, _| {
                Tuple::new((tuple.record().1, tuple.record().0))
            });
            let sink = CollectSink::new();
            link(&upstream, map.inlet());
            link(map.outlet(), sink.inlet());

            upstream.publish(Tuple::new((1i64, 2i64)), false);
            upstream.publish(Tuple::new((3i64, 4i64)), true);

            let elements = sink.elements();
            assert_eq!(elements[0].data.record(), &(2, 1));
            assert!(!elements[0].outdated);
            assert_eq!(elements[1].data.record(), &(4, 3));
            assert!(elements[1].outdated);
        }
    }
}
