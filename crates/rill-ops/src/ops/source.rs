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

//! In-memory source.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rill_element::{Kind, Punctuation, StreamData};
use rill_pubsub::{BaseOp, Outlet, Publish, Source, SourceError};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// In-memory source.
///
/// Emits a fixed sequence of elements, all non-outdated, followed by an
/// end-of-stream punctuation, exercising the source adapter contract
/// without any I/O. Re-running the source emits the sequence again, which
/// is what a periodically re-triggered topology does.
///
/// # Examples
///
/// ```
/// use rill_element::Tuple;
/// use rill_ops::IterSource;
/// use rill_pubsub::Source;
///
/// // Create source and run it
/// let source = IterSource::new([Tuple::new((1i64,)), Tuple::new((2i64,))]);
/// assert_eq!(source.start().unwrap(), 2);
/// ```
pub struct IterSource<D> {
    /// Elements to emit.
    items: Vec<D>,
    /// Whether the current run was stopped.
    stopped: AtomicBool,
    /// Output endpoints.
    outlet: Outlet<D>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<D> IterSource<D>
where
    D: StreamData,
{
    /// Creates a source emitting the given elements.
    pub fn new<I>(items: I) -> Arc<Self>
    where
        I: IntoIterator<Item = D>,
    {
        Arc::new(Self {
            items: items.into_iter().collect(),
            stopped: AtomicBool::new(false),
            outlet: Outlet::new(),
        })
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<D> BaseOp for IterSource<D>
where
    D: StreamData,
{
    fn name(&self) -> &str {
        "IterSource"
    }
}

impl<D> Publish<D> for IterSource<D>
where
    D: StreamData,
{
    #[inline]
    fn outlet(&self) -> &Outlet<D> {
        &self.outlet
    }
}

impl<D> Source<D> for IterSource<D>
where
    D: StreamData,
{
    /// Runs the source to completion and returns the number of elements.
    fn start(&self) -> Result<u64, SourceError> {
        self.stopped.store(false, Ordering::SeqCst);

        let mut count = 0;
        for item in &self.items {
            if self.stopped.load(Ordering::SeqCst) {
                break;
            }
            self.outlet.publish(item.clone(), false);
            count += 1;
        }

        self.outlet
            .publish_punctuation(Punctuation::new(Kind::EndOfStream));
        Ok(count)
    }

    /// Stops the current run.
    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    mod source {
        use rill_element::{Kind, Tuple, TupleRef};
        use rill_pubsub::{link, Publish, Source, Subscribe};

        use crate::ops::sink::CollectSink;
        use crate::ops::source::IterSource;

        #[test]
        fn emits_elements_then_end_of_stream() {
            let source =
                IterSource::new((0..5i64).map(|value| Tuple::new((value,))));
            let sink = CollectSink::<TupleRef<(i64,)>>::new();
            link(source.outlet(), sink.inlet());

            assert_eq!(source.start().unwrap(), 5);
            assert_eq!(sink.elements().len(), 5);
            assert_eq!(sink.outdated_count(), 0);
            assert_eq!(sink.kinds(), vec![Kind::EndOfStream]);
        }
    }
}
