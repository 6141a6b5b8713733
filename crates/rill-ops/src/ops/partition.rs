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

//! Partitioning operator.

use std::sync::{Arc, Weak};

use rill_element::{Element, PunctuationRef, StreamData};
use rill_pubsub::{BaseOp, Discipline, Inlet, Outlet, Subscribe};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Partition function.
pub type PartitionFn<D> = Box<dyn Fn(&D) -> usize + Send + Sync>;

/// Partitioning operator.
///
/// Computes a partition id for every element and publishes it on exactly
/// one of its output sub-channels. The caller wires one parallel subquery
/// per partition, decoupled by queue operators so each partition executes
/// on its own thread, and collects them back with a merge. Punctuations
/// are broadcast to all partitions.
pub struct PartitionBy<D> {
    /// Partition function.
    function: PartitionFn<D>,
    /// Output endpoints, one per partition.
    outlets: Vec<Outlet<D>>,
    /// Input endpoints.
    inlet: Inlet<D>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<D> PartitionBy<D>
where
    D: StreamData,
{
    /// Creates a partitioning operator with the given partition count.
    ///
    /// The partition function must map every element into `0..partitions`;
    /// an id out of range aborts the publishing source's run, like any
    /// other failing user callable.
    ///
    /// # Panics
    ///
    /// Panics if the partition count is zero.
    pub fn new<F>(partitions: usize, function: F) -> Arc<Self>
    where
        F: Fn(&D) -> usize + Send + Sync + 'static,
    {
        assert!(partitions > 0, "partition count must be positive");
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
                        this.broadcast(&punctuation);
                    }
                }
            };
            Self {
                function: Box::new(function),
                outlets: (0..partitions).map(|_| Outlet::new()).collect(),
                inlet: Inlet::new(
                    Discipline::Unsynchronized,
                    on_data,
                    on_punctuation,
                ),
            }
        })
    }

    /// Returns the number of partitions.
    #[inline]
    #[must_use]
    pub fn partitions(&self) -> usize {
        self.outlets.len()
    }

    /// Returns the outlet of the given partition.
    ///
    /// # Panics
    ///
    /// Panics if the partition id is out of range.
    #[inline]
    #[must_use]
    pub fn outlet(&self, partition: usize) -> &Outlet<D> {
        &self.outlets[partition]
    }

    /// Handles an arriving element.
    fn process(&self, element: Element<D>) {
        let partition = (self.function)(&element.data);
        self.outlets[partition].publish_element(element);
    }

    /// Broadcasts a punctuation to all partitions.
    fn broadcast(&self, punctuation: &PunctuationRef) {
        for outlet in &self.outlets {
            outlet.publish_punctuation(punctuation.clone());
        }
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<D> BaseOp for PartitionBy<D>
where
    D: StreamData,
{
    fn name(&self) -> &str {
        "PartitionBy"
    }
}

impl<D> Subscribe<D> for PartitionBy<D>
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

    mod partition {
        use rill_element::{Kind, Punctuation, Tuple, TupleRef};
        use rill_pubsub::{link, Outlet, Subscribe};

        use crate::ops::partition::PartitionBy;
        use crate::ops::sink::CollectSink;

        #[test]
        fn routes_by_partition_id() {
            let upstream = Outlet::new();
            let partition =
                PartitionBy::new(3, |tuple: &TupleRef<(i64,)>| {
                    usize::try_from(tuple.record().0).unwrap() % 3
                });
            let sinks: Vec<_> =
                (0..3).map(|_| CollectSink::new()).collect();
            link(&upstream, partition.inlet());
            for (index, sink) in sinks.iter().enumerate() {
                link(partition.outlet(index), sink.inlet());
            }

            for value in 0..9i64 {
                upstream.publish(Tuple::new((value,)), false);
            }
            upstream.publish_punctuation(Punctuation::new(Kind::EndOfStream));

            for (index, sink) in sinks.iter().enumerate() {
                let values: Vec<i64> = sink
                    .elements()
                    .iter()
                    .map(|element| element.data.record().0)
                    .collect();
                let expected = i64::try_from(index).unwrap();
                assert_eq!(
                    values,
                    vec![expected, expected + 3, expected + 6]
                );

                // Punctuations reach every partition
                assert_eq!(sink.kinds(), vec![Kind::EndOfStream]);
            }
        }
    }
}
