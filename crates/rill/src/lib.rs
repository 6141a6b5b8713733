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

//! Continuous queries over unbounded tuple streams.
//!
//! A dataflow engine in which user code assembles a directed graph of typed
//! operators and runs it: sources publish shared, immutable tuples and
//! out-of-band punctuations, stateful operators revoke state through
//! outdated emissions, and a topology drives startup, asynchronous
//! execution and shutdown.
//!
//! # Examples
//!
//! ```
//! use rill::{CollectSink, Topology, Tuple, TupleRef};
//!
//! # fn main() -> rill::Result<()> {
//! // Build and run a small query
//! let sink = CollectSink::new();
//! let topology = Topology::new();
//! topology
//!     .new_stream_from_iter((0..100i64).map(|value| Tuple::new((value,))))
//!     .where_(|tuple: &TupleRef<(i64,)>, _| tuple.record().0 % 2 == 0)?
//!     .sink(&sink)?;
//!
//! topology.start(false);
//! assert_eq!(sink.elements().len(), 50);
//! # Ok(())
//! # }
//! ```

pub use rill_dsl::{Dataflow, Error, Pipe, Result, Topology};
pub use rill_element::{
    Concat, Decode, DecodeError, Element, Encode, Field, Key, Kind, NullMask,
    Punctuation, PunctuationRef, Record, StrRef, StreamData, Timestamp, Tuple,
    TupleRef,
};
pub use rill_executor::{Periodic, SourceSet, Worker};
pub use rill_ops::{
    Aggregate, AggregateState, Aggregation, Ascending, Avg, Barrier, Batch,
    Batcher, CollectSink, Comparable, Comparator, Count, Descending,
    FromTable, Gate, GroupedAggregation, Identity, IterSource, KeyFn,
    LeastRecent, Map, Max, Merge, Min, MostRecent, Notify, Numeric,
    PartitionBy, Queue, SHJoin, SelectFromTable, SlidingWindow, StatefulMap,
    Sum, TimestampFn, ToTable, TotalOrder, Trigger, TumblingWindow, Where,
    WindowSpec,
};
pub use rill_pubsub::{
    connect, link, link_left, link_right, BaseOp, BinaryInlet, Discipline,
    Inlet, InputChannel, Outlet, OutputChannel, Publish, Source, SourceError,
    Subscribe,
};
pub use rill_table::{Mode, NotificationMode, Observer, Table, TableRef};

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    mod scenarios {
        use std::sync::atomic::{AtomicI64, Ordering};
        use std::sync::Arc;
        use std::thread;
        use std::time::Duration;

        use crate::{
            Aggregate, AggregateState, Avg, CollectSink, Count, Gate, Kind,
            LeastRecent, Max, Min, MostRecent, Sum, Topology, TotalOrder,
            Trigger, Tuple, TupleRef, WindowSpec,
        };

        /// Sum, average and count over field 0.
        #[derive(Default)]
        struct Stats {
            sum: Sum<f64>,
            avg: Avg<f64>,
            count: Count<f64>,
        }

        impl AggregateState<TupleRef<(f64,)>> for Stats {
            type Output = TupleRef<(f64, f64, i64)>;

            fn iterate(&mut self, data: &TupleRef<(f64,)>, outdated: bool) {
                let value = data.record().0;
                self.sum.iterate(&value, outdated);
                self.avg.iterate(&value, outdated);
                self.count.iterate(&value, outdated);
            }

            fn finalize(&self) -> Self::Output {
                Tuple::new((
                    self.sum.value(),
                    self.avg.value(),
                    self.count.value(),
                ))
            }
        }

        /// Minimum, maximum, most and least recent value of field 0.
        #[derive(Default)]
        struct Extrema {
            min: Min<f64, TotalOrder>,
            max: Max<f64, TotalOrder>,
            most: MostRecent<f64>,
            least: LeastRecent<f64>,
        }

        impl AggregateState<TupleRef<(f64,)>> for Extrema {
            type Output = TupleRef<(f64, f64, f64, f64)>;

            fn iterate(&mut self, data: &TupleRef<(f64,)>, outdated: bool) {
                let value = data.record().0;
                self.min.iterate(&value, outdated);
                self.max.iterate(&value, outdated);
                self.most.iterate(&value, outdated);
                self.least.iterate(&value, outdated);
            }

            fn finalize(&self) -> Self::Output {
                Tuple::new((
                    self.min.value(),
                    self.max.value(),
                    self.most.value(),
                    self.least.value(),
                ))
            }
        }

        /// Key and count over (string key, integer value) tuples.
        #[derive(Default)]
        struct KeyedCount {
            key: crate::Identity<String>,
            count: Count<i64>,
        }

        impl AggregateState<TupleRef<(String, i64)>> for KeyedCount {
            type Output = TupleRef<(String, i64)>;

            fn iterate(&mut self, data: &TupleRef<(String, i64)>, outdated: bool) {
                self.key.iterate(&data.record().0, outdated);
                self.count.iterate(&data.record().1, outdated);
            }

            fn finalize(&self) -> Self::Output {
                Tuple::new((self.key.value(), self.count.value()))
            }
        }

        #[test]
        fn incremental_ungrouped_aggregation() {
            let sink = CollectSink::new();
            let topology = Topology::new();
            topology
                .new_stream_from_iter(
                    [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0]
                        .map(|value| Tuple::new((value,))),
                )
                .aggregate::<Stats>(Trigger::All)
                .unwrap()
                .sink(&sink)
                .unwrap();

            topology.start(false);

            let results: Vec<(f64, f64, i64)> = sink
                .elements()
                .iter()
                .map(|element| *element.data.record())
                .collect();
            assert_eq!(
                results,
                vec![
                    (1.0, 1.0, 1),
                    (3.0, 1.5, 2),
                    (6.0, 2.0, 3),
                    (10.0, 2.5, 4),
                    (15.0, 3.0, 5),
                    (21.0, 3.5, 6),
                ]
            );
        }

        #[test]
        fn extrema_over_sliding_row_window() {
            let sink = CollectSink::new();
            let topology = Topology::new();
            topology
                .new_stream_from_iter(
                    [3.4f64, 2.1, 3.0, 5.7, 9.1, 7.4]
                        .map(|value| Tuple::new((value,))),
                )
                .sliding_window(WindowSpec::Rows(3), None)
                .unwrap()
                .aggregate::<Extrema>(Trigger::All)
                .unwrap()
                .sink(&sink)
                .unwrap();

            topology.start(false);

            let results: Vec<((f64, f64, f64, f64), bool)> = sink
                .elements()
                .iter()
                .map(|element| (*element.data.record(), element.outdated))
                .collect();
            assert_eq!(
                results,
                vec![
                    ((3.4, 3.4, 3.4, 3.4), false),
                    ((2.1, 3.4, 2.1, 3.4), false),
                    ((2.1, 3.4, 3.0, 3.4), false),
                    // The window revokes 3.4 before forwarding 5.7
                    ((2.1, 3.0, 3.0, 2.1), true),
                    ((2.1, 5.7, 5.7, 2.1), false),
                    ((3.0, 5.7, 5.7, 3.0), true),
                    ((3.0, 9.1, 9.1, 3.0), false),
                    ((5.7, 9.1, 9.1, 5.7), true),
                    ((5.7, 9.1, 7.4, 5.7), false),
                ]
            );
        }

        #[test]
        fn grouped_count_over_cycling_keys() {
            let sink = CollectSink::new();
            let topology = Topology::new();
            topology
                .new_stream_from_iter((0..50i64).map(|index| {
                    Tuple::new((format!("KEY#{}", index % 5), index))
                }))
                .key_by(|tuple: &TupleRef<(String, i64)>| {
                    tuple.record().0.clone()
                })
                .group_by::<String, KeyedCount>(Trigger::ByCount(1_000))
                .unwrap()
                .sink(&sink)
                .unwrap();

            topology.start(false);

            let mut results: Vec<(String, i64)> = sink
                .elements()
                .iter()
                .map(|element| element.data.record().clone())
                .collect();
            results.sort();
            assert_eq!(results.len(), 5);
            for (index, (key, count)) in results.iter().enumerate() {
                assert_eq!(key, &format!("KEY#{index}"));
                assert_eq!(*count, 10);
            }
        }

        #[test]
        fn symmetric_hash_join_with_matching_windows() {
            let sink = CollectSink::new();
            let topology = Topology::new();

            let left = topology
                .new_stream_from_iter(
                    (0..10i64).map(|index| Tuple::new((index, index))),
                )
                .sliding_window(WindowSpec::Rows(10), None)
                .unwrap()
                .key_by(|tuple: &TupleRef<(i64, i64)>| tuple.record().0);
            let right = topology
                .new_stream_from_iter(
                    (0..10i64).map(|index| Tuple::new((index, index))),
                )
                .sliding_window(WindowSpec::Rows(10), None)
                .unwrap()
                .key_by(|tuple: &TupleRef<(i64, i64)>| tuple.record().0);

            left.join::<(i64, i64), i64>(right)
                .unwrap()
                .sink(&sink)
                .unwrap();

            topology.start(false);

            let mut results: Vec<(i64, i64, i64, i64)> = sink
                .elements()
                .iter()
                .filter(|element| !element.outdated)
                .map(|element| *element.data.record())
                .collect();
            results.sort_unstable();
            assert_eq!(results.len(), 10);
            for (index, row) in results.iter().enumerate() {
                let expected = i64::try_from(index).unwrap();
                assert_eq!(row, &(expected, expected, expected, expected));
            }
        }

        #[test]
        fn barrier_releases_in_stages() {
            let gate = Gate::new();
            let counter = Arc::new(AtomicI64::new(10));

            let sink = CollectSink::new();
            let topology = Topology::new();
            topology
                .new_stream_from_iter(
                    [1i64, 2, 3, 4, 11, 12, 20, 21, 22]
                        .map(|value| Tuple::new((value,))),
                )
                .barrier(&gate, {
                    let counter = Arc::clone(&counter);
                    move |tuple: &TupleRef<(i64,)>| {
                        tuple.record().0 < counter.load(Ordering::SeqCst)
                    }
                })
                .unwrap()
                .sink(&sink)
                .unwrap();

            topology.start(true);

            assert!(sink.wait_for_count(4, Duration::from_secs(5)));
            thread::sleep(Duration::from_millis(20));
            assert_eq!(sink.elements().len(), 4);

            counter.store(13, Ordering::SeqCst);
            gate.notify();
            assert!(sink.wait_for_count(6, Duration::from_secs(5)));

            counter.store(25, Ordering::SeqCst);
            gate.notify();
            assert!(sink.wait_for_count(9, Duration::from_secs(5)));
            topology.wait();

            let values: Vec<i64> = sink
                .elements()
                .iter()
                .map(|element| element.data.record().0)
                .collect();
            assert_eq!(values, vec![1, 2, 3, 4, 11, 12, 20, 21, 22]);
        }

        #[test]
        fn stream_to_table_and_back() {
            let table: crate::TableRef<i64, TupleRef<(i64, i64)>> =
                crate::Table::new("stations");
            let feed = CollectSink::new();
            let scan = CollectSink::new();

            // Observe the table's change feed while the stream writes it
            let topology = Topology::new();
            topology.new_stream_from_table(&table).sink(&feed).unwrap();
            topology
                .new_stream_from_iter(
                    (0..10i64).map(|value| Tuple::new((value % 5, value))),
                )
                .key_by(|tuple: &TupleRef<(i64, i64)>| tuple.record().0)
                .to_table(&table, false)
                .unwrap()
                .sink(&CollectSink::new())
                .unwrap();
            topology.start(false);

            assert_eq!(table.len(), 5);
            assert!(feed.wait_for_count(10, Duration::from_secs(5)));

            // Scan the materialized rows back into a stream
            let reader = Topology::new();
            reader
                .new_stream_from_select(&table, |row: &TupleRef<(i64, i64)>| {
                    row.record().1 >= 5
                })
                .sink(&scan)
                .unwrap();
            reader.start(false);

            assert_eq!(scan.elements().len(), 5);
            assert_eq!(scan.kinds(), vec![Kind::EndOfStream]);
        }

        #[test]
        fn observes_batches_and_running_state() {
            let seen = Arc::new(std::sync::atomic::AtomicUsize::new(0));
            let sink = CollectSink::new();

            let topology = Topology::new();
            topology
                .new_stream_from_iter(
                    (0..10i64).map(|value| Tuple::new((value,))),
                )
                .notify({
                    let seen = Arc::clone(&seen);
                    move |_: &TupleRef<(i64,)>, _| {
                        seen.fetch_add(1, Ordering::SeqCst);
                    }
                })
                .unwrap()
                .stateful_map(|tuple: &TupleRef<(i64,)>, _, sum: &mut i64| {
                    *sum += tuple.record().0;
                    Tuple::new((tuple.record().0, *sum))
                })
                .unwrap()
                .batch(4)
                .unwrap()
                .sink(&sink)
                .unwrap();

            topology.start(false);

            assert_eq!(seen.load(Ordering::SeqCst), 10);
            let batches = sink.elements();
            assert_eq!(batches.len(), 3);
            assert_eq!(batches[2].data.len(), 2);

            // The running sum reaches 45 in the residual batch
            assert_eq!(batches[2].data[1].data.record(), &(9, 45));
        }

        #[test]
        fn tumbling_window_via_builder() {
            let sink = CollectSink::new();
            let topology = Topology::new();
            topology
                .new_stream_from_iter(
                    (0..6i64).map(|value| Tuple::new((value,))),
                )
                .tumbling_window(WindowSpec::Rows(3), None)
                .unwrap()
                .sink(&sink)
                .unwrap();

            topology.start(false);

            assert_eq!(sink.elements().len(), 12);
            assert_eq!(sink.outdated_count(), 6);
            assert_eq!(
                sink.kinds(),
                vec![Kind::WindowExpired, Kind::WindowExpired]
            );
        }

        #[test]
        fn join_with_residual_predicate() {
            let sink = CollectSink::new();
            let topology = Topology::new();

            let left = topology
                .new_stream_from_iter(
                    (0..4i64).map(|index| Tuple::new((index, index * 10))),
                )
                .key_by(|tuple: &TupleRef<(i64, i64)>| tuple.record().0);
            let right = topology
                .new_stream_from_iter(
                    (0..4i64).map(|index| Tuple::new((index, index * 10 + 5))),
                )
                .key_by(|tuple: &TupleRef<(i64, i64)>| tuple.record().0);

            left.join_where::<(i64, i64), i64, _>(right, |_, right| {
                right.record().1 > 20
            })
            .unwrap()
            .sink(&sink)
            .unwrap();

            topology.start(false);

            let results: Vec<(i64, i64, i64, i64)> = sink
                .elements()
                .iter()
                .map(|element| *element.data.record())
                .collect();
            assert_eq!(results, vec![(2, 20, 2, 25), (3, 30, 3, 35)]);
        }

        #[test]
        fn partition_and_merge_round_trip() {
            let sink = CollectSink::new();
            let topology = Topology::new();
            topology
                .new_stream_from_iter(
                    (0..1000i64).map(|value| Tuple::new((value,))),
                )
                .partition_by(3, |tuple: &TupleRef<(i64,)>| {
                    usize::try_from(tuple.record().0).unwrap_or(0) % 3
                })
                .unwrap()
                .where_(|tuple: &TupleRef<(i64,)>, _| tuple.record().0 % 2 == 0)
                .unwrap()
                .merge()
                .unwrap()
                .sink(&sink)
                .unwrap();

            topology.start(false);

            // Each partition forwards the end-of-stream it received
            assert!(sink.wait_for_count(500, Duration::from_secs(10)));
            let deadline = std::time::Instant::now() + Duration::from_secs(10);
            loop {
                let ends = sink
                    .kinds()
                    .iter()
                    .filter(|kind| **kind == Kind::EndOfStream)
                    .count();
                if ends == 3 {
                    break;
                }
                assert!(std::time::Instant::now() < deadline);
                thread::sleep(Duration::from_millis(5));
            }

            let mut values: Vec<i64> = sink
                .elements()
                .iter()
                .map(|element| element.data.record().0)
                .collect();
            values.sort_unstable();
            assert_eq!(values.len(), 500);
            assert_eq!(
                values,
                (0..1000i64).filter(|value| value % 2 == 0).collect::<Vec<_>>()
            );
        }
    }
}
