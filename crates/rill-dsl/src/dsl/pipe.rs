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

//! Pipe.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use rill_element::{
    Concat, Key, Punctuation, Record, StreamData, Timestamp, Tuple, TupleRef,
};
use rill_ops::ops::join::JoinPredicateFn;
use rill_ops::{
    AggregateState, Aggregation, Barrier, Batch, Batcher, Gate,
    GroupedAggregation, KeyFn, Map, Merge, Notify, PartitionBy, Queue, SHJoin,
    SlidingWindow, StatefulMap, TimestampFn, ToTable, Trigger, TumblingWindow,
    Where, WindowSpec,
};
use rill_pubsub::{link, link_left, link_right, BaseOp, Publish, Subscribe};
use rill_table::TableRef;

use super::dataflow::Dataflow;
use super::error::{Error, Result};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Tail of a pipe.
///
/// Encodes the partitioning state: a plain tail, the partitioning operator
/// right after `partition_by`, or the parallel per-partition tails once an
/// operator was fanned out behind it.
#[derive(Clone)]
enum Tail<D> {
    /// A single tail operator.
    One(Arc<dyn Publish<D>>),
    /// A partitioning operator awaiting its first fanned-out operator.
    Split(Arc<PartitionBy<D>>),
    /// One parallel tail operator per partition.
    Fanned(Vec<Arc<dyn Publish<D>>>),
}

/// The facets of a freshly built operator.
struct Built<D, U> {
    /// Subscribing side, linked behind the tail.
    subscribe: Arc<dyn Subscribe<D>>,
    /// Publishing side, becoming the new tail.
    publish: Arc<dyn Publish<U>>,
    /// Registry handle.
    base: Arc<dyn BaseOp>,
}

/// Pipe.
///
/// A sequence of operators applied to a data stream. Each builder method
/// connects a new operator behind the current tail and returns a new pipe
/// sharing the same dataflow; in partitioned state, it constructs one
/// operator instance per partition instead. Key and timestamp extractors
/// are held type-erased, since the builder does not yet know the key type
/// of downstream operators; they are re-typed at the step that consumes
/// them, and a mismatch is a configuration error.
pub struct Pipe<D>
where
    D: StreamData,
{
    /// Shared dataflow.
    dataflow: Arc<Dataflow>,
    /// Current tail.
    tail: Tail<D>,
    /// Type-erased key extractor.
    key_fn: Option<Arc<dyn Any + Send + Sync>>,
    /// Type-erased timestamp extractor.
    ts_fn: Option<Arc<dyn Any + Send + Sync>>,
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Splits a freshly built operator into its facets.
fn built<O, D, U>(op: Arc<O>) -> Built<D, U>
where
    O: Subscribe<D> + Publish<U> + 'static,
    D: StreamData,
    U: StreamData,
{
    let subscribe: Arc<dyn Subscribe<D>> = op.clone();
    let publish: Arc<dyn Publish<U>> = op.clone();
    Built { subscribe, publish, base: op }
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<D> Pipe<D>
where
    D: StreamData,
{
    /// Creates a pipe rooted at the given publisher.
    pub(crate) fn new(dataflow: Arc<Dataflow>, root: Arc<dyn Publish<D>>) -> Self {
        Self {
            dataflow,
            tail: Tail::One(root),
            key_fn: None,
            ts_fn: None,
        }
    }

    /// Assigns a key extractor for subsequent keyed operators.
    ///
    /// The extractor is held type-erased and re-typed by the step that
    /// consumes it, e.g. `group_by` or `join`.
    #[must_use]
    pub fn key_by<K, F>(mut self, f: F) -> Self
    where
        K: Key,
        F: Fn(&D) -> K + Send + Sync + 'static,
    {
        let function: KeyFn<D, K> = Arc::new(f);
        self.key_fn = Some(Arc::new(function));
        self
    }

    /// Assigns a timestamp extractor for subsequent time-based operators.
    #[must_use]
    pub fn assign_timestamps<F>(mut self, f: F) -> Self
    where
        F: Fn(&D) -> Timestamp + Send + Sync + 'static,
    {
        let function: TimestampFn<D> = Arc::new(f);
        self.ts_fn = Some(Arc::new(function));
        self
    }

    /// Appends a filter operator.
    ///
    /// # Errors
    ///
    /// Returns an error if the operator cannot be wired.
    pub fn where_<P>(self, predicate: P) -> Result<Self>
    where
        P: Fn(&D, bool) -> bool + Send + Sync + Clone + 'static,
    {
        self.attach(move || built(Where::new(predicate.clone())))
    }

    /// Appends a projection operator.
    ///
    /// # Errors
    ///
    /// Returns an error if the operator cannot be wired.
    pub fn map<U, F>(self, f: F) -> Result<Pipe<U>>
    where
        U: StreamData,
        F: Fn(&D, bool) -> U + Send + Sync + Clone + 'static,
    {
        self.attach(move || built(Map::new(f.clone())))
    }

    /// Appends a stateful projection operator.
    ///
    /// # Errors
    ///
    /// Returns an error if the operator cannot be wired.
    pub fn stateful_map<U, S, F>(self, f: F) -> Result<Pipe<U>>
    where
        U: StreamData,
        S: Default + Send + 'static,
        F: Fn(&D, bool, &mut S) -> U + Send + Sync + Clone + 'static,
    {
        self.attach(move || built(StatefulMap::new(f.clone())))
    }

    /// Appends a notify operator invoking the callback per element.
    ///
    /// # Errors
    ///
    /// Returns an error if the operator cannot be wired.
    pub fn notify<F>(self, callback: F) -> Result<Self>
    where
        F: Fn(&D, bool) + Send + Sync + Clone + 'static,
    {
        self.attach(move || built(Notify::new(callback.clone())))
    }

    /// Appends a notify operator observing punctuations as well.
    ///
    /// # Errors
    ///
    /// Returns an error if the operator cannot be wired.
    pub fn notify_with_punctuation<F, P>(
        self,
        callback: F,
        punctuation: P,
    ) -> Result<Self>
    where
        F: Fn(&D, bool) + Send + Sync + Clone + 'static,
        P: Fn(&Punctuation) + Send + Sync + Clone + 'static,
    {
        self.attach(move || {
            built(Notify::with_punctuation(
                callback.clone(),
                punctuation.clone(),
            ))
        })
    }

    /// Appends a queue operator decoupling producer and consumer threads.
    ///
    /// # Errors
    ///
    /// Returns an error if the operator cannot be wired.
    pub fn queue(self) -> Result<Self> {
        self.attach(|| built(Queue::new()))
    }

    /// Appends a batcher emitting one element per full batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the operator cannot be wired.
    pub fn batch(self, size: usize) -> Result<Pipe<Batch<D>>> {
        self.attach(move || built(Batcher::new(size)))
    }

    /// Appends a barrier gated by the given predicate.
    ///
    /// # Errors
    ///
    /// Returns an error if the operator cannot be wired.
    pub fn barrier<P>(self, gate: &Arc<Gate>, predicate: P) -> Result<Self>
    where
        P: Fn(&D) -> bool + Send + Sync + Clone + 'static,
    {
        let gate = Arc::clone(gate);
        self.attach(move || {
            built(Barrier::new(Arc::clone(&gate), predicate.clone()))
        })
    }

    /// Appends a sliding window operator.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a range window without a
    /// matching timestamp extractor.
    pub fn sliding_window(
        self,
        spec: WindowSpec,
        evict_every: Option<Duration>,
    ) -> Result<Self> {
        match spec {
            WindowSpec::Rows(size) => {
                self.attach(move || built(SlidingWindow::rows(size, evict_every)))
            }
            WindowSpec::Range(width) => {
                let extractor = self.typed_timestamp_fn()?;
                self.attach(move || {
                    built(SlidingWindow::range(
                        width,
                        extractor.clone(),
                        evict_every,
                    ))
                })
            }
        }
    }

    /// Appends a tumbling window operator.
    ///
    /// The eviction interval only applies to range windows; row windows
    /// are driven purely by their element count.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a range window without a
    /// matching timestamp extractor.
    pub fn tumbling_window(
        self,
        spec: WindowSpec,
        evict_every: Option<Duration>,
    ) -> Result<Self> {
        match spec {
            WindowSpec::Rows(size) => {
                self.attach(move || built(TumblingWindow::rows(size)))
            }
            WindowSpec::Range(width) => {
                let extractor = self.typed_timestamp_fn()?;
                self.attach(move || {
                    built(TumblingWindow::range(
                        width,
                        extractor.clone(),
                        evict_every,
                    ))
                })
            }
        }
    }

    /// Appends an ungrouped aggregation with the given trigger.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a timestamp trigger without a
    /// matching timestamp extractor.
    pub fn aggregate<S>(self, trigger: Trigger) -> Result<Pipe<S::Output>>
    where
        S: AggregateState<D>,
    {
        match trigger {
            Trigger::ByTimestamp(interval) => {
                let extractor = self.typed_timestamp_fn()?;
                self.attach(move || {
                    built(Aggregation::<D, S>::by_timestamp(
                        interval,
                        extractor.clone(),
                    ))
                })
            }
            _ => self.attach(move || built(Aggregation::<D, S>::new(trigger))),
        }
    }

    /// Appends a grouped aggregation keyed by the assigned key extractor.
    ///
    /// # Errors
    ///
    /// Returns a configuration error without a matching key extractor, or
    /// for a timestamp trigger without a matching timestamp extractor.
    pub fn group_by<K, S>(self, trigger: Trigger) -> Result<Pipe<S::Output>>
    where
        K: Key,
        S: AggregateState<D>,
    {
        let key = self.typed_key_fn::<K>()?;
        match trigger {
            Trigger::ByTimestamp(interval) => {
                let extractor = self.typed_timestamp_fn()?;
                self.attach(move || {
                    built(GroupedAggregation::<D, K, S>::by_timestamp(
                        key.clone(),
                        interval,
                        extractor.clone(),
                    ))
                })
            }
            _ => self.attach(move || {
                built(GroupedAggregation::<D, K, S>::new(key.clone(), trigger))
            }),
        }
    }

    /// Appends a table writer keyed by the assigned key extractor.
    ///
    /// # Errors
    ///
    /// Returns a configuration error without a matching key extractor.
    pub fn to_table<K>(
        self,
        table: &TableRef<K, D>,
        auto_commit: bool,
    ) -> Result<Self>
    where
        K: Key,
    {
        let key = self.typed_key_fn::<K>()?;
        let table = Arc::clone(table);
        self.attach(move || {
            built(ToTable::new(Arc::clone(&table), key.clone(), auto_commit))
        })
    }

    /// Appends a partitioning operator fanning out into parallel subpipes.
    ///
    /// Subsequent operators are instantiated once per partition, each
    /// behind a queue so the partition executes on its own thread, until
    /// `merge` collects the partitions back into one stream.
    ///
    /// # Errors
    ///
    /// Returns a wiring error if the pipe is already partitioned.
    pub fn partition_by<F>(self, partitions: usize, f: F) -> Result<Self>
    where
        F: Fn(&D) -> usize + Send + Sync + 'static,
    {
        let Tail::One(publisher) = self.tail else {
            return Err(Error::Wiring(
                "cannot re-partition an already partitioned pipe".into(),
            ));
        };

        let split = PartitionBy::new(partitions, f);
        link(publisher.outlet(), split.inlet());
        self.dataflow.add_publisher(split.clone());
        Ok(Self {
            dataflow: self.dataflow,
            tail: Tail::Split(split),
            key_fn: self.key_fn,
            ts_fn: self.ts_fn,
        })
    }

    /// Appends a merge collecting all partitions into one stream.
    ///
    /// # Errors
    ///
    /// Returns a wiring error if the pipe is not partitioned.
    pub fn merge(self) -> Result<Self> {
        let merge = Merge::new();
        match &self.tail {
            Tail::One(_) => {
                return Err(Error::Wiring(
                    "merge requires a partitioned pipe".into(),
                ));
            }
            Tail::Split(split) => {
                for partition in 0..split.partitions() {
                    link(split.outlet(partition), merge.inlet());
                }
            }
            Tail::Fanned(publishers) => {
                for publisher in publishers {
                    link(publisher.outlet(), merge.inlet());
                }
            }
        }

        self.dataflow.add_publisher(merge.clone());
        Ok(Self {
            dataflow: self.dataflow,
            tail: Tail::One(merge),
            key_fn: self.key_fn,
            ts_fn: self.ts_fn,
        })
    }

    /// Attaches a sink behind the tail.
    ///
    /// With parallel tails, the single sink instance subscribes to all of
    /// them and must therefore be synchronized.
    ///
    /// # Errors
    ///
    /// Returns a wiring error directly behind `partition_by`.
    pub fn sink<S>(self, op: &Arc<S>) -> Result<Self>
    where
        S: Subscribe<D> + 'static,
    {
        match &self.tail {
            Tail::One(publisher) => link(publisher.outlet(), op.inlet()),
            Tail::Split(_) => {
                return Err(Error::Wiring(
                    "cannot attach a sink directly behind partition_by".into(),
                ));
            }
            Tail::Fanned(publishers) => {
                for publisher in publishers {
                    link(publisher.outlet(), op.inlet());
                }
            }
        }

        self.dataflow.add_sink(op.clone());
        Ok(self)
    }

    /// Attaches one operator, or one per partition when fanned out.
    fn attach<U, F>(self, make: F) -> Result<Pipe<U>>
    where
        U: StreamData,
        F: Fn() -> Built<D, U>,
    {
        let tail = match self.tail {
            Tail::One(publisher) => {
                let op = make();
                link(publisher.outlet(), op.subscribe.inlet());
                self.dataflow.add_publisher(op.base);
                Tail::One(op.publish)
            }
            Tail::Split(split) => {
                // First operator behind the partitioning: decouple each
                // partition with a queue so it runs on its own thread
                let mut tails = Vec::with_capacity(split.partitions());
                for partition in 0..split.partitions() {
                    let queue = Queue::<D>::new();
                    link(split.outlet(partition), queue.inlet());
                    self.dataflow.add_publisher(queue.clone());

                    let op = make();
                    link(Publish::outlet(&*queue), op.subscribe.inlet());
                    self.dataflow.add_publisher(op.base);
                    tails.push(op.publish);
                }
                Tail::Fanned(tails)
            }
            Tail::Fanned(publishers) => {
                let mut tails = Vec::with_capacity(publishers.len());
                for publisher in publishers {
                    let op = make();
                    link(publisher.outlet(), op.subscribe.inlet());
                    self.dataflow.add_publisher(op.base);
                    tails.push(op.publish);
                }
                Tail::Fanned(tails)
            }
        };

        Ok(Pipe {
            dataflow: self.dataflow,
            tail,
            key_fn: self.key_fn,
            ts_fn: self.ts_fn,
        })
    }

    /// Re-types the assigned key extractor against the current element.
    fn typed_key_fn<K>(&self) -> Result<KeyFn<D, K>>
    where
        K: Key,
    {
        let Some(erased) = &self.key_fn else {
            return Err(Error::Configuration(
                "no key extractor assigned; call key_by first".into(),
            ));
        };
        erased
            .downcast_ref::<KeyFn<D, K>>()
            .cloned()
            .ok_or_else(|| {
                Error::Configuration(
                    "key extractor does not match the element and key types"
                        .into(),
                )
            })
    }

    /// Re-types the assigned timestamp extractor against the current element.
    fn typed_timestamp_fn(&self) -> Result<TimestampFn<D>> {
        let Some(erased) = &self.ts_fn else {
            return Err(Error::Configuration(
                "no timestamp extractor assigned; call assign_timestamps first"
                    .into(),
            ));
        };
        erased
            .downcast_ref::<TimestampFn<D>>()
            .cloned()
            .ok_or_else(|| {
                Error::Configuration(
                    "timestamp extractor does not match the element type".into(),
                )
            })
    }
}

// ----------------------------------------------------------------------------

impl<L> Pipe<TupleRef<L>>
where
    L: Record,
{
    /// Appends a symmetric hash join with the given pipe.
    ///
    /// Both pipes must have key extractors of the same key type assigned;
    /// the output tuple is the concatenation of both input tuples.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if either side misses a matching key
    /// extractor, or a wiring error if either side is partitioned or the
    /// pipes belong to different topologies.
    pub fn join<R, K>(
        self,
        other: Pipe<TupleRef<R>>,
    ) -> Result<Pipe<TupleRef<L::Output>>>
    where
        R: Record,
        K: Key,
        L: Concat<R>,
    {
        self.join_impl::<R, K>(other, None)
    }

    /// Appends a symmetric hash join with a residual predicate.
    ///
    /// # Errors
    ///
    /// See [`Pipe::join`].
    pub fn join_where<R, K, P>(
        self,
        other: Pipe<TupleRef<R>>,
        predicate: P,
    ) -> Result<Pipe<TupleRef<L::Output>>>
    where
        R: Record,
        K: Key,
        L: Concat<R>,
        P: Fn(&TupleRef<L>, &TupleRef<R>) -> bool + Send + Sync + 'static,
    {
        self.join_impl::<R, K>(other, Some(Box::new(predicate)))
    }

    /// Builds and wires the join operator.
    fn join_impl<R, K>(
        self,
        other: Pipe<TupleRef<R>>,
        predicate: Option<JoinPredicateFn<L, R>>,
    ) -> Result<Pipe<TupleRef<L::Output>>>
    where
        R: Record,
        K: Key,
        L: Concat<R>,
    {
        if !Arc::ptr_eq(&self.dataflow, &other.dataflow) {
            return Err(Error::Wiring(
                "join inputs belong to different topologies".into(),
            ));
        }
        let left_key = self.typed_key_fn::<K>()?;
        let right_key = other.typed_key_fn::<K>()?;

        let (Tail::One(left), Tail::One(right)) = (self.tail, other.tail)
        else {
            return Err(Error::Wiring(
                "join requires unpartitioned inputs".into(),
            ));
        };

        let join = SHJoin::new(
            left_key,
            right_key,
            predicate,
            |left: &TupleRef<L>, right: &TupleRef<R>| Tuple::concat(left, right),
        );
        link_left(left.outlet(), join.inlet());
        link_right(right.outlet(), join.inlet());
        self.dataflow.add_publisher(join.clone());

        Ok(Pipe {
            dataflow: self.dataflow,
            tail: Tail::One(join),
            key_fn: None,
            ts_fn: None,
        })
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<D> Clone for Pipe<D>
where
    D: StreamData,
{
    /// Clones the pipe, sharing the dataflow and tail.
    fn clone(&self) -> Self {
        Self {
            dataflow: Arc::clone(&self.dataflow),
            tail: self.tail.clone(),
            key_fn: self.key_fn.clone(),
            ts_fn: self.ts_fn.clone(),
        }
    }
}
