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

//! Stream/table bridge operators.

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError, Weak};

use rill_element::{Element, Key, Kind, Punctuation, StreamData};
use rill_executor::Worker;
use rill_pubsub::{
    BaseOp, Discipline, Inlet, Outlet, Publish, Source, SourceError, Subscribe,
};
use rill_table::{Mode, TableRef};

use crate::ops::KeyFn;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Table writing operator.
///
/// Materializes a stream into a table: a non-outdated element is inserted
/// or updated under its extracted key, an outdated element deletes the
/// key. With auto-commit enabled, each element is wrapped in a private
/// commit so on-commit observers see it immediately. Elements are
/// forwarded downstream either way.
pub struct ToTable<K, D>
where
    K: Key,
    D: StreamData,
{
    /// Target table.
    table: TableRef<K, D>,
    /// Key extractor.
    key: KeyFn<D, K>,
    /// Whether each element commits on its own.
    auto_commit: bool,
    /// Input endpoints.
    inlet: Inlet<D>,
    /// Output endpoints.
    outlet: Outlet<D>,
}

/// Bounded change feed between a table observer and a worker thread.
struct Feed<D> {
    /// Buffered changes.
    buffer: Mutex<VecDeque<(D, bool)>>,
    /// Capacity of the buffer.
    capacity: usize,
    /// Signals an item became available.
    available: Condvar,
    /// Signals space became available.
    space: Condvar,
    /// Whether the feed was stopped.
    stopped: AtomicBool,
}

/// Table change source.
///
/// Subscribes to a table's change notifications and republishes them as a
/// stream: every insert or update becomes a non-outdated element, every
/// delete an outdated one. A bounded in-memory feed and a worker thread
/// decouple the table's notifier from the downstream operator, so a table
/// writer is never blocked by slow consumers beyond the feed capacity.
pub struct FromTable<K, D>
where
    K: Key,
    D: StreamData,
{
    /// Change feed shared with the observer and the worker.
    feed: Arc<Feed<D>>,
    /// Worker thread draining the feed.
    worker: Mutex<Option<Worker>>,
    /// Output endpoints, shared with the worker.
    outlet: Arc<Outlet<D>>,
    /// Key type marker.
    marker: PhantomData<fn(K)>,
}

/// Table scanning source.
///
/// Iterates the table under an optional predicate at start, emits each row
/// once as a non-outdated element, then publishes end-of-stream.
pub struct SelectFromTable<K, D>
where
    K: Key,
    D: StreamData,
{
    /// Source table.
    table: TableRef<K, D>,
    /// Row predicate, if any.
    predicate: Option<Box<dyn Fn(&D) -> bool + Send + Sync>>,
    /// Output endpoints.
    outlet: Outlet<D>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<K, D> ToTable<K, D>
where
    K: Key,
    D: StreamData,
{
    /// Creates a table writer with the given key extractor.
    pub fn new(
        table: TableRef<K, D>,
        key: KeyFn<D, K>,
        auto_commit: bool,
    ) -> Arc<Self> {
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
                table,
                key,
                auto_commit,
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
        let key = (self.key)(&element.data);
        if element.outdated {
            self.table.delete_by_key(&key);
        } else {
            self.table.insert(key, element.data.clone());
        }
        if self.auto_commit {
            self.table.commit();
        }
        self.outlet.publish_element(element);
    }
}

// ----------------------------------------------------------------------------

impl<D> Feed<D> {
    /// Creates a feed with the given capacity.
    fn new(capacity: usize) -> Self {
        Self {
            buffer: Mutex::new(VecDeque::new()),
            capacity,
            available: Condvar::new(),
            space: Condvar::new(),
            stopped: AtomicBool::new(false),
        }
    }

    /// Pushes a change, blocking while the feed is at capacity.
    fn push(&self, item: (D, bool)) {
        let mut buffer =
            self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        while buffer.len() >= self.capacity {
            if self.stopped.load(Ordering::SeqCst) {
                return;
            }
            buffer = self
                .space
                .wait(buffer)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        buffer.push_back(item);
        self.available.notify_one();
    }

    /// Pops the next change, blocking until one arrives or the feed stops.
    fn pop(&self) -> Option<(D, bool)> {
        let mut buffer =
            self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(item) = buffer.pop_front() {
                self.space.notify_one();
                return Some(item);
            }
            if self.stopped.load(Ordering::SeqCst) {
                return None;
            }
            buffer = self
                .available
                .wait(buffer)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Stops the feed, waking producer and consumer.
    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let _held = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        self.available.notify_all();
        self.space.notify_all();
    }
}

// ----------------------------------------------------------------------------

impl<K, D> FromTable<K, D>
where
    K: Key,
    D: StreamData,
{
    /// Default feed capacity.
    pub const DEFAULT_CAPACITY: usize = 4_096;

    /// Creates a change source observing the given table.
    #[must_use]
    pub fn new(table: &TableRef<K, D>) -> Arc<Self> {
        Self::with_capacity(table, Self::DEFAULT_CAPACITY)
    }

    /// Creates a change source with the given feed capacity.
    ///
    /// # Panics
    ///
    /// Panics if the capacity is zero.
    #[must_use]
    pub fn with_capacity(table: &TableRef<K, D>, capacity: usize) -> Arc<Self> {
        assert!(capacity > 0, "feed capacity must be positive");
        let feed = Arc::new(Feed::new(capacity));
        let outlet = Arc::new(Outlet::new());

        // The observer holds only the feed, so the operator can drop while
        // the table lives on; a stopped feed swallows further changes
        {
            let feed = Arc::clone(&feed);
            table.register_observer(
                Arc::new(move |row: &D, mode| {
                    feed.push((row.clone(), mode == Mode::Delete));
                }),
                rill_table::NotificationMode::Immediate,
            );
        }

        let worker = {
            let feed = Arc::clone(&feed);
            let outlet = Arc::clone(&outlet);
            Worker::spawn("from-table", move || {
                while let Some((data, outdated)) = feed.pop() {
                    outlet.publish(data, outdated);
                }
            })
        };

        Arc::new(Self {
            feed,
            worker: Mutex::new(Some(worker)),
            outlet,
            marker: PhantomData,
        })
    }

    /// Stops the change feed and joins the worker.
    pub fn stop(&self) {
        self.feed.stop();
        let mut worker =
            self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut worker) = worker.take() {
            worker.join();
        }
    }
}

// ----------------------------------------------------------------------------

impl<K, D> SelectFromTable<K, D>
where
    K: Key,
    D: StreamData,
{
    /// Creates a scanning source over all rows.
    #[must_use]
    pub fn new(table: TableRef<K, D>) -> Arc<Self> {
        Arc::new(Self { table, predicate: None, outlet: Outlet::new() })
    }

    /// Creates a scanning source over rows satisfying the predicate.
    pub fn with_predicate<P>(table: TableRef<K, D>, predicate: P) -> Arc<Self>
    where
        P: Fn(&D) -> bool + Send + Sync + 'static,
    {
        Arc::new(Self {
            table,
            predicate: Some(Box::new(predicate)),
            outlet: Outlet::new(),
        })
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<K, D> BaseOp for ToTable<K, D>
where
    K: Key,
    D: StreamData,
{
    fn name(&self) -> &str {
        "ToTable"
    }
}

impl<K, D> Publish<D> for ToTable<K, D>
where
    K: Key,
    D: StreamData,
{
    #[inline]
    fn outlet(&self) -> &Outlet<D> {
        &self.outlet
    }
}

impl<K, D> Subscribe<D> for ToTable<K, D>
where
    K: Key,
    D: StreamData,
{
    #[inline]
    fn inlet(&self) -> &Inlet<D> {
        &self.inlet
    }
}

// ----------------------------------------------------------------------------

impl<K, D> Drop for FromTable<K, D>
where
    K: Key,
    D: StreamData,
{
    /// Stops the change feed and joins the worker.
    fn drop(&mut self) {
        self.stop();
    }
}

impl<K, D> BaseOp for FromTable<K, D>
where
    K: Key,
    D: StreamData,
{
    fn name(&self) -> &str {
        "FromTable"
    }
}

impl<K, D> Publish<D> for FromTable<K, D>
where
    K: Key,
    D: StreamData,
{
    #[inline]
    fn outlet(&self) -> &Outlet<D> {
        &self.outlet
    }
}

// ----------------------------------------------------------------------------

impl<K, D> BaseOp for SelectFromTable<K, D>
where
    K: Key,
    D: StreamData,
{
    fn name(&self) -> &str {
        "SelectFromTable"
    }
}

impl<K, D> Publish<D> for SelectFromTable<K, D>
where
    K: Key,
    D: StreamData,
{
    #[inline]
    fn outlet(&self) -> &Outlet<D> {
        &self.outlet
    }
}

impl<K, D> Source<D> for SelectFromTable<K, D>
where
    K: Key,
    D: StreamData,
{
    /// Scans the table and returns the number of emitted rows.
    fn start(&self) -> Result<u64, SourceError> {
        let rows = match &self.predicate {
            Some(predicate) => self.table.select(predicate),
            None => self.table.select_all(),
        };

        let count = rows.len() as u64;
        for row in rows {
            self.outlet.publish(row, false);
        }
        self.outlet
            .publish_punctuation(Punctuation::new(Kind::EndOfStream));
        Ok(count)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
