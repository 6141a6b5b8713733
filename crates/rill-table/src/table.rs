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

//! Table.

use ahash::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use rill_element::{Key, StreamData};

// ----------------------------------------------------------------------------
// Enumerations
// ----------------------------------------------------------------------------

/// Modification mode reported to observers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// A row was inserted under a new key.
    Insert,
    /// A row replaced an existing key's row.
    Update,
    /// A row was deleted.
    Delete,
}

/// When a registered observer is notified.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationMode {
    /// On each mutation.
    Immediate,
    /// Deferred until [`Table::commit`].
    OnCommit,
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Observer callback.
pub type Observer<D> = Arc<dyn Fn(&D, Mode) + Send + Sync>;

/// Shared handle to a table.
pub type TableRef<K, D> = Arc<Table<K, D>>;

/// Observer registration.
struct Registration<D> {
    /// Observer callback.
    observer: Observer<D>,
    /// Notification mode.
    mode: NotificationMode,
}

/// Table.
///
/// A keyed store of rows shared between stream operators and user code.
/// All row access goes through a single lock, which is never held while
/// observer callbacks run: a callback may therefore publish into a
/// downstream operator that, in turn, writes back to the same table.
///
/// # Examples
///
/// ```
/// use rill_table::Table;
///
/// // Create table and insert a row
/// let table = Table::new("sensors");
/// table.insert(1i64, (1i64, 20.5f64));
/// assert_eq!(table.get(&1), Some((1, 20.5)));
/// ```
pub struct Table<K, D> {
    /// Table name.
    name: String,
    /// Rows by key.
    rows: Mutex<HashMap<K, D>>,
    /// Registered observers.
    observers: Mutex<Vec<Registration<D>>>,
    /// Mutations deferred until commit.
    pending: Mutex<Vec<(D, Mode)>>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<K, D> Table<K, D>
where
    K: Key,
    D: StreamData,
{
    /// Creates a shared table with the given name.
    #[must_use]
    pub fn new(name: &str) -> TableRef<K, D> {
        Arc::new(Self {
            name: name.to_owned(),
            rows: Mutex::new(HashMap::default()),
            observers: Mutex::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
        })
    }

    /// Returns the table name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the row stored under the key.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<D> {
        let rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        rows.get(key).cloned()
    }

    /// Inserts or updates the row stored under the key.
    ///
    /// Observers are notified with [`Mode::Insert`] for a new key and
    /// [`Mode::Update`] for a replaced row.
    pub fn insert(&self, key: K, row: D) {
        let mode = {
            let mut rows =
                self.rows.lock().unwrap_or_else(PoisonError::into_inner);
            match rows.insert(key, row.clone()) {
                Some(_) => Mode::Update,
                None => Mode::Insert,
            }
        };
        self.notify(row, mode);
    }

    /// Deletes the row stored under the key.
    ///
    /// Returns whether a row was present. Observers are notified with the
    /// deleted row and [`Mode::Delete`].
    pub fn delete_by_key(&self, key: &K) -> bool {
        let removed = {
            let mut rows =
                self.rows.lock().unwrap_or_else(PoisonError::into_inner);
            rows.remove(key)
        };
        match removed {
            Some(row) => {
                self.notify(row, Mode::Delete);
                true
            }
            None => false,
        }
    }

    /// Returns a snapshot of all rows satisfying the predicate.
    ///
    /// The snapshot is taken under the row lock and iterated without it, so
    /// the caller may mutate the table while consuming the result.
    #[must_use]
    pub fn select<P>(&self, predicate: P) -> Vec<D>
    where
        P: Fn(&D) -> bool,
    {
        let rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        rows.values().filter(|row| predicate(row)).cloned().collect()
    }

    /// Returns a snapshot of all rows.
    #[must_use]
    pub fn select_all(&self) -> Vec<D> {
        self.select(|_| true)
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        let rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        rows.len()
    }

    /// Returns whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registers an observer with the given notification mode.
    pub fn register_observer(&self, observer: Observer<D>, mode: NotificationMode) {
        let mut observers =
            self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        observers.push(Registration { observer, mode });
    }

    /// Delivers all deferred mutations to on-commit observers.
    pub fn commit(&self) {
        let deferred: Vec<_> = {
            let mut pending =
                self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            pending.drain(..).collect()
        };
        if deferred.is_empty() {
            return;
        }

        let observers = self.snapshot(NotificationMode::OnCommit);
        for (row, mode) in &deferred {
            for observer in &observers {
                observer(row, *mode);
            }
        }
    }

    /// Notifies observers of a mutation.
    ///
    /// Immediate observers are invoked from a snapshot of the observer list,
    /// with neither the row lock nor the observer lock held. On-commit
    /// observers only see the mutation once [`Table::commit`] runs.
    fn notify(&self, row: D, mode: Mode) {
        // Only defer if anyone will ever consume the backlog
        if !self.snapshot(NotificationMode::OnCommit).is_empty() {
            let mut pending =
                self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            pending.push((row.clone(), mode));
        }

        for observer in self.snapshot(NotificationMode::Immediate) {
            observer(&row, mode);
        }
    }

    /// Returns a snapshot of the observers registered with the given mode.
    fn snapshot(&self, mode: NotificationMode) -> Vec<Observer<D>> {
        let observers =
            self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        observers
            .iter()
            .filter(|registration| registration.mode == mode)
            .map(|registration| Arc::clone(&registration.observer))
            .collect()
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<K, D> fmt::Debug for Table<K, D>
where
    K: Key,
    D: StreamData,
{
    /// Formats the table for debugging.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("rows", &self.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    mod table {
        use std::sync::{Arc, Mutex};

        use crate::table::{Mode, NotificationMode, Table};

        #[test]
        fn reports_insert_update_delete() {
            let trace = Arc::new(Mutex::new(Vec::new()));
            let table = Table::new("trace");

            let log = Arc::clone(&trace);
            table.register_observer(
                Arc::new(move |row: &(i64, i64), mode| {
                    log.lock().unwrap().push((*row, mode));
                }),
                NotificationMode::Immediate,
            );

            table.insert(1, (1, 10));
            table.insert(1, (1, 11));
            assert!(table.delete_by_key(&1));
            assert!(!table.delete_by_key(&1));

            assert_eq!(
                *trace.lock().unwrap(),
                vec![
                    ((1, 10), Mode::Insert),
                    ((1, 11), Mode::Update),
                    ((1, 11), Mode::Delete),
                ]
            );
        }

        #[test]
        fn defers_until_commit() {
            let trace = Arc::new(Mutex::new(Vec::new()));
            let table = Table::new("deferred");

            let log = Arc::clone(&trace);
            table.register_observer(
                Arc::new(move |row: &(i64,), mode| {
                    log.lock().unwrap().push((*row, mode));
                }),
                NotificationMode::OnCommit,
            );

            table.insert(1, (1,));
            table.insert(2, (2,));
            assert!(trace.lock().unwrap().is_empty());

            table.commit();
            assert_eq!(
                *trace.lock().unwrap(),
                vec![((1,), Mode::Insert), ((2,), Mode::Insert)]
            );

            // Nothing left to deliver
            table.commit();
            assert_eq!(trace.lock().unwrap().len(), 2);
        }

        #[test]
        fn selects_snapshot() {
            let table = Table::new("numbers");
            for value in 0..10i64 {
                table.insert(value, (value,));
            }

            let mut even = table.select(|row| row.0 % 2 == 0);
            even.sort_unstable();
            assert_eq!(even, vec![(0,), (2,), (4,), (6,), (8,)]);
            assert_eq!(table.len(), 10);
        }

        #[test]
        fn observer_may_write_back() {
            let table = Table::new("reentrant");
            let clone = Arc::clone(&table);

            table.register_observer(
                Arc::new(move |row: &(i64,), mode| {
                    // Mirror inserts under a shifted key, the kind of
                    // re-entrant write a downstream operator may perform
                    if mode == Mode::Insert && row.0 < 100 {
                        clone.insert(row.0 + 100, (row.0 + 100,));
                    }
                }),
                NotificationMode::Immediate,
            );

            table.insert(1, (1,));
            assert_eq!(table.len(), 2);
            assert_eq!(table.get(&101), Some((101,)));
        }
    }
}
