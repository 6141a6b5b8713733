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

//! Source thread set.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};
use std::thread::{Builder, JoinHandle};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Source thread set.
///
/// The collection of per-source threads spawned by an asynchronous topology
/// start. Every source runs to completion on its own fresh thread; panics
/// from user callables are caught per thread, so one source aborting its
/// run never takes down the others. Waiting drains and joins all handles,
/// summing the element counts the sources returned.
///
/// # Examples
///
/// ```
/// use rill_executor::SourceSet;
///
/// // Spawn two sources and wait for both
/// let sources = SourceSet::new();
/// sources.spawn("a", || 2);
/// sources.spawn("b", || 3);
/// assert_eq!(sources.wait(), 5);
/// ```
pub struct SourceSet {
    /// Join handles of the source threads.
    threads: Mutex<Vec<JoinHandle<u64>>>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl SourceSet {
    /// Creates an empty source thread set.
    #[must_use]
    pub fn new() -> Self {
        Self { threads: Mutex::new(Vec::new()) }
    }

    /// Spawns a source thread with the given name.
    ///
    /// # Panics
    ///
    /// Panics if thread creation fails, as the capability to spawn threads
    /// is a fundamental requirement of the engine.
    pub fn spawn<F>(&self, name: &str, f: F)
    where
        F: FnOnce() -> u64 + Send + 'static,
    {
        let handle = Builder::new()
            .name(format!("rill/source/{name}"))
            .spawn(move || {
                // A panicking user callable aborts this source's run; state
                // reachable from the closure is abandoned mid-publication
                panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or(0)
            })
            .unwrap();

        let mut threads =
            self.threads.lock().unwrap_or_else(PoisonError::into_inner);
        threads.push(handle);
    }

    /// Waits for all source threads and returns the summed element count.
    pub fn wait(&self) -> u64 {
        let handles: Vec<_> = {
            let mut threads =
                self.threads.lock().unwrap_or_else(PoisonError::into_inner);
            threads.drain(..).collect()
        };
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or(0))
            .sum()
    }

    /// Returns the number of outstanding source threads.
    #[must_use]
    pub fn len(&self) -> usize {
        let threads =
            self.threads.lock().unwrap_or_else(PoisonError::into_inner);
        threads.len()
    }

    /// Returns whether there are no outstanding source threads.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Default for SourceSet {
    /// Creates an empty source thread set.
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SourceSet {
    /// Waits for all source threads to finish.
    fn drop(&mut self) {
        self.wait();
    }
}

impl fmt::Debug for SourceSet {
    /// Formats the source thread set for debugging.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SourceSet")
            .field("outstanding", &self.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    mod sources {
        use crate::executor::sources::SourceSet;

        #[test]
        fn sums_counts() {
            let sources = SourceSet::new();
            for count in 1..=4 {
                sources.spawn("count", move || count);
            }
            assert_eq!(sources.wait(), 10);
            assert!(sources.is_empty());
        }

        #[test]
        fn isolates_panics() {
            let sources = SourceSet::new();
            sources.spawn("ok", || 7);
            sources.spawn("bad", || panic!("predicate failed"));
            assert_eq!(sources.wait(), 7);
        }
    }
}
