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

//! Periodic notifier.

use crossbeam::channel::{bounded, RecvTimeoutError, Sender};
use std::fmt;
use std::thread::{Builder, JoinHandle};
use std::time::Duration;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Periodic notifier.
///
/// A dedicated thread that invokes a callback every interval, used by
/// windows with an eviction interval and by aggregations with wall-clock
/// triggers. The shutdown token is the channel held by the handle: the
/// thread performs its timed wait on the receiver, so dropping the handle
/// wakes it up immediately and joins it before the owning operator's state
/// is destroyed.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
/// use rill_executor::Periodic;
///
/// // Create notifier counting its ticks
/// let count = Arc::new(AtomicUsize::new(0));
/// let ticks = Arc::clone(&count);
/// let periodic = Periodic::spawn("doc", Duration::from_millis(1), move || {
///     ticks.fetch_add(1, Ordering::SeqCst);
/// });
///
/// // Dropping the handle stops the thread
/// drop(periodic);
/// ```
pub struct Periodic {
    /// Shutdown sender, dropped to stop the thread.
    sender: Option<Sender<()>>,
    /// Join handle of the notifier thread.
    thread: Option<JoinHandle<()>>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Periodic {
    /// Spawns a periodic notifier with the given name and interval.
    ///
    /// # Panics
    ///
    /// Panics if thread creation fails, as the capability to spawn threads
    /// is a fundamental requirement of the engine.
    #[must_use]
    pub fn spawn<F>(name: &str, interval: Duration, f: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let (sender, receiver) = bounded::<()>(0);

        // The timed wait doubles as the shutdown signal: a timeout means one
        // more tick, anything else means the handle was dropped
        let h = move || {
            loop {
                match receiver.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => f(),
                    _ => break,
                }
            }
        };

        let thread = Builder::new()
            .name(format!("rill/periodic/{name}"))
            .spawn(h)
            .unwrap();
        Self {
            sender: Some(sender),
            thread: Some(thread),
        }
    }

    /// Stops the notifier and joins its thread.
    pub fn stop(&mut self) {
        if let Some(sender) = self.sender.take() {
            drop(sender);
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Drop for Periodic {
    /// Stops the notifier and joins its thread.
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for Periodic {
    /// Formats the notifier for debugging.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Periodic")
            .field("running", &self.thread.is_some())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    mod periodic {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use std::thread;
        use std::time::Duration;

        use crate::executor::periodic::Periodic;

        #[test]
        fn ticks_until_stopped() {
            let count = Arc::new(AtomicUsize::new(0));
            let ticks = Arc::clone(&count);
            let mut periodic =
                Periodic::spawn("test", Duration::from_millis(5), move || {
                    ticks.fetch_add(1, Ordering::SeqCst);
                });

            thread::sleep(Duration::from_millis(100));
            periodic.stop();

            let ticked = count.load(Ordering::SeqCst);
            assert!(ticked >= 2);

            // No further ticks after stopping
            thread::sleep(Duration::from_millis(25));
            assert_eq!(count.load(Ordering::SeqCst), ticked);
        }

        #[test]
        fn stops_promptly_on_drop() {
            let periodic =
                Periodic::spawn("idle", Duration::from_secs(3600), || {});
            drop(periodic);
        }
    }
}
