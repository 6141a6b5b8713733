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

//! Worker thread.

use std::fmt;
use std::thread::{Builder, JoinHandle};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Worker thread.
///
/// A named one-shot thread running a consuming loop, used by the queue
/// operator and the table change feed. The worker does not know how to
/// interrupt its loop; the owning operator signals the loop to exit through
/// its own mechanism, e.g. by disconnecting a channel or flipping a stop
/// flag, and must do so before dropping the handle, which joins the thread.
pub struct Worker {
    /// Join handle of the worker thread.
    thread: Option<JoinHandle<()>>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Worker {
    /// Spawns a worker thread with the given name.
    ///
    /// # Panics
    ///
    /// Panics if thread creation fails, as the capability to spawn threads
    /// is a fundamental requirement of the engine.
    #[must_use]
    pub fn spawn<F>(name: &str, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let thread = Builder::new()
            .name(format!("rill/worker/{name}"))
            .spawn(f)
            .unwrap();
        Self { thread: Some(thread) }
    }

    /// Joins the worker thread.
    pub fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Drop for Worker {
    /// Joins the worker thread.
    fn drop(&mut self) {
        self.join();
    }
}

impl fmt::Debug for Worker {
    /// Formats the worker for debugging.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Worker")
            .field("running", &self.thread.is_some())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    mod worker {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        use crate::executor::worker::Worker;

        #[test]
        fn runs_to_completion() {
            let done = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&done);
            let mut worker = Worker::spawn("test", move || {
                flag.store(true, Ordering::SeqCst);
            });

            worker.join();
            assert!(done.load(Ordering::SeqCst));
        }
    }
}
