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

//! Dataflow.

use slab::Slab;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use rill_pubsub::BaseOp;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Dataflow.
///
/// The registry of all operators in a topology, arranged as a directed
/// acyclic graph through their channel subscriptions. Operators are
/// referenced both here and by the subscriber lists inside upstream output
/// channels; only the registry holds strong references, so operator
/// lifetime is governed by shared ownership of the dataflow. A user-held
/// pipe keeps the dataflow, and thus its operators, alive after the
/// topology itself is dropped.
pub struct Dataflow {
    /// Operators acting as publishers.
    publishers: Mutex<Slab<Arc<dyn BaseOp>>>,
    /// Sink operators, which never publish.
    sinks: Mutex<Vec<Arc<dyn BaseOp>>>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Dataflow {
    /// Creates a shared, empty dataflow.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            publishers: Mutex::new(Slab::new()),
            sinks: Mutex::new(Vec::new()),
        })
    }

    /// Registers a publishing operator and returns its slot.
    pub fn add_publisher(&self, op: Arc<dyn BaseOp>) -> usize {
        let mut publishers = self
            .publishers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        publishers.insert(op)
    }

    /// Registers a sink operator.
    pub fn add_sink(&self, op: Arc<dyn BaseOp>) {
        let mut sinks =
            self.sinks.lock().unwrap_or_else(PoisonError::into_inner);
        sinks.push(op);
    }

    /// Returns the number of registered operators.
    #[must_use]
    pub fn len(&self) -> usize {
        let publishers = self
            .publishers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let sinks =
            self.sinks.lock().unwrap_or_else(PoisonError::into_inner);
        publishers.len() + sinks.len()
    }

    /// Returns whether the dataflow has no operators.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl fmt::Debug for Dataflow {
    /// Formats the dataflow for debugging.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Dataflow")
            .field("operators", &self.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    mod dataflow {
        use rill_element::TupleRef;
        use rill_ops::{CollectSink, Merge};

        use crate::dsl::dataflow::Dataflow;

        #[test]
        fn keeps_operators_alive() {
            let dataflow = Dataflow::new();
            assert!(dataflow.is_empty());

            dataflow.add_publisher(Merge::<TupleRef<(i64,)>>::new());
            dataflow.add_sink(CollectSink::<TupleRef<(i64,)>>::new());
            assert_eq!(dataflow.len(), 2);
        }
    }
}
