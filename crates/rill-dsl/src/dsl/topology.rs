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

//! Topology.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rill_element::{Key, StreamData};
use rill_executor::{Periodic, SourceSet};
use rill_ops::{FromTable, IterSource, SelectFromTable};
use rill_pubsub::{Source, SourceError};
use rill_table::TableRef;

use super::dataflow::Dataflow;
use super::pipe::Pipe;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Registered startup function of a source.
struct Startup {
    /// Source name, used for thread naming.
    name: String,
    /// Startup function running the source to completion.
    run: Arc<dyn Fn() -> Result<u64, SourceError> + Send + Sync>,
}

/// Topology.
///
/// The entry point of a continuous query: a topology owns the dataflow and
/// the ordered lists of prepare and startup closures collected while pipes
/// were built. Starting invokes the startup closures either serially or
/// each on a fresh thread; a timer can re-trigger asynchronous starts
/// periodically.
///
/// # Examples
///
/// ```
/// use rill_element::{Tuple, TupleRef};
/// use rill_dsl::Topology;
/// use rill_ops::CollectSink;
///
/// # fn main() -> rill_dsl::Result<()> {
/// // Build and run a small query
/// let sink = CollectSink::new();
/// let topology = Topology::new();
/// topology
///     .new_stream_from_iter((0..10i64).map(|value| Tuple::new((value,))))
///     .where_(|tuple: &TupleRef<(i64,)>, _| tuple.record().0 % 2 == 0)?
///     .sink(&sink)?;
///
/// topology.start(false);
/// assert_eq!(sink.elements().len(), 5);
/// # Ok(())
/// # }
/// ```
pub struct Topology {
    /// Shared dataflow.
    dataflow: Arc<Dataflow>,
    /// Prepare closures, run serially before any start.
    prepare: Mutex<Vec<Arc<dyn Fn() -> Result<(), SourceError> + Send + Sync>>>,
    /// Startup closures, shared with the re-run timer.
    startup: Arc<Mutex<Vec<Startup>>>,
    /// Threads of asynchronously started sources.
    sources: Arc<SourceSet>,
    /// Periodic re-run timers.
    timers: Mutex<Vec<Periodic>>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Topology {
    /// Creates an empty topology.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dataflow: Dataflow::new(),
            prepare: Mutex::new(Vec::new()),
            startup: Arc::new(Mutex::new(Vec::new())),
            sources: Arc::new(SourceSet::new()),
            timers: Mutex::new(Vec::new()),
        }
    }

    /// Creates a pipe rooted at the given source adapter.
    ///
    /// The source's prepare and startup functions are registered with the
    /// topology; its elements flow once the topology is started.
    pub fn new_stream<S, D>(&self, source: Arc<S>) -> Pipe<D>
    where
        S: Source<D> + 'static,
        D: StreamData,
    {
        self.dataflow.add_publisher(source.clone());

        {
            let source = source.clone();
            let mut prepare =
                self.prepare.lock().unwrap_or_else(PoisonError::into_inner);
            prepare.push(Arc::new(move || source.prepare()));
        }
        {
            let name = source.name().to_owned();
            let run = {
                let source = source.clone();
                Arc::new(move || source.start())
                    as Arc<dyn Fn() -> Result<u64, SourceError> + Send + Sync>
            };
            let mut startup =
                self.startup.lock().unwrap_or_else(PoisonError::into_inner);
            startup.push(Startup { name, run });
        }

        Pipe::new(Arc::clone(&self.dataflow), source)
    }

    /// Creates a pipe emitting the given elements from memory.
    pub fn new_stream_from_iter<D, I>(&self, items: I) -> Pipe<D>
    where
        D: StreamData,
        I: IntoIterator<Item = D>,
    {
        self.new_stream(IterSource::new(items))
    }

    /// Creates a pipe streaming the change feed of the given table.
    ///
    /// The change feed is passive: it publishes as the table is mutated,
    /// independent of topology start.
    pub fn new_stream_from_table<K, D>(&self, table: &TableRef<K, D>) -> Pipe<D>
    where
        K: Key,
        D: StreamData,
    {
        let source = FromTable::new(table);
        self.dataflow.add_publisher(source.clone());
        Pipe::new(Arc::clone(&self.dataflow), source)
    }

    /// Creates a pipe scanning the given table once at start.
    pub fn new_stream_from_select<K, D, P>(
        &self,
        table: &TableRef<K, D>,
        predicate: P,
    ) -> Pipe<D>
    where
        K: Key,
        D: StreamData,
        P: Fn(&D) -> bool + Send + Sync + 'static,
    {
        self.new_stream(SelectFromTable::with_predicate(
            Arc::clone(table),
            predicate,
        ))
    }

    /// Runs all prepare closures serially.
    ///
    /// Used by sources that must load data before emitting. A failing
    /// prepare is reported like a failing start: the source will produce
    /// nothing but the rest of the topology remains usable.
    pub fn prepare(&self) {
        let prepare: Vec<_> = {
            let prepare =
                self.prepare.lock().unwrap_or_else(PoisonError::into_inner);
            prepare.clone()
        };
        for f in prepare {
            if let Err(error) = f() {
                report(&error);
            }
        }
    }

    /// Starts processing of the whole topology.
    ///
    /// With `asynchronous` set, every startup closure is launched on its
    /// own fresh thread and the call returns immediately; otherwise the
    /// closures run serially and the call returns when the last source is
    /// exhausted.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all)
    )]
    pub fn start(&self, asynchronous: bool) {
        if asynchronous {
            self.start_async();
        } else {
            let startup: Vec<_> = {
                let startup = self
                    .startup
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                startup
                    .iter()
                    .map(|source| Arc::clone(&source.run))
                    .collect()
            };
            for run in startup {
                if let Err(error) = run() {
                    report(&error);
                }
            }
        }
    }

    /// Starts every source on its own fresh thread.
    pub fn start_async(&self) {
        launch(&self.startup, &self.sources);
    }

    /// Waits until all asynchronously started sources ran to completion.
    ///
    /// Returns the summed element counts reported by the sources.
    pub fn wait(&self) -> u64 {
        self.sources.wait()
    }

    /// Re-triggers an asynchronous start every interval.
    ///
    /// The timer thread keeps re-running the sources until the topology is
    /// dropped.
    pub fn run_every(&self, interval: Duration) {
        let startup = Arc::clone(&self.startup);
        let sources = Arc::clone(&self.sources);

        let timer = Periodic::spawn("topology", interval, move || {
            launch(&startup, &sources);
        });
        let mut timers =
            self.timers.lock().unwrap_or_else(PoisonError::into_inner);
        timers.push(timer);
    }

    /// Returns the shared dataflow.
    #[inline]
    #[must_use]
    pub fn dataflow(&self) -> &Arc<Dataflow> {
        &self.dataflow
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Launches every registered startup closure on a fresh thread.
fn launch(startup: &Arc<Mutex<Vec<Startup>>>, sources: &Arc<SourceSet>) {
    let startup: Vec<(String, Arc<dyn Fn() -> Result<u64, SourceError> + Send + Sync>)> = {
        let startup = startup.lock().unwrap_or_else(PoisonError::into_inner);
        startup
            .iter()
            .map(|source| (source.name.clone(), Arc::clone(&source.run)))
            .collect()
    };

    for (name, run) in startup {
        sources.spawn(&name, move || match run() {
            Ok(count) => count,
            Err(error) => {
                report(&error);
                0
            }
        });
    }
}

/// Reports a source failure, which is treated as a premature end of stream.
fn report(error: &SourceError) {
    #[cfg(feature = "tracing")]
    tracing::warn!(%error, "source failed, treating as end of stream");
    #[cfg(not(feature = "tracing"))]
    let _ = error;
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Default for Topology {
    /// Creates an empty topology.
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Topology {
    /// Formats the topology for debugging.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Topology")
            .field("dataflow", &self.dataflow)
            .field("running", &self.sources.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
