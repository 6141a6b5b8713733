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

//! Stateful map operator.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use rill_element::{Element, StreamData};
use rill_pubsub::{BaseOp, Discipline, Inlet, Outlet, Publish, Subscribe};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Stateful projection function.
pub type StatefulMapFn<I, O, S> =
    Box<dyn Fn(&I, bool, &mut S) -> O + Send + Sync>;

/// Stateful map operator.
///
/// Like [`Map`][], but the projection function additionally receives a
/// mutable reference to state owned by the operator and not shared with
/// anyone else. State mutation happens on the calling thread, under the
/// operator's lock.
///
/// [`Map`]: crate::ops::map::Map
pub struct StatefulMap<I, O, S> {
    /// Projection function.
    function: StatefulMapFn<I, O, S>,
    /// Operator-owned state.
    state: Mutex<S>,
    /// Input endpoints.
    inlet: Inlet<I>,
    /// Output endpoints.
    outlet: Outlet<O>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<I, O, S> StatefulMap<I, O, S>
where
    I: StreamData,
    O: StreamData,
    S: Default + Send + 'static,
{
    /// Creates a stateful map operator with the given projection function.
    pub fn new<F>(function: F) -> Arc<Self>
    where
        F: Fn(&I, bool, &mut S) -> O + Send + Sync + 'static,
    {
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
                function: Box::new(function),
                state: Mutex::new(S::default()),
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
    fn process(&self, element: Element<I>) {
        let data = {
            let mut state =
                self.state.lock().unwrap_or_else(PoisonError::into_inner);
            (self.function)(&element.data, element.outdated, &mut state)
        };
        self.outlet.publish(data, element.outdated);
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<I, O, S> BaseOp for StatefulMap<I, O, S>
where
    I: StreamData,
    O: StreamData,
    S: Default + Send + 'static,
{
    fn name(&self) -> &str {
        "StatefulMap"
    }
}

impl<I, O, S> Publish<O> for StatefulMap<I, O, S>
where
    I: StreamData,
    O: StreamData,
    S: Default + Send + 'static,
{
    #[inline]
    fn outlet(&self) -> &Outlet<O> {
        &self.outlet
    }
}

impl<I, O, S> Subscribe<I> for StatefulMap<I, O, S>
where
    I: StreamData,
    O: StreamData,
    S: Default + Send + 'static,
{
    #[inline]
    fn inlet(&self) -> &Inlet<I> {
        &self.inlet
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
