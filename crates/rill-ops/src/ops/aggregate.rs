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

//! Aggregation.
//!
//! Incremental aggregates over a stream, optionally by key. An aggregate
//! state bundles scalar [`Aggregate`][] functions, each addressing one
//! field of the input; windows upstream drive subtraction through outdated
//! arrivals, so the state always reflects the live window contents.
//!
//! [`Aggregate`]: functions::Aggregate

use rill_element::StreamData;

pub mod aggregation;
pub mod comparator;
pub mod functions;
pub mod grouped;
pub mod trigger;

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Composite aggregate state.
///
/// Implementors compose scalar aggregates into one state struct: iterating
/// routes each addressed field of the input element into its aggregate,
/// finalizing reads all partial results into an output element. A fresh
/// state is the [`Default`] value.
pub trait AggregateState<D>: Default + Send + 'static
where
    D: StreamData,
{
    /// Output element type.
    type Output: StreamData;

    /// Incorporates one input element; an outdated element subtracts.
    fn iterate(&mut self, data: &D, outdated: bool);

    /// Reads the current partial results into an output element.
    fn finalize(&self) -> Self::Output;
}
