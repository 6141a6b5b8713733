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

//! Operator endpoints.

use std::fmt;

use rill_element::{Element, PunctuationRef, StreamData};

use super::channel::{connect, Discipline, InputChannel, OutputChannel};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Output endpoint pair of an operator.
///
/// Every publishing operator exposes a data channel carrying elements and a
/// punctuation channel alongside it. Punctuations are order-preserved
/// relative to one another on their channel, but are not totally ordered
/// against data elements.
pub struct Outlet<D> {
    /// Data channel.
    data: OutputChannel<Element<D>>,
    /// Punctuation channel.
    punctuation: OutputChannel<PunctuationRef>,
}

/// Input endpoint pair of an operator.
pub struct Inlet<D> {
    /// Data channel.
    data: InputChannel<Element<D>>,
    /// Punctuation channel.
    punctuation: InputChannel<PunctuationRef>,
}

/// Input endpoints of a binary transform.
///
/// Two data channels and a shared punctuation channel. Binary transforms
/// are reachable from multiple source threads by construction, so all three
/// channels are synchronized.
pub struct BinaryInlet<L, R> {
    /// Left data channel.
    left: InputChannel<Element<L>>,
    /// Right data channel.
    right: InputChannel<Element<R>>,
    /// Shared punctuation channel.
    punctuation: InputChannel<PunctuationRef>,
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Links an outlet to an inlet, connecting both channel pairs.
pub fn link<D>(outlet: &Outlet<D>, inlet: &Inlet<D>)
where
    D: StreamData,
{
    connect(&outlet.data, &inlet.data);
    connect(&outlet.punctuation, &inlet.punctuation);
}

/// Links an outlet to the left side of a binary inlet.
pub fn link_left<L, R>(outlet: &Outlet<L>, inlet: &BinaryInlet<L, R>)
where
    L: StreamData,
    R: StreamData,
{
    connect(&outlet.data, &inlet.left);
    connect(&outlet.punctuation, &inlet.punctuation);
}

/// Links an outlet to the right side of a binary inlet.
pub fn link_right<L, R>(outlet: &Outlet<R>, inlet: &BinaryInlet<L, R>)
where
    L: StreamData,
    R: StreamData,
{
    connect(&outlet.data, &inlet.right);
    connect(&outlet.punctuation, &inlet.punctuation);
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<D> Outlet<D>
where
    D: StreamData,
{
    /// Creates an outlet without subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: OutputChannel::new(),
            punctuation: OutputChannel::new(),
        }
    }

    /// Publishes a data element.
    #[inline]
    pub fn publish(&self, data: D, outdated: bool) {
        self.data.publish(Element::new(data, outdated));
    }

    /// Publishes a data element as-is.
    #[inline]
    pub fn publish_element(&self, element: Element<D>) {
        self.data.publish(element);
    }

    /// Publishes a punctuation.
    #[inline]
    pub fn publish_punctuation(&self, punctuation: PunctuationRef) {
        self.punctuation.publish(punctuation);
    }

    /// Returns the data channel.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &OutputChannel<Element<D>> {
        &self.data
    }

    /// Returns the punctuation channel.
    #[inline]
    #[must_use]
    pub fn punctuation(&self) -> &OutputChannel<PunctuationRef> {
        &self.punctuation
    }
}

// ----------------------------------------------------------------------------

impl<D> Inlet<D>
where
    D: StreamData,
{
    /// Creates an inlet with the given discipline and handlers.
    ///
    /// Both channels of the pair share the discipline, since a punctuation
    /// arriving concurrently with data from another source thread needs the
    /// same serialization as the data itself.
    #[must_use]
    pub fn new<F, P>(discipline: Discipline, on_data: F, on_punctuation: P) -> Self
    where
        F: Fn(Element<D>) + Send + Sync + 'static,
        P: Fn(PunctuationRef) + Send + Sync + 'static,
    {
        Self {
            data: InputChannel::new(discipline, on_data),
            punctuation: InputChannel::new(discipline, on_punctuation),
        }
    }

    /// Returns the data channel.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &InputChannel<Element<D>> {
        &self.data
    }

    /// Returns the punctuation channel.
    #[inline]
    #[must_use]
    pub fn punctuation(&self) -> &InputChannel<PunctuationRef> {
        &self.punctuation
    }
}

// ----------------------------------------------------------------------------

impl<L, R> BinaryInlet<L, R>
where
    L: StreamData,
    R: StreamData,
{
    /// Creates a binary inlet with the given handlers.
    #[must_use]
    pub fn new<F, G, P>(on_left: F, on_right: G, on_punctuation: P) -> Self
    where
        F: Fn(Element<L>) + Send + Sync + 'static,
        G: Fn(Element<R>) + Send + Sync + 'static,
        P: Fn(PunctuationRef) + Send + Sync + 'static,
    {
        Self {
            left: InputChannel::new(Discipline::Synchronized, on_left),
            right: InputChannel::new(Discipline::Synchronized, on_right),
            punctuation: InputChannel::new(Discipline::Synchronized, on_punctuation),
        }
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<D> Default for Outlet<D>
where
    D: StreamData,
{
    /// Creates an outlet without subscribers.
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<D> fmt::Debug for Outlet<D> {
    /// Formats the outlet for debugging.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Outlet")
            .field("data", &self.data)
            .field("punctuation", &self.punctuation)
            .finish()
    }
}

impl<D> fmt::Debug for Inlet<D> {
    /// Formats the inlet for debugging.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Inlet")
            .field("data", &self.data)
            .field("punctuation", &self.punctuation)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
