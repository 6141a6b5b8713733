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

//! Operator base.

use std::io;

use thiserror::Error;

use rill_element::StreamData;

use super::endpoint::{Inlet, Outlet};

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Base operator interface.
///
/// Operators are constructed during topology build, connected via channels,
/// driven by their source chain, and destroyed when the last shared handle
/// drops. The base interface only provides naming, which is used for thread
/// names and diagnostics.
pub trait BaseOp: Send + Sync {
    /// Returns the operator name.
    fn name(&self) -> &str;
}

/// Publishing side of an operator.
pub trait Publish<D>: BaseOp
where
    D: StreamData,
{
    /// Returns the output endpoint pair.
    fn outlet(&self) -> &Outlet<D>;
}

/// Subscribing side of an operator.
///
/// Sinks implement only this trait; they receive elements and punctuations
/// and must not re-publish.
pub trait Subscribe<D>: BaseOp
where
    D: StreamData,
{
    /// Returns the input endpoint pair.
    fn inlet(&self) -> &Inlet<D>;
}

/// Source adapter contract.
///
/// A source runs to completion on one thread: it emits non-outdated
/// elements on its data channel, followed by an end-of-stream punctuation
/// once its input is exhausted. Adapters with external connections can be
/// stopped early through [`Source::stop`].
pub trait Source<D>: Publish<D>
where
    D: StreamData,
{
    /// Prepares the source, invoked once before any start.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] if the source cannot load its input.
    fn prepare(&self) -> Result<(), SourceError> {
        Ok(())
    }

    /// Runs the source to completion and returns the number of elements.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] if producing fails mid-stream; the engine
    /// treats this as a premature end of the stream.
    fn start(&self) -> Result<u64, SourceError>;

    /// Requests the source to stop producing.
    fn stop(&self) {}
}

// ----------------------------------------------------------------------------
// Enumerations
// ----------------------------------------------------------------------------

/// Source error.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The adapter's input failed.
    #[error("source I/O failed")]
    Io(#[from] io::Error),
    /// The adapter failed for another reason.
    #[error("source failed: {0}")]
    Other(String),
}
