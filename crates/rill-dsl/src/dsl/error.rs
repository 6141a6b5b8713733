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

//! Errors.

use thiserror::Error as ThisError;

// ----------------------------------------------------------------------------
// Enumerations
// ----------------------------------------------------------------------------

/// Topology build error.
///
/// Wiring and configuration errors surface synchronously from the builder
/// and are fatal: the topology under construction must be considered
/// unusable. Runtime errors from user callables never appear here, as
/// they surface on the thread that invoked them.
#[derive(Debug, ThisError)]
pub enum Error {
    /// The operator cannot be wired at this position in the dataflow.
    #[error("wiring error: {0}")]
    Wiring(String),
    /// The operator is missing or mismatching required configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

// ----------------------------------------------------------------------------
// Types
// ----------------------------------------------------------------------------

/// Result of a builder step.
pub type Result<T> = std::result::Result<T, Error>;
