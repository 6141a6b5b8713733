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

//! Operators.

use std::sync::Arc;

use rill_element::Timestamp;

pub mod aggregate;
pub mod barrier;
pub mod batch;
pub mod filter;
pub mod join;
pub mod map;
pub mod merge;
pub mod notify;
pub mod partition;
pub mod queue;
pub mod sink;
pub mod source;
pub mod stateful_map;
pub mod table;
pub mod window;

// ----------------------------------------------------------------------------
// Types
// ----------------------------------------------------------------------------

/// Key extractor function.
///
/// Shared, since the same extractor configured once on a pipe is handed to
/// every keyed operator built behind it.
pub type KeyFn<D, K> = Arc<dyn Fn(&D) -> K + Send + Sync>;

/// Timestamp extractor function.
pub type TimestampFn<D> = Arc<dyn Fn(&D) -> Timestamp + Send + Sync>;
