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

//! Windows.
//!
//! A window buffers recent elements and emits outdated versions as they
//! leave the window, which is how downstream stateful operators learn to
//! subtract from their state. Windows come in two types, row-based and
//! range-based, and two policies, sliding and tumbling.

use std::collections::VecDeque;
use std::sync::Mutex;

use rill_element::Timestamp;

use super::TimestampFn;

pub mod sliding;
pub mod tumbling;

pub use sliding::SlidingWindow;
pub use tumbling::TumblingWindow;

// ----------------------------------------------------------------------------
// Enumerations
// ----------------------------------------------------------------------------

/// Window specification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowSpec {
    /// A window holding at most the given number of elements.
    Rows(usize),
    /// A window spanning the given number of microseconds of element time.
    Range(u64),
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Shared window internals.
///
/// The buffer stores the original data handles in insertion order; no copy
/// is made. All buffer access happens under the mutex, while emissions to
/// downstream happen with the mutex released, so a downstream operator can
/// never deadlock by arriving back at the window.
pub(crate) struct Core<D> {
    /// Window specification.
    pub(crate) spec: WindowSpec,
    /// Timestamp extractor, present for range windows.
    pub(crate) extractor: Option<TimestampFn<D>>,
    /// Buffered elements in insertion order.
    pub(crate) buffer: Mutex<VecDeque<D>>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl WindowSpec {
    /// Creates a range specification from seconds.
    #[must_use]
    pub const fn range_secs(secs: u64) -> Self {
        Self::Range(secs * 1_000_000)
    }

    /// Returns whether the window is range-based.
    #[must_use]
    pub const fn is_range(&self) -> bool {
        matches!(self, Self::Range(_))
    }
}

// ----------------------------------------------------------------------------

impl<D> Core<D> {
    /// Creates the window internals.
    pub(crate) fn new(spec: WindowSpec, extractor: Option<TimestampFn<D>>) -> Self {
        Self {
            spec,
            extractor,
            buffer: Mutex::new(VecDeque::new()),
        }
    }

    /// Extracts the timestamp of the given element.
    ///
    /// Range constructors require an extractor, so this is only reachable
    /// with one present.
    pub(crate) fn timestamp(&self, data: &D) -> Timestamp {
        (self.extractor.as_ref().expect("invariant"))(data)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    mod spec {
        use crate::ops::window::WindowSpec;

        #[test]
        fn converts_seconds() {
            let spec = WindowSpec::range_secs(2);
            assert_eq!(spec, WindowSpec::Range(2_000_000));
            assert!(spec.is_range());
            assert!(!WindowSpec::Rows(5).is_range());
        }
    }
}
