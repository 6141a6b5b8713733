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

//! Timestamp.

use std::sync::OnceLock;
use std::time::Instant;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Timestamp.
///
/// A monotonic microsecond count. There is no global clock in the stream
/// engine; operators that need a tuple's time obtain it through a configured
/// extractor function, so timestamps may just as well be artificial event
/// times starting at zero. [`Timestamp::now`] measures against a
/// process-wide start instant and is therefore monotonic across threads.
///
/// # Examples
///
/// ```
/// use rill_element::Timestamp;
///
/// // Create and compare timestamps
/// let a = Timestamp::from_micros(100);
/// let b = Timestamp::from_millis(1);
/// assert!(a < b);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Timestamp {
    /// The zero timestamp.
    pub const ZERO: Self = Self(0);

    /// Creates a timestamp from microseconds.
    #[inline]
    #[must_use]
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    /// Creates a timestamp from milliseconds.
    #[inline]
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis * 1_000)
    }

    /// Creates a timestamp from seconds.
    #[inline]
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs * 1_000_000)
    }

    /// Returns the current monotonic timestamp.
    #[must_use]
    pub fn now() -> Self {
        static EPOCH: OnceLock<Instant> = OnceLock::new();
        let epoch = *EPOCH.get_or_init(Instant::now);
        Self(u64::try_from(epoch.elapsed().as_micros()).unwrap_or(u64::MAX))
    }

    /// Returns the timestamp in microseconds.
    #[inline]
    #[must_use]
    pub const fn micros(self) -> u64 {
        self.0
    }

    /// Subtracts a number of microseconds, saturating at zero.
    #[inline]
    #[must_use]
    pub const fn saturating_sub(self, micros: u64) -> Self {
        Self(self.0.saturating_sub(micros))
    }

    /// Returns the distance to an earlier timestamp in microseconds.
    #[inline]
    #[must_use]
    pub const fn since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    mod timestamp {
        use crate::element::time::Timestamp;

        #[test]
        fn converts_units() {
            assert_eq!(Timestamp::from_millis(2).micros(), 2_000);
            assert_eq!(Timestamp::from_secs(3).micros(), 3_000_000);
        }

        #[test]
        fn is_monotonic() {
            let a = Timestamp::now();
            let b = Timestamp::now();
            assert!(a <= b);
        }

        #[test]
        fn saturates() {
            let ts = Timestamp::from_micros(10);
            assert_eq!(ts.saturating_sub(20), Timestamp::ZERO);
            assert_eq!(Timestamp::ZERO.since(ts), 0);
        }
    }
}
