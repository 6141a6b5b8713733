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

//! Punctuation.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::time::Timestamp;

// ----------------------------------------------------------------------------
// Enumerations
// ----------------------------------------------------------------------------

/// Punctuation kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    /// No punctuation, shouldn't be used.
    None,
    /// The end of a stream was identified.
    EndOfStream,
    /// The end of a substream was identified.
    EndOfSubStream,
    /// A window expired, produced by tumbling windows.
    WindowExpired,
    /// A slide expired, produced by periodic aggregation triggers.
    SlideExpired,
    /// A transaction begins.
    TxBegin,
    /// A transaction commits.
    TxCommit,
    /// A transaction aborts.
    TxAbort,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Kind {
    /// Returns the wire code of the kind.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::EndOfStream => 1,
            Self::EndOfSubStream => 2,
            Self::WindowExpired => 3,
            Self::SlideExpired => 4,
            Self::TxBegin => 5,
            Self::TxCommit => 6,
            Self::TxAbort => 7,
        }
    }

    /// Returns the kind for the given wire code, if known.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::None,
            1 => Self::EndOfStream,
            2 => Self::EndOfSubStream,
            3 => Self::WindowExpired,
            4 => Self::SlideExpired,
            5 => Self::TxBegin,
            6 => Self::TxCommit,
            7 => Self::TxAbort,
            _ => return None,
        })
    }
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Punctuation.
///
/// A punctuation is a control record sent to subscribers to signal special
/// situations like end-of-stream or window expirations, which operators use
/// to implement flushing semantics. Punctuations travel on a separate
/// channel from data elements and never carry payload tuples; the payload
/// slot is an opaque value used to carry a transaction identifier.
///
/// # Examples
///
/// ```
/// use rill_element::{Kind, Punctuation};
///
/// // Create punctuation and inspect its kind
/// let punctuation = Punctuation::new(Kind::EndOfStream);
/// assert_eq!(punctuation.kind(), Kind::EndOfStream);
/// ```
pub struct Punctuation {
    /// Kind of punctuation.
    kind: Kind,
    /// Time of creation.
    timestamp: Timestamp,
    /// Opaque payload, if any.
    payload: Option<Payload>,
}

/// Opaque punctuation payload.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// Shared handle to a punctuation.
pub type PunctuationRef = Arc<Punctuation>;

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Punctuation {
    /// Creates a shared punctuation stamped with the current time.
    #[must_use]
    pub fn new(kind: Kind) -> PunctuationRef {
        Self::at(kind, Timestamp::now())
    }

    /// Creates a shared punctuation with the given timestamp.
    #[must_use]
    pub fn at(kind: Kind, timestamp: Timestamp) -> PunctuationRef {
        Arc::new(Self { kind, timestamp, payload: None })
    }

    /// Creates a shared punctuation carrying an opaque payload.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use rill_element::{Kind, Punctuation};
    ///
    /// // Create punctuation with a transaction identifier
    /// let punctuation = Punctuation::with_payload(Kind::TxBegin, Arc::new(42u64));
    /// assert_eq!(punctuation.payload_as::<u64>(), Some(&42));
    /// ```
    #[must_use]
    pub fn with_payload(kind: Kind, payload: Payload) -> PunctuationRef {
        Arc::new(Self {
            kind,
            timestamp: Timestamp::now(),
            payload: Some(payload),
        })
    }

    /// Returns the kind.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Returns the timestamp.
    #[inline]
    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Returns the payload downcast to the given type.
    #[inline]
    #[must_use]
    pub fn payload_as<T>(&self) -> Option<&T>
    where
        T: 'static,
    {
        self.payload.as_ref()?.downcast_ref()
    }

    /// Recreates a punctuation from decoded parts.
    pub(crate) const fn from_parts(kind: Kind, timestamp: Timestamp) -> Self {
        Self { kind, timestamp, payload: None }
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl fmt::Debug for Punctuation {
    /// Formats the punctuation for debugging.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Punctuation")
            .field("kind", &self.kind)
            .field("timestamp", &self.timestamp)
            .field("payload", &self.payload.is_some())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    mod punctuation {
        use std::sync::Arc;

        use crate::element::punctuation::{Kind, Punctuation};
        use crate::element::time::Timestamp;

        #[test]
        fn stamps_creation_time() {
            let punctuation = Punctuation::new(Kind::WindowExpired);
            assert!(punctuation.timestamp() <= Timestamp::now());
        }

        #[test]
        fn carries_payload() {
            let punctuation =
                Punctuation::with_payload(Kind::TxCommit, Arc::new(7u64));
            assert_eq!(punctuation.payload_as::<u64>(), Some(&7));
            assert_eq!(punctuation.payload_as::<i64>(), None);
        }

        #[test]
        fn defaults_to_no_payload() {
            let punctuation = Punctuation::at(Kind::EndOfStream, Timestamp::ZERO);
            assert_eq!(punctuation.payload_as::<u64>(), None);
        }
    }
}
