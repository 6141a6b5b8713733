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

//! Binary codec.

use thiserror::Error;

use super::field::StrRef;
use super::mask::NullMask;
use super::punctuation::{Kind, Punctuation};
use super::time::Timestamp;

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Binary encoding.
///
/// Scalars are encoded as fixed-width little-endian values, strings with a
/// 32-bit length prefix. A tuple encodes its null mask followed by all of
/// its fields in order, so tuple streams can be shipped over sockets or
/// written to files without a schema header.
pub trait Encode {
    /// Appends the binary representation to the buffer.
    fn encode(&self, buf: &mut Vec<u8>);
}

/// Binary decoding.
///
/// The counterpart of [`Encode`], consuming bytes from the front of the
/// input slice. String references cannot be decoded, as there is no backing
/// buffer to borrow from; readers decode into owned fields instead.
pub trait Decode: Sized {
    /// Decodes a value from the front of the input.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the input is exhausted or malformed.
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError>;
}

// ----------------------------------------------------------------------------
// Enumerations
// ----------------------------------------------------------------------------

/// Decode error.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The input ended before the value was complete.
    #[error("unexpected end of input")]
    UnexpectedEof,
    /// A string field contained invalid UTF-8.
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    /// The punctuation kind code is not known.
    #[error("unknown punctuation kind {0}")]
    UnknownKind(u8),
    /// The encoded null mask does not match the record arity.
    #[error("record arity mismatch: expected {expected}, found {actual}")]
    ArityMismatch {
        /// Arity of the record type being decoded.
        expected: usize,
        /// Arity found in the encoded null mask.
        actual: usize,
    },
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Takes the given number of bytes from the front of the input.
fn take<'a>(input: &mut &'a [u8], len: usize) -> Result<&'a [u8], DecodeError> {
    if input.len() < len {
        return Err(DecodeError::UnexpectedEof);
    }
    let (head, tail) = input.split_at(len);
    *input = tail;
    Ok(head)
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

/// Implements the codec for fixed-width little-endian scalars.
macro_rules! scalars {
    ($($type:ty),+ $(,)?) => {
        $(
            impl Encode for $type {
                #[inline]
                fn encode(&self, buf: &mut Vec<u8>) {
                    buf.extend_from_slice(&self.to_le_bytes());
                }
            }

            impl Decode for $type {
                #[inline]
                fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
                    let bytes = take(input, size_of::<$type>())?;
                    // We can safely use expect here, as take returned
                    // exactly the requested number of bytes
                    Ok(<$type>::from_le_bytes(bytes.try_into().expect("invariant")))
                }
            }
        )+
    };
}

scalars!(i64, u64, f64, u32);

// ----------------------------------------------------------------------------

impl Encode for String {
    /// Encodes the string with a 32-bit length prefix.
    fn encode(&self, buf: &mut Vec<u8>) {
        let len = u32::try_from(self.len()).expect("string field exceeds 4 GiB");
        len.encode(buf);
        buf.extend_from_slice(self.as_bytes());
    }
}

impl Decode for String {
    /// Decodes a length-prefixed string.
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let len = u32::decode(input)?;
        let bytes = take(input, len as usize)?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }
}

impl Encode for StrRef {
    /// Encodes the referenced bytes with a 32-bit length prefix.
    ///
    /// Encoding happens on the producing call path, while the backing buffer
    /// is still owned by the source, which is the same liveness contract
    /// that applies to reading the reference.
    fn encode(&self, buf: &mut Vec<u8>) {
        // SAFETY: See above.
        let value = unsafe { self.as_str() };
        let len = u32::try_from(value.len()).expect("string field exceeds 4 GiB");
        len.encode(buf);
        buf.extend_from_slice(value.as_bytes());
    }
}

// ----------------------------------------------------------------------------

impl Encode for Timestamp {
    #[inline]
    fn encode(&self, buf: &mut Vec<u8>) {
        self.micros().encode(buf);
    }
}

impl Decode for Timestamp {
    #[inline]
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self::from_micros(u64::decode(input)?))
    }
}

// ----------------------------------------------------------------------------

impl Encode for NullMask {
    /// Encodes the arity followed by the null bits.
    fn encode(&self, buf: &mut Vec<u8>) {
        // We can safely use expect here, as masks cover at most 32 fields
        buf.push(u8::try_from(self.len()).expect("invariant"));
        self.bits().encode(buf);
    }
}

impl Decode for NullMask {
    /// Decodes the arity followed by the null bits.
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let arity = take(input, 1)?[0];
        let bits = u32::decode(input)?;
        Ok(Self::from_bits(bits, usize::from(arity)))
    }
}

// ----------------------------------------------------------------------------

impl Encode for Punctuation {
    /// Encodes the kind and timestamp.
    ///
    /// The opaque payload is process-local and is not carried on the wire.
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(self.kind().code());
        self.timestamp().encode(buf);
    }
}

impl Decode for Punctuation {
    /// Decodes the kind and timestamp.
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let code = take(input, 1)?[0];
        let kind = Kind::from_code(code).ok_or(DecodeError::UnknownKind(code))?;
        Ok(Self::from_parts(kind, Timestamp::decode(input)?))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    mod codec {
        use crate::element::codec::{Decode, DecodeError, Encode};
        use crate::element::mask::NullMask;
        use crate::element::punctuation::{Kind, Punctuation};
        use crate::element::time::Timestamp;
        use crate::element::Tuple;

        #[test]
        fn round_trips_tuple() {
            let tuple = Tuple::with_nulls(
                (42i64, 2.5f64, "coffee".to_string()),
                NullMask::new(3).with_null(1),
            );

            let mut buf = Vec::new();
            tuple.encode(&mut buf);

            let mut input = buf.as_slice();
            let decoded = Tuple::<(i64, f64, String)>::decode(&mut input)
                .expect("tuple decodes");
            assert!(input.is_empty());
            assert_eq!(decoded.record(), tuple.record());
            assert_eq!(decoded.nulls(), tuple.nulls());
        }

        #[test]
        fn round_trips_punctuation() {
            let punctuation =
                Punctuation::at(Kind::WindowExpired, Timestamp::from_micros(99));

            let mut buf = Vec::new();
            punctuation.encode(&mut buf);

            let mut input = buf.as_slice();
            let decoded = Punctuation::decode(&mut input).expect("punctuation decodes");
            assert_eq!(decoded.kind(), Kind::WindowExpired);
            assert_eq!(decoded.timestamp(), Timestamp::from_micros(99));
        }

        #[test]
        fn rejects_truncated_input() {
            let mut buf = Vec::new();
            7u64.encode(&mut buf);
            buf.truncate(4);

            let mut input = buf.as_slice();
            assert!(matches!(
                u64::decode(&mut input),
                Err(DecodeError::UnexpectedEof)
            ));
        }

        #[test]
        fn rejects_arity_mismatch() {
            let tuple = Tuple::new((1i64,));
            let mut buf = Vec::new();
            tuple.encode(&mut buf);

            let mut input = buf.as_slice();
            assert!(matches!(
                Tuple::<(i64, i64)>::decode(&mut input),
                Err(DecodeError::ArityMismatch { expected: 2, actual: 1 })
            ));
        }

        #[test]
        fn rejects_unknown_kind() {
            let mut input: &[u8] = &[0xFF, 0, 0, 0, 0, 0, 0, 0, 0];
            assert!(matches!(
                Punctuation::decode(&mut input),
                Err(DecodeError::UnknownKind(0xFF))
            ));
        }
    }
}
