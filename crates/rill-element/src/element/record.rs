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

//! Records.

use super::codec::{Decode, DecodeError, Encode};
use super::field::Field;
use super::mask::NullMask;
use super::Tuple;

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Record.
///
/// A fixed-arity heterogeneous composition of [`Field`] values, implemented
/// for field tuples of arity 1 to 8. The arity is part of the type, which
/// makes constructing a tuple with the wrong number or types of fields a
/// compile-time error.
pub trait Record: Clone + Send + Sync + 'static {
    /// Number of fields.
    const ARITY: usize;
}

/// Record concatenation.
///
/// Implemented for record pairs of arity 1 to 4 per side, which is the shape
/// produced by a stream join: the output record consists of the left record's
/// fields followed by the right record's fields.
pub trait Concat<Other>: Record {
    /// Concatenated record type.
    type Output: Record;

    /// Concatenates the two records.
    fn concat(&self, other: &Other) -> Self::Output;
}

// ----------------------------------------------------------------------------
// Macros
// ----------------------------------------------------------------------------

/// Implements [`Record`] and the tuple codec for one arity.
macro_rules! records {
    ($(($($field:ident . $index:tt),+) => $arity:expr),+ $(,)?) => {
        $(
            impl<$($field),+> Record for ($($field,)+)
            where
                $($field: Field),+
            {
                const ARITY: usize = $arity;
            }

            impl<$($field),+> Encode for Tuple<($($field,)+)>
            where
                $($field: Field + Encode),+
            {
                /// Encodes the null mask followed by all fields in order.
                fn encode(&self, buf: &mut Vec<u8>) {
                    self.nulls.encode(buf);
                    $(self.record.$index.encode(buf);)+
                }
            }

            impl<$($field),+> Decode for Tuple<($($field,)+)>
            where
                $($field: Field + Decode),+
            {
                /// Decodes the null mask followed by all fields in order.
                fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
                    let nulls = NullMask::decode(input)?;
                    if nulls.len() != $arity {
                        return Err(DecodeError::ArityMismatch {
                            expected: $arity,
                            actual: nulls.len(),
                        });
                    }
                    let record = ($($field::decode(input)?,)+);
                    Ok(Tuple { record, nulls })
                }
            }
        )+
    };
}

records! {
    (A.0) => 1,
    (A.0, B.1) => 2,
    (A.0, B.1, C.2) => 3,
    (A.0, B.1, C.2, D.3) => 4,
    (A.0, B.1, C.2, D.3, E.4) => 5,
    (A.0, B.1, C.2, D.3, E.4, F.5) => 6,
    (A.0, B.1, C.2, D.3, E.4, F.5, G.6) => 7,
    (A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7) => 8,
}

/// Implements [`Concat`] for one pair of arities.
macro_rules! concats {
    ($(($($l:ident . $li:tt),+ ; $($r:ident . $ri:tt),+)),+ $(,)?) => {
        $(
            impl<$($l,)+ $($r),+> Concat<($($r,)+)> for ($($l,)+)
            where
                $($l: Field,)+
                $($r: Field),+
            {
                type Output = ($($l,)+ $($r,)+);

                /// Concatenates the two records, left fields first.
                fn concat(&self, other: &($($r,)+)) -> Self::Output {
                    ($(self.$li.clone(),)+ $(other.$ri.clone(),)+)
                }
            }
        )+
    };
}

concats! {
    (A.0; W.0),
    (A.0; W.0, X.1),
    (A.0; W.0, X.1, Y.2),
    (A.0; W.0, X.1, Y.2, Z.3),
    (A.0, B.1; W.0),
    (A.0, B.1; W.0, X.1),
    (A.0, B.1; W.0, X.1, Y.2),
    (A.0, B.1; W.0, X.1, Y.2, Z.3),
    (A.0, B.1, C.2; W.0),
    (A.0, B.1, C.2; W.0, X.1),
    (A.0, B.1, C.2; W.0, X.1, Y.2),
    (A.0, B.1, C.2; W.0, X.1, Y.2, Z.3),
    (A.0, B.1, C.2, D.3; W.0),
    (A.0, B.1, C.2, D.3; W.0, X.1),
    (A.0, B.1, C.2, D.3; W.0, X.1, Y.2),
    (A.0, B.1, C.2, D.3; W.0, X.1, Y.2, Z.3),
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    mod record {
        use crate::element::record::{Concat, Record};

        #[test]
        fn reports_arity() {
            assert_eq!(<(i64,)>::ARITY, 1);
            assert_eq!(<(i64, f64, String)>::ARITY, 3);
            assert_eq!(<(i64, i64, i64, i64, i64, i64, i64, i64)>::ARITY, 8);
        }

        #[test]
        fn concatenates_pairs() {
            let left = (1i64, 2.0f64);
            let right = ("key".to_string(), 3u64);
            let out = left.concat(&right);
            assert_eq!(out, (1i64, 2.0f64, "key".to_string(), 3u64));
        }
    }
}
