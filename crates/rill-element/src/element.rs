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

//! Element model.

use std::sync::Arc;

pub mod codec;
pub mod field;
pub mod mask;
pub mod punctuation;
pub mod record;
pub mod time;

use mask::NullMask;
use record::{Concat, Record};

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Stream data.
///
/// Anything carried on a data channel must be cheaply cloneable and sendable
/// between threads, since publication is synchronous and fans out to every
/// subscriber. Tuple streams carry [`TupleRef`] handles, batched streams
/// carry shared vectors, but the substrate itself is agnostic.
pub trait StreamData: Clone + Send + Sync + 'static {}

impl<T> StreamData for T where T: Clone + Send + Sync + 'static {}

/// Key.
///
/// Values extracted by key functions for grouping, joining, partitioning
/// and table access.
pub trait Key: Eq + std::hash::Hash + Clone + Send + Sync + 'static {}

impl<T> Key for T where T: Eq + std::hash::Hash + Clone + Send + Sync + 'static {}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Tuple.
///
/// A tuple is an immutable, fixed-arity record whose per-field types are part
/// of an operator's type signature. Each tuple carries a [`NullMask`] with
/// exactly one bit per field. Tuples are shared between operators through
/// [`TupleRef`] handles, so revoking a tuple downstream never copies it.
///
/// # Examples
///
/// ```
/// use rill_element::Tuple;
///
/// // Create tuple and read a field
/// let tuple = Tuple::new((42i64, 3.25f64));
/// assert_eq!(tuple.record().0, 42);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Tuple<R> {
    /// Record holding the field values.
    pub(crate) record: R,
    /// Per-field validity.
    pub(crate) nulls: NullMask,
}

/// Shared handle to a tuple.
pub type TupleRef<R> = Arc<Tuple<R>>;

/// Stream element.
///
/// The pair of a data handle and its outdated flag. The outdated flag is the
/// sole mechanism by which stateful operators learn that a previously
/// emitted tuple is being revoked: stateless operators pass it through
/// unchanged, stateful operators subtract from their state.
#[derive(Clone, Debug, PartialEq)]
pub struct Element<D> {
    /// Data handle.
    pub data: D,
    /// Whether the element revokes a prior emission.
    pub outdated: bool,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<R> Tuple<R>
where
    R: Record,
{
    /// Creates a shared tuple with all fields valid.
    ///
    /// # Examples
    ///
    /// ```
    /// use rill_element::Tuple;
    ///
    /// // Create tuple
    /// let tuple = Tuple::new((1i64,));
    /// assert!(!tuple.is_null(0));
    /// ```
    pub fn new(record: R) -> TupleRef<R> {
        Arc::new(Self {
            record,
            nulls: NullMask::new(R::ARITY),
        })
    }

    /// Creates a shared tuple with the given null mask.
    ///
    /// # Panics
    ///
    /// Panics if the mask length does not equal the record arity. This is a
    /// construction-time error and therefore fatal.
    pub fn with_nulls(record: R, nulls: NullMask) -> TupleRef<R> {
        assert_eq!(
            nulls.len(),
            R::ARITY,
            "null mask length must equal record arity"
        );
        Arc::new(Self { record, nulls })
    }

    /// Returns a reference to the record.
    #[inline]
    #[must_use]
    pub fn record(&self) -> &R {
        &self.record
    }

    /// Returns the null mask.
    #[inline]
    #[must_use]
    pub fn nulls(&self) -> &NullMask {
        &self.nulls
    }

    /// Returns whether the field at the given index is null.
    #[inline]
    #[must_use]
    pub fn is_null(&self, index: usize) -> bool {
        self.nulls.is_null(index)
    }

    /// Returns whether two handles refer to the same tuple.
    ///
    /// Stateful operators that must remove a previously buffered tuple upon
    /// an outdated arrival identify it by handle, not by value, since equal
    /// values may legitimately occur more than once in a stream.
    #[inline]
    #[must_use]
    pub fn same(a: &TupleRef<R>, b: &TupleRef<R>) -> bool {
        Arc::ptr_eq(a, b)
    }

    /// Concatenates two tuples into a new shared tuple.
    ///
    /// The output record is the concatenation of both records, and the null
    /// mask is the concatenation of both masks. This is the shape of a join
    /// result.
    ///
    /// # Examples
    ///
    /// ```
    /// use rill_element::Tuple;
    ///
    /// // Concatenate two tuples
    /// let l = Tuple::new((1i64,));
    /// let r = Tuple::new((2.5f64,));
    /// let t = Tuple::concat(&l, &r);
    /// assert_eq!(t.record(), &(1i64, 2.5f64));
    /// ```
    #[must_use]
    pub fn concat<O>(left: &TupleRef<R>, right: &TupleRef<O>) -> TupleRef<R::Output>
    where
        R: Concat<O>,
        O: Record,
    {
        Arc::new(Tuple {
            record: left.record.concat(&right.record),
            nulls: left.nulls.concat(&right.nulls),
        })
    }
}

// ----------------------------------------------------------------------------

impl<D> Element<D>
where
    D: StreamData,
{
    /// Creates an element.
    #[inline]
    pub fn new(data: D, outdated: bool) -> Self {
        Self { data, outdated }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    mod tuple {
        use crate::element::mask::NullMask;
        use crate::element::Tuple;

        #[test]
        fn shares_handle() {
            let tuple = Tuple::new((1i64, 2u64));
            let other = tuple.clone();
            assert!(Tuple::same(&tuple, &other));
        }

        #[test]
        fn distinguishes_equal_values() {
            let a = Tuple::new((1i64,));
            let b = Tuple::new((1i64,));
            assert_eq!(a.record(), b.record());
            assert!(!Tuple::same(&a, &b));
        }

        #[test]
        fn carries_nulls() {
            let nulls = NullMask::new(2).with_null(1);
            let tuple = Tuple::with_nulls((1i64, 2.0f64), nulls);
            assert!(!tuple.is_null(0));
            assert!(tuple.is_null(1));
        }

        #[test]
        #[should_panic(expected = "null mask length must equal record arity")]
        fn rejects_arity_mismatch() {
            let _ = Tuple::with_nulls((1i64, 2.0f64), NullMask::new(3));
        }

        #[test]
        fn concatenates() {
            let l = Tuple::with_nulls((1i64, 2i64), NullMask::new(2).with_null(0));
            let r = Tuple::new(("x".to_string(),));
            let t = Tuple::concat(&l, &r);
            assert_eq!(t.record(), &(1i64, 2i64, "x".to_string()));
            assert!(t.is_null(0));
            assert!(!t.is_null(1));
            assert!(!t.is_null(2));
        }
    }
}
