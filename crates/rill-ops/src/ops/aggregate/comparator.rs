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

//! Comparator.

use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Comparator.
///
/// This trait defines a comparator for values of type `T`, which allows
/// ordered aggregates to work with value types that have no natural total
/// order, most notably doubles. Comparators are zero-sized types, so they
/// are optimized away entirely.
pub trait Comparator<T>: Default {
    /// Compares two values.
    fn cmp(&self, a: &T, b: &T) -> Ordering;
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Comparator for ascending order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Ascending;

/// Comparator for descending order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Descending;

/// Comparator imposing a total order on floating-point values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TotalOrder;

/// Comparable value.
///
/// A thin wrapper around a value of type `T` with a comparator `C` defining
/// its ordering, which makes the value usable as a key in ordered stores.
/// Equality is induced by the comparator as well.
///
/// # Examples
///
/// ```
/// use rill_ops::ops::aggregate::comparator::{Comparable, TotalOrder};
///
/// // Create and compare values
/// let a: Comparable<f64, TotalOrder> = 1.5.into();
/// let b: Comparable<f64, TotalOrder> = 2.5.into();
/// assert!(a < b);
/// ```
#[derive(Clone)]
pub struct Comparable<T, C = Ascending>(T, PhantomData<C>);

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<T> Comparator<T> for Ascending
where
    T: Ord,
{
    /// Compares two values in ascending order.
    #[inline]
    fn cmp(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}

impl<T> Comparator<T> for Descending
where
    T: Ord,
{
    /// Compares two values in descending order.
    #[inline]
    fn cmp(&self, a: &T, b: &T) -> Ordering {
        b.cmp(a)
    }
}

impl Comparator<f64> for TotalOrder {
    /// Compares two doubles per the IEEE 754 total order.
    #[inline]
    fn cmp(&self, a: &f64, b: &f64) -> Ordering {
        a.total_cmp(b)
    }
}

// ----------------------------------------------------------------------------

impl<T, C> From<T> for Comparable<T, C> {
    /// Creates a comparable value from a value.
    #[inline]
    fn from(value: T) -> Self {
        Comparable(value, PhantomData)
    }
}

impl<T, C> Deref for Comparable<T, C> {
    type Target = T;

    /// Dereferences to the wrapped value.
    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// ----------------------------------------------------------------------------

impl<T, C> PartialEq for Comparable<T, C>
where
    C: Comparator<T>,
{
    /// Compares two values for equality via the comparator.
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        C::default().cmp(&self.0, &other.0) == Ordering::Equal
    }
}

impl<T, C> Eq for Comparable<T, C> where C: Comparator<T> {}

impl<T, C> PartialOrd for Comparable<T, C>
where
    C: Comparator<T>,
{
    /// Orders two values via the comparator.
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T, C> Ord for Comparable<T, C>
where
    C: Comparator<T>,
{
    /// Orders two values via the comparator.
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        C::default().cmp(&self.0, &other.0)
    }
}

// ----------------------------------------------------------------------------

impl<T, C> fmt::Debug for Comparable<T, C>
where
    T: fmt::Debug,
{
    /// Formats the wrapped value for debugging.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    mod comparator {
        use crate::ops::aggregate::comparator::{
            Ascending, Comparable, Descending, TotalOrder,
        };

        #[test]
        fn orders_naturally() {
            let a: Comparable<i64> = 1.into();
            let b: Comparable<i64> = 2.into();
            assert!(a < b);
        }

        #[test]
        fn reverses_order() {
            let a: Comparable<i64, Descending> = 1.into();
            let b: Comparable<i64, Descending> = 2.into();
            assert!(a > b);
        }

        #[test]
        fn totally_orders_doubles() {
            let a: Comparable<f64, TotalOrder> = f64::NEG_INFINITY.into();
            let b: Comparable<f64, TotalOrder> = 0.0.into();
            let c: Comparable<f64, TotalOrder> = f64::NAN.into();
            assert!(a < b);
            assert!(b < c);
        }

        #[test]
        fn derefs_to_value() {
            let value: Comparable<i64, Ascending> = 42.into();
            assert_eq!(*value, 42);
        }
    }
}
