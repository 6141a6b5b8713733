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

//! Scalar aggregate functions.

use litemap::LiteMap;
use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Add, Sub};

use super::comparator::{Ascending, Comparable, Comparator};

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Scalar aggregate.
///
/// One incremental aggregator addressing a single field of the input
/// element. Iterating with an outdated value subtracts the value from the
/// internal state, so the partial result always reflects the live window
/// contents upstream.
pub trait Aggregate: Default + Send + 'static {
    /// Input value type.
    type Input;
    /// Partial result type.
    type Output;

    /// Resets the internal state.
    fn init(&mut self);

    /// Incorporates a value; an outdated value subtracts.
    fn iterate(&mut self, value: &Self::Input, outdated: bool);

    /// Reads the current partial result.
    fn value(&self) -> Self::Output;
}

/// Field type usable in additive aggregates.
pub trait Numeric:
    Copy
    + Default
    + Add<Output = Self>
    + Sub<Output = Self>
    + Send
    + Sync
    + fmt::Debug
    + 'static
{
}

impl<T> Numeric for T where
    T: Copy
        + Default
        + Add<Output = T>
        + Sub<Output = T>
        + Send
        + Sync
        + fmt::Debug
        + 'static
{
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Incremental sum.
#[derive(Clone, Debug, Default)]
pub struct Sum<T> {
    /// Running sum.
    sum: T,
}

/// Incremental average over a running sum and count.
#[derive(Clone, Debug, Default)]
pub struct Avg<T> {
    /// Running sum.
    sum: f64,
    /// Running count.
    count: i64,
    /// Input type marker.
    marker: PhantomData<fn(T)>,
}

/// Incremental count.
#[derive(Clone, Debug)]
pub struct Count<T> {
    /// Running count.
    count: i64,
    /// Input type marker.
    marker: PhantomData<fn(T)>,
}

impl<T> Default for Count<T> {
    fn default() -> Self {
        Self {
            count: 0,
            marker: PhantomData,
        }
    }
}

/// Incremental minimum.
///
/// Keeps an ordered multiset of all live values, so removing an outdated
/// value costs a logarithmic lookup instead of a rescan. The comparator
/// defaults to the natural order; doubles use [`TotalOrder`][].
///
/// [`TotalOrder`]: super::comparator::TotalOrder
pub struct Min<T, C = Ascending> {
    /// Ordered multiset of live values and their multiplicities.
    multiset: LiteMap<Comparable<T, C>, usize>,
}

/// Incremental maximum.
///
/// The mirror image of [`Min`], reading the greatest live value.
pub struct Max<T, C = Ascending> {
    /// Ordered multiset of live values and their multiplicities.
    multiset: LiteMap<Comparable<T, C>, usize>,
}

/// Most recent value.
#[derive(Clone, Debug, Default)]
pub struct MostRecent<T> {
    /// Last non-outdated value.
    value: Option<T>,
}

/// Least recent value.
///
/// Keeps all live values in arrival order, so revoking the oldest value
/// reveals the next oldest.
#[derive(Clone, Debug, Default)]
pub struct LeastRecent<T> {
    /// Live values in arrival order.
    values: VecDeque<T>,
}

/// Identity of the last processed value.
#[derive(Clone, Debug, Default)]
pub struct Identity<T> {
    /// Last processed value.
    value: Option<T>,
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<T> Aggregate for Sum<T>
where
    T: Numeric,
{
    type Input = T;
    type Output = T;

    #[inline]
    fn init(&mut self) {
        self.sum = T::default();
    }

    /// Adds the value, or subtracts its additive inverse when outdated.
    #[inline]
    fn iterate(&mut self, value: &T, outdated: bool) {
        self.sum = if outdated {
            self.sum - *value
        } else {
            self.sum + *value
        };
    }

    #[inline]
    fn value(&self) -> T {
        self.sum
    }
}

// ----------------------------------------------------------------------------

impl<T> Aggregate for Avg<T>
where
    T: Numeric + Into<f64>,
{
    type Input = T;
    type Output = f64;

    #[inline]
    fn init(&mut self) {
        self.sum = 0.0;
        self.count = 0;
    }

    #[inline]
    fn iterate(&mut self, value: &T, outdated: bool) {
        let value: f64 = (*value).into();
        if outdated {
            self.sum -= value;
            self.count -= 1;
        } else {
            self.sum += value;
            self.count += 1;
        }
    }

    /// Returns the running average, or zero over an empty state.
    #[allow(clippy::cast_precision_loss)]
    #[inline]
    fn value(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

// ----------------------------------------------------------------------------

impl<T> Aggregate for Count<T>
where
    T: 'static,
{
    type Input = T;
    type Output = i64;

    #[inline]
    fn init(&mut self) {
        self.count = 0;
    }

    #[inline]
    fn iterate(&mut self, _: &T, outdated: bool) {
        self.count += if outdated { -1 } else { 1 };
    }

    #[inline]
    fn value(&self) -> i64 {
        self.count
    }
}

// ----------------------------------------------------------------------------

impl<T, C> Default for Min<T, C> {
    /// Creates an empty minimum aggregate.
    #[inline]
    fn default() -> Self {
        Self { multiset: LiteMap::new_vec() }
    }
}

impl<T, C> Aggregate for Min<T, C>
where
    T: Clone + Default + Send + Sync + fmt::Debug + 'static,
    C: Comparator<T> + Send + Sync + 'static,
{
    type Input = T;
    type Output = T;

    #[inline]
    fn init(&mut self) {
        self.multiset = LiteMap::new_vec();
    }

    fn iterate(&mut self, value: &T, outdated: bool) {
        iterate_multiset(&mut self.multiset, value, outdated);
    }

    /// Returns the least live value, or the default over an empty state.
    fn value(&self) -> T {
        self.multiset
            .iter()
            .next()
            .map(|(value, _)| (**value).clone())
            .unwrap_or_default()
    }
}

// ----------------------------------------------------------------------------

impl<T, C> Default for Max<T, C> {
    /// Creates an empty maximum aggregate.
    #[inline]
    fn default() -> Self {
        Self { multiset: LiteMap::new_vec() }
    }
}

impl<T, C> Aggregate for Max<T, C>
where
    T: Clone + Default + Send + Sync + fmt::Debug + 'static,
    C: Comparator<T> + Send + Sync + 'static,
{
    type Input = T;
    type Output = T;

    #[inline]
    fn init(&mut self) {
        self.multiset = LiteMap::new_vec();
    }

    fn iterate(&mut self, value: &T, outdated: bool) {
        iterate_multiset(&mut self.multiset, value, outdated);
    }

    /// Returns the greatest live value, or the default over an empty state.
    fn value(&self) -> T {
        self.multiset
            .iter()
            .last()
            .map(|(value, _)| (**value).clone())
            .unwrap_or_default()
    }
}

// ----------------------------------------------------------------------------

impl<T> Aggregate for MostRecent<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    type Input = T;
    type Output = T;

    #[inline]
    fn init(&mut self) {
        self.value = None;
    }

    /// Remembers the value; outdated arrivals do not displace it.
    #[inline]
    fn iterate(&mut self, value: &T, outdated: bool) {
        if !outdated {
            self.value = Some(value.clone());
        }
    }

    #[inline]
    fn value(&self) -> T {
        self.value.clone().unwrap_or_default()
    }
}

// ----------------------------------------------------------------------------

impl<T> Aggregate for LeastRecent<T>
where
    T: Clone + Default + PartialEq + Send + Sync + 'static,
{
    type Input = T;
    type Output = T;

    #[inline]
    fn init(&mut self) {
        self.values.clear();
    }

    /// Appends the value, or revokes its oldest occurrence when outdated.
    fn iterate(&mut self, value: &T, outdated: bool) {
        if outdated {
            if let Some(index) = self.values.iter().position(|v| v == value) {
                self.values.remove(index);
            }
        } else {
            self.values.push_back(value.clone());
        }
    }

    #[inline]
    fn value(&self) -> T {
        self.values.front().cloned().unwrap_or_default()
    }
}

// ----------------------------------------------------------------------------

impl<T> Aggregate for Identity<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    type Input = T;
    type Output = T;

    #[inline]
    fn init(&mut self) {
        self.value = None;
    }

    #[inline]
    fn iterate(&mut self, value: &T, _: bool) {
        self.value = Some(value.clone());
    }

    #[inline]
    fn value(&self) -> T {
        self.value.clone().unwrap_or_default()
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Adds a value to the multiset, or removes one occurrence when outdated.
fn iterate_multiset<T, C>(
    multiset: &mut LiteMap<Comparable<T, C>, usize>,
    value: &T,
    outdated: bool,
) where
    T: Clone,
    C: Comparator<T>,
{
    let key: Comparable<T, C> = value.clone().into();
    if outdated {
        // Revoking a value never seen is a silent no-op
        if let Some(count) = multiset.get_mut(&key) {
            if *count > 1 {
                *count -= 1;
            } else {
                multiset.remove(&key);
            }
        }
    } else if let Some(count) = multiset.get_mut(&key) {
        *count += 1;
    } else {
        multiset.insert(key, 1);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    mod functions {
        use crate::ops::aggregate::comparator::{Descending, TotalOrder};
        use crate::ops::aggregate::functions::{
            Aggregate, Avg, Count, LeastRecent, Max, Min, MostRecent, Sum,
        };

        #[test]
        fn sum_subtracts_outdated() {
            let mut sum = Sum::<f64>::default();
            for value in [1.0, 2.0, 3.0] {
                sum.iterate(&value, false);
            }
            sum.iterate(&2.0, true);
            assert!((sum.value() - 4.0).abs() < f64::EPSILON);

            sum.init();
            assert!(sum.value().abs() < f64::EPSILON);
        }

        #[test]
        fn avg_tracks_sum_and_count() {
            let mut avg = Avg::<f64>::default();
            avg.iterate(&1.0, false);
            avg.iterate(&3.0, false);
            assert!((avg.value() - 2.0).abs() < f64::EPSILON);

            avg.iterate(&1.0, true);
            assert!((avg.value() - 3.0).abs() < f64::EPSILON);
        }

        #[test]
        fn count_goes_both_ways() {
            let mut count = Count::<i64>::default();
            count.iterate(&7, false);
            count.iterate(&7, false);
            count.iterate(&7, true);
            assert_eq!(count.value(), 1);
        }

        #[test]
        fn min_and_max_remove_in_logarithmic_multiset() {
            let mut min = Min::<f64, TotalOrder>::default();
            let mut max = Max::<f64, TotalOrder>::default();
            for value in [3.4, 2.1, 3.0, 2.1] {
                min.iterate(&value, false);
                max.iterate(&value, false);
            }
            assert!((min.value() - 2.1).abs() < f64::EPSILON);
            assert!((max.value() - 3.4).abs() < f64::EPSILON);

            // One of the duplicates goes, the other remains
            min.iterate(&2.1, true);
            max.iterate(&3.4, true);
            assert!((min.value() - 2.1).abs() < f64::EPSILON);
            assert!((max.value() - 3.0).abs() < f64::EPSILON);

            min.iterate(&2.1, true);
            assert!((min.value() - 3.0).abs() < f64::EPSILON);
        }

        #[test]
        fn min_with_descending_reads_greatest() {
            let mut min = Min::<i64, Descending>::default();
            for value in [5, 9, 1] {
                min.iterate(&value, false);
            }
            assert_eq!(min.value(), 9);
        }

        #[test]
        fn recency_follows_revocations() {
            let mut most = MostRecent::<f64>::default();
            let mut least = LeastRecent::<f64>::default();
            for value in [3.4, 2.1, 3.0] {
                most.iterate(&value, false);
                least.iterate(&value, false);
            }
            assert!((most.value() - 3.0).abs() < f64::EPSILON);
            assert!((least.value() - 3.4).abs() < f64::EPSILON);

            most.iterate(&3.4, true);
            least.iterate(&3.4, true);
            assert!((most.value() - 3.0).abs() < f64::EPSILON);
            assert!((least.value() - 2.1).abs() < f64::EPSILON);
        }
    }
}
