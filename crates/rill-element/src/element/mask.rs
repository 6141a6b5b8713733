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

//! Null mask.

use std::fmt;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Null mask.
///
/// A per-field validity bitmask whose length always equals the arity of the
/// record it belongs to. A set bit marks the field at that index as null.
/// Records are limited to 32 fields, which is far above the supported arity.
///
/// # Examples
///
/// ```
/// use rill_element::NullMask;
///
/// // Create mask and mark a field as null
/// let mask = NullMask::new(3).with_null(1);
/// assert!(!mask.is_null(0));
/// assert!(mask.is_null(1));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NullMask {
    /// Null bits, one per field.
    bits: u32,
    /// Number of fields.
    arity: u8,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl NullMask {
    /// Creates a mask of the given arity with all fields valid.
    ///
    /// # Panics
    ///
    /// Panics if the arity exceeds 32 fields.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn new(arity: usize) -> Self {
        assert!(arity <= 32, "null mask supports at most 32 fields");
        Self { bits: 0, arity: arity as u8 }
    }

    /// Recreates a mask from its raw parts.
    ///
    /// Bits beyond the arity are discarded, so the invariant that the mask
    /// length equals the arity holds for any input.
    #[must_use]
    pub fn from_bits(bits: u32, arity: usize) -> Self {
        let mut mask = Self::new(arity);
        mask.bits = bits & mask.all_bits();
        mask
    }

    /// Marks the field at the given index as null.
    #[must_use]
    pub fn with_null(mut self, index: usize) -> Self {
        self.set(index, true);
        self
    }

    /// Sets or clears the null bit at the given index.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    #[inline]
    pub fn set(&mut self, index: usize, null: bool) {
        assert!(index < self.len(), "field index out of bounds");
        if null {
            self.bits |= 1 << index;
        } else {
            self.bits &= !(1 << index);
        }
    }

    /// Returns whether the field at the given index is null.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    #[inline]
    #[must_use]
    pub fn is_null(&self, index: usize) -> bool {
        assert!(index < self.len(), "field index out of bounds");
        self.bits & (1 << index) != 0
    }

    /// Returns whether any field is null.
    #[inline]
    #[must_use]
    pub fn any_null(&self) -> bool {
        self.bits != 0
    }

    /// Returns the raw null bits.
    #[inline]
    #[must_use]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Returns the number of fields.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.arity)
    }

    /// Returns whether the mask covers no fields.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arity == 0
    }

    /// Concatenates two masks, left fields first.
    #[must_use]
    pub fn concat(&self, other: &Self) -> Self {
        let mut mask = Self::new(self.len() + other.len());
        mask.bits = self.bits | (other.bits << self.arity);
        mask
    }

    /// Returns a bit pattern covering all fields.
    fn all_bits(&self) -> u32 {
        if self.arity == 32 {
            u32::MAX
        } else {
            (1 << self.arity) - 1
        }
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl fmt::Debug for NullMask {
    /// Formats the mask for debugging, lowest field first.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "NullMask(")?;
        for index in 0..self.len() {
            write!(f, "{}", u8::from(self.is_null(index)))?;
        }
        write!(f, ")")
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    mod mask {
        use crate::element::mask::NullMask;

        #[test]
        fn tracks_length() {
            let mask = NullMask::new(4);
            assert_eq!(mask.len(), 4);
            assert!(!mask.any_null());
        }

        #[test]
        fn sets_and_clears() {
            let mut mask = NullMask::new(2);
            mask.set(0, true);
            assert!(mask.is_null(0));
            mask.set(0, false);
            assert!(!mask.is_null(0));
        }

        #[test]
        fn concatenates() {
            let left = NullMask::new(2).with_null(1);
            let right = NullMask::new(1).with_null(0);
            let mask = left.concat(&right);
            assert_eq!(mask.len(), 3);
            assert!(!mask.is_null(0));
            assert!(mask.is_null(1));
            assert!(mask.is_null(2));
        }

        #[test]
        fn discards_excess_bits() {
            let mask = NullMask::from_bits(0b1111, 2);
            assert_eq!(mask.bits(), 0b11);
        }

        #[test]
        #[should_panic(expected = "field index out of bounds")]
        fn rejects_out_of_bounds() {
            let _ = NullMask::new(1).is_null(1);
        }
    }
}
