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

//! Field types.

use std::fmt;
use std::slice;
use std::str;

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Field.
///
/// Marker trait for types usable as tuple fields. Signed and unsigned
/// integers, doubles and UTF-8 strings are first-class; [`StrRef`] allows
/// sources to hand out string fields without copying.
pub trait Field: Clone + Send + Sync + fmt::Debug + 'static {}

impl Field for i64 {}
impl Field for u64 {}
impl Field for f64 {}
impl Field for String {}
impl Field for StrRef {}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// String reference.
///
/// A pointer plus length into a backing buffer owned by the producing
/// source, used by readers that parse lines or network frames to avoid
/// copying field data into every tuple. The producer guarantees that the
/// buffer outlives the synchronous publication of the tuple; any operator
/// that keeps such a tuple beyond the producing call must copy the bytes
/// via [`StrRef::to_string_copy`].
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct StrRef {
    /// Pointer into the backing buffer.
    ptr: *const u8,
    /// Length in bytes.
    len: usize,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl StrRef {
    /// Creates a string reference from raw parts.
    ///
    /// # Safety
    ///
    /// The pointed-to bytes must be valid UTF-8 and must remain valid and
    /// unmodified for as long as any reader dereferences the reference.
    #[must_use]
    pub const unsafe fn from_raw(ptr: *const u8, len: usize) -> Self {
        Self { ptr, len }
    }

    /// Creates a string reference borrowing from a string slice.
    ///
    /// # Safety
    ///
    /// The returned value does not carry a lifetime. The caller must ensure
    /// the slice's buffer outlives every tuple holding the reference.
    #[must_use]
    pub const unsafe fn from_str(value: &str) -> Self {
        Self {
            ptr: value.as_ptr(),
            len: value.len(),
        }
    }

    /// Returns the referenced string slice.
    ///
    /// # Safety
    ///
    /// The backing buffer must still be alive and unmodified.
    #[must_use]
    pub unsafe fn as_str(&self) -> &str {
        // SAFETY: Validity and UTF-8 are guaranteed by the constructor
        // contract, liveness by the caller.
        unsafe { str::from_utf8_unchecked(slice::from_raw_parts(self.ptr, self.len)) }
    }

    /// Copies the referenced bytes into an owned string.
    ///
    /// # Safety
    ///
    /// The backing buffer must still be alive and unmodified.
    #[must_use]
    pub unsafe fn to_string_copy(&self) -> String {
        unsafe { self.as_str() }.to_owned()
    }

    /// Returns the length in bytes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns whether the reference is empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

// SAFETY: A string reference is an immutable view into a buffer the producer
// keeps alive across the synchronous publication, which may traverse
// synchronized channels into other threads.
unsafe impl Send for StrRef {}
unsafe impl Sync for StrRef {}

impl fmt::Debug for StrRef {
    /// Formats the reference without dereferencing it.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("StrRef")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    mod str_ref {
        use crate::element::field::StrRef;

        #[test]
        fn reads_backing_buffer() {
            let backing = String::from("espresso");
            let value = unsafe { StrRef::from_str(&backing) };
            assert_eq!(unsafe { value.as_str() }, "espresso");
            assert_eq!(value.len(), 8);
        }

        #[test]
        fn copies_out() {
            let backing = String::from("macchiato");
            let value = unsafe { StrRef::from_str(&backing) };
            let owned = unsafe { value.to_string_copy() };
            drop(backing);
            assert_eq!(owned, "macchiato");
        }
    }
}
