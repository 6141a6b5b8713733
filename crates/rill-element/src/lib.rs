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

//! Element model for tuple streams.
//!
//! This crate defines what flows between stream operators: immutable, shared
//! [`Tuple`] records with per-field [`NullMask`] validity, the [`Element`]
//! pair of a data handle and its outdated flag, and out-of-band
//! [`Punctuation`] control records. It also provides the monotonic
//! [`Timestamp`] type and a small binary codec.

pub mod element;

pub use element::codec::{Decode, DecodeError, Encode};
pub use element::field::{Field, StrRef};
pub use element::mask::NullMask;
pub use element::punctuation::{Kind, Punctuation, PunctuationRef};
pub use element::record::{Concat, Record};
pub use element::time::Timestamp;
pub use element::{Element, Key, StreamData, Tuple, TupleRef};
