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

//! Stream operators.
//!
//! The stateful and stateless operators of the engine: filters and
//! projections, windows that revoke tuples via outdated emissions,
//! incremental aggregation with four trigger modes, the symmetric hash
//! join, partitioning and merging, cross-thread queues, barriers, and the
//! stream/table bridge.

pub mod ops;

pub use ops::aggregate::aggregation::Aggregation;
pub use ops::aggregate::comparator::{
    Ascending, Comparable, Comparator, Descending, TotalOrder,
};
pub use ops::aggregate::functions::{
    Aggregate, Avg, Count, Identity, LeastRecent, Max, Min, MostRecent,
    Numeric, Sum,
};
pub use ops::aggregate::grouped::GroupedAggregation;
pub use ops::aggregate::trigger::Trigger;
pub use ops::aggregate::AggregateState;
pub use ops::barrier::{Barrier, Gate};
pub use ops::batch::{Batch, Batcher};
pub use ops::filter::Where;
pub use ops::join::SHJoin;
pub use ops::map::Map;
pub use ops::merge::Merge;
pub use ops::notify::Notify;
pub use ops::partition::PartitionBy;
pub use ops::queue::Queue;
pub use ops::sink::CollectSink;
pub use ops::source::IterSource;
pub use ops::stateful_map::StatefulMap;
pub use ops::table::{FromTable, SelectFromTable, ToTable};
pub use ops::window::{SlidingWindow, TumblingWindow, WindowSpec};
pub use ops::{KeyFn, TimestampFn};
