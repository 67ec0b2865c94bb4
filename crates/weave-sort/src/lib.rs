// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Sort-and-merge workload for the weave runtime.
//!
//! Each input file becomes one coroutine: read it asynchronously, parse
//! the integers, merge-sort them. The host then k-way merges the sorted
//! sequences and writes the result.
//!
//! Components:
//! - `parse`: whitespace-separated integers out of raw bytes
//! - `sort`: in-place merge sort, k-way merge
//! - `store`: write a sequence back to a file
//! - `task`: the per-file coroutine body
//! - `job`: schedule one task per file and collect the outputs

pub mod job;
pub mod parse;
pub mod sort;
pub mod store;
pub mod task;

pub use job::{sort_files, SortedFiles};
pub use parse::parse_ints;
pub use sort::{merge_sort, merge_sorted};
pub use store::{store_ints, StoreError};
pub use task::{sort_file_task, OutputSlot};
