// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Weave runtime: cooperative coroutines with asynchronous file reads.
//!
//! Many logical tasks, one OS thread. Tasks are stackful coroutines that
//! give up the CPU only at explicit points: `yield_now`, a suspension on
//! an outstanding read, failure, or return. When nothing is runnable the
//! scheduler blocks until the OS finishes one of the outstanding reads.
//!
//! Components:
//! - `entity`: per-task descriptor, arena, context switch
//! - `queue`: FIFO run queue
//! - `table`: fixed-capacity suspension table + wait-any
//! - `io`: POSIX AIO whole-file read requests
//! - `coro`: control API lent to task bodies
//! - `scheduler`: the loop, submission, teardown
//! - `config`: stack size and concurrency bound

pub mod config;
pub mod coro;
pub mod entity;
pub mod error;
pub mod io;
mod queue;
pub mod scheduler;
mod table;

pub use config::SchedulerConfig;
pub use coro::Coro;
pub use entity::{EntityId, Status};
pub use error::{SchedError, TaskError};
pub use io::ReadRequest;
pub use scheduler::{Outcome, RunReport, Scheduler, TaskStats};
