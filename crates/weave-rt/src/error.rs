// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Error taxonomy for the scheduler and the tasks it runs.
//!
//! `SchedError` ends a `run_loop`. `TaskError` is a single task's outcome
//! and only reaches the host wrapped in `SchedError::TaskFailed`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::entity::EntityId;

/// Scheduler-level failures.
#[derive(Debug, Error)]
pub enum SchedError {
    #[error("cannot reserve a suspension table for {capacity} requests")]
    TableAlloc { capacity: usize },

    #[error("cannot map a {size}-byte coroutine stack: {source}")]
    StackAlloc {
        size: usize,
        #[source]
        source: io::Error,
    },

    #[error("suspension table full ({capacity} slots); more tasks suspended than the configured concurrency")]
    TableFull { capacity: usize },

    #[error("waiting for outstanding reads failed: {0}")]
    WaitAny(#[source] io::Error),

    #[error("an outstanding read was cancelled")]
    Cancelled,

    #[error("task {id} failed: {source}")]
    TaskFailed {
        id: EntityId,
        #[source]
        source: TaskError,
    },
}

/// Per-task failures, raised through `Coro::fail`.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("cannot stat `{}`: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot open `{}`: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot submit read of `{}`: {source}", path.display())]
    Submit {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("read of `{}` failed: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Custom(String),
}

impl TaskError {
    /// Free-form failure raised by a task body.
    pub fn custom(msg: impl Into<String>) -> Self {
        TaskError::Custom(msg.into())
    }
}
