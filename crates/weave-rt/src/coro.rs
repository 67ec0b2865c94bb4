// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Coroutine control API.
//!
//! Every task body receives a `Coro`. It is the only way to give up the
//! CPU, so control calls outside a running coroutine cannot be written.

use std::path::Path;

use corosensei::Yielder;

use crate::entity::{EntityId, EntityKey, Resume, Switch};
use crate::error::TaskError;
use crate::io::ReadRequest;

/// Handle lent to a running task body.
pub struct Coro<'a> {
    yielder: &'a Yielder<Resume, Switch>,
    key: EntityKey,
    id: EntityId,
}

impl<'a> Coro<'a> {
    pub(crate) fn new(yielder: &'a Yielder<Resume, Switch>, key: EntityKey, id: EntityId) -> Self {
        Self { yielder, key, id }
    }

    /// Id of the task this body runs as.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Give up the turn. The task goes to the tail of the run queue.
    pub fn yield_now(&self) {
        match self.yielder.suspend(Switch::Yield) {
            Resume::Continue => {}
            _ => abort("resumed after yield with an unexpected input"),
        }
    }

    /// Park the task until `request` completes, then hand it back.
    ///
    /// The request must already be submitted (or refused); the scheduler
    /// files it in the suspension table and only resumes this task once it
    /// is finished. A request issued by another task becomes this task's.
    pub fn suspend(&self, mut request: ReadRequest) -> ReadRequest {
        request.adopt(self.key, self.id);
        match self.yielder.suspend(Switch::Suspend(request)) {
            Resume::Io(done) => done,
            _ => abort("resumed from suspension without a completed read"),
        }
    }

    /// End the task as failed. Never returns.
    pub fn fail(&self, err: TaskError) -> ! {
        let _ = self.yielder.suspend(Switch::Fail(err));
        abort("returned to a failed coroutine")
    }

    /// Prepare and submit a read of the whole file at `path`.
    pub fn start_read(&self, path: impl AsRef<Path>) -> Result<ReadRequest, TaskError> {
        let mut req = ReadRequest::prepare(path.as_ref(), self.key, self.id)?;
        req.submit()?;
        Ok(req)
    }

    /// Read the whole file at `path`, suspending until the OS is done.
    ///
    /// Any I/O error fails the task.
    pub fn read_file(&self, path: impl AsRef<Path>) -> Vec<u8> {
        match self.try_read_file(path) {
            Ok(bytes) => bytes,
            Err(err) => self.fail(err),
        }
    }

    /// `read_file` that reports errors instead of failing the task.
    ///
    /// Errors are only seen after the suspension, so a path that cannot
    /// even be opened still gives the other tasks their turn first.
    pub fn try_read_file(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, TaskError> {
        let path = path.as_ref();
        let req = match self.start_read(path) {
            Ok(req) => req,
            Err(err) => {
                log::debug!("task {}: read of {} refused: {}", self.id, path.display(), err);
                ReadRequest::refused(path, self.key, self.id, err)
            }
        };
        self.suspend(req).into_bytes()
    }
}

/// Bail out when the scheduler's own bookkeeping can no longer be trusted.
pub(crate) fn abort(what: &str) -> ! {
    log::error!("scheduler corrupted: {}; aborting", what);
    eprintln!("weave: scheduler corrupted: {}", what);
    std::process::abort()
}
