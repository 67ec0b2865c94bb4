// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Asynchronous whole-file reads (POSIX AIO).
//!
//! A `ReadRequest` owns the open file, the control block and the
//! destination buffer, so none of them can be freed while the request is
//! in flight. It moves from the issuing coroutine into the suspension
//! table and back again; the coroutine only ever sees its own bytes.
//!
//! A path that cannot be stat'ed, opened or submitted still produces a
//! request: a refused one, which never reaches the OS and carries its
//! error back to the owner through the table like any other completion.

use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use crate::entity::{EntityId, EntityKey};
use crate::error::TaskError;

/// Where an issued request stands.
#[derive(Debug)]
pub(crate) enum Progress {
    Pending,
    Complete,
    Cancelled,
    Failed(io::Error),
    /// Never submitted; the error is handed over by `into_bytes`.
    Refused,
}

/// One outstanding read of an entire file.
pub struct ReadRequest {
    path: PathBuf,
    file: Option<File>,
    cb: Box<libc::aiocb>,
    buf: Vec<u8>,
    pub(crate) owner: EntityKey,
    owner_id: EntityId,
    /// Submitted and not yet reaped with `aio_return`.
    in_flight: bool,
    refused: Option<TaskError>,
}

impl ReadRequest {
    /// Stat and open `path`, and size a buffer for its contents.
    pub(crate) fn prepare(
        path: &Path,
        owner: EntityKey,
        owner_id: EntityId,
    ) -> Result<Self, TaskError> {
        let meta = std::fs::metadata(path).map_err(|source| TaskError::Stat {
            path: path.to_path_buf(),
            source,
        })?;
        let size = meta.len() as usize;

        let file = File::open(path).map_err(|source| TaskError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let mut buf = Vec::new();
        buf.try_reserve_exact(size).map_err(|_| TaskError::Read {
            path: path.to_path_buf(),
            source: io::Error::new(
                io::ErrorKind::OutOfMemory,
                format!("cannot allocate {} bytes", size),
            ),
        })?;
        buf.resize(size, 0);

        // SAFETY: aiocb is plain old data; all-zero is a valid initial state.
        let mut cb: Box<libc::aiocb> = Box::new(unsafe { std::mem::zeroed() });
        cb.aio_fildes = file.as_raw_fd();
        cb.aio_offset = 0;
        cb.aio_buf = buf.as_mut_ptr() as *mut libc::c_void;
        cb.aio_nbytes = buf.len();
        cb.aio_sigevent.sigev_notify = libc::SIGEV_NONE;

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            cb,
            buf,
            owner,
            owner_id,
            in_flight: false,
            refused: None,
        })
    }

    /// A request that failed before reaching the OS.
    pub(crate) fn refused(
        path: &Path,
        owner: EntityKey,
        owner_id: EntityId,
        err: TaskError,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            file: None,
            // SAFETY: as in `prepare`; never handed to the OS.
            cb: Box::new(unsafe { std::mem::zeroed() }),
            buf: Vec::new(),
            owner,
            owner_id,
            in_flight: false,
            refused: Some(err),
        }
    }

    /// Hand the request to another entity, which is then the one woken
    /// when it finishes.
    pub(crate) fn adopt(&mut self, owner: EntityKey, owner_id: EntityId) {
        if self.owner != owner {
            log::debug!(
                "read of {} moves from task {} to task {}",
                self.path.display(),
                self.owner_id,
                owner_id
            );
        }
        self.owner = owner;
        self.owner_id = owner_id;
    }

    /// Hand the read to the OS. Returns immediately.
    pub(crate) fn submit(&mut self) -> Result<(), TaskError> {
        let ret = unsafe { libc::aio_read(self.cb.as_mut()) };
        if ret < 0 {
            return Err(TaskError::Submit {
                path: self.path.clone(),
                source: io::Error::last_os_error(),
            });
        }
        self.in_flight = true;
        log::debug!(
            "task {}: read of {} ({} bytes) submitted",
            self.owner_id,
            self.path.display(),
            self.buf.len()
        );
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Id of the task that issued this request.
    pub fn owner(&self) -> EntityId {
        self.owner_id
    }

    /// Size of the buffer the read fills.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Submitted to the OS and not yet reaped.
    pub(crate) fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub(crate) fn aiocb_ptr(&self) -> *const libc::aiocb {
        self.cb.as_ref() as *const libc::aiocb
    }

    pub(crate) fn progress(&self) -> Progress {
        if self.refused.is_some() {
            return Progress::Refused;
        }
        if !self.in_flight {
            return Progress::Complete;
        }
        match unsafe { libc::aio_error(self.cb.as_ref()) } {
            0 => Progress::Complete,
            libc::EINPROGRESS => Progress::Pending,
            libc::ECANCELED => Progress::Cancelled,
            -1 => Progress::Failed(io::Error::last_os_error()),
            code => Progress::Failed(io::Error::from_raw_os_error(code)),
        }
    }

    /// Reap a finished request and take the bytes it read, or the error
    /// that stopped it.
    pub fn into_bytes(mut self) -> Result<Vec<u8>, TaskError> {
        if let Some(err) = self.refused.take() {
            return Err(err);
        }
        if let Progress::Failed(source) = self.progress() {
            self.reap();
            return Err(TaskError::Read {
                path: self.path.clone(),
                source,
            });
        }
        let n = self.reap();
        if n < 0 {
            return Err(TaskError::Read {
                path: self.path.clone(),
                source: io::Error::last_os_error(),
            });
        }
        let n = n as usize;
        if n < self.buf.len() {
            log::warn!(
                "short read of {}: {} of {} bytes",
                self.path.display(),
                n,
                self.buf.len()
            );
        }
        let mut buf = std::mem::take(&mut self.buf);
        buf.truncate(n);
        Ok(buf)
    }

    /// Release the OS side of a finished request. Returns the byte count.
    fn reap(&mut self) -> isize {
        if !self.in_flight {
            return self.buf.len() as isize;
        }
        self.in_flight = false;
        unsafe { libc::aio_return(self.cb.as_mut()) }
    }
}

impl std::fmt::Debug for ReadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadRequest")
            .field("path", &self.path)
            .field("owner", &self.owner_id)
            .field("len", &self.buf.len())
            .field("in_flight", &self.in_flight)
            .field("refused", &self.refused.is_some())
            .finish()
    }
}

impl Drop for ReadRequest {
    fn drop(&mut self) {
        if !self.in_flight {
            return;
        }
        // The buffer must outlive the OS's use of it: cancel, then wait.
        if let Some(file) = &self.file {
            unsafe {
                libc::aio_cancel(file.as_raw_fd(), self.cb.as_mut());
            }
        }
        while matches!(self.progress(), Progress::Pending) {
            let list = [self.aiocb_ptr()];
            unsafe {
                libc::aio_suspend(list.as_ptr(), 1, std::ptr::null());
            }
        }
        self.reap();
    }
}
