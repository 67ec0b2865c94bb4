// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The per-file coroutine body.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use weave_rt::{Coro, TaskError};

use crate::parse::parse_ints;
use crate::sort::merge_sort;

/// Where a task leaves its sorted sequence. Only written once the task
/// has finished successfully.
pub type OutputSlot = Rc<RefCell<Vec<i32>>>;

/// Body that reads `path`, gives the other tasks a turn, then parses and
/// sorts the contents into `slot`.
///
/// A read error fails the task only after that turn, so tasks ahead of it
/// in the queue get to finish first.
pub fn sort_file_task(
    path: PathBuf,
    slot: OutputSlot,
) -> impl FnOnce(&Coro<'_>) -> Result<(), TaskError> + 'static {
    move |coro: &Coro<'_>| {
        let read = coro.try_read_file(&path);
        coro.yield_now();

        let bytes = match read {
            Ok(bytes) => bytes,
            Err(err) => coro.fail(err),
        };

        let mut values = parse_ints(&bytes);
        merge_sort(&mut values);
        log::debug!(
            "task {}: sorted {} values from {}",
            coro.id(),
            values.len(),
            path.display()
        );
        *slot.borrow_mut() = values;
        Ok(())
    }
}
