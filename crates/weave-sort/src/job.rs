// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! One scheduler run over a set of input files.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use weave_rt::{RunReport, SchedError, Scheduler, SchedulerConfig};

use crate::sort::merge_sorted;
use crate::task::{sort_file_task, OutputSlot};

/// Per-file sorted sequences, in input order, plus the run's accounting.
#[derive(Debug)]
pub struct SortedFiles {
    pub sequences: Vec<Vec<i32>>,
    pub report: RunReport,
}

impl SortedFiles {
    /// k-way merge of every sequence.
    pub fn merged(&self) -> Vec<i32> {
        merge_sorted(&self.sequences)
    }
}

/// Sort every file on one scheduler, one task per file.
///
/// The suspension table is sized to the number of files, so every task
/// can have its read in flight at once. Any failure means none of the
/// outputs can be trusted; nothing partial is returned.
pub fn sort_files(paths: &[PathBuf], stack_size: Option<usize>) -> Result<SortedFiles, SchedError> {
    let mut config = SchedulerConfig::from_env(paths.len());
    if let Some(size) = stack_size {
        config = config.with_stack_size(size);
    }
    let mut sched = Scheduler::with_config(config)?;

    let slots: Vec<OutputSlot> = paths.iter().map(|_| Rc::new(RefCell::new(Vec::new()))).collect();
    for (path, slot) in paths.iter().zip(&slots) {
        sched.submit(sort_file_task(path.clone(), slot.clone()))?;
    }

    let report = sched.run_loop()?;
    let leaked = sched.destroy();
    debug_assert_eq!(leaked, 0);

    let sequences = slots.into_iter().map(|slot| slot.take()).collect();
    Ok(SortedFiles { sequences, report })
}
