// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Timing report printed after a successful run.

use std::path::{Path, PathBuf};

use weave_rt::{Outcome, RunReport};

use crate::output;

pub fn print(inputs: &[PathBuf], report: &RunReport, values: usize, out: &Path) {
    let mut tasks = report.tasks.clone();
    tasks.sort_by_key(|t| t.id);

    for task in &tasks {
        let input = inputs
            .get(task.id.get() as usize)
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let status = match task.outcome {
            Outcome::Terminated => output::status_pass(),
            Outcome::Failed => output::status_fail(),
        };
        println!(
            "{} {} {} {} {}",
            status,
            output::task_id(task.id.get()),
            output::duration(task.run_time),
            output::dim(&format!("{:>3} switches", task.switches)),
            output::file_path(&input),
        );
    }

    println!(
        "{}",
        output::dim(&format!(
            "{} switches, {} waits, at most {} suspended",
            report.switches, report.waits, report.peak_suspended
        ))
    );
    println!(
        "{} {} values -> {} in {:.3?}",
        output::banner_ok("Sort"),
        values,
        output::file_path(&out.display().to_string()),
        report.wall_time
    );
}
