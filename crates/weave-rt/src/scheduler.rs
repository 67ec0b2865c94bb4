// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Single-threaded cooperative scheduler.
//!
//! Strict FIFO round-robin: pop the front of the run queue, switch to it,
//! classify it by the status it comes back with. When the queue is empty
//! but reads are outstanding, block in wait-any until one finishes.

use std::time::{Duration, Instant};

use crate::config::SchedulerConfig;
use crate::coro::{abort, Coro};
use crate::entity::{Arena, Entity, EntityId, EntityKey, Status};
use crate::error::{SchedError, TaskError};
use crate::queue::RunQueue;
use crate::table::SuspensionTable;

/// How an entity left the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The body returned.
    Terminated,
    /// The body called `fail` or panicked.
    Failed,
}

/// Accounting for one entity, recorded when it leaves the system.
#[derive(Debug, Clone)]
pub struct TaskStats {
    pub id: EntityId,
    /// Time spent on the CPU across all turns.
    pub run_time: Duration,
    /// Number of times the scheduler switched to it.
    pub switches: u32,
    pub outcome: Outcome,
}

/// Summary of a successful `run_loop`.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Finished tasks, in termination order.
    pub tasks: Vec<TaskStats>,
    pub switches: u64,
    /// How many times the loop blocked in wait-any.
    pub waits: u64,
    /// Highest number of tasks suspended at once.
    pub peak_suspended: usize,
    pub wall_time: Duration,
}

/// Scheduler context: owns every entity, the run queue and the
/// suspension table. Independent instances do not share state.
pub struct Scheduler {
    config: SchedulerConfig,
    entities: Arena,
    run_queue: RunQueue,
    table: SuspensionTable,
    suspended: usize,
    current: Option<EntityKey>,
    next_id: u64,
}

impl Scheduler {
    /// Scheduler whose suspension table holds `max_concurrency` reads.
    pub fn new(max_concurrency: usize) -> Result<Self, SchedError> {
        Self::with_config(SchedulerConfig::new(max_concurrency))
    }

    pub fn with_config(config: SchedulerConfig) -> Result<Self, SchedError> {
        let table = SuspensionTable::with_capacity(config.max_concurrency)?;
        log::debug!(
            "scheduler ready: {} slots, {}-byte stacks",
            config.max_concurrency,
            config.stack_size
        );
        Ok(Self {
            config,
            entities: Arena::new(),
            run_queue: RunQueue::new(),
            table,
            suspended: 0,
            current: None,
            next_id: 0,
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Queue `body` as a new task.
    ///
    /// On error nothing changes: no id is consumed and nothing is queued.
    pub fn submit<F>(&mut self, body: F) -> Result<EntityId, SchedError>
    where
        F: FnOnce(&Coro<'_>) -> Result<(), TaskError> + 'static,
    {
        let key = self.entities.vacant_key();
        let id = EntityId(self.next_id);
        let size = self.config.stack_size;
        let entity = Entity::new(key, id, size, Box::new(body))
            .map_err(|source| SchedError::StackAlloc { size, source })?;

        self.next_id += 1;
        let inserted = self.entities.insert(entity);
        debug_assert_eq!(inserted, key);
        self.run_queue.push(key);
        log::debug!("task {} submitted", id);
        Ok(id)
    }

    /// Run until every task has finished, or until the first failure.
    ///
    /// A failing task stops the loop at once. Tasks still queued or
    /// suspended at that point are left in place; `destroy` (or dropping
    /// the scheduler) releases them.
    pub fn run_loop(&mut self) -> Result<RunReport, SchedError> {
        let started = Instant::now();
        let mut report = RunReport::default();

        while let Some(key) = self.next_runnable(&mut report)? {
            let Some(entity) = self.entities.get_mut(key) else {
                abort("queued key has no entity");
            };
            entity.status = Status::Running;
            self.current = Some(key);

            let turn = Instant::now();
            let parked = entity.switch_to();
            entity.run_time += turn.elapsed();
            self.current = None;
            report.switches += 1;

            let status = entity.status;
            match status {
                Status::Runnable => {
                    log::debug!("task {} yielded", entity.id);
                    self.run_queue.push(key);
                }
                Status::Running => {
                    log::debug!("task {} finished", entity.id);
                    self.release(key, Outcome::Terminated, &mut report);
                }
                Status::Suspended => {
                    let Some(req) = parked else {
                        abort("task suspended without a read request");
                    };
                    log::debug!("task {} suspended on {}", entity.id, req.path().display());
                    if self.table.insert(req).is_err() {
                        self.release(key, Outcome::Failed, &mut report);
                        return Err(SchedError::TableFull {
                            capacity: self.table.capacity(),
                        });
                    }
                    self.suspended += 1;
                    report.peak_suspended = report.peak_suspended.max(self.suspended);
                    debug_assert!(self.suspended <= self.config.max_concurrency);
                }
                Status::Failed => {
                    let id = entity.id;
                    let source = entity
                        .failure
                        .take()
                        .unwrap_or_else(|| TaskError::custom("failed without a reason"));
                    log::error!("task {} failed: {}", id, source);
                    self.release(key, Outcome::Failed, &mut report);
                    return Err(SchedError::TaskFailed { id, source });
                }
                Status::Starting => abort("task still starting after a switch"),
            }
        }

        report.wall_time = started.elapsed();
        log::info!(
            "run finished: {} tasks, {} switches, {} waits in {:?}",
            report.tasks.len(),
            report.switches,
            report.waits,
            report.wall_time
        );
        Ok(report)
    }

    /// Pop the next ready entity, blocking on outstanding reads if the
    /// run queue is empty. `None` means there is no work left.
    fn next_runnable(&mut self, report: &mut RunReport) -> Result<Option<EntityKey>, SchedError> {
        loop {
            if let Some(key) = self.run_queue.pop() {
                return Ok(Some(key));
            }
            if self.suspended == 0 {
                return Ok(None);
            }

            report.waits += 1;
            for req in self.table.wait_any()? {
                let key = req.owner;
                self.suspended -= 1;
                let Some(entity) = self.entities.get_mut(key) else {
                    abort("finished read has no owner");
                };
                entity.inbox = Some(req);
                entity.status = Status::Runnable;
                self.run_queue.push(key);
            }
            debug_assert_eq!(self.suspended, self.table.len());
        }
    }

    fn release(&mut self, key: EntityKey, outcome: Outcome, report: &mut RunReport) {
        if let Some(entity) = self.entities.remove(key) {
            report.tasks.push(TaskStats {
                id: entity.id,
                run_time: entity.run_time,
                switches: entity.switches,
                outcome,
            });
        }
    }

    /// Id of the entity on the CPU. Always `None` from outside a task.
    pub fn current(&self) -> Option<EntityId> {
        self.current
            .and_then(|key| self.entities.get(key))
            .map(|entity| entity.id)
    }

    /// Entities submitted and not yet released.
    pub fn live_tasks(&self) -> usize {
        self.entities.len()
    }

    /// Entities waiting in the run queue.
    pub fn queued(&self) -> usize {
        self.run_queue.len()
    }

    /// Entities parked on a read.
    pub fn suspended_count(&self) -> usize {
        self.suspended
    }

    /// Release every remaining entity and outstanding read. Returns how
    /// many entities had to be released (zero after a successful run).
    pub fn destroy(mut self) -> usize {
        self.release_all()
    }

    fn release_all(&mut self) -> usize {
        // Reads first: their buffers must not outlive a cancelled request,
        // and the entities they point at are about to go.
        let reads = self.table.clear();
        self.run_queue.clear();
        self.suspended = 0;
        let released = self.entities.clear();
        if released > 0 {
            log::warn!(
                "released {} unfinished task(s) and {} outstanding read(s)",
                released,
                reads
            );
        }
        released
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.release_all();
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("live", &self.entities.len())
            .field("queued", &self.run_queue.len())
            .field("suspended", &self.suspended)
            .field("next_id", &self.next_id)
            .finish()
    }
}
