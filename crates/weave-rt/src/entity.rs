// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Entity: one coroutine's descriptor, plus the arena that owns them all.
//!
//! An entity owns its stack and saved context through a `corosensei`
//! coroutine. `switch_to` is the context-switch primitive: it runs the
//! coroutine on its own stack until the body yields, suspends, fails or
//! returns, then records the resulting status.

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::time::Duration;

use corosensei::stack::DefaultStack;
use corosensei::{Coroutine, CoroutineResult, Yielder};

use crate::coro::Coro;
use crate::error::TaskError;
use crate::io::ReadRequest;

/// Public identity of a task: submission ordinal, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub(crate) u64);

impl EntityId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Arena slot of a live entity. Queues and the suspension table hold
/// these instead of references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EntityKey(pub(crate) usize);

/// Lifecycle states. Normal termination has no status of its own: an
/// entity still `Running` after its switch returns has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Submitted, never run.
    Starting,
    /// Yielded; waiting in the run queue.
    Runnable,
    /// On the CPU.
    Running,
    /// Parked on a read in the suspension table.
    Suspended,
    /// Called `fail` (or panicked). Terminal.
    Failed,
}

/// Why a coroutine handed control back.
pub(crate) enum Switch {
    Yield,
    Suspend(ReadRequest),
    Fail(TaskError),
}

/// What a coroutine receives when control comes back to it.
pub(crate) enum Resume {
    Start,
    Continue,
    Io(ReadRequest),
}

pub(crate) type TaskBody = Box<dyn FnOnce(&Coro<'_>) -> Result<(), TaskError>>;

type Context = Coroutine<Resume, Switch, Result<(), TaskError>, DefaultStack>;

pub(crate) struct Entity {
    pub id: EntityId,
    pub status: Status,
    pub run_time: Duration,
    pub switches: u32,
    /// Completed read waiting to be handed to the body on its next turn.
    pub inbox: Option<ReadRequest>,
    /// Why the entity failed, once it has.
    pub failure: Option<TaskError>,
    context: Context,
    started: bool,
    /// Set while the entity is being released, so the forced unwind of a
    /// suspended stack is not mistaken for a panic in the body.
    releasing: Rc<Cell<bool>>,
}

impl Entity {
    /// Map a stack and prepare `body` to start on the first switch.
    ///
    /// On error nothing is left allocated: the stack is the only resource
    /// acquired before the coroutine exists.
    pub fn new(
        key: EntityKey,
        id: EntityId,
        stack_size: usize,
        body: TaskBody,
    ) -> std::io::Result<Self> {
        let stack = DefaultStack::new(stack_size)?;
        let releasing = Rc::new(Cell::new(false));
        let flag = releasing.clone();

        let context = Coroutine::with_stack(
            stack,
            move |yielder: &Yielder<Resume, Switch>, _start: Resume| {
                let coro = Coro::new(yielder, key, id);
                match panic::catch_unwind(AssertUnwindSafe(|| body(&coro))) {
                    Ok(result) => result,
                    Err(payload) => {
                        if flag.get() {
                            panic::resume_unwind(payload);
                        }
                        Err(TaskError::Panicked(panic_message(payload.as_ref())))
                    }
                }
            },
        );

        Ok(Self {
            id,
            status: Status::Starting,
            run_time: Duration::ZERO,
            switches: 0,
            inbox: None,
            failure: None,
            context,
            started: false,
            releasing,
        })
    }

    /// Run the coroutine until it gives control back.
    ///
    /// Returns the read request the body suspended on, if any; the caller
    /// must park it in the suspension table.
    pub fn switch_to(&mut self) -> Option<ReadRequest> {
        debug_assert_eq!(self.status, Status::Running);
        let input = if !self.started {
            self.started = true;
            Resume::Start
        } else if let Some(req) = self.inbox.take() {
            Resume::Io(req)
        } else {
            Resume::Continue
        };

        self.switches += 1;
        match self.context.resume(input) {
            CoroutineResult::Yield(Switch::Yield) => {
                self.status = Status::Runnable;
                None
            }
            CoroutineResult::Yield(Switch::Suspend(req)) => {
                self.status = Status::Suspended;
                Some(req)
            }
            CoroutineResult::Yield(Switch::Fail(err)) => {
                self.status = Status::Failed;
                self.failure = Some(err);
                None
            }
            CoroutineResult::Return(Ok(())) => None,
            CoroutineResult::Return(Err(err)) => {
                self.status = Status::Failed;
                self.failure = Some(err);
                None
            }
        }
    }
}

impl Drop for Entity {
    fn drop(&mut self) {
        self.releasing.set(true);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Slot arena owning every live entity.
#[derive(Default)]
pub(crate) struct Arena {
    slots: Vec<Option<Entity>>,
    free: Vec<usize>,
    live: usize,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key the next `insert` will use.
    pub fn vacant_key(&self) -> EntityKey {
        EntityKey(self.free.last().copied().unwrap_or(self.slots.len()))
    }

    pub fn insert(&mut self, entity: Entity) -> EntityKey {
        self.live += 1;
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(entity);
                EntityKey(idx)
            }
            None => {
                self.slots.push(Some(entity));
                EntityKey(self.slots.len() - 1)
            }
        }
    }

    pub fn get(&self, key: EntityKey) -> Option<&Entity> {
        self.slots.get(key.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, key: EntityKey) -> Option<&mut Entity> {
        self.slots.get_mut(key.0).and_then(Option::as_mut)
    }

    /// Take an entity out of the arena. Dropping it releases its stack.
    pub fn remove(&mut self, key: EntityKey) -> Option<Entity> {
        let entity = self.slots.get_mut(key.0)?.take()?;
        self.free.push(key.0);
        self.live -= 1;
        Some(entity)
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Release every remaining entity. Returns how many there were.
    pub fn clear(&mut self) -> usize {
        let released = self.live;
        for slot in self.slots.iter_mut() {
            drop(slot.take());
        }
        self.slots.clear();
        self.free.clear();
        self.live = 0;
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STACK: usize = 64 * 1024;

    fn entity(arena: &Arena, id: u64, body: TaskBody) -> Entity {
        Entity::new(arena.vacant_key(), EntityId(id), STACK, body).unwrap()
    }

    #[test]
    fn body_that_returns_stays_running() {
        let arena = Arena::new();
        let mut e = entity(&arena, 0, Box::new(|_: &Coro<'_>| Ok(())));
        assert_eq!(e.status, Status::Starting);
        e.status = Status::Running;
        assert!(e.switch_to().is_none());
        assert_eq!(e.status, Status::Running);
        assert_eq!(e.switches, 1);
    }

    #[test]
    fn yield_then_finish() {
        let arena = Arena::new();
        let mut e = entity(
            &arena,
            0,
            Box::new(|coro: &Coro<'_>| {
                coro.yield_now();
                Ok(())
            }),
        );
        e.status = Status::Running;
        e.switch_to();
        assert_eq!(e.status, Status::Runnable);
        e.status = Status::Running;
        e.switch_to();
        assert_eq!(e.status, Status::Running);
    }

    #[test]
    fn panic_becomes_failure() {
        let arena = Arena::new();
        let mut e = entity(&arena, 0, Box::new(|_: &Coro<'_>| panic!("boom")));
        e.status = Status::Running;
        e.switch_to();
        assert_eq!(e.status, Status::Failed);
        match e.failure {
            Some(TaskError::Panicked(ref msg)) => assert!(msg.contains("boom")),
            ref other => panic!("expected Panicked, got {:?}", other),
        }
    }

    #[test]
    fn dropping_suspended_entity_unwinds_cleanly() {
        let dropped = Rc::new(Cell::new(false));
        struct Guard(Rc<Cell<bool>>);
        impl Drop for Guard {
            fn drop(&mut self) {
                self.0.set(true);
            }
        }

        let arena = Arena::new();
        let flag = dropped.clone();
        let mut e = entity(
            &arena,
            0,
            Box::new(move |coro: &Coro<'_>| {
                let _guard = Guard(flag);
                coro.yield_now();
                Ok(())
            }),
        );
        e.status = Status::Running;
        e.switch_to();
        assert_eq!(e.status, Status::Runnable);
        drop(e);
        assert!(dropped.get());
    }

    #[test]
    fn arena_reuses_slots() {
        let mut arena = Arena::new();
        let k0 = arena.vacant_key();
        let e = entity(&arena, 0, Box::new(|_: &Coro<'_>| Ok(())));
        assert_eq!(arena.insert(e), k0);
        let e = entity(&arena, 1, Box::new(|_: &Coro<'_>| Ok(())));
        let k1 = arena.insert(e);
        assert_ne!(k0, k1);
        assert_eq!(arena.len(), 2);

        assert!(arena.remove(k0).is_some());
        assert!(arena.remove(k0).is_none());
        assert_eq!(arena.vacant_key(), k0);
        assert_eq!(arena.clear(), 1);
        assert!(arena.is_empty());
    }
}
