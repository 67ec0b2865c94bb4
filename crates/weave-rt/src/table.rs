// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Suspension table: fixed-capacity slots for in-flight reads.
//!
//! Each occupied slot holds one `ReadRequest`, which carries the key of
//! the entity parked on it. `wait_any` blocks the thread in
//! `aio_suspend` until at least one of them finishes.
//!
//! Refused requests (never submitted) are finished from the start, but
//! are handed back in filing order: not before every request filed ahead
//! of them has finished too.

use std::io;

use crate::error::SchedError;
use crate::io::{Progress, ReadRequest};

struct Filed {
    /// Filing order.
    seq: u64,
    req: ReadRequest,
}

pub(crate) struct SuspensionTable {
    slots: Vec<Option<Filed>>,
    occupied: usize,
    next_seq: u64,
}

impl SuspensionTable {
    /// Reserve `capacity` slots up front; the table never grows.
    pub fn with_capacity(capacity: usize) -> Result<Self, SchedError> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| SchedError::TableAlloc { capacity })?;
        slots.resize_with(capacity, || None);
        Ok(Self {
            slots,
            occupied: 0,
            next_seq: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.occupied
    }

    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// File `req` in the first free slot. Hands it back if the table is full.
    pub fn insert(&mut self, req: ReadRequest) -> Result<usize, ReadRequest> {
        match self.slots.iter().position(Option::is_none) {
            Some(idx) => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.slots[idx] = Some(Filed { seq, req });
                self.occupied += 1;
                Ok(idx)
            }
            None => Err(req),
        }
    }

    /// Block until at least one request is ready to hand back, then take
    /// every ready request out of the table, in slot order.
    ///
    /// A request that failed is still "finished": its owner sees the error
    /// when it resumes. Only a failure of the wait itself, or a cancelled
    /// request, is an error here; the table is left untouched in that case.
    pub fn wait_any(&mut self) -> Result<Vec<ReadRequest>, SchedError> {
        if self.is_empty() {
            return Ok(Vec::new());
        }

        loop {
            let finished = self.take_finished()?;
            if !finished.is_empty() {
                return Ok(finished);
            }

            // Nothing ready means some submitted request is still pending.
            let list: Vec<*const libc::aiocb> = self
                .slots
                .iter()
                .flatten()
                .filter(|filed| filed.req.in_flight())
                .map(|filed| filed.req.aiocb_ptr())
                .collect();

            let ret = unsafe {
                libc::aio_suspend(list.as_ptr(), list.len() as libc::c_int, std::ptr::null())
            };
            if ret < 0 {
                let err = io::Error::last_os_error();
                match err.raw_os_error() {
                    Some(libc::EINTR) | Some(libc::EAGAIN) => {}
                    _ => return Err(SchedError::WaitAny(err)),
                }
            }
        }
    }

    fn take_finished(&mut self) -> Result<Vec<ReadRequest>, SchedError> {
        let states: Vec<_> = self
            .slots
            .iter()
            .map(|slot| slot.as_ref().map(|filed| (filed.seq, filed.req.progress())))
            .collect();

        let mut finished = Vec::new();
        for idx in pick_finished(&states)? {
            if let Some(filed) = self.slots[idx].take() {
                self.occupied -= 1;
                finished.push(filed.req);
            }
        }
        Ok(finished)
    }

    /// Drop every outstanding request. Returns how many there were.
    pub fn clear(&mut self) -> usize {
        let dropped = self.occupied;
        for slot in self.slots.iter_mut() {
            drop(slot.take());
        }
        self.occupied = 0;
        dropped
    }
}

/// Slots to hand back, given each slot's filing order and progress.
///
/// Any cancelled request fails the whole sweep before anything is picked.
fn pick_finished(states: &[Option<(u64, Progress)>]) -> Result<Vec<usize>, SchedError> {
    if states
        .iter()
        .flatten()
        .any(|(_, progress)| matches!(progress, Progress::Cancelled))
    {
        return Err(SchedError::Cancelled);
    }

    let oldest_pending = states
        .iter()
        .flatten()
        .filter(|(_, progress)| matches!(progress, Progress::Pending))
        .map(|(seq, _)| *seq)
        .min();

    let picked = states
        .iter()
        .enumerate()
        .filter_map(|(idx, state)| {
            let (seq, progress) = state.as_ref()?;
            let ready = match progress {
                Progress::Pending => false,
                Progress::Refused => oldest_pending.map_or(true, |oldest| *seq < oldest),
                _ => true,
            };
            ready.then_some(idx)
        })
        .collect();
    Ok(picked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityId, EntityKey};
    use crate::error::TaskError;
    use std::io::Write;

    fn request(dir: &tempfile::TempDir, name: &str, body: &[u8], key: usize) -> ReadRequest {
        let path = dir.path().join(name);
        std::fs::File::create(&path).unwrap().write_all(body).unwrap();
        let mut req = ReadRequest::prepare(&path, EntityKey(key), EntityId(key as u64)).unwrap();
        req.submit().unwrap();
        req
    }

    #[test]
    fn zero_capacity_table() {
        let t = SuspensionTable::with_capacity(0).unwrap();
        assert_eq!(t.capacity(), 0);
        assert!(t.is_empty());
    }

    #[test]
    fn insert_respects_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = SuspensionTable::with_capacity(1).unwrap();
        assert_eq!(t.insert(request(&dir, "a", b"1", 0)).unwrap(), 0);
        let rejected = t.insert(request(&dir, "b", b"2", 1));
        assert!(rejected.is_err());
        assert_eq!(t.len(), 1);
        assert_eq!(t.clear(), 1);
    }

    #[test]
    fn wait_any_on_empty_table_returns_nothing() {
        let mut t = SuspensionTable::with_capacity(2).unwrap();
        assert!(t.wait_any().unwrap().is_empty());
    }

    #[test]
    fn wait_any_drains_every_request_eventually() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = SuspensionTable::with_capacity(3).unwrap();
        t.insert(request(&dir, "a", b"1 2", 0)).unwrap();
        t.insert(request(&dir, "b", b"", 1)).unwrap();
        t.insert(request(&dir, "c", b"3", 2)).unwrap();

        let mut owners = Vec::new();
        while !t.is_empty() {
            for req in t.wait_any().unwrap() {
                owners.push(req.owner().get());
            }
        }
        owners.sort();
        assert_eq!(owners, vec![0, 1, 2]);
    }

    fn refused(dir: &tempfile::TempDir, key: usize) -> ReadRequest {
        let path = dir.path().join("missing");
        ReadRequest::refused(
            &path,
            EntityKey(key),
            EntityId(key as u64),
            TaskError::custom("cannot read"),
        )
    }

    #[test]
    fn refused_alone_is_ready_at_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = SuspensionTable::with_capacity(2).unwrap();
        t.insert(refused(&dir, 4)).unwrap();
        let done = t.wait_any().unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].owner().get(), 4);
        assert!(t.is_empty());
    }

    #[test]
    fn refused_waits_for_earlier_reads() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = SuspensionTable::with_capacity(3).unwrap();
        t.insert(request(&dir, "a", b"5 4 3 2 1", 0)).unwrap();
        t.insert(request(&dir, "b", b"", 1)).unwrap();
        t.insert(refused(&dir, 2)).unwrap();

        let mut order = Vec::new();
        while !t.is_empty() {
            for req in t.wait_any().unwrap() {
                order.push(req.owner().get());
            }
        }
        assert_eq!(order.len(), 3);
        assert_eq!(order.last(), Some(&2));
    }

    #[test]
    fn cancelled_request_picks_nothing() {
        let states = vec![
            Some((0, Progress::Complete)),
            None,
            Some((1, Progress::Cancelled)),
            Some((2, Progress::Refused)),
        ];
        assert!(matches!(pick_finished(&states), Err(SchedError::Cancelled)));
    }

    #[test]
    fn pick_honors_filing_order_for_refused() {
        let states = vec![
            Some((3, Progress::Refused)),
            Some((1, Progress::Pending)),
            Some((0, Progress::Refused)),
            Some((2, Progress::Failed(io::Error::from_raw_os_error(libc::EISDIR)))),
        ];
        assert_eq!(pick_finished(&states).unwrap(), vec![2, 3]);

        let states = vec![Some((5, Progress::Refused)), Some((4, Progress::Complete))];
        assert_eq!(pick_finished(&states).unwrap(), vec![0, 1]);
    }

    #[test]
    fn freed_slot_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = SuspensionTable::with_capacity(1).unwrap();
        t.insert(request(&dir, "a", b"1", 0)).unwrap();
        let done = t.wait_any().unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(t.insert(request(&dir, "b", b"2", 1)).unwrap(), 0);
        t.clear();
    }
}
