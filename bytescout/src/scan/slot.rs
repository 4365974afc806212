//! Slot handoff between the walker and the workers.
//!
//! Every worker owns exactly one slot. A slot is a tagged cell:
//!
//! ```text
//!            worker starts            walker assigns
//!  Stopped ───────────────▶ Ready ───────────────▶ Assigned(task)
//!     ▲                      │ ▲                        │
//!     └──────────────────────┘ └────────────────────────┘
//!       coordinator shuts down     worker finishes task
//! ```
//!
//! All slots live behind one mutex. Each slot has its own condition variable
//! so the walker wakes exactly the worker it assigned to, and one shared
//! `released` condition variable wakes the walker (waiting for a free slot)
//! and the coordinator (waiting for drain) whenever a slot becomes Ready.
//!
//! A worker that dies while holding a task is *retired*: its slot goes back
//! to Stopped for good and is skipped by both dispatch and drain, so neither
//! side waits on a thread that will never answer.
use std::path::PathBuf;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use tracing::{trace, warn};

use crate::metrics::ScanMetrics;

/// One file to be scanned by exactly one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTask {
    pub path: PathBuf,
}

impl ScanTask {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotState {
    Stopped,
    Ready,
    Assigned(ScanTask),
}

impl SlotState {
    pub fn is_ready(&self) -> bool {
        matches!(self, SlotState::Ready)
    }

    pub fn is_assigned(&self) -> bool {
        matches!(self, SlotState::Assigned(_))
    }
}

/// What a worker gets back from [`SlotBoard::wait_for_task`]
#[derive(Debug, PartialEq, Eq)]
pub enum Assignment {
    Task(ScanTask),
    Stop,
}

#[derive(Debug)]
struct Slots {
    states: Vec<SlotState>,
    retired: Vec<bool>,
    shutting_down: bool,
}

impl Slots {
    fn drained(&self) -> bool {
        self.states
            .iter()
            .zip(&self.retired)
            .all(|(state, &retired)| retired || state.is_ready())
    }

    fn all_retired(&self) -> bool {
        self.retired.iter().all(|&retired| retired)
    }
}

/// The shared slot array
#[derive(Debug)]
pub struct SlotBoard {
    slots: Mutex<Slots>,
    assigned: Vec<Condvar>,
    released: Condvar,
    metrics: ScanMetrics,
}

/// Walker-side round-robin position: each search for a free slot starts just
/// after the slot that received the previous task
#[derive(Debug, Default)]
pub struct DispatchCursor {
    next: usize,
}

impl SlotBoard {
    /// Creates `size` slots, all Stopped until their worker announces itself
    pub fn new(size: usize, metrics: ScanMetrics) -> Self {
        Self {
            slots: Mutex::new(Slots {
                states: vec![SlotState::Stopped; size],
                retired: vec![false; size],
                shutting_down: false,
            }),
            assigned: (0..size).map(|_| Condvar::new()).collect(),
            released: Condvar::new(),
            metrics,
        }
    }

    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }

    // Slot state is only ever replaced wholesale, so a panic while the lock
    // was held cannot leave a half-written slot behind.
    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self, slot: usize) -> SlotState {
        self.lock().states[slot].clone()
    }

    /// Number of slots currently holding a task
    pub fn assigned_count(&self) -> usize {
        self.lock()
            .states
            .iter()
            .filter(|state| state.is_assigned())
            .count()
    }

    /// Worker side: announce that `slot` can take a task, dropping the task
    /// it held before (if any).
    ///
    /// Returns `false` once shutdown has begun; the worker must then exit
    /// instead of re-entering Ready.
    pub fn announce_ready(&self, slot: usize) -> bool {
        let mut slots = self.lock();
        if slots.shutting_down || slots.retired[slot] {
            return false;
        }
        if slots.states[slot].is_assigned() {
            self.metrics.record_release();
            trace!(slot, "slot released");
        }
        slots.states[slot] = SlotState::Ready;
        drop(slots);
        self.released.notify_all();
        true
    }

    /// Worker side: block until `slot` holds a task or has been stopped.
    ///
    /// The slot stays Assigned while the worker runs; the returned task is the
    /// worker's own copy.
    pub fn wait_for_task(&self, slot: usize) -> Assignment {
        let mut slots = self.lock();
        loop {
            if let SlotState::Assigned(task) = &slots.states[slot] {
                return Assignment::Task(task.clone());
            }
            if slots.shutting_down || slots.retired[slot] {
                return Assignment::Stop;
            }
            slots = self.assigned[slot]
                .wait(slots)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Walker side: hand `task` to the first Ready slot, starting at the
    /// cursor. Blocks while every slot is busy or not started yet.
    ///
    /// Returns the slot the task went to, or the task itself when no live
    /// worker is left to take it.
    pub fn assign(&self, cursor: &mut DispatchCursor, task: ScanTask) -> Result<usize, ScanTask> {
        let size = self.len();
        let mut slots = self.lock();
        loop {
            if slots.shutting_down || slots.all_retired() {
                return Err(task);
            }

            let free = (0..size)
                .map(|offset| (cursor.next + offset) % size)
                .find(|&slot| slots.states[slot].is_ready());

            if let Some(slot) = free {
                trace!(slot, path = %task.path.display(), "task assigned");
                slots.states[slot] = SlotState::Assigned(task);
                self.metrics.record_dispatch();
                drop(slots);
                cursor.next = (slot + 1) % size;
                self.assigned[slot].notify_one();
                return Ok(slot);
            }

            slots = self
                .released
                .wait(slots)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Coordinator side: block until every live slot is Ready
    pub fn wait_for_drain(&self) {
        let mut slots = self.lock();
        while !slots.drained() {
            slots = self
                .released
                .wait(slots)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Coordinator side: move every slot to Stopped and wake its worker
    pub fn stop_all(&self) {
        let mut slots = self.lock();
        slots.shutting_down = true;
        for (slot, state) in slots.states.iter_mut().enumerate() {
            if let SlotState::Assigned(task) = state {
                warn!(slot, path = %task.path.display(), "stopping slot with a pending task");
                self.metrics.record_release();
            }
            *state = SlotState::Stopped;
        }
        drop(slots);
        for condvar in &self.assigned {
            condvar.notify_all();
        }
        self.released.notify_all();
    }

    /// Takes `slot` out of service after its worker died
    pub fn retire(&self, slot: usize) {
        let mut slots = self.lock();
        slots.retired[slot] = true;
        if slots.states[slot].is_assigned() {
            self.metrics.record_release();
        }
        slots.states[slot] = SlotState::Stopped;
        drop(slots);
        self.released.notify_all();
    }
}
