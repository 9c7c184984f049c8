/*!
 * Queue Disciplines
 * ARBITRARY, FIFO, LIFO and ROUND-ROBIN ordering over the process table
 */

use super::entry::ProcessEntry;
use super::registry::ProcessTable;
use super::traits::SchedulingDiscipline;
use super::types::{Policy, TickAction};
use crate::core::types::{Pid, SlotId};
use log::trace;
use std::collections::VecDeque;

/// Admission-ordered sequence of table slots
///
/// Head is the oldest admission, tail the newest. Removal keeps the relative
/// order of everything left.
#[derive(Debug, Clone, Default)]
pub struct RunQueue {
    slots: VecDeque<SlotId>,
}

impl RunQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: VecDeque::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn push_back(&mut self, slot: SlotId) {
        self.slots.push_back(slot);
    }

    /// Remove `slot`, compacting the sequence
    pub fn remove(&mut self, slot: SlotId) -> bool {
        match self.slots.iter().position(|s| *s == slot) {
            Some(pos) => self.slots.remove(pos).is_some(),
            None => false,
        }
    }

    #[inline]
    pub fn head(&self) -> Option<SlotId> {
        self.slots.front().copied()
    }

    #[inline]
    pub fn tail(&self) -> Option<SlotId> {
        self.slots.back().copied()
    }

    /// Move the head to the tail
    pub fn rotate(&mut self) -> bool {
        if self.slots.len() < 2 {
            return !self.slots.is_empty();
        }
        self.slots.rotate_left(1);
        true
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.slots.iter().copied()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

fn pid_at(table: &ProcessTable, slot: Option<SlotId>) -> Option<Pid> {
    slot.and_then(|s| table.get(s)).map(|e| e.pid)
}

/// First valid slot in registry order
#[derive(Debug, Clone, Default)]
pub struct Arbitrary;

impl SchedulingDiscipline for Arbitrary {
    fn policy(&self) -> Policy {
        Policy::Arbitrary
    }

    fn admitted(&mut self, _table: &mut ProcessTable, _slot: SlotId) {}

    fn removed(&mut self, _table: &mut ProcessTable, _slot: SlotId, _entry: &ProcessEntry) {}

    fn select(&mut self, table: &mut ProcessTable) -> Option<Pid> {
        table.iter().next().map(|(_, e)| e.pid)
    }

    fn tick(&mut self, _table: &ProcessTable) -> TickAction {
        TickAction::Ignored
    }

    fn reset(&mut self) {}
}

/// Which end of the run queue an ordered discipline serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Serve {
    Head,
    Tail,
}

/// Ordered discipline shared by FIFO, LIFO and ROUND-ROBIN
#[derive(Debug, Clone)]
pub struct Ordered {
    policy: Policy,
    queue: RunQueue,
    serve: Serve,
    rotate_on_tick: bool,
}

impl Ordered {
    pub fn fifo(capacity: usize) -> Self {
        Self::build(Policy::Fifo, capacity, Serve::Head, false)
    }

    pub fn lifo(capacity: usize) -> Self {
        Self::build(Policy::Lifo, capacity, Serve::Tail, false)
    }

    pub fn round_robin(capacity: usize) -> Self {
        Self::build(Policy::RoundRobin, capacity, Serve::Head, true)
    }

    fn build(policy: Policy, capacity: usize, serve: Serve, rotate_on_tick: bool) -> Self {
        Self {
            policy,
            queue: RunQueue::with_capacity(capacity),
            serve,
            rotate_on_tick,
        }
    }

    pub fn queue(&self) -> &RunQueue {
        &self.queue
    }
}

impl SchedulingDiscipline for Ordered {
    fn policy(&self) -> Policy {
        self.policy
    }

    fn admitted(&mut self, _table: &mut ProcessTable, slot: SlotId) {
        self.queue.push_back(slot);
    }

    fn removed(&mut self, _table: &mut ProcessTable, slot: SlotId, _entry: &ProcessEntry) {
        self.queue.remove(slot);
    }

    fn select(&mut self, table: &mut ProcessTable) -> Option<Pid> {
        let slot = match self.serve {
            Serve::Head => self.queue.head(),
            Serve::Tail => self.queue.tail(),
        };
        pid_at(table, slot)
    }

    fn tick(&mut self, table: &ProcessTable) -> TickAction {
        if !self.rotate_on_tick {
            return TickAction::Ignored;
        }
        if self.queue.rotate() {
            trace!(
                "Round-robin rotation, new head {:?}",
                pid_at(table, self.queue.head())
            );
            TickAction::Rotated
        } else {
            TickAction::Reschedule
        }
    }

    fn reset(&mut self) {
        self.queue.clear();
    }
}
