/*!
 * Process Registry
 * Fixed-capacity arena of process entries indexed by slot
 */

use super::entry::ProcessEntry;
use crate::core::errors::{SchedulerError, SchedulerResult};
use crate::core::types::{Pid, SlotId};

/// Process table
///
/// Slots are allocated lowest-index first and never move, so a `SlotId`
/// stays valid for the whole life of the process it was handed out for.
#[derive(Debug, Clone)]
pub struct ProcessTable {
    slots: Box<[Option<ProcessEntry>]>,
    len: usize,
}

impl ProcessTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Admit `pid` into the first free slot
    pub fn admit(&mut self, pid: Pid) -> SchedulerResult<SlotId> {
        if self.find(pid).is_some() {
            return Err(SchedulerError::AlreadyRegistered(pid));
        }

        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(SchedulerError::TableFull {
                capacity: self.capacity(),
            })?;

        self.slots[index] = Some(ProcessEntry::new(pid));
        self.len += 1;
        Ok(SlotId::new(index))
    }

    /// Free the slot holding `pid`, returning the entry it held
    pub fn release(&mut self, pid: Pid) -> SchedulerResult<(SlotId, ProcessEntry)> {
        let slot = self.find(pid).ok_or(SchedulerError::ProcessNotFound(pid))?;
        let entry = self.slots[slot.index()]
            .take()
            .ok_or(SchedulerError::ProcessNotFound(pid))?;
        self.len -= 1;
        Ok((slot, entry))
    }

    /// Locate the slot holding `pid`
    pub fn find(&self, pid: Pid) -> Option<SlotId> {
        self.iter().find(|(_, e)| e.pid == pid).map(|(slot, _)| slot)
    }

    #[inline]
    pub fn get(&self, slot: SlotId) -> Option<&ProcessEntry> {
        self.slots.get(slot.index()).and_then(Option::as_ref)
    }

    #[inline]
    pub fn get_mut(&mut self, slot: SlotId) -> Option<&mut ProcessEntry> {
        self.slots.get_mut(slot.index()).and_then(Option::as_mut)
    }

    /// Valid entries in slot order
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &ProcessEntry)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (SlotId::new(i), e)))
    }

    /// Valid entries in slot order, mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SlotId, &mut ProcessEntry)> + '_ {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, e)| e.as_mut().map(|e| (SlotId::new(i), e)))
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admit_fills_lowest_free_slot() {
        let mut table = ProcessTable::with_capacity(3);
        assert_eq!(table.admit(10).unwrap(), SlotId::new(0));
        assert_eq!(table.admit(11).unwrap(), SlotId::new(1));

        table.release(10).unwrap();
        assert_eq!(table.admit(12).unwrap(), SlotId::new(0));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_table_full() {
        let mut table = ProcessTable::with_capacity(2);
        table.admit(1).unwrap();
        table.admit(2).unwrap();

        assert_eq!(
            table.admit(3),
            Err(SchedulerError::TableFull { capacity: 2 })
        );
        assert_eq!(table.len(), 2);
        assert!(table.find(3).is_none());
    }

    #[test]
    fn test_duplicate_pid_rejected() {
        let mut table = ProcessTable::with_capacity(4);
        table.admit(5).unwrap();
        assert_eq!(table.admit(5), Err(SchedulerError::AlreadyRegistered(5)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_release_unknown() {
        let mut table = ProcessTable::with_capacity(4);
        table.admit(1).unwrap();
        assert_eq!(table.release(9), Err(SchedulerError::ProcessNotFound(9)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_iter_skips_free_slots() {
        let mut table = ProcessTable::with_capacity(4);
        for pid in 1..=4 {
            table.admit(pid).unwrap();
        }
        table.release(2).unwrap();

        let pids: Vec<Pid> = table.iter().map(|(_, e)| e.pid).collect();
        assert_eq!(pids, vec![1, 3, 4]);

        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.iter().count(), 0);
    }
}
