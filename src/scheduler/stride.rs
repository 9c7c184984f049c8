/*!
 * Proportional-Share Scheduling
 * Stride scheduling over the process table with CPU-rate reservations
 */

use super::admission::ReservationLedger;
use super::entry::ProcessEntry;
use super::registry::ProcessTable;
use super::traits::SchedulingDiscipline;
use super::types::{Policy, ReservationSummary, TickAction};
use crate::core::errors::SchedulerResult;
use crate::core::types::{Pid, SlotId};
use log::trace;

/// Stride scheduler
///
/// Each selection charges the winner its stride, so a process with a larger
/// share (smaller stride) comes back to the minimum pass more often. While
/// the CPU is fully reserved only reserving processes are eligible.
#[derive(Debug, Clone, Default)]
pub struct Proportional {
    ledger: ReservationLedger,
}

impl Proportional {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reservations(&self) -> ReservationSummary {
        self.ledger.summary()
    }

    pub fn request_rate(
        &mut self,
        table: &mut ProcessTable,
        pid: Pid,
        rate: i32,
    ) -> SchedulerResult<()> {
        self.ledger.request(table, pid, rate)
    }

    /// Eligible entry with the smallest pass, lowest slot on ties
    fn min_pass(&self, table: &ProcessTable) -> Option<SlotId> {
        let reserved_only = self.ledger.is_full();
        table
            .iter()
            .filter(|(_, e)| !reserved_only || e.is_reserving())
            .min_by_key(|(slot, e)| (e.pass, *slot))
            .map(|(slot, _)| slot)
    }
}

impl SchedulingDiscipline for Proportional {
    fn policy(&self) -> Policy {
        Policy::Proportional
    }

    fn admitted(&mut self, table: &mut ProcessTable, slot: SlotId) {
        self.ledger.admit(table, slot);
    }

    fn removed(&mut self, table: &mut ProcessTable, _slot: SlotId, entry: &ProcessEntry) {
        self.ledger.release(table, entry);
    }

    fn select(&mut self, table: &mut ProcessTable) -> Option<Pid> {
        let slot = self.min_pass(table)?;
        let entry = table.get_mut(slot)?;
        entry.advance();
        trace!(
            "Stride pick: pid={} stride={} pass={}",
            entry.pid,
            entry.stride,
            entry.pass
        );
        Some(entry.pid)
    }

    fn tick(&mut self, _table: &ProcessTable) -> TickAction {
        TickAction::Reschedule
    }

    fn reset(&mut self) {
        self.ledger.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn setup(pids: &[Pid]) -> (ProcessTable, Proportional) {
        let mut table = ProcessTable::with_capacity(8);
        let mut stride = Proportional::new();
        for pid in pids {
            let slot = table.admit(*pid).unwrap();
            stride.admitted(&mut table, slot);
        }
        (table, stride)
    }

    fn shares(
        table: &mut ProcessTable,
        stride: &mut Proportional,
        rounds: usize,
    ) -> HashMap<Pid, usize> {
        let mut counts = HashMap::new();
        for _ in 0..rounds {
            if let Some(pid) = stride.select(table) {
                *counts.entry(pid).or_insert(0) += 1;
            }
        }
        counts
    }

    #[test]
    fn test_tie_goes_to_lowest_slot() {
        let (mut table, mut stride) = setup(&[5, 6]);
        assert_eq!(stride.select(&mut table), Some(5));
        assert_eq!(stride.select(&mut table), Some(6));
        assert_eq!(stride.select(&mut table), Some(5));
    }

    #[test]
    fn test_selection_charges_stride_once() {
        let (mut table, mut stride) = setup(&[1, 2]);
        stride.request_rate(&mut table, 1, 40).unwrap();

        assert_eq!(stride.select(&mut table), Some(1));
        let s1 = table.find(1).unwrap();
        let s2 = table.find(2).unwrap();
        assert_eq!(table.get(s1).unwrap().pass, 2_500);
        assert_eq!(table.get(s2).unwrap().pass, 0);
    }

    #[test]
    fn test_empty_table_is_idle() {
        let (mut table, mut stride) = setup(&[]);
        assert_eq!(stride.select(&mut table), None);
    }

    #[test]
    fn test_full_cpu_excludes_unreserved() {
        let (mut table, mut stride) = setup(&[1, 2, 3]);
        stride.request_rate(&mut table, 2, 100).unwrap();

        let counts = shares(&mut table, &mut stride, 50);
        assert_eq!(counts.get(&2), Some(&50));
        assert!(!counts.contains_key(&1));
        assert!(!counts.contains_key(&3));
    }

    #[test]
    fn test_shares_follow_reservations() {
        let (mut table, mut stride) = setup(&[1, 2, 3]);
        stride.request_rate(&mut table, 1, 50).unwrap();
        stride.request_rate(&mut table, 2, 20).unwrap();

        let counts = shares(&mut table, &mut stride, 1_000);
        assert!((495..=505).contains(&counts[&1]), "{:?}", counts);
        assert!((195..=205).contains(&counts[&2]), "{:?}", counts);
        assert!((295..=305).contains(&counts[&3]), "{:?}", counts);
    }

    #[test]
    fn test_tick_requests_decision() {
        let (table, mut stride) = setup(&[1]);
        assert_eq!(stride.tick(&table), TickAction::Reschedule);
    }
}
