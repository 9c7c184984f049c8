/*!
 * Scheduler Core Operations
 * Start, end, schedule, tick and reservation requests
 */

use super::types::{Policy, ProcessStats, ReservationSummary, TickAction};
use super::Scheduler;
use crate::core::errors::{SchedulerError, SchedulerResult};
use crate::core::types::{Pid, SlotId};
use log::{debug, info, trace, warn};

impl Scheduler {
    /// Admit a starting process
    ///
    /// Fails without side effects if the table is full or `pid` is already
    /// registered.
    pub fn start(&mut self, pid: Pid) -> SchedulerResult<SlotId> {
        let slot = self.table.admit(pid)?;
        self.discipline.as_dyn_mut().admitted(&mut self.table, slot);

        self.stats.record_admission();
        info!("Process {} started in {} ({})", pid, slot, self.policy());
        Ok(slot)
    }

    /// Remove an ending process
    pub fn end(&mut self, pid: Pid) -> SchedulerResult<()> {
        let (slot, entry) = self.table.release(pid)?;
        self.discipline
            .as_dyn_mut()
            .removed(&mut self.table, slot, &entry);

        self.stats.record_removal();
        info!("Process {} ended, {} freed", pid, slot);
        Ok(())
    }

    /// Pick the next process to run (None when nothing is eligible)
    ///
    /// Under the proportional policy the pick and the pass update happen in
    /// this one call.
    pub fn schedule(&mut self) -> Option<Pid> {
        let next = self.discipline.as_dyn_mut().select(&mut self.table);
        self.stats.record_decision(next.is_some());

        match next {
            Some(pid) => trace!("Scheduled process {} ({})", pid, self.policy()),
            None => trace!("No process to run"),
        }
        next
    }

    /// Periodic timer callback
    pub fn tick(&mut self) -> TickAction {
        let action = self.discipline.as_dyn_mut().tick(&self.table);
        self.stats.record_tick(action == TickAction::Rotated);
        debug!("Timer tick: {:?}", action);
        action
    }

    /// Reserve `rate` percent of the CPU for `pid`
    ///
    /// A rate of 0 cancels an existing reservation. Rejected requests leave
    /// the scheduler exactly as it was.
    pub fn request_rate(&mut self, pid: Pid, rate: i32) -> SchedulerResult<()> {
        let policy = self.policy();
        let result = match self.discipline.proportional_mut() {
            Some(stride) => stride.request_rate(&mut self.table, pid, rate),
            None => Err(SchedulerError::ReservationUnsupported(policy)),
        };

        if let Err(ref e) = result {
            self.stats.record_rejection();
            warn!("Rate request {}% for process {} rejected: {}", rate, pid, e);
        }
        result
    }

    /// Drop all processes and bookkeeping, keeping the policy
    pub fn reset(&mut self) {
        self.table.clear();
        self.discipline.as_dyn_mut().reset();
        self.stats.set_active(0);
        info!("Scheduler reset ({})", self.policy());
    }

    /// Get number of registered processes
    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Check if scheduler is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Process table capacity
    #[inline]
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Whether `pid` is registered
    pub fn contains(&self, pid: Pid) -> bool {
        self.table.find(pid).is_some()
    }

    /// Get per-process scheduling statistics
    pub fn process_stats(&self, pid: Pid) -> Option<ProcessStats> {
        let slot = self.table.find(pid)?;
        self.table.get(slot).map(|e| e.stats(slot))
    }

    /// Get all process statistics, in slot order
    pub fn all_process_stats(&self) -> Vec<ProcessStats> {
        self.table.iter().map(|(slot, e)| e.stats(slot)).collect()
    }

    /// Reservation aggregates (proportional policy only)
    pub fn reservations(&self) -> Option<ReservationSummary> {
        self.discipline.proportional().map(|p| p.reservations())
    }

    /// Pids in run-queue order, head first (ordered policies only)
    pub fn run_queue(&self) -> Option<Vec<Pid>> {
        let queue = self.discipline.run_queue()?;
        Some(
            queue
                .iter()
                .filter_map(|slot| self.table.get(slot).map(|e| e.pid))
                .collect(),
        )
    }

    /// Whether a successful admission should prompt a new decision
    #[inline]
    pub fn decides_on_admission(&self) -> bool {
        self.policy() != Policy::Arbitrary
    }
}
