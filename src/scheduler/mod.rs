/*!
 * CPU Scheduler
 * Process registry, queue disciplines and proportional-share scheduling
 */

use crate::core::limits::MAX_PROCS;
use crate::monitoring::SchedulerCounters;
use log::info;
use std::sync::Arc;

pub mod admission;
pub mod entry;
pub mod policy;
pub mod queue;
pub mod registry;
pub mod stride;
pub mod traits;
pub mod types;

mod operations;

pub use entry::ProcessEntry;
pub use policy::Discipline;
pub use registry::ProcessTable;
pub use traits::SchedulingDiscipline;
pub use types::{Policy, ProcessStats, ReservationSummary, SchedulerStats, TickAction};

/// CPU Scheduler
///
/// Single-owner scheduling state: every mutation goes through `&mut self`,
/// so callers that share a scheduler across threads must hold one lock for
/// the whole of each call (see `host::SchedCore`).
#[derive(Debug)]
pub struct Scheduler {
    table: ProcessTable,
    discipline: Discipline,

    // Statistics - lock-free atomics, readable while the scheduler is locked
    stats: Arc<SchedulerCounters>,
}

impl Scheduler {
    /// Create new scheduler with policy and the default table capacity
    pub fn new(policy: Policy) -> Self {
        Self::with_capacity(policy, MAX_PROCS)
    }

    /// Create scheduler with a custom process table capacity
    pub fn with_capacity(policy: Policy, capacity: usize) -> Self {
        Self::with_counters(policy, capacity, Arc::new(SchedulerCounters::new(policy)))
    }

    /// Create scheduler reporting into externally owned counters
    pub fn with_counters(
        policy: Policy,
        capacity: usize,
        stats: Arc<SchedulerCounters>,
    ) -> Self {
        info!(
            "Scheduler initialized: policy={}, capacity={}",
            policy, capacity
        );

        Self {
            table: ProcessTable::with_capacity(capacity),
            discipline: Discipline::new(policy, capacity),
            stats,
        }
    }

    /// Policy fixed at construction
    #[inline]
    pub fn policy(&self) -> Policy {
        self.discipline.as_dyn().policy()
    }

    /// Shared handle to the counters
    pub fn counters(&self) -> Arc<SchedulerCounters> {
        Arc::clone(&self.stats)
    }

    /// Get scheduler statistics (lock-free snapshot)
    pub fn stats(&self) -> SchedulerStats {
        self.stats.snapshot()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(Policy::Proportional)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::SchedulerError;

    #[test]
    fn test_round_robin_basic() {
        let mut scheduler = Scheduler::new(Policy::RoundRobin);

        scheduler.start(1).unwrap();
        scheduler.start(2).unwrap();
        scheduler.start(3).unwrap();

        assert_eq!(scheduler.len(), 3);

        // Head of the queue until the timer rotates it
        assert_eq!(scheduler.schedule(), Some(1));
        assert_eq!(scheduler.schedule(), Some(1));
        assert_eq!(scheduler.tick(), TickAction::Rotated);
        assert_eq!(scheduler.schedule(), Some(2));
    }

    #[test]
    fn test_remove_process() {
        let mut scheduler = Scheduler::new(Policy::Fifo);

        scheduler.start(1).unwrap();
        scheduler.start(2).unwrap();
        assert_eq!(scheduler.len(), 2);

        assert!(scheduler.end(1).is_ok());
        assert_eq!(scheduler.len(), 1);

        assert_eq!(scheduler.end(999), Err(SchedulerError::ProcessNotFound(999)));
    }

    #[test]
    fn test_empty_scheduler() {
        let mut scheduler = Scheduler::new(Policy::Proportional);
        assert!(scheduler.is_empty());
        assert_eq!(scheduler.schedule(), None);
        assert_eq!(scheduler.stats().idle_decisions, 1);
    }

    #[test]
    fn test_statistics() {
        let mut scheduler = Scheduler::new(Policy::Lifo);

        scheduler.start(1).unwrap();
        scheduler.start(2).unwrap();
        assert!(scheduler.start(2).is_err());

        scheduler.schedule();
        scheduler.schedule();
        scheduler.tick();

        let stats = scheduler.stats();
        assert_eq!(stats.decisions, 2);
        assert_eq!(stats.admissions, 2);
        assert_eq!(stats.active_processes, 2);
        assert_eq!(stats.ticks, 1);
        assert_eq!(stats.rotations, 0);
        assert_eq!(stats.policy, Policy::Lifo);
    }

    #[test]
    fn test_reservation_needs_proportional_policy() {
        let mut scheduler = Scheduler::new(Policy::RoundRobin);
        scheduler.start(1).unwrap();
        assert_eq!(
            scheduler.request_rate(1, 20),
            Err(SchedulerError::ReservationUnsupported(Policy::RoundRobin))
        );
        assert_eq!(scheduler.stats().rejected_requests, 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut scheduler = Scheduler::new(Policy::Proportional);
        scheduler.start(1).unwrap();
        scheduler.request_rate(1, 30).unwrap();
        scheduler.schedule();

        scheduler.reset();
        assert!(scheduler.is_empty());
        assert_eq!(scheduler.reservations(), Some(ReservationSummary::default()));
        assert_eq!(scheduler.stats().active_processes, 0);

        scheduler.start(1).unwrap();
        assert_eq!(scheduler.process_stats(1).unwrap().pass, 0);
    }
}
