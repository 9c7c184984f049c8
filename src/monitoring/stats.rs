/*!
 * Lock-Free Scheduler Counters
 * Atomic counters readable without taking the scheduler lock
 */

use crate::scheduler::{Policy, SchedulerStats};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Atomic scheduler counters
///
/// # Performance
/// - Cache-line aligned to prevent false sharing
/// - All operations use relaxed ordering; a snapshot may mix values from
///   neighbouring operations, each value on its own is exact
#[repr(C, align(64))]
#[derive(Debug)]
pub struct SchedulerCounters {
    policy: Policy,
    decisions: AtomicU64,
    idle_decisions: AtomicU64,
    ticks: AtomicU64,
    rotations: AtomicU64,
    admissions: AtomicU64,
    removals: AtomicU64,
    rejected_requests: AtomicU64,
    active_processes: AtomicUsize,
}

impl SchedulerCounters {
    #[inline]
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            decisions: AtomicU64::new(0),
            idle_decisions: AtomicU64::new(0),
            ticks: AtomicU64::new(0),
            rotations: AtomicU64::new(0),
            admissions: AtomicU64::new(0),
            removals: AtomicU64::new(0),
            rejected_requests: AtomicU64::new(0),
            active_processes: AtomicUsize::new(0),
        }
    }

    /// Record a scheduling decision
    ///
    /// # Performance
    /// Hot path - called on every decision
    #[inline(always)]
    pub fn record_decision(&self, picked: bool) {
        self.decisions.fetch_add(1, Ordering::Relaxed);
        if !picked {
            self.idle_decisions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a timer tick
    #[inline(always)]
    pub fn record_tick(&self, rotated: bool) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        if rotated {
            self.rotations.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_admission(&self) {
        self.admissions.fetch_add(1, Ordering::Relaxed);
        self.active_processes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_removal(&self) {
        self.removals.fetch_add(1, Ordering::Relaxed);
        self.active_processes.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rejection(&self) {
        self.rejected_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Reset the active process gauge (used when the table is cleared)
    #[inline]
    pub fn set_active(&self, count: usize) {
        self.active_processes.store(count, Ordering::Relaxed);
    }

    /// Get snapshot of current counters
    #[inline]
    pub fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            policy: self.policy,
            decisions: self.decisions.load(Ordering::Relaxed),
            idle_decisions: self.idle_decisions.load(Ordering::Relaxed),
            ticks: self.ticks.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
            admissions: self.admissions.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
            rejected_requests: self.rejected_requests.load(Ordering::Relaxed),
            active_processes: self.active_processes.load(Ordering::Relaxed),
        }
    }
}
