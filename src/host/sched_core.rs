/*!
 * Scheduling Core
 * Host-facing entry points with boolean/sentinel results
 */

use super::Host;
use crate::core::config::KernelConfig;
use crate::core::errors::{SchedulerError, SchedulerResult};
use crate::core::types::Pid;
use crate::monitoring::SchedulerCounters;
use crate::scheduler::{Policy, ProcessStats, ReservationSummary, Scheduler, SchedulerStats};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, info, instrument, trace};

/// Scheduling core embedded in a host kernel
///
/// One mutex covers the scheduler for the whole of each entry point, so the
/// aggregates are never observed half-updated. Host collaborators are
/// invoked after the mutex is released.
pub struct SchedCore<H: Host> {
    host: Arc<H>,
    config: KernelConfig,
    state: Mutex<Option<Scheduler>>,
    counters: RwLock<Option<Arc<SchedulerCounters>>>,
}

impl<H: Host> SchedCore<H> {
    pub fn new(host: Arc<H>, config: KernelConfig) -> Self {
        Self {
            host,
            config,
            state: Mutex::new(None),
            counters: RwLock::new(None),
        }
    }

    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Fix the policy (unless the host already has), reset all scheduling
    /// state and arm the periodic timer
    pub fn initialize(&self) {
        if self.host.current_policy().is_none() {
            self.host.set_policy(self.config.policy);
        }
        let policy = self.host.current_policy().unwrap_or(self.config.policy);

        let counters = Arc::new(SchedulerCounters::new(policy));
        let scheduler =
            Scheduler::with_counters(policy, self.config.max_procs, Arc::clone(&counters));

        *self.state.lock() = Some(scheduler);
        *self.counters.write() = Some(counters);

        info!(
            policy = %policy,
            capacity = self.config.max_procs,
            timer_interval = self.config.timer_interval,
            "Scheduling core initialized"
        );
        self.host.arm_timer(self.config.timer_interval);
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().is_some()
    }

    /// Process `pid` is starting
    #[instrument(level = "debug", skip(self))]
    pub fn start(&self, pid: Pid) -> bool {
        let result = self.with_scheduler(|s| {
            s.start(pid)?;
            Ok(s.decides_on_admission())
        });

        match result {
            Ok(decide) => {
                if decide {
                    self.host.trigger_scheduling_decision();
                }
                true
            }
            Err(e) => self.fail(e),
        }
    }

    /// Process `pid` is ending
    #[instrument(level = "debug", skip(self))]
    pub fn end(&self, pid: Pid) -> bool {
        match self.with_scheduler(|s| s.end(pid)) {
            Ok(()) => true,
            Err(e) => self.fail(e),
        }
    }

    /// Which process should run next (None when idle)
    pub fn schedule(&self) -> Option<Pid> {
        match self.with_scheduler(|s| Ok(s.schedule())) {
            Ok(next) => next,
            Err(e) => {
                self.host.report(&e);
                None
            }
        }
    }

    /// Periodic timer callback
    pub fn on_timer_tick(&self) {
        let action = match self.with_scheduler(|s| Ok(s.tick())) {
            Ok(action) => action,
            Err(e) => {
                self.host.report(&e);
                return;
            }
        };

        self.host.arm_timer(self.config.timer_interval);
        if action.needs_decision() {
            trace!(?action, "Timer preemption");
            self.host.trigger_scheduling_decision();
        }
    }

    /// Process `pid` asks for `rate` percent of the CPU
    #[instrument(level = "debug", skip(self))]
    pub fn request_rate(&self, pid: Pid, rate: i32) -> bool {
        match self.with_scheduler(|s| s.request_rate(pid, rate)) {
            Ok(()) => true,
            Err(e) => self.fail(e),
        }
    }

    /// Policy in force (None before `initialize`)
    pub fn policy(&self) -> Option<Policy> {
        self.state.lock().as_ref().map(Scheduler::policy)
    }

    /// Counter snapshot, read without taking the scheduler lock
    pub fn stats(&self) -> Option<SchedulerStats> {
        self.counters.read().as_ref().map(|c| c.snapshot())
    }

    pub fn process_stats(&self, pid: Pid) -> Option<ProcessStats> {
        self.state.lock().as_ref()?.process_stats(pid)
    }

    pub fn all_process_stats(&self) -> Vec<ProcessStats> {
        self.state
            .lock()
            .as_ref()
            .map(Scheduler::all_process_stats)
            .unwrap_or_default()
    }

    pub fn reservations(&self) -> Option<ReservationSummary> {
        self.state.lock().as_ref()?.reservations()
    }

    pub fn run_queue(&self) -> Option<Vec<Pid>> {
        self.state.lock().as_ref()?.run_queue()
    }

    /// Run `f` on the scheduler under the lock; the guard is gone by the
    /// time the result is returned
    fn with_scheduler<T, F>(&self, f: F) -> SchedulerResult<T>
    where
        F: FnOnce(&mut Scheduler) -> SchedulerResult<T>,
    {
        let mut guard = self.state.lock();
        let scheduler = guard.as_mut().ok_or(SchedulerError::NotInitialized)?;
        f(scheduler)
    }

    fn fail(&self, error: SchedulerError) -> bool {
        debug!(%error, "Entry point failed");
        self.host.report(&error);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SimulatedHost;

    fn core_with(policy: Policy) -> SchedCore<SimulatedHost> {
        let host = Arc::new(SimulatedHost::with_policy(policy));
        let core = SchedCore::new(host, KernelConfig::default());
        core.initialize();
        core
    }

    #[test]
    fn test_entry_points_before_initialize() {
        let core = SchedCore::new(Arc::new(SimulatedHost::new()), KernelConfig::default());
        assert!(!core.is_initialized());
        assert!(!core.start(1));
        assert!(!core.end(1));
        assert!(!core.request_rate(1, 10));
        assert_eq!(core.schedule(), None);
        assert_eq!(core.policy(), None);
        assert!(core.stats().is_none());

        // An early tick must not arm the host timer
        core.on_timer_tick();
        assert_eq!(core.host().arm_count(), 0);
        assert_eq!(core.host().pending_decisions(), 0);
    }

    #[test]
    fn test_start_triggers_decision() {
        let core = core_with(Policy::Fifo);
        let before = core.host().pending_decisions();
        assert!(core.start(1));
        assert_eq!(core.host().pending_decisions(), before + 1);

        let core = core_with(Policy::Arbitrary);
        assert!(core.start(1));
        assert_eq!(core.host().pending_decisions(), 0);
    }

    #[test]
    fn test_failed_start_does_not_trigger() {
        let core = core_with(Policy::RoundRobin);
        assert!(core.start(1));
        core.host().take_decisions();
        assert!(!core.start(1));
        assert_eq!(core.host().pending_decisions(), 0);
    }

    #[test]
    fn test_reinitialize_resets_state() {
        let core = core_with(Policy::Proportional);
        assert!(core.start(1));
        assert!(core.request_rate(1, 50));

        core.initialize();
        assert!(core.all_process_stats().is_empty());
        assert_eq!(core.reservations(), Some(ReservationSummary::default()));
        assert_eq!(core.host().arm_count(), 2);
    }
}
