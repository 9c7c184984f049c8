/*!
 * Simulated Host
 * In-process implementation of the host collaborator interface
 */

use super::timer::TimerCommand;
use super::Host;
use crate::scheduler::Policy;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::OnceLock;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info};

/// Host that records collaborator calls
///
/// The policy cell can be written once; later writes are ignored, which is
/// how a test harness locks a policy in before `initialize()` runs.
#[derive(Debug, Default)]
pub struct SimulatedHost {
    policy: OnceLock<Policy>,
    armed_interval: AtomicU32,
    arm_count: AtomicU64,
    pending: AtomicU64,
    decision: Notify,
    timer: Mutex<Option<mpsc::UnboundedSender<TimerCommand>>>,
}

impl SimulatedHost {
    /// Host with no policy fixed
    pub fn new() -> Self {
        Self::default()
    }

    /// Host that has already locked `policy` in
    pub fn with_policy(policy: Policy) -> Self {
        let host = Self::default();
        host.set_policy(policy);
        host
    }

    /// Forward `arm_timer` calls to a running timer task
    pub fn attach_timer(&self, commands: mpsc::UnboundedSender<TimerCommand>) {
        *self.timer.lock() = Some(commands);
    }

    /// Interval of the most recent `arm_timer` call
    pub fn armed_interval(&self) -> Option<u32> {
        match self.armed_interval.load(Ordering::Relaxed) {
            0 => None,
            ticks => Some(ticks),
        }
    }

    /// Number of `arm_timer` calls so far
    pub fn arm_count(&self) -> u64 {
        self.arm_count.load(Ordering::Relaxed)
    }

    /// Decisions requested and not yet taken
    pub fn pending_decisions(&self) -> u64 {
        self.pending.load(Ordering::Acquire)
    }

    /// Take all pending decision requests, returning how many there were
    pub fn take_decisions(&self) -> u64 {
        self.pending.swap(0, Ordering::AcqRel)
    }

    /// Wait until a scheduling decision is requested
    pub async fn decision_requested(&self) {
        self.decision.notified().await;
    }
}

impl Host for SimulatedHost {
    fn current_policy(&self) -> Option<Policy> {
        self.policy.get().copied()
    }

    fn set_policy(&self, policy: Policy) {
        match self.policy.set(policy) {
            Ok(()) => info!(%policy, "Scheduling policy fixed"),
            Err(ignored) => debug!(
                %ignored,
                fixed = ?self.policy.get(),
                "Policy already fixed, change ignored"
            ),
        }
    }

    fn arm_timer(&self, interval_ticks: u32) {
        self.armed_interval.store(interval_ticks, Ordering::Relaxed);
        self.arm_count.fetch_add(1, Ordering::Relaxed);

        if let Some(ref commands) = *self.timer.lock() {
            let _ = commands.send(TimerCommand::Arm(interval_ticks));
        }
    }

    fn trigger_scheduling_decision(&self) {
        self.pending.fetch_add(1, Ordering::AcqRel);
        self.decision.notify_one();
    }
}
