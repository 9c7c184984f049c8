/*!
 * Host Interface
 * Entry points called by the host kernel and the collaborators it provides
 */

mod sched_core;
pub mod sim;
pub mod timer;

pub use sched_core::SchedCore;
pub use sim::SimulatedHost;
pub use timer::{TimerCommand, TimerTask};

use crate::core::errors::SchedulerError;
use crate::scheduler::Policy;
use miette::Diagnostic;
use tracing::warn;

/// Services the host kernel provides to the scheduling core
///
/// Calls into the host are always made with the scheduler lock released,
/// so an implementation may call straight back into `SchedCore`.
pub trait Host: Send + Sync {
    /// Policy the host has fixed, if any
    fn current_policy(&self) -> Option<Policy>;

    /// Fix the policy; ignored once a policy is already fixed
    fn set_policy(&self, policy: Policy);

    /// Request a timer callback after `interval_ticks` ticks
    fn arm_timer(&self, interval_ticks: u32);

    /// Ask the host to call `schedule()` again and act on the result
    fn trigger_scheduling_decision(&self);

    /// Diagnostic sink for recoverable scheduler errors
    fn report(&self, error: &SchedulerError) {
        let code = error.code().map(|c| c.to_string());
        warn!(code = code.as_deref().unwrap_or("scheduler"), "{}", error);
    }
}
