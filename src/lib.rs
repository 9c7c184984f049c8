/*!
 * Proportional-Share Kernel Library
 * Pluggable CPU scheduling core for a hosted kernel
 */

pub mod context;
pub mod core;
pub mod host;
pub mod monitoring;
pub mod scheduler;

// Re-exports
pub use context::{ContextSwitcher, Fiber, Handoff, MachineContext};
pub use crate::core::limits::HOST_PID;
pub use crate::core::*;
pub use host::{Host, SchedCore, SimulatedHost, TimerCommand, TimerTask};
pub use monitoring::{init_tracing, SchedulerCounters};
pub use scheduler::{
    Policy, ProcessStats, ReservationSummary, Scheduler, SchedulerStats, TickAction,
};
