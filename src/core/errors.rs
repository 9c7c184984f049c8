/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::types::Pid;
use crate::scheduler::Policy;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scheduler result type
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler-related errors with serialization support
///
/// Every variant is recoverable: the operation that produced it left the
/// scheduling state untouched.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SchedulerError {
    #[error("No free process table entries (capacity {capacity})")]
    #[diagnostic(
        code(scheduler::table_full),
        help("Wait for a process to end before admitting another one.")
    )]
    TableFull { capacity: usize },

    #[error("Process {0} not found in scheduler")]
    #[diagnostic(
        code(scheduler::process_not_found),
        help("Process may have ended or was never started.")
    )]
    ProcessNotFound(Pid),

    #[error("Process {0} is already registered")]
    #[diagnostic(
        code(scheduler::already_registered),
        help("Process identifiers must be unique among running processes.")
    )]
    AlreadyRegistered(Pid),

    #[error("Invalid CPU rate {0}%")]
    #[diagnostic(
        code(scheduler::invalid_rate),
        help("A CPU rate must be between 0 and 100 percent.")
    )]
    InvalidRate(i32),

    #[error("Process {0} has no reservation to cancel")]
    #[diagnostic(
        code(scheduler::null_reservation),
        help("Request a rate between 1 and 100 percent to create a reservation.")
    )]
    NullReservation(Pid),

    #[error("CPU over-committed: requested {requested}%, only {available}% available")]
    #[diagnostic(
        code(scheduler::over_committed),
        help("Reservations across all processes cannot exceed 100%.")
    )]
    OverCommitted { requested: u32, available: u32 },

    #[error("Policy {0:?} does not support CPU reservations")]
    #[diagnostic(
        code(scheduler::reservation_unsupported),
        help("Reservations are only honoured by the proportional policy.")
    )]
    ReservationUnsupported(Policy),

    #[error("Scheduler not initialized")]
    #[diagnostic(
        code(scheduler::not_initialized),
        help("Call initialize() before using the scheduler entry points.")
    )]
    NotInitialized,
}

/// Context switching errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ContextError {
    #[error("No saved context for process {0}")]
    #[diagnostic(code(context::unknown_process))]
    UnknownProcess(Pid),

    #[error("Process {0} already has a saved context")]
    #[diagnostic(code(context::already_registered))]
    AlreadyRegistered(Pid),

    #[error("Context table full (capacity {capacity})")]
    #[diagnostic(
        code(context::table_full),
        help("Release contexts of ended processes before registering new ones.")
    )]
    TableFull { capacity: usize },

    #[error("Fiber for process {0} already launched")]
    #[diagnostic(code(context::already_launched))]
    AlreadyLaunched(Pid),

    #[error("Fiber for process {0} is gone")]
    #[diagnostic(
        code(context::fiber_gone),
        help("The target process finished; its context can no longer be resumed.")
    )]
    FiberGone(Pid),

    #[error("Fiber for process {0} was never launched")]
    #[diagnostic(
        code(context::not_launched),
        help("Launch the process's fiber before switching to it.")
    )]
    NotLaunched(Pid),

    #[error("Failed to spawn fiber: {0}")]
    #[diagnostic(code(context::spawn_failed))]
    SpawnFailed(String),

    #[error("Context switcher shut down")]
    #[diagnostic(code(context::terminated))]
    Terminated,
}

/// Unified kernel error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum KernelError {
    #[error("Scheduler error: {0}")]
    #[diagnostic(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("Context error: {0}")]
    #[diagnostic(transparent)]
    Context(#[from] ContextError),

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(kernel::configuration_error),
        help("Invalid configuration. Review KERNEL_* environment variables.")
    )]
    Configuration(String),

    #[error("I/O error: {0}")]
    #[diagnostic(code(kernel::io_error))]
    Io(String),
}

impl From<std::io::Error> for KernelError {
    fn from(err: std::io::Error) -> Self {
        KernelError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for KernelError {
    fn from(err: serde_json::Error) -> Self {
        KernelError::Configuration(err.to_string())
    }
}
