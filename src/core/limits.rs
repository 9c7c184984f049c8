/*!
 * System Limits and Constants
 *
 * Centralized location for scheduler-wide limits and magic numbers.
 * Values that the runtime configuration can override are marked [CONFIG].
 */

use super::types::Pid;
use std::time::Duration;

// =============================================================================
// PROCESS TABLE
// =============================================================================

/// Number of process table slots
/// [CONFIG] `KernelConfig::max_procs`
pub const MAX_PROCS: usize = 10;

// =============================================================================
// PROPORTIONAL SHARE
// =============================================================================

/// Fixed-point scale for strides (stride = STRIDE_SCALE / share)
/// Large enough that a 1% reservation still yields an integer stride of 100000
pub const STRIDE_SCALE: u64 = 100_000;

/// Total reservable CPU, in percent
pub const FULL_RESERVATION: u32 = 100;

// =============================================================================
// TIMER
// =============================================================================

/// Ticks between two timer callbacks
/// [CONFIG] `KernelConfig::timer_interval`
pub const TIMER_INTERVAL_TICKS: u32 = 1;

/// Wall-clock length of one logical tick
/// [CONFIG] `KernelConfig::tick_ms`
pub const DEFAULT_TICK: Duration = Duration::from_millis(10);

/// Length of the demonstration run of the `kernel` binary, in ticks
pub const DEFAULT_RUN_TICKS: u64 = 1_000;

// =============================================================================
// CONTEXT SWITCHING
// =============================================================================

/// Pid reported by `switch_to` when a fiber was resumed by the host itself
pub const HOST_PID: Pid = 0;

/// Stack reserved for each fiber thread
pub const FIBER_STACK_SIZE: usize = 256 * 1024;

/// Convert a tick count into wall-clock time
#[inline]
pub fn ticks_to_duration(tick: Duration, ticks: u32) -> Duration {
    tick.saturating_mul(ticks)
}
