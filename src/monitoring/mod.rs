/*!
 * Monitoring
 * Tracing setup and lock-free scheduler counters
 */

mod stats;
mod tracer;

pub use stats::SchedulerCounters;
pub use tracer::init_tracing;
