/*!
 * Kernel Configuration
 * Runtime configuration loaded from KERNEL_* environment variables or JSON
 */

use super::errors::KernelError;
use super::limits::{DEFAULT_RUN_TICKS, DEFAULT_TICK, MAX_PROCS, TIMER_INTERVAL_TICKS};
use super::types::KernelResult;
use crate::scheduler::Policy;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Scheduler and host configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Policy fixed by `initialize()` when the host has not locked one in
    pub policy: Policy,
    /// Number of process table slots
    pub max_procs: usize,
    /// Wall-clock length of one logical tick, in milliseconds
    pub tick_ms: u64,
    /// Ticks between two timer callbacks
    pub timer_interval: u32,
    /// Length of the demonstration run, in ticks
    pub run_ticks: u64,
    /// Emit JSON-formatted traces
    pub trace_json: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            policy: Policy::Proportional,
            max_procs: MAX_PROCS,
            tick_ms: DEFAULT_TICK.as_millis() as u64,
            timer_interval: TIMER_INTERVAL_TICKS,
            run_ticks: DEFAULT_RUN_TICKS,
            trace_json: false,
        }
    }
}

impl KernelConfig {
    /// Load configuration from the environment, falling back to defaults
    ///
    /// Environment variables:
    /// - KERNEL_SCHED_POLICY: arbitrary | fifo | lifo | round_robin | proportional
    /// - KERNEL_MAX_PROCS: process table capacity
    /// - KERNEL_TICK_MS: tick length in milliseconds
    /// - KERNEL_TIMER_INTERVAL: ticks between timer callbacks
    /// - KERNEL_RUN_TICKS: length of the demonstration run
    /// - KERNEL_TRACE_JSON: 1/true for JSON traces
    pub fn from_env() -> KernelResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parse configuration from a JSON document
    pub fn from_json(json: &str) -> KernelResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    fn from_lookup<F>(lookup: F) -> KernelResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("KERNEL_SCHED_POLICY") {
            config.policy = Policy::from_str(&value).map_err(KernelError::Configuration)?;
        }
        if let Some(value) = lookup("KERNEL_MAX_PROCS") {
            config.max_procs = parse_var("KERNEL_MAX_PROCS", &value)?;
        }
        if let Some(value) = lookup("KERNEL_TICK_MS") {
            config.tick_ms = parse_var("KERNEL_TICK_MS", &value)?;
        }
        if let Some(value) = lookup("KERNEL_TIMER_INTERVAL") {
            config.timer_interval = parse_var("KERNEL_TIMER_INTERVAL", &value)?;
        }
        if let Some(value) = lookup("KERNEL_RUN_TICKS") {
            config.run_ticks = parse_var("KERNEL_RUN_TICKS", &value)?;
        }
        if let Some(value) = lookup("KERNEL_TRACE_JSON") {
            config.trace_json = value == "1" || value.eq_ignore_ascii_case("true");
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the scheduler cannot run with
    pub fn validate(&self) -> KernelResult<()> {
        if self.max_procs == 0 {
            return Err(KernelError::Configuration(
                "max_procs must be at least 1".into(),
            ));
        }
        if self.tick_ms == 0 {
            return Err(KernelError::Configuration("tick_ms must be at least 1".into()));
        }
        if self.timer_interval == 0 {
            return Err(KernelError::Configuration(
                "timer_interval must be at least 1 tick".into(),
            ));
        }
        Ok(())
    }

    /// Length of one logical tick
    #[inline]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> KernelResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| KernelError::Configuration(format!("{}: invalid value '{}'", key, value)))
}
