/*!
 * Scheduler Types
 * Domain types for scheduling policies, statistics and introspection
 */

use crate::core::types::{Percent, Pid, SlotId};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Scheduling policy
///
/// Fixed once at initialization and never changed during a run.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    /// First valid table slot, non-preemptive
    Arbitrary,
    /// Oldest admitted process, non-preemptive
    Fifo,
    /// Most recently admitted process, non-preemptive
    Lifo,
    /// Oldest admitted process, rotated on every timer tick
    RoundRobin,
    /// Stride scheduling with CPU-rate reservations
    Proportional,
}

impl Policy {
    /// All policies, in catalog order
    pub const ALL: [Policy; 5] = [
        Self::Arbitrary,
        Self::Fifo,
        Self::Lifo,
        Self::RoundRobin,
        Self::Proportional,
    ];

    /// Convert to string representation
    ///
    /// # Performance
    /// Hot path - frequently called for logging and serialization
    #[inline(always)]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Arbitrary => "arbitrary",
            Self::Fifo => "fifo",
            Self::Lifo => "lifo",
            Self::RoundRobin => "round_robin",
            Self::Proportional => "proportional",
        }
    }

    /// Whether timer ticks can take the CPU away from the running process
    #[inline]
    pub const fn is_preemptive(&self) -> bool {
        matches!(self, Self::RoundRobin | Self::Proportional)
    }

    /// Whether admissions are kept in an ordered sequence
    #[inline]
    pub const fn is_ordered(&self) -> bool {
        matches!(self, Self::Fifo | Self::Lifo | Self::RoundRobin)
    }
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "arbitrary" => Ok(Self::Arbitrary),
            "fifo" => Ok(Self::Fifo),
            "lifo" => Ok(Self::Lifo),
            "round_robin" | "roundrobin" | "rr" => Ok(Self::RoundRobin),
            "proportional" | "stride" => Ok(Self::Proportional),
            _ => Err(format!(
                "Invalid policy '{}'. Valid: arbitrary, fifo, lifo, round_robin, proportional",
                s
            )),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Policy {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Policy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// What a timer tick did to the scheduling state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    /// Non-preemptive policy, nothing to do
    Ignored,
    /// Round-robin head moved to the tail
    Rotated,
    /// A fresh scheduling decision is due
    Reschedule,
}

impl TickAction {
    /// Whether the host must be asked for a scheduling decision
    #[inline]
    pub const fn needs_decision(&self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

/// Per-process scheduling statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessStats {
    pub slot: SlotId,
    pub pid: Pid,
    pub request: Percent,
    pub stride: u64,
    pub pass: u64,
}

/// Snapshot of the reservation aggregates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReservationSummary {
    pub sum_requested: u32,
    pub requesting: usize,
    pub processes: usize,
    pub full: bool,
    pub shared_stride: u64,
}

impl ReservationSummary {
    /// Percent of the CPU still unreserved
    #[inline]
    pub const fn available(&self) -> u32 {
        crate::core::limits::FULL_RESERVATION.saturating_sub(self.sum_requested)
    }
}

/// Global scheduler statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub policy: Policy,
    pub decisions: u64,
    pub idle_decisions: u64,
    pub ticks: u64,
    pub rotations: u64,
    pub admissions: u64,
    pub removals: u64,
    pub rejected_requests: u64,
    pub active_processes: usize,
}
