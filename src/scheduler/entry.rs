/*!
 * Scheduler Entry Types
 * Per-process bookkeeping held in the process table
 */

use super::types::ProcessStats;
use crate::core::types::{Percent, Pid, SlotId};

/// Process scheduling entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: Pid,
    /// Reserved CPU percentage, 0 when unreserved
    pub request: Percent,
    /// Pass increment per selection, inversely proportional to the share
    pub stride: u64,
    /// Virtual time consumed so far
    pub pass: u64,
}

impl ProcessEntry {
    pub fn new(pid: Pid) -> Self {
        Self {
            pid,
            request: 0,
            stride: 0,
            pass: 0,
        }
    }

    #[inline]
    pub fn is_reserving(&self) -> bool {
        self.request > 0
    }

    /// Charge one selection to this entry
    #[inline]
    pub fn advance(&mut self) {
        self.pass = self.pass.saturating_add(self.stride);
    }

    pub fn stats(&self, slot: SlotId) -> ProcessStats {
        ProcessStats {
            slot,
            pid: self.pid,
            request: self.request,
            stride: self.stride,
            pass: self.pass,
        }
    }
}
