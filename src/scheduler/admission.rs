/*!
 * Admission Controller
 * CPU-rate reservations and the aggregates they are checked against
 */

use super::entry::ProcessEntry;
use super::registry::ProcessTable;
use super::types::ReservationSummary;
use crate::core::errors::{SchedulerError, SchedulerResult};
use crate::core::limits::{FULL_RESERVATION, STRIDE_SCALE};
use crate::core::types::{Percent, Pid, SlotId};
use log::{debug, info};

/// Reservation aggregates
///
/// Invariants held between public calls:
/// - `sum_requested` is the sum of `request` over reserving entries, at most 100
/// - every unreserved entry has `stride == shared_stride`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationLedger {
    sum_requested: u32,
    requesting: usize,
    processes: usize,
    full: bool,
    shared_stride: u64,
}

/// Stride for a reservation of `percent`
#[inline]
pub fn reserved_stride(percent: Percent) -> u64 {
    STRIDE_SCALE / u64::from(percent.max(1))
}

impl ReservationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.full
    }

    #[inline]
    pub fn shared_stride(&self) -> u64 {
        self.shared_stride
    }

    pub fn summary(&self) -> ReservationSummary {
        ReservationSummary {
            sum_requested: self.sum_requested,
            requesting: self.requesting,
            processes: self.processes,
            full: self.full,
            shared_stride: self.shared_stride,
        }
    }

    /// A new, unreserved process entered `slot`
    pub fn admit(&mut self, table: &mut ProcessTable, slot: SlotId) {
        self.processes += 1;
        if let Some(entry) = table.get_mut(slot) {
            entry.stride = self.shared_stride;
        }
        if !self.full {
            self.rebalance(table);
        }
    }

    /// The process that held `entry` left the table
    pub fn release(&mut self, table: &mut ProcessTable, entry: &ProcessEntry) {
        self.processes = self.processes.saturating_sub(1);

        if entry.is_reserving() {
            self.requesting = self.requesting.saturating_sub(1);
            self.sum_requested -= u32::from(entry.request);
            if self.sum_requested < FULL_RESERVATION {
                self.full = false;
            }
            info!(
                "Process {} released {}% reservation ({}% still reserved)",
                entry.pid, entry.request, self.sum_requested
            );
        }

        if !self.full {
            self.rebalance(table);
        }
    }

    /// Change the reservation of `pid` to `rate` percent
    ///
    /// Either the whole change is applied or nothing is: every check runs
    /// before the first write.
    pub fn request(
        &mut self,
        table: &mut ProcessTable,
        pid: Pid,
        rate: i32,
    ) -> SchedulerResult<()> {
        let percent = validate_rate(rate)?;
        let slot = table.find(pid).ok_or(SchedulerError::ProcessNotFound(pid))?;
        let old = table
            .get(slot)
            .map(|e| u32::from(e.request))
            .ok_or(SchedulerError::ProcessNotFound(pid))?;
        let new = u32::from(percent);

        if old == 0 && new == 0 {
            return Err(SchedulerError::NullReservation(pid));
        }

        let others = self.sum_requested - old;
        if others + new > FULL_RESERVATION {
            return Err(SchedulerError::OverCommitted {
                requested: new,
                available: FULL_RESERVATION - others,
            });
        }

        // Validated, commit
        self.sum_requested = others + new;
        match (old, new) {
            (0, _) => self.requesting += 1,
            (_, 0) => self.requesting -= 1,
            _ => {}
        }

        if let Some(entry) = table.get_mut(slot) {
            entry.request = percent;
            entry.stride = if new > 0 {
                reserved_stride(percent)
            } else {
                self.shared_stride
            };
        }

        self.full = self.sum_requested == FULL_RESERVATION;
        if !self.full {
            self.rebalance(table);
        }

        info!(
            "Process {} reservation {}% -> {}% (total {}%, full={})",
            pid, old, new, self.sum_requested, self.full
        );
        Ok(())
    }

    /// Recompute the shared stride from scratch and hand it to every
    /// unreserved entry
    ///
    /// Must only run while the CPU is not fully reserved.
    fn rebalance(&mut self, table: &mut ProcessTable) {
        let unreserved = (self.processes - self.requesting) as u64;
        let remainder = u64::from(FULL_RESERVATION - self.sum_requested);
        self.shared_stride = STRIDE_SCALE * unreserved / remainder;

        for (_, entry) in table.iter_mut().filter(|(_, e)| !e.is_reserving()) {
            entry.stride = self.shared_stride;
        }

        debug!(
            "Shared stride now {} ({} unreserved over {}%)",
            self.shared_stride, unreserved, remainder
        );
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Check a requested rate lies within 0..=100 percent
pub fn validate_rate(rate: i32) -> SchedulerResult<Percent> {
    if !(0..=FULL_RESERVATION as i32).contains(&rate) {
        return Err(SchedulerError::InvalidRate(rate));
    }
    Ok(rate as Percent)
}
