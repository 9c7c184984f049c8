/*!
 * Scheduler Traits
 * Contract shared by every scheduling discipline
 */

use super::entry::ProcessEntry;
use super::registry::ProcessTable;
use super::types::{Policy, TickAction};
use crate::core::types::{Pid, SlotId};

/// A scheduling discipline layered over the process table
///
/// The table owns admission and removal of entries; a discipline keeps
/// whatever extra ordering or accounting its policy needs and is told about
/// every change right after it happened.
pub trait SchedulingDiscipline: Send {
    /// Policy implemented by this discipline
    fn policy(&self) -> Policy;

    /// `slot` was just filled
    fn admitted(&mut self, table: &mut ProcessTable, slot: SlotId);

    /// `slot` was just freed; `entry` is what it held
    fn removed(&mut self, table: &mut ProcessTable, slot: SlotId, entry: &ProcessEntry);

    /// Pick the next process to run, charging it if the policy accounts usage
    fn select(&mut self, table: &mut ProcessTable) -> Option<Pid>;

    /// Periodic timer callback
    fn tick(&mut self, table: &ProcessTable) -> TickAction;

    /// Forget all bookkeeping
    fn reset(&mut self);
}
