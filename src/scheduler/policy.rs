/*!
 * Scheduler Policy Dispatch
 * Closed set of disciplines, chosen once at construction
 */

use super::queue::{Arbitrary, Ordered, RunQueue};
use super::stride::Proportional;
use super::traits::SchedulingDiscipline;
use super::types::Policy;

/// The discipline behind a scheduler, one variant per policy
#[derive(Debug, Clone)]
pub enum Discipline {
    Arbitrary(Arbitrary),
    Ordered(Ordered),
    Proportional(Proportional),
}

impl Discipline {
    pub fn new(policy: Policy, capacity: usize) -> Self {
        match policy {
            Policy::Arbitrary => Self::Arbitrary(Arbitrary),
            Policy::Fifo => Self::Ordered(Ordered::fifo(capacity)),
            Policy::Lifo => Self::Ordered(Ordered::lifo(capacity)),
            Policy::RoundRobin => Self::Ordered(Ordered::round_robin(capacity)),
            Policy::Proportional => Self::Proportional(Proportional::new()),
        }
    }

    #[inline]
    pub fn as_dyn(&self) -> &dyn SchedulingDiscipline {
        match self {
            Self::Arbitrary(d) => d,
            Self::Ordered(d) => d,
            Self::Proportional(d) => d,
        }
    }

    #[inline]
    pub fn as_dyn_mut(&mut self) -> &mut dyn SchedulingDiscipline {
        match self {
            Self::Arbitrary(d) => d,
            Self::Ordered(d) => d,
            Self::Proportional(d) => d,
        }
    }

    /// Run queue of an ordered policy
    pub fn run_queue(&self) -> Option<&RunQueue> {
        match self {
            Self::Ordered(d) => Some(d.queue()),
            _ => None,
        }
    }

    /// Stride state of the proportional policy
    pub fn proportional(&self) -> Option<&Proportional> {
        match self {
            Self::Proportional(d) => Some(d),
            _ => None,
        }
    }

    pub fn proportional_mut(&mut self) -> Option<&mut Proportional> {
        match self {
            Self::Proportional(d) => Some(d),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discipline_matches_policy() {
        for policy in Policy::ALL {
            let discipline = Discipline::new(policy, 4);
            assert_eq!(discipline.as_dyn().policy(), policy);
            assert_eq!(discipline.run_queue().is_some(), policy.is_ordered());
            assert_eq!(
                discipline.proportional().is_some(),
                policy == Policy::Proportional
            );
        }
    }
}
