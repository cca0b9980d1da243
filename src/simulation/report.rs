//! Run bookkeeping.

use crate::time::VirtualTime;

/// Running totals for one simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Stats {
    /// Messages handed to the behavior model, dropped ones included.
    pub messages_sent: u64,
    pub messages_delivered: u64,
    pub messages_dropped: u64,
    pub alarms_set: u64,
    pub alarms_fired: u64,
    pub alarms_cancelled: u64,
    /// Events that found a bound action.
    pub actions_dispatched: u64,
    /// Events that found none.
    pub unimplemented_actions: u64,
}

/// Why a run call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Halt {
    /// Nothing left to dispatch.
    Idle,
    /// The step budget ran out.
    StepBudget,
    /// The next event lies past the time budget.
    TimeBudget,
}

/// Summary of one `run*` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct RunReport {
    /// Events dispatched by this call.
    pub steps: u64,
    /// Simulated time when the call returned.
    pub time: VirtualTime,
    pub halt: Halt,
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} steps, halted at {} ({:?})", self.steps, self.time, self.halt)
    }
}
