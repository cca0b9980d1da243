//! In-memory snapshots of a run.

use crate::time::VirtualTime;

use super::report::Stats;
use super::RunState;

/// A frozen copy of everything that changes while a simulation runs:
/// time, nodes, the event queue, the RNG, ordering watermarks, stats and
/// trace. Restoring it and stepping again replays the run exactly.
#[derive(Debug, Clone)]
pub struct Snapshot<S> {
    pub(crate) state: RunState<S>,
}

impl<S: Copy> Snapshot<S> {
    pub fn time(&self) -> VirtualTime {
        self.state.now
    }

    /// Events dispatched before the snapshot was taken.
    pub fn steps(&self) -> u64 {
        self.state.steps
    }

    pub fn stats(&self) -> Stats {
        self.state.stats
    }

    pub fn node_count(&self) -> usize {
        self.state.nodes.len()
    }
}
