//! The algorithm declaration contract.
//!
//! A distributed algorithm is a [`NodeAlgorithm`]: a closed set of
//! statuses, a table binding (status, event) pairs to actions, an
//! optional initializer and an ordered list of restrictions. Everything
//! else (scheduling, delivery, alarms) belongs to the simulation.
//!
//! ```text
//!   event ──► (status, header)  ──┐
//!             (status, action)  ──┼──► handler(&algorithm, &mut NodeAccess, &IncomingMessage)
//!             (status, Default) ──┤
//!             global default    ──┘   otherwise: warning, node untouched
//! ```

pub mod builtin;
pub mod init;
pub mod table;

use std::fmt;
use std::hash::Hash;

use crate::message::MessageKind;
use crate::restriction::Restriction;

pub use init::Initializer;
pub use table::{ActionTable, Handler};

/// A closed enumeration of node statuses.
///
/// `all()` lists every member exactly once; the action table is
/// validated against it.
pub trait Status: Copy + Eq + Ord + Hash + fmt::Debug + 'static {
    fn all() -> &'static [Self];
}

/// Families of actions an event can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    /// A message from a neighbor arrived.
    Receiving,
    /// The node was woken up by a spontaneous impulse.
    Spontaneously,
    /// One of the node's alarms went off.
    Alarm,
}

impl Action {
    pub fn for_kind(kind: MessageKind) -> Action {
        match kind {
            MessageKind::Normal => Action::Receiving,
            MessageKind::Initialization => Action::Spontaneously,
            MessageKind::Alarm => Action::Alarm,
        }
    }
}

/// A distributed algorithm run by every node.
pub trait NodeAlgorithm: Sized + 'static {
    type Status: Status;

    fn name(&self) -> &str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Bind actions. Called once, when the simulation is built.
    fn actions(&self, table: &mut ActionTable<Self>);

    /// Status every node starts in before the initializer runs.
    fn initial_status(&self) -> Self::Status;

    /// Statuses nodes may be in once initialization is done.
    fn initial_statuses(&self) -> Vec<Self::Status> {
        vec![self.initial_status()]
    }

    /// Statuses in which a node has finished.
    fn terminal_statuses(&self) -> Vec<Self::Status> {
        Vec::new()
    }

    /// Assumptions the algorithm relies on, checked in this order.
    fn restrictions(&self) -> Vec<Box<dyn Restriction<Self::Status>>> {
        Vec::new()
    }

    /// Set up statuses and memory and choose the initiators.
    ///
    /// The default leaves every node in `initial_status()` and makes the
    /// lowest node the only initiator.
    fn initialize(&self, init: &mut Initializer<'_, Self::Status>) {
        init.set_all(self.initial_status());
        if let Some(first) = init.node_ids().next() {
            init.mark_initiator(first);
        }
    }
}
