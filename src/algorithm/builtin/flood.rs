//! `Flood`: broadcast by flooding.
//!
//! The initiator sends its information to every neighbor. Any idle node
//! that hears it for the first time stores it, passes it on to every
//! neighbor except the one it came from, and is done. Exactly `2m - n + 1`
//! messages are sent on a connected network with `m` links.

use serde_json::Value;

use crate::algorithm::{Action, ActionTable, Initializer, NodeAlgorithm, Status};
use crate::message::IncomingMessage;
use crate::node::NodeAccess;
use crate::restriction::{
    BidirectionalLinks, Connectivity, Restriction, TotalReliability, UniqueInitiator,
};

/// Header of the flooded message.
pub const INFORMATION: &str = "Information";

/// Memory key holding the information once a node has it.
pub const INFORMATION_KEY: &str = "information";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FloodStatus {
    Initiator,
    Idle,
    Done,
}

impl Status for FloodStatus {
    fn all() -> &'static [Self] {
        &[FloodStatus::Initiator, FloodStatus::Idle, FloodStatus::Done]
    }
}

/// Flooding broadcast from the lowest-numbered node.
#[derive(Debug, Clone)]
pub struct Flood {
    information: Value,
}

impl Flood {
    pub fn new(information: Value) -> Self {
        Flood { information }
    }

    fn start(&self, node: &mut NodeAccess<'_, FloodStatus>, _: &IncomingMessage<'_>) {
        let information = node
            .memory()
            .get(INFORMATION_KEY)
            .cloned()
            .unwrap_or(Value::Null);
        node.send_to_all(INFORMATION, information);
        node.set_status(FloodStatus::Done);
    }

    fn forward(&self, node: &mut NodeAccess<'_, FloodStatus>, message: &IncomingMessage<'_>) {
        let information = message.payload().clone();
        node.memory_mut().set(INFORMATION_KEY, information.clone());
        match message.source() {
            Some(from) => node.send_to_all_except(from, INFORMATION, information),
            None => node.send_to_all(INFORMATION, information),
        }
        node.set_status(FloodStatus::Done);
    }

    fn ignore(&self, _: &mut NodeAccess<'_, FloodStatus>, _: &IncomingMessage<'_>) {}
}

impl Default for Flood {
    fn default() -> Self {
        Flood::new(Value::String("Hello distributed world".into()))
    }
}

impl NodeAlgorithm for Flood {
    type Status = FloodStatus;

    fn actions(&self, table: &mut ActionTable<Self>) {
        table
            .on(FloodStatus::Initiator, Action::Spontaneously, Self::start)
            .on_header(FloodStatus::Idle, INFORMATION, Self::forward)
            .default_for(FloodStatus::Done, Self::ignore);
    }

    fn initial_status(&self) -> FloodStatus {
        FloodStatus::Idle
    }

    fn initial_statuses(&self) -> Vec<FloodStatus> {
        vec![FloodStatus::Initiator, FloodStatus::Idle]
    }

    fn terminal_statuses(&self) -> Vec<FloodStatus> {
        vec![FloodStatus::Done]
    }

    fn restrictions(&self) -> Vec<Box<dyn Restriction<FloodStatus>>> {
        vec![
            Box::new(BidirectionalLinks),
            Box::new(TotalReliability),
            Box::new(Connectivity),
            Box::new(UniqueInitiator),
        ]
    }

    fn initialize(&self, init: &mut Initializer<'_, FloodStatus>) {
        init.set_all(FloodStatus::Idle);
        if let Some(first) = init.node_ids().next() {
            init.set_status(first, FloodStatus::Initiator);
            if let Some(memory) = init.memory_mut(first) {
                memory.set(INFORMATION_KEY, self.information.clone());
            }
            init.mark_initiator(first);
        }
    }
}
