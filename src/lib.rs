//! # distsim: Deterministic Simulation of Distributed Algorithms
//!
//! A simulation engine for message-passing distributed algorithms. Nodes
//! run a status-driven action table, talk only to their neighbors through
//! local labels, and are driven by a single-threaded discrete-event loop
//! over simulated time. A network behavior model decides delays, loss,
//! ordering and clock rates; restrictions check the assumptions an
//! algorithm makes about its world. A [`Pipeline`] runs several
//! algorithms in turn over the same node memory.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │                Simulation                 │ ← start / step / run
//! │  ┌──────────────┐   ┌──────────────────┐  │
//! │  │  Scheduler   │   │ BehaviorModel    │  │ ← (time, seq) queue / delay, loss, clocks
//! │  └──────────────┘   └──────────────────┘  │
//! │  ┌──────────────┐   ┌──────────────────┐  │
//! │  │ Node arena   │◄──│  ActionTable     │  │ ← status → handler
//! │  │ + Network    │   │  via NodeAccess  │  │
//! │  └──────────────┘   └──────────────────┘  │
//! │  ┌──────────────┐   ┌──────────────────┐  │
//! │  │ Restrictions │   │  ObserverBus     │──┼──► Recorder, Counter, tracing
//! │  └──────────────┘   └──────────────────┘  │
//! └───────────────────────────────────────────┘
//! ```

pub mod algorithm;
pub mod behavior;
pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod message;
pub mod network;
pub mod node;
pub mod observer;
pub mod restriction;
pub mod scheduler;
pub mod simulation;
pub mod time;

// Re-exports for convenience.
pub use algorithm::{Action, ActionTable, Handler, Initializer, NodeAlgorithm, Status};
pub use behavior::{
    ClockPolicy, Decision, DecisionContext, DelayPolicy, LossPolicy, NetworkBehaviorModel,
    OrderingMode,
};
pub use config::SimulationConfig;
pub use error::{SimError, SimResult};
pub use event::{Event, EventId, EventType};
pub use message::{IncomingMessage, Message, MessageId, MessageKind, NO_HEADER};
pub use network::{EdgeList, Network, Topology};
pub use node::{
    Alarm, AlarmHandle, AlarmState, DispatchOutcome, Memory, NeighborLabel, Node, NodeAccess,
    NodeId, TraceEntry,
};
pub use observer::{
    Counter, ObservedEvent, ObservedKind, Observer, ObserverBus, Recorder, SubscriptionId,
    TracingObserver,
};
pub use restriction::{Checkpoint, Invariant, NetworkView, Restriction, Verdict};
pub use scheduler::Scheduler;
pub use simulation::{
    Halt, NetworkAccess, NetworkAlgorithm, Pipeline, RunReport, Simulation, Snapshot, StageReport,
    Stats,
};
pub use time::VirtualTime;
