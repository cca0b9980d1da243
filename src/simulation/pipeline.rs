//! Running algorithms one after another on the same network.
//!
//! A [`Pipeline`] holds an ordered list of stages. Each stage is either a
//! distributed [`NodeAlgorithm`], run by a fresh [`Simulation`] until it
//! goes idle, or a centralized [`NetworkAlgorithm`] that runs in a single
//! step with a global view. Node memory carries over from one stage to
//! the next; statuses, alarms and the event queue do not.
//!
//! ```text
//!   memory ─► stage 0 ─► memory ─► stage 1 ─► memory ─► ...
//! ```

use std::collections::BTreeMap;

use serde_json::json;
use tracing::{debug, info};

use crate::algorithm::NodeAlgorithm;
use crate::behavior::NetworkBehaviorModel;
use crate::config::SimulationConfig;
use crate::error::{SimError, SimResult};
use crate::network::Network;
use crate::node::{Memory, NodeId};
use crate::observer::{ObservedKind, Observer, ObserverBus, SubscriptionId};
use crate::time::VirtualTime;

use super::{Halt, RunReport, Simulation};

// ── Centralized algorithms ────────────────────────────────────────────

/// A centralized algorithm: one step that sees the whole network.
pub trait NetworkAlgorithm: 'static {
    fn name(&self) -> &str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    fn run(&self, network: &mut NetworkAccess<'_>) -> SimResult<()>;
}

/// What a centralized step may read and change.
pub struct NetworkAccess<'a> {
    network: &'a Network,
    memories: &'a mut [Memory],
}

impl<'a> NetworkAccess<'a> {
    pub fn network(&self) -> &Network {
        self.network
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.network.nodes()
    }

    pub fn memory(&self, id: NodeId) -> Option<&Memory> {
        self.memories.get(id.index())
    }

    pub fn memory_mut(&mut self, id: NodeId) -> Option<&mut Memory> {
        self.memories.get_mut(id.index())
    }

    pub fn memories(&self) -> impl Iterator<Item = (NodeId, &Memory)> {
        self.memories
            .iter()
            .enumerate()
            .map(|(i, m)| (NodeId::new(i as u64), m))
    }
}

// ── Stages ────────────────────────────────────────────────────────────

/// Shared state a stage runs against.
struct StageWorld<'a> {
    network: &'a Network,
    behavior: &'a NetworkBehaviorModel,
    config: &'a SimulationConfig,
    memories: &'a mut Vec<Memory>,
    observers: &'a mut ObserverBus,
}

trait Stage {
    fn name(&self) -> &str;

    /// Run within the configured budgets. `Halt::Idle` means the stage is
    /// done.
    fn advance(&mut self, world: &mut StageWorld<'_>) -> SimResult<RunReport>;

    fn reset(&mut self);
}

struct NodeStage<A: NodeAlgorithm> {
    algorithm: A,
    /// The run in progress, kept across budget-limited calls.
    active: Option<Simulation<A>>,
}

impl<A: NodeAlgorithm + Clone> NodeStage<A> {
    fn launch(&self, world: &StageWorld<'_>) -> SimResult<Simulation<A>> {
        let mut sim = Simulation::new(
            world.network.clone(),
            world.behavior.clone(),
            self.algorithm.clone(),
            world.config.clone(),
        )?;
        sim.load_memories(world.memories.as_slice());
        Ok(sim)
    }
}

impl<A: NodeAlgorithm + Clone> Stage for NodeStage<A> {
    fn name(&self) -> &str {
        self.algorithm.name()
    }

    fn advance(&mut self, world: &mut StageWorld<'_>) -> SimResult<RunReport> {
        let mut sim = match self.active.take() {
            Some(sim) => sim,
            None => self.launch(world)?,
        };

        sim.swap_observers(world.observers);
        let result = sim.run();
        sim.swap_observers(world.observers);
        *world.memories = sim.memories();

        match result {
            Ok(report) if report.halt == Halt::Idle => Ok(report),
            other => {
                self.active = Some(sim);
                other
            }
        }
    }

    fn reset(&mut self) {
        self.active = None;
    }
}

struct NetworkStage<N: NetworkAlgorithm> {
    algorithm: N,
}

impl<N: NetworkAlgorithm> Stage for NetworkStage<N> {
    fn name(&self) -> &str {
        self.algorithm.name()
    }

    fn advance(&mut self, world: &mut StageWorld<'_>) -> SimResult<RunReport> {
        let name = self.algorithm.name().to_owned();
        let nodes = world.network.node_count();
        world
            .observers
            .emit(ObservedKind::AlgorithmStarted, VirtualTime::ZERO, || {
                BTreeMap::from([
                    ("algorithm", json!(name)),
                    ("nodes", json!(nodes)),
                ])
            });

        let mut access = NetworkAccess {
            network: world.network,
            memories: world.memories.as_mut_slice(),
        };
        self.algorithm.run(&mut access)?;

        world
            .observers
            .emit(ObservedKind::AlgorithmFinished, VirtualTime::ZERO, || {
                BTreeMap::from([("algorithm", json!(name)), ("steps", json!(1))])
            });
        Ok(RunReport {
            steps: 1,
            time: VirtualTime::ZERO,
            halt: Halt::Idle,
        })
    }

    fn reset(&mut self) {}
}

// ── Pipeline ──────────────────────────────────────────────────────────

/// Outcome of one stage within a [`Pipeline::run`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    /// Position of the stage in the pipeline.
    pub stage: usize,
    pub algorithm: String,
    pub report: RunReport,
}

impl StageReport {
    pub fn is_finished(&self) -> bool {
        self.report.halt == Halt::Idle
    }
}

/// A sequence of algorithms sharing one network and one node arena.
///
/// The configured step and time budgets apply to each distributed stage
/// per [`run`](Self::run) call. A stage stopped by a budget is resumed by
/// the next call.
pub struct Pipeline {
    network: Network,
    behavior: NetworkBehaviorModel,
    config: SimulationConfig,
    stages: Vec<Box<dyn Stage>>,
    memories: Vec<Memory>,
    current: usize,
    observers: ObserverBus,
}

impl Pipeline {
    pub fn new(
        network: Network,
        behavior: NetworkBehaviorModel,
        config: SimulationConfig,
    ) -> SimResult<Self> {
        config.validate()?;
        behavior.validate(&network)?;
        let memories = vec![Memory::new(); network.node_count()];
        Ok(Pipeline {
            network,
            behavior,
            config,
            stages: Vec::new(),
            memories,
            current: 0,
            observers: ObserverBus::new(),
        })
    }

    /// Append a distributed algorithm.
    pub fn then<A: NodeAlgorithm + Clone>(mut self, algorithm: A) -> Self {
        self.stages.push(Box::new(NodeStage {
            algorithm,
            active: None,
        }));
        self
    }

    /// Append a centralized algorithm.
    pub fn then_network<N: NetworkAlgorithm>(mut self, algorithm: N) -> Self {
        self.stages.push(Box::new(NetworkStage { algorithm }));
        self
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Index of the stage the next call runs, `None` once all are done.
    pub fn current_stage(&self) -> Option<usize> {
        (self.current < self.stages.len()).then_some(self.current)
    }

    pub fn current_algorithm(&self) -> Option<&str> {
        self.stages.get(self.current).map(|stage| stage.name())
    }

    pub fn is_finished(&self) -> bool {
        self.current >= self.stages.len()
    }

    /// Node memory as of the end of the last call.
    pub fn memory(&self, id: NodeId) -> Option<&Memory> {
        self.memories.get(id.index())
    }

    pub fn memories(&self) -> &[Memory] {
        &self.memories
    }

    pub fn subscribe(
        &mut self,
        kinds: &[ObservedKind],
        observer: impl Observer + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe(kinds, observer)
    }

    pub fn subscribe_all(&mut self, observer: impl Observer + 'static) -> SubscriptionId {
        self.observers.subscribe_all(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Run stages from the current one until all are done or one stops
    /// on a budget.
    pub fn run(&mut self) -> SimResult<Vec<StageReport>> {
        if self.stages.is_empty() {
            return Err(SimError::InvalidConfig("pipeline has no algorithms".into()));
        }

        let mut reports = Vec::new();
        while let Some(stage) = self.stages.get_mut(self.current) {
            let mut world = StageWorld {
                network: &self.network,
                behavior: &self.behavior,
                config: &self.config,
                memories: &mut self.memories,
                observers: &mut self.observers,
            };
            let report = stage.advance(&mut world)?;
            let done = StageReport {
                stage: self.current,
                algorithm: stage.name().to_owned(),
                report,
            };
            debug!(stage = done.stage, algorithm = %done.algorithm, %report, "stage returned");

            let finished = done.is_finished();
            reports.push(done);
            if !finished {
                return Ok(reports);
            }
            self.current += 1;
        }

        info!(stages = self.stages.len(), "pipeline finished");
        Ok(reports)
    }

    /// Start over from the first stage with empty memory.
    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
        self.memories = vec![Memory::new(); self.network.node_count()];
        self.current = 0;
        debug!("pipeline reset");
    }
}
