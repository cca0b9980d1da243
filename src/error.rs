//! Structured error types for the simulation engine.
//!
//! All fallible public APIs return `Result<T, SimError>`. Configuration
//! errors are raised before a run starts; restriction violations abort a
//! run in progress. Unimplemented actions, alarm misuse and dropped
//! messages are not errors at all: they are logged and published on the
//! observer bus.

use thiserror::Error;

use crate::node::NodeId;
use crate::restriction::Checkpoint;

/// The top-level error type for the simulation engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    // ── Configuration errors ──────────────────────────────

    /// The algorithm's status table is malformed.
    #[error("invalid status table: {0}")]
    InvalidStatusTable(String),

    /// A restriction cannot be evaluated against this setup.
    #[error("restriction `{restriction}` cannot be evaluated: {reason}")]
    UnresolvableRestriction { restriction: String, reason: String },

    /// The network behavior model holds an out-of-range parameter.
    #[error("invalid behavior model: {0}")]
    InvalidBehaviorModel(String),

    /// The simulation configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The topology handed to the engine is malformed.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    // ── Run aborts ────────────────────────────────────────

    /// A restriction did not hold at one of its checkpoints.
    #[error("restriction `{restriction}` violated at {checkpoint}: {reason}")]
    RestrictionViolated {
        restriction: String,
        checkpoint: Checkpoint,
        reason: String,
    },

    /// The run was aborted earlier and cannot continue.
    #[error("simulation halted: {0}")]
    Halted(String),

    /// Node statuses do not match the algorithm's declared S_init / S_term.
    #[error("algorithm check failed: {0}")]
    AlgorithmCheck(String),

    // ── Caller errors ─────────────────────────────────────

    /// A node ID was referenced but is not part of the network.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    /// A message was addressed along an edge that does not exist.
    #[error("{from} has no link to {to}")]
    NotANeighbor { from: NodeId, to: NodeId },

    /// Simulated time would overflow.
    #[error("simulated time overflow")]
    TimeOverflow,
}

impl SimError {
    /// `true` for errors that are detected before any action runs.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SimError::InvalidStatusTable(_)
                | SimError::UnresolvableRestriction { .. }
                | SimError::InvalidBehaviorModel(_)
                | SimError::InvalidConfig(_)
                | SimError::InvalidTopology(_)
        )
    }
}

/// Convenience alias used throughout the crate.
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_node_not_found() {
        let e = SimError::NodeNotFound(NodeId::new(42));
        assert_eq!(format!("{}", e), "node N42 not found");
    }

    #[test]
    fn test_display_restriction_violated() {
        let e = SimError::RestrictionViolated {
            restriction: "BidirectionalLinks".into(),
            checkpoint: Checkpoint::PreRun,
            reason: "edge N1 -> N2 has no reverse".into(),
        };
        assert_eq!(
            e.to_string(),
            "restriction `BidirectionalLinks` violated at pre-run: edge N1 -> N2 has no reverse"
        );
        assert!(!e.is_configuration());
    }

    #[test]
    fn test_configuration_classification() {
        assert!(SimError::InvalidStatusTable("empty".into()).is_configuration());
        assert!(SimError::InvalidConfig("x".into()).is_configuration());
        assert!(!SimError::TimeOverflow.is_configuration());
        assert!(!SimError::NotANeighbor {
            from: NodeId::new(0),
            to: NodeId::new(1)
        }
        .is_configuration());
    }

    #[test]
    fn test_result_alias() {
        fn fallible() -> SimResult<u32> {
            Err(SimError::TimeOverflow)
        }
        assert!(fallible().is_err());
    }
}
