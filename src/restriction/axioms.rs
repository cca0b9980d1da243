//! Axioms of the computing model.
//!
//! Both hold by construction: the engine never delays a message forever,
//! and nodes tell neighbors apart through their labels. They exist so an
//! algorithm can state its assumptions in full.

use super::{NetworkView, Restriction, Verdict};
use crate::algorithm::Status;

/// In the absence of failures, every message arrives after a finite delay.
#[derive(Debug, Clone, Copy, Default)]
pub struct FiniteCommunicationDelays;

impl<S: Status> Restriction<S> for FiniteCommunicationDelays {
    fn name(&self) -> &str {
        "FiniteCommunicationDelays"
    }

    fn check(&self, _: &NetworkView<'_, S>) -> Verdict {
        Verdict::Satisfied
    }
}

/// A node can distinguish among its in- and out-neighbors.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalOrientation;

impl<S: Status> Restriction<S> for LocalOrientation {
    fn name(&self) -> &str {
        "LocalOrientation"
    }

    fn check(&self, _: &NetworkView<'_, S>) -> Verdict {
        Verdict::Satisfied
    }
}
