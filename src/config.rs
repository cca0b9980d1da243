//! Run configuration.
//!
//! Everything that tunes a run lives in one [`SimulationConfig`] value
//! handed to `Simulation::new`. It is plain data, so it can be written in
//! code with the `with_*` builders or loaded from JSON.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Knobs for a single simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for every random decision taken during the run.
    pub seed: u64,

    /// Evaluate the algorithm's restrictions (pre-run and per-step).
    pub check_restrictions: bool,

    /// Stop after this many dispatched events.
    pub max_steps: Option<u64>,

    /// Do not dispatch events scheduled after this tick.
    pub max_time: Option<u64>,

    /// Shortest transit time of any message, in ticks.
    pub min_delay: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            seed: 0,
            check_restrictions: true,
            max_steps: None,
            max_time: None,
            min_delay: 1,
        }
    }
}

impl SimulationConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_restriction_checks(mut self, enabled: bool) -> Self {
        self.check_restrictions = enabled;
        self
    }

    pub fn with_max_steps(mut self, steps: u64) -> Self {
        self.max_steps = Some(steps);
        self
    }

    pub fn with_max_time(mut self, ticks: u64) -> Self {
        self.max_time = Some(ticks);
        self
    }

    pub fn with_min_delay(mut self, ticks: u64) -> Self {
        self.min_delay = ticks;
        self
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(text: &str) -> SimResult<Self> {
        let config: SimulationConfig =
            serde_json::from_str(text).map_err(|e| SimError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no run could honour.
    pub fn validate(&self) -> SimResult<()> {
        if self.max_steps == Some(0) {
            return Err(SimError::InvalidConfig(
                "max_steps must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
