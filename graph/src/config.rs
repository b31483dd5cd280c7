//! Configuration for the expression graph.

use serde::{Deserialize, Serialize};

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fraction of dead triggers in a listener list that triggers a sweep.
    pub dead_trigger_ratio: f64,
    /// Let equalities write values straight into the variables they define.
    pub defined_var_forwarding: bool,
    /// Mark subtrees without variables as constant during optimisation.
    pub constant_folding: bool,
    /// Merge nested literal conjunctions during optimisation.
    pub flatten_conjunctions: bool,
    /// Run the sanity pass after every mutation and panic on failure.
    pub sanity_check_after_moves: bool,
    /// Largest number of subsets a power set may enumerate before it is
    /// left undefined.
    pub power_set_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dead_trigger_ratio: 0.2,
            defined_var_forwarding: true,
            constant_folding: true,
            flatten_conjunctions: true,
            sanity_check_after_moves: false,
            power_set_limit: 4096,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dead_trigger_ratio(mut self, ratio: f64) -> Self {
        self.dead_trigger_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    pub fn with_defined_var_forwarding(mut self, enabled: bool) -> Self {
        self.defined_var_forwarding = enabled;
        self
    }

    pub fn with_constant_folding(mut self, enabled: bool) -> Self {
        self.constant_folding = enabled;
        self
    }

    pub fn with_flatten_conjunctions(mut self, enabled: bool) -> Self {
        self.flatten_conjunctions = enabled;
        self
    }

    pub fn with_sanity_check_after_moves(mut self, enabled: bool) -> Self {
        self.sanity_check_after_moves = enabled;
        self
    }

    pub fn with_power_set_limit(mut self, limit: usize) -> Self {
        self.power_set_limit = limit;
        self
    }

    /// No optimisation passes, sanity checks after every move.
    pub fn minimal() -> Self {
        Self {
            dead_trigger_ratio: 0.2,
            defined_var_forwarding: false,
            constant_folding: false,
            flatten_conjunctions: false,
            sanity_check_after_moves: true,
            power_set_limit: 4096,
        }
    }
}
