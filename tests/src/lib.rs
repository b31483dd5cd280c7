//! Tarn Test Harness
//!
//! Scenarios describe a model, then a list of named steps. Each step applies
//! one move and checks the propagated state:
//! - `Scenario`: setup closure plus steps, built fluently
//! - `Assertion`: expected violation, objective, values and errors
//! - `Runner`: starts the model, applies steps and sanity-checks after each

mod assertion;
mod error;
mod runner;
mod scenario;

pub use assertion::{Assertion, AssertionBuilder};
pub use error::{ScenarioError, ScenarioResult};
pub use runner::Runner;
pub use scenario::{Bindings, Scenario, Step, StepAction};

/// Install a `RUST_LOG`-filtered subscriber writing to the test output.
///
/// Safe to call from every test; only the first call installs it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub mod prelude {
    pub use crate::{init_tracing, Assertion, AssertionBuilder, Bindings, Runner, Scenario};
    pub use crate::{ScenarioError, ScenarioResult};
    pub use tarn_core::{AnyDomain, IntDomain, Kind, Literal, NodeId, SizeAttr};
    pub use tarn_graph::{EngineConfig, Graph};
    pub use tarn_model::{Model, Move, OptimiseMode};
}
