//! Scenario error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Building or starting the model failed.
    #[error("scenario '{scenario}' failed to build: {message}")]
    Build { scenario: String, message: String },

    /// A step refers to a node that setup never named.
    #[error("unknown node '{name}' in step '{step}'")]
    UnknownNode { step: String, name: String },

    /// A step's move could not be resolved or applied.
    #[error("step '{step}' failed: {message}")]
    StepExecution { step: String, message: String },

    #[error("assertion failed at step '{step}': {message}")]
    AssertionFailed { step: String, message: String },
}

impl ScenarioError {
    pub fn build(scenario: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Build {
            scenario: scenario.into(),
            message: message.into(),
        }
    }

    pub fn unknown_node(step: impl Into<String>, name: impl Into<String>) -> Self {
        Self::UnknownNode {
            step: step.into(),
            name: name.into(),
        }
    }

    pub fn step_execution(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StepExecution {
            step: step.into(),
            message: message.into(),
        }
    }

    pub fn assertion_failed(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            step: step.into(),
            message: message.into(),
        }
    }
}

pub type ScenarioResult<T> = Result<T, ScenarioError>;
