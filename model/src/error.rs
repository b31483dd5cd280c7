//! Model error types.

use tarn_core::EngineError;
use tarn_graph::SanityError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("sanity check failed: {0}")]
    Sanity(#[from] SanityError),

    /// Search-facing operation before `start`.
    #[error("model has not been started")]
    NotStarted,

    /// Building operation after `start`.
    #[error("model is already started; {operation} is only allowed while building")]
    AlreadyStarted { operation: &'static str },
}

impl ModelError {
    pub fn already_started(operation: &'static str) -> Self {
        Self::AlreadyStarted { operation }
    }
}

pub type ModelResult<T> = Result<T, ModelError>;
