//! Tarn Model
//!
//! The surface a local-search loop works against:
//! - Declaring decision variables, constraints and an objective
//! - Starting incremental mode once the model is built
//! - Applying moves, or trying them and reverting on rejection
//! - Attributing violations to variables and picking one to change

mod error;
mod model;
mod moves;

pub use error::{ModelError, ModelResult};
pub use model::{Model, Objective, OptimiseMode};
pub use moves::Move;
