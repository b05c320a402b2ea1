pub mod adapters;
pub mod config;
pub mod error;
pub mod example;
pub mod model;
pub mod orchestrator;
pub mod registry;
pub mod run;
pub mod schema;
pub mod store;
pub mod strategies;
pub mod validate;

pub use error::{CoordinatorError, ResolutionError};
pub use orchestrator::{Coordinator, ExecutionReport, PauseSignal, RunState};
pub use registry::AdapterRegistry;
