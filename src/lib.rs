pub mod agent;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod land;
pub mod market;
pub mod metrics;
pub mod rng;
pub mod scenario;
pub mod scheduler;
pub mod snapshot;
pub mod synthetic;
pub mod world;

pub use config::{ConfigLoader, ModelConfig};
pub use engine::{Model, ModelBuilder, ModelSettings};
pub use error::ModelError;
pub use scenario::ScenarioKind;
