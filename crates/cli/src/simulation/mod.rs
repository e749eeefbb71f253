//! Two-node simulation module.

mod orchestrator;
mod stats;

pub use orchestrator::{Simulation, SimulationConfig, REMOTE_NODE};
pub use stats::SimulationStats;
