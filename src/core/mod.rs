pub mod config;
pub mod error;
pub mod types;

pub use config::SimulationConfig;
pub use error::{Result, SimError};
pub use types::{AgentId, Cell, RoadId, SettlementId, StructureId, Tick, Vec2};
