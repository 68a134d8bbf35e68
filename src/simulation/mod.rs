pub mod messages;
pub mod needs;
pub mod persistence;
pub mod query;
pub mod state;
pub mod structures;
pub mod tick;

pub use messages::{Message, MessageLog};
pub use needs::{generate_build_task, housing_urgency, refresh_settlement, road_needs};
pub use persistence::{load_from_file, load_json, save_json, save_to_file};
pub use query::{agent_views, road_views, settlement_view, settlement_views, structure_views};
pub use state::{BuildTask, SimulationState};
pub use tick::{run_simulation, run_simulation_tick, SimulationEvent};
