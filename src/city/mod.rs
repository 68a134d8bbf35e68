//! City layer - settlements, structures, roads and their economy

pub mod build_queue;
pub mod construction;
pub mod network;
pub mod road;
pub mod settlement;
pub mod stockpile;
pub mod structure;

pub use build_queue::BuildQueue;
pub use construction::{apply_build_work, plan_road_work, ContributionResult, RoadWorkPlan};
pub use network::is_connected;
pub use road::Road;
pub use settlement::{HousingUrgency, PlannedRoad, RoadNeed, RoadTarget, Settlement, SettlementNeeds};
pub use stockpile::{Materials, ResourceType, Stockpile};
pub use structure::{Structure, StructureKind, StructureState};
