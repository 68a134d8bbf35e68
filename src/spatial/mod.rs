//! Spatial layer - terrain grid, pathfinding, site search

pub mod overlay;
pub mod pathfinding;
pub mod site;
pub mod terrain;
pub mod tile;

pub use overlay::PlannedRoadOverlay;
pub use pathfinding::{PathCosts, PathError, PathOptions, PathPlanner};
pub use site::{SiteError, SiteLocator, SiteQuery, TerrainRequirement};
pub use terrain::TerrainGrid;
pub use tile::Tile;
