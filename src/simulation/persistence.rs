//! Save and load of the full simulation state as JSON
//!
//! The snapshot carries the tile grid, every arena with its handles, the
//! overlay and the generator state, so a loaded world continues exactly where
//! the saved one stopped.

use std::fs;
use std::path::Path;

use crate::core::error::Result;
use crate::simulation::state::SimulationState;

pub fn save_json(state: &SimulationState) -> Result<String> {
    Ok(serde_json::to_string(state)?)
}

pub fn load_json(json: &str) -> Result<SimulationState> {
    let state: SimulationState = serde_json::from_str(json)?;
    state.config.validate()?;
    Ok(state)
}

pub fn save_to_file(state: &SimulationState, path: &Path) -> Result<()> {
    let json = save_json(state)?;
    fs::write(path, json)?;
    tracing::info!("Saved simulation at tick {} to {}", state.tick, path.display());
    Ok(())
}

pub fn load_from_file(path: &Path) -> Result<SimulationState> {
    let json = fs::read_to_string(path)?;
    let state = load_json(&json)?;
    tracing::info!("Loaded simulation at tick {} from {}", state.tick, path.display());
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::error::SimError;
    use crate::core::types::Vec2;
    use crate::spatial::terrain::TerrainGrid;
    use crate::spatial::tile::Tile;

    #[test]
    fn test_json_round_trip_keeps_handles() {
        let config = SimulationConfig::default();
        let grid = TerrainGrid::new(20, 20, config.cell_size, config.edge_buffer, Tile::Grass);
        let mut state = SimulationState::new(config, grid, 8);
        let id = state.add_settlement("Ashford", Vec2::new(200.0, 200.0));

        let json = save_json(&state).unwrap();
        let loaded = load_json(&json).unwrap();
        assert_eq!(loaded.settlements[id].name, "Ashford");
        assert_eq!(
            loaded.grid.tile_at_world(loaded.settlements[id].position),
            Some(Tile::Settlement)
        );
    }

    #[test]
    fn test_garbage_is_a_serde_error() {
        assert!(matches!(load_json("{not json"), Err(SimError::SerdeError(_))));
    }
}
