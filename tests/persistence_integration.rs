//! Integration tests for saving, loading and configuration files

use std::fs;

use homestead::agent::AgentRole;
use homestead::city::stockpile::ResourceType;
use homestead::core::config::SimulationConfig;
use homestead::core::error::SimError;
use homestead::core::types::Vec2;
use homestead::simulation::{
    agent_views, load_from_file, run_simulation, save_to_file, settlement_views, SimulationState,
};
use homestead::spatial::terrain::TerrainGrid;
use homestead::spatial::tile::Tile;

fn running_world() -> SimulationState {
    let config = SimulationConfig::default();
    let mut grid = TerrainGrid::new(40, 40, config.cell_size, config.edge_buffer, Tile::Grass);
    for col in 25..30 {
        for row in 10..20 {
            grid.set_tile(homestead::core::types::Cell::new(col, row), Tile::Forest);
        }
    }
    let mut state = SimulationState::new(config, grid, 99);
    let id = state.add_settlement("Ashford", Vec2::new(300.0, 300.0));
    state.settlements[id].stockpile.add(ResourceType::Wood, 200);
    state.settlements[id].stockpile.add(ResourceType::Stone, 80);
    let pos = state.settlements[id].position;
    state.spawn_agent(id, AgentRole::builder(), pos);
    state.spawn_agent(id, AgentRole::worker(), pos);
    state.spawn_agent(id, AgentRole::worker(), pos);
    state
}

#[test]
fn test_saved_world_continues_identically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.json");

    let mut original = running_world();
    run_simulation(&mut original, 200, 0.1);
    save_to_file(&original, &path).unwrap();
    let mut loaded = load_from_file(&path).unwrap();

    assert_eq!(loaded.tick, original.tick);
    assert_eq!(loaded.grid, original.grid);

    run_simulation(&mut original, 300, 0.1);
    run_simulation(&mut loaded, 300, 0.1);

    assert_eq!(settlement_views(&loaded), settlement_views(&original));
    assert_eq!(agent_views(&loaded), agent_views(&original));
    assert_eq!(loaded.grid, original.grid);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_from_file(&dir.path().join("absent.json"));
    assert!(matches!(result, Err(SimError::IoError(_))));
}

#[test]
fn test_invalid_config_in_save_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    let mut state = running_world();
    state.config.cell_size = -1.0;
    save_to_file(&state, &path).unwrap();
    assert!(matches!(load_from_file(&path), Err(SimError::InvalidConfig(_))));
}

#[test]
fn test_partial_toml_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("homestead.toml");
    fs::write(
        &path,
        "agent_speed = 90.0\nroad_forest_bonus = 8\nmax_market_attempts = 5\n",
    )
    .unwrap();

    let config = SimulationConfig::load_from_toml(&path).unwrap();
    assert_eq!(config.agent_speed, 90.0);
    assert_eq!(config.road_forest_bonus, 8);
    assert_eq!(config.max_market_attempts, 5);
    assert_eq!(config.cell_size, SimulationConfig::default().cell_size);
}

#[test]
fn test_inconsistent_toml_is_rejected() {
    let result = SimulationConfig::parse_toml("site_min_radius = 500.0\nsite_max_radius = 100.0\n");
    assert!(matches!(result, Err(SimError::InvalidConfig(_))));

    let result = SimulationConfig::parse_toml("cell_size = \"wide\"\n");
    assert!(matches!(result, Err(SimError::TomlError(_))));
}
