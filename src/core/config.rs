//! Simulation configuration with documented constants
//!
//! All tunable numbers are collected here. Every field has a default, so a
//! TOML file only needs to name the values it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};

/// Configuration for the simulation systems
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === TERRAIN ===
    /// Size of each terrain cell (world units)
    pub cell_size: f32,

    /// Inward buffer from the world edge
    ///
    /// Positions closer to the edge than this are out of bounds for
    /// building and for wander goals.
    pub edge_buffer: f32,

    /// Wood yielded by harvesting one forest cell
    pub wood_per_harvest: u32,

    /// Random cells sampled per step for forest regrowth
    pub regrowth_samples: usize,

    /// Chance that a sampled grass cell next to forest becomes forest
    pub regrowth_chance: f32,

    // === PATHFINDING ===
    /// Cost multiplier for entering a forest cell
    pub forest_cost: f32,

    /// Cost multiplier for entering a road cell
    pub road_cost: f32,

    /// Road multiplier when the caller prefers constructed routes
    pub preferred_road_cost: f32,

    /// Search radius (cells) for replacing an impassable endpoint
    pub endpoint_search_radius: i32,

    /// Maximum node expansions per A* search
    pub max_path_nodes: usize,

    // === SITE SEARCH ===
    pub site_min_radius: f32,
    pub site_max_radius: f32,
    pub site_radius_step: f32,
    pub site_angle_step_deg: f32,

    /// Minimum distance between a new site and any existing or pending one
    pub structure_spacing: f32,

    /// Half-width of the dense fallback scan window (world units)
    pub fallback_window: f32,

    /// Radius (cells) in which forest is counted for lumber sites
    pub forest_check_radius: i32,

    /// Forest cells required within `forest_check_radius` for a lumber site
    pub min_forest_count: usize,

    // === SETTLEMENTS ===
    /// Housing capacity of a settlement with no houses
    pub base_capacity: u32,

    /// Capacity added per completed house
    pub house_capacity: u32,

    /// Stock below which a resource counts as a shortage
    pub resource_need_threshold: u32,

    /// Seconds between spawns from a house while below capacity
    pub spawn_interval: f32,

    /// Workers per builder the spawner aims for
    pub workers_per_builder: u32,

    /// Priority assigned to player-planned road needs
    pub planned_road_priority: f32,

    /// Scale applied to population-over-distance for settlement road needs
    pub settlement_road_weight: f32,

    // === ROADS ===
    /// World units of road laid per second of builder time
    pub road_build_speed: f32,

    /// Wood consumed per world unit of road
    pub road_wood_per_unit: f32,

    /// Wood gained when a road clears a forest cell
    pub road_forest_bonus: u32,

    /// Time multiplier for laying road through forest
    pub road_forest_time_factor: f32,

    /// Distance within which a road endpoint connects to an entity
    pub connection_radius: f32,

    /// Targets closer than this never generate a road need
    pub min_road_length: f32,

    // === AGENTS ===
    /// Base movement speed (world units per second)
    pub agent_speed: f32,

    /// Trader movement speed (world units per second)
    pub trader_speed: f32,

    /// Speed multiplier while standing on a road cell
    pub road_speed_factor: f32,

    /// Base amount a worker carries per trip
    pub carry_capacity: u32,

    /// Carry multiplier when the workplace is road-connected
    pub road_carry_multiplier: f32,

    /// Distance from a wander goal's origin (world units)
    pub wander_radius: f32,

    /// Seconds an idle agent waits before wandering
    pub wander_cooldown: f32,

    // === TRADE ===
    /// Gold per world unit of a completed round trip (before multiplier)
    pub trade_reward_per_unit: f32,

    /// Multiplier increase per completed journey
    pub trade_multiplier_step: f32,

    /// Ceiling for the trade multiplier
    pub trade_multiplier_cap: f32,

    /// Score bonus for a road-connected foreign market
    pub trade_road_bonus: f32,

    /// Seconds spent at a market on each stop
    pub trade_dwell: f32,

    /// Path attempts per trader per step when choosing a market
    pub max_market_attempts: usize,

    /// Seconds a parked trader waits before searching again
    pub market_retry_seconds: f32,

    // === MESSAGES ===
    /// Number of transient messages retained
    pub message_capacity: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            cell_size: 20.0,
            edge_buffer: 40.0,
            wood_per_harvest: 10,
            regrowth_samples: 32,
            regrowth_chance: 0.05,

            forest_cost: 1.5,
            road_cost: 0.7,
            preferred_road_cost: 0.3,
            endpoint_search_radius: 8,
            max_path_nodes: 200_000,

            site_min_radius: 40.0,
            site_max_radius: 400.0,
            site_radius_step: 20.0,
            site_angle_step_deg: 30.0,
            structure_spacing: 40.0,
            fallback_window: 400.0,
            forest_check_radius: 3,
            min_forest_count: 4,

            base_capacity: 5,
            house_capacity: 4,
            resource_need_threshold: 50,
            spawn_interval: 20.0,
            workers_per_builder: 3,
            planned_road_priority: 10.0,
            settlement_road_weight: 100.0,

            road_build_speed: 40.0,
            road_wood_per_unit: 0.05,
            road_forest_bonus: 5,
            road_forest_time_factor: 2.0,
            connection_radius: 40.0,
            min_road_length: 60.0,

            agent_speed: 60.0,
            trader_speed: 80.0,
            road_speed_factor: 1.5,
            carry_capacity: 10,
            road_carry_multiplier: 1.5,
            wander_radius: 80.0,
            wander_cooldown: 4.0,

            trade_reward_per_unit: 0.02,
            trade_multiplier_step: 0.05,
            trade_multiplier_cap: 2.0,
            trade_road_bonus: 0.25,
            trade_dwell: 2.0,
            max_market_attempts: 3,
            market_retry_seconds: 5.0,

            message_capacity: 64,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a config from a TOML file
    pub fn load_from_toml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse and validate a config from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Wood consumed for laying one full cell of road
    pub fn road_wood_per_cell(&self) -> u32 {
        (self.cell_size * self.road_wood_per_unit).round() as u32
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.cell_size <= 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "cell_size must be positive, got {}",
                self.cell_size
            )));
        }

        if self.site_min_radius > self.site_max_radius {
            return Err(SimError::InvalidConfig(format!(
                "site_min_radius ({}) exceeds site_max_radius ({})",
                self.site_min_radius, self.site_max_radius
            )));
        }

        if self.site_radius_step <= 0.0 || self.site_angle_step_deg <= 0.0 {
            return Err(SimError::InvalidConfig(
                "site search steps must be positive".into(),
            ));
        }

        if self.road_build_speed <= 0.0 || self.agent_speed <= 0.0 || self.trader_speed <= 0.0 {
            return Err(SimError::InvalidConfig("speeds must be positive".into()));
        }

        if !(0.0..=1.0).contains(&self.regrowth_chance) {
            return Err(SimError::InvalidConfig(format!(
                "regrowth_chance ({}) must be within [0, 1]",
                self.regrowth_chance
            )));
        }

        if self.trade_multiplier_cap < 1.0 {
            return Err(SimError::InvalidConfig(format!(
                "trade_multiplier_cap ({}) must be at least 1.0",
                self.trade_multiplier_cap
            )));
        }

        Ok(())
    }
}
