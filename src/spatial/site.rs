//! Construction site search
//!
//! Two passes: an expanding-radius ring search accepting the first
//! candidate that satisfies every constraint, then a dense grid scan around
//! the origin that keeps the best-scoring candidate. Forest density is a
//! soft requirement in the fallback pass; water and mountain adjacency stay
//! hard requirements in both passes.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::SimulationConfig;
use crate::core::types::Vec2;
use crate::spatial::terrain::TerrainGrid;
use crate::spatial::tile::Tile;

/// Terrain a structure needs around its site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerrainRequirement {
    None,
    WaterAdjacent,
    MountainAdjacent,
    /// At least `min_count` forest cells within `radius` cells
    ForestDensity { min_count: usize, radius: i32 },
}

impl fmt::Display for TerrainRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerrainRequirement::None => write!(f, "buildable"),
            TerrainRequirement::WaterAdjacent => write!(f, "water-adjacent"),
            TerrainRequirement::MountainAdjacent => write!(f, "mountain-adjacent"),
            TerrainRequirement::ForestDensity { .. } => write!(f, "forested"),
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteError {
    #[error("no {requirement} site")]
    NoSite { requirement: TerrainRequirement },
}

/// Constraints for one site search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteQuery {
    pub origin: Vec2,
    pub min_radius: f32,
    pub max_radius: f32,
    pub requirement: TerrainRequirement,
    /// Clearance from every occupied position
    pub spacing: f32,
}

impl SiteQuery {
    pub fn new(origin: Vec2, requirement: TerrainRequirement, config: &SimulationConfig) -> Self {
        Self {
            origin,
            min_radius: config.site_min_radius,
            max_radius: config.site_max_radius,
            requirement,
            spacing: config.structure_spacing,
        }
    }
}

/// Searches a grid for legal sites, avoiding a set of occupied positions
///
/// `occupied` must include completed structures, settlements, in-progress
/// build targets and positions reserved by pending build tasks.
pub struct SiteLocator<'a> {
    grid: &'a TerrainGrid,
    occupied: &'a [Vec2],
    config: &'a SimulationConfig,
}

impl<'a> SiteLocator<'a> {
    pub fn new(grid: &'a TerrainGrid, occupied: &'a [Vec2], config: &'a SimulationConfig) -> Self {
        Self {
            grid,
            occupied,
            config,
        }
    }

    pub fn find_site(&self, query: &SiteQuery) -> Result<Vec2, SiteError> {
        if let Some(site) = self.ring_search(query) {
            return Ok(site);
        }
        tracing::debug!(
            "Ring search exhausted for {} site near ({:.0}, {:.0}), scanning",
            query.requirement,
            query.origin.x,
            query.origin.y
        );
        self.fallback_scan(query).ok_or(SiteError::NoSite {
            requirement: query.requirement,
        })
    }

    /// No occupied position within `spacing`
    pub fn is_clear(&self, pos: Vec2, spacing: f32) -> bool {
        let limit = spacing * spacing;
        self.occupied.iter().all(|o| o.distance_squared(&pos) >= limit)
    }

    /// Strict check of the terrain requirement
    pub fn meets_requirement(&self, pos: Vec2, requirement: TerrainRequirement) -> bool {
        match requirement {
            TerrainRequirement::None => true,
            TerrainRequirement::WaterAdjacent => self.grid.is_adjacent(pos, Tile::Water),
            TerrainRequirement::MountainAdjacent => self.grid.is_adjacent(pos, Tile::Mountain),
            TerrainRequirement::ForestDensity { min_count, radius } => {
                self.forest_count(pos, radius) >= min_count
            }
        }
    }

    fn forest_count(&self, pos: Vec2, radius: i32) -> usize {
        self.grid
            .count_within(self.grid.world_to_cell(pos), radius, Tile::Forest)
    }

    fn is_candidate(&self, pos: Vec2, query: &SiteQuery) -> bool {
        self.grid.is_buildable(pos) && self.is_clear(pos, query.spacing)
    }

    fn ring_search(&self, query: &SiteQuery) -> Option<Vec2> {
        let steps = (360.0 / self.config.site_angle_step_deg).floor().max(1.0) as usize;
        let mut radius = query.min_radius;
        while radius <= query.max_radius {
            for i in 0..steps {
                let angle = (i as f32 * self.config.site_angle_step_deg).to_radians();
                let pos = self.grid.snap(query.origin.offset_polar(radius, angle));
                if self.is_candidate(pos, query) && self.meets_requirement(pos, query.requirement) {
                    return Some(pos);
                }
            }
            radius += self.config.site_radius_step;
        }
        None
    }

    fn fallback_scan(&self, query: &SiteQuery) -> Option<Vec2> {
        let window = self.config.fallback_window;
        let min = self.grid.world_to_cell(Vec2::new(
            query.origin.x - window,
            query.origin.y - window,
        ));
        let max = self.grid.world_to_cell(Vec2::new(
            query.origin.x + window,
            query.origin.y + window,
        ));

        // (score, distance², position); higher score wins, then nearer
        let mut best: Option<(usize, f32, Vec2)> = None;
        for row in min.row.max(0)..=max.row.min(self.grid.rows() - 1) {
            for col in min.col.max(0)..=max.col.min(self.grid.cols() - 1) {
                let pos = self.grid.cell_to_world(crate::core::types::Cell::new(col, row));
                if !self.is_candidate(pos, query) {
                    continue;
                }
                let score = match query.requirement {
                    TerrainRequirement::None => 0,
                    TerrainRequirement::WaterAdjacent | TerrainRequirement::MountainAdjacent => {
                        if !self.meets_requirement(pos, query.requirement) {
                            continue;
                        }
                        0
                    }
                    TerrainRequirement::ForestDensity { radius, .. } => {
                        self.forest_count(pos, radius)
                    }
                };
                let dist = pos.distance_squared(&query.origin);
                let better = match best {
                    None => true,
                    Some((best_score, best_dist, _)) => {
                        score > best_score || (score == best_score && dist < best_dist)
                    }
                };
                if better {
                    best = Some((score, dist, pos));
                }
            }
        }
        best.map(|(_, _, pos)| pos)
    }
}
