//! Terrain grid - dense 2D tile storage with world/cell conversion
//!
//! World positions map to cells by floor division with the cell size.
//! Cell-to-world conversion returns the cell center so paths built from
//! cells never jitter inside a cell.

use ahash::AHashSet;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};
use crate::core::types::{Cell, Vec2};
use crate::spatial::tile::Tile;

/// The world's tile grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainGrid {
    cols: i32,
    rows: i32,
    cell_size: f32,
    edge_buffer: f32,
    tiles: Vec<Tile>,
}

impl TerrainGrid {
    /// Create a grid filled with a single tile type
    pub fn new(cols: i32, rows: i32, cell_size: f32, edge_buffer: f32, fill: Tile) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        Self {
            cols,
            rows,
            cell_size,
            edge_buffer,
            tiles: vec![fill; (cols * rows) as usize],
        }
    }

    /// Wrap a finished tile array (row-major) handed over by world generation
    pub fn from_tiles(
        cols: i32,
        rows: i32,
        cell_size: f32,
        edge_buffer: f32,
        tiles: Vec<Tile>,
    ) -> Result<Self> {
        if cols <= 0 || rows <= 0 || tiles.len() != (cols * rows) as usize {
            return Err(SimError::InvalidConfig(format!(
                "tile array of length {} does not match {}x{} grid",
                tiles.len(),
                cols,
                rows
            )));
        }
        Ok(Self {
            cols,
            rows,
            cell_size,
            edge_buffer,
            tiles,
        })
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn world_width(&self) -> f32 {
        self.cols as f32 * self.cell_size
    }

    pub fn world_height(&self) -> f32 {
        self.rows as f32 * self.cell_size
    }

    #[inline]
    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.col >= 0 && cell.row >= 0 && cell.col < self.cols && cell.row < self.rows
    }

    #[inline]
    fn index(&self, cell: Cell) -> Option<usize> {
        if self.in_bounds(cell) {
            Some((cell.row * self.cols + cell.col) as usize)
        } else {
            None
        }
    }

    #[inline]
    pub fn tile_at(&self, cell: Cell) -> Option<Tile> {
        self.index(cell).map(|i| self.tiles[i])
    }

    /// Tile under a world position
    pub fn tile_at_world(&self, pos: Vec2) -> Option<Tile> {
        self.tile_at(self.world_to_cell(pos))
    }

    /// Overwrite a cell; returns false when the cell is out of bounds
    pub fn set_tile(&mut self, cell: Cell, tile: Tile) -> bool {
        match self.index(cell) {
            Some(i) => {
                self.tiles[i] = tile;
                true
            }
            None => false,
        }
    }

    /// Convert world position to cell coordinates (unclamped)
    #[inline]
    pub fn world_to_cell(&self, pos: Vec2) -> Cell {
        Cell::new(
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    /// Cell center in world coordinates
    #[inline]
    pub fn cell_to_world(&self, cell: Cell) -> Vec2 {
        Vec2::new(
            (cell.col as f32 + 0.5) * self.cell_size,
            (cell.row as f32 + 0.5) * self.cell_size,
        )
    }

    /// Snap a world position to the center of its cell
    pub fn snap(&self, pos: Vec2) -> Vec2 {
        self.cell_to_world(self.world_to_cell(pos))
    }

    /// Inside the world with the edge buffer applied
    pub fn is_within_buffer(&self, pos: Vec2) -> bool {
        pos.x >= self.edge_buffer
            && pos.y >= self.edge_buffer
            && pos.x <= self.world_width() - self.edge_buffer
            && pos.y <= self.world_height() - self.edge_buffer
    }

    /// Clamp a world position inside the buffered bounds
    pub fn clamp_to_buffer(&self, pos: Vec2) -> Vec2 {
        let max_x = (self.world_width() - self.edge_buffer).max(self.edge_buffer);
        let max_y = (self.world_height() - self.edge_buffer).max(self.edge_buffer);
        Vec2::new(
            pos.x.clamp(self.edge_buffer, max_x),
            pos.y.clamp(self.edge_buffer, max_y),
        )
    }

    pub fn is_passable(&self, cell: Cell) -> bool {
        self.tile_at(cell).is_some_and(|t| t.is_passable())
    }

    /// In buffered bounds and not water or mountain
    pub fn is_buildable(&self, pos: Vec2) -> bool {
        self.is_within_buffer(pos)
            && self
                .tile_at_world(pos)
                .is_some_and(|t| t.is_buildable())
    }

    /// Whether any of the 8 cells around `pos` (center excluded) is `tile`
    pub fn is_adjacent(&self, pos: Vec2, tile: Tile) -> bool {
        let center = self.world_to_cell(pos);
        center
            .neighbors()
            .iter()
            .any(|n| self.tile_at(*n) == Some(tile))
    }

    /// Count cells of `tile` within a square of `radius` cells around `center`
    pub fn count_within(&self, center: Cell, radius: i32, tile: Tile) -> usize {
        let mut count = 0;
        for row in (center.row - radius)..=(center.row + radius) {
            for col in (center.col - radius)..=(center.col + radius) {
                if self.tile_at(Cell::new(col, row)) == Some(tile) {
                    count += 1;
                }
            }
        }
        count
    }

    /// Nearest cell of `tile` within `radius` cells, ring by ring
    pub fn nearest_tile(&self, center: Cell, radius: i32, tile: Tile) -> Option<Cell> {
        if self.tile_at(center) == Some(tile) {
            return Some(center);
        }
        for r in 1..=radius {
            let found = ring(center, r)
                .filter(|c| self.tile_at(*c) == Some(tile))
                .min_by_key(|c| {
                    let dc = c.col - center.col;
                    let dr = c.row - center.row;
                    dc * dc + dr * dr
                });
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// Convert one forest cell to grass, returning the wood yielded
    pub fn harvest_forest(&mut self, cell: Cell, yield_amount: u32) -> Option<u32> {
        if self.tile_at(cell) != Some(Tile::Forest) {
            return None;
        }
        self.set_tile(cell, Tile::Grass);
        Some(yield_amount)
    }

    /// Stochastic forest regrowth over a bounded random sample of cells
    ///
    /// Sampled grass cells next to forest turn back into forest with
    /// probability `chance`. Cells in `protected` (planned roads) never regrow.
    /// Returns the number of cells converted.
    pub fn regrow<R: Rng>(
        &mut self,
        rng: &mut R,
        samples: usize,
        chance: f32,
        protected: &AHashSet<Cell>,
    ) -> usize {
        let mut grown = 0;
        for _ in 0..samples {
            let cell = Cell::new(rng.gen_range(0..self.cols), rng.gen_range(0..self.rows));
            if self.tile_at(cell) != Some(Tile::Grass) || protected.contains(&cell) {
                continue;
            }
            let near_forest = cell
                .neighbors()
                .iter()
                .any(|n| self.tile_at(*n) == Some(Tile::Forest));
            if near_forest && rng.gen::<f32>() < chance {
                self.set_tile(cell, Tile::Forest);
                grown += 1;
            }
        }
        grown
    }

    /// Count of each tile category, for summaries
    pub fn tile_counts(&self) -> Vec<(Tile, usize)> {
        let kinds = [
            Tile::Mountain,
            Tile::Forest,
            Tile::Grass,
            Tile::Road,
            Tile::Water,
            Tile::Settlement,
        ];
        kinds
            .iter()
            .map(|k| (*k, self.tiles.iter().filter(|t| *t == k).count()))
            .collect()
    }
}

/// Cells at exactly Chebyshev distance `r` from `center`
pub fn ring(center: Cell, r: i32) -> impl Iterator<Item = Cell> {
    (-r..=r).flat_map(move |dr| {
        (-r..=r).filter_map(move |dc| {
            if dc.abs() == r || dr.abs() == r {
                Some(Cell::new(center.col + dc, center.row + dr))
            } else {
                None
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn grid() -> TerrainGrid {
        TerrainGrid::new(20, 20, 10.0, 20.0, Tile::Grass)
    }

    #[test]
    fn test_world_cell_conversion() {
        let g = grid();
        assert_eq!(g.world_to_cell(Vec2::new(15.0, 25.0)), Cell::new(1, 2));
        assert_eq!(g.cell_to_world(Cell::new(1, 2)), Vec2::new(15.0, 25.0));
        assert_eq!(g.world_to_cell(Vec2::new(-1.0, 0.0)), Cell::new(-1, 0));
    }

    #[test]
    fn test_tile_at_out_of_bounds() {
        let g = grid();
        assert_eq!(g.tile_at(Cell::new(20, 0)), None);
        assert_eq!(g.tile_at(Cell::new(0, -1)), None);
        assert_eq!(g.tile_at(Cell::new(19, 19)), Some(Tile::Grass));
    }

    #[test]
    fn test_buildable_respects_buffer_and_tile() {
        let mut g = grid();
        assert!(g.is_buildable(Vec2::new(100.0, 100.0)));
        // Inside world but within edge buffer
        assert!(!g.is_buildable(Vec2::new(5.0, 100.0)));
        g.set_tile(Cell::new(10, 10), Tile::Water);
        assert!(!g.is_buildable(Vec2::new(105.0, 105.0)));
        g.set_tile(Cell::new(10, 10), Tile::Mountain);
        assert!(!g.is_buildable(Vec2::new(105.0, 105.0)));
    }

    #[test]
    fn test_adjacency_excludes_center() {
        let mut g = grid();
        let pos = g.cell_to_world(Cell::new(5, 5));
        g.set_tile(Cell::new(5, 5), Tile::Water);
        assert!(!g.is_adjacent(pos, Tile::Water));
        g.set_tile(Cell::new(6, 6), Tile::Water);
        assert!(g.is_adjacent(pos, Tile::Water));
    }

    #[test]
    fn test_harvest_forest() {
        let mut g = grid();
        g.set_tile(Cell::new(3, 3), Tile::Forest);
        assert_eq!(g.harvest_forest(Cell::new(3, 3), 10), Some(10));
        assert_eq!(g.tile_at(Cell::new(3, 3)), Some(Tile::Grass));
        assert_eq!(g.harvest_forest(Cell::new(3, 3), 10), None);
    }

    #[test]
    fn test_count_and_nearest() {
        let mut g = grid();
        g.set_tile(Cell::new(8, 5), Tile::Forest);
        g.set_tile(Cell::new(9, 5), Tile::Forest);
        assert_eq!(g.count_within(Cell::new(5, 5), 3, Tile::Forest), 1);
        assert_eq!(g.count_within(Cell::new(5, 5), 4, Tile::Forest), 2);
        assert_eq!(g.nearest_tile(Cell::new(5, 5), 5, Tile::Forest), Some(Cell::new(8, 5)));
        assert_eq!(g.nearest_tile(Cell::new(5, 5), 2, Tile::Forest), None);
    }

    #[test]
    fn test_regrowth_only_next_to_forest() {
        let mut g = grid();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        // No forest anywhere: nothing can regrow
        let grown = g.regrow(&mut rng, 1000, 1.0, &AHashSet::new());
        assert_eq!(grown, 0);

        g.set_tile(Cell::new(10, 10), Tile::Forest);
        let grown = g.regrow(&mut rng, 5000, 1.0, &AHashSet::new());
        assert!(grown > 0);
        for (tile, count) in g.tile_counts() {
            if tile == Tile::Forest {
                assert_eq!(count, 1 + grown);
            }
        }
    }

    #[test]
    fn test_regrowth_skips_protected_cells() {
        let mut g = TerrainGrid::new(3, 3, 10.0, 0.0, Tile::Grass);
        g.set_tile(Cell::new(1, 1), Tile::Forest);
        let protected: AHashSet<Cell> = (0..3)
            .flat_map(|r| (0..3).map(move |c| Cell::new(c, r)))
            .collect();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(g.regrow(&mut rng, 500, 1.0, &protected), 0);
    }

    #[test]
    fn test_from_tiles_rejects_wrong_length() {
        assert!(TerrainGrid::from_tiles(2, 2, 10.0, 0.0, vec![Tile::Grass; 3]).is_err());
        assert!(TerrainGrid::from_tiles(2, 2, 10.0, 0.0, vec![Tile::Grass; 4]).is_ok());
    }
}
