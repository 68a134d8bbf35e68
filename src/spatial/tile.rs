//! Terrain tile categories

use serde::{Deserialize, Serialize};

/// Category of a single terrain cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tile {
    Mountain,
    Forest,
    #[default]
    Grass,
    Road,
    Water,
    Settlement,
}

impl Tile {
    /// Water and mountain cells are never entered by agents
    pub fn is_passable(&self) -> bool {
        !matches!(self, Tile::Water | Tile::Mountain)
    }

    /// Whether a structure may stand on this tile
    pub fn is_buildable(&self) -> bool {
        self.is_passable()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tile::Mountain => "mountain",
            Tile::Forest => "forest",
            Tile::Grass => "grass",
            Tile::Road => "road",
            Tile::Water => "water",
            Tile::Settlement => "settlement",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impassable_tiles() {
        assert!(!Tile::Water.is_passable());
        assert!(!Tile::Mountain.is_passable());
        assert!(Tile::Forest.is_passable());
        assert!(Tile::Road.is_passable());
        assert!(Tile::Settlement.is_passable());
    }

    #[test]
    fn test_default_tile_is_grass() {
        assert_eq!(Tile::default(), Tile::Grass);
    }
}
