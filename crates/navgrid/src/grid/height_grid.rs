use thiserror::Error;

use crate::math::Vec3;

use super::{TileCoord, TileGraph, TileResolver};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileCell {
    pub height: f32,
    pub cost: f32,
    pub blocked: bool,
}

impl TileCell {
    pub fn open(height: f32) -> Self {
        Self {
            height,
            cost: 1.0,
            blocked: false,
        }
    }

    pub fn blocked(height: f32) -> Self {
        Self {
            height,
            cost: 1.0,
            blocked: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeightGridError {
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
}

/// Rectangular grid of tiles with one walkable height per tile.
///
/// Origin convention:
/// - `origin` is the world position of tile (0,0) bottom-left corner at height zero.
/// - Tile (x,y) stands at `origin + ((x + 0.5) * tile_size, (y + 0.5) * tile_size, height)`.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightGrid {
    width: u32,
    height: u32,
    origin: Vec3,
    tile_size: f32,
    cells: Vec<TileCell>,
}

impl HeightGrid {
    pub fn new(
        width: u32,
        height: u32,
        origin: Vec3,
        tile_size: f32,
        cells: Vec<TileCell>,
    ) -> Result<Self, HeightGridError> {
        let expected = width as usize * height as usize;
        let actual = cells.len();
        if expected != actual {
            return Err(HeightGridError::TileCountMismatch { expected, actual });
        }
        Ok(Self {
            width,
            height,
            origin,
            tile_size,
            cells,
        })
    }

    pub fn flat(width: u32, height: u32, tile_size: f32) -> Self {
        let cells = vec![TileCell::open(0.0); width as usize * height as usize];
        Self {
            width,
            height,
            origin: Vec3::ZERO,
            tile_size,
            cells,
        }
    }

    /// Row-major heights, `y * width + x`.
    pub fn from_heights(
        width: u32,
        height: u32,
        tile_size: f32,
        heights: &[f32],
    ) -> Result<Self, HeightGridError> {
        let cells = heights.iter().copied().map(TileCell::open).collect();
        Self::new(width, height, Vec3::ZERO, tile_size, cells)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn index_of(&self, tile: TileCoord) -> Option<usize> {
        if tile.x >= self.width || tile.y >= self.height {
            return None;
        }
        Some(tile.y as usize * self.width as usize + tile.x as usize)
    }

    pub fn cell(&self, tile: TileCoord) -> Option<&TileCell> {
        self.index_of(tile).and_then(|index| self.cells.get(index))
    }

    pub fn cell_mut(&mut self, tile: TileCoord) -> Option<&mut TileCell> {
        let index = self.index_of(tile)?;
        self.cells.get_mut(index)
    }

    pub fn is_walkable(&self, tile: TileCoord) -> bool {
        self.cell(tile).is_some_and(|cell| !cell.blocked)
    }

    fn neighbors(&self, coord: TileCoord) -> [Option<TileCoord>; 4] {
        let north = (coord.y < self.height.saturating_sub(1)).then(|| TileCoord {
            x: coord.x,
            y: coord.y + 1,
        });
        let east = (coord.x < self.width.saturating_sub(1)).then(|| TileCoord {
            x: coord.x + 1,
            y: coord.y,
        });
        let south = (coord.y > 0).then(|| TileCoord {
            x: coord.x,
            y: coord.y - 1,
        });
        let west = (coord.x > 0).then(|| TileCoord {
            x: coord.x - 1,
            y: coord.y,
        });
        [north, east, south, west]
    }
}

impl TileGraph for HeightGrid {
    fn adjacent_tiles(&self, tile: TileCoord) -> Vec<TileCoord> {
        if self.index_of(tile).is_none() {
            return Vec::new();
        }
        self.neighbors(tile)
            .into_iter()
            .flatten()
            .filter(|neighbor| self.is_walkable(*neighbor))
            .collect()
    }

    fn cost(&self, from: TileCoord, to: TileCoord) -> Option<f32> {
        if !self.is_walkable(from) || !self.is_walkable(to) {
            return None;
        }
        if from.x.abs_diff(to.x) + from.y.abs_diff(to.y) != 1 {
            return None;
        }
        self.cell(to).map(|cell| cell.cost)
    }

    fn height_delta(&self, from: TileCoord, to: TileCoord) -> f32 {
        match (self.cell(from), self.cell(to)) {
            (Some(from), Some(to)) => to.height - from.height,
            _ => 0.0,
        }
    }

    fn tile_location(&self, tile: TileCoord) -> Option<Vec3> {
        let cell = self.cell(tile)?;
        Some(Vec3 {
            x: self.origin.x + (tile.x as f32 + 0.5) * self.tile_size,
            y: self.origin.y + (tile.y as f32 + 0.5) * self.tile_size,
            z: self.origin.z + cell.height,
        })
    }

    fn heuristic(&self, from: TileCoord, to: TileCoord) -> f32 {
        let min_cost = self
            .cells
            .iter()
            .filter(|cell| !cell.blocked)
            .map(|cell| cell.cost)
            .fold(f32::INFINITY, f32::min);
        if !min_cost.is_finite() {
            return 0.0;
        }
        (from.x.abs_diff(to.x) + from.y.abs_diff(to.y)) as f32 * min_cost.max(0.0)
    }
}

impl TileResolver for HeightGrid {
    fn tile_at(&self, position: Vec3) -> Option<TileCoord> {
        if !position.is_finite() || self.tile_size <= 0.0 {
            return None;
        }
        let tile_x = ((position.x - self.origin.x) / self.tile_size).floor();
        let tile_y = ((position.y - self.origin.y) / self.tile_size).floor();
        if tile_x < 0.0 || tile_y < 0.0 {
            return None;
        }
        let tile = TileCoord {
            x: tile_x as u32,
            y: tile_y as u32,
        };
        self.index_of(tile)?;
        Some(tile)
    }
}
