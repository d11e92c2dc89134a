mod height_grid;
mod pathfinding;

pub use height_grid::{HeightGrid, HeightGridError, TileCell};
pub use pathfinding::{reachable_tiles, AStarPathfinder, Pathfinder};

use crate::math::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Adjacency and cost model of a tile world. Movement code only queries it and never owns it.
pub trait TileGraph {
    fn adjacent_tiles(&self, tile: TileCoord) -> Vec<TileCoord>;

    /// Cost of stepping from `from` onto `to`, `None` when the step is impossible.
    fn cost(&self, from: TileCoord, to: TileCoord) -> Option<f32>;

    fn height_delta(&self, from: TileCoord, to: TileCoord) -> f32;

    /// World position an agent stands at when occupying `tile`.
    fn tile_location(&self, tile: TileCoord) -> Option<Vec3>;

    /// Admissible cost estimate used to guide the search. Zero turns A* into Dijkstra.
    fn heuristic(&self, _from: TileCoord, _to: TileCoord) -> f32 {
        0.0
    }
}

pub trait TileResolver {
    fn tile_at(&self, position: Vec3) -> Option<TileCoord>;
}
