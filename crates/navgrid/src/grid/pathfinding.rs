use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use super::{TileCoord, TileGraph};

pub trait Pathfinder {
    /// Ordered tiles from `start` to `goal` inclusive, or `None` when the goal cannot be reached
    /// for at most `budget` total cost.
    fn find_path(
        &self,
        graph: &dyn TileGraph,
        start: TileCoord,
        goal: TileCoord,
        budget: f32,
    ) -> Option<Vec<TileCoord>>;
}

/// Budgeted A* with a deterministic tie break on equal scores.
#[derive(Debug, Clone, Copy, Default)]
pub struct AStarPathfinder;

impl Pathfinder for AStarPathfinder {
    fn find_path(
        &self,
        graph: &dyn TileGraph,
        start: TileCoord,
        goal: TileCoord,
        budget: f32,
    ) -> Option<Vec<TileCoord>> {
        if start == goal {
            return Some(vec![start]);
        }
        let search = run_search(graph, start, Some(goal), budget);
        if !search.closed.contains(&goal) {
            return None;
        }
        reconstruct_tile_path(&search.parent, start, goal)
    }
}

/// Every tile reachable from `start` for at most `budget` total cost, `start` included,
/// ordered by cost then row then column.
pub fn reachable_tiles(graph: &dyn TileGraph, start: TileCoord, budget: f32) -> Vec<TileCoord> {
    let search = run_search(graph, start, None, budget);
    let mut tiles = search
        .best_g
        .into_iter()
        .filter(|(tile, _)| search.closed.contains(tile))
        .collect::<Vec<_>>();
    tiles.sort_by(|(a_tile, a_cost), (b_tile, b_cost)| {
        a_cost
            .total_cmp(b_cost)
            .then(a_tile.y.cmp(&b_tile.y))
            .then(a_tile.x.cmp(&b_tile.x))
    });
    tiles.into_iter().map(|(tile, _)| tile).collect()
}

#[derive(Debug, Clone, Copy)]
struct OpenNode {
    coord: TileCoord,
    h_cost: f32,
    f_cost: f32,
    insertion_order: u64,
}

struct SearchState {
    closed: HashSet<TileCoord>,
    best_g: HashMap<TileCoord, f32>,
    parent: HashMap<TileCoord, TileCoord>,
}

fn run_search(
    graph: &dyn TileGraph,
    start: TileCoord,
    goal: Option<TileCoord>,
    budget: f32,
) -> SearchState {
    let mut state = SearchState {
        closed: HashSet::new(),
        best_g: HashMap::new(),
        parent: HashMap::new(),
    };
    let mut open = Vec::new();
    let mut next_insertion = 0u64;

    let start_h = goal.map_or(0.0, |goal| graph.heuristic(start, goal));
    open.push(OpenNode {
        coord: start,
        h_cost: start_h,
        f_cost: start_h,
        insertion_order: next_insertion,
    });
    next_insertion = next_insertion.saturating_add(1);
    state.best_g.insert(start, 0.0);

    while !open.is_empty() {
        let best_index = pick_best_open_node_index(&open);
        let current = open.swap_remove(best_index);
        if !state.closed.insert(current.coord) {
            continue;
        }
        if Some(current.coord) == goal {
            break;
        }

        let current_g = state.best_g.get(&current.coord).copied().unwrap_or(0.0);
        for neighbor in graph.adjacent_tiles(current.coord) {
            if state.closed.contains(&neighbor) {
                continue;
            }
            let Some(step_cost) = graph.cost(current.coord, neighbor) else {
                continue;
            };
            let tentative_g = current_g + step_cost.max(0.0);
            if tentative_g > budget {
                continue;
            }
            if state
                .best_g
                .get(&neighbor)
                .is_some_and(|best| tentative_g >= *best)
            {
                continue;
            }

            state.best_g.insert(neighbor, tentative_g);
            state.parent.insert(neighbor, current.coord);
            let h_cost = goal.map_or(0.0, |goal| graph.heuristic(neighbor, goal));
            open.push(OpenNode {
                coord: neighbor,
                h_cost,
                f_cost: tentative_g + h_cost,
                insertion_order: next_insertion,
            });
            next_insertion = next_insertion.saturating_add(1);
        }
    }

    state
}

fn pick_best_open_node_index(open: &[OpenNode]) -> usize {
    let mut best_index = 0usize;
    for index in 1..open.len() {
        if open_node_order(&open[index], &open[best_index]) == Ordering::Less {
            best_index = index;
        }
    }
    best_index
}

fn open_node_order(a: &OpenNode, b: &OpenNode) -> Ordering {
    a.f_cost
        .total_cmp(&b.f_cost)
        .then(a.h_cost.total_cmp(&b.h_cost))
        .then(a.coord.y.cmp(&b.coord.y))
        .then(a.coord.x.cmp(&b.coord.x))
        .then(a.insertion_order.cmp(&b.insertion_order))
}

fn reconstruct_tile_path(
    parent: &HashMap<TileCoord, TileCoord>,
    start: TileCoord,
    goal: TileCoord,
) -> Option<Vec<TileCoord>> {
    let mut cursor = goal;
    let mut tiles = vec![cursor];
    while cursor != start {
        cursor = *parent.get(&cursor)?;
        tiles.push(cursor);
    }
    tiles.reverse();
    Some(tiles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{HeightGrid, TileCell};

    fn walled_grid() -> HeightGrid {
        let width = 7u32;
        let height = 5u32;
        let mut grid = HeightGrid::flat(width, height, 100.0);
        for y in 0..height {
            if y != 4 {
                *grid.cell_mut(TileCoord::new(3, y)).expect("cell") = TileCell::blocked(0.0);
            }
        }
        grid
    }

    #[test]
    fn astar_path_never_steps_onto_blocked_tile() {
        let grid = walled_grid();
        let path = AStarPathfinder
            .find_path(&grid, TileCoord::new(1, 2), TileCoord::new(5, 2), 100.0)
            .expect("expected reachable path");
        assert_eq!(path.first(), Some(&TileCoord::new(1, 2)));
        assert_eq!(path.last(), Some(&TileCoord::new(5, 2)));
        for tile in &path {
            assert!(grid.is_walkable(*tile), "path stepped onto blocked tile");
        }
        for pair in path.windows(2) {
            assert_eq!(pair[0].x.abs_diff(pair[1].x) + pair[0].y.abs_diff(pair[1].y), 1);
        }
    }

    #[test]
    fn astar_respects_the_budget() {
        let grid = walled_grid();
        let detour = AStarPathfinder
            .find_path(&grid, TileCoord::new(1, 2), TileCoord::new(5, 2), 100.0)
            .expect("path");
        let cost = (detour.len() - 1) as f32;
        assert!(AStarPathfinder
            .find_path(&grid, TileCoord::new(1, 2), TileCoord::new(5, 2), cost - 1.0)
            .is_none());
        assert!(AStarPathfinder
            .find_path(&grid, TileCoord::new(1, 2), TileCoord::new(5, 2), cost)
            .is_some());
    }

    #[test]
    fn astar_tie_break_is_deterministic_on_symmetric_map() {
        let mut grid = HeightGrid::flat(5, 5, 100.0);
        *grid.cell_mut(TileCoord::new(2, 2)).expect("cell") = TileCell::blocked(0.0);
        let first = AStarPathfinder.find_path(&grid, TileCoord::new(0, 2), TileCoord::new(4, 2), 20.0);
        let second = AStarPathfinder.find_path(&grid, TileCoord::new(0, 2), TileCoord::new(4, 2), 20.0);
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn reachable_tiles_stay_within_budget() {
        let grid = HeightGrid::flat(5, 5, 100.0);
        let tiles = reachable_tiles(&grid, TileCoord::new(2, 2), 1.0);
        assert_eq!(tiles.len(), 5);
        assert_eq!(tiles[0], TileCoord::new(2, 2));
        assert!(!tiles.contains(&TileCoord::new(3, 3)));
    }
}
