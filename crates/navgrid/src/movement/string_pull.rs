use tracing::debug;

use crate::grid::{TileCoord, TileGraph, TileResolver};
use crate::math::Vec3;

use super::config::MovementConfig;
use super::segmenter::AgentGraph;
use super::types::MovementMode;

/// Samples per tile width when tracing a straight line across the grid.
const LINE_SAMPLES_PER_TILE: f32 = 4.0;

/// Drops detour tiles from `raw_path` wherever the agent can walk a straight line instead.
///
/// Greedy single pass: from the current anchor, extend the straight line one tile at a time
/// and commit the last tile that could still be reached once the next one cannot. Start and
/// goal are always kept and every climb endpoint becomes a commit point. The result is a
/// subsequence of `raw_path`.
pub fn string_pull(
    raw_path: &[TileCoord],
    graph: &dyn TileGraph,
    resolver: &dyn TileResolver,
    config: &MovementConfig,
) -> Vec<TileCoord> {
    if !config.string_pull_path || raw_path.len() <= 2 {
        return raw_path.to_vec();
    }

    let puller = StringPuller {
        raw_path,
        agent: AgentGraph::new(graph, config),
        resolver,
        sample_step: sample_step(raw_path, graph),
    };

    let last = raw_path.len() - 1;
    let mut pulled = vec![raw_path[0]];
    let mut anchor = 0usize;
    let mut index = 2usize;
    while index <= last {
        if puller.straight_traversal_is_legal(anchor, index) {
            index += 1;
            continue;
        }
        anchor = index - 1;
        pulled.push(raw_path[anchor]);
        index = anchor + 2;
    }
    pulled.push(raw_path[last]);

    debug!(
        raw_tiles = raw_path.len(),
        pulled_tiles = pulled.len(),
        "path_string_pulled"
    );
    pulled
}

struct StringPuller<'a> {
    raw_path: &'a [TileCoord],
    agent: AgentGraph<'a, dyn TileGraph + 'a>,
    resolver: &'a dyn TileResolver,
    sample_step: f32,
}

impl StringPuller<'_> {
    fn straight_traversal_is_legal(&self, anchor: usize, target: usize) -> bool {
        let walked = self.raw_path[anchor..=target]
            .windows(2)
            .all(|pair| self.is_walk_step(pair[0], pair[1]));
        if !walked {
            return false;
        }

        let (Some(from), Some(to)) = (
            self.agent.tile_location(self.raw_path[anchor]),
            self.agent.tile_location(self.raw_path[target]),
        ) else {
            return false;
        };
        self.line_is_walkable(from, to)
    }

    fn is_walk_step(&self, from: TileCoord, to: TileCoord) -> bool {
        self.agent.cost(from, to).is_some()
            && self
                .agent
                .step_modes(from, to)
                .contains(MovementMode::Walking)
    }

    /// A line may pass between two tiles through their shared edge or, when it slips through
    /// a corner, past both tiles that share that corner.
    fn is_crossing_walkable(&self, from: TileCoord, to: TileCoord) -> bool {
        if self.is_walk_step(from, to) {
            return true;
        }
        if from.x.abs_diff(to.x) != 1 || from.y.abs_diff(to.y) != 1 {
            return false;
        }
        [TileCoord::new(to.x, from.y), TileCoord::new(from.x, to.y)]
            .into_iter()
            .all(|corner| self.is_walk_step(from, corner) && self.is_walk_step(corner, to))
    }

    fn line_is_walkable(&self, from: Vec3, to: Vec3) -> bool {
        let length = (to - from).horizontal_length();
        let samples = (length / self.sample_step).ceil().max(1.0) as usize;
        let mut previous: Option<TileCoord> = None;
        for sample in 0..=samples {
            let point = from.lerp(to, sample as f32 / samples as f32);
            let Some(tile) = self.resolver.tile_at(point) else {
                return false;
            };
            if let Some(previous) = previous {
                if previous != tile && !self.is_crossing_walkable(previous, tile) {
                    return false;
                }
            }
            previous = Some(tile);
        }
        true
    }
}

fn sample_step(raw_path: &[TileCoord], graph: &dyn TileGraph) -> f32 {
    let shortest_step = raw_path
        .windows(2)
        .filter_map(|pair| {
            let from = graph.tile_location(pair[0])?;
            let to = graph.tile_location(pair[1])?;
            Some((to - from).horizontal_length())
        })
        .filter(|length| *length > 0.0)
        .fold(f32::INFINITY, f32::min);
    if shortest_step.is_finite() {
        shortest_step / LINE_SAMPLES_PER_TILE
    } else {
        1.0
    }
}
