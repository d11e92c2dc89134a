use tracing::trace;

use crate::grid::{TileCoord, TileGraph};
use crate::math::{shortest_delta, Rotator, Vec3};

use super::config::MovementConfig;
use super::curve::PathCurve;
use super::types::{MovementError, MovementMode, MovementModeSet, PathSegment};

/// Yaw mismatch between the agent and the first path span above which the path starts with a
/// turn in place.
pub const TURN_IN_PLACE_THRESHOLD_DEGREES: f32 = 30.0;

/// Modes that can carry an agent from `from` to `to`, judged on slope and rise alone.
pub fn transition_modes(from: Vec3, to: Vec3, config: &MovementConfig) -> MovementModeSet {
    let offset = to - from;
    let rise = offset.z;
    let run = offset.horizontal_length();
    let slope_degrees = rise.abs().atan2(run).to_degrees();
    if slope_degrees <= config.max_walk_angle {
        return MovementModeSet::only(MovementMode::Walking);
    }
    if rise > 0.0 && rise <= config.max_climb_height {
        return MovementModeSet::only(MovementMode::ClimbingUp);
    }
    if rise < 0.0 && -rise <= config.max_climb_height {
        return MovementModeSet::only(MovementMode::ClimbingDown);
    }
    MovementModeSet::EMPTY
}

/// Tile graph seen through one agent's abilities: a step is only possible when the agent has
/// a movement mode for it.
pub struct AgentGraph<'a, G: TileGraph + ?Sized> {
    graph: &'a G,
    config: &'a MovementConfig,
}

impl<'a, G: TileGraph + ?Sized> AgentGraph<'a, G> {
    pub fn new(graph: &'a G, config: &'a MovementConfig) -> Self {
        Self { graph, config }
    }

    pub fn step_modes(&self, from: TileCoord, to: TileCoord) -> MovementModeSet {
        let (Some(from_location), Some(to_location)) =
            (self.graph.tile_location(from), self.graph.tile_location(to))
        else {
            return MovementModeSet::EMPTY;
        };
        let rise = self.graph.height_delta(from, to);
        let to_location = Vec3 {
            z: from_location.z + rise,
            ..to_location
        };
        transition_modes(from_location, to_location, self.config)
            .intersection(self.config.available_movement_modes)
    }
}

impl<G: TileGraph + ?Sized> TileGraph for AgentGraph<'_, G> {
    fn adjacent_tiles(&self, tile: TileCoord) -> Vec<TileCoord> {
        self.graph
            .adjacent_tiles(tile)
            .into_iter()
            .filter(|neighbor| !self.step_modes(tile, *neighbor).is_empty())
            .collect()
    }

    fn cost(&self, from: TileCoord, to: TileCoord) -> Option<f32> {
        if self.step_modes(from, to).is_empty() {
            return None;
        }
        self.graph.cost(from, to)
    }

    fn height_delta(&self, from: TileCoord, to: TileCoord) -> f32 {
        self.graph.height_delta(from, to)
    }

    fn tile_location(&self, tile: TileCoord) -> Option<Vec3> {
        self.graph.tile_location(tile)
    }

    fn heuristic(&self, from: TileCoord, to: TileCoord) -> f32 {
        self.graph.heuristic(from, to)
    }
}

/// Splits a curve built through `tile_path` into segments by legal movement mode.
///
/// `point_distances` holds the arc length of each path point on `curve`; it must have one
/// entry per tile. Neighbouring pairs with the same mode set are merged. When
/// `current_rotation` faces away from the first span, a zero-length turn-in-place segment
/// leads the list.
pub fn build_segments(
    tile_path: &[TileCoord],
    points: &[Vec3],
    point_distances: &[f32],
    curve: &dyn PathCurve,
    config: &MovementConfig,
    current_rotation: Rotator,
) -> Result<Vec<PathSegment>, MovementError> {
    let mut segments: Vec<PathSegment> = Vec::new();
    let pair_count = points.len().min(point_distances.len()).saturating_sub(1);

    for index in 0..pair_count {
        let start = point_distances[index];
        let end = point_distances[index + 1];
        if end <= start {
            continue;
        }
        let modes = transition_modes(points[index], points[index + 1], config);
        if let Some(last) = segments.last_mut() {
            if last.movement_modes() == modes {
                last.extend_to(end);
                continue;
            }
        }
        let hint = Rotator::from_direction(points[index + 1] - points[index]);
        segments.push(PathSegment::new(modes, start, end, hint)?);
    }

    if let Some(first) = segments.first() {
        let facing = Rotator::from_yaw(curve.transform_at_distance(first.start()).rotation.yaw);
        let mismatch = shortest_delta(current_rotation.yaw, facing.yaw).abs();
        if mismatch > TURN_IN_PLACE_THRESHOLD_DEGREES
            && config
                .available_movement_modes
                .contains(MovementMode::InPlaceTurn)
        {
            let turn = PathSegment::new(
                MovementModeSet::only(MovementMode::InPlaceTurn),
                first.start(),
                first.start(),
                facing,
            )?;
            segments.insert(0, turn);
        }
    }

    trace!(
        tiles = tile_path.len(),
        segments = segments.len(),
        curve_length = curve.length(),
        "segments_built"
    );
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{AStarPathfinder, HeightGrid, Pathfinder};
    use crate::movement::curve::PolylineCurve;

    fn config_with_walk_angle(max_walk_angle: f32) -> MovementConfig {
        MovementConfig {
            max_walk_angle,
            ..MovementConfig::default()
        }
    }

    fn segments_for(
        grid: &HeightGrid,
        tiles: &[TileCoord],
        config: &MovementConfig,
        rotation: Rotator,
    ) -> (PolylineCurve, Vec<PathSegment>) {
        let points = tiles
            .iter()
            .map(|tile| grid.tile_location(*tile).expect("location"))
            .collect::<Vec<_>>();
        let curve = PolylineCurve::new(points.iter().copied());
        let distances = curve.point_distances().to_vec();
        let segments = build_segments(tiles, &points, &distances, &curve, config, rotation)
            .expect("segments");
        (curve, segments)
    }

    fn row(length: u32) -> Vec<TileCoord> {
        (0..length).map(|x| TileCoord::new(x, 0)).collect()
    }

    #[test]
    fn flat_ground_is_walked() {
        let config = config_with_walk_angle(45.0);
        let modes = transition_modes(Vec3::ZERO, Vec3::new(100.0, 0.0, 10.0), &config);
        assert_eq!(modes, MovementModeSet::only(MovementMode::Walking));
    }

    #[test]
    fn steep_rise_is_climbed_and_drop_is_climbed_down() {
        let config = config_with_walk_angle(30.0);
        let up = transition_modes(Vec3::ZERO, Vec3::new(100.0, 0.0, 100.0), &config);
        assert_eq!(up, MovementModeSet::only(MovementMode::ClimbingUp));
        let down = transition_modes(Vec3::new(100.0, 0.0, 100.0), Vec3::ZERO, &config);
        assert_eq!(down, MovementModeSet::only(MovementMode::ClimbingDown));
    }

    #[test]
    fn rise_above_climb_height_is_impassable() {
        let config = config_with_walk_angle(30.0);
        let modes = transition_modes(Vec3::ZERO, Vec3::new(100.0, 0.0, 1000.0), &config);
        assert!(modes.is_empty());
    }

    #[test]
    fn flat_path_merges_into_one_walking_segment() {
        let grid = HeightGrid::flat(5, 1, 100.0);
        let (curve, segments) =
            segments_for(&grid, &row(5), &MovementConfig::default(), Rotator::ZERO);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start(), 0.0);
        assert_eq!(segments[0].end(), curve.length());
        assert_eq!(
            segments[0].movement_modes(),
            MovementModeSet::only(MovementMode::Walking)
        );
    }

    #[test]
    fn climb_gets_its_own_segment_and_segments_cover_the_curve() {
        let grid =
            HeightGrid::from_heights(5, 1, 100.0, &[0.0, 0.0, 100.0, 100.0, 100.0]).expect("grid");
        let (curve, segments) =
            segments_for(&grid, &row(5), &config_with_walk_angle(30.0), Rotator::ZERO);
        let modes = segments
            .iter()
            .map(|segment| segment.movement_modes().preferred())
            .collect::<Vec<_>>();
        assert_eq!(
            modes,
            vec![
                Some(MovementMode::Walking),
                Some(MovementMode::ClimbingUp),
                Some(MovementMode::Walking)
            ]
        );
        assert_eq!(segments[0].start(), 0.0);
        for pair in segments.windows(2) {
            assert_eq!(pair[0].end(), pair[1].start(), "gap or overlap between segments");
        }
        assert_eq!(segments.last().expect("last").end(), curve.length());
        assert_eq!(segments[1].start(), 100.0);
    }

    #[test]
    fn facing_away_from_the_path_adds_a_leading_turn() {
        let grid = HeightGrid::flat(5, 1, 100.0);
        let (_, segments) =
            segments_for(&grid, &row(3), &MovementConfig::default(), Rotator::from_yaw(180.0));
        assert_eq!(segments.len(), 2);
        assert!(segments[0].is_turn());
        assert_eq!(segments[0].length(), 0.0);
        assert_eq!(segments[0].rotation_hint().yaw, 0.0);
    }

    #[test]
    fn no_leading_turn_without_in_place_turn_mode() {
        let grid = HeightGrid::flat(5, 1, 100.0);
        let config = MovementConfig {
            available_movement_modes: MovementModeSet::only(MovementMode::Walking),
            ..MovementConfig::default()
        };
        let (_, segments) = segments_for(&grid, &row(3), &config, Rotator::from_yaw(180.0));
        assert_eq!(segments.len(), 1);
        assert!(!segments[0].is_turn());
    }

    #[test]
    fn agent_graph_hides_steps_the_agent_cannot_take() {
        let grid = HeightGrid::from_heights(3, 1, 100.0, &[0.0, 100.0, 100.0]).expect("grid");
        let walker = MovementConfig {
            max_walk_angle: 30.0,
            available_movement_modes: MovementModeSet::only(MovementMode::Walking),
            ..MovementConfig::default()
        };
        let agent = AgentGraph::new(&grid, &walker);
        assert_eq!(agent.cost(TileCoord::new(0, 0), TileCoord::new(1, 0)), None);
        assert!(AStarPathfinder
            .find_path(&agent, TileCoord::new(0, 0), TileCoord::new(2, 0), 10.0)
            .is_none());

        let climber = MovementConfig {
            max_walk_angle: 30.0,
            ..MovementConfig::default()
        };
        let agent = AgentGraph::new(&grid, &climber);
        assert_eq!(agent.cost(TileCoord::new(0, 0), TileCoord::new(1, 0)), Some(1.0));
    }
}
