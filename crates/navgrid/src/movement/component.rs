use tracing::{debug, error, info, trace};

use crate::grid::{reachable_tiles, Pathfinder, TileCoord, TileGraph, TileResolver};
use crate::math::{Rotator, Transform, Vec3};

use super::animation::AnimationSource;
use super::config::{ConfigError, MovementConfig};
use super::curve::{PathCurve, PolylineCurve};
use super::events::MovementObserver;
use super::rotation::RotationLimiter;
use super::segmenter::{build_segments, AgentGraph};
use super::string_pull::string_pull;
use super::types::{MovementError, MovementMode, MovementPhase, PathSegment};
use super::visualization::{visible_segments, VisualizationSink};

/// A turn in place is finished once every unlocked axis is this close to the target facing.
pub const TURN_COMPLETE_TOLERANCE_DEGREES: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct EndingRamp {
    start_remaining: f32,
    elapsed: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TileCache {
    location: Vec3,
    tile: Option<TileCoord>,
}

/// Moves one agent across a tile grid along a smoothed path, one frame at a time.
///
/// Lifecycle:
/// - `build_path` / `move_to` install a curve and its segments and arm the traversal.
/// - `advance` is called once per frame with the frame's delta and returns the new transform.
/// - The traversal ends in `MovementPhase::Done` with the mode back at `Stationary`.
pub struct GridMovement {
    config: MovementConfig,
    limiter: RotationLimiter,
    transform: Transform,
    curve: Option<PolylineCurve>,
    segments: Vec<PathSegment>,
    segment_index: Option<usize>,
    distance: f32,
    mode: MovementMode,
    phase: MovementPhase,
    ending: Option<EndingRamp>,
    end_notified: bool,
    frame: u64,
    displacement_drained_frame: Option<u64>,
    path_visible: bool,
    tile_cache: Option<TileCache>,
    observers: Vec<Box<dyn MovementObserver>>,
    animation: Option<Box<dyn AnimationSource>>,
    visualization: Option<Box<dyn VisualizationSink>>,
}

impl GridMovement {
    pub fn new(config: MovementConfig, transform: Transform) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            limiter: RotationLimiter::from_config(&config),
            config,
            transform,
            curve: None,
            segments: Vec::new(),
            segment_index: None,
            distance: 0.0,
            mode: MovementMode::Stationary,
            phase: MovementPhase::Done,
            ending: None,
            end_notified: true,
            frame: 0,
            displacement_drained_frame: None,
            path_visible: false,
            tile_cache: None,
            observers: Vec::new(),
            animation: None,
            visualization: None,
        })
    }

    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    /// Replaces the configuration. An invalid config is rejected and the old one stays.
    pub fn set_config(&mut self, config: MovementConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.limiter = RotationLimiter::from_config(&config);
        self.config = config;
        Ok(())
    }

    pub fn add_observer(&mut self, observer: Box<dyn MovementObserver>) {
        self.observers.push(observer);
    }

    pub fn set_animation_source(&mut self, source: Box<dyn AnimationSource>) {
        self.animation = Some(source);
    }

    pub fn set_visualization_sink(&mut self, sink: Box<dyn VisualizationSink>) {
        self.visualization = Some(sink);
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    pub fn location(&self) -> Vec3 {
        self.transform.location
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn mode(&self) -> MovementMode {
        self.mode
    }

    pub fn phase(&self) -> MovementPhase {
        self.phase
    }

    pub fn curve(&self) -> Option<&PolylineCurve> {
        self.curve.as_ref()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// The segment the traversal is currently on, if any.
    pub fn current_segment(&self) -> Option<&PathSegment> {
        self.segment_index.and_then(|index| self.segments.get(index))
    }

    pub fn is_moving(&self) -> bool {
        self.phase != MovementPhase::Done && self.mode != MovementMode::Stationary
    }

    /// Curve length still ahead of the agent, zero once the traversal is done.
    pub fn remaining_distance(&self) -> f32 {
        match &self.curve {
            Some(curve) if self.phase != MovementPhase::Done => {
                (curve.length() - self.distance).max(0.0)
            }
            _ => 0.0,
        }
    }

    /// Point on the current curve `ahead` units past the agent.
    pub fn forward_location(&self, ahead: f32) -> Option<Vec3> {
        self.curve
            .as_ref()
            .map(|curve| curve.location_at_distance(self.distance + ahead))
    }

    /// Tile under the agent. Resolved again only after the agent has moved.
    pub fn get_tile(&mut self, resolver: &dyn TileResolver) -> Option<TileCoord> {
        let location = self.transform.location;
        if let Some(cache) = self.tile_cache {
            if cache.location == location {
                return cache.tile;
            }
        }
        let tile = resolver.tile_at(location);
        self.tile_cache = Some(TileCache { location, tile });
        tile
    }

    /// Tiles the agent could reach within its movement range, its own tile included.
    pub fn tiles_in_range<G: TileGraph + TileResolver>(&mut self, grid: &G) -> Vec<TileCoord> {
        let Some(start) = self.get_tile(grid) else {
            return Vec::new();
        };
        let agent = AgentGraph::new(grid, &self.config);
        reachable_tiles(&agent, start, self.config.movement_range)
    }

    /// Moves the agent onto the centre of the tile it stands on.
    pub fn snap_to_grid<G: TileGraph + TileResolver>(&mut self, grid: &G) {
        let Some(location) = self
            .get_tile(grid)
            .and_then(|tile| grid.tile_location(tile))
        else {
            debug!(
                x = self.transform.location.x,
                y = self.transform.location.y,
                "snap_to_grid_skipped"
            );
            return;
        };
        self.transform.location = location;
    }

    /// Rotation with locked axes held at the agent's current values.
    pub fn apply_rotation_locks(&self, rotation: Rotator) -> Rotator {
        self.limiter.locks.apply(self.transform.rotation, rotation)
    }

    /// Drains the animation displacement for this frame. Any further call before the next
    /// `advance` returns identity.
    pub fn consume_animation_displacement(&mut self) -> Transform {
        if self.displacement_drained_frame == Some(self.frame) {
            return Transform::IDENTITY;
        }
        self.displacement_drained_frame = Some(self.frame);
        self.animation
            .as_mut()
            .map_or(Transform::IDENTITY, |source| source.drain_frame_displacement())
    }

    /// Plans a path to `target` and arms the traversal without showing it.
    ///
    /// On error nothing about the component changes.
    pub fn build_path<G: TileGraph + TileResolver>(
        &mut self,
        grid: &G,
        pathfinder: &dyn Pathfinder,
        target: TileCoord,
    ) -> Result<(), MovementError> {
        let position = self.transform.location;
        let start = self
            .get_tile(grid)
            .ok_or(MovementError::NoTileAtPosition { position })?;
        let no_path = MovementError::NoPathFound {
            from: start,
            to: target,
        };

        let agent = AgentGraph::new(grid, &self.config);
        let raw_path = pathfinder
            .find_path(&agent, start, target, self.config.movement_range)
            .filter(|path| path.len() >= 2);
        let Some(raw_path) = raw_path else {
            debug!(
                from_x = start.x,
                from_y = start.y,
                to_x = target.x,
                to_y = target.y,
                "path_not_found"
            );
            return Err(no_path);
        };

        let tiles = string_pull(&raw_path, grid, grid, &self.config);
        let mut points = Vec::with_capacity(tiles.len());
        points.push(position);
        for tile in &tiles[1..] {
            points.push(grid.tile_location(*tile).ok_or_else(|| no_path.clone())?);
        }

        let curve = PolylineCurve::new(points);
        let segments = build_segments(
            &tiles,
            curve.points(),
            curve.point_distances(),
            &curve,
            &self.config,
            self.transform.rotation,
        )
        .map_err(|err| {
            error!(error = %err, "path_segmentation_failed");
            err
        })?;
        if segments.is_empty() {
            return Err(no_path);
        }

        info!(
            raw_tiles = raw_path.len(),
            tiles = tiles.len(),
            segments = segments.len(),
            curve_length = curve.length(),
            "path_built"
        );
        self.install_path(Some(curve), segments, 0.0);
        Ok(())
    }

    /// `build_path` followed by showing the path.
    pub fn move_to<G: TileGraph + TileResolver>(
        &mut self,
        grid: &G,
        pathfinder: &dyn Pathfinder,
        target: TileCoord,
    ) -> Result<(), MovementError> {
        self.build_path(grid, pathfinder, target)?;
        self.show_path();
        info!(x = target.x, y = target.y, "move_to");
        Ok(())
    }

    /// Rotates in place to `facing`. Works even when turning in place is not among the
    /// agent's available modes.
    pub fn turn_to(&mut self, facing: Rotator) {
        let turn = PathSegment::turn(self.distance, facing.normalized());
        let curve = self.curve.take();
        self.install_path(curve, vec![turn], self.distance);
        info!(yaw = facing.yaw, "turn_to");
    }

    pub fn show_path(&mut self) {
        let (Some(sink), Some(curve)) = (self.visualization.as_mut(), self.curve.as_ref()) else {
            return;
        };
        let visible = visible_segments(&self.segments, self.config.visualization_offset);
        sink.show_segments(curve, &visible);
        self.path_visible = true;
    }

    pub fn hide_path(&mut self) {
        if !self.path_visible {
            return;
        }
        if let Some(sink) = self.visualization.as_mut() {
            sink.hide_segments();
        }
        self.path_visible = false;
    }

    /// Steps the traversal by `delta_seconds` and returns the agent's new transform.
    pub fn advance(&mut self, delta_seconds: f32) -> Transform {
        self.frame = self.frame.wrapping_add(1);
        let delta_seconds = if delta_seconds.is_finite() {
            delta_seconds.max(0.0)
        } else {
            0.0
        };

        if !self.is_moving() {
            self.segment_index = None;
            if self.config.always_use_animation_displacement {
                self.apply_idle_displacement();
            }
            return self.transform;
        }

        let Some(index) = self.refresh_segment_index() else {
            self.step_phase(MovementPhase::Done);
            return self.transform;
        };
        let segment = self.segments[index];

        let mode = self.select_mode(&segment, Some(self.mode));
        if mode != self.mode {
            self.change_mode(mode);
        }

        // Drained on every moving frame so nothing carries over into a later one.
        let animation_step = (self.config.use_animation_displacement && self.animation.is_some())
            .then(|| self.consume_animation_displacement().location.length());

        if self.mode == MovementMode::InPlaceTurn {
            self.advance_turn(index, &segment, delta_seconds);
        } else {
            self.advance_along_path(index, delta_seconds, animation_step);
        }

        trace!(
            frame = self.frame,
            distance = self.distance,
            mode = %self.mode,
            phase = self.phase.as_token(),
            "movement_advanced"
        );
        self.transform
    }

    fn install_path(
        &mut self,
        curve: Option<PolylineCurve>,
        segments: Vec<PathSegment>,
        distance: f32,
    ) {
        self.hide_path();
        let mode = segments
            .first()
            .map(|segment| self.select_mode(segment, None))
            .unwrap_or(MovementMode::Stationary);
        self.curve = curve;
        self.segments = segments;
        self.segment_index = Some(0);
        self.distance = distance;
        self.mode = mode;
        self.phase = MovementPhase::Beginning;
        self.ending = None;
        self.end_notified = false;
    }

    /// Keeps `current` while the segment still allows it, otherwise the highest-priority mode
    /// the agent has, otherwise the highest-priority mode the segment allows.
    fn select_mode(&self, segment: &PathSegment, current: Option<MovementMode>) -> MovementMode {
        let allowed = segment.movement_modes();
        let usable = allowed.intersection(self.config.available_movement_modes);
        if let Some(current) = current {
            if usable.contains(current) || (usable.is_empty() && allowed.contains(current)) {
                return current;
            }
        }
        usable
            .preferred()
            .or_else(|| allowed.preferred())
            .unwrap_or(MovementMode::Stationary)
    }

    fn change_mode(&mut self, new: MovementMode) {
        let old = self.mode;
        self.mode = new;
        debug!(old = %old, new = %new, distance = self.distance, "movement_mode_changed");
        for observer in &mut self.observers {
            observer.on_movement_mode_changed(old, new);
        }
    }

    /// Moves the cursor past every non-final segment the agent has already left behind.
    fn refresh_segment_index(&mut self) -> Option<usize> {
        let mut index = self.segment_index?;
        while let Some(segment) = self.segments.get(index) {
            let has_next = index + 1 < self.segments.len();
            if has_next && !segment.is_turn() && self.distance >= segment.end() {
                index += 1;
            } else {
                break;
            }
        }
        self.segment_index = Some(index);
        self.segments.get(index).map(|_| index)
    }

    fn advance_turn(&mut self, index: usize, segment: &PathSegment, delta_seconds: f32) {
        let current = self.transform.rotation;
        let target = self.apply_rotation_locks(segment.rotation_hint());
        let limited = self.limiter.limit(current, target, delta_seconds);
        let is_final = index + 1 == self.segments.len();
        let left = limited.max_axis_delta(target);
        if left > TURN_COMPLETE_TOLERANCE_DEGREES {
            self.transform.rotation = limited;
            if is_final {
                let next_step = self.config.max_rotation_speed * delta_seconds;
                let derived = if left <= next_step {
                    MovementPhase::Ending
                } else {
                    MovementPhase::Middle
                };
                self.step_phase(derived);
            }
            return;
        }

        self.transform.rotation = target;
        if is_final {
            self.step_phase(MovementPhase::Done);
        } else {
            self.segment_index = Some(index + 1);
        }
    }

    fn advance_along_path(
        &mut self,
        index: usize,
        delta_seconds: f32,
        animation_step: Option<f32>,
    ) {
        let Some(length) = self.curve.as_ref().map(PathCurve::length) else {
            self.step_phase(MovementPhase::Done);
            return;
        };
        let effective_end = (length - self.config.stopping_distance).max(0.0);
        let speed = self.config.max_speed_for(self.mode);

        let step = animation_step.unwrap_or(speed * delta_seconds);
        let mut target = self.distance + step;
        if animation_step.is_none()
            && self.phase == MovementPhase::Ending
            && self.config.stopping_time > 0.0
        {
            target = target.min(self.ramp_distance(effective_end, delta_seconds));
        }
        let boundary = self.mode_boundary(index, target);
        self.distance = target
            .min(effective_end)
            .min(boundary)
            .clamp(0.0, length)
            .max(self.distance);

        if let Some(curve) = self.curve.as_ref() {
            let on_path = curve.transform_at_distance(self.distance);
            let desired = self.apply_rotation_locks(on_path.rotation);
            self.transform.rotation = self
                .limiter
                .limit(self.transform.rotation, desired, delta_seconds);
            self.transform.location = on_path.location;
        }

        let derived = if self.distance >= effective_end {
            MovementPhase::Done
        } else {
            self.derive_phase(effective_end, speed)
        };
        self.step_phase(derived);
    }

    /// Distance along an ease-out curve that halts at `effective_end` after `stopping_time`.
    fn ramp_distance(&mut self, effective_end: f32, delta_seconds: f32) -> f32 {
        let stopping_time = self.config.stopping_time;
        let distance = self.distance;
        let ramp = self.ending.get_or_insert(EndingRamp {
            start_remaining: (effective_end - distance).max(0.0),
            elapsed: 0.0,
        });
        ramp.elapsed += delta_seconds;
        let left = (1.0 - ramp.elapsed / stopping_time).clamp(0.0, 1.0);
        effective_end - ramp.start_remaining * left * left
    }

    /// Start of the first segment ahead that does not allow the current mode, when `target`
    /// would carry the agent past it.
    fn mode_boundary(&self, index: usize, target: f32) -> f32 {
        self.segments
            .iter()
            .skip(index + 1)
            .take_while(|segment| segment.start() < target)
            .find(|segment| !segment.is_turn() && !segment.movement_modes().contains(self.mode))
            .map_or(f32::INFINITY, PathSegment::start)
    }

    fn derive_phase(&self, effective_end: f32, speed: f32) -> MovementPhase {
        let buffer = self.config.phase_buffer_distance;
        let braking = if self.config.stopping_time > 0.0 {
            0.5 * speed * self.config.stopping_time
        } else {
            0.0
        };
        let remaining = effective_end - self.distance;
        if remaining <= buffer.max(braking) {
            MovementPhase::Ending
        } else if self.distance < buffer {
            MovementPhase::Beginning
        } else {
            MovementPhase::Middle
        }
    }

    /// Moves at most one phase towards `derived` per frame, so every phase is visited in
    /// order. Reaching `Done` ends the traversal.
    fn step_phase(&mut self, derived: MovementPhase) {
        if derived <= self.phase {
            return;
        }
        let next = self.phase.next();
        debug!(
            old = self.phase.as_token(),
            new = next.as_token(),
            distance = self.distance,
            "movement_phase_changed"
        );
        self.phase = next;
        if next == MovementPhase::Done {
            self.finish();
        }
    }

    fn finish(&mut self) {
        self.segment_index = None;
        self.ending = None;
        if self.mode != MovementMode::Stationary {
            self.change_mode(MovementMode::Stationary);
        }
        self.hide_path();
        if self.end_notified {
            return;
        }
        self.end_notified = true;
        info!(
            distance = self.distance,
            x = self.transform.location.x,
            y = self.transform.location.y,
            "movement_ended"
        );
        for observer in &mut self.observers {
            observer.on_movement_ended();
        }
    }

    fn apply_idle_displacement(&mut self) {
        let displacement = self.consume_animation_displacement();
        if displacement.is_identity() {
            return;
        }
        let turned = self.transform.rotation + displacement.rotation;
        self.transform = Transform::new(
            self.transform.location + displacement.location,
            self.apply_rotation_locks(turned),
        );
    }
}
