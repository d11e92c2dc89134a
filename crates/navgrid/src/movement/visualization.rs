use super::curve::PathCurve;
use super::types::PathSegment;

/// Draws the path an agent is about to follow.
pub trait VisualizationSink {
    fn show_segments(&mut self, curve: &dyn PathCurve, segments: &[PathSegment]);

    fn hide_segments(&mut self);
}

/// Segments trimmed so that nothing is drawn closer than `offset` to the path start.
/// Turn-in-place segments have no extent and are left out.
pub fn visible_segments(segments: &[PathSegment], offset: f32) -> Vec<PathSegment> {
    segments
        .iter()
        .filter(|segment| !segment.is_turn())
        .filter_map(|segment| {
            let start = segment.start().max(offset);
            if start >= segment.end() {
                return None;
            }
            PathSegment::new(
                segment.movement_modes(),
                start,
                segment.end(),
                segment.rotation_hint(),
            )
            .ok()
        })
        .collect()
}
