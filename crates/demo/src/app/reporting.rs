use navgrid::{MovementMode, MovementObserver, PathCurve, PathSegment, VisualizationSink};
use tracing::{debug, info};

/// Writes movement notifications to the log.
pub(crate) struct LoggingObserver {
    agent: &'static str,
}

impl LoggingObserver {
    pub(crate) fn new(agent: &'static str) -> Self {
        Self { agent }
    }
}

impl MovementObserver for LoggingObserver {
    fn on_movement_mode_changed(&mut self, old: MovementMode, new: MovementMode) {
        info!(agent = self.agent, old = %old, new = %new, "mode_changed");
    }

    fn on_movement_ended(&mut self) {
        info!(agent = self.agent, "movement_ended");
    }
}

/// Stands in for an in-world path preview by logging what would be drawn.
pub(crate) struct LoggedPathPreview {
    agent: &'static str,
}

impl LoggedPathPreview {
    pub(crate) fn new(agent: &'static str) -> Self {
        Self { agent }
    }
}

impl VisualizationSink for LoggedPathPreview {
    fn show_segments(&mut self, curve: &dyn PathCurve, segments: &[PathSegment]) {
        info!(
            agent = self.agent,
            curve_length = curve.length(),
            segments = segments.len(),
            "path_shown"
        );
        for segment in segments {
            let modes: Vec<&str> = segment
                .movement_modes()
                .iter()
                .map(MovementMode::as_token)
                .collect();
            let from = curve.location_at_distance(segment.start());
            let to = curve.location_at_distance(segment.end());
            debug!(
                agent = self.agent,
                start = segment.start(),
                end = segment.end(),
                modes = ?modes,
                from = ?(from.x, from.y, from.z),
                to = ?(to.x, to.y, to.z),
                "path_segment"
            );
        }
    }

    fn hide_segments(&mut self) {
        debug!(agent = self.agent, "path_hidden");
    }
}
