use crate::math::{Rotator, Transform, Vec3};

/// Continuous path through world space, parameterised by arc length.
pub trait PathCurve {
    fn length(&self) -> f32;

    /// Location and facing at `distance`, clamped to `[0, length]`.
    fn transform_at_distance(&self, distance: f32) -> Transform;

    /// Arc length of the curve point nearest to `position`.
    fn distance_closest_to(&self, position: Vec3) -> f32;

    fn location_at_distance(&self, distance: f32) -> Vec3 {
        self.transform_at_distance(distance).location
    }
}

/// Piecewise-linear curve through a list of points.
#[derive(Debug, Clone, PartialEq)]
pub struct PolylineCurve {
    points: Vec<Vec3>,
    cumulative: Vec<f32>,
}

impl PolylineCurve {
    /// Consecutive duplicate points are dropped. An empty input yields a single point at the
    /// origin.
    pub fn new(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut deduped: Vec<Vec3> = Vec::new();
        for point in points {
            if deduped
                .last()
                .is_some_and(|last| last.distance(point) <= f32::EPSILON)
            {
                continue;
            }
            deduped.push(point);
        }
        if deduped.is_empty() {
            deduped.push(Vec3::ZERO);
        }

        let mut cumulative = Vec::with_capacity(deduped.len());
        let mut total = 0.0f32;
        cumulative.push(total);
        for pair in deduped.windows(2) {
            total += pair[0].distance(pair[1]);
            cumulative.push(total);
        }

        Self {
            points: deduped,
            cumulative,
        }
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Arc length at which each point sits.
    pub fn point_distances(&self) -> &[f32] {
        &self.cumulative
    }

    fn span_index(&self, distance: f32) -> usize {
        let span_count = self.points.len().saturating_sub(1);
        if span_count == 0 {
            return 0;
        }
        let index = self.cumulative.partition_point(|start| *start <= distance);
        index.saturating_sub(1).min(span_count - 1)
    }

    fn span_direction(&self, span: usize) -> Vec3 {
        match (self.points.get(span), self.points.get(span + 1)) {
            (Some(from), Some(to)) => *to - *from,
            _ => Vec3::ZERO,
        }
    }
}

impl PathCurve for PolylineCurve {
    fn length(&self) -> f32 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    fn transform_at_distance(&self, distance: f32) -> Transform {
        let distance = if distance.is_finite() {
            distance.clamp(0.0, self.length())
        } else {
            0.0
        };
        if self.points.len() < 2 {
            return Transform::new(self.points[0], Rotator::ZERO);
        }

        let span = self.span_index(distance);
        let span_start = self.cumulative[span];
        let span_length = self.cumulative[span + 1] - span_start;
        let t = if span_length > 0.0 {
            (distance - span_start) / span_length
        } else {
            0.0
        };
        let location = self.points[span].lerp(self.points[span + 1], t.clamp(0.0, 1.0));
        Transform::new(location, Rotator::from_direction(self.span_direction(span)))
    }

    fn distance_closest_to(&self, position: Vec3) -> f32 {
        if self.points.len() < 2 {
            return 0.0;
        }
        let mut best_distance = 0.0f32;
        let mut best_gap = f32::INFINITY;
        for span in 0..self.points.len() - 1 {
            let from = self.points[span];
            let direction = self.span_direction(span);
            let length_squared = direction.dot(direction);
            let t = if length_squared > 0.0 {
                ((position - from).dot(direction) / length_squared).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let projected = from + direction * t;
            let gap = projected.distance(position);
            if gap < best_gap {
                best_gap = gap;
                let span_length = self.cumulative[span + 1] - self.cumulative[span];
                best_distance = self.cumulative[span] + span_length * t;
            }
        }
        best_distance
    }
}
