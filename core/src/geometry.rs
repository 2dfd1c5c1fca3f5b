//! Small geometry helpers shared by the systems.

use glam::Vec2;
use serde::Deserialize;

/// Serializable `{ x, y }` pair used by configuration files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct Point {
    /// Horizontal coordinate in world units.
    pub x: f32,
    /// Vertical coordinate in world units.
    pub y: f32,
}

impl Point {
    /// Creates a new point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<Point> for Vec2 {
    fn from(point: Point) -> Self {
        Vec2::new(point.x, point.y)
    }
}

impl From<Vec2> for Point {
    fn from(value: Vec2) -> Self {
        Self::new(value.x, value.y)
    }
}

/// Reports whether both coordinates are finite numbers.
#[must_use]
pub fn is_finite_point(point: Vec2) -> bool {
    point.x.is_finite() && point.y.is_finite()
}

/// Closest point to `point` on the segment `a..b`.
#[must_use]
pub fn closest_on_segment(point: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let segment = b - a;
    let length_sq = segment.length_squared();
    if length_sq <= f32::EPSILON {
        return a;
    }
    let t = ((point - a).dot(segment) / length_sq).clamp(0.0, 1.0);
    a + segment * t
}

/// Closest point to `point` on any of the provided polylines.
///
/// Single-point polylines contribute their only vertex.
#[must_use]
pub fn closest_on_paths<'a, I>(point: Vec2, paths: I) -> Option<Vec2>
where
    I: IntoIterator<Item = &'a [Vec2]>,
{
    let mut best: Option<(f32, Vec2)> = None;
    let mut consider = |candidate: Vec2| {
        let distance = candidate.distance_squared(point);
        if best.map_or(true, |(current, _)| distance < current) {
            best = Some((distance, candidate));
        }
    };

    for path in paths {
        if let [only] = path {
            consider(*only);
            continue;
        }
        for pair in path.windows(2) {
            consider(closest_on_segment(point, pair[0], pair[1]));
        }
    }
    best.map(|(_, candidate)| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closest_on_segment_clamps_to_endpoints() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(10.0, 0.0);
        assert_eq!(closest_on_segment(Vec2::new(-5.0, 3.0), a, b), a);
        assert_eq!(closest_on_segment(Vec2::new(15.0, 3.0), a, b), b);
        assert_eq!(
            closest_on_segment(Vec2::new(4.0, 3.0), a, b),
            Vec2::new(4.0, 0.0)
        );
    }

    #[test]
    fn closest_on_paths_prefers_nearest_polyline() {
        let first = vec![Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0)];
        let second = vec![Vec2::new(0.0, 50.0), Vec2::new(100.0, 50.0)];
        let paths = [first.as_slice(), second.as_slice()];
        let closest = closest_on_paths(Vec2::new(30.0, 40.0), paths).expect("paths present");
        assert!(closest.distance(Vec2::new(30.0, 50.0)) < 1e-4, "got {closest}");
    }

    #[test]
    fn closest_on_paths_handles_empty_input() {
        let paths: [&[Vec2]; 0] = [];
        assert!(closest_on_paths(Vec2::ZERO, paths).is_none());
    }

    #[test]
    fn non_finite_points_are_detected() {
        assert!(is_finite_point(Vec2::new(1.0, 2.0)));
        assert!(!is_finite_point(Vec2::new(f32::NAN, 2.0)));
        assert!(!is_finite_point(Vec2::new(1.0, f32::INFINITY)));
    }
}
