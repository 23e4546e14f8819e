//! Two-point geometry: distances, centers and deltas derived from the two
//! tracked touch points, in screen space and projected onto the world plane.

use nalgebra::{Point2, Point3, Vector2, Vector3};

use crate::projection::{screen_to_plane, Camera, Plane};

/// Vectors shorter than this are treated as degenerate.
pub const DEGENERATE_EPSILON: f32 = 1e-6;

/// Euclidean screen-space distance.
pub fn distance(a: &Point2<f32>, b: &Point2<f32>) -> f32 {
    (b - a).norm()
}

/// Arithmetic mean of two points.
pub fn center(a: &Point2<f32>, b: &Point2<f32>) -> Point2<f32> {
    Point2::from((a.coords + b.coords) * 0.5)
}

/// Signed angle in degrees from `from` to `to`, measured about `normal`.
/// Both vectors are flattened onto the plane of `normal` first; degenerate
/// input yields zero.
pub fn signed_angle(from: &Vector3<f32>, to: &Vector3<f32>, normal: &Vector3<f32>) -> f32 {
    let from = from - normal * normal.dot(from);
    let to = to - normal * normal.dot(to);
    if from.norm() < DEGENERATE_EPSILON || to.norm() < DEGENERATE_EPSILON {
        return 0.0;
    }
    let sin = normal.dot(&from.cross(&to));
    let cos = from.dot(&to);
    sin.atan2(cos).to_degrees()
}

/// Two screen positions taken at the same instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointPair {
    pub first: Point2<f32>,
    pub second: Point2<f32>,
}

impl PointPair {
    pub fn new(first: Point2<f32>, second: Point2<f32>) -> Self {
        Self { first, second }
    }

    pub fn distance(&self) -> f32 {
        distance(&self.first, &self.second)
    }

    pub fn center(&self) -> Point2<f32> {
        center(&self.first, &self.second)
    }

    /// Vector from the first point to the second.
    pub fn vector(&self) -> Vector2<f32> {
        self.second - self.first
    }

    /// Project both points onto `plane`. `None` if either misses it.
    pub fn project(&self, camera: &Camera, plane: &Plane) -> Option<WorldPair> {
        Some(WorldPair {
            first: screen_to_plane(&self.first, camera, plane)?,
            second: screen_to_plane(&self.second, camera, plane)?,
        })
    }
}

/// Two points projected onto the transform plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldPair {
    pub first: Point3<f32>,
    pub second: Point3<f32>,
}

impl WorldPair {
    pub fn distance(&self) -> f32 {
        (self.second - self.first).norm()
    }

    pub fn center(&self) -> Point3<f32> {
        Point3::from((self.first.coords + self.second.coords) * 0.5)
    }

    pub fn vector(&self) -> Vector3<f32> {
        self.second - self.first
    }
}

/// Current and previous positions of the two tracked points for one update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoPointFrame {
    pub current: PointPair,
    pub previous: PointPair,
}

impl TwoPointFrame {
    pub fn new(current: PointPair, previous: PointPair) -> Self {
        Self { current, previous }
    }

    /// Change in screen distance since the previous update.
    pub fn delta_distance(&self) -> f32 {
        self.current.distance() - self.previous.distance()
    }

    /// Per-point screen movement since the previous update.
    pub fn deltas(&self) -> (Vector2<f32>, Vector2<f32>) {
        (
            self.current.first - self.previous.first,
            self.current.second - self.previous.second,
        )
    }
}
