use nalgebra::{Point2, Point3, Vector2};

use super::GestureCore;
use crate::config::GestureConfig;
use crate::geometry::{PointPair, TwoPointFrame};
use crate::projection::{screen_to_plane, Camera, Plane};

/// Tracked points, transform plane and published centers of a manipulation
/// gesture.
#[derive(Debug, Clone)]
pub struct ManipulationBase {
    pub(super) core: GestureCore,
    plane: Plane,
    dots_per_cm: f32,
    min_points_distance_cm: f32,
    screen_position: Option<Point2<f32>>,
    previous_screen_position: Option<Point2<f32>>,
    world_center: Option<Point3<f32>>,
    previous_world_center: Option<Point3<f32>>,
}

impl ManipulationBase {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            core: GestureCore::new(),
            plane: config.transform_plane.to_plane(),
            dots_per_cm: config.dots_per_cm,
            min_points_distance_cm: config.min_points_distance_cm,
            screen_position: None,
            previous_screen_position: None,
            world_center: None,
            previous_world_center: None,
        }
    }

    pub fn core(&self) -> &GestureCore {
        &self.core
    }

    pub fn transform_plane(&self) -> &Plane {
        &self.plane
    }

    /// Replace the plane touches are projected onto, e.g. after the target
    /// moved or rotated.
    pub fn set_transform_plane(&mut self, plane: Plane) {
        self.plane = plane;
    }

    pub fn dots_per_cm(&self) -> f32 {
        self.dots_per_cm
    }

    /// Convert a physical length into screen pixels.
    pub fn cm_to_pixels(&self, cm: f32) -> f32 {
        cm * self.dots_per_cm
    }

    /// Closest the two points may be before frames are ignored.
    pub fn min_points_distance_px(&self) -> f32 {
        self.cm_to_pixels(self.min_points_distance_cm)
    }

    /// Screen center of the points when the last delta was published.
    pub fn screen_position(&self) -> Option<Point2<f32>> {
        self.screen_position
    }

    pub fn previous_screen_position(&self) -> Option<Point2<f32>> {
        self.previous_screen_position
    }

    /// Projected world center when the last delta was published.
    pub fn world_center(&self) -> Option<Point3<f32>> {
        self.world_center
    }

    pub fn previous_world_center(&self) -> Option<Point3<f32>> {
        self.previous_world_center
    }

    /// Current and previous positions of the first two tracked points.
    pub fn frame(&self) -> Option<TwoPointFrame> {
        match self.core.points() {
            [first, second, ..] => Some(TwoPointFrame::new(
                PointPair::new(first.position, second.position),
                PointPair::new(first.previous_position, second.previous_position),
            )),
            _ => None,
        }
    }

    /// Current and previous centroid of all tracked points.
    pub fn centroid(&self) -> Option<(Point2<f32>, Point2<f32>)> {
        let points = self.core.points();
        if points.is_empty() {
            return None;
        }
        let count = points.len() as f32;
        let (current, previous) = points.iter().fold(
            (Vector2::<f32>::zeros(), Vector2::<f32>::zeros()),
            |(current, previous), p| (current + p.position.coords, previous + p.previous_position.coords),
        );
        Some((Point2::from(current / count), Point2::from(previous / count)))
    }

    pub fn project(&self, camera: &Camera, screen: &Point2<f32>) -> Option<Point3<f32>> {
        screen_to_plane(screen, camera, &self.plane)
    }

    pub(super) fn record_centers(
        &mut self,
        screen: (Point2<f32>, Point2<f32>),
        world: (Point3<f32>, Point3<f32>),
    ) {
        self.screen_position = Some(screen.0);
        self.previous_screen_position = Some(screen.1);
        self.world_center = Some(world.0);
        self.previous_world_center = Some(world.1);
    }

    pub(super) fn clear_centers(&mut self) {
        self.screen_position = None;
        self.previous_screen_position = None;
        self.world_center = None;
        self.previous_world_center = None;
    }
}
