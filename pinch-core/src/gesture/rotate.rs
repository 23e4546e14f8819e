//! Two-finger twist recognizer.

use nalgebra::Point3;

use super::{Gesture, GestureCore, GestureState, Listener, ManipulationBase};
use crate::config::{GestureConfig, RotateConfig};
use crate::geometry::signed_angle;
use crate::projection::Camera;

/// Rotation deltas smaller than this (degrees) are not published.
pub const ROTATION_EPSILON: f32 = 1e-5;

/// Rotates a target by the signed angle the line between two touch points
/// turns about the transform plane normal.
pub struct RotateGesture {
    base: ManipulationBase,
    threshold_degrees: f32,
    buffer: f32,
    rotating: bool,
    local_delta_rotation: f32,
    pivot_point: Option<Point3<f32>>,
    listeners: Vec<Listener<RotateGesture>>,
}

impl RotateGesture {
    pub fn new(gesture: &GestureConfig, config: &RotateConfig) -> Self {
        Self {
            base: ManipulationBase::new(gesture),
            threshold_degrees: config.threshold_degrees,
            buffer: 0.0,
            rotating: false,
            local_delta_rotation: 0.0,
            pivot_point: None,
            listeners: Vec::new(),
        }
    }

    pub fn base(&self) -> &ManipulationBase {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut ManipulationBase {
        &mut self.base
    }

    pub fn threshold_degrees(&self) -> f32 {
        self.threshold_degrees
    }

    /// Counter-clockwise rotation about the plane normal published by the
    /// last update, in degrees.
    pub fn local_delta_rotation(&self) -> f32 {
        self.local_delta_rotation
    }

    pub fn pivot_point(&self) -> Option<Point3<f32>> {
        self.pivot_point
    }

    pub fn is_rotating(&self) -> bool {
        self.rotating
    }
}

impl Default for RotateGesture {
    fn default() -> Self {
        Self::new(&GestureConfig::default(), &RotateConfig::default())
    }
}

impl Gesture for RotateGesture {
    const MIN_POINTS: usize = 2;

    fn core(&self) -> &GestureCore {
        &self.base.core
    }

    fn core_mut(&mut self) -> &mut GestureCore {
        &mut self.base.core
    }

    fn listeners_mut(&mut self) -> &mut Vec<Listener<Self>> {
        &mut self.listeners
    }

    fn recognize(&mut self, camera: &Camera) {
        let Some(frame) = self.base.frame() else {
            return;
        };
        if frame.current.distance() < self.base.min_points_distance_px() {
            return;
        }
        let plane = *self.base.transform_plane();
        let (Some(old_world), Some(new_world)) = (
            frame.previous.project(camera, &plane),
            frame.current.project(camera, &plane),
        ) else {
            tracing::trace!("touch points miss the transform plane");
            return;
        };

        let angle = signed_angle(&old_world.vector(), &new_world.vector(), &plane.normal);
        let mut delta = 0.0;
        if self.rotating {
            delta = angle;
        } else {
            self.buffer += angle;
            if self.buffer.abs() >= self.threshold_degrees {
                self.rotating = true;
                // Only the part past the threshold is applied
                delta = self.buffer - self.threshold_degrees.copysign(self.buffer);
                tracing::debug!(buffer = self.buffer, delta, "rotation threshold crossed");
            }
        }

        if delta.abs() <= ROTATION_EPSILON {
            return;
        }
        let old_center = frame.previous.center();
        let new_center = frame.current.center();
        let (Some(old_world_center), Some(new_world_center)) = (
            self.base.project(camera, &old_center),
            self.base.project(camera, &new_center),
        ) else {
            return;
        };

        self.base
            .record_centers((new_center, old_center), (new_world_center, old_world_center));
        self.local_delta_rotation = delta;

        if self.state() == GestureState::Possible {
            self.pivot_point = Some(new_world_center);
            self.set_state(GestureState::Began);
        } else {
            self.set_state(GestureState::Changed);
        }
    }

    fn reset(&mut self) {
        self.buffer = 0.0;
        self.rotating = false;
        self.base.clear_centers();
    }

    fn restart(&mut self) {
        self.local_delta_rotation = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::PointId;
    use nalgebra::Point2;

    fn setup() -> (Camera, RotateGesture) {
        let camera = Camera::orthographic(100, 100, 10.0);
        let gesture_config = GestureConfig {
            dots_per_cm: 20.0,
            ..GestureConfig::default()
        };
        let config = RotateConfig {
            threshold_degrees: 10.0,
        };
        (camera, RotateGesture::new(&gesture_config, &config))
    }

    /// Place the two points 60 px apart around the screen center at `degrees`
    /// (counter-clockwise as seen on screen).
    fn turn(gesture: &mut RotateGesture, camera: &Camera, degrees: f32) {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let offset = nalgebra::Vector2::new(cos * 30.0, -sin * 30.0);
        let center = Point2::new(50.0, 50.0);
        gesture.move_point(PointId(0), center - offset);
        gesture.move_point(PointId(1), center + offset);
        gesture.update(camera);
    }

    fn press(gesture: &mut RotateGesture) {
        gesture.begin_point(PointId(0), Point2::new(20.0, 50.0));
        gesture.begin_point(PointId(1), Point2::new(80.0, 50.0));
    }

    #[test]
    fn test_small_twist_stays_possible() {
        let (camera, mut gesture) = setup();
        press(&mut gesture);
        for degrees in [2.0, 4.0, 6.0, 8.0] {
            turn(&mut gesture, &camera, degrees);
        }
        assert_eq!(gesture.state(), GestureState::Possible);
        assert_eq!(gesture.local_delta_rotation(), 0.0);
    }

    #[test]
    fn test_activation_publishes_overshoot() {
        let (camera, mut gesture) = setup();
        press(&mut gesture);
        for degrees in [4.0, 8.0, 12.0] {
            turn(&mut gesture, &camera, degrees);
        }
        assert_eq!(gesture.state(), GestureState::Began);
        assert!((gesture.local_delta_rotation() - 2.0).abs() < 1e-2);
        assert!(gesture.pivot_point().unwrap().coords.norm() < 1e-3);
    }

    #[test]
    fn test_counter_clockwise_screen_turn_is_positive() {
        let (camera, mut gesture) = setup();
        press(&mut gesture);
        for degrees in [4.0, 8.0, 12.0, 20.0] {
            turn(&mut gesture, &camera, degrees);
        }
        assert_eq!(gesture.state(), GestureState::Changed);
        assert!((gesture.local_delta_rotation() - 8.0).abs() < 1e-2);
    }

    #[test]
    fn test_clockwise_turn_is_negative() {
        let (camera, mut gesture) = setup();
        press(&mut gesture);
        for degrees in [-6.0, -12.0, -18.0] {
            turn(&mut gesture, &camera, degrees);
        }
        assert!(gesture.is_rotating());
        assert!(gesture.local_delta_rotation() < 0.0);
    }

    #[test]
    fn test_release_restarts_neutral() {
        let (camera, mut gesture) = setup();
        press(&mut gesture);
        for degrees in [6.0, 12.0, 18.0] {
            turn(&mut gesture, &camera, degrees);
        }
        gesture.end_point(PointId(1));
        assert_eq!(gesture.state(), GestureState::Possible);
        assert_eq!(gesture.local_delta_rotation(), 0.0);
        assert!(!gesture.is_rotating());
    }
}
