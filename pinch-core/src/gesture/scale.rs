//! Pinch-to-scale recognizer over the first two tracked points.

use nalgebra::{Point2, Point3, Vector2};

use super::{Gesture, GestureCore, GestureState, Listener, ManipulationBase};
use crate::config::{GestureConfig, ScaleConfig};
use crate::geometry::{self, TwoPointFrame, DEGENERATE_EPSILON};
use crate::projection::Camera;

/// Scale deltas closer to 1 than this are not published.
pub const SCALE_EPSILON: f32 = 1e-5;

/// Scales a target by the ratio of the projected distance between two
/// touch points.
///
/// Nothing is published until the points have spread or pinched by
/// `threshold_cm`. The movement buffered below the threshold acts as a dead
/// zone: the first published delta only carries the overshoot past it.
pub struct ScaleGesture {
    base: ManipulationBase,
    threshold_cm: f32,
    min_scale: Vector2<f32>,
    max_scale: Vector2<f32>,
    buffer: f32,
    scaling: bool,
    local_delta_scale: f32,
    pivot_point: Option<Point3<f32>>,
    listeners: Vec<Listener<ScaleGesture>>,
}

impl ScaleGesture {
    pub fn new(gesture: &GestureConfig, config: &ScaleConfig) -> Self {
        Self {
            base: ManipulationBase::new(gesture),
            threshold_cm: config.threshold_cm,
            min_scale: config.min_scale(),
            max_scale: config.max_scale(),
            buffer: 0.0,
            scaling: false,
            local_delta_scale: 1.0,
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

    pub fn threshold_cm(&self) -> f32 {
        self.threshold_cm
    }

    pub fn set_threshold_cm(&mut self, threshold_cm: f32) {
        self.threshold_cm = threshold_cm.max(0.0);
    }

    /// Lower scale bound for whoever applies the deltas. Not enforced here.
    pub fn min_scale(&self) -> Vector2<f32> {
        self.min_scale
    }

    pub fn max_scale(&self) -> Vector2<f32> {
        self.max_scale
    }

    pub fn set_scale_bounds(&mut self, min: Vector2<f32>, max: Vector2<f32>) {
        self.min_scale = min;
        self.max_scale = max;
    }

    /// Scale change published by the last update: 1 is no change, 0.5 halves
    /// and 2 doubles.
    pub fn local_delta_scale(&self) -> f32 {
        self.local_delta_scale
    }

    /// World point the scale is applied around, fixed when the gesture
    /// begins.
    pub fn pivot_point(&self) -> Option<Point3<f32>> {
        self.pivot_point
    }

    pub fn is_scaling(&self) -> bool {
        self.scaling
    }

    /// Scale factor implied by two screen points and their movement since the
    /// previous frame. Zero distances yield 1.
    pub fn scale_factor(
        position1: Point2<f32>,
        position2: Point2<f32>,
        delta1: Vector2<f32>,
        delta2: Vector2<f32>,
    ) -> f32 {
        let old_position1 = position1 - delta1;
        let old_position2 = position2 - delta2;

        let distance = geometry::distance(&position1, &position2);
        let old_distance = geometry::distance(&old_position1, &old_position2);

        if distance == 0.0 || old_distance == 0.0 {
            return 1.0;
        }
        distance / old_distance
    }

    /// Screen translation that keeps an object at `object_position` under the
    /// fingers while it is scaled by `scale_factor`.
    pub fn translation_delta(
        position1: Point2<f32>,
        position2: Point2<f32>,
        old_position1: Point2<f32>,
        old_position2: Point2<f32>,
        object_position: Point2<f32>,
        scale_factor: f32,
    ) -> Vector2<f32> {
        let moved1 = position1 + (object_position - old_position1) * scale_factor;
        let moved2 = position2 + (object_position - old_position2) * scale_factor;
        geometry::center(&moved1, &moved2) - object_position
    }

    /// Projected length of the span the fingers had when the buffered
    /// movement reached the threshold.
    fn activation_span(&self, camera: &Camera, frame: &TwoPointFrame, threshold_px: f32) -> Option<f32> {
        let overshoot = self.buffer - threshold_px.copysign(self.buffer);
        let start_px = frame.current.distance() - overshoot;
        if start_px <= DEGENERATE_EPSILON {
            return None;
        }

        let direction = if frame.previous.distance() > DEGENERATE_EPSILON {
            frame.previous.vector().normalize()
        } else {
            frame.current.vector().normalize()
        };
        let half = direction * (start_px * 0.5);
        let center = frame.previous.center();
        let a = self.base.project(camera, &(center + half))?;
        let b = self.base.project(camera, &(center - half))?;
        Some((a - b).norm())
    }
}

impl Default for ScaleGesture {
    fn default() -> Self {
        Self::new(&GestureConfig::default(), &ScaleConfig::default())
    }
}

impl Gesture for ScaleGesture {
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
            tracing::trace!(distance = frame.current.distance(), "points too close, skipping frame");
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

        let mut delta_scale = 1.0;
        if self.scaling {
            let old_distance = old_world.distance();
            if old_distance > DEGENERATE_EPSILON {
                delta_scale = new_world.distance() / old_distance;
            }
        } else {
            self.buffer += frame.delta_distance();
            let threshold_px = self.base.cm_to_pixels(self.threshold_cm);
            if self.buffer * self.buffer >= threshold_px * threshold_px {
                self.scaling = true;
                tracing::debug!(buffer = self.buffer, threshold_px, "scale threshold crossed");
                if let Some(start) = self.activation_span(camera, &frame, threshold_px) {
                    if start > DEGENERATE_EPSILON {
                        delta_scale = new_world.distance() / start;
                    }
                }
            }
        }

        if (delta_scale - 1.0).abs() <= SCALE_EPSILON {
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
        self.local_delta_scale = delta_scale;

        if self.state() == GestureState::Possible {
            self.pivot_point = Some(new_world_center);
            self.set_state(GestureState::Began);
        } else {
            self.set_state(GestureState::Changed);
        }
    }

    fn reset(&mut self) {
        self.buffer = 0.0;
        self.scaling = false;
        self.base.clear_centers();
    }

    fn restart(&mut self) {
        self.local_delta_scale = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::PointId;
    use crate::projection::Plane;
    use std::cell::RefCell;
    use std::rc::Rc;

    // 100x100 px viewport showing 10x10 world units, 20 px per cm
    fn setup() -> (Camera, ScaleGesture) {
        let camera = Camera::orthographic(100, 100, 10.0);
        let gesture_config = GestureConfig {
            dots_per_cm: 20.0,
            min_points_distance_cm: 0.5,
            ..GestureConfig::default()
        };
        let scale_config = ScaleConfig {
            threshold_cm: 1.0,
            ..ScaleConfig::default()
        };
        (camera, ScaleGesture::new(&gesture_config, &scale_config))
    }

    fn spread(gesture: &mut ScaleGesture, camera: &Camera, half_width: f32) {
        gesture.move_point(PointId(0), Point2::new(50.0 - half_width, 50.0));
        gesture.move_point(PointId(1), Point2::new(50.0 + half_width, 50.0));
        gesture.update(camera);
    }

    fn press(gesture: &mut ScaleGesture, half_width: f32) {
        gesture.begin_point(PointId(0), Point2::new(50.0 - half_width, 50.0));
        gesture.begin_point(PointId(1), Point2::new(50.0 + half_width, 50.0));
    }

    #[test]
    fn test_scale_factor_without_movement() {
        let cases = [
            (Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)),
            (Point2::new(-3.0, 7.5), Point2::new(12.0, -4.0)),
            (Point2::new(100.0, 100.0), Point2::new(100.5, 100.0)),
        ];
        for (p1, p2) in cases {
            let factor = ScaleGesture::scale_factor(p1, p2, Vector2::zeros(), Vector2::zeros());
            assert_eq!(factor, 1.0);
        }
    }

    #[test]
    fn test_scale_factor_degenerate() {
        let p = Point2::new(5.0, 5.0);
        assert_eq!(ScaleGesture::scale_factor(p, p, Vector2::zeros(), Vector2::zeros()), 1.0);
    }

    #[test]
    fn test_scale_factor_spread() {
        let factor = ScaleGesture::scale_factor(
            Point2::new(0.0, 0.0),
            Point2::new(20.0, 0.0),
            Vector2::zeros(),
            Vector2::new(10.0, 0.0),
        );
        assert!((factor - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_translation_delta_without_scale() {
        let delta = ScaleGesture::translation_delta(
            Point2::new(10.0, 0.0),
            Point2::new(30.0, 0.0),
            Point2::new(0.0, 0.0),
            Point2::new(20.0, 0.0),
            Point2::new(10.0, 5.0),
            1.0,
        );
        assert!((delta - Vector2::new(10.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn test_below_threshold_stays_possible() {
        let (camera, mut gesture) = setup();
        let changes = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&changes);
        gesture.subscribe(move |_| *counter.borrow_mut() += 1);

        press(&mut gesture, 30.0);
        // 3 px per side per frame, 18 px total, threshold is 20 px
        for step in 1..=3 {
            spread(&mut gesture, &camera, 30.0 + step as f32 * 3.0);
        }

        assert_eq!(gesture.state(), GestureState::Possible);
        assert_eq!(*changes.borrow(), 0);
        assert_eq!(gesture.local_delta_scale(), 1.0);
    }

    #[test]
    fn test_jitter_back_and_forth_never_activates() {
        let (camera, mut gesture) = setup();
        press(&mut gesture, 30.0);
        for step in 0..20 {
            let half = if step % 2 == 0 { 34.0 } else { 30.0 };
            spread(&mut gesture, &camera, half);
        }
        assert_eq!(gesture.state(), GestureState::Possible);
    }

    #[test]
    fn test_activation_publishes_only_overshoot() {
        let (camera, mut gesture) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        gesture.subscribe(move |change| {
            sink.borrow_mut()
                .push((change.state, change.gesture.local_delta_scale()))
        });

        press(&mut gesture, 30.0);
        // Distance 60 -> 68 -> 76 -> 84: buffer 8, 16, 24
        for half in [34.0, 38.0, 42.0] {
            spread(&mut gesture, &camera, half);
        }

        let log = log.borrow();
        assert_eq!(log.len(), 1);
        let (state, delta) = log[0];
        assert_eq!(state, GestureState::Began);
        // 4 px past the threshold: 84 / 80, not the whole buffer 84 / 60
        assert!((delta - 84.0 / 80.0).abs() < 1e-3);
        assert!((delta - 84.0 / 60.0).abs() > 0.1);
    }

    #[test]
    fn test_changed_uses_projected_ratio() {
        let (camera, mut gesture) = setup();
        press(&mut gesture, 30.0);
        for half in [34.0, 38.0, 42.0] {
            spread(&mut gesture, &camera, half);
        }
        spread(&mut gesture, &camera, 48.0);

        assert_eq!(gesture.state(), GestureState::Changed);
        assert!((gesture.local_delta_scale() - 96.0 / 84.0).abs() < 1e-3);
    }

    #[test]
    fn test_pivot_is_fixed_at_activation() {
        let (camera, mut gesture) = setup();
        press(&mut gesture, 30.0);
        for half in [34.0, 38.0, 42.0] {
            spread(&mut gesture, &camera, half);
        }
        let pivot = gesture.pivot_point().unwrap();
        assert!(pivot.coords.norm() < 1e-3);

        // Move both points right; center moves but the pivot does not
        gesture.move_point(PointId(0), Point2::new(20.0, 50.0));
        gesture.move_point(PointId(1), Point2::new(100.0, 50.0));
        gesture.update(&camera);
        assert_eq!(gesture.pivot_point().unwrap(), pivot);
        assert!(gesture.base().world_center().unwrap().x > 0.5);
    }

    #[test]
    fn test_points_too_close_are_ignored() {
        let (camera, mut gesture) = setup();
        // 8 px apart, minimum is 0.5 cm = 10 px
        press(&mut gesture, 4.0);
        spread(&mut gesture, &camera, 4.5);
        assert_eq!(gesture.state(), GestureState::Possible);
        assert!(!gesture.is_scaling());
    }

    #[test]
    fn test_idle_frame_publishes_nothing() {
        let (camera, mut gesture) = setup();
        press(&mut gesture, 30.0);
        for half in [34.0, 38.0, 42.0] {
            spread(&mut gesture, &camera, half);
        }
        let changes = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&changes);
        gesture.subscribe(move |_| *counter.borrow_mut() += 1);

        // Both points translate together: distance unchanged
        gesture.move_point(PointId(0), Point2::new(10.0, 55.0));
        gesture.move_point(PointId(1), Point2::new(94.0, 55.0));
        gesture.update(&camera);

        assert_eq!(*changes.borrow(), 0);
    }

    #[test]
    fn test_release_ends_once_and_restarts_neutral() {
        let (camera, mut gesture) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        gesture.subscribe(move |change| sink.borrow_mut().push(change.state));

        press(&mut gesture, 30.0);
        for half in [34.0, 38.0, 42.0, 46.0] {
            spread(&mut gesture, &camera, half);
        }
        assert_eq!(gesture.state(), GestureState::Changed);
        assert!(gesture.local_delta_scale() > 1.0);

        gesture.end_point(PointId(0));
        gesture.end_point(PointId(1));

        let ended = log.borrow().iter().filter(|s| **s == GestureState::Ended).count();
        assert_eq!(ended, 1);
        assert!(!log.borrow().contains(&GestureState::Failed));
        assert_eq!(gesture.state(), GestureState::Possible);
        assert_eq!(gesture.local_delta_scale(), 1.0);
        assert!(!gesture.is_scaling());
    }

    #[test]
    fn test_second_cycle_buffers_again() {
        let (camera, mut gesture) = setup();
        press(&mut gesture, 30.0);
        for half in [34.0, 38.0, 42.0] {
            spread(&mut gesture, &camera, half);
        }
        gesture.end_point(PointId(0));
        gesture.end_point(PointId(1));

        press(&mut gesture, 30.0);
        spread(&mut gesture, &camera, 34.0);
        assert_eq!(gesture.state(), GestureState::Possible);
    }

    #[test]
    fn test_plane_parallel_to_view_skips_update() {
        let (camera, mut gesture) = setup();
        gesture
            .base_mut()
            .set_transform_plane(Plane::new(Point3::origin(), nalgebra::Vector3::x_axis()));
        press(&mut gesture, 30.0);
        for half in [40.0, 50.0, 60.0] {
            spread(&mut gesture, &camera, half);
        }
        assert_eq!(gesture.state(), GestureState::Possible);
    }
}
