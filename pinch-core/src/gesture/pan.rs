//! Drag recognizer following the centroid of one or two points.

use nalgebra::{Vector2, Vector3};

use super::{Gesture, GestureCore, GestureState, Listener, ManipulationBase};
use crate::config::{GestureConfig, PanConfig};
use crate::geometry::DEGENERATE_EPSILON;
use crate::projection::Camera;

/// Translations shorter than this (world units) are not published.
pub const PAN_EPSILON: f32 = 1e-5;

/// Translates a target by the world-space movement of the touch centroid.
pub struct PanGesture {
    base: ManipulationBase,
    movement_threshold_cm: f32,
    buffer: Vector2<f32>,
    moving: bool,
    local_delta_position: Vector3<f32>,
    listeners: Vec<Listener<PanGesture>>,
}

impl PanGesture {
    pub fn new(gesture: &GestureConfig, config: &PanConfig) -> Self {
        Self {
            base: ManipulationBase::new(gesture),
            movement_threshold_cm: config.movement_threshold_cm,
            buffer: Vector2::zeros(),
            moving: false,
            local_delta_position: Vector3::zeros(),
            listeners: Vec::new(),
        }
    }

    pub fn base(&self) -> &ManipulationBase {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut ManipulationBase {
        &mut self.base
    }

    pub fn movement_threshold_cm(&self) -> f32 {
        self.movement_threshold_cm
    }

    /// World-space translation published by the last update.
    pub fn local_delta_position(&self) -> Vector3<f32> {
        self.local_delta_position
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }
}

impl Default for PanGesture {
    fn default() -> Self {
        Self::new(&GestureConfig::default(), &PanConfig::default())
    }
}

impl Gesture for PanGesture {
    const MIN_POINTS: usize = 1;

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
        let Some((new_center, old_center)) = self.base.centroid() else {
            return;
        };
        let (Some(new_world), Some(old_world)) = (
            self.base.project(camera, &new_center),
            self.base.project(camera, &old_center),
        ) else {
            tracing::trace!("pan center misses the transform plane");
            return;
        };

        let mut delta = Vector3::zeros();
        if self.moving {
            delta = new_world - old_world;
        } else {
            self.buffer += new_center - old_center;
            let threshold_px = self.base.cm_to_pixels(self.movement_threshold_cm);
            let travelled = self.buffer.norm();
            if travelled >= threshold_px {
                self.moving = true;
                tracing::debug!(travelled, threshold_px, "pan threshold crossed");
                if travelled > DEGENERATE_EPSILON {
                    // Start from where the centroid crossed the threshold
                    let overshoot = self.buffer * ((travelled - threshold_px) / travelled);
                    if let Some(start) = self.base.project(camera, &(new_center - overshoot)) {
                        delta = new_world - start;
                    }
                }
            }
        }

        if delta.norm() <= PAN_EPSILON {
            return;
        }
        self.base
            .record_centers((new_center, old_center), (new_world, old_world));
        self.local_delta_position = delta;

        if self.state() == GestureState::Possible {
            self.set_state(GestureState::Began);
        } else {
            self.set_state(GestureState::Changed);
        }
    }

    fn reset(&mut self) {
        self.buffer = Vector2::zeros();
        self.moving = false;
        self.base.clear_centers();
    }

    fn restart(&mut self) {
        self.local_delta_position = Vector3::zeros();
    }
}
