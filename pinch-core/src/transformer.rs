//! Applies gesture deltas to a target transform.
//!
//! Gesture handlers only move the goals. [`Transformer::tick`] then eases the
//! target toward them each frame and shifts the position so the rotation
//! pivot stays put while rotation changes, and the scale pivot while scale
//! changes.

use std::cell::RefCell;
use std::rc::Rc;

use nalgebra::{Matrix4, Point3, Unit, UnitQuaternion, Vector2, Vector3};

use crate::config::TransformerConfig;
use crate::error::{Error, Result};
use crate::gesture::{Gesture, GestureState, PanGesture, RotateGesture, ScaleGesture, StateChange};
use crate::transform::LocalTransform;

/// Rotation deltas smaller than this (degrees) are ignored.
pub const MIN_ROTATION_DEGREES: f32 = 0.01;

/// Scale deltas closer to 1 than this are ignored.
pub const MIN_SCALE_DELTA: f32 = 1e-5;

/// Slerp gives up below this angle between rotations and snaps to the goal.
const SLERP_EPSILON: f32 = 1e-6;

/// Remaining rotation (radians) below which the goal is taken as reached.
const ROTATION_SNAP: f32 = 1e-3;

/// Transformer shared with the gesture listeners that feed it.
pub type SharedTransformer = Rc<RefCell<Transformer>>;

/// World point a channel is applied around.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Pivot {
    world: Point3<f32>,
    // Same point in target-local coordinates, captured on the next tick
    local: Option<Point3<f32>>,
}

impl Pivot {
    fn new(world: Point3<f32>) -> Self {
        Self { world, local: None }
    }

    fn anchor(&mut self, parent_from_world: &Matrix4<f32>, target: &LocalTransform) -> Option<Point3<f32>> {
        if self.local.is_none() {
            let parent = parent_from_world.transform_point(&self.world);
            self.local = target.inverse_transform_point(&parent);
        }
        self.local
    }
}

#[derive(Debug, Clone)]
pub struct Transformer {
    speed: f32,
    position_goal: Vector3<f32>,
    rotation_goal: UnitQuaternion<f32>,
    scale_goal: Vector3<f32>,
    last_applied: LocalTransform,
    scale_pivot: Option<Pivot>,
    rotation_pivot: Option<Pivot>,
    parent_from_world: Matrix4<f32>,
}

impl Transformer {
    /// Start with goals equal to the target's current transform.
    pub fn new(config: &TransformerConfig, initial: &LocalTransform) -> Self {
        Self {
            speed: config.speed,
            position_goal: initial.position,
            rotation_goal: initial.rotation,
            scale_goal: initial.scale,
            last_applied: *initial,
            scale_pivot: None,
            rotation_pivot: None,
            parent_from_world: Matrix4::identity(),
        }
    }

    pub fn shared(config: &TransformerConfig, initial: &LocalTransform) -> SharedTransformer {
        Rc::new(RefCell::new(Self::new(config, initial)))
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed.max(0.0);
    }

    pub fn position_goal(&self) -> Vector3<f32> {
        self.position_goal
    }

    pub fn rotation_goal(&self) -> UnitQuaternion<f32> {
        self.rotation_goal
    }

    pub fn scale_goal(&self) -> Vector3<f32> {
        self.scale_goal
    }

    /// World point scale is applied around, if any.
    pub fn scale_pivot(&self) -> Option<Point3<f32>> {
        self.scale_pivot.map(|pivot| pivot.world)
    }

    /// World point rotation is applied around, if any.
    pub fn rotation_pivot(&self) -> Option<Point3<f32>> {
        self.rotation_pivot.map(|pivot| pivot.world)
    }

    pub fn set_scale_pivot(&mut self, pivot: Option<Point3<f32>>) {
        self.scale_pivot = pivot.map(Pivot::new);
    }

    pub fn set_rotation_pivot(&mut self, pivot: Option<Point3<f32>>) {
        self.rotation_pivot = pivot.map(Pivot::new);
    }

    /// Use `pivot` for both scale and rotation.
    pub fn set_pivot(&mut self, pivot: Option<Point3<f32>>) {
        self.set_scale_pivot(pivot);
        self.set_rotation_pivot(pivot);
    }

    /// Set the world-from-parent matrix of the target. Deltas and the pivot
    /// arrive in world space and are converted with its inverse.
    pub fn set_parent(&mut self, world_from_parent: &Matrix4<f32>) -> Result<()> {
        let Some(inverse) = world_from_parent.try_inverse() else {
            tracing::warn!("parent transform is singular, keeping the previous one");
            return Err(Error::SingularParent);
        };
        self.parent_from_world = inverse;
        self.forget_anchors();
        Ok(())
    }

    /// Snap goals to `target`, dropping any pending motion.
    pub fn sync(&mut self, target: &LocalTransform) {
        self.position_goal = target.position;
        self.rotation_goal = target.rotation;
        self.scale_goal = target.scale;
        self.last_applied = *target;
        self.forget_anchors();
    }

    /// Move the position goal by a world-space translation.
    pub fn push_translation(&mut self, world_delta: &Vector3<f32>) {
        self.position_goal += self.parent_from_world.transform_vector(world_delta);
    }

    /// Multiply the scale goal by `delta` unless the result leaves
    /// `[min, max]` on x or y, in which case the step is dropped entirely.
    pub fn push_scale(&mut self, delta: f32, min: &Vector2<f32>, max: &Vector2<f32>) -> bool {
        if (delta - 1.0).abs() <= MIN_SCALE_DELTA {
            return false;
        }
        let next = self.scale_goal * delta;
        let within = (min.x..=max.x).contains(&next.x) && (min.y..=max.y).contains(&next.y);
        if !within {
            tracing::warn!(delta, x = next.x, y = next.y, "scale step outside bounds rejected");
            return false;
        }
        self.scale_goal = next;
        true
    }

    /// Turn the rotation goal by `degrees` about a world-space axis.
    pub fn push_rotation(&mut self, degrees: f32, world_axis: &Vector3<f32>) -> bool {
        if degrees.abs() <= MIN_ROTATION_DEGREES {
            return false;
        }
        let axis = self.parent_from_world.transform_vector(world_axis);
        let Some(axis) = Unit::try_new(axis, f32::EPSILON) else {
            tracing::warn!("rotation axis vanished in parent space");
            return false;
        };
        let delta = UnitQuaternion::from_axis_angle(&axis, degrees.to_radians());
        self.rotation_goal = UnitQuaternion::new_normalize((delta * self.rotation_goal).into_inner());
        true
    }

    pub fn on_pan(&mut self, change: &StateChange<'_, PanGesture>) {
        if !change.state.is_active() {
            return;
        }
        let delta = change.gesture.local_delta_position();
        if delta != Vector3::zeros() {
            self.push_translation(&delta);
        }
    }

    pub fn on_scale(&mut self, change: &StateChange<'_, ScaleGesture>) {
        if !change.state.is_active() {
            return;
        }
        let gesture = change.gesture;
        self.push_scale(
            gesture.local_delta_scale(),
            &gesture.min_scale(),
            &gesture.max_scale(),
        );
        if let Some(pivot) = gesture.pivot_point() {
            if change.state == GestureState::Began || self.scale_pivot.is_none() {
                self.scale_pivot = Some(Pivot::new(pivot));
            }
        }
    }

    pub fn on_rotate(&mut self, change: &StateChange<'_, RotateGesture>) {
        if !change.state.is_active() {
            return;
        }
        let gesture = change.gesture;
        let normal = gesture.base().transform_plane().normal.into_inner();
        self.push_rotation(gesture.local_delta_rotation(), &normal);
        if let Some(pivot) = gesture.pivot_point() {
            if change.state == GestureState::Began || self.rotation_pivot.is_none() {
                self.rotation_pivot = Some(Pivot::new(pivot));
            }
        }
    }

    /// Feed `gesture`'s state changes into `this`.
    pub fn attach_pan(this: &SharedTransformer, gesture: &mut PanGesture) {
        let transformer = Rc::clone(this);
        gesture.subscribe(move |change| transformer.borrow_mut().on_pan(change));
    }

    pub fn attach_scale(this: &SharedTransformer, gesture: &mut ScaleGesture) {
        let transformer = Rc::clone(this);
        gesture.subscribe(move |change| transformer.borrow_mut().on_scale(change));
    }

    pub fn attach_rotate(this: &SharedTransformer, gesture: &mut RotateGesture) {
        let transformer = Rc::clone(this);
        gesture.subscribe(move |change| transformer.borrow_mut().on_rotate(change));
    }

    /// Advance `target` toward the goals by `speed * dt` of the remaining
    /// distance. The rotation step turns about the rotation pivot, then the
    /// scale step scales about the scale pivot.
    pub fn tick(&mut self, target: &mut LocalTransform, dt: f32) {
        self.adopt_external_edits(target);

        let parent_from_world = self.parent_from_world;
        let rotation_anchor = self
            .rotation_pivot
            .as_mut()
            .and_then(|pivot| pivot.anchor(&parent_from_world, target));
        let scale_anchor = self
            .scale_pivot
            .as_mut()
            .and_then(|pivot| pivot.anchor(&parent_from_world, target));

        let fraction = (self.speed * dt).clamp(0.0, 1.0);

        let rotation = approach_rotation(&target.rotation, &self.rotation_goal, fraction);
        if rotation != target.rotation {
            if let Some(local) = rotation_anchor {
                let offset = pivot_shift(&local, target, &rotation, &target.scale);
                target.position += offset;
                self.position_goal += offset;
            }
            target.rotation = rotation;
        }

        let scale = approach(&target.scale, &self.scale_goal, fraction);
        if scale != target.scale {
            if let Some(local) = scale_anchor {
                let offset = pivot_shift(&local, target, &target.rotation, &scale);
                target.position += offset;
                self.position_goal += offset;
            }
            target.scale = scale;
        }

        target.position = approach(&target.position, &self.position_goal, fraction);
        self.last_applied = *target;
    }

    /// Channels changed by someone else since the last tick become the new
    /// goals.
    fn adopt_external_edits(&mut self, target: &LocalTransform) {
        let last = self.last_applied;
        let mut edited = false;
        if target.position != last.position {
            tracing::debug!("target position edited externally, resyncing goal");
            self.position_goal = target.position;
            edited = true;
        }
        if target.rotation != last.rotation {
            tracing::debug!("target rotation edited externally, resyncing goal");
            self.rotation_goal = target.rotation;
            edited = true;
        }
        if target.scale != last.scale {
            tracing::debug!("target scale edited externally, resyncing goal");
            self.scale_goal = target.scale;
            edited = true;
        }
        if edited {
            self.forget_anchors();
        }
    }

    /// Recapture the local pivot points from their world positions on the
    /// next tick.
    fn forget_anchors(&mut self) {
        for pivot in [&mut self.scale_pivot, &mut self.rotation_pivot].into_iter().flatten() {
            pivot.local = None;
        }
    }
}

/// Translation that keeps the local point `local` where it is when the
/// target's rotation and scale become `rotation` and `scale`.
fn pivot_shift(
    local: &Point3<f32>,
    target: &LocalTransform,
    rotation: &UnitQuaternion<f32>,
    scale: &Vector3<f32>,
) -> Vector3<f32> {
    let before = target.rotation * local.coords.component_mul(&target.scale);
    let after = rotation * local.coords.component_mul(scale);
    before - after
}

/// Linear step that leaves `current` untouched once it equals `goal`.
fn approach(current: &Vector3<f32>, goal: &Vector3<f32>, fraction: f32) -> Vector3<f32> {
    current + (goal - current) * fraction
}

fn approach_rotation(
    current: &UnitQuaternion<f32>,
    goal: &UnitQuaternion<f32>,
    fraction: f32,
) -> UnitQuaternion<f32> {
    if fraction >= 1.0 || current.angle_to(goal) <= ROTATION_SNAP {
        return *goal;
    }
    current
        .try_slerp(goal, fraction, SLERP_EPSILON)
        .map(|step| UnitQuaternion::new_normalize(step.into_inner()))
        .unwrap_or(*goal)
}
