//! Gesture lifecycle shared by every recognizer.
//!
//! A gesture starts in [`GestureState::Possible`], moves to `Began` when its
//! activation threshold is crossed, stays in `Changed` while it keeps
//! publishing deltas and finishes in `Ended`, `Cancelled` or `Failed`. A
//! finished gesture is reset and restarted straight back to `Possible`, and
//! both transitions are reported to listeners.

mod base;
pub mod pan;
pub mod rotate;
pub mod scale;

pub use base::ManipulationBase;
pub use pan::PanGesture;
pub use rotate::RotateGesture;
pub use scale::ScaleGesture;

use nalgebra::Point2;

use crate::input::{PointId, TouchEvent};
use crate::projection::Camera;

/// Gestures in this crate never track more than this many points.
pub const MAX_POINTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureState {
    Possible,
    Began,
    Changed,
    Ended,
    Cancelled,
    Failed,
}

impl GestureState {
    /// `Began` or `Changed`.
    pub fn is_active(self) -> bool {
        matches!(self, GestureState::Began | GestureState::Changed)
    }

    /// `Ended`, `Cancelled` or `Failed`.
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            GestureState::Ended | GestureState::Cancelled | GestureState::Failed
        )
    }

    pub fn can_transition_to(self, next: GestureState) -> bool {
        use GestureState::*;
        match self {
            Possible => matches!(next, Began | Failed | Cancelled),
            Began | Changed => matches!(next, Changed | Ended | Cancelled),
            Ended | Cancelled | Failed => next == Possible,
        }
    }
}

/// A touch point owned by the gesture listening to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedPoint {
    pub id: PointId,
    pub position: Point2<f32>,
    pub previous_position: Point2<f32>,
}

/// Notification sent to listeners on every state change.
pub struct StateChange<'a, G> {
    pub gesture: &'a G,
    pub previous: GestureState,
    pub state: GestureState,
}

pub type Listener<G> = Box<dyn FnMut(&StateChange<'_, G>)>;

/// State and tracked points shared by all gestures.
#[derive(Debug, Clone)]
pub struct GestureCore {
    state: GestureState,
    points: Vec<TrackedPoint>,
    moved: bool,
    // A cycle finished while points were still down; releasing only those must not fail the next one
    finished_with_points: bool,
}

impl GestureCore {
    pub fn new() -> Self {
        Self {
            state: GestureState::Possible,
            points: Vec::with_capacity(MAX_POINTS),
            moved: false,
            finished_with_points: false,
        }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn points(&self) -> &[TrackedPoint] {
        &self.points
    }

    /// Whether a tracked point moved since the last update.
    pub fn has_moved(&self) -> bool {
        self.moved
    }

    /// Start tracking a point. Points beyond [`MAX_POINTS`] and ids that are
    /// already tracked are ignored.
    fn admit(&mut self, id: PointId, position: Point2<f32>) -> bool {
        if self.points.len() >= MAX_POINTS || self.points.iter().any(|p| p.id == id) {
            return false;
        }
        self.points.push(TrackedPoint {
            id,
            position,
            previous_position: position,
        });
        true
    }

    fn move_point(&mut self, id: PointId, position: Point2<f32>) -> bool {
        let Some(point) = self.points.iter_mut().find(|p| p.id == id) else {
            return false;
        };
        point.position = position;
        self.moved = true;
        true
    }

    fn release(&mut self, id: PointId) -> Option<TrackedPoint> {
        let index = self.points.iter().position(|p| p.id == id)?;
        Some(self.points.remove(index))
    }

    fn release_all(&mut self) {
        self.points.clear();
        self.moved = false;
    }

    /// Snapshot current positions as the previous ones for the next update.
    fn commit_frame(&mut self) {
        for point in &mut self.points {
            point.previous_position = point.position;
        }
        self.moved = false;
    }
}

impl Default for GestureCore {
    fn default() -> Self {
        Self::new()
    }
}

/// Behavior shared by pan, scale and rotate recognizers.
///
/// Implementors supply the per-frame recognition step and the reset/restart
/// hooks; point admission, the lifecycle and listener dispatch are provided.
pub trait Gesture: Sized {
    /// Fewer tracked points than this ends an active gesture.
    const MIN_POINTS: usize;

    fn core(&self) -> &GestureCore;
    fn core_mut(&mut self) -> &mut GestureCore;
    fn listeners_mut(&mut self) -> &mut Vec<Listener<Self>>;

    /// Examine the tracked points for this frame and advance the state
    /// machine when a delta is published.
    fn recognize(&mut self, camera: &Camera);

    /// Clear per-activation accumulators.
    fn reset(&mut self);

    /// Return published outputs to their neutral values.
    fn restart(&mut self);

    fn state(&self) -> GestureState {
        self.core().state()
    }

    /// Register a listener for state changes of this gesture.
    fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&StateChange<'_, Self>) + 'static,
    {
        self.listeners_mut().push(Box::new(listener));
    }

    /// Route a touch event to the matching lifecycle call.
    fn handle(&mut self, event: &TouchEvent) {
        match *event {
            TouchEvent::Began { id, position } => self.begin_point(id, position),
            TouchEvent::Moved { id, position } => self.move_point(id, position),
            TouchEvent::Ended { id } => self.end_point(id),
        }
    }

    fn begin_point(&mut self, id: PointId, position: Point2<f32>) {
        let core = self.core_mut();
        if core.admit(id, position) {
            core.finished_with_points = false;
        }
    }

    fn move_point(&mut self, id: PointId, position: Point2<f32>) {
        self.core_mut().move_point(id, position);
    }

    fn end_point(&mut self, id: PointId) {
        if self.core_mut().release(id).is_none() {
            return;
        }
        let remaining = self.core().points().len();
        let state = self.state();
        if state.is_active() && remaining < Self::MIN_POINTS {
            self.set_state(GestureState::Ended);
        } else if state == GestureState::Possible
            && remaining == 0
            && !self.core().finished_with_points
        {
            self.set_state(GestureState::Failed);
        }
        if self.core().points().is_empty() {
            self.core_mut().finished_with_points = false;
        }
    }

    /// Release every point and abort the gesture.
    fn cancel(&mut self) {
        self.core_mut().release_all();
        if matches!(
            self.state(),
            GestureState::Possible | GestureState::Began | GestureState::Changed
        ) {
            self.set_state(GestureState::Cancelled);
        }
    }

    /// Once-per-frame host tick.
    fn update(&mut self, camera: &Camera) {
        if self.core().has_moved() {
            self.recognize(camera);
        }
        self.core_mut().commit_frame();
    }

    /// Move to `next`, notify listeners and restart if the gesture finished.
    /// Invalid transitions are logged and ignored.
    fn set_state(&mut self, next: GestureState) -> bool {
        let previous = self.state();
        if !previous.can_transition_to(next) {
            tracing::warn!(?previous, ?next, "rejected gesture state transition");
            return false;
        }
        self.core_mut().state = next;
        tracing::debug!(?previous, ?next, "gesture state changed");
        self.notify(previous, next);

        if next.is_finished() {
            let points_down = !self.core().points().is_empty();
            self.core_mut().finished_with_points = points_down;
            self.reset();
            self.restart();
            self.core_mut().state = GestureState::Possible;
            self.notify(next, GestureState::Possible);
        }
        true
    }

    fn notify(&mut self, previous: GestureState, state: GestureState) {
        let mut listeners = std::mem::take(self.listeners_mut());
        let change = StateChange {
            gesture: &*self,
            previous,
            state,
        };
        for listener in listeners.iter_mut() {
            listener(&change);
        }
        // Keep listeners registered from inside a callback
        listeners.append(self.listeners_mut());
        *self.listeners_mut() = listeners;
    }
}
