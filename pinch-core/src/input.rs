//! Touch point ingestion.
//!
//! Any touch source (native touch, emulated mouse, a network bridge, a
//! recorded trace) feeds points through [`TouchSink`]. [`TouchInput`] assigns
//! internal ids and queues events until the host hands them to gestures on
//! the next frame.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use nalgebra::{Point2, Vector2};
use parking_lot::Mutex;

/// Internal identifier of a touch point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointId(pub u32);

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle event of a single touch point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TouchEvent {
    Began { id: PointId, position: Point2<f32> },
    Moved { id: PointId, position: Point2<f32> },
    Ended { id: PointId },
}

impl TouchEvent {
    pub fn id(&self) -> PointId {
        match *self {
            TouchEvent::Began { id, .. } | TouchEvent::Moved { id, .. } | TouchEvent::Ended { id } => id,
        }
    }
}

/// Ingestion contract implemented by whatever collects touch points.
pub trait TouchSink {
    /// Register a new point and return its internal id.
    fn begin_point(&mut self, position: Point2<f32>) -> PointId;
    /// Move a known point. Unknown ids are ignored.
    fn move_point(&mut self, id: PointId, position: Point2<f32>);
    /// Release a known point. Unknown ids are ignored.
    fn end_point(&mut self, id: PointId);
}

/// Collects touch points between frames.
#[derive(Debug, Default)]
pub struct TouchInput {
    next_id: u32,
    active: HashMap<PointId, Point2<f32>>,
    queue: Vec<TouchEvent>,
}

impl TouchInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the events queued since the last frame, in arrival order.
    pub fn drain(&mut self) -> Vec<TouchEvent> {
        std::mem::take(&mut self.queue)
    }

    pub fn active_points(&self) -> usize {
        self.active.len()
    }

    pub fn position(&self, id: PointId) -> Option<Point2<f32>> {
        self.active.get(&id).copied()
    }

    /// Positions of all active points, ordered by id.
    pub fn positions(&self) -> Vec<(PointId, Point2<f32>)> {
        let mut points: Vec<_> = self.active.iter().map(|(id, p)| (*id, *p)).collect();
        points.sort_by_key(|(id, _)| *id);
        points
    }

    /// Release every active point, e.g. when the host loses focus.
    pub fn end_all(&mut self) {
        let mut ids: Vec<_> = self.active.keys().copied().collect();
        ids.sort();
        for id in ids {
            self.end_point(id);
        }
    }
}

impl TouchSink for TouchInput {
    fn begin_point(&mut self, position: Point2<f32>) -> PointId {
        let id = PointId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.active.insert(id, position);
        self.queue.push(TouchEvent::Began { id, position });
        tracing::trace!(%id, x = position.x, y = position.y, "touch began");
        id
    }

    fn move_point(&mut self, id: PointId, position: Point2<f32>) {
        let Some(current) = self.active.get_mut(&id) else {
            return;
        };
        if *current == position {
            return;
        }
        *current = position;
        self.queue.push(TouchEvent::Moved { id, position });
    }

    fn end_point(&mut self, id: PointId) {
        if self.active.remove(&id).is_none() {
            return;
        }
        self.queue.push(TouchEvent::Ended { id });
        tracing::trace!(%id, "touch ended");
    }
}

/// Touch input shared with sources running on other threads.
pub type SharedTouchInput = Arc<Mutex<TouchInput>>;

#[derive(Debug, Clone, Copy)]
struct RemotePoint {
    id: PointId,
    last_delivered: Point2<f32>,
}

#[derive(Debug)]
struct BridgeState<K> {
    points: HashMap<K, RemotePoint>,
    screen_size: Vector2<f32>,
}

/// Bridges a remote touch source that reports points under its own keys
/// with normalized [0, 1] coordinates (top-left origin), such as a network
/// cursor protocol listener running on its own thread.
///
/// The key map is guarded by a mutex held only while the map and the
/// shared input are mutated.
#[derive(Debug)]
pub struct RemoteTouchBridge<K> {
    input: SharedTouchInput,
    state: Mutex<BridgeState<K>>,
    movement_threshold_px: f32,
}

impl<K: Eq + Hash> RemoteTouchBridge<K> {
    /// `movement_threshold_px` drops moves shorter than this distance from
    /// the last forwarded position.
    pub fn new(input: SharedTouchInput, width: f32, height: f32, movement_threshold_px: f32) -> Self {
        Self {
            input,
            state: Mutex::new(BridgeState {
                points: HashMap::new(),
                screen_size: Vector2::new(width, height),
            }),
            movement_threshold_px: movement_threshold_px.max(0.0),
        }
    }

    /// Update the screen size used to scale normalized coordinates.
    pub fn set_screen_size(&self, width: f32, height: f32) {
        self.state.lock().screen_size = Vector2::new(width, height);
    }

    pub fn active_points(&self) -> usize {
        self.state.lock().points.len()
    }

    pub fn point_added(&self, key: K, normalized: Point2<f32>) {
        let mut state = self.state.lock();
        let position = to_screen(&normalized, &state.screen_size);
        if let Some(existing) = state.points.get(&key) {
            // Duplicate add: treat as a move of the known point
            let id = existing.id;
            self.input.lock().move_point(id, position);
            state.points.insert(
                key,
                RemotePoint {
                    id,
                    last_delivered: position,
                },
            );
            return;
        }
        let id = self.input.lock().begin_point(position);
        state.points.insert(
            key,
            RemotePoint {
                id,
                last_delivered: position,
            },
        );
    }

    pub fn point_updated(&self, key: &K, normalized: Point2<f32>) {
        let mut state = self.state.lock();
        let screen_size = state.screen_size;
        let Some(point) = state.points.get_mut(key) else {
            return;
        };
        let position = to_screen(&normalized, &screen_size);
        if (position - point.last_delivered).norm() < self.movement_threshold_px {
            return;
        }
        point.last_delivered = position;
        self.input.lock().move_point(point.id, position);
    }

    pub fn point_removed(&self, key: &K) {
        let mut state = self.state.lock();
        let Some(point) = state.points.remove(key) else {
            return;
        };
        self.input.lock().end_point(point.id);
    }
}

fn to_screen(normalized: &Point2<f32>, screen_size: &Vector2<f32>) -> Point2<f32> {
    Point2::new(normalized.x * screen_size.x, normalized.y * screen_size.y)
}
