/// Touch emulation with a mouse
///
/// The left button drives the primary touch. A right click drops a
/// stationary anchor touch, so a left drag then pinches and twists around
/// it; a second right click lifts the anchor.
use nalgebra::Point2;
use pinch_core::{PointId, TouchSink};

#[derive(Debug, Default)]
pub struct MouseTouches {
    primary: Option<PointId>,
    anchor: Option<(PointId, Point2<f32>)>,
}

impl MouseTouches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press<S: TouchSink + ?Sized>(&mut self, sink: &mut S, position: Point2<f32>) {
        if self.primary.is_none() {
            self.primary = Some(sink.begin_point(position));
        }
    }

    /// Drags without a prior press (e.g. the press happened outside the
    /// window) start the primary touch.
    pub fn drag<S: TouchSink + ?Sized>(&mut self, sink: &mut S, position: Point2<f32>) {
        match self.primary {
            Some(id) => sink.move_point(id, position),
            None => self.press(sink, position),
        }
    }

    pub fn release<S: TouchSink + ?Sized>(&mut self, sink: &mut S) {
        if let Some(id) = self.primary.take() {
            sink.end_point(id);
        }
    }

    pub fn toggle_anchor<S: TouchSink + ?Sized>(&mut self, sink: &mut S, position: Point2<f32>) {
        match self.anchor.take() {
            Some((id, _)) => {
                sink.end_point(id);
                tracing::debug!(%id, "anchor lifted");
            }
            None => {
                let id = sink.begin_point(position);
                self.anchor = Some((id, position));
                tracing::debug!(%id, x = position.x, y = position.y, "anchor placed");
            }
        }
    }

    /// Forget both touches without ending them, after the sink was cleared.
    pub fn forget(&mut self) {
        self.primary = None;
        self.anchor = None;
    }

    pub fn is_pressed(&self) -> bool {
        self.primary.is_some()
    }

    pub fn anchor(&self) -> Option<Point2<f32>> {
        self.anchor.map(|(_, position)| position)
    }
}
