/// Pinch Core Library - touch gestures for manipulating 3D objects
///
/// This library turns raw touch points into scale, rotate and pan gestures
/// projected onto a world plane, and eases a target transform toward the
/// result. It holds no windowing or rendering code; hosts feed touch points
/// through [`input::TouchSink`] and tick gestures and the transformer once
/// per frame.
pub mod config;
pub mod error;
pub mod geometry;
pub mod gesture;
pub mod input;
pub mod mesh;
pub mod projection;
pub mod trace;
pub mod transform;
pub mod transformer;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use gesture::{Gesture, GestureState, PanGesture, RotateGesture, ScaleGesture, StateChange};
pub use input::{PointId, RemoteTouchBridge, SharedTouchInput, TouchEvent, TouchInput, TouchSink};
pub use mesh::{Mesh, Triangle, Vertex};
pub use projection::{screen_to_plane, Camera, Plane, ProjectionMode, Ray};
pub use trace::{Trace, TracePlayer};
pub use transform::{LocalTransform, Transform};
pub use transformer::{SharedTransformer, Transformer};
