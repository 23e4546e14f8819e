//! Replays touch traces through input, gestures and the transformer.

use std::rc::Rc;

use nalgebra::{Point3, UnitQuaternion, Vector3};
use pinch_core::config::{Config, GestureConfig};
use pinch_core::{
    Camera, Gesture, GestureState, LocalTransform, PanGesture, RotateGesture, ScaleGesture,
    SharedTransformer, Trace, TracePlayer, TouchInput, Transformer,
};

const DT: f32 = 1.0 / 60.0;

/// 200x200 px viewport over 20x20 world units, 20 px per cm.
struct Pipeline {
    camera: Camera,
    input: TouchInput,
    scale: ScaleGesture,
    rotate: RotateGesture,
    pan: PanGesture,
    transformer: SharedTransformer,
    target: LocalTransform,
}

impl Pipeline {
    fn new(config: &Config) -> Self {
        let target = LocalTransform::identity();
        let transformer = Transformer::shared(&config.transformer, &target);
        let mut scale = ScaleGesture::new(&config.gesture, &config.scale);
        let mut rotate = RotateGesture::new(&config.gesture, &config.rotate);
        let mut pan = PanGesture::new(&config.gesture, &config.pan);
        Transformer::attach_scale(&transformer, &mut scale);
        Transformer::attach_rotate(&transformer, &mut rotate);
        Transformer::attach_pan(&transformer, &mut pan);
        Self {
            camera: Camera::orthographic(200, 200, 20.0),
            input: TouchInput::new(),
            scale,
            rotate,
            pan,
            transformer,
            target,
        }
    }

    fn frame(&mut self, dt: f32) {
        for event in self.input.drain() {
            self.scale.handle(&event);
            self.rotate.handle(&event);
            self.pan.handle(&event);
        }
        self.scale.update(&self.camera);
        self.rotate.update(&self.camera);
        self.pan.update(&self.camera);
        self.transformer.borrow_mut().tick(&mut self.target, dt);
    }

    fn play(&mut self, trace: &str) {
        let mut player = TracePlayer::new(Trace::parse(trace).unwrap(), DT);
        while let Some(dt) = player.next_frame(&mut self.input) {
            self.frame(dt);
        }
    }

    fn settle(&mut self) {
        for _ in 0..300 {
            self.frame(DT);
        }
    }
}

fn config() -> Config {
    let mut config = Config {
        gesture: GestureConfig {
            dots_per_cm: 20.0,
            ..GestureConfig::default()
        },
        ..Config::default()
    };
    config.rotate.threshold_degrees = 3.0;
    config
}

const CENTERED_SPREAD: &str = "
down a 80 100
down b 120 100
frame
move a 70 100
move b 130 100
frame
move a 60 100
move b 140 100
frame
move a 50 100
move b 150 100
frame
up a
up b
frame
";

#[test]
fn test_centered_spread_scales_about_center() {
    let mut pipeline = Pipeline::new(&config());
    pipeline.play(CENTERED_SPREAD);
    pipeline.settle();

    // Dead zone of 10 px: 100 / 50 rather than 100 / 40
    assert!((pipeline.target.scale.x - 2.0).abs() < 1e-3);
    assert!((pipeline.target.scale.y - 2.0).abs() < 1e-3);
    assert!(pipeline.target.position.norm() < 1e-3);
    assert_eq!(pipeline.scale.state(), GestureState::Possible);
    assert_eq!(pipeline.scale.local_delta_scale(), 1.0);
}

#[test]
fn test_off_center_spread_keeps_pivot_under_fingers() {
    let mut pipeline = Pipeline::new(&config());
    pipeline.play(
        "
        down a 140 60
        down b 160 60
        frame
        move a 130 60
        move b 170 60
        frame
        move a 120 60
        move b 180 60
        frame
        move a 110 60
        move b 190 60
        frame
        up a
        up b
        frame
        ",
    );
    pipeline.settle();

    // Pinch center (150, 60) px lies at (5, 4) in world space
    let pivot = Point3::new(5.0, 4.0, 0.0);
    let expected_scale = 80.0 / 30.0;
    assert!((pipeline.target.scale.x - expected_scale).abs() < 1e-3);
    let pivot_now = pipeline.target.transform_point(&pivot);
    assert!((pivot_now - pivot).norm() < 1e-3);
}

#[test]
fn test_twist_rotates_past_threshold() {
    let mut pipeline = Pipeline::new(&config());
    let mut trace = String::from("down a 60 100\ndown b 140 100\nframe\n");
    for step in 1..=5 {
        let (sin, cos) = (step as f32 * 2.0).to_radians().sin_cos();
        trace.push_str(&format!(
            "move a {} {}\nmove b {} {}\nframe\n",
            100.0 - cos * 40.0,
            100.0 + sin * 40.0,
            100.0 + cos * 40.0,
            100.0 - sin * 40.0,
        ));
    }
    trace.push_str("up a\nup b\nframe\n");
    pipeline.play(&trace);
    pipeline.settle();

    let expected = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 7f32.to_radians());
    assert!(pipeline.target.rotation.angle_to(&expected) < 1e-3);
    assert!(pipeline.target.position.norm() < 1e-3);
    assert!((pipeline.target.scale.x - 1.0).abs() < 1e-3);
}

#[test]
fn test_pinch_and_twist_keep_separate_pivots() {
    let mut pipeline = Pipeline::new(&config());
    // Spread at the center, slide right, then twist around the new center
    let mut trace = String::from(
        "down a 80 100\ndown b 120 100\nframe\n\
         move a 70 100\nmove b 130 100\nframe\n\
         move a 60 100\nmove b 140 100\nframe\n",
    );
    for step in 1..=5 {
        let shift = step as f32 * 10.0;
        trace.push_str(&format!(
            "move a {} 100\nmove b {} 100\nframe\n",
            60.0 + shift,
            140.0 + shift
        ));
    }
    for step in 1..=5 {
        let (sin, cos) = (step as f32 * 2.0).to_radians().sin_cos();
        trace.push_str(&format!(
            "move a {} {}\nmove b {} {}\nframe\n",
            150.0 - cos * 40.0,
            100.0 + sin * 40.0,
            150.0 + cos * 40.0,
            100.0 - sin * 40.0,
        ));
    }
    pipeline.play(&trace);

    assert!(pipeline.scale.state().is_active());
    assert!(pipeline.rotate.state().is_active());
    let transformer = pipeline.transformer.borrow();
    let scale_pivot = transformer.scale_pivot().unwrap();
    let rotation_pivot = transformer.rotation_pivot().unwrap();
    assert!(scale_pivot.coords.norm() < 1e-3);
    assert!((rotation_pivot - Point3::new(5.0, 0.0, 0.0)).norm() < 1e-3);
}

#[test]
fn test_scale_bounds_drop_whole_steps() {
    let mut config = config();
    config.scale.max_scale = [1.3, 1.3];
    let mut pipeline = Pipeline::new(&config);
    pipeline.play(CENTERED_SPREAD);
    pipeline.settle();

    // 1.2 fits, 1.2 * 4/3 and 1.2 * 5/4 do not
    assert!((pipeline.target.scale.x - 1.2).abs() < 1e-3);
    assert!(pipeline.target.scale.x <= 1.3);
}

#[test]
fn test_single_finger_drag_pans() {
    let mut pipeline = Pipeline::new(&config());
    pipeline.play(
        "
        down a 100 100
        frame
        move a 110 100
        frame
        move a 120 100
        frame
        move a 130 100
        frame
        up a
        frame
        ",
    );
    pipeline.settle();

    // 30 px dragged, the first 10 px are the dead zone
    assert!((pipeline.target.position - Vector3::new(2.0, 0.0, 0.0)).norm() < 1e-3);
    assert!((pipeline.target.scale.x - 1.0).abs() < 1e-6);
    assert_eq!(pipeline.pan.state(), GestureState::Possible);
}

#[test]
fn test_external_edit_between_gestures() {
    let mut pipeline = Pipeline::new(&config());
    pipeline.play(CENTERED_SPREAD);
    pipeline.settle();

    pipeline.target.position = Vector3::new(-4.0, 1.0, 0.0);
    pipeline.frame(DT);
    assert_eq!(pipeline.target.position, Vector3::new(-4.0, 1.0, 0.0));
    assert_eq!(
        pipeline.transformer.borrow().position_goal(),
        Vector3::new(-4.0, 1.0, 0.0)
    );
    assert_eq!(Rc::strong_count(&pipeline.transformer), 4);
}
