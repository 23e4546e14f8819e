/// Pinch Web - browser host for pinch gestures
///
/// Page scripts forward touch events and call `tick` once per animation
/// frame, then draw the card with the returned model matrix. Touch
/// coordinates are CSS pixels relative to the canvas.
use std::sync::Arc;

use nalgebra::Point2;
use parking_lot::Mutex;
use pinch_core::config::DEFAULT_DOTS_PER_CM;
use pinch_core::{
    Camera, Config, Gesture, LocalTransform, PanGesture, RemoteTouchBridge, RotateGesture,
    ScaleGesture, SharedTouchInput, SharedTransformer, TouchInput, Transformer,
};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WebManipulator {
    config: Config,
    input: SharedTouchInput,
    bridge: RemoteTouchBridge<i32>,
    camera: Camera,
    scale: ScaleGesture,
    rotate: RotateGesture,
    pan: PanGesture,
    transformer: SharedTransformer,
    target: LocalTransform,
    css_size: (f32, f32),
    device_pixel_ratio: f32,
}

#[wasm_bindgen]
impl WebManipulator {
    /// Attach to the canvas with id `canvas_id`, sizing the viewport from it.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str) -> Result<WebManipulator, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| JsValue::from_str(&format!("no element with id `{canvas_id}`")))?
            .dyn_into::<web_sys::HtmlCanvasElement>()?;

        Ok(Self::with_viewport(
            canvas.client_width() as f32,
            canvas.client_height() as f32,
            window.device_pixel_ratio() as f32,
        ))
    }

    /// Build without touching the DOM.
    pub fn with_viewport(css_width: f32, css_height: f32, device_pixel_ratio: f32) -> WebManipulator {
        let config = Config::default();
        let input: SharedTouchInput = Arc::new(Mutex::new(TouchInput::new()));
        let bridge = RemoteTouchBridge::new(Arc::clone(&input), 1.0, 1.0, 0.0);
        let home = LocalTransform::identity();
        let transformer = Transformer::shared(&config.transformer, &home);
        let mut manipulator = WebManipulator {
            scale: ScaleGesture::new(&config.gesture, &config.scale),
            rotate: RotateGesture::new(&config.gesture, &config.rotate),
            pan: PanGesture::new(&config.gesture, &config.pan),
            config,
            input,
            bridge,
            camera: Camera::default(),
            transformer,
            target: home,
            css_size: (1.0, 1.0),
            device_pixel_ratio: 1.0,
        };
        manipulator.resize(css_width, css_height, device_pixel_ratio);
        manipulator.rebuild_gestures();
        manipulator
    }

    /// Apply a TOML configuration. `gesture.dots_per_cm` is per CSS pixel.
    pub fn configure(&mut self, toml: &str) -> Result<(), JsValue> {
        let config = Config::from_toml_str(toml).map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.apply_config(config);
        Ok(())
    }

    pub fn resize(&mut self, css_width: f32, css_height: f32, device_pixel_ratio: f32) {
        let ratio = if device_pixel_ratio > 0.0 { device_pixel_ratio } else { 1.0 };
        self.css_size = (css_width.max(1.0), css_height.max(1.0));
        self.device_pixel_ratio = ratio;

        let width = self.css_size.0 * ratio;
        let height = self.css_size.1 * ratio;
        self.camera.resize(width.round() as u32, height.round() as u32);
        self.bridge.set_screen_size(width, height);
        tracing::debug!(width, height, ratio, "viewport resized");
    }

    pub fn touch_start(&mut self, identifier: i32, x: f32, y: f32) {
        self.bridge.point_added(identifier, self.normalize(x, y));
    }

    pub fn touch_move(&mut self, identifier: i32, x: f32, y: f32) {
        self.bridge.point_updated(&identifier, self.normalize(x, y));
    }

    pub fn touch_end(&mut self, identifier: i32) {
        self.bridge.point_removed(&identifier);
    }

    /// The browser took the touches away; abort whatever was in progress.
    /// Events still queued for other fingers are delivered on the next tick.
    pub fn touch_cancel(&mut self, identifier: i32) {
        self.bridge.point_removed(&identifier);
        self.scale.cancel();
        self.rotate.cancel();
        self.pan.cancel();
    }

    /// Advance gestures and the card by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        let events = self.input.lock().drain();
        for event in &events {
            self.scale.handle(event);
            self.rotate.handle(event);
            self.pan.handle(event);
        }
        self.scale.update(&self.camera);
        self.rotate.update(&self.camera);
        self.pan.update(&self.camera);
        self.transformer.borrow_mut().tick(&mut self.target, dt);
    }

    /// Model matrix of the card, 16 floats in column-major order.
    pub fn model_matrix(&self) -> Vec<f32> {
        self.target.matrix().as_slice().to_vec()
    }

    /// View-projection matrix of the camera, 16 floats in column-major order.
    pub fn view_projection(&self) -> Vec<f32> {
        (self.camera.projection_matrix() * self.camera.view_matrix())
            .as_slice()
            .to_vec()
    }

    pub fn scale_factor(&self) -> f32 {
        self.target.scale.x
    }

    /// Names of the gestures currently recognized, e.g. `"scale rotate"`.
    pub fn active_gestures(&self) -> String {
        let mut active = Vec::new();
        if self.scale.state().is_active() {
            active.push("scale");
        }
        if self.rotate.state().is_active() {
            active.push("rotate");
        }
        if self.pan.state().is_active() {
            active.push("pan");
        }
        active.join(" ")
    }

    /// Put the card back at the origin.
    pub fn reset(&mut self) {
        self.target = LocalTransform::identity();
        let mut transformer = self.transformer.borrow_mut();
        transformer.sync(&self.target);
        transformer.set_pivot(None);
    }
}

impl WebManipulator {
    pub fn apply_config(&mut self, config: Config) {
        self.config = config;
        self.transformer.borrow_mut().set_speed(self.config.transformer.speed);
        self.rebuild_gestures();
    }

    pub fn target(&self) -> &LocalTransform {
        &self.target
    }

    fn normalize(&self, x: f32, y: f32) -> Point2<f32> {
        Point2::new(x / self.css_size.0, y / self.css_size.1)
    }

    /// Recreate gestures for the current config and pixel ratio. Touches in
    /// progress are dropped.
    fn rebuild_gestures(&mut self) {
        let mut gesture = self.config.gesture.clone();
        gesture.dots_per_cm *= self.device_pixel_ratio;

        self.scale = ScaleGesture::new(&gesture, &self.config.scale);
        self.rotate = RotateGesture::new(&gesture, &self.config.rotate);
        self.pan = PanGesture::new(&gesture, &self.config.pan);
        Transformer::attach_scale(&self.transformer, &mut self.scale);
        Transformer::attach_rotate(&self.transformer, &mut self.rotate);
        Transformer::attach_pan(&self.transformer, &mut self.pan);

        let threshold_px = self.config.input.movement_threshold_cm * gesture.dots_per_cm;
        let (width, height) = (
            self.css_size.0 * self.device_pixel_ratio,
            self.css_size.1 * self.device_pixel_ratio,
        );
        self.bridge = RemoteTouchBridge::new(Arc::clone(&self.input), width, height, threshold_px);
        self.input.lock().end_all();
        self.input.lock().drain();
        tracing::debug!(dots_per_cm = gesture.dots_per_cm, "gestures rebuilt");
    }
}

/// Dots per centimeter for a display with the given device pixel ratio.
#[wasm_bindgen]
pub fn dots_per_cm(device_pixel_ratio: f32) -> f32 {
    DEFAULT_DOTS_PER_CM * device_pixel_ratio
}
