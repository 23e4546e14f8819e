/// Card, camera and gesture pipeline driven by the terminal host
use nalgebra::{Matrix4, Point2, Point3};
use pinch_core::{
    Camera, Config, Gesture, GestureState, LocalTransform, Mesh, PanGesture, RotateGesture,
    ScaleGesture, SharedTransformer, TouchInput, Transformer,
};

/// Card size in world units.
pub const CARD_WIDTH: f32 = 3.0;
pub const CARD_HEIGHT: f32 = 2.0;
/// Checker cells across the card.
pub const CARD_COLUMNS: usize = 6;
pub const CARD_ROWS: usize = 4;

pub struct Scene {
    pub camera: Camera,
    pub input: TouchInput,
    pub scale: ScaleGesture,
    pub rotate: RotateGesture,
    pub pan: PanGesture,
    mesh: Mesh,
    transformer: SharedTransformer,
    target: LocalTransform,
    home: LocalTransform,
}

impl Scene {
    pub fn new(config: &Config, width: u32, height: u32) -> Self {
        let home = LocalTransform::identity();
        let transformer = Transformer::shared(&config.transformer, &home);

        let mut scale = ScaleGesture::new(&config.gesture, &config.scale);
        let mut rotate = RotateGesture::new(&config.gesture, &config.rotate);
        let mut pan = PanGesture::new(&config.gesture, &config.pan);
        Transformer::attach_scale(&transformer, &mut scale);
        Transformer::attach_rotate(&transformer, &mut rotate);
        Transformer::attach_pan(&transformer, &mut pan);

        Self {
            camera: Camera::new(width, height),
            input: TouchInput::new(),
            scale,
            rotate,
            pan,
            mesh: Mesh::card(CARD_WIDTH, CARD_HEIGHT, CARD_COLUMNS, CARD_ROWS),
            transformer,
            target: home,
            home,
        }
    }

    /// Hand queued touches to every gesture, recognize, then ease the card.
    pub fn frame(&mut self, dt: f32) {
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

    /// Drop all touches and put the card back where it started.
    pub fn reset(&mut self) {
        self.input.end_all();
        self.input.drain();
        self.scale.cancel();
        self.rotate.cancel();
        self.pan.cancel();

        self.target = self.home;
        let mut transformer = self.transformer.borrow_mut();
        transformer.sync(&self.home);
        transformer.set_pivot(None);
        tracing::info!("card reset");
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.resize(width, height);
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn target(&self) -> &LocalTransform {
        &self.target
    }

    pub fn model_matrix(&self) -> Matrix4<f32> {
        self.target.matrix()
    }

    /// Scale and rotation pivots currently set.
    pub fn pivots(&self) -> Vec<Point3<f32>> {
        let transformer = self.transformer.borrow();
        [transformer.scale_pivot(), transformer.rotation_pivot()]
            .into_iter()
            .flatten()
            .collect()
    }

    /// Screen positions of the pivots that are in view.
    pub fn pivots_on_screen(&self) -> Vec<Point2<f32>> {
        self.pivots()
            .iter()
            .filter_map(|pivot| self.camera.project_to_screen(pivot, &Matrix4::identity()))
            .map(|(x, y, _)| Point2::new(x, y))
            .collect()
    }

    pub fn states(&self) -> [(&'static str, GestureState); 3] {
        [
            ("scale", self.scale.state()),
            ("rotate", self.rotate.state()),
            ("pan", self.pan.state()),
        ]
    }
}
