/// Camera, rays and screen-to-plane projection
use nalgebra::{Matrix4, Point2, Point3, Unit, Vector3};

use crate::transform::Transform;

/// Rays closer to parallel with a plane than this never hit it.
pub const PARALLEL_EPSILON: f32 = 1e-6;

/// Projection mode for rendering
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionMode {
    Orthographic,
    Perspective,
}

/// Camera looking at the manipulated object. Screen coordinates are pixels
/// with the origin at the top-left corner and y growing downwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fov: f32,
    pub width: u32,
    pub height: u32,
    pub near: f32,
    pub far: f32,
    pub mode: ProjectionMode,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 5.0),
            target: Point3::new(0.0, 0.0, 0.0),
            up: Vector3::new(0.0, 1.0, 0.0),
            fov: std::f32::consts::PI / 4.0, // 45 degrees
            width,
            height,
            near: 0.1,
            far: 100.0,
            mode: ProjectionMode::Perspective,
        }
    }

    /// Orthographic camera on the +z axis looking at the origin.
    pub fn orthographic(width: u32, height: u32, distance: f32) -> Self {
        Self {
            position: Point3::new(0.0, 0.0, distance),
            mode: ProjectionMode::Orthographic,
            ..Self::new(width, height)
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }

    /// Resize the viewport, e.g. after the terminal or canvas changed size.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Create the projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        match self.mode {
            ProjectionMode::Perspective => {
                Matrix4::new_perspective(self.aspect(), self.fov, self.near, self.far)
            }
            ProjectionMode::Orthographic => {
                let height = (self.position - self.target).norm();
                let width = height * self.aspect();
                Matrix4::new_orthographic(
                    -width / 2.0,
                    width / 2.0,
                    -height / 2.0,
                    height / 2.0,
                    self.near,
                    self.far,
                )
            }
        }
    }

    /// Project a 3D point to screen space, returning pixel coordinates and
    /// normalized depth. Points outside the view volume yield `None`.
    pub fn project_to_screen(
        &self,
        point: &Point3<f32>,
        model_matrix: &Matrix4<f32>,
    ) -> Option<(f32, f32, f32)> {
        let mvp = Transform::mvp_matrix(
            model_matrix,
            &self.view_matrix(),
            &self.projection_matrix(),
        );

        // transform_point performs the homogeneous divide
        let ndc = mvp.transform_point(point);
        if !ndc.coords.iter().all(|c| c.is_finite()) {
            return None;
        }

        // Clip test
        if ndc.x < -1.0 || ndc.x > 1.0 || ndc.y < -1.0 || ndc.y > 1.0 || ndc.z < -1.0 || ndc.z > 1.0 {
            return None;
        }

        let screen_x = (ndc.x + 1.0) * 0.5 * self.width as f32;
        let screen_y = (1.0 - ndc.y) * 0.5 * self.height as f32;

        Some((screen_x, screen_y, ndc.z))
    }

    /// World-space ray through a screen position. Built by unprojecting the
    /// near and far plane points, which works for both projection modes.
    pub fn screen_ray(&self, screen: &Point2<f32>) -> Option<Ray> {
        let inverse = (self.projection_matrix() * self.view_matrix()).try_inverse()?;

        let ndc_x = screen.x / self.width.max(1) as f32 * 2.0 - 1.0;
        let ndc_y = 1.0 - screen.y / self.height.max(1) as f32 * 2.0;

        let near = inverse.transform_point(&Point3::new(ndc_x, ndc_y, -1.0));
        let far = inverse.transform_point(&Point3::new(ndc_x, ndc_y, 1.0));

        let direction = Unit::try_new(far - near, f32::EPSILON)?;
        if !near.coords.iter().all(|c| c.is_finite()) {
            return None;
        }
        Some(Ray {
            origin: near,
            direction,
        })
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

/// Half-line in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Unit<Vector3<f32>>,
}

impl Ray {
    pub fn at(&self, distance: f32) -> Point3<f32> {
        self.origin + self.direction.into_inner() * distance
    }
}

/// Plane defined by a point on it and its normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub point: Point3<f32>,
    pub normal: Unit<Vector3<f32>>,
}

impl Plane {
    pub fn new(point: Point3<f32>, normal: Unit<Vector3<f32>>) -> Self {
        Self { point, normal }
    }

    /// Build a plane from a raw normal; `None` if the normal is zero.
    pub fn from_normal(point: Point3<f32>, normal: Vector3<f32>) -> Option<Self> {
        Unit::try_new(normal, f32::EPSILON).map(|normal| Self { point, normal })
    }

    /// The z = 0 plane facing +z.
    pub fn xy() -> Self {
        Self::new(Point3::origin(), Vector3::z_axis())
    }

    /// Signed distance from the plane along its normal.
    pub fn distance_to(&self, point: &Point3<f32>) -> f32 {
        self.normal.dot(&(point - self.point))
    }

    /// Intersection of a ray with the plane. Parallel rays and planes
    /// behind the ray origin yield `None`.
    pub fn intersect(&self, ray: &Ray) -> Option<Point3<f32>> {
        let denom = self.normal.dot(ray.direction.as_ref());
        if denom.abs() < PARALLEL_EPSILON {
            return None;
        }
        let distance = self.normal.dot(&(self.point - ray.origin)) / denom;
        if distance < 0.0 || !distance.is_finite() {
            return None;
        }
        Some(ray.at(distance))
    }
}

impl Default for Plane {
    fn default() -> Self {
        Self::xy()
    }
}

/// Project a screen position onto a world plane as seen by `camera`.
pub fn screen_to_plane(screen: &Point2<f32>, camera: &Camera, plane: &Plane) -> Option<Point3<f32>> {
    camera.screen_ray(screen).and_then(|ray| plane.intersect(&ray))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &Point3<f32>, b: &Point3<f32>) -> bool {
        (a - b).norm() < 1e-3
    }

    #[test]
    fn test_camera_creation() {
        let camera = Camera::new(800, 600);
        assert_eq!(camera.mode, ProjectionMode::Perspective);
        assert!((camera.aspect() - 800.0 / 600.0).abs() < 1e-6);
    }

    #[test]
    fn test_view_matrix() {
        let camera = Camera::new(800, 600);
        let view = camera.view_matrix();
        // View matrix should be non-zero
        assert!(view.norm() > 0.0);
    }

    #[test]
    fn test_orthographic_screen_center_hits_origin() {
        let camera = Camera::orthographic(100, 100, 10.0);
        let hit = screen_to_plane(&Point2::new(50.0, 50.0), &camera, &Plane::xy()).unwrap();
        assert!(close(&hit, &Point3::origin()));
    }

    #[test]
    fn test_orthographic_pixels_map_linearly() {
        // 10 world units across 100 pixels
        let camera = Camera::orthographic(100, 100, 10.0);
        let plane = Plane::xy();
        let right = screen_to_plane(&Point2::new(60.0, 50.0), &camera, &plane).unwrap();
        let up = screen_to_plane(&Point2::new(50.0, 40.0), &camera, &plane).unwrap();
        assert!(close(&right, &Point3::new(1.0, 0.0, 0.0)));
        assert!(close(&up, &Point3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_perspective_round_trip_through_screen() {
        let camera = Camera::new(800, 600);
        let world = Point3::new(0.5, -0.25, 0.0);
        let (x, y, _) = camera
            .project_to_screen(&world, &Matrix4::identity())
            .unwrap();
        let hit = screen_to_plane(&Point2::new(x, y), &camera, &Plane::xy()).unwrap();
        assert!(close(&hit, &world));
    }

    #[test]
    fn test_parallel_ray_has_no_intersection() {
        let plane = Plane::xy();
        let ray = Ray {
            origin: Point3::new(0.0, 0.0, 1.0),
            direction: Vector3::x_axis(),
        };
        assert!(plane.intersect(&ray).is_none());
    }

    #[test]
    fn test_edge_on_plane_is_rejected() {
        // Camera looks down -z, plane contains the viewing direction
        let camera = Camera::orthographic(100, 100, 10.0);
        let plane = Plane::new(Point3::origin(), Vector3::x_axis());
        assert!(screen_to_plane(&Point2::new(50.0, 50.0), &camera, &plane).is_none());
    }

    #[test]
    fn test_plane_behind_camera_is_rejected() {
        let camera = Camera::orthographic(100, 100, 10.0);
        let plane = Plane::new(Point3::new(0.0, 0.0, 50.0), Vector3::z_axis());
        assert!(screen_to_plane(&Point2::new(50.0, 50.0), &camera, &plane).is_none());
    }

    #[test]
    fn test_zero_normal_plane() {
        assert!(Plane::from_normal(Point3::origin(), Vector3::zeros()).is_none());
    }
}
