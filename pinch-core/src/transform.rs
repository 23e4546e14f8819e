/// 3D transformation matrices and the local transform of a manipulated object
use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector3};

/// Position, rotation and scale of an object relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalTransform {
    pub position: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub scale: Vector3<f32>,
}

impl LocalTransform {
    pub fn new(position: Vector3<f32>, rotation: UnitQuaternion<f32>, scale: Vector3<f32>) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    /// Parent-from-local matrix, applying scale, then rotation, then translation.
    pub fn matrix(&self) -> Matrix4<f32> {
        Transform::translation_matrix(self.position.x, self.position.y, self.position.z)
            * Transform::rotation_matrix(&self.rotation)
            * Transform::scale_matrix(self.scale.x, self.scale.y, self.scale.z)
    }

    /// Map a point from local space into parent space.
    pub fn transform_point(&self, point: &Point3<f32>) -> Point3<f32> {
        let scaled = point.coords.component_mul(&self.scale);
        Point3::from(self.rotation * scaled + self.position)
    }

    /// Map a parent-space point into local space. `None` when a scale
    /// component is zero.
    pub fn inverse_transform_point(&self, point: &Point3<f32>) -> Option<Point3<f32>> {
        if self.scale.iter().any(|s| s.abs() < f32::EPSILON) {
            return None;
        }
        let unrotated = self.rotation.inverse() * (point.coords - self.position);
        Some(Point3::from(unrotated.component_div(&self.scale)))
    }
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Transform builder for 3D transformations
pub struct Transform;

impl Transform {
    /// Create a rotation matrix from a quaternion
    pub fn rotation_matrix(rotation: &UnitQuaternion<f32>) -> Matrix4<f32> {
        rotation.to_homogeneous()
    }

    /// Create a translation matrix
    pub fn translation_matrix(x: f32, y: f32, z: f32) -> Matrix4<f32> {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    /// Create a scale matrix
    pub fn scale_matrix(sx: f32, sy: f32, sz: f32) -> Matrix4<f32> {
        Matrix4::new_nonuniform_scaling(&Vector3::new(sx, sy, sz))
    }

    /// Create a model-view-projection matrix
    pub fn mvp_matrix(
        model: &Matrix4<f32>,
        view: &Matrix4<f32>,
        projection: &Matrix4<f32>,
    ) -> Matrix4<f32> {
        projection * view * model
    }
}
