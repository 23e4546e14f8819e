/// Mesh primitives for the manipulated card
use nalgebra::{Point3, Vector3};

/// A 3D vertex with position and normal
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

impl Vertex {
    pub fn new(x: f32, y: f32, z: f32, nx: f32, ny: f32, nz: f32) -> Self {
        Self {
            position: Point3::new(x, y, z),
            normal: Vector3::new(nx, ny, nz),
        }
    }
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Calculate the face normal from the triangle's vertices
    pub fn calculate_normal(&self) -> Vector3<f32> {
        let v0 = self.vertices[0].position;
        let v1 = self.vertices[1].position;
        let v2 = self.vertices[2].position;

        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        edge1.cross(&edge2).normalize()
    }
}

/// A 3D mesh composed of triangles
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    /// Flat card on the z = 0 plane centered at the origin, split into
    /// `columns` x `rows` cells of two triangles each. Triangles are emitted
    /// cell by cell, row-major, so `index / 2` identifies the cell.
    pub fn card(width: f32, height: f32, columns: usize, rows: usize) -> Self {
        let columns = columns.max(1);
        let rows = rows.max(1);
        let cell_w = width / columns as f32;
        let cell_h = height / rows as f32;
        let left = -width / 2.0;
        let bottom = -height / 2.0;

        let mut mesh = Self::with_capacity(columns * rows * 2);
        for row in 0..rows {
            for column in 0..columns {
                let x0 = left + column as f32 * cell_w;
                let y0 = bottom + row as f32 * cell_h;
                let (x1, y1) = (x0 + cell_w, y0 + cell_h);

                mesh.add_triangle(Triangle::new(
                    Vertex::new(x0, y0, 0.0, 0.0, 0.0, 1.0),
                    Vertex::new(x1, y0, 0.0, 0.0, 0.0, 1.0),
                    Vertex::new(x1, y1, 0.0, 0.0, 0.0, 1.0),
                ));
                mesh.add_triangle(Triangle::new(
                    Vertex::new(x0, y0, 0.0, 0.0, 0.0, 1.0),
                    Vertex::new(x1, y1, 0.0, 0.0, 0.0, 1.0),
                    Vertex::new(x0, y1, 0.0, 0.0, 0.0, 1.0),
                ));
            }
        }

        mesh
    }
}
