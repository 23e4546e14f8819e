/// ASCII rasterizer for terminal rendering
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use nalgebra::{Matrix4, Point2, Vector3};
use pinch_core::{Camera, Mesh, Triangle};
use std::io::Write;

/// Terminal cells are about twice as tall as they are wide. The camera works
/// in square pixels; one cell spans one pixel across and this many down.
pub const CELL_ASPECT: f32 = 2.0;

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &['.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Marker drawn under a touch point.
pub const TOUCH_MARKER: char = 'O';
/// Marker drawn at the scale and rotation pivots.
pub const PIVOT_MARKER: char = 'X';

/// Screen position, in camera pixels, of the center of a terminal cell.
pub fn cell_to_screen(column: u16, row: u16) -> Point2<f32> {
    Point2::new(column as f32 + 0.5, (row as f32 + 0.5) * CELL_ASPECT)
}

/// ASCII renderer that converts the card mesh to terminal characters
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    char_buffer: Vec<char>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            char_buffer: vec![' '; size],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Viewport size in camera pixels.
    pub fn viewport(&self) -> (u32, u32) {
        (self.width as u32, (self.height as f32 * CELL_ASPECT) as u32)
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        *self = Self::new(width, height);
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.char_buffer.fill(' ');
    }

    /// Character at a cell, mostly for tests.
    pub fn cell(&self, column: usize, row: usize) -> Option<char> {
        (column < self.width && row < self.height).then(|| self.char_buffer[row * self.width + column])
    }

    /// Draw a card tessellated by [`Mesh::card`] with a checkerboard of
    /// `columns` cells per row.
    pub fn render_card(&mut self, mesh: &Mesh, columns: usize, model_matrix: &Matrix4<f32>, camera: &Camera) {
        let columns = columns.max(1);
        for (index, triangle) in mesh.triangles.iter().enumerate() {
            let cell = index / 2;
            let dark = (cell % columns + cell / columns) % 2 == 1;
            let facing = model_matrix.transform_vector(&triangle.calculate_normal());
            self.render_triangle(triangle, model_matrix, camera, &facing, dark);
        }
    }

    fn render_triangle(
        &mut self,
        triangle: &Triangle,
        model_matrix: &Matrix4<f32>,
        camera: &Camera,
        facing: &Vector3<f32>,
        dark: bool,
    ) {
        let mut screen_coords = [(0.0, 0.0, 0.0); 3];
        for (slot, vertex) in screen_coords.iter_mut().zip(&triangle.vertices) {
            let Some((x, y, z)) = camera.project_to_screen(&vertex.position, model_matrix) else {
                return; // Triangle is clipped
            };
            *slot = (x, y / CELL_ASPECT, z);
        }

        // Brightness from how squarely the card faces the camera
        let toward_camera = (camera.position - camera.target).normalize();
        let brightness = facing.try_normalize(f32::EPSILON).map_or(0.0, |n| n.dot(&toward_camera).abs());
        let top = LUMINOSITY_RAMP.len() - 1;
        let mut char_index = (brightness * top as f32) as usize;
        if dark {
            char_index /= 2;
        }
        let character = LUMINOSITY_RAMP[char_index.min(top)];

        self.rasterize_triangle(&screen_coords, character);
    }

    fn rasterize_triangle(&mut self, coords: &[(f32, f32, f32); 3], character: char) {
        let (v0, v1, v2) = (coords[0], coords[1], coords[2]);

        // Bounding box
        let min_x = v0.0.min(v1.0).min(v2.0).floor() as i32;
        let max_x = v0.0.max(v1.0).max(v2.0).ceil() as i32;
        let min_y = v0.1.min(v1.1).min(v2.1).floor() as i32;
        let max_y = v0.1.max(v1.1).max(v2.1).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                let Some((w0, w1, w2)) = barycentric((v0.0, v0.1), (v1.0, v1.1), (v2.0, v2.1), (px, py))
                else {
                    continue;
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;
                let idx = y as usize * self.width + x as usize;
                if depth < self.depth_buffer[idx] {
                    self.depth_buffer[idx] = depth;
                    self.char_buffer[idx] = character;
                }
            }
        }
    }

    /// Put `marker` over whatever is drawn at a screen position given in
    /// camera pixels.
    pub fn mark(&mut self, screen: &Point2<f32>, marker: char) {
        if screen.x < 0.0 || screen.y < 0.0 {
            return;
        }
        let column = screen.x as usize;
        let row = (screen.y / CELL_ASPECT) as usize;
        if column < self.width && row < self.height {
            let idx = row * self.width + column;
            self.char_buffer[idx] = marker;
            self.depth_buffer[idx] = f32::NEG_INFINITY;
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for y in 0..self.height {
            for x in 0..self.width {
                let c = self.char_buffer[y * self.width + x];

                let color = match c {
                    TOUCH_MARKER => Color::Yellow,
                    PIVOT_MARKER => Color::Red,
                    ' ' | '.' | ':' => Color::DarkGrey,
                    '-' | '=' => Color::Grey,
                    '+' | '*' => Color::White,
                    '#' | '%' | '@' => Color::Cyan,
                    _ => Color::White,
                };

                writer.queue(SetForegroundColor(color))?;
                writer.queue(Print(c))?;
            }
            if y + 1 < self.height {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> (AsciiRenderer, Camera) {
        let renderer = AsciiRenderer::new(40, 20);
        let (width, height) = renderer.viewport();
        (renderer, Camera::orthographic(width, height, 10.0))
    }

    #[test]
    fn test_barycentric_degenerate() {
        assert!(barycentric((0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (0.5, 0.5)).is_none());
    }

    #[test]
    fn test_card_covers_center_only() {
        let (mut renderer, camera) = scene();
        let card = Mesh::card(4.0, 4.0, 2, 2);
        renderer.render_card(&card, 2, &Matrix4::identity(), &camera);

        assert_ne!(renderer.cell(20, 10), Some(' '));
        assert_eq!(renderer.cell(0, 0), Some(' '));
        assert_eq!(renderer.cell(39, 19), Some(' '));
    }

    #[test]
    fn test_checker_alternates() {
        let (mut renderer, camera) = scene();
        let card = Mesh::card(8.0, 8.0, 2, 2);
        renderer.render_card(&card, 2, &Matrix4::identity(), &camera);

        // 1 world unit is 4 columns and 2 rows here
        let bottom_left = renderer.cell(12, 14);
        let bottom_right = renderer.cell(28, 14);
        assert_ne!(bottom_left, bottom_right);
        assert_eq!(bottom_left, renderer.cell(28, 6));
    }

    #[test]
    fn test_marker_overrides_card() {
        let (mut renderer, camera) = scene();
        renderer.render_card(&Mesh::card(4.0, 4.0, 1, 1), 1, &Matrix4::identity(), &camera);
        renderer.mark(&cell_to_screen(20, 10), TOUCH_MARKER);
        assert_eq!(renderer.cell(20, 10), Some(TOUCH_MARKER));
        renderer.mark(&Point2::new(-1.0, 5.0), PIVOT_MARKER);
        renderer.mark(&Point2::new(1000.0, 5.0), PIVOT_MARKER);
    }
}
