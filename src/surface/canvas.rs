//! Software RGBA canvas with a centred world coordinate system.
//!
//! Coordinate system:
//! - (0, 0) = centre of canvas
//! - +X = right, +Y = up
//! - `view_size` world units from the centre reach each edge
//!
//! Shapes are filled with opaque colour; a pixel is covered when its centre
//! lies inside the shape.

use super::{Frame, Surface};

/// 8-bit RGBA colour.
pub type Rgba = [u8; 4];

/// Opaque white, the initial drawing colour.
pub const WHITE: Rgba = [255, 255, 255, 255];

/// A single draw command in world coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Fill the whole canvas.
    Clear { colour: Rgba },
    /// Axis-aligned rectangle centred at (x, y).
    Rect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        colour: Rgba,
    },
    /// Filled circle.
    Circle { x: f32, y: f32, r: f32, colour: Rgba },
    /// One-pixel line segment.
    Line {
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        colour: Rgba,
    },
}

/// Convert a 0.0-1.0 float channel to a byte.
#[inline]
pub fn channel_to_u8(v: f64) -> u8 {
    if v.is_nan() {
        return 0;
    }
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// CPU raster the built-in programs draw into.
pub struct Canvas {
    width: usize,
    height: usize,
    /// World units from the centre to each edge.
    view_size: f32,
    /// Row-major RGBA8, top row first.
    pixels: Vec<u8>,
}

impl Canvas {
    /// Create a transparent canvas.
    pub fn new(width: usize, height: usize, view_size: f32) -> Self {
        Self {
            width,
            height,
            view_size,
            pixels: vec![0u8; width * height * 4],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn view_size(&self) -> f32 {
        self.view_size
    }

    /// World X to continuous pixel X.
    #[inline]
    fn to_px_x(&self, x: f32) -> f32 {
        (x + self.view_size) / (2.0 * self.view_size) * self.width as f32
    }

    /// World Y to continuous pixel Y (flipped, +Y is up).
    #[inline]
    fn to_px_y(&self, y: f32) -> f32 {
        (self.view_size - y) / (2.0 * self.view_size) * self.height as f32
    }

    /// Pixels per world unit along X.
    #[inline]
    fn scale_x(&self) -> f32 {
        self.width as f32 / (2.0 * self.view_size)
    }

    #[inline]
    fn scale_y(&self) -> f32 {
        self.height as f32 / (2.0 * self.view_size)
    }

    #[inline]
    fn put(&mut self, px: usize, py: usize, colour: Rgba) {
        let idx = (py * self.width + px) * 4;
        self.pixels[idx..idx + 4].copy_from_slice(&colour);
    }

    /// Pixel index range whose centres fall inside [lo, hi).
    fn covered(lo: f32, hi: f32, limit: usize) -> std::ops::Range<usize> {
        let start = (lo - 0.5).ceil().max(0.0) as usize;
        let end = ((hi - 0.5).ceil().max(0.0) as usize).min(limit);
        start.min(end)..end
    }

    /// Fill every pixel with one colour.
    pub fn fill(&mut self, colour: Rgba) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&colour);
        }
    }

    /// Fill a rectangle centred at (x, y).
    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, colour: Rgba) {
        let (w, h) = (w.abs(), h.abs());
        let x0 = self.to_px_x(x - w / 2.0);
        let x1 = self.to_px_x(x + w / 2.0);
        let y0 = self.to_px_y(y + h / 2.0);
        let y1 = self.to_px_y(y - h / 2.0);

        for py in Self::covered(y0, y1, self.height) {
            for px in Self::covered(x0, x1, self.width) {
                self.put(px, py, colour);
            }
        }
    }

    /// Fill a circle centred at (x, y).
    pub fn fill_circle(&mut self, x: f32, y: f32, r: f32, colour: Rgba) {
        let r = r.abs();
        let cx = self.to_px_x(x);
        let cy = self.to_px_y(y);
        let rx = r * self.scale_x();
        let ry = r * self.scale_y();
        if rx <= 0.0 || ry <= 0.0 {
            return;
        }

        for py in Self::covered(cy - ry, cy + ry, self.height) {
            let dy = (py as f32 + 0.5 - cy) / ry;
            for px in Self::covered(cx - rx, cx + rx, self.width) {
                let dx = (px as f32 + 0.5 - cx) / rx;
                if dx * dx + dy * dy <= 1.0 {
                    self.put(px, py, colour);
                }
            }
        }
    }

    /// Draw a one-pixel line by sampling along its longer axis.
    pub fn draw_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, colour: Rgba) {
        let (ax, ay) = (self.to_px_x(x0), self.to_px_y(y0));
        let (bx, by) = (self.to_px_x(x1), self.to_px_y(y1));
        let Some((t0, t1)) = self.clip_segment(ax, ay, bx, by) else {
            return;
        };
        let (ax, ay, bx, by) = (
            ax + (bx - ax) * t0,
            ay + (by - ay) * t0,
            ax + (bx - ax) * t1,
            ay + (by - ay) * t1,
        );
        let steps = (bx - ax).abs().max((by - ay).abs()).ceil().max(1.0) as usize;

        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let px = (ax + (bx - ax) * t).floor();
            let py = (ay + (by - ay) * t).floor();
            if px >= 0.0 && py >= 0.0 && (px as usize) < self.width && (py as usize) < self.height
            {
                self.put(px as usize, py as usize, colour);
            }
        }
    }

    /// Liang-Barsky clip of a pixel-space segment against the canvas.
    ///
    /// Returns the visible parameter range, or `None` when nothing is visible.
    fn clip_segment(&self, ax: f32, ay: f32, bx: f32, by: f32) -> Option<(f32, f32)> {
        if !(ax.is_finite() && ay.is_finite() && bx.is_finite() && by.is_finite()) {
            return None;
        }
        let (dx, dy) = (bx - ax, by - ay);
        let mut t0 = 0.0f32;
        let mut t1 = 1.0f32;
        let edges = [
            (-dx, ax),
            (dx, self.width as f32 - ax),
            (-dy, ay),
            (dy, self.height as f32 - ay),
        ];
        for (p, q) in edges {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
            if t0 > t1 {
                return None;
            }
        }
        Some((t0, t1))
    }

    /// Apply one draw command.
    pub fn paint(&mut self, shape: &Shape) {
        match *shape {
            Shape::Clear { colour } => self.fill(colour),
            Shape::Rect { x, y, w, h, colour } => self.fill_rect(x, y, w, h, colour),
            Shape::Circle { x, y, r, colour } => self.fill_circle(x, y, r, colour),
            Shape::Line {
                x0,
                y0,
                x1,
                y1,
                colour,
            } => self.draw_line(x0, y0, x1, y1, colour),
        }
    }
}

impl Surface for Canvas {
    fn clear(&mut self) {
        self.pixels.fill(0);
    }

    fn capture(&self) -> Frame {
        // Dimensions always match the buffer built in `new`
        Frame::new(self.width as u32, self.height as u32, self.pixels.clone())
            .unwrap_or_else(|_| Frame::blank(self.width as u32, self.height as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba = [255, 0, 0, 255];

    #[test]
    fn test_clear_is_transparent() {
        let mut canvas = Canvas::new(4, 4, 1.0);
        canvas.fill(RED);
        canvas.clear();
        assert!(canvas.capture().pixels().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_rect_covers_centre_quadrant() {
        // 10x10 pixels, world -5..5 so one unit per pixel
        let mut canvas = Canvas::new(10, 10, 5.0);
        canvas.fill_rect(0.0, 0.0, 4.0, 2.0, RED);
        let frame = canvas.capture();

        // Covers x in 3..7, y in 4..6
        assert_eq!(frame.pixel(3, 4), RED);
        assert_eq!(frame.pixel(6, 5), RED);
        assert_eq!(frame.pixel(2, 4), [0; 4]);
        assert_eq!(frame.pixel(7, 5), [0; 4]);
        assert_eq!(frame.pixel(4, 3), [0; 4]);
        assert_eq!(frame.pixel(4, 6), [0; 4]);
    }

    #[test]
    fn test_positive_y_is_up() {
        let mut canvas = Canvas::new(10, 10, 5.0);
        canvas.fill_rect(0.0, 4.0, 10.0, 2.0, RED);
        let frame = canvas.capture();
        assert_eq!(frame.pixel(5, 0), RED);
        assert_eq!(frame.pixel(5, 9), [0; 4]);
    }

    #[test]
    fn test_circle_is_round() {
        let mut canvas = Canvas::new(20, 20, 10.0);
        canvas.fill_circle(0.0, 0.0, 5.0, RED);
        let frame = canvas.capture();
        assert_eq!(frame.pixel(10, 10), RED);
        assert_eq!(frame.pixel(14, 10), RED);
        // Corner of the bounding box lies outside the circle
        assert_eq!(frame.pixel(5, 5), [0; 4]);
        assert_eq!(frame.pixel(16, 10), [0; 4]);
    }

    #[test]
    fn test_shapes_clip_at_edges() {
        let mut canvas = Canvas::new(8, 8, 4.0);
        canvas.fill_circle(10.0, 10.0, 3.0, RED);
        canvas.fill_rect(-100.0, 0.0, 50.0, 50.0, RED);
        canvas.draw_line(-100.0, 0.0, 100.0, 0.0, RED);
        let frame = canvas.capture();
        assert_eq!(frame.pixel(0, 4), RED);
        assert_eq!(frame.pixel(7, 4), RED);
    }

    #[test]
    fn test_paint_dispatches() {
        let mut canvas = Canvas::new(4, 4, 2.0);
        canvas.paint(&Shape::Clear { colour: RED });
        assert_eq!(canvas.capture().pixel(0, 0), RED);
    }

    #[test]
    fn test_channel_to_u8() {
        assert_eq!(channel_to_u8(0.0), 0);
        assert_eq!(channel_to_u8(1.0), 255);
        assert_eq!(channel_to_u8(2.0), 255);
        assert_eq!(channel_to_u8(-1.0), 0);
        assert_eq!(channel_to_u8(f64::NAN), 0);
    }
}
