use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use std::cell::RefCell;
use std::rc::Rc;

use super::FontMetrics;
use crate::color::Rgb;

/// 2D drawing target for the canvas renderer
///
/// Not safe for two live subscriptions at once; callers make sure only one
/// pipeline paints a given surface at a time.
pub trait Surface {
    fn size(&self) -> (u32, u32);

    /// Fills a rectangle; `None` clears it to transparent
    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Option<Rgb>);

    /// Draws one glyph with its top-left corner at `(x, y)`
    fn fill_glyph(&mut self, glyph: char, x: f32, y: f32, font: &FontMetrics, color: Rgb);

    /// Current pixels; what an export/recording collaborator reads
    fn snapshot(&self) -> RgbaImage;

    fn clear(&mut self, background: Option<Rgb>) {
        let (width, height) = self.size();
        self.fill_rect(0.0, 0.0, width as f32, height as f32, background);
    }
}

/// Lets one surface be shared by several renderers and read by the host
impl<S: Surface> Surface for Rc<RefCell<S>> {
    fn size(&self) -> (u32, u32) {
        self.borrow().size()
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Option<Rgb>) {
        self.borrow_mut().fill_rect(x, y, width, height, color);
    }

    fn fill_glyph(&mut self, glyph: char, x: f32, y: f32, font: &FontMetrics, color: Rgb) {
        self.borrow_mut().fill_glyph(glyph, x, y, font, color);
    }

    fn snapshot(&self) -> RgbaImage {
        self.borrow().snapshot()
    }
}

/// In-memory RGBA surface with a built-in procedural glyph rasterizer
#[derive(Debug, Clone)]
pub struct RasterSurface {
    image: RgbaImage,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Clips a float rectangle to whole pixels inside the surface
    fn clip(&self, x: f32, y: f32, width: f32, height: f32) -> Option<(u32, u32, u32, u32)> {
        let (sw, sh) = self.image.dimensions();
        let x0 = x.floor().max(0.0) as u32;
        let y0 = y.floor().max(0.0) as u32;
        let x1 = ((x + width).ceil().max(0.0) as u32).min(sw);
        let y1 = ((y + height).ceil().max(0.0) as u32).min(sh);
        (x1 > x0 && y1 > y0).then_some((x0, y0, x1, y1))
    }
}

impl Surface for RasterSurface {
    fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Option<Rgb>) {
        let Some((x0, y0, x1, y1)) = self.clip(x, y, width, height) else {
            return;
        };
        let pixel = match color {
            Some(Rgb([r, g, b])) => Rgba([r, g, b, 255]),
            None => Rgba([0, 0, 0, 0]),
        };
        let rect = Rect::at(x0 as i32, y0 as i32).of_size(x1 - x0, y1 - y0);
        draw_filled_rect_mut(&mut self.image, rect, pixel);
    }

    fn fill_glyph(&mut self, glyph: char, x: f32, y: f32, font: &FontMetrics, color: Rgb) {
        // glyph box: one advance wide, font size tall (capped by the line)
        let box_height = font.size.min(font.line_height);
        let Some((x0, y0, x1, y1)) = self.clip(x, y, font.char_width, box_height) else {
            return;
        };
        let (w, h) = (font.char_width.max(1.0), box_height.max(1.0));
        let Rgb([r, g, b]) = color;

        for py in y0..y1 {
            for px in x0..x1 {
                // map the pixel centre onto the 8x8 glyph grid
                let gx = (((px as f32 + 0.5 - x) / w) * 8.0).clamp(0.0, 7.0) as u32;
                let gy = (((py as f32 + 0.5 - y) / h) * 8.0).clamp(0.0, 7.0) as u32;
                if should_draw_pixel(glyph, gx, gy) {
                    self.image.put_pixel(px, py, Rgba([r, g, b, 255]));
                }
            }
        }
    }

    fn snapshot(&self) -> RgbaImage {
        self.image.clone()
    }
}

/// Determine if a pixel should be drawn for a character at a given position
///
/// Simple 8x8 bitmap shapes for the glyphs of the built-in ramps. Unknown
/// glyphs render as a filled square, space and other whitespace as nothing.
///
/// # Arguments
/// * `ch` - The character
/// * `x` - X position within 8x8 grid (0-7)
/// * `y` - Y position within 8x8 grid (0-7)
fn should_draw_pixel(ch: char, x: u32, y: u32) -> bool {
    match ch {
        c if c.is_whitespace() => false,

        '|' => x == 3 || x == 4,
        '-' => y == 3 || y == 4,
        '/' => {
            let expected_x = 7 - y;
            x == expected_x || x == expected_x.saturating_sub(1)
        }
        '\\' => x == y || x == y.saturating_sub(1),

        '.' => (3..=4).contains(&x) && y >= 6,
        ',' => (3..=4).contains(&x) && y >= 5,
        ':' => (3..=4).contains(&x) && (y == 2 || y == 5),
        ';' => (3..=4).contains(&x) && (y == 2 || y >= 5),
        '=' => y == 2 || y == 5,
        '+' => x == 3 || x == 4 || y == 3 || y == 4,
        '*' => x == 3 || x == 4 || y == 3 || y == 4 || x == y || x == 7 - y,
        '#' => x == 2 || x == 5 || y == 2 || y == 5,
        '%' => (x + y == 7) || (x <= 1 && y <= 1) || (x >= 6 && y >= 6),
        '@' => {
            let dx = x as i32 - 3;
            let dy = y as i32 - 3;
            dx * dx + dy * dy <= 12
        }

        // shade blocks: increasing checker density
        '░' => (x + y) % 4 == 0,
        '▒' => (x + y) % 2 == 0,
        '▓' => (x + y) % 4 != 0,
        '█' => true,

        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font(size: f32) -> FontMetrics {
        FontMetrics {
            family: "monospace".into(),
            size,
            line_height: size,
            char_width: size,
        }
    }

    #[test]
    fn test_clear_transparent_and_solid() {
        let mut surface = RasterSurface::new(4, 4);
        surface.clear(Some(Rgb::new(1, 2, 3)));
        assert_eq!(surface.image().get_pixel(3, 3).0, [1, 2, 3, 255]);
        surface.clear(None);
        assert_eq!(surface.image().get_pixel(0, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_fill_rect_clipped() {
        let mut surface = RasterSurface::new(4, 4);
        surface.fill_rect(2.0, 2.0, 10.0, 10.0, Some(Rgb::WHITE));
        assert_eq!(surface.image().get_pixel(1, 1).0[3], 0);
        assert_eq!(surface.image().get_pixel(3, 3).0, [255, 255, 255, 255]);
        surface.fill_rect(-5.0, -5.0, 1.0, 1.0, Some(Rgb::WHITE));
        assert_eq!(surface.image().get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn test_space_glyph_paints_nothing() {
        let mut surface = RasterSurface::new(8, 8);
        surface.fill_glyph(' ', 0.0, 0.0, &font(8.0), Rgb::WHITE);
        assert!(surface.image().pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn test_vertical_bar_glyph() {
        let mut surface = RasterSurface::new(8, 8);
        surface.fill_glyph('|', 0.0, 0.0, &font(8.0), Rgb::WHITE);
        assert_eq!(surface.image().get_pixel(3, 0).0, [255, 255, 255, 255]);
        assert_eq!(surface.image().get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn test_glyph_scaled_to_cell() {
        let mut surface = RasterSurface::new(16, 16);
        surface.fill_glyph('█', 8.0, 8.0, &font(8.0), Rgb::new(9, 9, 9));
        assert_eq!(surface.image().get_pixel(8, 8).0, [9, 9, 9, 255]);
        assert_eq!(surface.image().get_pixel(15, 15).0, [9, 9, 9, 255]);
        assert_eq!(surface.image().get_pixel(7, 7).0[3], 0);
    }

    #[test]
    fn test_shared_surface() {
        let shared = Rc::new(RefCell::new(RasterSurface::new(2, 2)));
        let mut handle = shared.clone();
        handle.clear(Some(Rgb::WHITE));
        assert_eq!(shared.snapshot().get_pixel(1, 1).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_should_draw_pixel_horizontal() {
        assert!(should_draw_pixel('-', 0, 3));
        assert!(should_draw_pixel('-', 7, 4));
        assert!(!should_draw_pixel('-', 0, 0));
    }
}
