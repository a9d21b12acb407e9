//! Renderers turn a [`RenderedFrame`] into an artifact the host can display.
//!
//! Both renderers are pipeline stages. Neither keeps the frame after
//! `render` returns.

pub mod canvas;
pub mod markup;
pub mod surface;

pub use canvas::{CanvasArtifact, CanvasOptions, CanvasRenderer, PaintMode};
pub use markup::{MarkupNode, MarkupOptions, MarkupRenderer};
pub use surface::{RasterSurface, Surface};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::frame::RenderedFrame;

/// Consumes one glyph grid, produces one artifact
pub trait Renderer {
    type Artifact;

    fn render(&mut self, frame: RenderedFrame) -> Result<Self::Artifact>;
}

/// Font and cell layout used to place glyphs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontMetrics {
    pub family: String,
    /// Font size in px
    pub size: f32,
    /// Vertical advance per row in px
    pub line_height: f32,
    /// Horizontal advance per glyph in px
    pub char_width: f32,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            family: "monospace".to_string(),
            size: 7.0,
            line_height: 7.0,
            char_width: 4.2,
        }
    }
}

impl FontMetrics {
    /// Top-left pixel position of a grid cell
    pub fn cell_origin(&self, col: u32, row: u32) -> (f32, f32) {
        (col as f32 * self.char_width, row as f32 * self.line_height)
    }

    /// Pixel extent of a `columns × rows` grid
    pub fn grid_extent(&self, columns: u32, rows: u32) -> (u32, u32) {
        (
            (columns as f32 * self.char_width).ceil() as u32,
            (rows as f32 * self.line_height).ceil() as u32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_origin() {
        let font = FontMetrics::default();
        let (x, y) = font.cell_origin(10, 2);
        assert!((x - 42.0).abs() < 1e-4);
        assert!((y - 14.0).abs() < 1e-4);
    }

    #[test]
    fn test_grid_extent_rounds_up() {
        let font = FontMetrics::default();
        assert_eq!(font.grid_extent(3, 2), (13, 14));
    }
}
