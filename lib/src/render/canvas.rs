use super::{FontMetrics, Renderer, Surface};
use crate::color::Rgb;
use crate::error::Result;
use crate::frame::RenderedFrame;
use crate::pipeline::Stage;

/// How much of the surface is repainted per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaintMode {
    /// Clear the whole surface first
    #[default]
    Clear,
    /// Repaint only the grid's region; repeated calls overwrite the same
    /// pixels (video)
    Incremental,
    /// Paint glyphs over whatever is there
    Overlay,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanvasOptions {
    pub font: FontMetrics,
    /// `None` clears to transparent
    pub background: Option<Rgb>,
    /// Glyph color for uncolored frames
    pub foreground: Rgb,
    pub mode: PaintMode,
}

impl Default for CanvasOptions {
    fn default() -> Self {
        Self {
            font: FontMetrics::default(),
            background: Some(Rgb::WHITE),
            foreground: Rgb::BLACK,
            mode: PaintMode::Clear,
        }
    }
}

/// What a canvas render call did; the pixels stay on the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasArtifact {
    /// Pixel extent of the painted grid
    pub width: u32,
    pub height: u32,
    /// Non-blank glyphs painted
    pub glyphs: usize,
    /// Calls so far on this renderer, starting at 0
    pub sequence: u64,
}

/// Paints glyph grids onto a [`Surface`]
pub struct CanvasRenderer<S: Surface> {
    surface: S,
    options: CanvasOptions,
    sequence: u64,
}

impl<S: Surface> CanvasRenderer<S> {
    pub fn new(surface: S, options: CanvasOptions) -> Self {
        Self {
            surface,
            options,
            sequence: 0,
        }
    }

    pub fn options(&self) -> &CanvasOptions {
        &self.options
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }
}

impl<S: Surface> Renderer for CanvasRenderer<S> {
    type Artifact = CanvasArtifact;

    fn render(&mut self, frame: RenderedFrame) -> Result<CanvasArtifact> {
        let font = &self.options.font;
        let (width, height) = font.grid_extent(frame.width(), frame.height());

        match self.options.mode {
            PaintMode::Clear => self.surface.clear(self.options.background),
            PaintMode::Incremental => self.surface.fill_rect(
                0.0,
                0.0,
                width as f32,
                height as f32,
                self.options.background,
            ),
            PaintMode::Overlay => {}
        }

        let mut glyphs = 0;
        for (row, cells) in (0u32..).zip(frame.rows()) {
            for (col, cell) in (0u32..).zip(cells) {
                if cell.glyph.is_whitespace() {
                    continue;
                }
                let (x, y) = font.cell_origin(col, row);
                let color = cell.color.unwrap_or(self.options.foreground);
                self.surface.fill_glyph(cell.glyph, x, y, font, color);
                glyphs += 1;
            }
        }

        let artifact = CanvasArtifact {
            width,
            height,
            glyphs,
            sequence: self.sequence,
        };
        self.sequence += 1;
        Ok(artifact)
    }
}

impl<S: Surface> Stage for CanvasRenderer<S> {
    type Input = RenderedFrame;
    type Output = CanvasArtifact;

    fn process(&mut self, input: RenderedFrame) -> Result<CanvasArtifact> {
        self.render(input)
    }
}
