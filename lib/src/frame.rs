//! Raster frames flowing into the converter and glyph grids flowing out of it.

use image::{Rgba, RgbaImage};

use crate::color::Rgb;
use crate::error::{Result, StreamError};

/// Perceptual luminance weights (ITU-R BT.601)
pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Luminance of an RGB triple in [0, 255]
pub fn luminance(r: f32, g: f32, b: f32) -> f32 {
    LUMA_WEIGHTS[0] * r + LUMA_WEIGHTS[1] * g + LUMA_WEIGHTS[2] * b
}

/// Immutable RGBA raster handed from a source to the filters and converter.
///
/// Stages never mutate a frame they receive; each returns a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: RgbaImage,
}

impl Frame {
    /// Wraps an already decoded bitmap.
    ///
    /// # Errors
    /// `StreamError::Load` for a zero-sized bitmap.
    pub fn from_image(image: RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(StreamError::Load(format!(
                "bitmap has empty dimensions {width}x{height}"
            )));
        }
        Ok(Self { image })
    }

    /// Builds a frame from row-major RGBA bytes.
    ///
    /// # Errors
    /// `StreamError::Load` if the buffer length is not `width * height * 4`.
    pub fn from_raw(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self> {
        let len = rgba.len();
        let image = RgbaImage::from_raw(width, height, rgba).ok_or_else(|| {
            StreamError::Load(format!(
                "pixel buffer of {len} bytes does not match {width}x{height} RGBA"
            ))
        })?;
        Self::from_image(image)
    }

    /// Solid-color frame, mostly useful for tests and demos
    pub fn solid(width: u32, height: u32, pixel: [u8; 4]) -> Result<Self> {
        Self::from_image(RgbaImage::from_pixel(width, height, Rgba(pixel)))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Returns a new frame with `f` applied to every pixel.
    pub(crate) fn map_pixels(&self, mut f: impl FnMut([u8; 4]) -> [u8; 4]) -> Frame {
        let mut out = self.image.clone();
        for pixel in out.pixels_mut() {
            pixel.0 = f(pixel.0);
        }
        Frame { image: out }
    }
}

/// Row-major cell offset, computed in `usize` so large grids cannot wrap
fn grid_index(width: u32, col: u32, row: u32) -> usize {
    row as usize * width as usize + col as usize
}

/// One output grid position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub glyph: char,
    /// Position of `glyph` in the charset
    pub index: usize,
    /// Average cell luminance in [0, 255]
    pub luminance: f32,
    /// Present only when the conversion was `colored`
    pub color: Option<Rgb>,
}

/// Glyph grid produced by the converter, consumed by exactly one renderer
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFrame {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
}

impl RenderedFrame {
    pub(crate) fn new(width: u32, height: u32, cells: Vec<Cell>) -> Self {
        debug_assert_eq!(cells.len(), width as usize * height as usize);
        Self {
            width,
            height,
            cells,
        }
    }

    /// Grid width in cells
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cell(&self, col: u32, row: u32) -> &Cell {
        &self.cells[grid_index(self.width, col, row)]
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Row-major iterator over the grid rows
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.width as usize)
    }

    pub fn is_colored(&self) -> bool {
        self.cells.first().is_some_and(|c| c.color.is_some())
    }

    /// Glyph rows joined by newlines
    pub fn to_text(&self) -> String {
        self.rows()
            .map(|row| row.iter().map(|c| c.glyph).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
