use crate::color::Rgb;
use crate::config::{ColorSource, ConversionConfig};
use crate::error::Result;
use crate::frame::{Cell, Frame, RenderedFrame, luminance};
use crate::pipeline::Stage;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Source pixel range `[start, end)` covered by output cell `index`
///
/// Floor for both bounds. When the source is narrower than the grid the
/// span is widened to one pixel so no cell is empty.
pub fn cell_span(index: u32, cells: u32, source: u32) -> (u32, u32) {
    let start = (index as u64 * source as u64 / cells as u64) as u32;
    let end = ((index as u64 + 1) * source as u64 / cells as u64) as u32;
    let end = end.max(start + 1).min(source);
    (start, end)
}

/// Average RGB over a rectangular region of the frame
fn average_rgb(frame: &Frame, (x0, x1): (u32, u32), (y0, y1): (u32, u32)) -> [f32; 3] {
    let image = frame.as_image();
    let mut sum = [0u64; 3];

    for y in y0..y1 {
        for x in x0..x1 {
            let pixel = image.get_pixel(x, y);
            sum[0] += pixel[0] as u64;
            sum[1] += pixel[1] as u64;
            sum[2] += pixel[2] as u64;
        }
    }

    let count = ((x1 - x0) as u64 * (y1 - y0) as u64).max(1) as f32;
    [
        sum[0] as f32 / count,
        sum[1] as f32 / count,
        sum[2] as f32 / count,
    ]
}

fn cell_color(avg: [f32; 3], lum: f32, source: &ColorSource) -> Rgb {
    let sampled = Rgb(avg.map(|c| c.round().clamp(0.0, 255.0) as u8));
    match source {
        ColorSource::Sampled => sampled,
        ColorSource::Palette(palette) => palette
            .iter()
            .copied()
            .min_by_key(|entry| entry.distance_sq(sampled))
            .unwrap_or(sampled),
        ColorSource::Gradient(gradient) => gradient.evaluate(lum / 255.0),
    }
}

fn convert_row(frame: &Frame, config: &ConversionConfig, row: u32) -> Vec<Cell> {
    let rows = cell_span(row, config.height, frame.height());

    (0..config.width)
        .map(|col| {
            let cols = cell_span(col, config.width, frame.width());
            let avg = average_rgb(frame, cols, rows);
            let lum = luminance(avg[0], avg[1], avg[2]).clamp(0.0, 255.0);
            let index = config.charset.index_for(lum);

            Cell {
                glyph: config.charset.glyph(index),
                index,
                luminance: lum,
                color: config
                    .colored
                    .then(|| cell_color(avg, lum, &config.color_source)),
            }
        })
        .collect()
}

/// Converts a frame into a glyph grid
///
/// 1. Partition the frame into `width × height` cells
/// 2. Average luminance per cell (0.299R + 0.587G + 0.114B)
/// 3. Map luminance onto the charset
/// 4. Optionally pick a color per cell (sampled, palette or gradient)
///
/// # Errors
/// `StreamError::InvalidConfig` for zero dimensions, an empty charset or an
/// empty palette.
pub fn convert(frame: &Frame, config: &ConversionConfig) -> Result<RenderedFrame> {
    config.validate()?;

    #[cfg(feature = "parallel")]
    let rows: Vec<Vec<Cell>> = (0..config.height)
        .into_par_iter()
        .map(|row| convert_row(frame, config, row))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let rows: Vec<Vec<Cell>> = (0..config.height)
        .map(|row| convert_row(frame, config, row))
        .collect();

    let cells = rows.into_iter().flatten().collect();
    Ok(RenderedFrame::new(config.width, config.height, cells))
}

/// Pipeline stage wrapping [`convert`]
#[derive(Debug, Clone)]
pub struct GlyphConverter {
    config: ConversionConfig,
}

impl GlyphConverter {
    pub fn new(config: ConversionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    pub fn convert(&self, frame: &Frame) -> Result<RenderedFrame> {
        convert(frame, &self.config)
    }
}

impl Stage for GlyphConverter {
    type Input = Frame;
    type Output = RenderedFrame;

    fn process(&mut self, input: Frame) -> Result<RenderedFrame> {
        self.convert(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::Charset;
    use crate::error::StreamError;
    use crate::filters::Filter;
    use crate::gradient::{Gradient, GradientStop};
    use proptest::prelude::*;

    /// Left half black, right half white
    fn split_frame(width: u32, height: u32) -> Frame {
        let mut raw = Vec::new();
        for _y in 0..height {
            for x in 0..width {
                let v = if x < width / 2 { 0 } else { 255 };
                raw.extend_from_slice(&[v, v, v, 255]);
            }
        }
        Frame::from_raw(width, height, raw).unwrap()
    }

    #[test]
    fn test_cell_span_covers_every_pixel_once() {
        let (cells, source) = (7, 23);
        let mut next = 0;
        for i in 0..cells {
            let (start, end) = cell_span(i, cells, source);
            assert_eq!(start, next);
            assert!(end > start);
            next = end;
        }
        assert_eq!(next, source);
    }

    #[test]
    fn test_cell_span_upsampling_never_empty() {
        for i in 0..10 {
            let (start, end) = cell_span(i, 10, 3);
            assert_eq!(end - start, 1);
            assert!(end <= 3);
        }
    }

    #[test]
    fn test_white_frame_single_cell() {
        let frame = Frame::solid(2, 2, [255, 255, 255, 255]).unwrap();
        let config = ConversionConfig::new(1, 1).with_charset(Charset::from_str_ramp(" #").unwrap());
        let out = convert(&frame, &config).unwrap();
        assert_eq!(out.cells().len(), 1);
        assert_eq!(out.cell(0, 0).glyph, '#');
        assert_eq!(out.cell(0, 0).color, None);
    }

    #[test]
    fn test_split_frame_glyphs() {
        let frame = split_frame(16, 8);
        let out = convert(&frame, &ConversionConfig::new(4, 2)).unwrap();
        assert_eq!(out.to_text(), "  @@\n  @@");
    }

    #[test]
    fn test_sampled_colors() {
        let mut raw = Vec::new();
        for _ in 0..2 {
            raw.extend_from_slice(&[255, 0, 0, 255, 0, 0, 255, 255]);
        }
        let frame = Frame::from_raw(2, 2, raw).unwrap();
        let out = convert(&frame, &ConversionConfig::new(2, 1).colored(true)).unwrap();
        assert_eq!(out.cell(0, 0).color, Some(Rgb::new(255, 0, 0)));
        assert_eq!(out.cell(1, 0).color, Some(Rgb::new(0, 0, 255)));
        assert!(out.is_colored());
    }

    #[test]
    fn test_averaged_color_over_cell() {
        let frame = split_frame(4, 2);
        let out = convert(&frame, &ConversionConfig::new(1, 1).colored(true)).unwrap();
        assert_eq!(out.cell(0, 0).color, Some(Rgb::new(128, 128, 128)));
    }

    #[test]
    fn test_palette_snaps_to_nearest() {
        let frame = Frame::solid(2, 2, [200, 30, 30, 255]).unwrap();
        let config = ConversionConfig::new(1, 1)
            .colored(true)
            .with_color_source(ColorSource::Palette(vec![Rgb::BLACK, Rgb::new(255, 0, 0), Rgb::WHITE]));
        let out = convert(&frame, &config).unwrap();
        assert_eq!(out.cell(0, 0).color, Some(Rgb::new(255, 0, 0)));
    }

    #[test]
    fn test_gradient_uses_luminance() {
        let gradient = Gradient::new([
            GradientStop::new(Rgb::new(0, 0, 255), 0.0),
            GradientStop::new(Rgb::new(0, 255, 0), 0.5),
            GradientStop::new(Rgb::new(255, 0, 0), 1.0),
        ])
        .unwrap();
        let config = ConversionConfig::new(2, 1)
            .colored(true)
            .with_color_source(ColorSource::Gradient(gradient));
        let out = convert(&split_frame(4, 2), &config).unwrap();
        assert_eq!(out.cell(0, 0).color, Some(Rgb::new(0, 0, 255)));
        assert_eq!(out.cell(1, 0).color, Some(Rgb::new(255, 0, 0)));
    }

    #[test]
    fn test_gradient_ignored_when_not_colored() {
        let gradient = Gradient::new([GradientStop::new(Rgb::WHITE, 0.0); 3]).unwrap();
        let config = ConversionConfig::new(2, 2).with_color_source(ColorSource::Gradient(gradient));
        let out = convert(&split_frame(4, 4), &config).unwrap();
        assert!(out.cells().iter().all(|c| c.color.is_none()));
    }

    #[test]
    fn test_invalid_config() {
        let frame = Frame::solid(4, 4, [0, 0, 0, 255]).unwrap();
        let err = convert(&frame, &ConversionConfig::new(0, 3)).unwrap_err();
        assert!(matches!(err, StreamError::InvalidConfig(_)));
    }

    #[test]
    #[cfg(feature = "parallel")]
    fn test_parallel_rows_match_sequential() {
        let (width, height) = (37, 23);
        let mut raw = Vec::new();
        for y in 0..height {
            for x in 0..width {
                raw.extend_from_slice(&[(x * 7) as u8, (y * 11) as u8, ((x + y) * 5) as u8, 255]);
            }
        }
        let frame = Frame::from_raw(width, height, raw).unwrap();
        let config = ConversionConfig::new(11, 9).colored(true);

        let sequential: Vec<Cell> = (0..config.height)
            .flat_map(|row| convert_row(&frame, &config, row))
            .collect();
        let out = convert(&frame, &config).unwrap();
        assert_eq!(out.cells(), sequential.as_slice());
    }

    #[test]
    fn test_grid_larger_than_source() {
        let frame = split_frame(2, 1);
        let out = convert(&frame, &ConversionConfig::new(4, 3)).unwrap();
        assert_eq!(out.to_text(), "  @@\n  @@\n  @@");
    }

    proptest! {
        #[test]
        fn prop_solid_frame_uniform_glyph(
            w in 1u32..12,
            h in 1u32..12,
            rgb in any::<[u8; 3]>(),
        ) {
            let frame = Frame::solid(13, 11, [rgb[0], rgb[1], rgb[2], 255]).unwrap();
            let out = convert(&frame, &ConversionConfig::new(w, h)).unwrap();
            let first = out.cells()[0].index;
            prop_assert!(out.cells().iter().all(|c| c.index == first));
        }

        #[test]
        fn prop_brightness_is_monotonic(
            gray in any::<u8>(),
            amount in 0.0f32..255.0,
        ) {
            let frame = Frame::solid(6, 6, [gray, gray, gray, 255]).unwrap();
            let brighter = Filter::brightness(amount).apply(&frame).unwrap();
            let config = ConversionConfig::new(3, 3);
            let before = convert(&frame, &config).unwrap().cells()[0].index;
            let after = convert(&brighter, &config).unwrap().cells()[0].index;
            prop_assert!(after >= before);
        }
    }
}
