/// Basic example: convert a synthetic test image to ASCII art
///
/// Prints the glyph grid to the terminal, then renders the same image to an
/// HTML file and a PNG through the markup and canvas renderers.
use ascii_stream::{
    CanvasOptions, CanvasRenderer, ConversionConfig, FontMetrics, GlyphConverter, ImageSource,
    MarkupRenderer, RasterSurface, Result, Rgb, Settings, StreamError, compose,
};
use image::{Rgba, RgbaImage};
use std::cell::RefCell;
use std::rc::Rc;

fn test_image(width: u32, height: u32) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(width, height, Rgba([100, 100, 100, 255]));

    // White disc with a dark rim in the center
    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;
    let radius = width.min(height) as f32 / 3.0;

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let dx = x as f32 - center_x;
        let dy = y as f32 - center_y;
        let dist = (dx * dx + dy * dy).sqrt();

        if dist < radius {
            *pixel = Rgba([255, 255, 255, 255]);
        } else if (dist - radius).abs() < 5.0 {
            *pixel = Rgba([0, 0, 0, 255]);
        }
    }

    // Red diagonal
    for i in 0..width.min(height) {
        img.put_pixel(i, i, Rgba([255, 0, 0, 255]));
    }
    img
}

async fn run() -> Result<()> {
    let img = test_image(160, 160);
    let settings = Settings {
        contrast: 20.0,
        ..Default::default()
    };
    let columns = 64;
    let rows = ConversionConfig::rows_for_aspect(
        columns,
        img.width(),
        img.height(),
        settings.font.char_width / settings.font.line_height,
    );
    let conversion = ConversionConfig::new(columns, rows);

    println!("ASCII Stream - Basic Example");
    println!("============================\n");
    println!("Created test image: {}x{}", img.width(), img.height());
    println!("Grid: {columns}x{rows}, filters: {:?}\n", settings.filter_chain()?.filters());

    // Terminal text
    compose(ImageSource::from_bitmap(img.clone()))
        .pipe(settings.filter_chain()?)
        .pipe(GlyphConverter::new(conversion.clone()))
        .subscribe(|grid| println!("{}\n", grid.to_text()))
        .run()
        .await?;

    // Markup
    let mut html = String::new();
    compose(ImageSource::from_bitmap(img.clone()))
        .pipe(settings.filter_chain()?)
        .pipe(GlyphConverter::new(conversion.clone().colored(true)))
        .pipe(MarkupRenderer::default())
        .subscribe(|node| html = node.to_html())
        .run()
        .await?;
    std::fs::write("basic_output.html", html)?;
    println!("✓ Saved markup to: basic_output.html");

    // Canvas
    let font = FontMetrics {
        size: 8.0,
        line_height: 8.0,
        char_width: 5.0,
        ..FontMetrics::default()
    };
    let (width, height) = font.grid_extent(columns, rows);
    let surface = Rc::new(RefCell::new(RasterSurface::new(width, height)));
    let canvas = CanvasRenderer::new(
        surface.clone(),
        CanvasOptions {
            font,
            background: Some(Rgb::BLACK),
            foreground: Rgb::new(0, 255, 0),
            ..CanvasOptions::default()
        },
    );
    let mut painted = None;
    compose(ImageSource::from_bitmap(img))
        .pipe(settings.filter_chain()?)
        .pipe(GlyphConverter::new(conversion))
        .pipe(canvas)
        .subscribe(|artifact| painted = Some(artifact))
        .run()
        .await?;

    if let Some(artifact) = painted {
        println!(
            "✓ Painted {} glyphs onto a {}x{} surface",
            artifact.glyphs, artifact.width, artifact.height
        );
    }
    surface
        .borrow()
        .image()
        .save("basic_output.png")
        .map_err(|e| StreamError::Io(std::io::Error::other(e)))?;
    println!("✓ Saved canvas to: basic_output.png");
    Ok(())
}

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .map_err(StreamError::Io)?;
    runtime.block_on(run())
}
