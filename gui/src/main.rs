mod app;

use app::StreamApp;
use ascii_stream::{FontMetrics, RasterSurface, Rgb, Surface};
use eframe::egui;

fn main() -> Result<(), eframe::Error> {
    // Configure logging (RUST_LOG=ascii_stream=debug shows pipeline runs)
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("ASCII Stream")
            .with_icon(load_icon()),
        ..Default::default()
    };

    eframe::run_native(
        "ASCII Stream",
        options,
        Box::new(|cc| Ok(Box::new(StreamApp::new(cc)))),
    )
}

/// Application icon: a single '@' painted by the library's own rasterizer
fn load_icon() -> egui::IconData {
    let icon_size = 32;
    let mut surface = RasterSurface::new(icon_size, icon_size);
    surface.clear(Some(Rgb::new(0, 100, 0)));

    let font = FontMetrics {
        size: icon_size as f32,
        line_height: icon_size as f32,
        char_width: icon_size as f32,
        ..FontMetrics::default()
    };
    surface.fill_glyph('@', 0.0, 0.0, &font, Rgb::WHITE);

    egui::IconData {
        rgba: surface.into_image().into_raw(),
        width: icon_size,
        height: icon_size,
    }
}
