use ascii_stream::preset::{deserialize, deserialize_gradient, serialize, serialize_gradient};
use ascii_stream::settings::{BRIGHTNESS_RANGE, CONTRAST_RANGE, DESATURATION_RANGE, POSITION_RANGE};
use ascii_stream::{
    CanvasOptions, CanvasRenderer, ColorSource, ConversionConfig, GlyphConverter, ImageSource,
    MarkupOptions, MarkupRenderer, PaintMode, PresetStore, RasterSurface, Rgb, Surface, compose,
};
use eframe::egui;
use image::RgbaImage;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::time::Instant;

fn json_dialog() -> rfd::FileDialog {
    rfd::FileDialog::new().add_filter("JSON", &["json"])
}

/// Which renderer produces the output panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenderMode {
    Canvas,
    Markup,
}

/// Host application: forwards control values into the pipeline settings and
/// displays whatever the renderer produced
pub struct StreamApp {
    /// Input image (original)
    input_image: Option<RgbaImage>,
    /// Canvas output
    output_image: Option<RgbaImage>,
    /// Markup output, as HTML and as plain text for display
    output_html: Option<String>,
    output_text: Option<String>,

    /// Live style settings; presets read and write these
    store: PresetStore,
    columns: u32,
    colored: bool,
    use_gradient: bool,
    foreground: Rgb,
    background: Rgb,
    render_mode: RenderMode,

    input_texture: Option<egui::TextureHandle>,
    output_texture: Option<egui::TextureHandle>,

    auto_process: bool,
    needs_reprocess: bool,
    last_process_time_ms: f64,
    error_message: Option<String>,
}

impl Default for StreamApp {
    fn default() -> Self {
        Self {
            input_image: None,
            output_image: None,
            output_html: None,
            output_text: None,
            store: PresetStore::default(),
            columns: 120,
            colored: false,
            use_gradient: false,
            foreground: Rgb::BLACK,
            background: Rgb::WHITE,
            render_mode: RenderMode::Canvas,
            input_texture: None,
            output_texture: None,
            auto_process: true,
            needs_reprocess: false,
            last_process_time_ms: 0.0,
            error_message: None,
        }
    }
}

impl StreamApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        Self::default()
    }

    /// Decodes an image file; decoding stays on the host side of the pipeline
    pub fn load_image(&mut self, path: &Path) {
        match image::open(path) {
            Ok(img) => {
                self.input_image = Some(img.to_rgba8());
                self.input_texture = None;
                self.output_texture = None;
                self.needs_reprocess = true;
                self.error_message = None;
            }
            Err(e) => {
                self.report(format!("Failed to load image: {e}"));
            }
        }
    }

    /// Logs a failure and shows it in the error label
    fn report(&mut self, message: String) {
        log::warn!("{message}");
        self.error_message = Some(message);
    }

    /// Saves the canvas as PNG or the markup as HTML, whichever is current
    pub fn save_output(&self, path: &Path) -> Result<(), String> {
        match (self.render_mode, &self.output_image, &self.output_html) {
            (RenderMode::Canvas, Some(img), _) => {
                img.save(path).map_err(|e| format!("Failed to save: {e}"))
            }
            (RenderMode::Markup, _, Some(html)) => {
                std::fs::write(path, html).map_err(|e| format!("Failed to save: {e}"))
            }
            _ => Err("No output to save".to_string()),
        }
    }

    fn save_preset(&self, path: &Path) -> Result<(), String> {
        let text = serialize(&self.store.snapshot()).map_err(|e| e.to_string())?;
        std::fs::write(path, text).map_err(|e| format!("Failed to save preset: {e}"))
    }

    fn load_preset(&mut self, path: &Path) -> Result<(), String> {
        log::debug!("loading preset from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|e| format!("Failed to read preset: {e}"))?;
        let preset = deserialize(&text).map_err(|e| format!("Invalid preset: {e}"))?;
        self.store.apply(&preset);
        self.needs_reprocess = true;
        Ok(())
    }

    fn save_gradient(&self, path: &Path) -> Result<(), String> {
        let text = serialize_gradient(&self.store.settings().gradient).map_err(|e| e.to_string())?;
        std::fs::write(path, text).map_err(|e| format!("Failed to save gradient: {e}"))
    }

    fn load_gradient(&mut self, path: &Path) -> Result<(), String> {
        log::debug!("loading gradient from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|e| format!("Failed to read gradient: {e}"))?;
        let gradient = deserialize_gradient(&text).map_err(|e| format!("Invalid gradient: {e}"))?;
        self.store.settings_mut().gradient.merge(&gradient);
        self.needs_reprocess = true;
        Ok(())
    }

    /// Process the input image with the current settings
    fn process(&mut self) {
        let Some(input) = self.input_image.clone() else {
            return;
        };
        let start = Instant::now();

        match self.run_pipeline(input) {
            Ok(()) => {
                self.last_process_time_ms = start.elapsed().as_secs_f64() * 1000.0;
                self.output_texture = None;
                self.error_message = None;
            }
            Err(e) => {
                self.report(format!("Processing failed: {e}"));
            }
        }
        self.needs_reprocess = false;
    }

    /// Builds a one-shot pipeline over the input and drives it to completion
    /// on a current-thread runtime
    fn run_pipeline(&mut self, input: RgbaImage) -> ascii_stream::Result<()> {
        let settings = self.store.settings().clone();
        let font = settings.font.clone();

        let rows = ConversionConfig::rows_for_aspect(
            self.columns,
            input.width(),
            input.height(),
            font.char_width / font.line_height,
        );
        let mut conversion = ConversionConfig::new(self.columns, rows).colored(self.colored);
        if self.use_gradient
            && let Some(gradient) = settings.gradient()?
        {
            conversion = conversion.with_color_source(ColorSource::Gradient(gradient));
        }
        let filters = settings.filter_chain()?;

        let runtime = tokio::runtime::Builder::new_current_thread().build()?;
        let pipeline = compose(ImageSource::from_bitmap(input))
            .pipe(filters)
            .pipe(GlyphConverter::new(conversion));

        match self.render_mode {
            RenderMode::Canvas => {
                let (width, height) = font.grid_extent(self.columns, rows);
                let surface = Rc::new(RefCell::new(RasterSurface::new(width.max(1), height.max(1))));
                let renderer = CanvasRenderer::new(
                    surface.clone(),
                    CanvasOptions {
                        font,
                        background: Some(self.background),
                        foreground: self.foreground,
                        mode: PaintMode::Clear,
                    },
                );
                runtime.block_on(pipeline.pipe(renderer).subscribe(|_| {}).run())?;
                self.output_image = Some(surface.snapshot());
            }
            RenderMode::Markup => {
                let renderer = MarkupRenderer::new(MarkupOptions {
                    font,
                    foreground: Some(self.foreground),
                    background: Some(self.background),
                });
                let mut markup = None;
                runtime.block_on(pipeline.pipe(renderer).subscribe(|node| markup = Some(node)).run())?;
                self.output_html = markup.as_ref().map(|node| node.to_html());
                self.output_text = markup.map(|node| node.to_plain_text());
            }
        }
        Ok(())
    }

    /// Color picker bound to an [`Rgb`]
    fn color_edit(ui: &mut egui::Ui, color: &mut Rgb, label: &str) -> bool {
        let mut rgb = color.0.map(|c| c as f32 / 255.0);
        let changed = ui
            .horizontal(|ui| {
                let changed = ui.color_edit_button_rgb(&mut rgb).changed();
                ui.label(label);
                changed
            })
            .inner;
        if changed {
            *color = Rgb(rgb.map(|c| (c * 255.0).round() as u8));
        }
        changed
    }

    /// Render the control panel UI
    fn render_controls(&mut self, ui: &mut egui::Ui) -> bool {
        let mut changed = false;

        ui.heading("Controls");
        ui.separator();

        ui.collapsing("Filters", |ui| {
            let settings = self.store.settings_mut();
            changed |= ui
                .checkbox(&mut settings.inverse, "Inverse")
                .on_hover_text("Invert RGB before conversion")
                .changed();

            changed |= ui
                .add(egui::Slider::new(&mut settings.brightness, BRIGHTNESS_RANGE).text("Brightness"))
                .changed();

            changed |= ui
                .add(egui::Slider::new(&mut settings.contrast, CONTRAST_RANGE).text("Contrast %"))
                .changed();

            changed |= ui.checkbox(&mut settings.desaturate, "Desaturate").changed();
            ui.add_enabled_ui(settings.desaturate, |ui| {
                changed |= ui
                    .add(egui::Slider::new(&mut settings.desaturation, DESATURATION_RANGE).text("Amount %"))
                    .changed();
            });
        });

        ui.add_space(8.0);

        ui.collapsing("Grid & Font", |ui| {
            changed |= ui
                .add(egui::Slider::new(&mut self.columns, 8..=400).text("Columns"))
                .on_hover_text("Rows follow the image aspect and the cell size")
                .changed();

            let font = &mut self.store.settings_mut().font;
            changed |= ui
                .add(egui::Slider::new(&mut font.size, 4.0..=32.0).text("Font Size"))
                .changed();
            changed |= ui
                .add(egui::Slider::new(&mut font.line_height, 4.0..=32.0).text("Line Height"))
                .changed();
            changed |= ui
                .add(egui::Slider::new(&mut font.char_width, 2.0..=20.0).text("Char Width"))
                .changed();
            ui.horizontal(|ui| {
                ui.label("Family");
                changed |= ui.text_edit_singleline(&mut font.family).changed();
            });
        });

        ui.add_space(8.0);

        ui.collapsing("Colors", |ui| {
            changed |= ui
                .checkbox(&mut self.colored, "Colored")
                .on_hover_text("Give each glyph a color instead of the foreground")
                .changed();

            ui.add_enabled_ui(self.colored, |ui| {
                changed |= ui
                    .checkbox(&mut self.use_gradient, "Use Gradient")
                    .on_hover_text("Color by luminance instead of sampling the source")
                    .changed();
            });

            changed |= Self::color_edit(ui, &mut self.foreground, "Foreground");
            changed |= Self::color_edit(ui, &mut self.background, "Background");
        });

        ui.add_space(8.0);

        ui.collapsing("Gradient", |ui| {
            let gradient = &mut self.store.settings_mut().gradient;
            let stops = [
                (&mut gradient.color1, &mut gradient.color_position1, "Color 1"),
                (&mut gradient.color2, &mut gradient.color_position2, "Color 2"),
                (&mut gradient.color3, &mut gradient.color_position3, "Color 3"),
            ];
            for (color, position, label) in stops {
                let color = color.get_or_insert(Rgb::BLACK);
                changed |= Self::color_edit(ui, color, label);
                let position = position.get_or_insert(0.0);
                changed |= ui
                    .add(egui::Slider::new(position, POSITION_RANGE).text("Position %"))
                    .changed();
            }
        });

        ui.add_space(8.0);

        ui.collapsing("Output", |ui| {
            changed |= ui
                .radio_value(&mut self.render_mode, RenderMode::Canvas, "Canvas")
                .changed();
            changed |= ui
                .radio_value(&mut self.render_mode, RenderMode::Markup, "Markup")
                .changed();
        });

        ui.add_space(16.0);
        ui.separator();

        ui.checkbox(&mut self.auto_process, "Auto-process")
            .on_hover_text("Automatically reprocess when parameters change");

        ui.add_enabled_ui(!self.auto_process || !self.needs_reprocess, |ui| {
            if ui.button("Process").clicked() {
                self.process();
            }
        });

        if self.last_process_time_ms > 0.0 {
            ui.label(format!("Last process: {:.1} ms", self.last_process_time_ms));
        }

        changed
    }

    /// Convert RgbaImage to egui ColorImage
    fn rgba_to_color_image(img: &RgbaImage) -> egui::ColorImage {
        let (width, height) = img.dimensions();
        let pixels = img
            .pixels()
            .map(|p| egui::Color32::from_rgba_unmultiplied(p[0], p[1], p[2], p[3]))
            .collect();

        egui::ColorImage {
            size: [width as usize, height as usize],
            source_size: egui::Vec2::new(width as f32, height as f32),
            pixels,
        }
    }

    fn display_image(
        ui: &mut egui::Ui,
        image: Option<&RgbaImage>,
        texture: &mut Option<egui::TextureHandle>,
        label: &str,
    ) {
        ui.vertical(|ui| {
            ui.heading(label);

            let Some(img) = image else {
                ui.label("No image");
                return;
            };

            let tex = texture.get_or_insert_with(|| {
                ui.ctx()
                    .load_texture(label, Self::rgba_to_color_image(img), egui::TextureOptions::default())
            });

            let size = tex.size_vec2();
            let max_size = ui.available_size();
            let scale = ((max_size.x / size.x).min(max_size.y / size.y)).min(4.0);
            ui.image((tex.id(), size * scale));
            ui.label(format!("{}x{} (scale: {:.1}x)", img.width(), img.height(), scale));
        });
    }

    fn display_markup(ui: &mut egui::Ui, text: Option<&str>) {
        ui.vertical(|ui| {
            ui.heading("Markup Output");
            match text {
                Some(text) => {
                    egui::ScrollArea::both().show(ui, |ui| {
                        ui.label(egui::RichText::new(text).monospace().size(7.0));
                    });
                }
                None => {
                    ui.label("No output");
                }
            }
        });
    }

    fn file_menu(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        if ui.button("Open Image...").clicked() {
            if let Some(path) = rfd::FileDialog::new()
                .add_filter("Images", &["png", "jpg", "jpeg", "bmp", "gif", "webp"])
                .pick_file()
            {
                self.load_image(&path);
            }
            ui.close();
        }

        if ui.button("Save Output...").clicked() {
            let (name, extensions) = match self.render_mode {
                RenderMode::Canvas => ("PNG", ["png"]),
                RenderMode::Markup => ("HTML", ["html"]),
            };
            if let Some(path) = rfd::FileDialog::new().add_filter(name, &extensions).save_file()
                && let Err(e) = self.save_output(&path)
            {
                self.report(e);
            }
            ui.close();
        }

        ui.separator();

        if ui.button("Save Preset...").clicked() {
            if let Some(path) = json_dialog().save_file()
                && let Err(e) = self.save_preset(&path)
            {
                self.report(e);
            }
            ui.close();
        }
        if ui.button("Load Preset...").clicked() {
            if let Some(path) = json_dialog().pick_file()
                && let Err(e) = self.load_preset(&path)
            {
                self.report(e);
            }
            ui.close();
        }
        if ui.button("Save Gradient...").clicked() {
            if let Some(path) = json_dialog().save_file()
                && let Err(e) = self.save_gradient(&path)
            {
                self.report(e);
            }
            ui.close();
        }
        if ui.button("Load Gradient...").clicked() {
            if let Some(path) = json_dialog().pick_file()
                && let Err(e) = self.load_gradient(&path)
            {
                self.report(e);
            }
            ui.close();
        }

        ui.separator();

        if ui.button("Quit").clicked() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }
}

impl eframe::App for StreamApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("File", |ui| self.file_menu(ui, ctx));
            });
        });

        egui::SidePanel::left("control_panel")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    if self.render_controls(ui) {
                        self.needs_reprocess = true;
                    }
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(ref msg) = self.error_message {
                ui.colored_label(egui::Color32::RED, msg);
                if ui.button("Clear Error").clicked() {
                    self.error_message = None;
                }
                ui.separator();
            }

            if self.auto_process && self.needs_reprocess && self.input_image.is_some() {
                self.process();
            }

            ui.horizontal(|ui| {
                let half_width = ui.available_width() / 2.0 - 8.0;

                ui.allocate_ui_with_layout(
                    egui::vec2(half_width, ui.available_height()),
                    egui::Layout::top_down(egui::Align::Center),
                    |ui| {
                        Self::display_image(
                            ui,
                            self.input_image.as_ref(),
                            &mut self.input_texture,
                            "Original",
                        );
                    },
                );

                ui.separator();

                ui.allocate_ui_with_layout(
                    egui::vec2(half_width, ui.available_height()),
                    egui::Layout::top_down(egui::Align::Center),
                    |ui| match self.render_mode {
                        RenderMode::Canvas => Self::display_image(
                            ui,
                            self.output_image.as_ref(),
                            &mut self.output_texture,
                            "Canvas Output",
                        ),
                        RenderMode::Markup => Self::display_markup(ui, self.output_text.as_deref()),
                    },
                );
            });
        });
    }
}
