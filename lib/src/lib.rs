//! ASCII Stream - composable frame-to-glyph streaming pipeline
//!
//! Frames come from a [`FrameSource`] (still image, canvas snapshot or live
//! video), run through per-pixel [`Filter`]s, are converted to a glyph grid
//! by [`GlyphConverter`] and finally drawn by a renderer
//! ([`MarkupRenderer`] or [`CanvasRenderer`]).
//!
//! # Example
//! ```no_run
//! use ascii_stream::{compose, ConversionConfig, GlyphConverter, ImageSource, Settings};
//!
//! # async fn demo() -> ascii_stream::Result<()> {
//! let input = image::open("photo.jpg")
//!     .map_err(|e| ascii_stream::StreamError::Load(e.to_string()))?
//!     .to_rgba8();
//! let settings = Settings::default();
//!
//! compose(ImageSource::from_bitmap(input))
//!     .pipe(settings.filter_chain()?)
//!     .pipe(GlyphConverter::new(ConversionConfig::new(100, 50)))
//!     .subscribe(|grid| println!("{}", grid.to_text()))
//!     .run()
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod charset;
pub mod color;
pub mod config;
pub mod converter;
pub mod error;
pub mod filters;
pub mod frame;
pub mod gradient;
pub mod pipeline;
pub mod preset;
pub mod render;
pub mod settings;
pub mod source;

// Re-export main types for convenience
pub use charset::Charset;
pub use color::Rgb;
pub use config::{ColorSource, ConversionConfig, PipelineConfig};
pub use converter::{GlyphConverter, convert};
pub use error::{Result, StreamError};
pub use filters::{Filter, FilterChain};
pub use frame::{Cell, Frame, RenderedFrame};
pub use gradient::{Gradient, GradientStop};
pub use pipeline::{Completion, Stage, SubscriptionHandle, compose};
pub use preset::{PresetInfo, PresetStore};
pub use render::{
    CanvasOptions, CanvasRenderer, FontMetrics, MarkupNode, MarkupOptions, MarkupRenderer,
    PaintMode, RasterSurface, Renderer, Surface,
};
pub use settings::{GradientInfo, Settings};
pub use source::{CanvasSource, FrameSink, FrameSource, ImageSource, VideoElement, VideoSource};
