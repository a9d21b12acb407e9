use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::charset::Charset;
use crate::color::Rgb;
use crate::error::{Result, StreamError};
use crate::filters::FilterChain;
use crate::gradient::Gradient;

/// Where cell colors come from when a conversion is `colored`
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ColorSource {
    /// Average source color of the cell
    #[default]
    Sampled,
    /// Average cell color snapped to the nearest entry; one entry is a fixed color
    Palette(Vec<Rgb>),
    /// Cell luminance looked up in the gradient
    Gradient(Gradient),
}

/// Configuration for the glyph conversion stage
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionConfig {
    pub width: u32,             // grid columns, > 0
    pub height: u32,            // grid rows, > 0
    pub colored: bool,
    pub charset: Charset,       // dark → light by default
    pub color_source: ColorSource,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            width: 80,
            height: 40,
            colored: false,
            charset: Charset::default(),
            color_source: ColorSource::Sampled,
        }
    }
}

impl ConversionConfig {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn colored(mut self, colored: bool) -> Self {
        self.colored = colored;
        self
    }

    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    pub fn with_color_source(mut self, color_source: ColorSource) -> Self {
        self.color_source = color_source;
        self
    }

    /// Grid height that keeps the source aspect ratio for a given width.
    ///
    /// `cell_aspect` is glyph width over line height (e.g. 4.2 / 7.0).
    pub fn rows_for_aspect(columns: u32, source_width: u32, source_height: u32, cell_aspect: f32) -> u32 {
        if source_width == 0 {
            return 1;
        }
        let rows = columns as f32 * source_height as f32 / source_width as f32 * cell_aspect;
        (rows.round() as u32).max(1)
    }

    /// Validates the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(StreamError::InvalidConfig(format!(
                "grid dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.charset.is_empty() {
            return Err(StreamError::InvalidConfig("charset must not be empty".into()));
        }
        if let ColorSource::Palette(palette) = &self.color_source
            && palette.is_empty()
        {
            return Err(StreamError::InvalidConfig("palette must not be empty".into()));
        }
        Ok(())
    }
}

/// The pipeline configuration surface, as loaded from a JSON or TOML document
///
/// ```json
/// { "width": 120, "height": 60, "colored": true, "charset": " .:-=+*#%@",
///   "gradient": { "stops": [ { "color": "#000000", "position": 0.0 }, ... ] },
///   "filters": [ { "kind": "contrast", "factor": 0.2 } ] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub width: i64,
    pub height: i64,
    #[serde(default)]
    pub colored: bool,
    #[serde(default = "default_charset")]
    pub charset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient: Option<Gradient>,
    #[serde(default)]
    pub filters: FilterChain,
}

fn default_charset() -> String {
    crate::charset::ASCII_RAMP.to_string()
}

impl PipelineConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Reads a config file, choosing the format from its extension (`.toml`, else JSON).
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&contents)?,
            _ => Self::from_json_str(&contents)?,
        };
        log::debug!("loaded pipeline config from {}", path.display());
        Ok(config)
    }

    /// Splits the document into the converter config and the filter chain.
    ///
    /// # Errors
    /// `InvalidConfig` for non-positive dimensions or an empty charset,
    /// `InvalidParameter` for an out-of-domain filter.
    pub fn build(&self) -> Result<(ConversionConfig, FilterChain)> {
        let dimension = |name: &str, value: i64| {
            u32::try_from(value)
                .ok()
                .filter(|v| *v > 0)
                .ok_or_else(|| StreamError::InvalidConfig(format!("{name} must be > 0, got {value}")))
        };

        let conversion = ConversionConfig {
            width: dimension("width", self.width)?,
            height: dimension("height", self.height)?,
            colored: self.colored,
            charset: Charset::from_str_ramp(&self.charset)?,
            color_source: match &self.gradient {
                Some(gradient) => ColorSource::Gradient(gradient.clone()),
                None => ColorSource::Sampled,
            },
        };
        conversion.validate()?;
        self.filters.validate()?;

        Ok((conversion, self.filters.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::Filter;

    #[test]
    fn test_default_config_is_valid() {
        let config = ConversionConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_dimensions() {
        let mut config = ConversionConfig::new(0, 10);
        assert!(matches!(config.validate(), Err(StreamError::InvalidConfig(_))));

        config.width = 10;
        config.height = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_palette() {
        let config = ConversionConfig::new(4, 4).with_color_source(ColorSource::Palette(vec![]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rows_for_aspect() {
        assert_eq!(ConversionConfig::rows_for_aspect(100, 200, 100, 0.5), 25);
        assert_eq!(ConversionConfig::rows_for_aspect(1, 1000, 1, 0.6), 1);
    }

    #[test]
    fn test_pipeline_config_from_json() {
        let config = PipelineConfig::from_json_str(
            r##"{
                "width": 40, "height": 20, "colored": true, "charset": " #",
                "gradient": {"stops": [
                    {"color": "#000000", "position": 0.0},
                    {"color": "#ff0000", "position": 0.5},
                    {"color": "#ffffff", "position": 1.0}
                ]},
                "filters": [{"kind": "contrast", "factor": 0.2}, {"kind": "brightness", "amount": 10}]
            }"##,
        )
        .unwrap();

        let (conversion, filters) = config.build().unwrap();
        assert_eq!((conversion.width, conversion.height), (40, 20));
        assert!(conversion.colored);
        assert_eq!(conversion.charset.len(), 2);
        assert!(matches!(conversion.color_source, ColorSource::Gradient(_)));
        assert_eq!(
            filters.filters(),
            &[Filter::contrast(0.2), Filter::brightness(10.0)]
        );
    }

    #[test]
    fn test_pipeline_config_from_toml() {
        let config = PipelineConfig::from_toml_str(
            r#"
            width = 8
            height = 4

            [[filters]]
            kind = "inverse"
            "#,
        )
        .unwrap();
        let (conversion, filters) = config.build().unwrap();
        assert!(!conversion.colored);
        assert_eq!(conversion.charset, Charset::default());
        assert_eq!(filters.filters(), &[Filter::Inverse]);
    }

    #[test]
    fn test_build_rejects_bad_values() {
        let mut config = PipelineConfig::from_json_str(r#"{"width": -1, "height": 4}"#).unwrap();
        assert!(matches!(config.build(), Err(StreamError::InvalidConfig(_))));

        config.width = 4;
        config.charset = String::new();
        assert!(matches!(config.build(), Err(StreamError::InvalidConfig(_))));

        config.charset = " #".into();
        config.filters = FilterChain::new().with(Filter::brightness(f32::NAN));
        assert!(matches!(config.build(), Err(StreamError::InvalidParameter { .. })));
    }

    #[test]
    fn test_malformed_document() {
        assert!(matches!(
            PipelineConfig::from_json_str("width = 3"),
            Err(StreamError::Serialization(_))
        ));
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        std::fs::write(&path, "width = 2\nheight = 3\ncolored = true\n").unwrap();
        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!((config.width, config.height), (2, 3));
        assert!(config.colored);
    }
}
