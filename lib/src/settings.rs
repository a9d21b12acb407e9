//! Live style settings
//!
//! UI controls write into a [`Settings`] value; the pipeline reads it through
//! [`Settings::filter_chain`] and [`Settings::gradient`] when a pipeline is
//! built. Slider units follow the controls: brightness in channel units,
//! contrast and desaturation in percent, gradient positions in percent.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::color::Rgb;
use crate::error::Result;
use crate::filters::{Filter, FilterChain};
use crate::gradient::{Gradient, GradientStop};
use crate::render::FontMetrics;

/// Gradient document: three colors and their positions in percent.
/// Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradientInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color1: Option<Rgb>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color2: Option<Rgb>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color3: Option<Rgb>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_position1: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_position2: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_position3: Option<f32>,
}

impl GradientInfo {
    /// Black → gray → white across the full range
    pub fn grayscale() -> Self {
        Self {
            color1: Some(Rgb::BLACK),
            color2: Some(Rgb::new(128, 128, 128)),
            color3: Some(Rgb::WHITE),
            color_position1: Some(0.0),
            color_position2: Some(50.0),
            color_position3: Some(100.0),
        }
    }

    pub fn from_gradient(gradient: &Gradient) -> Self {
        let [a, b, c] = gradient.stops();
        Self {
            color1: Some(a.color),
            color2: Some(b.color),
            color3: Some(c.color),
            color_position1: Some(a.position * 100.0),
            color_position2: Some(b.position * 100.0),
            color_position3: Some(c.position * 100.0),
        }
    }

    /// Builds the evaluator; `None` while any field is missing.
    ///
    /// # Errors
    /// `InvalidParameter` for positions outside 0–100.
    pub fn to_gradient(&self) -> Result<Option<Gradient>> {
        let stop = |color: Option<Rgb>, position: Option<f32>| {
            Some(GradientStop::new(color?, position? / 100.0))
        };
        let stops = (
            stop(self.color1, self.color_position1),
            stop(self.color2, self.color_position2),
            stop(self.color3, self.color_position3),
        );
        match stops {
            (Some(a), Some(b), Some(c)) => Gradient::new([a, b, c]).map(Some),
            _ => Ok(None),
        }
    }

    /// Overwrites the fields present in `other`
    pub fn merge(&mut self, other: &GradientInfo) {
        fn take<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if let Some(v) = value {
                *slot = Some(v.clone());
            }
        }
        take(&mut self.color1, &other.color1);
        take(&mut self.color2, &other.color2);
        take(&mut self.color3, &other.color3);
        take(&mut self.color_position1, &other.color_position1);
        take(&mut self.color_position2, &other.color_position2);
        take(&mut self.color_position3, &other.color_position3);
    }
}

/// Slider ranges; values outside them never reach [`Settings`] from a preset
pub const BRIGHTNESS_RANGE: RangeInclusive<f32> = -255.0..=255.0;
pub const CONTRAST_RANGE: RangeInclusive<f32> = -100.0..=100.0;
pub const DESATURATION_RANGE: RangeInclusive<f32> = 0.0..=100.0;
pub const POSITION_RANGE: RangeInclusive<f32> = 0.0..=100.0;

/// Every observable style parameter of the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub inverse: bool,
    pub desaturate: bool,
    pub brightness: f32,   // channel units, -255..255, default 0
    pub contrast: f32,     // percent, -100..100, default 0
    pub desaturation: f32, // percent, 0..100, default 0
    pub gradient: GradientInfo,
    pub font: FontMetrics,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            inverse: false,
            desaturate: false,
            brightness: 0.0,
            contrast: 0.0,
            desaturation: 0.0,
            gradient: GradientInfo::grayscale(),
            font: FontMetrics::default(),
        }
    }
}

impl Settings {
    /// Filters in application order: inverse, desaturate, contrast, brightness.
    /// Neutral values are left out.
    pub fn filter_chain(&self) -> Result<FilterChain> {
        let mut chain = FilterChain::new();
        if self.inverse {
            chain.push(Filter::inverse());
        }
        if self.desaturate && self.desaturation != 0.0 {
            chain.push(Filter::desaturate(self.desaturation / 100.0));
        }
        if self.contrast != 0.0 {
            chain.push(Filter::contrast(self.contrast / 100.0));
        }
        if self.brightness != 0.0 {
            chain.push(Filter::brightness(self.brightness));
        }
        chain.validate()?;
        Ok(chain)
    }

    pub fn gradient(&self) -> Result<Option<Gradient>> {
        self.gradient.to_gradient()
    }
}
