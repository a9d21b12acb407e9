use serde::{Deserialize, Serialize};

use crate::error::{Result, StreamError};
use crate::frame::{Frame, luminance};
use crate::pipeline::Stage;

/// Per-pixel transform applied before conversion
///
/// Only pixel values are clamped to [0, 255]; a parameter outside its domain
/// is rejected with `StreamError::InvalidParameter`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Filter {
    /// RGB → 255 - v, alpha untouched
    Inverse,
    /// v + amount
    Brightness { amount: f32 },
    /// (v - 128) * (1 + factor) + 128, factor >= -1
    Contrast { factor: f32 },
    /// v * gain + bias
    Linear { gain: f32, bias: f32 },
    /// Blend toward the pixel's luminance, amount in [0, 1]
    Desaturate { amount: f32 },
}

impl Filter {
    pub fn inverse() -> Self {
        Filter::Inverse
    }

    pub fn brightness(amount: f32) -> Self {
        Filter::Brightness { amount }
    }

    pub fn contrast(factor: f32) -> Self {
        Filter::Contrast { factor }
    }

    pub fn linear(gain: f32, bias: f32) -> Self {
        Filter::Linear { gain, bias }
    }

    pub fn desaturate(amount: f32) -> Self {
        Filter::Desaturate { amount }
    }

    /// Checks the filter parameter against its domain
    pub fn validate(&self) -> Result<()> {
        match *self {
            Filter::Inverse => {}
            Filter::Brightness { amount } => {
                StreamError::check_finite("amount", amount)?;
            }
            Filter::Contrast { factor } => {
                StreamError::check_finite("factor", factor)?;
                if factor < -1.0 {
                    return Err(StreamError::invalid_parameter(
                        "factor",
                        format!("contrast factor must be >= -1, got {factor}"),
                    ));
                }
            }
            Filter::Linear { gain, bias } => {
                StreamError::check_finite("gain", gain)?;
                StreamError::check_finite("bias", bias)?;
            }
            Filter::Desaturate { amount } => {
                StreamError::check_finite("amount", amount)?;
                if !(0.0..=1.0).contains(&amount) {
                    return Err(StreamError::invalid_parameter(
                        "amount",
                        format!("desaturation must be within [0, 1], got {amount}"),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Applies the filter, returning a new frame
    pub fn apply(&self, frame: &Frame) -> Result<Frame> {
        self.validate()?;

        let out = match *self {
            Filter::Inverse => frame.map_pixels(|[r, g, b, a]| [255 - r, 255 - g, 255 - b, a]),
            Filter::Brightness { amount } => map_channels(frame, |v| v + amount),
            Filter::Contrast { factor } => {
                map_channels(frame, |v| (v - 128.0) * (1.0 + factor) + 128.0)
            }
            Filter::Linear { gain, bias } => map_channels(frame, |v| v * gain + bias),
            Filter::Desaturate { amount } => frame.map_pixels(|[r, g, b, a]| {
                let lum = luminance(r as f32, g as f32, b as f32);
                let blend = |v: u8| to_channel(v as f32 + (lum - v as f32) * amount);
                [blend(r), blend(g), blend(b), a]
            }),
        };

        Ok(out)
    }
}

/// Rounds and clamps a channel value to [0, 255]
fn to_channel(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn map_channels(frame: &Frame, f: impl Fn(f32) -> f32) -> Frame {
    frame.map_pixels(|[r, g, b, a]| {
        [
            to_channel(f(r as f32)),
            to_channel(f(g as f32)),
            to_channel(f(b as f32)),
            a,
        ]
    })
}

/// Ordered list of filters applied sequentially
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterChain {
    filters: Vec<Filter>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style append
    pub fn with(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn push(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        self.filters.iter().try_for_each(Filter::validate)
    }

    /// Applies every filter in order. An empty chain returns a copy.
    pub fn apply(&self, frame: &Frame) -> Result<Frame> {
        let mut current = frame.clone();
        for filter in &self.filters {
            current = filter.apply(&current)?;
        }
        Ok(current)
    }
}

impl From<Vec<Filter>> for FilterChain {
    fn from(filters: Vec<Filter>) -> Self {
        Self { filters }
    }
}

impl Stage for Filter {
    type Input = Frame;
    type Output = Frame;

    fn process(&mut self, input: Frame) -> Result<Frame> {
        self.apply(&input)
    }
}

impl Stage for FilterChain {
    type Input = Frame;
    type Output = Frame;

    fn process(&mut self, input: Frame) -> Result<Frame> {
        self.apply(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn gradient_frame() -> Frame {
        let mut raw = Vec::new();
        for y in 0..4u8 {
            for x in 0..4u8 {
                raw.extend_from_slice(&[x * 60, y * 60, 200 - x * 20, 255 - y]);
            }
        }
        Frame::from_raw(4, 4, raw).unwrap()
    }

    #[test]
    fn test_inverse_keeps_alpha() {
        let frame = Frame::solid(2, 2, [10, 20, 30, 40]).unwrap();
        let out = Filter::inverse().apply(&frame).unwrap();
        assert_eq!(out.pixel(0, 0), [245, 235, 225, 40]);
    }

    #[test]
    fn test_brightness_clamps_pixels() {
        let frame = Frame::solid(1, 1, [250, 5, 128, 255]).unwrap();
        let up = Filter::brightness(10.0).apply(&frame).unwrap();
        assert_eq!(up.pixel(0, 0), [255, 15, 138, 255]);
        let down = Filter::brightness(-10.0).apply(&frame).unwrap();
        assert_eq!(down.pixel(0, 0), [240, 0, 118, 255]);
    }

    #[test]
    fn test_contrast_zero_is_noop() {
        let frame = gradient_frame();
        let out = Filter::contrast(0.0).apply(&frame).unwrap();
        assert_eq!(out, frame);
    }

    #[test]
    fn test_contrast_full_negative_flattens() {
        let frame = gradient_frame();
        let out = Filter::contrast(-1.0).apply(&frame).unwrap();
        assert_eq!(out.pixel(3, 3)[..3], [128, 128, 128]);
    }

    #[test]
    fn test_linear() {
        let frame = Frame::solid(1, 1, [100, 200, 0, 255]).unwrap();
        let out = Filter::linear(2.0, -50.0).apply(&frame).unwrap();
        assert_eq!(out.pixel(0, 0), [150, 255, 0, 255]);
    }

    #[test]
    fn test_desaturate_full_is_gray() {
        let frame = Frame::solid(1, 1, [255, 0, 0, 255]).unwrap();
        let out = Filter::desaturate(1.0).apply(&frame).unwrap();
        let [r, g, b, _] = out.pixel(0, 0);
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(r, 76);
    }

    #[test]
    fn test_non_finite_parameters_rejected() {
        let frame = gradient_frame();
        for filter in [
            Filter::brightness(f32::NAN),
            Filter::contrast(f32::INFINITY),
            Filter::linear(1.0, f32::NEG_INFINITY),
            Filter::desaturate(f32::NAN),
        ] {
            let err = filter.apply(&frame).unwrap_err();
            assert!(matches!(err, StreamError::InvalidParameter { .. }), "{filter:?}");
        }
    }

    #[test]
    fn test_out_of_domain_parameters_rejected() {
        assert!(Filter::contrast(-1.5).validate().is_err());
        assert!(Filter::desaturate(1.5).validate().is_err());
        assert!(Filter::desaturate(-0.1).validate().is_err());
    }

    #[test]
    fn test_chain_matches_sequential_application() {
        let frame = gradient_frame();
        let chain = FilterChain::new()
            .with(Filter::contrast(0.2))
            .with(Filter::brightness(10.0))
            .with(Filter::inverse());

        let sequential = Filter::inverse()
            .apply(
                &Filter::brightness(10.0)
                    .apply(&Filter::contrast(0.2).apply(&frame).unwrap())
                    .unwrap(),
            )
            .unwrap();

        assert_eq!(chain.apply(&frame).unwrap(), sequential);
    }

    #[test]
    fn test_serde_tagged_by_kind() {
        let chain: FilterChain = serde_json::from_str(
            r#"[{"kind":"inverse"},{"kind":"linear","gain":1.5,"bias":-3}]"#,
        )
        .unwrap();
        assert_eq!(
            chain.filters(),
            &[Filter::Inverse, Filter::linear(1.5, -3.0)]
        );
    }

    proptest! {
        #[test]
        fn prop_inverse_is_involution(pixels in proptest::collection::vec(any::<u8>(), 4 * 6)) {
            let frame = Frame::from_raw(3, 2, pixels).unwrap();
            let twice = Filter::inverse()
                .apply(&Filter::inverse().apply(&frame).unwrap())
                .unwrap();
            prop_assert_eq!(twice, frame);
        }

        #[test]
        fn prop_contrast_zero_is_identity(pixels in proptest::collection::vec(any::<u8>(), 4 * 4)) {
            let frame = Frame::from_raw(2, 2, pixels).unwrap();
            prop_assert_eq!(Filter::contrast(0.0).apply(&frame).unwrap(), frame);
        }
    }
}
