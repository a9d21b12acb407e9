//! Glyph ramps used by the converter
//!
//! A charset is ordered from one luminance extreme to the other. The default
//! ramps run dark → light, so a brighter cell picks a denser glyph; call
//! [`Charset::reversed`] for light backgrounds.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, StreamError};

/// 10 levels from darkest (space) to brightest (@)
pub const ASCII_RAMP: &str = " .:-=+*#%@";

/// Longer ramp with finer steps
pub const DETAILED_RAMP: &str = " .,:;i1tfLCG08@";

/// Unicode shade blocks
pub const BLOCK_RAMP: &str = " ░▒▓█";

/// Ordered, non-empty glyph sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charset {
    glyphs: Vec<char>,
}

impl Charset {
    /// # Errors
    /// `StreamError::InvalidConfig` if `glyphs` is empty.
    pub fn new(glyphs: Vec<char>) -> Result<Self> {
        if glyphs.is_empty() {
            return Err(StreamError::InvalidConfig("charset must not be empty".into()));
        }
        Ok(Self { glyphs })
    }

    pub fn from_str_ramp(ramp: &str) -> Result<Self> {
        Self::new(ramp.chars().collect())
    }

    /// Same glyphs, opposite luminance direction
    pub fn reversed(&self) -> Self {
        let mut glyphs = self.glyphs.clone();
        glyphs.reverse();
        Self { glyphs }
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn glyphs(&self) -> &[char] {
        &self.glyphs
    }

    pub fn glyph(&self, index: usize) -> char {
        self.glyphs[index]
    }

    /// Maps a luminance in [0, 255] to a glyph index
    ///
    /// Linear scale into `[0, len - 1]`, rounded to nearest.
    pub fn index_for(&self, luminance: f32) -> usize {
        let last = self.glyphs.len().saturating_sub(1);
        let lum = luminance.clamp(0.0, 255.0);
        let index = (lum / 255.0 * last as f32).round() as usize;
        index.min(last)
    }
}

impl Default for Charset {
    fn default() -> Self {
        Self {
            glyphs: ASCII_RAMP.chars().collect(),
        }
    }
}

impl Serialize for Charset {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(&self.glyphs.iter().collect::<String>())
    }
}

impl<'de> Deserialize<'de> for Charset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let ramp = String::deserialize(deserializer)?;
        Charset::from_str_ramp(&ramp).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_darkest() {
        assert_eq!(Charset::default().index_for(0.0), 0);
    }

    #[test]
    fn test_index_brightest() {
        let charset = Charset::default();
        assert_eq!(charset.glyph(charset.index_for(255.0)), '@');
    }

    #[test]
    fn test_index_rounds_to_nearest() {
        let charset = Charset::from_str_ramp(" #").unwrap();
        assert_eq!(charset.index_for(127.0), 0);
        assert_eq!(charset.index_for(128.0), 1);
    }

    #[test]
    fn test_single_glyph_charset() {
        let charset = Charset::from_str_ramp("x").unwrap();
        assert_eq!(charset.index_for(0.0), 0);
        assert_eq!(charset.index_for(255.0), 0);
    }

    #[test]
    fn test_reversed() {
        let charset = Charset::default().reversed();
        assert_eq!(charset.glyph(charset.index_for(0.0)), '@');
        assert_eq!(charset.glyph(charset.index_for(255.0)), ' ');
    }

    #[test]
    fn test_empty_rejected() {
        let err = Charset::from_str_ramp("").unwrap_err();
        assert!(matches!(err, StreamError::InvalidConfig(_)));
    }

    #[test]
    fn test_out_of_range_luminance_clamped() {
        let charset = Charset::default();
        assert_eq!(charset.index_for(-5.0), 0);
        assert_eq!(charset.index_for(400.0), charset.len() - 1);
    }
}
