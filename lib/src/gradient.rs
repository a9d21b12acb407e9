//! Three-stop color gradient used to synthesize cell colors from luminance.

use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::error::{Result, StreamError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub color: Rgb,
    /// In [0, 1]
    pub position: f32,
}

impl GradientStop {
    pub fn new(color: Rgb, position: f32) -> Self {
        Self { color, position }
    }
}

/// Gradient over [0, 1] defined by three stops in any order
///
/// Evaluation works on the stops stably sorted by position, so when two
/// stops share a position the later-declared one wins there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GradientStops", into = "GradientStops")]
pub struct Gradient {
    declared: [GradientStop; 3],
    sorted: [GradientStop; 3],
}

#[derive(Serialize, Deserialize)]
struct GradientStops {
    stops: [GradientStop; 3],
}

impl TryFrom<GradientStops> for Gradient {
    type Error = StreamError;

    fn try_from(value: GradientStops) -> Result<Self> {
        Gradient::new(value.stops)
    }
}

impl From<Gradient> for GradientStops {
    fn from(value: Gradient) -> Self {
        GradientStops {
            stops: value.declared,
        }
    }
}

impl Gradient {
    /// # Errors
    /// `StreamError::InvalidParameter` if a position is non-finite or outside [0, 1].
    pub fn new(stops: [GradientStop; 3]) -> Result<Self> {
        for stop in &stops {
            StreamError::check_finite("position", stop.position)?;
            if !(0.0..=1.0).contains(&stop.position) {
                return Err(StreamError::invalid_parameter(
                    "position",
                    format!("gradient stop position must be within [0, 1], got {}", stop.position),
                ));
            }
        }

        let mut sorted = stops;
        // slice::sort_by is stable
        sorted.sort_by(|a, b| a.position.total_cmp(&b.position));

        Ok(Self {
            declared: stops,
            sorted,
        })
    }

    /// Stops in declaration order
    pub fn stops(&self) -> &[GradientStop; 3] {
        &self.declared
    }

    /// Color at `t`, clamped into [0, 1]
    pub fn evaluate(&self, t: f32) -> Rgb {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let stops = &self.sorted;

        // Last stop at or before t
        let Some(lower) = stops.iter().rposition(|s| s.position <= t) else {
            return stops[0].color;
        };
        let Some(upper) = stops.get(lower + 1) else {
            return stops[lower].color;
        };

        let from = stops[lower];
        let span = upper.position - from.position;
        if span <= 0.0 {
            return from.color;
        }
        from.color.lerp(upper.color, (t - from.position) / span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn red_green_blue() -> Gradient {
        Gradient::new([
            GradientStop::new(Rgb::new(255, 0, 0), 0.0),
            GradientStop::new(Rgb::new(0, 255, 0), 0.5),
            GradientStop::new(Rgb::new(0, 0, 255), 1.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_exact_stop_positions() {
        let g = red_green_blue();
        assert_eq!(g.evaluate(0.0), Rgb::new(255, 0, 0));
        assert_eq!(g.evaluate(0.5), Rgb::new(0, 255, 0));
        assert_eq!(g.evaluate(1.0), Rgb::new(0, 0, 255));
    }

    #[test]
    fn test_interpolates_between_stops() {
        let g = red_green_blue();
        assert_eq!(g.evaluate(0.25), Rgb::new(128, 128, 0));
    }

    #[test]
    fn test_unsorted_stops_are_sorted() {
        let g = Gradient::new([
            GradientStop::new(Rgb::new(0, 0, 255), 1.0),
            GradientStop::new(Rgb::new(255, 0, 0), 0.0),
            GradientStop::new(Rgb::new(0, 255, 0), 0.5),
        ])
        .unwrap();
        assert_eq!(g.evaluate(0.25), red_green_blue().evaluate(0.25));
        assert_eq!(g.stops()[0].color, Rgb::new(0, 0, 255));
    }

    #[test]
    fn test_outside_stop_range_holds_end_colors() {
        let g = Gradient::new([
            GradientStop::new(Rgb::new(10, 10, 10), 0.2),
            GradientStop::new(Rgb::new(20, 20, 20), 0.4),
            GradientStop::new(Rgb::new(30, 30, 30), 0.8),
        ])
        .unwrap();
        assert_eq!(g.evaluate(0.0), Rgb::new(10, 10, 10));
        assert_eq!(g.evaluate(1.0), Rgb::new(30, 30, 30));
    }

    #[test]
    fn test_shared_position_later_declared_wins() {
        let g = Gradient::new([
            GradientStop::new(Rgb::new(0, 0, 0), 0.0),
            GradientStop::new(Rgb::new(255, 0, 0), 0.5),
            GradientStop::new(Rgb::new(0, 0, 255), 0.5),
        ])
        .unwrap();
        assert_eq!(g.evaluate(0.5), Rgb::new(0, 0, 255));
        assert_eq!(g.evaluate(0.75), Rgb::new(0, 0, 255));
    }

    #[test]
    fn test_invalid_positions_rejected() {
        let stop = |p| GradientStop::new(Rgb::BLACK, p);
        assert!(Gradient::new([stop(0.0), stop(1.5), stop(1.0)]).is_err());
        assert!(Gradient::new([stop(0.0), stop(f32::NAN), stop(1.0)]).is_err());
    }

    #[test]
    fn test_serde_keeps_declaration_order() {
        let json = r##"{"stops":[{"color":"#0000ff","position":1.0},{"color":"#ff0000","position":0.0},{"color":"#00ff00","position":0.5}]}"##;
        let g: Gradient = serde_json::from_str(json).unwrap();
        assert_eq!(g.stops()[0].color, Rgb::new(0, 0, 255));
        let back: Gradient = serde_json::from_str(&serde_json::to_string(&g).unwrap()).unwrap();
        assert_eq!(back, g);
    }

    proptest! {
        #[test]
        fn prop_evaluation_is_continuous(t in 0.0f32..0.999) {
            let g = red_green_blue();
            let a = g.evaluate(t);
            let b = g.evaluate(t + 0.001);
            // 0.001 of a 0.5-wide segment moves a channel by at most ~0.51 before rounding
            for (x, y) in a.0.iter().zip(b.0.iter()) {
                prop_assert!((*x as i32 - *y as i32).abs() <= 1);
            }
        }
    }
}
