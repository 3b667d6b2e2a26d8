//! Continuous score-to-color gradient.
//!
//! Scores are mapped to a position in `[0.0, 1.0]` over the scale's
//! domain (clamped at both ends), then linearly interpolated between
//! evenly spaced color stops. The default total scale runs red, yellow,
//! green over `0..=100`.

use serde::Serialize;

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Construct from channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#rrggbb` form used for CSS `background-color`.
    pub fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A gradient over an integer score domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorScale {
    min: u32,
    max: u32,
    stops: Vec<Rgb>,
}

impl ColorScale {
    /// Red.
    pub const LOW: Rgb = Rgb::new(0xd7, 0x30, 0x27);
    /// Yellow.
    pub const MID: Rgb = Rgb::new(0xfe, 0xe0, 0x8b);
    /// Green.
    pub const HIGH: Rgb = Rgb::new(0x1a, 0x98, 0x50);

    /// The scale used for total and per-dataset scores (`0..=100`).
    pub fn total() -> Self {
        Self {
            min: 0,
            max: 100,
            stops: vec![Self::LOW, Self::MID, Self::HIGH],
        }
    }

    /// Position of a score on the gradient, clamped to `[0.0, 1.0]`.
    pub fn position(&self, score: u32) -> f64 {
        let clamped = score.clamp(self.min, self.max);
        let offset = f64::from(clamped.saturating_sub(self.min));
        let span = f64::from(self.max.saturating_sub(self.min));
        (offset / span).clamp(0.0, 1.0)
    }

    /// Color for a score. Total over `u32`: out-of-domain scores take the
    /// end colors.
    pub fn color(&self, score: u32) -> Rgb {
        self.color_at(self.position(score))
    }

    /// Shorthand for `color(score).hex()`.
    pub fn hex(&self, score: u32) -> String {
        self.color(score).hex()
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn color_at(&self, position: f64) -> Rgb {
        let segments = self.stops.len().saturating_sub(1);
        let scaled = position * segments as f64;
        // The last stop owns position 1.0 exactly.
        let index = (scaled.floor() as usize).min(segments.saturating_sub(1));
        let t = (scaled - index as f64).clamp(0.0, 1.0);

        let (Some(from), Some(to)) =
            (self.stops.get(index), self.stops.get(index.saturating_add(1)))
        else {
            return self.stops.last().copied().unwrap_or(Self::HIGH);
        };

        let lerp = |a: u8, b: u8| -> u8 {
            let a = f64::from(a);
            let b = f64::from(b);
            (a + (b - a) * t).round().clamp(0.0, 255.0) as u8
        };

        Rgb::new(lerp(from.r, to.r), lerp(from.g, to.g), lerp(from.b, to.b))
    }
}

impl Default for ColorScale {
    fn default() -> Self {
        Self::total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_hit_end_stops() {
        let scale = ColorScale::total();
        assert_eq!(scale.color(0), ColorScale::LOW);
        assert_eq!(scale.color(100), ColorScale::HIGH);
        assert_eq!(scale.color(50), ColorScale::MID);
    }

    #[test]
    fn out_of_domain_scores_are_clamped() {
        let scale = ColorScale::total();
        assert_eq!(scale.color(250), ColorScale::HIGH);
        assert_eq!(scale.color(u32::MAX), ColorScale::HIGH);
    }

    #[test]
    fn every_legal_score_has_a_hex_color() {
        let scale = ColorScale::total();
        for score in 0..=100 {
            let hex = scale.hex(score);
            assert_eq!(hex.len(), 7);
            assert!(hex.starts_with('#'));
            assert!(hex.chars().skip(1).all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn position_is_monotonic() {
        let scale = ColorScale::total();
        let mut previous = scale.position(0);
        for score in 1..=110 {
            let current = scale.position(score);
            assert!(current >= previous, "score {score} moved backwards");
            previous = current;
        }
    }

    #[test]
    fn hex_formatting() {
        assert_eq!(Rgb::new(0, 15, 255).hex(), "#000fff");
    }
}
