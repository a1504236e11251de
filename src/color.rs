use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| hue_color((i as f32 / n as f32) * 360.0))
        .collect()
}

fn hue_color(hue: f32) -> Color32 {
    let rgb: Srgb = Hsl::new(hue, 0.75, 0.55).into_color();
    to_color32(rgb)
}

fn to_color32(rgb: Srgb) -> Color32 {
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

// ---------------------------------------------------------------------------
// Continuous scales
// ---------------------------------------------------------------------------

/// Blue → grey → red for a value in `[-1, 1]`, as used for correlations.
/// Interpolated in linear RGB.
pub fn diverging(value: f64) -> Color32 {
    let t = value.clamp(-1.0, 1.0) as f32;
    let mid = LinSrgb::new(0.75_f32, 0.75, 0.75);
    let end = if t < 0.0 {
        LinSrgb::new(0.05_f32, 0.12, 0.55)
    } else {
        LinSrgb::new(0.60_f32, 0.02, 0.03)
    };
    let rgb: Srgb = Srgb::from_linear(mid.mix(end, t.abs()));
    to_color32(rgb)
}

/// Blue (low) to red (high) for `t` in `[0, 1]`.
pub fn sequential(t: f64) -> Color32 {
    hue_color(240.0 * (1.0 - t.clamp(0.0, 1.0) as f32))
}

// ---------------------------------------------------------------------------
// Color mapping: country label → Color32
// ---------------------------------------------------------------------------

/// Maps country labels to distinct colours.
#[derive(Debug, Clone)]
pub struct CountryColors {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl CountryColors {
    pub fn new(labels: &[String]) -> Self {
        let mapping = labels
            .iter()
            .cloned()
            .zip(generate_palette(labels.len()))
            .collect();
        CountryColors {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    pub fn color_for(&self, label: &str) -> Color32 {
        self.mapping
            .get(label)
            .copied()
            .unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_colours_are_distinct() {
        let p = generate_palette(3);
        assert_eq!(p.len(), 3);
        assert_ne!(p[0], p[1]);
        assert_ne!(p[1], p[2]);
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn diverging_ends_differ_and_centre_is_grey() {
        let neg = diverging(-1.0);
        let pos = diverging(1.0);
        assert!(neg.b() > neg.r());
        assert!(pos.r() > pos.b());
        let mid = diverging(0.0);
        assert_eq!(mid.r(), mid.g());
        assert_eq!(diverging(5.0), pos);
    }

    #[test]
    fn unknown_country_is_grey() {
        let colors = CountryColors::new(&["Benin".to_string(), "Togo".to_string()]);
        assert_ne!(colors.color_for("Benin"), colors.color_for("Togo"));
        assert_eq!(colors.color_for("Chad"), Color32::GRAY);
    }
}
