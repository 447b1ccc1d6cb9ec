//! Color schemes and multi-stop interpolation engine.

/// RGB color as (r, g, b) with values in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A color stop: position in [0, 1] mapped to an RGB color.
#[derive(Debug, Clone, Copy)]
pub struct ColorStop {
    pub t: f64,
    pub color: Rgb,
}

impl ColorStop {
    pub const fn new(t: f64, r: u8, g: u8, b: u8) -> Self {
        Self {
            t,
            color: Rgb::new(r, g, b),
        }
    }
}

/// Available color schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorScheme {
    /// Brown -> Yellow -> Green (NDVI)
    Ndvi,
    /// Red -> White -> Green (signed NDVI delta; loss is red)
    Delta,
    /// Black -> White
    Grayscale,
}

impl ColorScheme {
    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ndvi => "NDVI",
            Self::Delta => "Delta",
            Self::Grayscale => "Grayscale",
        }
    }
}

// ─── Color stop definitions ────────────────────────────────────────────

const NDVI_STOPS: &[ColorStop] = &[
    ColorStop::new(0.0, 120, 70, 20),
    ColorStop::new(0.3, 200, 170, 60),
    ColorStop::new(0.5, 240, 230, 100),
    ColorStop::new(0.7, 100, 180, 50),
    ColorStop::new(1.0, 10, 100, 20),
];

const DELTA_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 178, 24, 43),
    ColorStop::new(0.25, 239, 138, 98),
    ColorStop::new(0.50, 247, 247, 247),
    ColorStop::new(0.75, 103, 169, 107),
    ColorStop::new(1.00, 27, 120, 55),
];

// ─── Interpolation engine ──────────────────────────────────────────────

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn lerp_color(c1: Rgb, c2: Rgb, t: f64) -> Rgb {
    Rgb::new(
        lerp(c1.r as f64, c2.r as f64, t).round() as u8,
        lerp(c1.g as f64, c2.g as f64, t).round() as u8,
        lerp(c1.b as f64, c2.b as f64, t).round() as u8,
    )
}

fn multi_stop(stops: &[ColorStop], t: f64) -> Rgb {
    if t <= 0.0 {
        return stops[0].color;
    }
    if t >= 1.0 {
        return stops[stops.len() - 1].color;
    }
    for i in 1..stops.len() {
        if t <= stops[i].t {
            let ratio = (t - stops[i - 1].t) / (stops[i].t - stops[i - 1].t);
            return lerp_color(stops[i - 1].color, stops[i].color, ratio);
        }
    }
    stops[stops.len() - 1].color
}

/// Evaluate a color scheme at normalized position `t` ∈ [0, 1].
pub fn evaluate(scheme: ColorScheme, t: f64) -> Rgb {
    match scheme {
        ColorScheme::Ndvi => multi_stop(NDVI_STOPS, t),
        ColorScheme::Delta => multi_stop(DELTA_STOPS, t),
        ColorScheme::Grayscale => {
            let v = (t.clamp(0.0, 1.0) * 255.0).round() as u8;
            Rgb::new(v, v, v)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_endpoints() {
        // Most negative delta is red, most positive is green
        assert_eq!(evaluate(ColorScheme::Delta, 0.0), Rgb::new(178, 24, 43));
        assert_eq!(evaluate(ColorScheme::Delta, 1.0), Rgb::new(27, 120, 55));
    }

    #[test]
    fn delta_midpoint_is_neutral() {
        assert_eq!(evaluate(ColorScheme::Delta, 0.5), Rgb::new(247, 247, 247));
    }

    #[test]
    fn grayscale_midpoint() {
        assert_eq!(evaluate(ColorScheme::Grayscale, 0.5), Rgb::new(128, 128, 128));
    }

    #[test]
    fn ndvi_endpoints() {
        assert_eq!(evaluate(ColorScheme::Ndvi, 0.0), Rgb::new(120, 70, 20));
        assert_eq!(evaluate(ColorScheme::Ndvi, 1.0), Rgb::new(10, 100, 20));
    }

    #[test]
    fn clamping_outside_range() {
        assert_eq!(evaluate(ColorScheme::Ndvi, -0.5), Rgb::new(120, 70, 20));
        assert_eq!(evaluate(ColorScheme::Ndvi, 1.5), Rgb::new(10, 100, 20));
    }
}
