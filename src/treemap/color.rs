use std::fmt;

/// Label text contrast boundary. Stricter than the WCAG 2 value of 0.179 so that
/// black text is only used on clearly light backgrounds.
pub const LABEL_LUMINANCE_THRESHOLD: f64 = 0.230;

/// A validated `#rrggbb` color string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HexColor(String);

impl HexColor {
    /// Accepts only `#` followed by exactly six hex digits. The original
    /// casing is kept.
    pub fn parse(s: &str) -> Option<Self> {
        let digits = s.strip_prefix('#')?;
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(HexColor(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_rgb(&self) -> Rgb {
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&self.0[range], 16).unwrap_or(0) as f64 / 255.0
        };
        Rgb::new(channel(1..3), channel(3..5), channel(5..7))
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An sRGB color with channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    pub fn lerp(&self, target: &Self, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self {
            r: self.r + (target.r - self.r) * t,
            g: self.g + (target.g - self.g) * t,
            b: self.b + (target.b - self.b) * t,
        }
    }

    /// Lowercase `#rrggbb`, each channel clamped and rounded.
    pub fn to_hex(&self) -> HexColor {
        let byte = |c: f64| {
            if c.is_nan() {
                0
            } else {
                (c.clamp(0.0, 1.0) * 255.0).round() as u8
            }
        };
        HexColor(format!(
            "#{:02x}{:02x}{:02x}",
            byte(self.r),
            byte(self.g),
            byte(self.b)
        ))
    }

    /// WCAG relative luminance.
    pub fn relative_luminance(&self) -> f64 {
        fn linear(c: f64) -> f64 {
            let c = c.clamp(0.0, 1.0);
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        0.2126 * linear(self.r) + 0.7152 * linear(self.g) + 0.0722 * linear(self.b)
    }
}

/// Text color drawn on top of a treemap tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelColor {
    Black,
    White,
}

impl LabelColor {
    pub fn for_background(background: &Rgb) -> Self {
        Self::for_luminance(background.relative_luminance())
    }

    /// Black only above the threshold; the threshold itself gets white.
    pub fn for_luminance(luminance: f64) -> Self {
        if luminance > LABEL_LUMINANCE_THRESHOLD {
            LabelColor::Black
        } else {
            LabelColor::White
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            LabelColor::Black => "--black",
            LabelColor::White => "--white",
        }
    }

    pub fn from_token(s: &str) -> Option<Self> {
        match s {
            "--black" => Some(LabelColor::Black),
            "--white" => Some(LabelColor::White),
            _ => None,
        }
    }
}

/// Piecewise-linear gradient over evenly spaced anchor colors.
#[derive(Debug, Clone)]
pub struct Interpolator {
    anchors: Vec<Rgb>,
}

impl Interpolator {
    pub fn new(anchors: Vec<Rgb>) -> Option<Self> {
        if anchors.len() < 2 {
            return None;
        }
        Some(Self { anchors })
    }

    pub fn at(&self, ratio: f64) -> Rgb {
        let ratio = if ratio.is_nan() {
            0.0
        } else {
            ratio.clamp(0.0, 1.0)
        };
        let segments = (self.anchors.len() - 1) as f64;
        let scaled = ratio * segments;
        let index = (scaled.floor() as usize).min(self.anchors.len() - 2);
        let local = scaled - index as f64;
        self.anchors[index].lerp(&self.anchors[index + 1], local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parse_is_strict() {
        assert!(HexColor::parse("#1ea64b").is_some());
        assert!(HexColor::parse("#1EA64B").is_some());
        assert!(HexColor::parse(" #1ea64b ").is_none());
        assert!(HexColor::parse("1ea64b").is_none());
        assert!(HexColor::parse("#fff").is_none());
        assert!(HexColor::parse("#1ea64b00").is_none());
        assert!(HexColor::parse("#1ea6zz").is_none());
        assert!(HexColor::parse("hsl(0, 0%, 95%)").is_none());
        assert!(HexColor::parse("").is_none());
    }

    #[test]
    fn hex_roundtrips_through_rgb() {
        let hex = HexColor::parse("#e6001f").unwrap();
        assert_eq!(hex.to_rgb().to_hex().as_str(), "#e6001f");
    }

    #[test]
    fn luminance_endpoints() {
        assert!((Rgb::new(1.0, 1.0, 1.0).relative_luminance() - 1.0).abs() < 1e-10);
        assert!(Rgb::new(0.0, 0.0, 0.0).relative_luminance().abs() < 1e-10);
    }

    #[test]
    fn label_color_follows_threshold() {
        assert_eq!(
            LabelColor::for_background(&Rgb::new(1.0, 1.0, 1.0)),
            LabelColor::Black
        );
        assert_eq!(
            LabelColor::for_background(&Rgb::new(0.0, 0.0, 0.0)),
            LabelColor::White
        );
        // #808080 has luminance ~0.216: below the threshold
        let gray = HexColor::parse("#808080").unwrap().to_rgb();
        assert_eq!(LabelColor::for_background(&gray), LabelColor::White);
        // #8c8c8c has luminance ~0.262: above the threshold
        let light_gray = HexColor::parse("#8c8c8c").unwrap().to_rgb();
        assert_eq!(LabelColor::for_background(&light_gray), LabelColor::Black);
    }

    #[test]
    fn threshold_luminance_gets_white_label() {
        assert_eq!(
            LabelColor::for_luminance(LABEL_LUMINANCE_THRESHOLD),
            LabelColor::White
        );
        let just_above = f64::from_bits(LABEL_LUMINANCE_THRESHOLD.to_bits() + 1);
        assert!(just_above > LABEL_LUMINANCE_THRESHOLD);
        assert_eq!(LabelColor::for_luminance(just_above), LabelColor::Black);
    }

    #[test]
    fn interpolator_hits_anchors() {
        let red = Rgb::new(1.0, 0.0, 0.0);
        let yellow = Rgb::new(1.0, 1.0, 0.0);
        let green = Rgb::new(0.0, 1.0, 0.0);
        let palette = Interpolator::new(vec![red, yellow, green]).unwrap();

        assert_eq!(palette.at(0.0), red);
        assert_eq!(palette.at(0.5), yellow);
        assert_eq!(palette.at(1.0), green);
        assert_eq!(palette.at(0.25).to_hex().as_str(), "#ff8000");
    }

    #[test]
    fn interpolator_clamps_out_of_range() {
        let palette =
            Interpolator::new(vec![Rgb::new(0.0, 0.0, 0.0), Rgb::new(1.0, 1.0, 1.0)]).unwrap();
        assert_eq!(palette.at(-3.0), Rgb::new(0.0, 0.0, 0.0));
        assert_eq!(palette.at(7.0), Rgb::new(1.0, 1.0, 1.0));
        assert_eq!(palette.at(f64::NAN), Rgb::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn interpolator_needs_two_anchors() {
        assert!(Interpolator::new(vec![Rgb::new(0.0, 0.0, 0.0)]).is_none());
    }
}
