use colorous::Gradient;
use rgb::{RGB, RGB8};

use crate::error::{ColorError, Result};

/// An 8-bit RGB color, displayed as a lowercase `#rrggbb` string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HexColor(pub RGB8);

impl HexColor {
    pub const BLUE: HexColor = HexColor(RGB8 { r: 0, g: 0, b: 255 });
    pub const RED: HexColor = HexColor(RGB8 { r: 255, g: 0, b: 0 });
    pub const GREY: HexColor = HexColor(RGB8 {
        r: 0x8e,
        g: 0x9d,
        b: 0xa2,
    });

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        HexColor(RGB8::new(r, g, b))
    }

    /// Converts channels in `[0, 1]` to bytes by truncation
    pub fn from_unit_rgb(c: RGB<f64>) -> Self {
        let byte = |v: f64| (v * 255.0) as u8;
        HexColor::new(byte(c.r), byte(c.g), byte(c.b))
    }
}

impl std::fmt::Display for HexColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0.r, self.0.g, self.0.b)
    }
}

impl std::str::FromStr for HexColor {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();

        match s.to_ascii_lowercase().as_str() {
            "blue" => return Ok(HexColor::BLUE),
            "red" => return Ok(HexColor::RED),
            "grey" | "gray" => return Ok(HexColor::GREY),
            _ => (),
        }

        let invalid =
            || ColorError::invalid_argument(format!("invalid color '{}'", s));

        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }

        let channel = |ix: usize| {
            u8::from_str_radix(&hex[ix..ix + 2], 16).map_err(|_| invalid())
        };

        Ok(HexColor::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// HSV to RGB, all components in `[0, 1]`
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> RGB<f64> {
    if s == 0.0 {
        return RGB::new(v, v, v);
    }

    let i = (h * 6.0).floor();
    let f = h * 6.0 - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    match (i as i64).rem_euclid(6) {
        0 => RGB::new(v, t, p),
        1 => RGB::new(q, v, p),
        2 => RGB::new(p, v, t),
        3 => RGB::new(p, q, v),
        4 => RGB::new(t, p, v),
        _ => RGB::new(v, p, q),
    }
}

/// Maps a scalar in `[0, 1]` onto the blue (0) to red (1) hue sweep,
/// at full saturation and 75% brightness.
///
/// Out-of-range input is clamped and NaN is treated as 0.
pub fn hue_color(value: f64) -> HexColor {
    let value = if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    };

    let hue = (1.0 - value) * 240.0 / 360.0;
    HexColor::from_unit_rgb(hsv_to_rgb(hue, 1.0, 0.75))
}

/// Perceptual gradients that can replace the hue sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GradientName {
    Cividis,
    Inferno,
    Magma,
    Plasma,
    RedYellowBlue,
    Spectral,
    Turbo,
    Viridis,
}

impl GradientName {
    pub fn gradient(&self) -> Gradient {
        use GradientName::*;
        match self {
            Cividis => colorous::CIVIDIS,
            Inferno => colorous::INFERNO,
            Magma => colorous::MAGMA,
            Plasma => colorous::PLASMA,
            RedYellowBlue => colorous::RED_YELLOW_BLUE,
            Spectral => colorous::SPECTRAL,
            Turbo => colorous::TURBO,
            Viridis => colorous::VIRIDIS,
        }
    }
}

/// How a normalized scalar becomes a color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorScheme {
    HueSweep,
    Gradient(GradientName),
}

impl std::default::Default for ColorScheme {
    fn default() -> Self {
        ColorScheme::HueSweep
    }
}

impl ColorScheme {
    pub fn color(&self, value: f64) -> HexColor {
        match self {
            ColorScheme::HueSweep => hue_color(value),
            ColorScheme::Gradient(name) => {
                let value = if value.is_nan() {
                    0.0
                } else {
                    value.clamp(0.0, 1.0)
                };
                let (r, g, b) =
                    name.gradient().eval_continuous(value).as_tuple();
                HexColor::new(r, g, b)
            }
        }
    }
}

impl std::str::FromStr for ColorScheme {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self> {
        use GradientName::*;

        let scheme = match s.to_ascii_lowercase().as_str() {
            "hue" => ColorScheme::HueSweep,
            "cividis" => ColorScheme::Gradient(Cividis),
            "inferno" => ColorScheme::Gradient(Inferno),
            "magma" => ColorScheme::Gradient(Magma),
            "plasma" => ColorScheme::Gradient(Plasma),
            "rdylbu" => ColorScheme::Gradient(RedYellowBlue),
            "spectral" => ColorScheme::Gradient(Spectral),
            "turbo" => ColorScheme::Gradient(Turbo),
            "viridis" => ColorScheme::Gradient(Viridis),
            _ => {
                return Err(ColorError::invalid_argument(format!(
                    "unknown color scheme '{}'",
                    s
                )))
            }
        };

        Ok(scheme)
    }
}
