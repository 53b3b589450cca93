//! Redaction style

use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::RenderError;

pub const DEFAULT_COLOR: &str = "#000000";
pub const DEFAULT_BLUR_SIGMA: f32 = 12.0;
pub const DEFAULT_PADDING: u32 = 2;
/// Upper bound for caller-supplied blur strength.
pub const MAX_BLUR_SIGMA: f32 = 64.0;
const MIN_BLUR_SIGMA: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedactMode {
    /// Solid rectangle
    #[default]
    Fill,
    /// Gaussian blur of the region
    Blur,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RedactStyle {
    pub mode: RedactMode,
    /// `#rgb` or `#rrggbb`, used by fill mode
    pub color: String,
    pub blur_sigma: f32,
    /// Pixels added around each token box
    pub padding: u32,
}

impl Default for RedactStyle {
    fn default() -> Self {
        Self {
            mode: RedactMode::Fill,
            color: DEFAULT_COLOR.to_string(),
            blur_sigma: DEFAULT_BLUR_SIGMA,
            padding: DEFAULT_PADDING,
        }
    }
}

impl RedactStyle {
    pub fn fill_color(&self) -> Result<Rgba<u8>, RenderError> {
        parse_hex_color(&self.color)
    }

    /// `blur_sigma` clamped to `0.1..=MAX_BLUR_SIGMA`; non-finite values use the default.
    pub fn effective_blur_sigma(&self) -> f32 {
        if self.blur_sigma.is_finite() {
            self.blur_sigma.clamp(MIN_BLUR_SIGMA, MAX_BLUR_SIGMA)
        } else {
            DEFAULT_BLUR_SIGMA
        }
    }
}

/// Parses `#rgb` / `#rrggbb` (leading `#` optional) into an opaque color.
pub fn parse_hex_color(input: &str) -> Result<Rgba<u8>, RenderError> {
    let hex = input.trim().trim_start_matches('#');
    let invalid = || RenderError::InvalidColor(input.to_string());

    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());

    match hex.len() {
        3 => {
            let mut rgb = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = channel(&c.to_string())?;
                rgb[i] = v * 17;
            }
            Ok(Rgba([rgb[0], rgb[1], rgb[2], 255]))
        }
        6 => Ok(Rgba([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            255,
        ])),
        _ => Err(invalid()),
    }
}
