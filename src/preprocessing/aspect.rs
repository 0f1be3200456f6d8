//! Aspect ratio presets offered by the crop tool and parsing of ratio text.

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref RATIO_PAIR: Regex = Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*[:/xX]\s*(\d+(?:\.\d+)?)\s*$")
        .expect("Aspect ratio pair pattern should be valid");
    static ref RATIO_DECIMAL: Regex =
        Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*$").expect("Aspect ratio decimal pattern should be valid");
}

/// Width-to-height constraint applied to a crop region.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AspectPreset {
    /// No constraint ("Original" in the crop dialog)
    #[default]
    Free,
    Square,
    FourThree,
    SixteenNine,
    TwoThree,
    Custom(f64),
}

impl AspectPreset {
    /// Presets shown as buttons in the crop dialog, in display order.
    pub fn all_named() -> [AspectPreset; 5] {
        [
            AspectPreset::Free,
            AspectPreset::Square,
            AspectPreset::FourThree,
            AspectPreset::SixteenNine,
            AspectPreset::TwoThree,
        ]
    }

    pub fn ratio(&self) -> Option<f64> {
        match self {
            AspectPreset::Free => None,
            AspectPreset::Square => Some(1.0),
            AspectPreset::FourThree => Some(4.0 / 3.0),
            AspectPreset::SixteenNine => Some(16.0 / 9.0),
            AspectPreset::TwoThree => Some(2.0 / 3.0),
            AspectPreset::Custom(ratio) => Some(*ratio),
        }
    }

    pub fn label(&self) -> String {
        match self {
            AspectPreset::Free => "Original".to_string(),
            AspectPreset::Square => "1:1".to_string(),
            AspectPreset::FourThree => "4:3".to_string(),
            AspectPreset::SixteenNine => "16:9".to_string(),
            AspectPreset::TwoThree => "2:3".to_string(),
            AspectPreset::Custom(ratio) => format!("{:.3}", ratio),
        }
    }

    /// Maps a ratio to its named preset when one matches exactly.
    fn from_ratio(ratio: f64) -> Self {
        Self::all_named()
            .into_iter()
            .find(|preset| preset.ratio().is_some_and(|r| (r - ratio).abs() < 1e-12))
            .unwrap_or(AspectPreset::Custom(ratio))
    }
}

impl fmt::Display for AspectPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl FromStr for AspectPreset {
    type Err = String;

    /// Accepts `free`/`original`/`none`, `W:H` (also `W/H`, `WxH`) or a bare decimal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        if matches!(lowered.as_str(), "free" | "original" | "none") {
            return Ok(AspectPreset::Free);
        }

        let ratio = if let Some(caps) = RATIO_PAIR.captures(&lowered) {
            let w: f64 = caps[1]
                .parse()
                .map_err(|_| format!("Invalid aspect ratio width in '{}'", s))?;
            let h: f64 = caps[2]
                .parse()
                .map_err(|_| format!("Invalid aspect ratio height in '{}'", s))?;
            if w <= 0.0 || h <= 0.0 {
                return Err(format!("Aspect ratio sides must be positive: '{}'", s));
            }
            w / h
        } else if let Some(caps) = RATIO_DECIMAL.captures(&lowered) {
            caps[1]
                .parse()
                .map_err(|_| format!("Invalid aspect ratio '{}'", s))?
        } else {
            return Err(format!(
                "Invalid aspect ratio '{}'. Expected 'free', 'W:H' or a positive number",
                s
            ));
        };

        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(format!("Aspect ratio must be positive: '{}'", s));
        }

        Ok(Self::from_ratio(ratio))
    }
}
