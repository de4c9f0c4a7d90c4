//! Export resolution, format and quality.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::theme::Color;

/// Output pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const HD: Resolution = Resolution::preset(1280, 720);
    pub const FULL_HD: Resolution = Resolution::preset(1920, 1080);
    pub const QHD: Resolution = Resolution::preset(2560, 1440);
    pub const UHD_4K: Resolution = Resolution::preset(3840, 2160);

    /// Height every theme metric is expressed against.
    pub const REFERENCE_HEIGHT: u32 = 1080;

    const fn preset(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn new(width: u32, height: u32) -> Result<Self, ModelError> {
        if width == 0 || height == 0 {
            return Err(ModelError::validation(format!(
                "resolution must be non-zero, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    /// Factor applied to 1080p theme metrics.
    pub fn scale(&self) -> f32 {
        self.height as f32 / Self::REFERENCE_HEIGHT as f32
    }

    /// Built-in presets with their labels.
    pub fn presets() -> [(&'static str, Resolution); 4] {
        [
            ("hd", Self::HD),
            ("full-hd", Self::FULL_HD),
            ("qhd", Self::QHD),
            ("4k", Self::UHD_4K),
        ]
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::FULL_HD
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = ModelError;

    /// Accepts a preset name (`hd`, `full-hd`, `qhd`, `4k`) or `WIDTHxHEIGHT`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if let Some((_, preset)) = Self::presets().into_iter().find(|(name, _)| *name == lower) {
            return Ok(preset);
        }
        let (w, h) = lower
            .split_once('x')
            .ok_or_else(|| ModelError::unknown("resolution", s))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|_| ModelError::unknown("resolution", s))
        };
        Self::new(parse(w)?, parse(h)?)
    }
}

/// Encoded image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        })
    }
}

impl FromStr for ImageFormat {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            _ => Err(ModelError::unknown("image format", s)),
        }
    }
}

/// Lossy quality factor in `[0.1, 1.0]`; ignored for PNG.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f32", into = "f32")]
pub struct ImageQuality(f32);

impl ImageQuality {
    pub const LOW: ImageQuality = ImageQuality(0.7);
    pub const MEDIUM: ImageQuality = ImageQuality(0.85);
    pub const HIGH: ImageQuality = ImageQuality(0.95);
    pub const MAXIMUM: ImageQuality = ImageQuality(1.0);

    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self::HIGH;
        }
        Self(value.clamp(0.1, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Quality on the 1–100 scale used by JPEG encoders.
    pub fn percent(self) -> u8 {
        (self.0 * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

impl Default for ImageQuality {
    fn default() -> Self {
        Self::HIGH
    }
}

impl From<f32> for ImageQuality {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

impl From<ImageQuality> for f32 {
    fn from(q: ImageQuality) -> Self {
        q.0
    }
}

/// Parameters for one rasterization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    pub resolution: Resolution,
    pub format: ImageFormat,
    pub quality: ImageQuality,
    /// Colour filled before the slide is painted.
    pub background: Color,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            resolution: Resolution::FULL_HD,
            format: ImageFormat::Png,
            quality: ImageQuality::HIGH,
            background: Color::BLACK,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_presets_and_parsing() {
        assert_eq!(Resolution::default(), Resolution::FULL_HD);
        assert_eq!("4k".parse::<Resolution>().unwrap(), Resolution::UHD_4K);
        assert_eq!(
            "1024x768".parse::<Resolution>().unwrap(),
            Resolution { width: 1024, height: 768 }
        );
        assert!("0x768".parse::<Resolution>().is_err());
        assert!("big".parse::<Resolution>().is_err());
        assert!((Resolution::UHD_4K.scale() - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_format_extensions() {
        assert_eq!(ImageFormat::Png.extension(), "png");
        assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
        assert_eq!("JPG".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert!("gif".parse::<ImageFormat>().is_err());
    }

    #[test]
    fn test_quality_clamps() {
        assert_eq!(ImageQuality::new(3.0).value(), 1.0);
        assert_eq!(ImageQuality::new(0.0).value(), 0.1);
        assert_eq!(ImageQuality::new(f32::NAN), ImageQuality::HIGH);
        assert_eq!(ImageQuality::HIGH.percent(), 95);
        let parsed: ImageQuality = serde_json::from_str("7.5").unwrap();
        assert_eq!(parsed, ImageQuality::MAXIMUM);
    }
}
