//! Slide themes: colours, fonts, sizes, logos and hashtag.
//!
//! Sizes are expressed for a 1080-pixel-high slide; templates scale them to
//! the export resolution.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// RGBA colour with 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Colour with alpha given as a fraction in `[0, 1]`.
    pub fn with_opacity(self, opacity: f32) -> Self {
        Self {
            a: (opacity.clamp(0.0, 1.0) * 255.0).round() as u8,
            ..self
        }
    }

    /// `#rrggbb` hex form, ignoring alpha.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Alpha as a fraction.
    pub fn opacity(self) -> f32 {
        f32::from(self.a) / 255.0
    }

    pub fn is_opaque(self) -> bool {
        self.a == 255
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_opaque() {
            f.write_str(&self.to_hex())
        } else {
            write!(
                f,
                "rgba({}, {}, {}, {})",
                self.r,
                self.g,
                self.b,
                (self.opacity() * 1000.0).round() / 1000.0
            )
        }
    }
}

impl FromStr for Color {
    type Err = ModelError;

    /// Accepts `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)`,
    /// `rgba(r, g, b, a)` and `transparent`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bad = || ModelError::unknown("color", s);

        if s.eq_ignore_ascii_case("transparent") {
            return Ok(Color::TRANSPARENT);
        }

        if let Some(hex) = s.strip_prefix('#') {
            if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(bad());
            }
            let channel = |i: usize, len: usize| {
                u8::from_str_radix(&hex[i..i + len], 16).map_err(|_| bad())
            };
            return match hex.len() {
                3 => Ok(Color::rgb(
                    channel(0, 1)? * 17,
                    channel(1, 1)? * 17,
                    channel(2, 1)? * 17,
                )),
                6 => Ok(Color::rgb(channel(0, 2)?, channel(2, 2)?, channel(4, 2)?)),
                8 => Ok(Color::rgba(
                    channel(0, 2)?,
                    channel(2, 2)?,
                    channel(4, 2)?,
                    channel(6, 2)?,
                )),
                _ => Err(bad()),
            };
        }

        let lower = s.to_ascii_lowercase();
        let body = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(bad)?;
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        if parts.len() != 3 && parts.len() != 4 {
            return Err(bad());
        }
        let channel = |p: &str| p.parse::<u8>().map_err(|_| bad());
        let color = Color::rgb(channel(parts[0])?, channel(parts[1])?, channel(parts[2])?);
        match parts.get(3) {
            Some(alpha) => {
                let alpha: f32 = alpha.parse().map_err(|_| bad())?;
                Ok(color.with_opacity(alpha))
            }
            None => Ok(color),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// Slide colours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeColors {
    pub slide_background: Color,
    pub slide_text: Color,
    pub slide_border: Color,
    /// Veil drawn over a background image.
    pub slide_overlay: Color,
    /// Colour of text drop shadows.
    pub text_shadow: Color,
    /// Secondary highlight used by accented templates.
    pub accent: Color,
    /// Hashtag colour; falls back to `slide_text`.
    #[serde(default)]
    pub hashtag: Option<Color>,
}

/// Font family lists in CSS order of preference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeFonts {
    pub primary: String,
    pub secondary: String,
}

/// Font sizes in pixels at 1080p.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThemeSizes {
    pub title: f32,
    pub label: f32,
    pub number: f32,
    pub total: f32,
    pub hashtag: f32,
}

/// Layout metrics in pixels at 1080p.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThemeSpacing {
    pub padding: f32,
    /// Grid width as a fraction of the slide width.
    pub grid_width: f32,
    pub header_gap: f32,
    pub cell_padding_x: f32,
    pub cell_padding_y: f32,
}

/// Stroke widths and shadow switches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThemeEffects {
    pub border_width: f32,
    pub grid_border_width: f32,
    pub text_shadow: bool,
    pub title_letter_spacing: f32,
}

/// Placement of one logo slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogoConfig {
    pub enabled: bool,
    pub url: Option<String>,
    /// Width in pixels at 1080p; height follows the image aspect ratio.
    pub size: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub opacity: f32,
}

impl LogoConfig {
    fn slot(size: f32) -> Self {
        Self {
            enabled: false,
            url: None,
            size,
            offset_x: 40.0,
            offset_y: 40.0,
            opacity: 1.0,
        }
    }

    /// URL to draw, when the slot is enabled and filled.
    pub fn visible_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|_| self.enabled)
    }
}

/// The three logo slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeLogos {
    /// Top left.
    pub main: LogoConfig,
    /// Top right.
    pub secondary: LogoConfig,
    /// Bottom right.
    pub watermark: LogoConfig,
}

impl Default for ThemeLogos {
    fn default() -> Self {
        Self {
            main: LogoConfig::slot(150.0),
            secondary: LogoConfig::slot(150.0),
            watermark: LogoConfig::slot(180.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HashtagPosition {
    TopLeft,
    #[default]
    TopRight,
    TopCenter,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HashtagConfig {
    pub enabled: bool,
    pub text: String,
    pub position: HashtagPosition,
}

impl HashtagConfig {
    /// Text to draw, when enabled and non-empty.
    pub fn visible_text(&self) -> Option<&str> {
        Some(self.text.as_str()).filter(|t| self.enabled && !t.trim().is_empty())
    }
}

/// Visual configuration for a slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    /// Heading printed above the counts.
    pub title: String,
    pub colors: ThemeColors,
    pub fonts: ThemeFonts,
    pub sizes: ThemeSizes,
    pub spacing: ThemeSpacing,
    pub effects: ThemeEffects,
    /// Full-bleed background image URL.
    #[serde(default)]
    pub background_image: Option<String>,
    #[serde(default)]
    pub logos: ThemeLogos,
    #[serde(default)]
    pub hashtag: HashtagConfig,
    /// Font files (URLs) made available to the rasterizer.
    #[serde(default)]
    pub font_sources: Vec<String>,
}

type ThemeCtor = fn() -> Theme;

const PRESETS: &[(&str, ThemeCtor)] = &[
    ("modern", Theme::modern),
    ("dark", Theme::dark),
    ("light", Theme::light),
];

impl Default for Theme {
    fn default() -> Self {
        Self::modern()
    }
}

impl Theme {
    /// High-contrast theme with condensed display type.
    pub fn modern() -> Self {
        let white = Color::rgb(0xfb, 0xfc, 0xfc);
        Self {
            name: "modern".into(),
            title: "ATTENDANCE".into(),
            colors: ThemeColors {
                slide_background: Color::BLACK,
                slide_text: white,
                slide_border: white,
                slide_overlay: Color::rgba(0, 0, 0, 153),
                text_shadow: Color::rgba(0, 0, 0, 204),
                accent: Color::rgb(0xf6, 0x8d, 0x13),
                hashtag: None,
            },
            fonts: ThemeFonts {
                primary: "Bebas Neue, Impact, sans-serif".into(),
                secondary: "Roboto, Arial, sans-serif".into(),
            },
            sizes: ThemeSizes {
                title: 120.0,
                label: 54.0,
                number: 60.0,
                total: 120.0,
                hashtag: 36.0,
            },
            spacing: ThemeSpacing {
                padding: 60.0,
                grid_width: 0.85,
                header_gap: 60.0,
                cell_padding_x: 40.0,
                cell_padding_y: 20.0,
            },
            effects: ThemeEffects {
                border_width: 4.0,
                grid_border_width: 3.0,
                text_shadow: true,
                title_letter_spacing: 4.0,
            },
            background_image: None,
            logos: ThemeLogos::default(),
            hashtag: HashtagConfig::default(),
            font_sources: Vec::new(),
        }
    }

    /// Serif variant on black.
    pub fn dark() -> Self {
        Self {
            name: "dark".into(),
            colors: ThemeColors {
                slide_background: Color::BLACK,
                slide_text: Color::WHITE,
                slide_border: Color::WHITE,
                slide_overlay: Color::rgba(0, 0, 0, 128),
                text_shadow: Color::rgb(0x33, 0x33, 0x33),
                accent: Color::rgb(0x02, 0x48, 0xc1),
                hashtag: None,
            },
            fonts: ThemeFonts {
                primary: "Times New Roman, serif".into(),
                secondary: "Arial, sans-serif".into(),
            },
            spacing: ThemeSpacing {
                padding: 50.0,
                grid_width: 0.90,
                header_gap: 50.0,
                cell_padding_x: 35.0,
                cell_padding_y: 18.0,
            },
            effects: ThemeEffects {
                border_width: 3.0,
                grid_border_width: 2.0,
                text_shadow: true,
                title_letter_spacing: 2.0,
            },
            ..Self::modern()
        }
    }

    /// Black on white.
    pub fn light() -> Self {
        Self {
            name: "light".into(),
            colors: ThemeColors {
                slide_background: Color::WHITE,
                slide_text: Color::BLACK,
                slide_border: Color::BLACK,
                slide_overlay: Color::rgba(255, 255, 255, 128),
                text_shadow: Color::rgb(0xcc, 0xcc, 0xcc),
                accent: Color::rgb(0x02, 0x48, 0xc1),
                hashtag: None,
            },
            ..Self::dark()
        }
    }

    /// Names of the built-in presets.
    pub fn preset_names() -> impl Iterator<Item = &'static str> {
        PRESETS.iter().map(|(name, _)| *name)
    }

    /// Look up a preset by name.
    pub fn preset(name: &str) -> Option<Theme> {
        PRESETS
            .iter()
            .find(|(preset, _)| preset.eq_ignore_ascii_case(name.trim()))
            .map(|(_, ctor)| ctor())
    }

    /// Preset by name, falling back to `modern` for unknown names.
    pub fn preset_or_default(name: &str) -> Theme {
        Self::preset(name).unwrap_or_else(|| {
            tracing::warn!(theme = name, "Unknown theme preset, using modern");
            Self::modern()
        })
    }

    /// Load a theme from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ModelError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| ModelError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Colour used for the hashtag.
    pub fn hashtag_color(&self) -> Color {
        self.colors.hashtag.unwrap_or(self.colors.slide_text)
    }

    /// Every external resource the theme references.
    pub fn resource_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = self.background_image.iter().map(String::as_str).collect();
        for logo in [&self.logos.main, &self.logos.secondary, &self.logos.watermark] {
            urls.extend(logo.visible_url());
        }
        urls.extend(self.font_sources.iter().map(String::as_str));
        urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parsing() {
        assert_eq!("#000000".parse::<Color>().unwrap(), Color::BLACK);
        assert_eq!("#fff".parse::<Color>().unwrap(), Color::WHITE);
        assert_eq!(
            "#d4af37".parse::<Color>().unwrap(),
            Color::rgb(0xd4, 0xaf, 0x37)
        );
        assert_eq!(
            "rgba(0, 0, 0, 0.6)".parse::<Color>().unwrap(),
            Color::rgba(0, 0, 0, 153)
        );
        assert_eq!(
            "rgb(10,20,30)".parse::<Color>().unwrap(),
            Color::rgb(10, 20, 30)
        );
        assert_eq!("transparent".parse::<Color>().unwrap().a, 0);
        assert!("#12345".parse::<Color>().is_err());
        assert!("rgba(1,2)".parse::<Color>().is_err());
        assert!("blue".parse::<Color>().is_err());
    }

    #[test]
    fn test_color_display() {
        assert_eq!(Color::rgb(0xfb, 0xfc, 0xfc).to_string(), "#fbfcfc");
        assert_eq!(Color::rgba(0, 0, 0, 153).to_string(), "rgba(0, 0, 0, 0.6)");
    }

    #[test]
    fn test_theme_serde_roundtrip() {
        let mut theme = Theme::modern();
        theme.hashtag = HashtagConfig {
            enabled: true,
            text: "#Sunday".into(),
            position: HashtagPosition::TopCenter,
        };
        let json = serde_json::to_string(&theme).unwrap();
        assert!(json.contains("\"top-center\""));
        let parsed: Theme = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, theme);
    }

    #[test]
    fn test_preset_lookup() {
        assert_eq!(Theme::preset("dark").unwrap().name, "dark");
        assert_eq!(Theme::preset("LIGHT").unwrap().colors.slide_background, Color::WHITE);
        assert!(Theme::preset("neon").is_none());
        assert_eq!(Theme::preset_or_default("neon").name, "modern");
        assert_eq!(Theme::preset_names().count(), 3);
    }

    #[test]
    fn test_resource_urls_only_include_visible_logos() {
        let mut theme = Theme::modern();
        theme.background_image = Some("file:///bg.png".into());
        theme.logos.main.url = Some("file:///logo.png".into());
        assert_eq!(theme.resource_urls(), vec!["file:///bg.png"]);

        theme.logos.main.enabled = true;
        assert_eq!(
            theme.resource_urls(),
            vec!["file:///bg.png", "file:///logo.png"]
        );
    }
}
