//! Rasterizer backends.

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use resvg::tiny_skia;
use resvg::usvg::{fontdb, Options, Tree};

use asipuc_model::settings::{ExportSettings, ImageFormat, ImageQuality};
use asipuc_model::theme::Color;

use crate::error::RasterError;
use crate::resources::ResourceSet;
use crate::svg::to_svg;
use crate::tree::VisualTree;

/// A staged tree whose resources are all resolved and which has painted.
#[derive(Debug, Clone)]
pub struct PreparedScene {
    pub container: String,
    pub tree: VisualTree,
    pub resources: ResourceSet,
}

/// Output parameters for one rasterization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterOptions {
    pub width: u32,
    pub height: u32,
    /// Device pixels per tree pixel. Captures always use 1.
    pub pixel_ratio: f32,
    pub background: Color,
    pub format: ImageFormat,
    pub quality: ImageQuality,
}

impl RasterOptions {
    pub fn from_settings(settings: &ExportSettings) -> Self {
        Self {
            width: settings.resolution.width,
            height: settings.resolution.height,
            pixel_ratio: 1.0,
            background: settings.background,
            format: settings.format,
            quality: settings.quality,
        }
    }
}

/// An encoded raster image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

impl CapturedImage {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// `data:` URL carrying the encoded bytes.
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type(),
            STANDARD.encode(&self.bytes)
        )
    }
}

/// Trait for rasterizer backends.
pub trait Rasterizer: Send + Sync {
    /// Produce an image of exactly `options.width × options.height` pixels.
    fn rasterize(
        &self,
        scene: &PreparedScene,
        options: &RasterOptions,
    ) -> Result<CapturedImage, RasterError>;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Font sources available to the rasterizer beyond those a scene carries.
#[derive(Debug, Clone, Default)]
pub struct FontConfig {
    pub system_fonts: bool,
    pub font_dirs: Vec<PathBuf>,
}

/// Rasterizer built on usvg/resvg/tiny-skia.
pub struct ResvgRasterizer {
    fonts: Arc<fontdb::Database>,
}

impl ResvgRasterizer {
    pub fn new(config: &FontConfig) -> Self {
        let mut db = fontdb::Database::new();
        if config.system_fonts {
            db.load_system_fonts();
        }
        for dir in &config.font_dirs {
            db.load_fonts_dir(dir);
        }
        tracing::debug!(faces = db.len(), "Loaded font database");
        Self {
            fonts: Arc::new(db),
        }
    }

    fn font_database(&self, resources: &ResourceSet) -> Arc<fontdb::Database> {
        let mut fonts = resources.fonts().peekable();
        if fonts.peek().is_none() {
            return Arc::clone(&self.fonts);
        }
        let mut db = fontdb::Database::clone(&self.fonts);
        for bytes in fonts {
            db.load_font_data(bytes.to_vec());
        }
        Arc::new(db)
    }
}

impl Rasterizer for ResvgRasterizer {
    fn rasterize(
        &self,
        scene: &PreparedScene,
        options: &RasterOptions,
    ) -> Result<CapturedImage, RasterError> {
        if options.width == 0 || options.height == 0 || options.pixel_ratio.is_nan() || options.pixel_ratio <= 0.0 {
            return Err(RasterError::InvalidSize {
                width: options.width,
                height: options.height,
            });
        }

        let svg = to_svg(&scene.tree, &scene.resources)?;
        let mut usvg_options = Options::default();
        usvg_options.fontdb = self.font_database(&scene.resources);
        let tree = Tree::from_str(&svg, &usvg_options).map_err(|e| RasterError::Parse(e.to_string()))?;

        let size = tree.size().to_int_size();
        if size.width() != options.width || size.height() != options.height {
            return Err(RasterError::SizeMismatch {
                expected_w: options.width,
                expected_h: options.height,
                actual_w: size.width(),
                actual_h: size.height(),
            });
        }

        let pixel_w = (options.width as f32 * options.pixel_ratio).round() as u32;
        let pixel_h = (options.height as f32 * options.pixel_ratio).round() as u32;
        let mut pixmap = tiny_skia::Pixmap::new(pixel_w, pixel_h).ok_or(RasterError::InvalidSize {
            width: pixel_w,
            height: pixel_h,
        })?;
        let bg = options.background;
        pixmap.fill(tiny_skia::Color::from_rgba8(bg.r, bg.g, bg.b, bg.a));
        resvg::render(
            &tree,
            tiny_skia::Transform::from_scale(options.pixel_ratio, options.pixel_ratio),
            &mut pixmap.as_mut(),
        );

        let bytes = match options.format {
            ImageFormat::Png => pixmap
                .encode_png()
                .map_err(|e| RasterError::Encode(e.to_string()))?,
            ImageFormat::Jpeg => encode_jpeg(&pixmap, options.quality)?,
        };

        tracing::debug!(
            container = %scene.container,
            width = pixel_w,
            height = pixel_h,
            format = ?options.format,
            bytes = bytes.len(),
            "Rasterized scene"
        );
        Ok(CapturedImage {
            width: pixel_w,
            height: pixel_h,
            format: options.format,
            bytes,
        })
    }

    fn name(&self) -> &str {
        "resvg"
    }
}

fn encode_jpeg(pixmap: &tiny_skia::Pixmap, quality: ImageQuality) -> Result<Vec<u8>, RasterError> {
    let rgb: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|px| {
            let c = px.demultiply();
            [c.red(), c.green(), c.blue()]
        })
        .collect();
    let image = image::RgbImage::from_raw(pixmap.width(), pixmap.height(), rgb)
        .ok_or_else(|| RasterError::Encode("pixel buffer size mismatch".into()))?;

    let mut out = Cursor::new(Vec::new());
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality.percent())
        .encode_image(&image)
        .map_err(|e| RasterError::Encode(e.to_string()))?;
    Ok(out.into_inner())
}
