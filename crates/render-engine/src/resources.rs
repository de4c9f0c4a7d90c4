//! Loading and validating the external resources a scene references.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use resvg::usvg::fontdb;

use asipuc_common::paths::path_from_url;

use crate::error::RasterError;

/// What a resource URL is used for in the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SourceKind {
    Image,
    Font,
}

/// Fetches raw bytes behind a resource URL.
#[async_trait]
pub trait ResourceLoader: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, RasterError>;
}

/// Loader for `file://` URLs, plain paths and base64 `data:` URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileResourceLoader;

#[async_trait]
impl ResourceLoader for FileResourceLoader {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, RasterError> {
        if url.starts_with("data:") {
            return decode_data_url(url);
        }
        let path = path_from_url(url)
            .ok_or_else(|| RasterError::resource(url, "unsupported URL scheme"))?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| RasterError::resource(url, e))
    }
}

/// Payload of a `data:[<mime>][;base64],<data>` URL.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, RasterError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| RasterError::resource(url, "not a data URL"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| RasterError::resource(url, "data URL has no payload"))?;
    if meta.ends_with(";base64") {
        STANDARD
            .decode(payload.trim())
            .map_err(|e| RasterError::resource(url, e))
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}

/// A fetched and validated resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadedResource {
    Image { mime: &'static str, bytes: Vec<u8> },
    Font { bytes: Vec<u8> },
}

impl LoadedResource {
    /// Inline `data:` URL for embedding the resource in a document.
    pub fn data_uri(&self) -> String {
        let (mime, bytes) = match self {
            LoadedResource::Image { mime, bytes } => (*mime, bytes),
            LoadedResource::Font { bytes } => ("font/ttf", bytes),
        };
        format!("data:{mime};base64,{}", STANDARD.encode(bytes))
    }
}

/// Validate fetched bytes for their use in the scene.
pub fn decode(kind: SourceKind, url: &str, bytes: Vec<u8>) -> Result<LoadedResource, RasterError> {
    match kind {
        SourceKind::Image => decode_image(url, bytes),
        SourceKind::Font => validate_font(url, bytes),
    }
}

/// Decode image bytes, keeping PNG, JPEG and SVG as-is and re-encoding
/// anything else to PNG.
pub fn decode_image(url: &str, bytes: Vec<u8>) -> Result<LoadedResource, RasterError> {
    if looks_like_svg(&bytes) {
        return Ok(LoadedResource::Image {
            mime: "image/svg+xml",
            bytes,
        });
    }

    let format = image::guess_format(&bytes).map_err(|e| RasterError::resource(url, e))?;
    let decoded = image::load_from_memory_with_format(&bytes, format)
        .map_err(|e| RasterError::resource(url, e))?;
    match format {
        image::ImageFormat::Png => Ok(LoadedResource::Image {
            mime: "image/png",
            bytes,
        }),
        image::ImageFormat::Jpeg => Ok(LoadedResource::Image {
            mime: "image/jpeg",
            bytes,
        }),
        other => {
            tracing::debug!(url, format = ?other, "Re-encoding image as PNG");
            let mut png = Cursor::new(Vec::new());
            decoded
                .write_to(&mut png, image::ImageFormat::Png)
                .map_err(|e| RasterError::resource(url, e))?;
            Ok(LoadedResource::Image {
                mime: "image/png",
                bytes: png.into_inner(),
            })
        }
    }
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let head = String::from_utf8_lossy(head);
    let head = head.trim_start_matches('\u{feff}').trim_start();
    (head.starts_with("<?xml") || head.starts_with("<svg") || head.starts_with("<!--"))
        && head.contains("<svg")
}

/// Check that the bytes hold at least one parseable font face.
pub fn validate_font(url: &str, bytes: Vec<u8>) -> Result<LoadedResource, RasterError> {
    let mut db = fontdb::Database::new();
    db.load_font_data(bytes.clone());
    if db.len() == 0 {
        return Err(RasterError::resource(url, "no usable font face"));
    }
    Ok(LoadedResource::Font { bytes })
}

/// Resources resolved for one staged scene, keyed by URL.
#[derive(Debug, Clone, Default)]
pub struct ResourceSet {
    entries: BTreeMap<String, Arc<LoadedResource>>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, resource: Arc<LoadedResource>) {
        self.entries.insert(url.into(), resource);
    }

    pub fn get(&self, url: &str) -> Option<&LoadedResource> {
        self.entries.get(url).map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw bytes of every font resource.
    pub fn fonts(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.entries.values().filter_map(|r| match r.as_ref() {
            LoadedResource::Font { bytes } => Some(bytes.as_slice()),
            LoadedResource::Image { .. } => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_data_url_base64() {
        let bytes = decode_data_url("data:text/plain;base64,aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
        assert!(decode_data_url("data:text/plain").is_err());
    }

    #[test]
    fn test_png_is_kept_verbatim() {
        let png = tiny_png();
        let loaded = decode_image("file:///a.png", png.clone()).unwrap();
        assert_eq!(
            loaded,
            LoadedResource::Image {
                mime: "image/png",
                bytes: png
            }
        );
    }

    #[test]
    fn test_other_formats_are_reencoded_as_png() {
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([0, 0, 255]));
        let mut bmp = Cursor::new(Vec::new());
        img.write_to(&mut bmp, image::ImageFormat::Bmp).unwrap();

        let loaded = decode_image("file:///a.bmp", bmp.into_inner()).unwrap();
        let LoadedResource::Image { mime, bytes } = loaded else {
            panic!("expected image");
        };
        assert_eq!(mime, "image/png");
        assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Png);
    }

    #[test]
    fn test_svg_is_detected() {
        let svg = br#"<?xml version="1.0"?><svg xmlns="http://www.w3.org/2000/svg"/>"#.to_vec();
        let loaded = decode_image("file:///logo.svg", svg).unwrap();
        assert!(matches!(loaded, LoadedResource::Image { mime: "image/svg+xml", .. }));
    }

    #[test]
    fn test_garbage_fails_naming_the_url() {
        let err = decode_image("file:///broken.png", b"not an image".to_vec()).unwrap_err();
        assert!(err.to_string().contains("file:///broken.png"));
        assert!(validate_font("file:///x.ttf", b"nope".to_vec()).is_err());
    }

    #[tokio::test]
    async fn test_file_loader_reads_paths_and_urls() {
        let dir = std::env::temp_dir().join("asipuc_test_loader");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pixel.png");
        std::fs::write(&path, tiny_png()).unwrap();

        let loader = FileResourceLoader;
        let via_url = loader
            .fetch(&asipuc_common::paths::file_url(&path))
            .await
            .unwrap();
        let via_path = loader.fetch(path.to_str().unwrap()).await.unwrap();
        assert_eq!(via_url, via_path);
        assert!(loader.fetch("https://example.com/x.png").await.is_err());
        assert!(loader.fetch("file:///definitely/missing.png").await.is_err());

        std::fs::remove_dir_all(&dir).ok();
    }
}
