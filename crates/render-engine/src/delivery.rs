//! Handing captured images to the user.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use asipuc_common::error::{AsipucError, AsipucResult};

use crate::raster::CapturedImage;

/// Where a delivered image ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveredFile {
    Path(PathBuf),
    /// Kept in memory under this name.
    Memory(String),
}

impl std::fmt::Display for DeliveredFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveredFile::Path(path) => write!(f, "{}", path.display()),
            DeliveredFile::Memory(name) => write!(f, "memory:{name}"),
        }
    }
}

/// Destination for exported images.
#[async_trait]
pub trait FileDelivery: Send + Sync {
    async fn deliver(&self, image: &CapturedImage, filename: &str) -> AsipucResult<DeliveredFile>;
}

/// Writes images into a directory.
#[derive(Debug, Clone)]
pub struct DirectoryDelivery {
    dir: PathBuf,
}

impl DirectoryDelivery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }
}

#[async_trait]
impl FileDelivery for DirectoryDelivery {
    async fn deliver(&self, image: &CapturedImage, filename: &str) -> AsipucResult<DeliveredFile> {
        let name = sanitize_filename(filename);
        if name.is_empty() {
            return Err(AsipucError::validation(format!(
                "invalid export filename: {filename:?}"
            )));
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(&name);
        tokio::fs::write(&path, &image.bytes).await?;
        tracing::info!(path = %path.display(), bytes = image.bytes.len(), "Wrote export");
        Ok(DeliveredFile::Path(path))
    }
}

/// Keeps delivered images in memory.
#[derive(Debug, Default)]
pub struct MemoryDelivery {
    files: Mutex<Vec<(String, CapturedImage)>>,
}

impl MemoryDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivered `(filename, image)` pairs in delivery order.
    pub fn files(&self) -> Vec<(String, CapturedImage)> {
        self.lock().clone()
    }

    pub fn filenames(&self) -> Vec<String> {
        self.lock().iter().map(|(name, _)| name.clone()).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, CapturedImage)>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl FileDelivery for MemoryDelivery {
    async fn deliver(&self, image: &CapturedImage, filename: &str) -> AsipucResult<DeliveredFile> {
        self.lock().push((filename.to_string(), image.clone()));
        Ok(DeliveredFile::Memory(filename.to_string()))
    }
}

/// Strip path separators and control characters from a filename.
pub fn sanitize_filename(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    cleaned.trim_matches(|c: char| c == '.' || c.is_whitespace()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use asipuc_model::settings::ImageFormat;

    fn image() -> CapturedImage {
        CapturedImage {
            width: 1,
            height: 1,
            format: ImageFormat::Png,
            bytes: vec![9, 9],
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("2024-03-10-Morning.png"), "2024-03-10-Morning.png");
        assert_eq!(sanitize_filename("../etc/passwd"), "_etc_passwd");
        assert_eq!(sanitize_filename("a:b?.png"), "a_b_.png");
        assert_eq!(sanitize_filename(".."), "");
    }

    #[tokio::test]
    async fn test_directory_delivery_creates_dir() {
        let dir = std::env::temp_dir().join("asipuc_test_delivery");
        let _ = std::fs::remove_dir_all(&dir);
        let delivery = DirectoryDelivery::new(dir.join("out"));

        let delivered = delivery.deliver(&image(), "slide.png").await.unwrap();
        let DeliveredFile::Path(path) = delivered else {
            panic!("expected a path");
        };
        assert_eq!(std::fs::read(&path).unwrap(), vec![9, 9]);
        assert!(delivery.deliver(&image(), "..").await.is_err());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_memory_delivery_keeps_order() {
        let delivery = MemoryDelivery::new();
        delivery.deliver(&image(), "a.png").await.unwrap();
        delivery.deliver(&image(), "b.png").await.unwrap();
        assert_eq!(delivery.filenames(), vec!["a.png", "b.png"]);
    }
}
