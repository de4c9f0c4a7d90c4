//! Fonts, backgrounds and logos available to themes.
//!
//! Resources live in two roots: read-only system assets shipped with the
//! application and user uploads. Each root has one folder per kind.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use asipuc_common::error::{AsipucError, AsipucResult};
use asipuc_common::paths::{file_url, path_from_url};

const MIB: u64 = 1024 * 1024;

/// Category of resource file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Font,
    Background,
    Logo,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Font,
        ResourceKind::Background,
        ResourceKind::Logo,
    ];

    pub fn folder(self) -> &'static str {
        match self {
            ResourceKind::Font => "fonts",
            ResourceKind::Background => "backgrounds",
            ResourceKind::Logo => "logos",
        }
    }

    /// Accepted lowercase extensions, without the dot.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            ResourceKind::Font => &["ttf", "otf", "woff", "woff2"],
            ResourceKind::Background => &["jpg", "jpeg", "png", "webp"],
            ResourceKind::Logo => &["png", "svg", "jpg", "jpeg", "webp"],
        }
    }

    /// Upload size limit in bytes.
    pub fn max_bytes(self) -> u64 {
        match self {
            ResourceKind::Font => 10 * MIB,
            ResourceKind::Background => 10 * MIB,
            ResourceKind::Logo => 5 * MIB,
        }
    }

    fn accepts(self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions().contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.folder())
    }
}

impl FromStr for ResourceKind {
    type Err = AsipucError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "font" | "fonts" => Ok(ResourceKind::Font),
            "background" | "backgrounds" => Ok(ResourceKind::Background),
            "logo" | "logos" => Ok(ResourceKind::Logo),
            _ => Err(AsipucError::validation(format!("unknown resource kind: {s}"))),
        }
    }
}

/// Which root a resource came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceOrigin {
    System,
    User,
}

/// A resource file with its `file://` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceEntry {
    pub name: String,
    pub kind: ResourceKind,
    pub origin: ResourceOrigin,
    pub path: PathBuf,
    pub url: String,
}

/// System assets plus user uploads.
#[derive(Debug, Clone)]
pub struct ResourceLibrary {
    system_dir: PathBuf,
    user_dir: PathBuf,
}

impl ResourceLibrary {
    pub fn new(system_dir: impl Into<PathBuf>, user_dir: impl Into<PathBuf>) -> Self {
        Self {
            system_dir: system_dir.into(),
            user_dir: user_dir.into(),
        }
    }

    fn dir(&self, origin: ResourceOrigin, kind: ResourceKind) -> PathBuf {
        let root = match origin {
            ResourceOrigin::System => &self.system_dir,
            ResourceOrigin::User => &self.user_dir,
        };
        root.join(kind.folder())
    }

    /// Create every kind folder under both roots.
    pub fn ensure_dirs(&self) -> AsipucResult<()> {
        for origin in [ResourceOrigin::System, ResourceOrigin::User] {
            for kind in ResourceKind::ALL {
                std::fs::create_dir_all(self.dir(origin, kind))?;
            }
        }
        Ok(())
    }

    /// Resources of `kind`: system entries first, then uploads, each sorted by name.
    pub fn list_available(&self, kind: ResourceKind) -> AsipucResult<Vec<ResourceEntry>> {
        let mut entries = Vec::new();
        for origin in [ResourceOrigin::System, ResourceOrigin::User] {
            let dir = self.dir(origin, kind);
            if !dir.exists() {
                continue;
            }
            let mut found = Vec::new();
            for item in std::fs::read_dir(&dir)? {
                let path = item?.path();
                if !path.is_file() || !kind.accepts(&path) {
                    continue;
                }
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default()
                    .to_string();
                found.push(ResourceEntry {
                    url: file_url(&path),
                    name,
                    kind,
                    origin,
                    path,
                });
            }
            found.sort_by(|a, b| a.name.cmp(&b.name));
            entries.extend(found);
        }
        Ok(entries)
    }

    /// Store an upload under the user root.
    pub fn save(&self, kind: ResourceKind, name: &str, bytes: &[u8]) -> AsipucResult<ResourceEntry> {
        let file_name = sanitize_file_name(name)?;
        if !kind.accepts(Path::new(&file_name)) {
            return Err(AsipucError::validation(format!(
                "{file_name} is not an accepted {kind} file (expected one of: {})",
                kind.extensions().join(", ")
            )));
        }
        if bytes.len() as u64 > kind.max_bytes() {
            return Err(AsipucError::validation(format!(
                "{file_name} is {} bytes, the {kind} limit is {} bytes",
                bytes.len(),
                kind.max_bytes()
            )));
        }

        let dir = self.dir(ResourceOrigin::User, kind);
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(&file_name);
        std::fs::write(&path, bytes)?;
        tracing::info!(kind = %kind, path = %path.display(), bytes = bytes.len(), "Saved resource");

        Ok(ResourceEntry {
            url: file_url(&path),
            name: file_name,
            kind,
            origin: ResourceOrigin::User,
            path,
        })
    }

    /// Copy a file from disk into the user root.
    pub fn import(&self, kind: ResourceKind, source: &Path) -> AsipucResult<ResourceEntry> {
        let meta = std::fs::metadata(source).map_err(|_| AsipucError::FileNotFound {
            path: source.to_path_buf(),
        })?;
        if meta.len() > kind.max_bytes() {
            return Err(AsipucError::validation(format!(
                "{} exceeds the {kind} limit of {} bytes",
                source.display(),
                kind.max_bytes()
            )));
        }
        let bytes = std::fs::read(source)?;
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AsipucError::validation("source has no file name"))?;
        self.save(kind, name, &bytes)
    }

    /// Delete an uploaded resource by URL. System assets are read-only.
    pub fn delete(&self, url: &str) -> AsipucResult<()> {
        let path = path_from_url(url)
            .ok_or_else(|| AsipucError::validation(format!("not a local resource: {url}")))?;
        if path.starts_with(&self.system_dir) {
            return Err(AsipucError::validation(format!(
                "system resources cannot be deleted: {url}"
            )));
        }
        let in_user_root = ResourceKind::ALL
            .iter()
            .any(|&kind| path.parent() == Some(self.dir(ResourceOrigin::User, kind).as_path()));
        if !in_user_root || !path.is_file() {
            return Err(AsipucError::not_found(format!("resource {url}")));
        }
        std::fs::remove_file(&path)?;
        tracing::info!(path = %path.display(), "Deleted resource");
        Ok(())
    }

    /// Locate `file_name` of `kind`, preferring uploads over system assets.
    pub fn resolve(&self, kind: ResourceKind, file_name: &str) -> Option<ResourceEntry> {
        [ResourceOrigin::User, ResourceOrigin::System]
            .into_iter()
            .map(|origin| (origin, self.dir(origin, kind).join(file_name)))
            .find(|(_, path)| path.is_file())
            .map(|(origin, path)| ResourceEntry {
                url: file_url(&path),
                name: file_name.to_string(),
                kind,
                origin,
                path,
            })
    }
}

/// Reduce an upload name to a single safe path component.
fn sanitize_file_name(name: &str) -> AsipucResult<String> {
    let base = Path::new(name.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim().to_string();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        return Err(AsipucError::validation(format!("invalid file name: {name:?}")));
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library(tag: &str) -> (PathBuf, ResourceLibrary) {
        let dir = std::env::temp_dir().join(format!("asipuc_test_resources_{tag}"));
        let _ = std::fs::remove_dir_all(&dir);
        let lib = ResourceLibrary::new(dir.join("assets"), dir.join("uploads"));
        lib.ensure_dirs().unwrap();
        (dir, lib)
    }

    #[test]
    fn test_save_list_delete() {
        let (dir, lib) = library("cycle");
        std::fs::write(dir.join("assets/logos/church.png"), b"png").unwrap();
        std::fs::write(dir.join("assets/logos/readme.txt"), b"skip").unwrap();

        let saved = lib.save(ResourceKind::Logo, "ministry.svg", b"<svg/>").unwrap();
        assert_eq!(saved.origin, ResourceOrigin::User);
        assert!(saved.url.starts_with("file://"));

        let listed = lib.list_available(ResourceKind::Logo).unwrap();
        let names: Vec<_> = listed.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["church.png", "ministry.svg"]);
        assert_eq!(listed[0].origin, ResourceOrigin::System);

        lib.delete(&saved.url).unwrap();
        assert_eq!(lib.list_available(ResourceKind::Logo).unwrap().len(), 1);

        let err = lib.delete(&saved.url).unwrap_err();
        assert!(err.is_not_found());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_validates_extension_and_size() {
        let (dir, lib) = library("validate");
        assert!(lib.save(ResourceKind::Font, "font.exe", b"x").is_err());
        let big = vec![0u8; (5 * MIB + 1) as usize];
        assert!(lib.save(ResourceKind::Logo, "big.png", &big).is_err());
        assert!(lib.save(ResourceKind::Background, "big.png", &big).is_ok());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_strips_directories_from_names() {
        let (dir, lib) = library("sanitize");
        let saved = lib
            .save(ResourceKind::Background, "../../etc/sky?.jpg", b"jpg")
            .unwrap();
        assert_eq!(saved.name, "sky_.jpg");
        assert_eq!(saved.path.parent().unwrap(), dir.join("uploads/backgrounds"));
        assert!(sanitize_file_name("..").is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_system_resources_are_read_only() {
        let (dir, lib) = library("readonly");
        let path = dir.join("assets/fonts/Bebas.ttf");
        std::fs::write(&path, b"ttf").unwrap();
        let err = lib.delete(&file_url(&path)).unwrap_err();
        assert!(matches!(err, AsipucError::Validation { .. }));
        assert!(path.exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_resolve_prefers_uploads() {
        let (dir, lib) = library("resolve");
        std::fs::write(dir.join("assets/backgrounds/sky.jpg"), b"a").unwrap();
        assert_eq!(
            lib.resolve(ResourceKind::Background, "sky.jpg").unwrap().origin,
            ResourceOrigin::System
        );
        lib.save(ResourceKind::Background, "sky.jpg", b"b").unwrap();
        assert_eq!(
            lib.resolve(ResourceKind::Background, "sky.jpg").unwrap().origin,
            ResourceOrigin::User
        );
        assert!(lib.resolve(ResourceKind::Background, "none.jpg").is_none());
        std::fs::remove_dir_all(&dir).ok();
    }
}
