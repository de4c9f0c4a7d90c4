//! Capture and rasterization errors.

use asipuc_common::error::AsipucError;
use thiserror::Error;

/// Failures inside a rasterizer or the resource decoders feeding it.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("cannot load resource {url}: {reason}")]
    ResourceLoad { url: String, reason: String },

    #[error("cannot parse staged scene: {0}")]
    Parse(String),

    #[error("cannot encode image: {0}")]
    Encode(String),

    #[error("invalid raster size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("scene measures {actual_w}x{actual_h}, expected {expected_w}x{expected_h}")]
    SizeMismatch {
        expected_w: u32,
        expected_h: u32,
        actual_w: u32,
        actual_h: u32,
    },

    #[error("rasterizer backend failed: {0}")]
    Backend(String),
}

impl RasterError {
    pub fn resource(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::ResourceLoad {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

/// Failures of one offscreen capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("element not found: {element_id}")]
    ElementNotFound { element_id: String },

    #[error("container {container} is already staged")]
    StagingConflict { container: String },

    #[error("container {container} painted {frames} of {required} frames")]
    NotSettled {
        container: String,
        frames: u32,
        required: u32,
    },

    #[error("resource {url} in container {container} is not loaded")]
    ResourceNotReady { container: String, url: String },

    #[error("rasterization of {container} failed: cannot load {url}: {reason}")]
    ResourceLoad {
        container: String,
        url: String,
        reason: String,
    },

    #[error("rasterization of {container} failed: {source}")]
    Rasterization {
        container: String,
        #[source]
        source: RasterError,
    },

    #[error("invalid capture size {width}x{height} for {container}")]
    InvalidSize {
        container: String,
        width: u32,
        height: u32,
    },
}

impl CaptureError {
    /// Classify a rasterizer failure for `container`.
    pub fn from_raster(container: impl Into<String>, err: RasterError) -> Self {
        let container = container.into();
        match err {
            RasterError::ResourceLoad { url, reason } => Self::ResourceLoad {
                container,
                url,
                reason,
            },
            RasterError::InvalidSize { width, height } => Self::InvalidSize {
                container,
                width,
                height,
            },
            source => Self::Rasterization { container, source },
        }
    }

    /// Whether the failure happened while producing pixels.
    pub fn is_rasterization(&self) -> bool {
        matches!(
            self,
            Self::Rasterization { .. } | Self::ResourceLoad { .. } | Self::InvalidSize { .. }
        )
    }
}

impl From<CaptureError> for AsipucError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::ElementNotFound { element_id } => {
                AsipucError::not_found(format!("element {element_id}"))
            }
            other => AsipucError::capture(other.to_string()),
        }
    }
}
