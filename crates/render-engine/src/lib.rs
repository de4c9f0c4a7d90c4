//! Asipuc Render Engine
//!
//! Turns attendance tallies into slide images. Templates lay the slide out
//! as a visual tree; the capture engine rasterizes a private offscreen copy
//! of that tree, so what the user sees in the preview never changes the
//! exported pixels.
//!
//! # Pipeline Architecture
//!
//! ```text
//! tally ── rows ──┐
//!                 ├── Template (modern/classic/minimal/elegant)
//! theme ──────────┘         │
//!                           ▼
//!                      VisualTree
//!                           │
//!                           ├── Stage (offscreen, identity transform)
//!                           ├── Resolve resources (file://, data:)
//!                           ├── Settle (paint frames)
//!                           ├── Rasterize (usvg → resvg → PNG/JPEG)
//!                           └── Teardown (always)
//!                           │
//!                           ▼
//!                     CapturedImage ── FileDelivery ── 2024-03-10-Morning.png
//! ```

pub mod batch;
pub mod capture;
pub mod delivery;
pub mod error;
pub mod job;
pub mod preview;
pub mod raster;
pub mod resources;
pub mod stage;
pub mod svg;
pub mod templates;
pub mod tree;

pub use batch::{
    BatchExporter, BatchProgress, BatchProgressCallback, BatchSettings, BatchStage, CancelFlag,
    ExportReport, UnitOutcome, ACCUMULATED_LABEL,
};
pub use capture::CaptureEngine;
pub use delivery::{DeliveredFile, DirectoryDelivery, FileDelivery, MemoryDelivery};
pub use error::{CaptureError, RasterError};
pub use job::ExportJob;
pub use preview::{PreviewPane, SceneRegistry, PREVIEW_ELEMENT_ID};
pub use raster::{CapturedImage, FontConfig, RasterOptions, Rasterizer, ResvgRasterizer};
pub use templates::{render_slide, template_for, SlideTemplate};
pub use tree::VisualTree;
