//! Offscreen capture engine.
//!
//! Each capture runs stage → resolve resources → settle → rasterize →
//! teardown. Teardown runs on every path; if it fails the failure is logged
//! and the capture's own result is returned unchanged.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::{self, JoinSet};

use asipuc_common::clock::Stopwatch;
use asipuc_model::settings::ExportSettings;

use crate::delivery::{DeliveredFile, FileDelivery};
use crate::error::{CaptureError, RasterError};
use crate::job::ExportJob;
use crate::preview::SceneRegistry;
use crate::raster::{CapturedImage, RasterOptions, Rasterizer};
use crate::resources::{decode, FileResourceLoader, ResourceLoader};
use crate::stage::{FrameBarrier, PaintBarrier, Stage, StagedContainer};
use crate::tree::VisualTree;

/// Produces rasters of visual trees independent of how they are displayed.
pub struct CaptureEngine {
    stage: Arc<Stage>,
    loader: Arc<dyn ResourceLoader>,
    rasterizer: Arc<dyn Rasterizer>,
    barrier: Arc<dyn PaintBarrier>,
    next_container: AtomicU64,
}

impl CaptureEngine {
    /// Engine over `rasterizer` with the file loader and a two-frame barrier.
    pub fn new(rasterizer: Arc<dyn Rasterizer>) -> Self {
        Self {
            stage: Stage::new(),
            loader: Arc::new(FileResourceLoader),
            rasterizer,
            barrier: Arc::new(FrameBarrier::default()),
            next_container: AtomicU64::new(0),
        }
    }

    pub fn with_loader(mut self, loader: Arc<dyn ResourceLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_barrier(mut self, barrier: Arc<dyn PaintBarrier>) -> Self {
        self.barrier = barrier;
        self
    }

    pub fn with_stage(mut self, stage: Arc<Stage>) -> Self {
        self.stage = stage;
        self
    }

    pub fn stage(&self) -> &Arc<Stage> {
        &self.stage
    }

    pub fn rasterizer_name(&self) -> &str {
        self.rasterizer.name()
    }

    /// Capture `tree` at `settings.resolution`.
    pub async fn capture_tree(
        &self,
        tree: &VisualTree,
        settings: &ExportSettings,
    ) -> Result<CapturedImage, CaptureError> {
        let n = self.next_container.fetch_add(1, Ordering::Relaxed) + 1;
        self.capture_as(&format!("capture-{n}"), tree, settings)
            .await
    }

    /// Render `job` with its template and capture it at the job's resolution.
    pub async fn capture_job(
        &self,
        job: &ExportJob,
        settings: &ExportSettings,
    ) -> Result<CapturedImage, CaptureError> {
        let settings = ExportSettings {
            resolution: job.resolution,
            ..*settings
        };
        self.capture_tree(&job.render(), &settings).await
    }

    /// Capture whatever is mounted under `element_id`.
    pub async fn capture_element(
        &self,
        registry: &SceneRegistry,
        element_id: &str,
        settings: &ExportSettings,
    ) -> Result<CapturedImage, CaptureError> {
        let tree = registry
            .get(element_id)
            .ok_or_else(|| CaptureError::ElementNotFound {
                element_id: element_id.to_string(),
            })?;
        self.capture_tree(&tree, settings).await
    }

    /// Capture `job` and hand the image to `delivery` under the job's filename.
    pub async fn export_and_deliver(
        &self,
        job: &ExportJob,
        settings: &ExportSettings,
        delivery: &dyn FileDelivery,
    ) -> asipuc_common::error::AsipucResult<DeliveredFile> {
        let image = self.capture_job(job, settings).await?;
        delivery.deliver(&image, &job.filename).await
    }

    /// Capture `tree` in the container `container_id`.
    pub async fn capture_as(
        &self,
        container_id: &str,
        tree: &VisualTree,
        settings: &ExportSettings,
    ) -> Result<CapturedImage, CaptureError> {
        let timer = Stopwatch::start();
        let (guard, mut container) = self.stage.mount(container_id, tree, settings.resolution)?;

        let result = self.run(&mut container, settings).await;

        if let Err(err) = guard.release() {
            tracing::warn!(container = container_id, error = %err, "Teardown failed");
        }

        match &result {
            Ok(image) => tracing::info!(
                container = container_id,
                width = image.width,
                height = image.height,
                bytes = image.bytes.len(),
                elapsed_ms = timer.elapsed_ms(),
                "Captured slide"
            ),
            Err(err) => tracing::warn!(
                container = container_id,
                error = %err,
                elapsed_ms = timer.elapsed_ms(),
                "Capture failed"
            ),
        }
        result
    }

    async fn run(
        &self,
        container: &mut StagedContainer,
        settings: &ExportSettings,
    ) -> Result<CapturedImage, CaptureError> {
        self.resolve(container).await?;

        self.barrier.settle(container).await;
        let required = self.barrier.min_frames();
        if container.frames_painted() < required {
            return Err(CaptureError::NotSettled {
                container: container.id().to_string(),
                frames: container.frames_painted(),
                required,
            });
        }

        let scene = container.prepare()?;
        let options = RasterOptions::from_settings(settings);
        let rasterizer = Arc::clone(&self.rasterizer);
        let id = container.id().to_string();

        let image = task::spawn_blocking(move || rasterizer.rasterize(&scene, &options))
            .await
            .map_err(|e| CaptureError::Rasterization {
                container: id.clone(),
                source: RasterError::Backend(format!("rasterizer task failed: {e}")),
            })?
            .map_err(|err| CaptureError::from_raster(id.clone(), err))?;

        if image.width != options.width || image.height != options.height {
            return Err(CaptureError::Rasterization {
                container: id,
                source: RasterError::SizeMismatch {
                    expected_w: options.width,
                    expected_h: options.height,
                    actual_w: image.width,
                    actual_h: image.height,
                },
            });
        }
        Ok(image)
    }

    /// Fetch and decode every pending resource of `container`.
    async fn resolve(&self, container: &mut StagedContainer) -> Result<(), CaptureError> {
        let pending = container.pending_urls();
        if pending.is_empty() {
            return Ok(());
        }
        tracing::debug!(container = container.id(), count = pending.len(), "Resolving resources");

        let mut loads = JoinSet::new();
        for (url, kind) in pending {
            let loader = Arc::clone(&self.loader);
            loads.spawn(async move {
                let loaded = match loader.fetch(&url).await {
                    Ok(bytes) => decode(kind, &url, bytes),
                    Err(err) => Err(err),
                };
                (url, loaded)
            });
        }

        while let Some(joined) = loads.join_next().await {
            let (url, loaded) = joined.map_err(|e| CaptureError::Rasterization {
                container: container.id().to_string(),
                source: RasterError::Backend(format!("resource task failed: {e}")),
            })?;
            match loaded {
                Ok(resource) => container.mark_ready(&url, Arc::new(resource)),
                Err(err) => {
                    tracing::warn!(container = container.id(), url = %url, error = %err, "Resource failed to load");
                    return Err(CaptureError::from_raster(container.id(), err));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use asipuc_model::settings::Resolution;
    use asipuc_model::theme::Color;

    use crate::raster::PreparedScene;
    use crate::tree::{Align, ImageNode, Node, ObjectFit};

    /// Records what it was asked to rasterize and returns a fixed image.
    #[derive(Default)]
    struct RecordingRasterizer {
        seen: Mutex<Vec<(PreparedScene, RasterOptions)>>,
    }

    impl Rasterizer for RecordingRasterizer {
        fn rasterize(
            &self,
            scene: &PreparedScene,
            options: &RasterOptions,
        ) -> Result<CapturedImage, RasterError> {
            self.seen.lock().unwrap().push((scene.clone(), *options));
            Ok(CapturedImage {
                width: options.width,
                height: options.height,
                format: options.format,
                bytes: vec![1, 2, 3],
            })
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    struct FailingLoader;

    #[async_trait]
    impl ResourceLoader for FailingLoader {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, RasterError> {
            Err(RasterError::resource(url, "offline"))
        }
    }

    /// Barrier that never paints.
    struct StuckBarrier;

    #[async_trait]
    impl PaintBarrier for StuckBarrier {
        async fn settle(&self, _container: &mut StagedContainer) {}

        fn min_frames(&self) -> u32 {
            2
        }
    }

    fn engine(rasterizer: Arc<RecordingRasterizer>) -> CaptureEngine {
        CaptureEngine::new(rasterizer).with_barrier(Arc::new(FrameBarrier::immediate(2)))
    }

    fn with_logo(mut tree: VisualTree) -> VisualTree {
        tree.push(Node::Image(ImageNode {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            href: "file:///nowhere/logo.png".into(),
            fit: ObjectFit::Contain,
            align_x: Align::Center,
            align_y: Align::Center,
            opacity: 1.0,
        }));
        tree
    }

    #[tokio::test]
    async fn test_capture_neutralizes_preview_transform() {
        let rasterizer = Arc::new(RecordingRasterizer::default());
        let engine = engine(Arc::clone(&rasterizer));
        let preview = crate::preview::PreviewPane::fit(
            VisualTree::new(Resolution::FULL_HD, Color::BLACK),
            480.0,
            270.0,
        );

        let image = engine
            .capture_tree(&preview, &ExportSettings::default())
            .await
            .unwrap();
        assert_eq!((image.width, image.height), (1920, 1080));

        let seen = rasterizer.seen.lock().unwrap();
        let (scene, options) = &seen[0];
        assert!(scene.tree.transform.is_identity());
        assert_eq!(options.pixel_ratio, 1.0);
        assert!(engine.stage().is_empty());
    }

    #[tokio::test]
    async fn test_missing_element_fails_before_staging() {
        let rasterizer = Arc::new(RecordingRasterizer::default());
        let engine = engine(Arc::clone(&rasterizer));
        let err = engine
            .capture_element(&SceneRegistry::new(), "slide-preview", &ExportSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::ElementNotFound { .. }));
        assert!(rasterizer.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resource_failure_is_rasterization_failure_and_tears_down() {
        let rasterizer = Arc::new(RecordingRasterizer::default());
        let engine = engine(Arc::clone(&rasterizer)).with_loader(Arc::new(FailingLoader));
        let tree = with_logo(VisualTree::new(Resolution::HD, Color::BLACK));

        let err = engine
            .capture_tree(&tree, &ExportSettings::default())
            .await
            .unwrap_err();
        assert!(err.is_rasterization());
        assert!(err.to_string().contains("file:///nowhere/logo.png"));
        assert!(rasterizer.seen.lock().unwrap().is_empty());
        assert!(engine.stage().is_empty());
    }

    #[tokio::test]
    async fn test_unsettled_container_is_not_rasterized() {
        let rasterizer = Arc::new(RecordingRasterizer::default());
        let engine = CaptureEngine::new(Arc::clone(&rasterizer) as Arc<dyn Rasterizer>)
            .with_barrier(Arc::new(StuckBarrier));
        let err = engine
            .capture_tree(
                &VisualTree::new(Resolution::HD, Color::BLACK),
                &ExportSettings::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::NotSettled { frames: 0, required: 2, .. }));
        assert!(rasterizer.seen.lock().unwrap().is_empty());
        assert!(engine.stage().is_empty());
    }

    #[tokio::test]
    async fn test_staging_conflict_leaves_existing_container() {
        let rasterizer = Arc::new(RecordingRasterizer::default());
        let stage = Stage::new();
        let engine = engine(rasterizer).with_stage(Arc::clone(&stage));
        let tree = VisualTree::new(Resolution::HD, Color::BLACK);
        let (_held, _) = stage.mount("busy", &tree, Resolution::HD).unwrap();

        let err = engine
            .capture_as("busy", &tree, &ExportSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::StagingConflict { .. }));
        assert_eq!(engine.stage().staged_ids(), ["busy"]);
    }
}
