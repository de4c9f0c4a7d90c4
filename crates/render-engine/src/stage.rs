//! Offscreen staging area.
//!
//! A capture mounts a private copy of its tree in a staged container placed
//! far outside any viewport. The stage only tracks which container ids are
//! occupied; the container itself is owned by the capture that mounted it,
//! and the [`StagingGuard`] frees the id when the capture ends.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use asipuc_model::settings::Resolution;

use crate::error::CaptureError;
use crate::raster::PreparedScene;
use crate::resources::{LoadedResource, ResourceSet, SourceKind};
use crate::tree::{GroupNode, Node, Transform, VisualTree};

/// Top-left corner of every staged container.
pub const OFFSCREEN_POSITION: (f32, f32) = (-99_999.0, -99_999.0);

/// Set of container ids currently staged.
#[derive(Debug, Default)]
pub struct Stage {
    occupied: Mutex<BTreeSet<String>>,
}

impl Stage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Stage a copy of `tree` as container `id`, sized to `resolution`.
    ///
    /// The copy's root transform is reset to identity. When the tree's own
    /// size differs from `resolution` its content is scaled to fill the box.
    pub fn mount(
        self: &Arc<Self>,
        id: &str,
        tree: &VisualTree,
        resolution: Resolution,
    ) -> Result<(StagingGuard, StagedContainer), CaptureError> {
        if !self.lock().insert(id.to_string()) {
            return Err(CaptureError::StagingConflict {
                container: id.to_string(),
            });
        }
        let guard = StagingGuard {
            stage: Arc::clone(self),
            id: id.to_string(),
            released: false,
        };

        let mut staged = tree.clone();
        staged.transform = Transform::IDENTITY;
        if staged.width != resolution.width || staged.height != resolution.height {
            let sx = resolution.width as f32 / staged.width.max(1) as f32;
            let sy = resolution.height as f32 / staged.height.max(1) as f32;
            let nodes = std::mem::take(&mut staged.nodes);
            staged.nodes = vec![Node::Group(GroupNode {
                transform: Transform {
                    scale_x: sx,
                    scale_y: sy,
                    ..Transform::IDENTITY
                },
                opacity: 1.0,
                children: nodes,
            })];
            staged.width = resolution.width;
            staged.height = resolution.height;
        }

        let mut resources = BTreeMap::new();
        for url in staged.image_sources() {
            resources.insert(url.to_string(), ResourceSlot::pending(SourceKind::Image));
        }
        for url in &staged.font_sources {
            resources
                .entry(url.clone())
                .or_insert_with(|| ResourceSlot::pending(SourceKind::Font));
        }

        tracing::debug!(
            container = id,
            width = staged.width,
            height = staged.height,
            resources = resources.len(),
            "Staged container"
        );
        let container = StagedContainer {
            id: id.to_string(),
            tree: staged,
            position: OFFSCREEN_POSITION,
            frames_painted: 0,
            resources,
        };
        Ok((guard, container))
    }

    pub fn is_staged(&self, id: &str) -> bool {
        self.lock().contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn staged_ids(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    fn remove(&self, id: &str) -> bool {
        self.lock().remove(id)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.occupied
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Teardown found the container already gone.
#[derive(Debug, Error)]
#[error("container {0} was already removed from the stage")]
pub struct TeardownError(pub String);

/// Owns a staged container id until released or dropped.
#[derive(Debug)]
pub struct StagingGuard {
    stage: Arc<Stage>,
    id: String,
    released: bool,
}

impl StagingGuard {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Remove the container from the stage.
    pub fn release(mut self) -> Result<(), TeardownError> {
        self.released = true;
        if self.stage.remove(&self.id) {
            tracing::debug!(container = %self.id, "Released container");
            Ok(())
        } else {
            Err(TeardownError(self.id.clone()))
        }
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        if !self.released && self.stage.remove(&self.id) {
            tracing::warn!(container = %self.id, "Container released on drop");
        }
    }
}

#[derive(Debug, Clone)]
pub enum ResourceState {
    Pending,
    Ready(Arc<LoadedResource>),
}

#[derive(Debug, Clone)]
pub struct ResourceSlot {
    pub kind: SourceKind,
    pub state: ResourceState,
}

impl ResourceSlot {
    fn pending(kind: SourceKind) -> Self {
        Self {
            kind,
            state: ResourceState::Pending,
        }
    }
}

/// A tree mounted offscreen for one capture.
#[derive(Debug, Clone)]
pub struct StagedContainer {
    id: String,
    tree: VisualTree,
    position: (f32, f32),
    frames_painted: u32,
    resources: BTreeMap<String, ResourceSlot>,
}

impl StagedContainer {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tree(&self) -> &VisualTree {
        &self.tree
    }

    pub fn position(&self) -> (f32, f32) {
        self.position
    }

    pub fn frames_painted(&self) -> u32 {
        self.frames_painted
    }

    /// Run one paint pass over the container.
    pub fn paint_frame(&mut self) {
        self.frames_painted = self.frames_painted.saturating_add(1);
    }

    /// URLs still waiting for their bytes, with their use.
    pub fn pending_urls(&self) -> Vec<(String, SourceKind)> {
        self.resources
            .iter()
            .filter(|(_, slot)| matches!(slot.state, ResourceState::Pending))
            .map(|(url, slot)| (url.clone(), slot.kind))
            .collect()
    }

    pub fn mark_ready(&mut self, url: &str, resource: Arc<LoadedResource>) {
        if let Some(slot) = self.resources.get_mut(url) {
            slot.state = ResourceState::Ready(resource);
        }
    }

    /// Freeze the container for rasterization.
    ///
    /// Fails while any resource is pending or before the first paint.
    pub fn prepare(&self) -> Result<PreparedScene, CaptureError> {
        let mut set = ResourceSet::new();
        for (url, slot) in &self.resources {
            match &slot.state {
                ResourceState::Ready(resource) => set.insert(url.clone(), Arc::clone(resource)),
                ResourceState::Pending => {
                    return Err(CaptureError::ResourceNotReady {
                        container: self.id.clone(),
                        url: url.clone(),
                    })
                }
            }
        }
        if self.frames_painted == 0 {
            return Err(CaptureError::NotSettled {
                container: self.id.clone(),
                frames: 0,
                required: 1,
            });
        }
        Ok(PreparedScene {
            container: self.id.clone(),
            tree: self.tree.clone(),
            resources: set,
        })
    }
}

/// Waits for a staged container to finish painting.
#[async_trait]
pub trait PaintBarrier: Send + Sync {
    async fn settle(&self, container: &mut StagedContainer);

    /// Frames a container must have painted before it may be rasterized.
    fn min_frames(&self) -> u32;
}

/// Yields to the runtime once per frame for a fixed number of frames.
#[derive(Debug, Clone, Copy)]
pub struct FrameBarrier {
    min_frames: u32,
    frame_interval: Duration,
}

impl FrameBarrier {
    pub const DEFAULT_FRAMES: u32 = 2;

    pub fn new(min_frames: u32, frame_interval: Duration) -> Self {
        Self {
            min_frames: min_frames.max(1),
            frame_interval,
        }
    }

    /// Barrier that yields without sleeping between frames.
    pub fn immediate(min_frames: u32) -> Self {
        Self::new(min_frames, Duration::ZERO)
    }
}

impl Default for FrameBarrier {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FRAMES, Duration::from_millis(16))
    }
}

#[async_trait]
impl PaintBarrier for FrameBarrier {
    async fn settle(&self, container: &mut StagedContainer) {
        for _ in 0..self.min_frames {
            if self.frame_interval.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.frame_interval).await;
            }
            container.paint_frame();
        }
    }

    fn min_frames(&self) -> u32 {
        self.min_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asipuc_model::theme::Color;

    use crate::tree::{Align, ImageNode, ObjectFit};

    fn tree_with_logo() -> VisualTree {
        let mut tree = VisualTree::new(Resolution::HD, Color::BLACK);
        tree.transform = Transform::scale(0.25);
        tree.push(Node::Image(ImageNode {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            href: "file:///logo.png".into(),
            fit: ObjectFit::Contain,
            align_x: Align::Center,
            align_y: Align::Center,
            opacity: 1.0,
        }));
        tree.font_sources.push("file:///font.ttf".into());
        tree
    }

    #[test]
    fn test_mount_neutralizes_transform_and_hides_container() {
        let stage = Stage::new();
        let (_guard, container) = stage.mount("c1", &tree_with_logo(), Resolution::HD).unwrap();
        assert!(container.tree().transform.is_identity());
        assert_eq!(container.position(), OFFSCREEN_POSITION);
        assert_eq!(
            container.pending_urls(),
            vec![
                ("file:///font.ttf".to_string(), SourceKind::Font),
                ("file:///logo.png".to_string(), SourceKind::Image),
            ]
        );
    }

    #[test]
    fn test_mount_forces_size() {
        let stage = Stage::new();
        let (_guard, container) = stage
            .mount("c1", &tree_with_logo(), Resolution::FULL_HD)
            .unwrap();
        assert_eq!(container.tree().resolution(), Resolution::FULL_HD);
        let Node::Group(group) = &container.tree().nodes[0] else {
            panic!("expected scaling group");
        };
        assert!((group.transform.scale_x - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_duplicate_id_is_rejected_until_released() {
        let stage = Stage::new();
        let (guard, _) = stage.mount("c1", &tree_with_logo(), Resolution::HD).unwrap();
        assert_eq!(stage.staged_ids(), ["c1"]);
        assert!(matches!(
            stage.mount("c1", &tree_with_logo(), Resolution::HD),
            Err(CaptureError::StagingConflict { .. })
        ));
        guard.release().unwrap();
        assert!(stage.is_empty());
        assert!(stage.mount("c1", &tree_with_logo(), Resolution::HD).is_ok());
    }

    #[test]
    fn test_drop_releases_container() {
        let stage = Stage::new();
        {
            let _staged = stage.mount("c1", &tree_with_logo(), Resolution::HD).unwrap();
            assert!(stage.is_staged("c1"));
        }
        assert!(stage.is_empty());
    }

    #[test]
    fn test_prepare_requires_resources_and_paint() {
        let stage = Stage::new();
        let (_guard, mut container) = stage.mount("c1", &tree_with_logo(), Resolution::HD).unwrap();
        assert!(matches!(
            container.prepare(),
            Err(CaptureError::ResourceNotReady { .. })
        ));

        let image = Arc::new(LoadedResource::Image {
            mime: "image/png",
            bytes: vec![0],
        });
        let font = Arc::new(LoadedResource::Font { bytes: vec![0] });
        container.mark_ready("file:///logo.png", image);
        container.mark_ready("file:///font.ttf", font);
        assert!(matches!(
            container.prepare(),
            Err(CaptureError::NotSettled { .. })
        ));

        container.paint_frame();
        let scene = container.prepare().unwrap();
        assert_eq!(scene.resources.len(), 2);
    }

    #[tokio::test]
    async fn test_frame_barrier_paints_min_frames() {
        let stage = Stage::new();
        let (_guard, mut container) = stage.mount("c1", &tree_with_logo(), Resolution::HD).unwrap();
        let barrier = FrameBarrier::immediate(3);
        barrier.settle(&mut container).await;
        assert_eq!(container.frames_painted(), 3);
        assert_eq!(FrameBarrier::default().min_frames(), 2);
    }
}
