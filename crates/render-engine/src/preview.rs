//! Live preview surface.
//!
//! The pane shows a slide scaled down to fit its viewport. Mounted trees are
//! addressable by element id so a capture can be requested for whatever is
//! currently on screen.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::tree::{Transform, VisualTree};

/// Element id used by the default preview pane.
pub const PREVIEW_ELEMENT_ID: &str = "slide-preview";

/// Registry of visual trees currently mounted in the host view.
#[derive(Debug, Default)]
pub struct SceneRegistry {
    scenes: Mutex<HashMap<String, VisualTree>>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount (or replace) the tree shown under `id`.
    pub fn mount(&self, id: impl Into<String>, tree: VisualTree) {
        let id = id.into();
        tracing::debug!(element = %id, width = tree.width, height = tree.height, "Mounted scene");
        self.lock().insert(id, tree);
    }

    pub fn unmount(&self, id: &str) -> Option<VisualTree> {
        self.lock().remove(id)
    }

    /// Snapshot of the tree mounted under `id`.
    pub fn get(&self, id: &str) -> Option<VisualTree> {
        self.lock().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, VisualTree>> {
        // A panic while holding the lock cannot leave the map half-written.
        self.scenes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Fit-to-viewport presentation of a slide.
pub struct PreviewPane;

impl PreviewPane {
    /// Scale `tree` uniformly so it fits inside a `viewport_w × viewport_h`
    /// box, centred. The tree's own size is left untouched.
    pub fn fit(mut tree: VisualTree, viewport_w: f32, viewport_h: f32) -> VisualTree {
        let (w, h) = (tree.width as f32, tree.height as f32);
        if w <= 0.0 || h <= 0.0 || viewport_w <= 0.0 || viewport_h <= 0.0 {
            return tree;
        }
        let k = (viewport_w / w).min(viewport_h / h);
        tree.transform = Transform {
            scale_x: k,
            scale_y: k,
            translate_x: (viewport_w - w * k) / 2.0,
            translate_y: (viewport_h - h * k) / 2.0,
        };
        tree
    }
}
