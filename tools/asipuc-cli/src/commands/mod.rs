//! Command implementations and the state they share.

pub mod config;
pub mod export;
pub mod history;
pub mod record;
pub mod resources;
pub mod services;
pub mod show;
pub mod templates;

use std::sync::Arc;
use std::time::Duration;

use asipuc_common::clock::{iso_timestamp, Clock, SystemClock};
use asipuc_common::config::AppConfig;
use asipuc_model::ledger::{Ledger, UnitId};
use asipuc_model::session::LedgerFile;
use asipuc_render_engine::stage::FrameBarrier;
use asipuc_render_engine::{CaptureEngine, FontConfig, ResvgRasterizer};
use asipuc_storage::resources::{ResourceKind, ResourceLibrary};
use asipuc_storage::sqlite::SqliteStore;

/// Configuration plus the handles every command builds from it.
pub struct Context {
    pub config: AppConfig,
    pub clock: Arc<dyn Clock>,
}

impl Context {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn load_ledger(&self) -> anyhow::Result<LedgerFile> {
        LedgerFile::load_or_default(&self.config.ledger_path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to load ledger {}: {e}",
                self.config.ledger_path.display()
            )
        })
    }

    /// Stamp and write the working day back to disk.
    pub fn save_ledger(&self, file: &mut LedgerFile) -> anyhow::Result<()> {
        file.saved_at = iso_timestamp(&self.clock.now());
        file.save(&self.config.ledger_path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to save ledger {}: {e}",
                self.config.ledger_path.display()
            )
        })?;
        tracing::debug!(path = %self.config.ledger_path.display(), "Saved ledger");
        Ok(())
    }

    /// Load the ledger, apply `edit`, and write it back.
    pub fn edit_ledger<T>(
        &self,
        edit: impl FnOnce(&mut Ledger) -> anyhow::Result<T>,
    ) -> anyhow::Result<T> {
        let mut file = self.load_ledger()?;
        let value = edit(&mut file.ledger)?;
        self.save_ledger(&mut file)?;
        Ok(value)
    }

    pub fn open_store(&self) -> anyhow::Result<SqliteStore> {
        SqliteStore::open(&self.config.database_path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to open database {}: {e}",
                self.config.database_path.display()
            )
        })
    }

    pub fn library(&self) -> ResourceLibrary {
        ResourceLibrary::new(
            &self.config.resources.system_dir,
            &self.config.resources.user_dir,
        )
    }

    /// Capture engine backed by resvg with the configured fonts.
    pub fn capture_engine(&self) -> CaptureEngine {
        let resources = &self.config.resources;
        let fonts = FontConfig {
            system_fonts: self.config.export.system_fonts,
            font_dirs: [&resources.system_dir, &resources.user_dir]
                .into_iter()
                .map(|dir| dir.join(ResourceKind::Font.folder()))
                .filter(|dir| dir.is_dir())
                .collect(),
        };
        let barrier = FrameBarrier::new(
            self.config.export.settle_frames,
            Duration::from_millis(16),
        );
        let engine = CaptureEngine::new(Arc::new(ResvgRasterizer::new(&fonts)))
            .with_barrier(Arc::new(barrier));
        tracing::debug!(
            rasterizer = engine.rasterizer_name(),
            font_dirs = fonts.font_dirs.len(),
            settle_frames = self.config.export.settle_frames,
            "Capture engine ready"
        );
        engine
    }

    /// The given unit, or the active one.
    pub fn target_unit(ledger: &Ledger, service: Option<u32>) -> anyhow::Result<UnitId> {
        match service {
            Some(id) => {
                let id = UnitId(id);
                ledger
                    .unit(id)
                    .map(|u| u.id)
                    .ok_or_else(|| anyhow::anyhow!("Service {id} not found"))
            }
            None => Ok(ledger.active_id()),
        }
    }

    /// Today's date for export filenames.
    pub fn today(&self) -> String {
        asipuc_common::clock::local_date_slug(self.clock.as_ref())
    }
}
