//! Batch export of every enabled reporting unit plus the accumulated total.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use asipuc_common::clock::Stopwatch;
use asipuc_model::ledger::{Ledger, ReportingUnit};
use asipuc_model::settings::ExportSettings;
use asipuc_model::tally::Tally;
use asipuc_model::template::TemplateId;
use asipuc_model::theme::Theme;

use crate::capture::CaptureEngine;
use crate::delivery::{sanitize_filename, DeliveredFile, FileDelivery};
use crate::job::{export_filename, ExportJob, FilenameSet};

/// Unit name used for the accumulated slide.
pub const ACCUMULATED_LABEL: &str = "TOTAL-ACCUMULATED";

/// Shared flag that stops a batch before its next unit.
pub type CancelFlag = Arc<AtomicBool>;

/// Progress callback for batch exports.
pub type BatchProgressCallback = Box<dyn Fn(BatchProgress) + Send + Sync>;

/// Batch progress report.
#[derive(Debug, Clone)]
pub struct BatchProgress {
    /// Steps finished, successful or not.
    pub completed: usize,

    /// Enabled units plus the accumulated slide.
    pub total: usize,

    /// Label of the step just finished.
    pub label: String,

    pub stage: BatchStage,
}

impl BatchProgress {
    /// Progress as a fraction in `[0.0, 1.0]`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Stages of a batch export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStage {
    Exporting,
    Complete,
    Cancelled,
}

/// Appearance and pacing shared by every slide in a batch.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub theme: Theme,
    pub template: TemplateId,
    pub export: ExportSettings,
    /// Pause between consecutive captures.
    pub inter_capture_delay: Duration,
}

impl BatchSettings {
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(300);
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            theme: Theme::modern(),
            template: TemplateId::default(),
            export: ExportSettings::default(),
            inter_capture_delay: Self::DEFAULT_DELAY,
        }
    }
}

/// Result of one slide in a batch.
#[derive(Debug, Clone)]
pub struct UnitOutcome {
    pub label: String,
    pub filename: String,
    pub result: Result<DeliveredFile, String>,
}

impl UnitOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-unit outcomes of a batch.
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub outcomes: Vec<UnitOutcome>,
    pub cancelled: bool,
}

impl ExportReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &UnitOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &UnitOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.failed().next().is_none()
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        let ok = self.succeeded().count();
        let failed = self.failed().count();
        let mut line = format!("{ok} exported, {failed} failed");
        if self.cancelled {
            line.push_str(" (cancelled)");
        }
        line
    }
}

/// Exports one slide per unit with a single capture engine, sequentially.
pub struct BatchExporter {
    engine: Arc<CaptureEngine>,
    delivery: Arc<dyn FileDelivery>,
    settings: BatchSettings,
}

impl BatchExporter {
    pub fn new(
        engine: Arc<CaptureEngine>,
        delivery: Arc<dyn FileDelivery>,
        settings: BatchSettings,
    ) -> Self {
        Self {
            engine,
            delivery,
            settings,
        }
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    /// Job for one slide showing `tally` under `label`.
    pub fn build_job(&self, label: &str, tally: &Tally, date: &str) -> ExportJob {
        ExportJob {
            label: label.to_string(),
            rows: tally.to_rows(),
            total: tally.total(),
            theme: self.settings.theme.clone(),
            template: self.settings.template,
            resolution: self.settings.export.resolution,
            filename: export_filename(date, label, self.settings.export.format.extension()),
        }
    }

    /// Export every enabled unit of `ledger`, then its accumulated total.
    pub async fn export_ledger(
        &self,
        ledger: &Ledger,
        date: &str,
        cancel: Option<&CancelFlag>,
        progress: Option<BatchProgressCallback>,
    ) -> ExportReport {
        let units: Vec<ReportingUnit> = ledger.enabled_units().cloned().collect();
        self.export_all(&units, &ledger.accumulate(), date, cancel, progress)
            .await
    }

    /// Export `units` that are enabled, in order, then `accumulated`.
    ///
    /// A failed unit is recorded and the batch moves on. Cancellation is
    /// honoured only between units. Filenames that repeat within the batch
    /// get a numeric suffix so no slide overwrites another.
    pub async fn export_all(
        &self,
        units: &[ReportingUnit],
        accumulated: &Tally,
        date: &str,
        cancel: Option<&CancelFlag>,
        progress: Option<BatchProgressCallback>,
    ) -> ExportReport {
        let mut jobs: Vec<ExportJob> = units
            .iter()
            .filter(|unit| unit.enabled)
            .map(|unit| self.build_job(&unit.name, &unit.data, date))
            .collect();
        jobs.push(self.build_job(ACCUMULATED_LABEL, accumulated, date));

        let mut names = FilenameSet::new();
        for job in &mut jobs {
            let unique = names.claim(&sanitize_filename(&job.filename));
            if unique != job.filename {
                tracing::debug!(
                    unit = %job.label,
                    from = %job.filename,
                    to = %unique,
                    "Renamed repeated export filename"
                );
                job.filename = unique;
            }
        }

        let total = jobs.len();
        let timer = Stopwatch::start();
        tracing::info!(
            slides = total,
            template = %self.settings.template,
            theme = %self.settings.theme.name,
            "Starting batch export"
        );

        let mut report = ExportReport::default();
        for (index, job) in jobs.iter().enumerate() {
            if cancel.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
                tracing::info!(completed = index, total, "Batch export cancelled");
                report.cancelled = true;
                if let Some(cb) = &progress {
                    cb(BatchProgress {
                        completed: index,
                        total,
                        label: job.label.clone(),
                        stage: BatchStage::Cancelled,
                    });
                }
                break;
            }
            if index > 0 && !self.settings.inter_capture_delay.is_zero() {
                tokio::time::sleep(self.settings.inter_capture_delay).await;
            }

            let result = self
                .engine
                .export_and_deliver(job, &self.settings.export, self.delivery.as_ref())
                .await;
            match &result {
                Ok(file) => tracing::info!(unit = %job.label, file = %file, "Exported unit"),
                Err(err) => tracing::warn!(unit = %job.label, error = %err, "Unit export failed"),
            }
            report.outcomes.push(UnitOutcome {
                label: job.label.clone(),
                filename: job.filename.clone(),
                result: result.map_err(|e| e.to_string()),
            });

            if let Some(cb) = &progress {
                let completed = index + 1;
                cb(BatchProgress {
                    completed,
                    total,
                    label: job.label.clone(),
                    stage: if completed == total {
                        BatchStage::Complete
                    } else {
                        BatchStage::Exporting
                    },
                });
            }
        }

        tracing::info!(
            summary = %report.summary(),
            elapsed_ms = timer.elapsed_ms(),
            "Batch export finished"
        );
        report
    }
}
