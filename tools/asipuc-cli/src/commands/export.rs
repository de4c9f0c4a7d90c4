//! Export slides for one service or the whole day.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use asipuc_common::config::ExportDefaults;
use asipuc_model::settings::{ExportSettings, ImageFormat, ImageQuality, Resolution};
use asipuc_model::template::TemplateId;
use asipuc_model::theme::Theme;
use asipuc_render_engine::{
    BatchExporter, BatchProgress, BatchSettings, BatchStage, CancelFlag, DirectoryDelivery,
    ACCUMULATED_LABEL,
};
use asipuc_storage::resources::{ResourceKind, ResourceLibrary};

use super::Context;
use crate::SlideArgs;

pub async fn run(
    ctx: &Context,
    service: Option<u32>,
    accumulated: bool,
    slide: SlideArgs,
) -> anyhow::Result<()> {
    let file = ctx.load_ledger()?;
    let ledger = &file.ledger;
    let (settings, output) = batch_settings(ctx, &slide, None)?;

    let (label, tally) = if accumulated {
        (ACCUMULATED_LABEL.to_string(), ledger.accumulate())
    } else {
        let id = Context::target_unit(ledger, service)?;
        let unit = ledger
            .unit(id)
            .ok_or_else(|| anyhow::anyhow!("Service {id} not found"))?;
        (unit.name.clone(), unit.data)
    };

    let engine = Arc::new(ctx.capture_engine());
    let delivery = Arc::new(DirectoryDelivery::new(&output));
    let exporter = BatchExporter::new(Arc::clone(&engine), delivery.clone(), settings);
    let job = exporter.build_job(&label, &tally, &ctx.today());

    println!(
        "Exporting {} ({} template, {} theme, {})",
        label,
        job.template,
        job.theme.name,
        job.resolution
    );
    let delivered = engine
        .export_and_deliver(&job, &exporter.settings().export, delivery.as_ref())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to export {label}: {e}"))?;

    println!("Wrote {delivered} (total {})", job.total);
    Ok(())
}

pub async fn run_all(ctx: &Context, slide: SlideArgs, delay_ms: Option<u64>) -> anyhow::Result<()> {
    let file = ctx.load_ledger()?;
    let (settings, output) = batch_settings(ctx, &slide, delay_ms)?;

    let engine = Arc::new(ctx.capture_engine());
    let delivery = Arc::new(DirectoryDelivery::new(&output));
    let exporter = BatchExporter::new(engine, delivery, settings);

    let cancel: CancelFlag = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling after the current slide...");
            flag.store(true, Ordering::SeqCst);
        }
    });

    println!("Exporting to {}", output.display());
    let report = exporter
        .export_ledger(
            &file.ledger,
            &ctx.today(),
            Some(&cancel),
            Some(Box::new(print_progress)),
        )
        .await;

    for outcome in report.failed() {
        if let Err(reason) = &outcome.result {
            eprintln!("  {} failed: {reason}", outcome.label);
        }
    }
    println!("{}", report.summary());

    if report.failed().next().is_some() {
        anyhow::bail!("Some slides failed to export");
    }
    Ok(())
}

fn print_progress(progress: BatchProgress) {
    let percent = (progress.fraction() * 100.0).round();
    match progress.stage {
        BatchStage::Cancelled => println!("  Cancelled before {}", progress.label),
        _ => println!(
            "  [{}/{}] {percent:>3}% {}",
            progress.completed, progress.total, progress.label
        ),
    }
}

/// Merge command-line overrides over the configured export defaults.
fn batch_settings(
    ctx: &Context,
    slide: &SlideArgs,
    delay_ms: Option<u64>,
) -> anyhow::Result<(BatchSettings, PathBuf)> {
    let defaults = &ctx.config.export;

    let template: TemplateId = slide
        .template
        .as_deref()
        .unwrap_or(&defaults.template)
        .parse()
        .map_err(|e| anyhow::anyhow!("Failed to select template: {e}"))?;

    let mut theme = load_theme(slide.theme.as_deref().unwrap_or(&defaults.theme))?;
    let library = ctx.library();
    if let Some(name) = &slide.background {
        theme.background_image = Some(resolve(&library, ResourceKind::Background, name)?);
    }
    if let Some(name) = &slide.logo {
        theme.logos.main.url = Some(resolve(&library, ResourceKind::Logo, name)?);
        theme.logos.main.enabled = true;
    }

    let export = export_settings(defaults, slide)?;
    let settings = BatchSettings {
        theme,
        template,
        export,
        inter_capture_delay: Duration::from_millis(
            delay_ms.unwrap_or(defaults.inter_capture_delay_ms),
        ),
    };
    let output = slide
        .output
        .clone()
        .unwrap_or_else(|| ctx.config.exports_dir.clone());
    Ok((settings, output))
}

fn export_settings(defaults: &ExportDefaults, slide: &SlideArgs) -> anyhow::Result<ExportSettings> {
    let format: ImageFormat = slide
        .format
        .as_deref()
        .unwrap_or(&defaults.format)
        .parse()
        .map_err(|e| anyhow::anyhow!("Failed to select format: {e}"))?;
    let resolution = Resolution::new(
        slide.width.unwrap_or(defaults.width),
        slide.height.unwrap_or(defaults.height),
    )
    .map_err(|e| anyhow::anyhow!("Invalid resolution: {e}"))?;

    Ok(ExportSettings {
        resolution,
        format,
        quality: ImageQuality::new(slide.quality.unwrap_or(defaults.quality)),
        ..ExportSettings::default()
    })
}

/// A preset name, or a path to a theme JSON file.
fn load_theme(name_or_path: &str) -> anyhow::Result<Theme> {
    if let Some(theme) = Theme::preset(name_or_path) {
        return Ok(theme);
    }
    let path = Path::new(name_or_path);
    if path.is_file() {
        return Theme::load(path).map_err(|e| anyhow::anyhow!("Failed to load theme: {e}"));
    }
    let presets: Vec<&str> = Theme::preset_names().collect();
    anyhow::bail!(
        "Unknown theme '{name_or_path}' (presets: {})",
        presets.join(", ")
    )
}

fn resolve(library: &ResourceLibrary, kind: ResourceKind, name: &str) -> anyhow::Result<String> {
    library
        .resolve(kind, name)
        .map(|entry| entry.url)
        .ok_or_else(|| anyhow::anyhow!("No {kind} named '{name}' in the resource library"))
}
