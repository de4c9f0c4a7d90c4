use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use asipuc_model::ledger::{Ledger, ReportingUnit, UnitId};
use asipuc_model::settings::{ExportSettings, Resolution};
use asipuc_model::tally::Category;
use asipuc_model::template::TemplateId;
use asipuc_model::theme::{Color, Theme};
use asipuc_render_engine::raster::PreparedScene;
use asipuc_render_engine::stage::FrameBarrier;
use asipuc_render_engine::{
    BatchExporter, BatchSettings, CaptureEngine, CaptureError, CapturedImage, FontConfig,
    MemoryDelivery, PreviewPane, RasterError, RasterOptions, Rasterizer, ResvgRasterizer,
    SceneRegistry, VisualTree, PREVIEW_ELEMENT_ID,
};

struct BrokenRasterizer {
    calls: AtomicUsize,
}

impl Rasterizer for BrokenRasterizer {
    fn rasterize(
        &self,
        _scene: &PreparedScene,
        _options: &RasterOptions,
    ) -> Result<CapturedImage, RasterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RasterError::Backend("gpu on fire".into()))
    }

    fn name(&self) -> &str {
        "broken"
    }
}

fn offline_engine() -> CaptureEngine {
    let rasterizer = ResvgRasterizer::new(&FontConfig::default());
    CaptureEngine::new(Arc::new(rasterizer)).with_barrier(Arc::new(FrameBarrier::immediate(2)))
}

fn scenario_ledger() -> Ledger {
    let mut ledger = Ledger::with_units([
        ReportingUnit::new(UnitId(1), "Morning", "09:00"),
        ReportingUnit::new(UnitId(2), "Evening", "18:00"),
    ])
    .expect("two units form a valid ledger");

    for (category, raw) in [
        (Category::Children, "10"),
        (Category::Teens, "5"),
        (Category::YoungAdults, "8"),
        (Category::Adults, "20"),
        (Category::Seniors, "3"),
        (Category::Visitors, "2"),
    ] {
        ledger.record(category, raw);
    }
    ledger
}

#[tokio::test]
async fn end_to_end_morning_service_exports_full_hd_slide() {
    let ledger = scenario_ledger();
    assert_eq!(ledger.unit_total(UnitId(1)).unwrap(), 48);
    assert_eq!(ledger.accumulate(), ledger.unit(UnitId(1)).unwrap().data);

    let exporter = BatchExporter::new(
        Arc::new(offline_engine()),
        Arc::new(MemoryDelivery::new()),
        BatchSettings::default(),
    );
    let morning = ledger.unit(UnitId(1)).unwrap();
    let job = exporter.build_job(&morning.name, &morning.data, "2024-03-10");

    assert_eq!(job.resolution, Resolution::FULL_HD);
    assert_eq!(job.total, 48);
    let keys: Vec<&str> = job.rows.iter().map(|r| r.key).collect();
    assert_eq!(
        keys,
        ["seniors", "adults", "young_adults", "teens", "children", "visitors"]
    );
    assert_eq!(job.filename, "2024-03-10-Morning.png");

    let engine = offline_engine();
    let image = engine
        .capture_job(&job, &ExportSettings::default())
        .await
        .expect("capture should succeed");
    assert_eq!((image.width, image.height), (1920, 1080));
    let decoded = image::load_from_memory(&image.bytes).expect("valid png");
    assert_eq!(decoded.to_rgba8().dimensions(), (1920, 1080));
    assert!(engine.stage().is_empty());
}

#[tokio::test]
async fn capture_is_deterministic() {
    let ledger = scenario_ledger();
    let unit = ledger.unit(UnitId(1)).unwrap();
    let settings = ExportSettings {
        resolution: Resolution::HD,
        ..ExportSettings::default()
    };

    let mut outputs = Vec::new();
    for template in TemplateId::ALL {
        let tree = asipuc_render_engine::render_slide(
            template,
            &unit.data.to_rows(),
            unit.total(),
            &Theme::dark(),
            Resolution::HD,
        );
        let engine = offline_engine();
        let first = engine.capture_tree(&tree, &settings).await.unwrap();
        let second = engine.capture_tree(&tree, &settings).await.unwrap();
        assert_eq!(first.bytes, second.bytes, "{template}");
        outputs.push(first.bytes);
    }
    assert_eq!(outputs.len(), TemplateId::ALL.len());
}

#[tokio::test]
async fn preview_scale_does_not_change_capture() {
    let tree = asipuc_render_engine::render_slide(
        TemplateId::Minimal,
        &scenario_ledger().active_unit().data.to_rows(),
        48,
        &Theme::light(),
        Resolution::HD,
    );
    let registry = SceneRegistry::new();
    registry.mount(PREVIEW_ELEMENT_ID, PreviewPane::fit(tree.clone(), 320.0, 180.0));

    let settings = ExportSettings {
        resolution: Resolution::HD,
        ..ExportSettings::default()
    };
    let engine = offline_engine();
    let from_preview = engine
        .capture_element(&registry, PREVIEW_ELEMENT_ID, &settings)
        .await
        .unwrap();
    let direct = engine.capture_tree(&tree, &settings).await.unwrap();

    assert_eq!((from_preview.width, from_preview.height), (1280, 720));
    assert_eq!(from_preview.bytes, direct.bytes);
}

#[tokio::test]
async fn teardown_runs_when_rasterization_fails() {
    let rasterizer = Arc::new(BrokenRasterizer {
        calls: AtomicUsize::new(0),
    });
    let engine = CaptureEngine::new(rasterizer.clone() as Arc<dyn Rasterizer>)
        .with_barrier(Arc::new(FrameBarrier::immediate(2)));

    let tree = VisualTree::new(Resolution::HD, Color::BLACK);
    let settings = ExportSettings {
        resolution: Resolution::HD,
        ..ExportSettings::default()
    };

    for _ in 0..3 {
        let err = engine.capture_tree(&tree, &settings).await.unwrap_err();
        assert!(
            matches!(err, CaptureError::Rasterization { .. }),
            "unexpected error: {err}"
        );
        assert!(err.to_string().contains("gpu on fire"));
        assert!(engine.stage().is_empty());
    }
    assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 3);

    // A fixed container id is free again after each failure.
    let again = engine.capture_as("slide", &tree, &settings).await.unwrap_err();
    assert!(!matches!(again, CaptureError::StagingConflict { .. }));
    let again = engine.capture_as("slide", &tree, &settings).await.unwrap_err();
    assert!(!matches!(again, CaptureError::StagingConflict { .. }));
}

#[tokio::test]
async fn background_image_is_embedded_from_disk() {
    let dir = std::env::temp_dir().join("asipuc_it_background");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("bg.png");
    image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 255, 0, 255]))
        .save(&path)
        .unwrap();

    let mut theme = Theme::modern();
    theme.background_image = Some(asipuc_common::paths::file_url(&path));
    theme.colors.slide_overlay = Color::TRANSPARENT;
    let tree = asipuc_render_engine::render_slide(
        TemplateId::Modern,
        &[],
        0,
        &theme,
        Resolution::new(64, 36).unwrap(),
    );

    let settings = ExportSettings {
        resolution: Resolution::new(64, 36).unwrap(),
        ..ExportSettings::default()
    };
    let image = offline_engine().capture_tree(&tree, &settings).await.unwrap();
    let decoded = image::load_from_memory(&image.bytes).unwrap().to_rgba8();
    assert_eq!(decoded.get_pixel(32, 33).0, [0, 255, 0, 255]);

    std::fs::remove_dir_all(&dir).ok();
}
