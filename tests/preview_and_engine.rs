mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{loader_for, pipeline_with, FakeBackend, FakeFactory, FakePage, ScriptedOcr, FAKE_PDF};
use pdf_ingest::config::{EngineConfig, IngestConfig};
use pdf_ingest::ocr::{OcrProvider, OcrService};
use pdf_ingest::{EngineLoader, EngineStatus, ExtractionPipeline};

#[tokio::test]
async fn test_preview_renders_first_page_at_preview_scale() {
    let (pipeline, factory) = pipeline_with(
        vec![FakePage::text(&["cover"]), FakePage::text(&["body"])],
        None,
    );

    let preview = pipeline.build_preview(FAKE_PDF, "annual-report.pdf").await;

    assert!(preview.is_ok(), "{:?}", preview.error);
    assert_eq!(preview.file_name, "annual-report.png");
    assert_eq!((preview.width, preview.height), (4, 4));

    let png = preview.image.unwrap();
    let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (4, 4));
    assert_eq!(decoded.get_pixel(0, 0)[0], 1);

    let renders = factory.backend.render_calls();
    assert_eq!(renders.len(), 1);
    assert_eq!((renders[0].page_number, renders[0].scale), (1, 4.0));
}

#[tokio::test]
async fn test_preview_failure_is_a_populated_result() {
    let (pipeline, _) = pipeline_with(vec![FakePage::scanned().broken_render()], None);

    let preview = pipeline.build_preview(FAKE_PDF, "Scan.PDF").await;

    assert!(preview.image.is_none());
    assert_eq!(preview.file_name, "Scan.png");
    assert_eq!((preview.width, preview.height), (0, 0));
    assert_eq!(
        preview.error.as_deref(),
        Some("Failed to convert PDF: Render error on page 1: canvas context unavailable")
    );
}

#[tokio::test]
async fn test_preview_of_garbage_reports_open_error() {
    let (pipeline, _) = pipeline_with(vec![FakePage::scanned()], None);

    let preview = pipeline.build_preview(b"<html></html>", "page.html").await;

    assert_eq!(preview.file_name, "page.html.png");
    let error = preview.error.unwrap();
    assert!(error.starts_with("Failed to convert PDF: Document open error"), "{}", error);
}

#[tokio::test]
async fn test_preview_with_unloadable_engine() {
    let factory = Arc::new(FakeFactory::failing("no engine asset"));
    let loader = loader_for(factory, true);

    let preview = pdf_ingest::preview::build_preview(&loader, FAKE_PDF, "a.pdf", 4.0).await;

    assert_eq!(
        preview.error.as_deref(),
        Some("Failed to convert PDF: Engine load error: no engine asset")
    );
    assert_eq!(
        loader.status(),
        EngineStatus::Failed {
            reason: "no engine asset".to_string()
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_simultaneous_requests_initialize_once() {
    let factory = Arc::new(FakeFactory {
        load_delay: Duration::from_millis(100),
        ..FakeFactory::new(FakeBackend::new(vec![FakePage::text(&["shared"])]))
    });
    let loader = loader_for(factory.clone(), true);
    assert_eq!(loader.status(), EngineStatus::Unloaded);

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let loader = Arc::clone(&loader);
            tokio::spawn(async move { loader.get_engine().await })
        })
        .collect();

    for task in tasks {
        let engine = task.await.unwrap().unwrap();
        assert_eq!(engine.backend_name(), "fake");
    }

    assert_eq!(factory.loads(), 1);
    assert_eq!(
        loader.status(),
        EngineStatus::Ready {
            worker_available: true
        }
    );
}

async fn assert_overlapping_runs_never_share_the_engine(use_worker: bool) {
    let factory = Arc::new(FakeFactory::new(
        FakeBackend::new(vec![FakePage::scanned(), FakePage::text(&["x"]), FakePage::scanned()])
            .with_render_delay(Duration::from_millis(20)),
    ));
    let ocr = Arc::new(ScriptedOcr::new().page(1, "one").page(2, "two").page(3, "three"));
    let pipeline = ExtractionPipeline::new(
        loader_for(factory.clone(), use_worker),
        Arc::new(OcrService::with_providers(vec![ocr as Arc<dyn OcrProvider>], "eng")),
        IngestConfig::default(),
    );

    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.extract_text(FAKE_PDF).await })
        })
        .collect();

    for task in tasks {
        let result = task.await.unwrap().unwrap();
        assert_eq!(result.text, "one\ntwo\nthree");
    }

    assert_eq!(factory.backend.render_calls().len(), 18);
    assert_eq!(factory.backend.max_in_flight(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overlapping_extractions_are_serialized_on_the_worker() {
    assert_overlapping_runs_never_share_the_engine(true).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overlapping_extractions_are_serialized_without_worker() {
    assert_overlapping_runs_never_share_the_engine(false).await;
}

#[tokio::test]
async fn test_retry_enabled_loader_tries_again() {
    let factory = Arc::new(FakeFactory::failing("transient"));
    let loader = EngineLoader::new(
        factory.clone(),
        EngineConfig {
            use_worker: true,
            retry_failed_load: true,
        },
    );

    loader.get_engine().await.unwrap_err();
    loader.get_engine().await.unwrap_err();

    assert_eq!(factory.loads(), 2);
    assert_eq!(loader.load_attempts(), 2);
}

#[test]
fn test_status_serializes_with_state_tag() {
    let json = serde_json::to_value(EngineStatus::Ready {
        worker_available: false,
    })
    .unwrap();
    assert_eq!(json["state"], "ready");
    assert_eq!(json["worker_available"], false);

    let json = serde_json::to_value(EngineStatus::Failed {
        reason: "missing".into(),
    })
    .unwrap();
    assert_eq!(json["state"], "failed");
    assert_eq!(json["reason"], "missing");
}
