//! Orchestrator and page-pipeline behaviour against in-memory fakes.

mod common;

use common::{init_tracing, orchestrator, FakeDecoder, FakePage, ScriptedOcr, PDF_BYTES};
use pdfglance::{
    event_channel, BlockOrder, ExtractError, ExtractionConfig, OcrError, ProgressEvent,
    Provenance, RunState,
};
use std::time::Duration;

fn scan_scenario() -> (FakeDecoder, ScriptedOcr) {
    let decoder = FakeDecoder::new(vec![
        FakePage::text("Hello"),
        FakePage::image_only(),
        FakePage::text("World"),
    ]);
    let ocr = ScriptedOcr::new()
        .answer(2, "Scanned")
        .delay(2, Duration::from_millis(20));
    (decoder, ocr)
}

#[tokio::test]
async fn page_order_interleaves_ocr_by_page() {
    init_tracing();
    let (decoder, ocr) = scan_scenario();
    let orch = orchestrator(decoder, ocr, ExtractionConfig::default());

    let report = tokio_test::assert_ok!(orch.extract_bytes("scan.pdf", PDF_BYTES.to_vec()).await);

    assert_eq!(
        report.text,
        "Page 1:\nHello\n\nOCR Text from page 2:\nScanned\n\nPage 3:\nWorld\n\n"
    );
    assert_eq!(report.blocks.pages_with(Provenance::Ocr), vec![2]);
    assert_eq!(report.stats.native_pages, 2);
    assert_eq!(report.stats.ocr_pages, 1);
    assert_eq!(report.document.page_count, 3);
    assert!(report.ocr_errors.is_empty());
}

#[tokio::test]
async fn arrival_order_allows_either_ocr_position() {
    let (decoder, ocr) = scan_scenario();
    let config = ExtractionConfig::builder()
        .block_order(BlockOrder::Arrival)
        .build()
        .unwrap();
    let orch = orchestrator(decoder, ocr, config);

    let report = orch.extract_bytes("scan.pdf", PDF_BYTES.to_vec()).await.unwrap();

    let allowed = [
        "Page 1:\nHello\n\nOCR Text from page 2:\nScanned\n\nPage 3:\nWorld\n\n",
        "Page 1:\nHello\n\nPage 3:\nWorld\n\nOCR Text from page 2:\nScanned\n\n",
    ];
    assert!(
        allowed.contains(&report.text.as_str()),
        "unexpected order: {:?}",
        report.text
    );
    let native = report.blocks.pages_with(Provenance::Native);
    assert_eq!(native, vec![1, 3]);
}

#[tokio::test]
async fn arrival_order_lands_fast_ocr_before_later_pages() {
    let decoder = FakeDecoder::new(vec![
        FakePage::text("Hello"),
        FakePage::image_only(),
        FakePage::text("World"),
    ])
    .with_text_delay(Duration::from_millis(30));
    let ocr = ScriptedOcr::new().answer(2, "Scanned");
    let config = ExtractionConfig::builder()
        .block_order(BlockOrder::Arrival)
        .build()
        .unwrap();
    let orch = orchestrator(decoder, ocr, config);

    let report = orch.extract_bytes("scan.pdf", PDF_BYTES.to_vec()).await.unwrap();

    assert_eq!(
        report.text,
        "Page 1:\nHello\n\nOCR Text from page 2:\nScanned\n\nPage 3:\nWorld\n\n"
    );
}

#[tokio::test]
async fn fragments_are_joined_with_single_spaces() {
    let decoder = FakeDecoder::new(vec![FakePage::text("Quarterly results were strong")]);
    let orch = orchestrator(decoder, ScriptedOcr::new(), ExtractionConfig::default());

    let report = orch.extract_bytes("q.pdf", PDF_BYTES.to_vec()).await.unwrap();
    assert_eq!(report.text, "Page 1:\nQuarterly results were strong\n\n");
}

#[tokio::test]
async fn native_text_keeps_surrounding_whitespace() {
    let page = FakePage {
        fragments: vec!["".into(), "Hello".into(), "".into()],
        ..FakePage::default()
    };
    let orch = orchestrator(
        FakeDecoder::new(vec![page]),
        ScriptedOcr::new(),
        ExtractionConfig::default(),
    );

    let report = orch.extract_bytes("pad.pdf", PDF_BYTES.to_vec()).await.unwrap();
    assert_eq!(report.text, "Page 1:\n Hello \n\n");
    assert_eq!(report.summary, report.text);
}

#[tokio::test]
async fn whitespace_only_page_falls_back_to_ocr() {
    let page = FakePage {
        fragments: vec!["".into(), " ".into()],
        ..FakePage::default()
    };
    let orch = orchestrator(
        FakeDecoder::new(vec![page, FakePage::text("Body")]),
        ScriptedOcr::new().answer(1, "Scan"),
        ExtractionConfig::default(),
    );

    let report = orch.extract_bytes("pad.pdf", PDF_BYTES.to_vec()).await.unwrap();
    assert_eq!(report.text, "OCR Text from page 1:\nScan\n\nPage 2:\nBody\n\n");
    assert_eq!(report.stats.native_pages, 1);
    assert_eq!(report.stats.ocr_pages, 1);
}

#[tokio::test]
async fn nothing_to_read_fails_and_resets() {
    let decoder = FakeDecoder::new(vec![FakePage::image_only(), FakePage::image_only()]);
    let orch = orchestrator(decoder, ScriptedOcr::new(), ExtractionConfig::default());

    let err = orch.extract_bytes("blank.pdf", PDF_BYTES.to_vec()).await.unwrap_err();

    assert!(matches!(err, ExtractError::NoTextExtracted { pages: 2 }));
    assert!(orch.trigger_enabled());
    assert_eq!(orch.state(), RunState::Idle);
}

#[tokio::test]
async fn ocr_only_document_succeeds() {
    let decoder = FakeDecoder::new(vec![FakePage::image_only()]);
    let ocr = ScriptedOcr::new().answer(1, "Invoice 42");
    let orch = orchestrator(decoder, ocr, ExtractionConfig::default());

    let report = orch.extract_bytes("invoice.pdf", PDF_BYTES.to_vec()).await.unwrap();
    assert_eq!(report.text, "OCR Text from page 1:\nInvoice 42\n\n");
}

#[tokio::test]
async fn ocr_failure_costs_only_its_page() {
    let decoder = FakeDecoder::new(vec![
        FakePage::text("Intro"),
        FakePage::image_only(),
        FakePage::text("Outro"),
    ]);
    init_tracing();
    let ocr = ScriptedOcr::new().fail(2, "engine crashed");
    let (tx, mut rx) = event_channel();
    let config = ExtractionConfig::builder().events(tx).build().unwrap();
    let orch = orchestrator(decoder, ocr, config);

    let report = orch.extract_bytes("mixed.pdf", PDF_BYTES.to_vec()).await.unwrap();

    assert_eq!(report.text, "Page 1:\nIntro\n\nPage 3:\nOutro\n\n");
    assert_eq!(report.stats.ocr_failed_pages, 1);
    assert_eq!(report.ocr_errors.len(), 1);
    assert!(matches!(
        report.ocr_errors[0],
        OcrError::RecognitionFailed { page: 2, .. }
    ));

    let mut saw_failure = false;
    while let Ok(event) = rx.try_recv() {
        if let ProgressEvent::OcrFailed { page, .. } = event {
            saw_failure = page == 2;
        }
    }
    assert!(saw_failure);
}

#[tokio::test]
async fn text_layer_failure_aborts_the_run() {
    let decoder = FakeDecoder::new(vec![FakePage::text("Fine"), FakePage::broken_text()]);
    let orch = orchestrator(decoder, ScriptedOcr::new(), ExtractionConfig::default());

    let err = tokio_test::assert_err!(orch.extract_bytes("bad.pdf", PDF_BYTES.to_vec()).await);

    assert!(matches!(err, ExtractError::TextContentFailed { page: 2, .. }));
    assert!(orch.trigger_enabled());
    assert_eq!(orch.state(), RunState::Idle);
}

#[tokio::test]
async fn render_failure_aborts_the_run() {
    let decoder = FakeDecoder::new(vec![FakePage::text("Fine"), FakePage::broken_render()]);
    let ocr = ScriptedOcr::new().answer(2, "never seen");
    let orch = orchestrator(decoder, ocr, ExtractionConfig::default());

    let err = orch.extract_bytes("bad.pdf", PDF_BYTES.to_vec()).await.unwrap_err();
    assert!(matches!(err, ExtractError::RenderFailed { page: 2, .. }));
    assert!(orch.trigger_enabled());
}

#[tokio::test]
async fn second_trigger_while_running_is_busy() {
    let decoder = FakeDecoder::new(vec![FakePage::text("Hello"), FakePage::text("World")])
        .with_text_delay(Duration::from_millis(20));
    let orch = orchestrator(decoder, ScriptedOcr::new(), ExtractionConfig::default());

    let (first, second) = tokio::join!(
        orch.extract_bytes("a.pdf", PDF_BYTES.to_vec()),
        orch.extract_bytes("b.pdf", PDF_BYTES.to_vec()),
    );

    let report = first.expect("first run completes");
    assert_eq!(report.text, "Page 1:\nHello\n\nPage 2:\nWorld\n\n");
    assert!(matches!(second, Err(ExtractError::Busy)));
    assert!(orch.trigger_enabled());
    assert_eq!(orch.state(), RunState::Idle);
}

#[tokio::test]
async fn trigger_is_disabled_while_running() {
    let decoder = FakeDecoder::new(vec![FakePage::text("Slow")])
        .with_text_delay(Duration::from_millis(30));
    let orch = orchestrator(decoder, ScriptedOcr::new(), ExtractionConfig::default());

    let run = orch.extract_bytes("slow.pdf", PDF_BYTES.to_vec());
    let probe = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        (orch.trigger_enabled(), orch.state())
    };
    let (result, (enabled, state)) = tokio::join!(run, probe);

    assert!(result.is_ok());
    assert!(!enabled);
    assert_eq!(state, RunState::Extracting);
    assert!(orch.trigger_enabled());
}

#[tokio::test]
async fn successful_run_walks_every_state() {
    let (tx, mut rx) = event_channel();
    let config = ExtractionConfig::builder().events(tx).build().unwrap();
    let orch = orchestrator(
        FakeDecoder::new(vec![FakePage::text("Hello")]),
        ScriptedOcr::new(),
        config,
    );

    orch.extract_bytes("a.pdf", PDF_BYTES.to_vec()).await.unwrap();

    let mut states = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let ProgressEvent::StateChanged { state } = event {
            states.push(state);
        }
    }
    assert_eq!(
        states,
        vec![
            RunState::Loading,
            RunState::Extracting,
            RunState::Summarizing,
            RunState::Idle
        ]
    );
}

#[tokio::test]
async fn summary_and_chart_come_from_rendered_text() {
    let decoder = FakeDecoder::new(vec![FakePage::text(
        "Revenue was 120.5 and costs were 80 last year",
    )]);
    let orch = orchestrator(decoder, ScriptedOcr::new(), ExtractionConfig::default());

    let report = orch.extract_bytes("r.pdf", PDF_BYTES.to_vec()).await.unwrap();

    assert_eq!(report.summary, report.text);
    let chart = report.chart.expect("chart dataset");
    // The page header number is part of the scanned text.
    assert_eq!(chart.values, vec![1.0, 120.5, 80.0]);
    assert_eq!(chart.labels, vec!["Data 1", "Data 2", "Data 3"]);
    assert_eq!(chart.colors, vec!["#FF5733", "#33FF57", "#3357FF"]);
}

#[tokio::test]
async fn long_text_is_truncated_in_summary() {
    let long = vec!["word"; 200].join(" ");
    let decoder = FakeDecoder::new(vec![FakePage::text(&long)]);
    let orch = orchestrator(decoder, ScriptedOcr::new(), ExtractionConfig::default());

    let report = orch.extract_bytes("long.pdf", PDF_BYTES.to_vec()).await.unwrap();

    assert_eq!(report.summary.chars().count(), 503);
    assert!(report.summary.ends_with("..."));
    assert!(report.text.starts_with(&report.summary[..500]));
}

#[tokio::test]
async fn missing_selection_leaves_everything_idle() {
    let orch = orchestrator(
        FakeDecoder::new(vec![FakePage::text("Hello")]),
        ScriptedOcr::new(),
        ExtractionConfig::default(),
    );

    let err = orch.extract(None).await.unwrap_err();
    assert_eq!(err.to_string(), "Please select a PDF file.");
    assert!(orch.trigger_enabled());
    assert_eq!(orch.state(), RunState::Idle);
}

#[tokio::test]
async fn extract_reads_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.pdf");
    std::fs::write(&path, PDF_BYTES).unwrap();

    let orch = orchestrator(
        FakeDecoder::new(vec![FakePage::text("From disk")]),
        ScriptedOcr::new(),
        ExtractionConfig::default(),
    );
    let report = orch.extract(Some(&path)).await.unwrap();

    assert_eq!(report.document.file_name, "report.pdf");
    assert_eq!(report.document.byte_len, PDF_BYTES.len());
    assert_eq!(report.text, "Page 1:\nFrom disk\n\n");
}

#[tokio::test]
async fn report_serialises_to_json() {
    let (decoder, ocr) = scan_scenario();
    let orch = orchestrator(decoder, ocr, ExtractionConfig::default());
    let report = orch.extract_bytes("scan.pdf", PDF_BYTES.to_vec()).await.unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["document"]["page_count"], 3);
    assert_eq!(json["blocks"][1]["provenance"], "ocr");
    assert_eq!(json["stats"]["ocr_pages"], 1);
}
