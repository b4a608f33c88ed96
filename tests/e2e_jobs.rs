// StockSync - tests/e2e_jobs.rs
//
// End-to-end tests for the processing and analytics pipelines.
//
// These tests run the real `BackendClient` against a local mock HTTP
// server: real multipart uploads read from files on disk, real
// Content-Disposition parsing, real ledger transitions and the real
// analytics fan-out. Only the backend itself is simulated.

use mockito::Matcher;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use stocksync::core::analytics::AnalyticsRegistry;
use stocksync::core::export::{export_rupture, ExportFormat};
use stocksync::core::fanout::{self, FanoutOutcome, FanoutPolicy};
use stocksync::core::ledger::JobLedger;
use stocksync::core::model::{InputFile, JobStatus};
use stocksync::core::processor::ProcessorKind;
use stocksync::core::rupture::RuptureSeries;
use stocksync::core::submission::SubmissionUnit;
use stocksync::platform::backend::{BackendClient, StockRuptureFetcher, STOCK_RUPTURES_ENDPOINT};
use stocksync::util::error::BackendError;
use tempfile::TempDir;

// =============================================================================
// Helpers
// =============================================================================

/// Write a small spreadsheet stand-in and return it as an input file.
fn input(dir: &TempDir, name: &str, contents: &str) -> InputFile {
    let path: PathBuf = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    InputFile::from_path(path)
}

fn client(server: &mockito::Server) -> BackendClient {
    BackendClient::new(&server.url(), Duration::from_secs(10)).unwrap()
}

// =============================================================================
// Processors
// =============================================================================

#[tokio::test]
async fn test_global_orders_uploads_both_files_and_records_success() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/processors/global_orders")
        .match_header("content-type", Matcher::Regex("multipart/form-data".into()))
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="me2n_file"; filename="me2n.xlsx""#.into()),
            Matcher::Regex(r#"name="ebm_file"; filename="ebm.xlsx""#.into()),
            Matcher::Regex("ME2N-ROWS".into()),
        ]))
        .with_status(200)
        .with_header(
            "content-type",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        )
        .with_header("content-disposition", r#"attachment; filename="global_orders.xlsx""#)
        .with_body("PK-fake-workbook")
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let backend = client(&server);
    let mut ledger = JobLedger::new();
    let mut unit = SubmissionUnit::new(ProcessorKind::GlobalOrders);
    assert!(unit.select("me2n", input(&dir, "me2n.xlsx", "ME2N-ROWS")));
    assert!(unit.select("ebm", input(&dir, "ebm.xlsx", "EBM-ROWS")));

    let id = unit
        .submit(&mut ledger, "Global Orders", &backend)
        .await
        .expect("card was ready");

    mock.assert_async().await;
    let record = ledger.get(&id).unwrap();
    assert_eq!(record.status, JobStatus::Success);
    assert_eq!(record.input_files, vec!["me2n.xlsx", "ebm.xlsx"]);
    let artifact = record.output.as_ref().unwrap();
    assert_eq!(artifact.bytes, b"PK-fake-workbook");
    assert_eq!(artifact.file_name.as_deref(), Some("global_orders.xlsx"));
    assert_eq!(record.download_name().unwrap(), format!("global-orders-{id}.xlsx"));
    assert!(unit.selection("me2n").is_none(), "card resets after completion");
}

#[tokio::test]
async fn test_mb51_sends_movement_type() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/processors/mb51")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="movement_type""#.into()),
            Matcher::Regex("122".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "text/csv")
        .with_body("a,b\n")
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let backend = client(&server);
    let mut ledger = JobLedger::new();
    let mut unit = SubmissionUnit::new(ProcessorKind::Mb51);
    unit.movement_type = 122;
    unit.select("mb51", input(&dir, "mb51.csv", "x"));

    let id = unit.submit(&mut ledger, "MB51", &backend).await.unwrap();
    mock.assert_async().await;
    assert_eq!(ledger.get(&id).unwrap().output.as_ref().unwrap().extension(), "csv");
}

#[tokio::test]
async fn test_backend_error_body_becomes_record_error() {
    let mut server = mockito::Server::new_async().await;
    let _with_message = server
        .mock("POST", "/processors/mb52")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error": "Missing column 'Storage Location'"}"#)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let backend = client(&server);
    let mut ledger = JobLedger::new();
    let mut unit = SubmissionUnit::new(ProcessorKind::Mb52);
    unit.select("mb52", input(&dir, "mb52.xlsx", "x"));

    let id = unit.submit(&mut ledger, "MB52", &backend).await.unwrap();
    let record = ledger.get(&id).unwrap();
    assert_eq!(record.status, JobStatus::Error);
    assert_eq!(record.error.as_deref(), Some("Missing column 'Storage Location'"));
    assert!(record.output.is_none());
}

#[tokio::test]
async fn test_error_without_json_body_uses_status_fallback() {
    let mut server = mockito::Server::new_async().await;
    let _plain = server
        .mock("POST", "/processors/mb52")
        .with_status(500)
        .with_body("Internal Server Error")
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let backend = client(&server);
    let mut ledger = JobLedger::new();
    let mut unit = SubmissionUnit::new(ProcessorKind::Mb52);
    unit.select("mb52", input(&dir, "mb52.xlsx", "x"));

    let id = unit.submit(&mut ledger, "MB52", &backend).await.unwrap();
    assert_eq!(
        ledger.get(&id).unwrap().error.as_deref(),
        Some("Server responded with status 500")
    );
}

#[tokio::test]
async fn test_unreadable_input_fails_before_any_request() {
    let mut server = mockito::Server::new_async().await;
    let never = server
        .mock("POST", "/processors/mb52")
        .expect(0)
        .create_async()
        .await;

    let backend = client(&server);
    let mut ledger = JobLedger::new();
    let mut unit = SubmissionUnit::new(ProcessorKind::Mb52);
    unit.select("mb52", InputFile::from_path("/definitely/not/here/mb52.xlsx"));

    let id = unit.submit(&mut ledger, "MB52", &backend).await.unwrap();
    never.assert_async().await;
    let record = ledger.get(&id).unwrap();
    assert_eq!(record.status, JobStatus::Error);
    assert!(record.error.as_deref().unwrap().contains("mb52.xlsx"));
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    // Port 9 (discard) is essentially never listening locally.
    let backend = BackendClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
    let dir = TempDir::new().unwrap();
    let file = input(&dir, "etat.xlsx", "x");
    let err = backend.stock_ruptures(&file).await.unwrap_err();
    assert!(matches!(err, BackendError::Transport { .. }));
}

// =============================================================================
// Analytics
// =============================================================================

#[tokio::test]
async fn test_stock_ruptures_fanout_to_export() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", STOCK_RUPTURES_ENDPOINT)
        .match_body(Matcher::Regex(r#"name="file"; filename="etat.xlsx""#.into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "2025-01-03": {"Test": 1, "PDR": 0, "Other": 2},
                "2025-01-02": {"Test": 4, "PDR": 1, "Other": 0}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let backend = Arc::new(client(&server));
    let registry = AnalyticsRegistry::builtin(Arc::new(StockRuptureFetcher::new(backend)));
    let group = registry.group("etat-journalier").unwrap();
    let file = input(&dir, "etat.xlsx", "x");

    let outcome = fanout::run_with_policy(group, &file, FanoutPolicy::AllOrNothing).await;
    mock.assert_async().await;

    let results = outcome.results().expect("completed");
    assert_eq!(results.len(), 1, "planned modules never run");
    let series = RuptureSeries::from_payload(&results["stock-ruptures"]).unwrap();
    assert_eq!(series.rows()[0].raw_date, "2025-01-02");
    assert_eq!(series.totals("").all, 8);

    let now = chrono::Local::now();
    let csv = export_rupture(&series, "", ExportFormat::Csv, now).unwrap();
    let text = String::from_utf8(csv.bytes).unwrap();
    assert!(text.starts_with("Date,Test,PDR,Other,Total"));
    assert!(text.trim_end().ends_with("Total,5,1,2,8"));
}

#[tokio::test]
async fn test_stock_ruptures_failure_fails_the_run() {
    let mut server = mockito::Server::new_async().await;
    let _fail = server
        .mock("POST", STOCK_RUPTURES_ENDPOINT)
        .with_status(422)
        .with_body(r#"{"error": "Not an Etat Journalier report"}"#)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let registry = AnalyticsRegistry::builtin(Arc::new(StockRuptureFetcher::new(Arc::new(
        client(&server),
    ))));
    let group = registry.group("etat-journalier").unwrap();
    let file = input(&dir, "etat.xlsx", "x");

    for policy in [FanoutPolicy::AllOrNothing, FanoutPolicy::TolerateFailures] {
        match fanout::run_with_policy(group, &file, policy).await {
            FanoutOutcome::Failed(f) => {
                assert_eq!(f.module_id, "stock-ruptures");
                assert_eq!(f.message, "Not an Etat Journalier report");
            }
            other => panic!("expected failure under {policy:?}, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_empty_rupture_payload_is_no_data() {
    let mut server = mockito::Server::new_async().await;
    let _empty = server
        .mock("POST", STOCK_RUPTURES_ENDPOINT)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("{}")
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let registry = AnalyticsRegistry::builtin(Arc::new(StockRuptureFetcher::new(Arc::new(
        client(&server),
    ))));
    let group = registry.group("etat-journalier").unwrap();
    let outcome = fanout::run_with_policy(group, &input(&dir, "etat.xlsx", "x"), FanoutPolicy::AllOrNothing).await;
    assert!(matches!(outcome, FanoutOutcome::NoData { .. }));
}

#[tokio::test]
async fn test_shutdown_hits_kill_endpoint() {
    let mut server = mockito::Server::new_async().await;
    let kys = server
        .mock("GET", "/kys")
        .with_status(200)
        .create_async()
        .await;
    client(&server).shutdown().await.unwrap();
    kys.assert_async().await;
}
