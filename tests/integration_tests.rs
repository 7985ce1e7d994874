//! Integration tests for the catalog client
//!
//! These tests run the client against a local mock server and check content
//! negotiation, retry behaviour and pagination end to end.

use cdli_scraper::client::{
    CatalogClient, CatalogError, ObservedEvent, RecordingObserver,
};
use cdli_scraper::models::{
    ArtifactId, BibliographyFormat, FormatSelector, InscriptionFormat, LinkedData,
    LinkedDataFormat, TabularFormat,
};
use cdli_scraper::utils::{HttpClient, RetryConfig};
use mockito::{Matcher, Server};
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

/// Same policy as the default, scaled down to milliseconds
fn fast_retry() -> RetryConfig {
    RetryConfig::default().initial_delay(Duration::from_millis(1))
}

fn client_for(server: &Server, observer: Arc<RecordingObserver>) -> CatalogClient {
    CatalogClient::from_parts(
        HttpClient::new().unwrap(),
        &server.url(),
        fast_retry(),
        observer,
    )
    .unwrap()
}

fn artifact() -> ArtifactId {
    ArtifactId::new("P000001").unwrap()
}

fn page_query(page: u32) -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("page".into(), page.to_string()),
        Matcher::UrlEncoded("page_size".into(), "1000".into()),
    ])
}

#[tokio::test]
async fn test_get_metadata() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/artifacts/P000001")
        .match_header("accept", "application/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "P000001", "type": "artifact"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server, Arc::new(RecordingObserver::new()));
    let metadata = client.get_metadata(&artifact()).await.unwrap();

    assert_eq!(
        metadata,
        serde_json::json!({"id": "P000001", "type": "artifact"})
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_linked_data_defaults_to_jsonld() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/artifacts/P000001")
        .match_header("accept", "application/ld+json")
        .with_status(200)
        .with_body(r#"{"@context": "...", "@id": "..."}"#)
        .create_async()
        .await;

    let client = client_for(&server, Arc::new(RecordingObserver::new()));
    let data = client
        .get_linked_data(&artifact(), LinkedDataFormat::default())
        .await
        .unwrap();

    assert_eq!(
        data,
        LinkedData::Json(serde_json::json!({"@context": "...", "@id": "..."}))
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_linked_data_turtle_is_text() {
    let mut server = Server::new_async().await;
    let body = "@prefix cdli: <https://cdli.mpiwg-berlin.mpg.de/> .\n";
    let mock = server
        .mock("GET", "/artifacts/P000001")
        .match_header("accept", "text/turtle")
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let client = client_for(&server, Arc::new(RecordingObserver::new()));
    let data = client
        .get_linked_data(&artifact(), LinkedDataFormat::from_tag("turtle"))
        .await
        .unwrap();

    assert_eq!(data.as_text(), Some(body));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_bibliography_sends_each_accept_header() {
    let mut server = Server::new_async().await;
    let client = client_for(&server, Arc::new(RecordingObserver::new()));

    for format in BibliographyFormat::ALL {
        let body = format!("bibliography as {}", format);
        let mock = server
            .mock("GET", "/artifacts/P000001/bibliography")
            .match_header("accept", format.accept())
            .with_status(200)
            .with_body(&body)
            .expect(1)
            .create_async()
            .await;

        let text = client.get_bibliography(&artifact(), *format).await.unwrap();
        assert_eq!(text, body);
        mock.assert_async().await;
        mock.remove_async().await;
    }
}

#[tokio::test]
async fn test_get_inscription_defaults_to_atf() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/artifacts/P000001/inscription")
        .match_header("accept", "text/x-c-atf")
        .with_status(200)
        .with_body("&P000001 = ...")
        .create_async()
        .await;

    let client = client_for(&server, Arc::new(RecordingObserver::new()));
    let text = client
        .get_inscription(&artifact(), InscriptionFormat::from_tag("unknown"))
        .await
        .unwrap();

    assert_eq!(text, "&P000001 = ...");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_tabular_export_csv_and_tsv() {
    let mut server = Server::new_async().await;
    let csv = server
        .mock("GET", "/artifacts")
        .match_header("accept", "text/csv")
        .with_status(200)
        .with_body("id,type\nP000001,artifact")
        .create_async()
        .await;
    let tsv = server
        .mock("GET", "/artifacts")
        .match_header("accept", "text/tab-separated-values")
        .with_status(200)
        .with_body("id\ttype\nP000001\tartifact")
        .create_async()
        .await;

    let client = client_for(&server, Arc::new(RecordingObserver::new()));
    let from_csv = client
        .get_tabular_export("artifacts", TabularFormat::Csv)
        .await
        .unwrap();
    let from_tsv = client
        .get_tabular_export("artifacts", TabularFormat::Tsv)
        .await
        .unwrap();

    assert_eq!(from_csv.columns(), &["id", "type"]);
    assert_eq!(from_csv.len(), 1);
    assert_eq!(from_csv.get(0, "id"), Some("P000001"));
    assert_eq!(from_csv.get(0, "type"), Some("artifact"));
    assert_eq!(from_csv, from_tsv);
    csv.assert_async().await;
    tsv.assert_async().await;
}

#[tokio::test]
async fn test_unknown_tabular_format_requests_csv() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/artifacts")
        .match_header("accept", "text/csv")
        .with_status(200)
        .with_body("id\nP1\n")
        .create_async()
        .await;

    let client = client_for(&server, Arc::new(RecordingObserver::new()));
    let table = client
        .get_tabular_export("", TabularFormat::from_tag("parquet"))
        .await
        .unwrap();

    assert_eq!(table.len(), 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_xlsx_garbage_is_decode_failure() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/artifacts")
        .match_header(
            "accept",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        )
        .with_status(200)
        .with_body("excel_content")
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server, Arc::new(RecordingObserver::new()));
    let result = client
        .get_tabular_export("artifacts", TabularFormat::Xlsx)
        .await;

    assert!(matches!(result, Err(CatalogError::Decode(_))));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_always_failing_request_gives_up_after_max_attempts() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/artifacts/P000001/bibliography")
        .with_status(500)
        .with_body("Internal Server Error")
        .expect(3)
        .create_async()
        .await;

    let observer = Arc::new(RecordingObserver::new());
    let client = client_for(&server, observer.clone());
    let error = client
        .get_bibliography(&artifact(), BibliographyFormat::Bibtex)
        .await
        .unwrap_err();

    assert!(matches!(error, CatalogError::Request { .. }));
    assert_eq!(error.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(observer.request_count(), 3);
    assert_eq!(
        observer.retry_delays(),
        vec![Duration::from_millis(1), Duration::from_millis(2)]
    );
    assert_eq!(
        observer.events().last(),
        Some(&ObservedEvent::GiveUp { attempts: 3 })
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_connection_failure_is_request_failure() {
    let observer = Arc::new(RecordingObserver::new());
    let client = CatalogClient::from_parts(
        HttpClient::new().unwrap(),
        "http://127.0.0.1:1",
        fast_retry(),
        observer.clone(),
    )
    .unwrap();

    let error = client.get_metadata(&artifact()).await.unwrap_err();

    assert!(error.is_transient());
    assert_eq!(error.status(), None);
    assert_eq!(observer.request_count(), 3);
}

#[tokio::test]
async fn test_malformed_json_is_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/artifacts/P000001")
        .with_status(200)
        .with_body("{not json")
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server, Arc::new(RecordingObserver::new()));
    let result = client.get_metadata(&artifact()).await;

    assert!(matches!(result, Err(CatalogError::Decode(_))));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_not_found_outside_pagination_is_an_error() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/artifacts/P999999/inscription")
        .with_status(404)
        .expect(3)
        .create_async()
        .await;

    let client = client_for(&server, Arc::new(RecordingObserver::new()));
    let id = ArtifactId::new("P999999").unwrap();
    let error = client
        .get_inscription(&id, InscriptionFormat::Atf)
        .await
        .unwrap_err();

    assert!(error.is_not_found());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_paginated_export_stops_at_not_found() {
    let mut server = Server::new_async().await;
    let page1 = server
        .mock("GET", "/artifacts")
        .match_query(page_query(1))
        .match_header("accept", "text/csv")
        .with_status(200)
        .with_body("id,type\nP000001,tablet\nP000002,seal\n")
        .expect(1)
        .create_async()
        .await;
    let page2 = server
        .mock("GET", "/artifacts")
        .match_query(page_query(2))
        .with_status(200)
        .with_body("id,type\nP000003,cone\n")
        .expect(1)
        .create_async()
        .await;
    // Every attempt of the retry budget sees the 404.
    let page3 = server
        .mock("GET", "/artifacts")
        .match_query(page_query(3))
        .with_status(404)
        .expect(3)
        .create_async()
        .await;

    let observer = Arc::new(RecordingObserver::new());
    let client = client_for(&server, observer.clone());
    let table = assert_ok!(client.get_all_artifacts(TabularFormat::Csv).await);

    let ids: Vec<_> = (0..table.len())
        .map(|row| table.get(row, "id").unwrap())
        .collect();
    assert_eq!(ids, vec!["P000001", "P000002", "P000003"]);
    assert_eq!(table.columns(), &["id", "type"]);

    let events = observer.events();
    assert!(events.contains(&ObservedEvent::Page { page: 1, rows: 2 }));
    assert!(events.contains(&ObservedEvent::Page { page: 2, rows: 1 }));
    assert_eq!(events.last(), Some(&ObservedEvent::EndOfResults { page: 3 }));

    page1.assert_async().await;
    page2.assert_async().await;
    page3.assert_async().await;
}

#[tokio::test]
async fn test_paginated_export_stops_at_empty_page() {
    let mut server = Server::new_async().await;
    let page1 = server
        .mock("GET", "/artifacts")
        .match_query(page_query(1))
        .match_header("accept", "text/tab-separated-values")
        .with_status(200)
        .with_body("id\ttype\nP000001\ttablet\n")
        .expect(1)
        .create_async()
        .await;
    let page2 = server
        .mock("GET", "/artifacts")
        .match_query(page_query(2))
        .with_status(200)
        .with_body("id\ttype\n")
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server, Arc::new(RecordingObserver::new()));
    let table = client.get_all_artifacts(TabularFormat::Tsv).await.unwrap();

    assert_eq!(table.len(), 1);
    assert_eq!(table.get(0, "type"), Some("tablet"));
    page1.assert_async().await;
    page2.assert_async().await;
}

#[tokio::test]
async fn test_paginated_xlsx_export() {
    let workbook = include_bytes!("fixtures/artifacts.xlsx").to_vec();
    let xlsx = TabularFormat::Xlsx.accept();

    let mut server = Server::new_async().await;
    let page1 = server
        .mock("GET", "/artifacts")
        .match_query(page_query(1))
        .match_header("accept", xlsx)
        .with_status(200)
        .with_body(workbook.clone())
        .expect(1)
        .create_async()
        .await;
    let page2 = server
        .mock("GET", "/artifacts")
        .match_query(page_query(2))
        .match_header("accept", xlsx)
        .with_status(200)
        .with_body(workbook)
        .expect(1)
        .create_async()
        .await;
    let page3 = server
        .mock("GET", "/artifacts")
        .match_query(page_query(3))
        .with_status(404)
        .expect(3)
        .create_async()
        .await;

    let client = client_for(&server, Arc::new(RecordingObserver::new()));
    let table = assert_ok!(client.get_all_artifacts(TabularFormat::Xlsx).await);

    assert_eq!(table.columns(), &["id", "type"]);
    assert_eq!(table.len(), 2);
    assert_eq!(table.get(0, "id"), Some("P000001"));
    assert_eq!(table.get(1, "type"), Some("artifact"));

    page1.assert_async().await;
    page2.assert_async().await;
    page3.assert_async().await;
}

#[tokio::test]
async fn test_paginated_export_with_no_pages_is_empty() {
    let mut server = Server::new_async().await;
    let page1 = server
        .mock("GET", "/artifacts")
        .match_query(page_query(1))
        .with_status(404)
        .expect(3)
        .create_async()
        .await;

    let client = client_for(&server, Arc::new(RecordingObserver::new()));
    let table = client.get_all_artifacts(TabularFormat::Csv).await.unwrap();

    assert!(table.is_empty());
    assert!(table.columns().is_empty());
    page1.assert_async().await;
}

#[tokio::test]
async fn test_paginated_export_server_error_on_first_page() {
    let mut server = Server::new_async().await;
    let page1 = server
        .mock("GET", "/artifacts")
        .match_query(page_query(1))
        .with_status(500)
        .expect(3)
        .create_async()
        .await;

    let client = client_for(&server, Arc::new(RecordingObserver::new()));
    let error = assert_err!(client.get_all_artifacts(TabularFormat::Csv).await);

    assert_eq!(error.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    page1.assert_async().await;
}

#[tokio::test]
async fn test_paginated_export_discards_pages_on_later_failure() {
    let mut server = Server::new_async().await;
    let page1 = server
        .mock("GET", "/artifacts")
        .match_query(page_query(1))
        .with_status(200)
        .with_body("id\nP000001\n")
        .expect(1)
        .create_async()
        .await;
    let page2 = server
        .mock("GET", "/artifacts")
        .match_query(page_query(2))
        .with_status(503)
        .expect(3)
        .create_async()
        .await;

    let client = client_for(&server, Arc::new(RecordingObserver::new()));
    let result = client.get_all_artifacts(TabularFormat::Csv).await;

    let error = assert_err!(result);
    assert_eq!(error.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    page1.assert_async().await;
    page2.assert_async().await;
}

#[tokio::test]
async fn test_page_size_is_sent_as_query() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/artifacts")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".into(), "4".into()),
            Matcher::UrlEncoded("page_size".into(), "25".into()),
        ]))
        .with_status(200)
        .with_body("id\nP1\n")
        .create_async()
        .await;

    let client = client_for(&server, Arc::new(RecordingObserver::new())).with_page_size(25);
    let table = client.get_page(TabularFormat::Csv, 4).await.unwrap();

    assert_eq!(table.len(), 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_repeated_calls_are_identical() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/artifacts/P000001/bibliography")
        .with_status(200)
        .with_body("@article{cdli:P000001, title = {Ur III tablet}}")
        .expect(2)
        .create_async()
        .await;

    let client = client_for(&server, Arc::new(RecordingObserver::new()));
    let first = client
        .get_bibliography(&artifact(), BibliographyFormat::Bibtex)
        .await
        .unwrap();
    let second = client
        .get_bibliography(&artifact(), BibliographyFormat::Bibtex)
        .await
        .unwrap();

    assert_eq!(first.as_bytes(), second.as_bytes());
    mock.assert_async().await;
}
