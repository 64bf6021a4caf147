//! Acquisition through the documents API against a mock portal.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use eta_export::portal::{
    AggregationPipeline, BatchProgress, BrowsingContext, BrowsingContextFactory, EndpointContext,
    EndpointObserver, ObservedRequest, OutOfBandPageLoader, PageFetcher, PipelineSettings,
    ProgressSink, StaticPage,
};
use eta_export::scrapers::HttpClient;

const TOKEN: &str = "Bearer test-token";

struct NoContexts;

#[async_trait]
impl BrowsingContextFactory for NoContexts {
    async fn open(&self, url: &str) -> anyhow::Result<Box<dyn BrowsingContext>> {
        anyhow::bail!("unexpected out-of-band load of {}", url)
    }
}

#[derive(Default)]
struct Recorder(Mutex<Vec<BatchProgress>>);

impl ProgressSink for Recorder {
    fn notify(&self, progress: &BatchProgress) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(*progress);
        Ok(())
    }
}

fn items(page: u32, count: usize) -> Value {
    let items: Vec<Value> = (0..count)
        .map(|index| {
            json!({
                "uuid": format!("UUID-{}-{}", page, index),
                "internalId": format!("INV-{}-{}", page, index),
                "typeName": "I",
                "status": "Valid",
                "dateTimeIssued": "2024-03-05T10:00:00Z",
                "total": 114,
                "totalSales": 100,
                "issuerName": "Seller Co",
                "receiverName": "Buyer Co",
            })
        })
        .collect();
    json!({ "items": items })
}

async fn mount_page(server: &MockServer, page: u32, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/api/v1/documents/recent"))
        .and(query_param("page", page.to_string()))
        .and(query_param("pageSize", "50"))
        .and(header("authorization", TOKEN))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Endpoint state as the network tap would have left it.
fn discovered_endpoint(server: &MockServer) -> EndpointContext {
    let observer = EndpointObserver::new(EndpointContext::new());
    let request = ObservedRequest::new(format!(
        "{}/api/v1/documents/recent?page=1&pageSize=10",
        server.uri()
    ))
    .with_header("Authorization", TOKEN);
    assert!(observer.observe(&request));
    observer.context().clone()
}

fn pipeline(endpoint: EndpointContext, total: u64) -> AggregationPipeline {
    let host = Arc::new(StaticPage::new(
        "https://invoicing.eta.gov.eg/documents/recent",
        format!("<div class=\"results\">Results: {}</div>", total),
    ));
    let client = HttpClient::new(Duration::from_secs(5)).unwrap();
    AggregationPipeline::new(
        host,
        endpoint.clone(),
        PageFetcher::new(client, endpoint),
        OutOfBandPageLoader::new(Arc::new(NoContexts)),
        PipelineSettings::default(),
    )
}

#[tokio::test]
async fn test_three_api_pages_yield_120_ordered_records() {
    let server = MockServer::start().await;
    mount_page(&server, 1, ResponseTemplate::new(200).set_body_json(items(1, 50))).await;
    mount_page(&server, 2, ResponseTemplate::new(200).set_body_json(items(2, 50))).await;
    mount_page(
        &server,
        3,
        ResponseTemplate::new(200)
            .set_body_json(items(3, 20))
            .set_delay(Duration::from_millis(50)),
    )
    .await;

    let endpoint = discovered_endpoint(&server);
    assert!(endpoint.snapshot().is_ready());

    let pipeline = pipeline(endpoint, 120);
    let recorder = Recorder::default();
    let result = pipeline.acquire_all(Some(&recorder)).await;

    assert!(result.success);
    assert_eq!(result.total_processed, 120);
    assert_eq!(result.expected_total, 120);

    let last = result.data.last().unwrap();
    assert_eq!(last.serial_number, 120);
    assert_eq!(last.page_number, 3);
    assert_eq!(last.electronic_number, "UUID-3-19");
    for pair in result.data.windows(2) {
        assert!(pair[0].serial_number < pair[1].serial_number);
    }

    let first = &result.data[0];
    assert_eq!(first.status, "صالحة");
    assert_eq!(first.issue_date, "05/03/2024");
    assert_eq!(first.total_amount, "114.00");
    assert_eq!(first.invoice_value, "100.00");
    assert_eq!(first.vat_amount, "14.00");

    let progress = recorder.0.lock().unwrap().clone();
    assert_eq!(progress, vec![BatchProgress::new(3, 3)]);
}

#[tokio::test]
async fn test_failed_page_is_a_silent_shortfall() {
    let server = MockServer::start().await;
    mount_page(&server, 1, ResponseTemplate::new(200).set_body_json(items(1, 50))).await;
    mount_page(&server, 2, ResponseTemplate::new(500)).await;
    mount_page(&server, 3, ResponseTemplate::new(200).set_body_json(items(3, 20))).await;

    let pipeline = pipeline(discovered_endpoint(&server), 120);
    let result = pipeline.acquire_all(None).await;

    assert!(result.success);
    assert_eq!(result.total_processed, 70);
    assert_eq!(result.shortfall(), 50);
    assert_eq!(result.data[50].serial_number, 101);
}

#[tokio::test]
async fn test_fetcher_sends_captured_credentials() {
    let server = MockServer::start().await;
    mount_page(&server, 2, ResponseTemplate::new(200).set_body_json(items(2, 3))).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/documents/recent"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = HttpClient::new(Duration::from_secs(5)).unwrap();
    let fetcher = PageFetcher::new(client.clone(), discovered_endpoint(&server));
    let records = fetcher.fetch_page(2).await;
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].serial_number, 51);

    // Same endpoint without credentials is rejected and yields nothing.
    let bare = EndpointContext::new();
    bare.set_base_url(format!("{}/api/v1/documents/recent", server.uri()));
    bare.set_auth_headers(HashMap::new());
    let fetcher = PageFetcher::new(client, bare);
    assert!(fetcher.fetch_page(2).await.is_empty());
}

#[tokio::test]
async fn test_malformed_payload_yields_empty_page() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        1,
        ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"),
    )
    .await;

    let client = HttpClient::new(Duration::from_secs(5)).unwrap();
    let fetcher = PageFetcher::new(client, discovered_endpoint(&server));
    assert!(fetcher.fetch_page(1).await.is_empty());
}
