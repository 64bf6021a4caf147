//! Request/response interface to the portal tab.
//!
//! A collaborator (the CLI, or a client on the stdio transport) sends
//! [`Request`]s and receives one [`Response`] each. Progress of a full
//! acquisition is pushed separately as fire-and-forget [`ProgressUpdate`]s.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::models::{AcquisitionResult, InvoiceRecord, PaginationState};
use crate::portal::pipeline::{AggregationPipeline, BatchProgress, ProgressSink};
use crate::portal::{extract_rows, HostPage, PaginationInspector};

/// Inbound request, tagged by its `action` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    Ping,
    GetInvoiceData,
    GetAllPagesData {
        #[serde(default)]
        options: AcquireOptions,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcquireOptions {
    /// Push progress updates while pages are acquired.
    #[serde(default)]
    pub send_progress: bool,
}

/// Records of the page currently shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleData {
    pub success: bool,
    pub data: Vec<InvoiceRecord>,
    pub pagination: PaginationState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Reply to one [`Request`], tagged by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Response {
    Pong { ready: bool },
    InvoiceData(VisibleData),
    AllPagesData(AcquisitionResult),
    /// The request could not be understood.
    Error { message: String },
}

/// Unsolicited outbound message, tagged by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    ProgressUpdate(ProgressUpdate),
}

/// Progress event pushed during `getAllPagesData`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub current_page: u32,
    pub total_pages: u32,
    /// Human-readable status line, in Arabic like the portal UI.
    pub message: String,
    pub percentage: u8,
}

impl From<&BatchProgress> for ProgressUpdate {
    fn from(progress: &BatchProgress) -> Self {
        Self {
            current_page: progress.current_page_count,
            total_pages: progress.total_page_count,
            message: progress_message(progress.current_page_count, progress.total_page_count),
            percentage: progress.percentage,
        }
    }
}

/// "Loaded N of M pages".
pub fn progress_message(current: u32, total: u32) -> String {
    format!("تم تحميل {} من {} صفحة", current, total)
}

/// Forwards batch progress into an outbound channel.
struct ChannelProgress<'a> {
    outbound: &'a UnboundedSender<ProgressUpdate>,
}

impl ProgressSink for ChannelProgress<'_> {
    fn notify(&self, progress: &BatchProgress) -> anyhow::Result<()> {
        self.outbound
            .send(ProgressUpdate::from(progress))
            .map_err(|_| anyhow::anyhow!("progress receiver closed"))
    }
}

/// Serves requests against one attached portal tab.
pub struct ContentAgent {
    host: Arc<dyn HostPage>,
    inspector: PaginationInspector,
    pipeline: AggregationPipeline,
}

impl ContentAgent {
    pub fn new(
        host: Arc<dyn HostPage>,
        inspector: PaginationInspector,
        pipeline: AggregationPipeline,
    ) -> Self {
        Self {
            host,
            inspector,
            pipeline,
        }
    }

    /// Answer one request. Progress, when requested, goes to `outbound`.
    pub async fn handle(
        &self,
        request: Request,
        outbound: Option<&UnboundedSender<ProgressUpdate>>,
    ) -> Response {
        debug!("Handling {:?}", request);
        match request {
            Request::Ping => Response::Pong { ready: true },
            Request::GetInvoiceData => Response::InvoiceData(self.visible_data().await),
            Request::GetAllPagesData { options } => {
                if self.pipeline.is_processing_all_pages() {
                    warn!("Acquisition already running; request rejected");
                    return Response::AllPagesData(AcquisitionResult::failed(
                        Vec::new(),
                        0,
                        "acquisition already in progress".to_string(),
                    ));
                }

                let sink = outbound
                    .filter(|_| options.send_progress)
                    .map(|outbound| ChannelProgress { outbound });
                let result = self
                    .pipeline
                    .acquire_all(sink.as_ref().map(|s| s as &dyn ProgressSink))
                    .await;
                Response::AllPagesData(result)
            }
        }
    }

    async fn visible_data(&self) -> VisibleData {
        let page = async {
            let html = self.host.content().await?;
            let url = self.host.url().await?;
            anyhow::Ok((html, url))
        };

        match page.await {
            Ok((html, url)) => {
                let pagination = self.inspector.inspect_with_url(&html, &url);
                let data = extract_rows(&html, pagination.current_page);
                VisibleData {
                    success: true,
                    data,
                    pagination,
                    error: None,
                }
            }
            Err(e) => {
                warn!("Could not read visible page: {}", e);
                VisibleData {
                    success: false,
                    data: Vec::new(),
                    pagination: PaginationState::default(),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::{
        BrowsingContext, BrowsingContextFactory, EndpointContext, OutOfBandPageLoader,
        PageFetcher, PipelineSettings, StaticPage,
    };
    use crate::scrapers::HttpClient;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::mpsc;

    const VISIBLE: &str = r#"<html><body>
        <div class="ms-List-cell"><div role="row">
            <div data-automation-key="uuid"><a>DOC-A</a></div>
            <div data-automation-key="status">Valid</div>
        </div></div>
        <div class="ms-List-cell"><div role="row">
            <div data-automation-key="uuid"><a>DOC-B</a></div>
        </div></div>
    </body></html>"#;

    struct NoContexts;

    #[async_trait]
    impl BrowsingContextFactory for NoContexts {
        async fn open(&self, _url: &str) -> anyhow::Result<Box<dyn BrowsingContext>> {
            anyhow::bail!("no browser")
        }
    }

    fn agent(url: &str, html: &str) -> ContentAgent {
        let host: Arc<dyn HostPage> = Arc::new(StaticPage::new(url, html));
        let endpoint = EndpointContext::new();
        let client = HttpClient::new(Duration::from_secs(1)).unwrap();
        let pipeline = AggregationPipeline::new(
            host.clone(),
            endpoint.clone(),
            PageFetcher::new(client, endpoint),
            OutOfBandPageLoader::new(Arc::new(NoContexts)),
            PipelineSettings::default(),
        );
        ContentAgent::new(host, PaginationInspector::default(), pipeline)
    }

    #[test]
    fn test_request_wire_format() {
        let request: Request = serde_json::from_str(r#"{"action": "ping"}"#).unwrap();
        assert_eq!(request, Request::Ping);

        let request: Request = serde_json::from_str(
            r#"{"action": "getAllPagesData", "options": {"sendProgress": true}}"#,
        )
        .unwrap();
        assert_eq!(
            request,
            Request::GetAllPagesData {
                options: AcquireOptions {
                    send_progress: true
                }
            }
        );

        let request: Request = serde_json::from_str(r#"{"action": "getAllPagesData"}"#).unwrap();
        assert_eq!(
            request,
            Request::GetAllPagesData {
                options: AcquireOptions::default()
            }
        );
    }

    #[test]
    fn test_progress_update_from_batch() {
        let update = ProgressUpdate::from(&BatchProgress::new(2, 4));
        assert_eq!(update.current_page, 2);
        assert_eq!(update.total_pages, 4);
        assert_eq!(update.percentage, 50);
        assert_eq!(update.message, "تم تحميل 2 من 4 صفحة");

        let json = serde_json::to_value(Event::ProgressUpdate(update)).unwrap();
        assert_eq!(json["type"], "progressUpdate");
        assert_eq!(json["currentPage"], 2);
        assert_eq!(json["totalPages"], 4);
    }

    #[tokio::test]
    async fn test_ping() {
        let agent = agent("https://portal.eg/documents", VISIBLE);
        let response = agent.handle(Request::Ping, None).await;
        assert_eq!(response, Response::Pong { ready: true });
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({"type": "pong", "ready": true})
        );
    }

    #[tokio::test]
    async fn test_get_invoice_data() {
        let agent = agent("https://portal.eg/documents?page=3", VISIBLE);
        let Response::InvoiceData(visible) = agent.handle(Request::GetInvoiceData, None).await
        else {
            panic!("expected invoice data");
        };

        assert!(visible.success);
        assert_eq!(visible.data.len(), 2);
        assert_eq!(visible.data[0].serial_number, 101);
        assert_eq!(visible.data[0].status, "صالحة");
        assert_eq!(visible.pagination.current_page, 3);
    }

    #[tokio::test]
    async fn test_all_pages_sends_progress_when_asked() {
        let agent = agent("https://portal.eg/documents", VISIBLE);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let request = Request::GetAllPagesData {
            options: AcquireOptions {
                send_progress: true,
            },
        };
        let Response::AllPagesData(result) = agent.handle(request, Some(&tx)).await else {
            panic!("expected acquisition result");
        };

        assert!(result.success);
        assert_eq!(result.total_processed, 2);
        let update = rx.try_recv().unwrap();
        assert_eq!(update.percentage, 100);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_all_pages_ignores_closed_progress_channel() {
        let agent = agent("https://portal.eg/documents", VISIBLE);
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        let request = Request::GetAllPagesData {
            options: AcquireOptions {
                send_progress: true,
            },
        };
        let Response::AllPagesData(result) = agent.handle(request, Some(&tx)).await else {
            panic!("expected acquisition result");
        };
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_all_pages_without_progress_request() {
        let agent = agent("https://portal.eg/documents", VISIBLE);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let request = Request::GetAllPagesData {
            options: AcquireOptions::default(),
        };
        agent.handle(request, Some(&tx)).await;
        assert!(rx.try_recv().is_err());
    }
}
