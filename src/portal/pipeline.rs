//! Acquisition of every result page into one ordered report.
//!
//! Pages are processed in fixed-size batches. Within a batch all pages are
//! requested concurrently and the whole batch is awaited before the next
//! one starts, so the concatenated output stays in page order no matter
//! which request finishes first.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use super::endpoint::EndpointContext;
use super::fetcher::PageFetcher;
use super::host::HostPage;
use super::loader::OutOfBandPageLoader;
use super::normalize::extract_rows;
use super::pagination::PaginationInspector;
use crate::error::AcquisitionError;
use crate::models::{AcquisitionResult, InvoiceRecord};

/// Pages fetched concurrently per batch on the API path.
pub const API_BATCH_SIZE: usize = 10;

/// Pages loaded concurrently per batch on the out-of-band path.
pub const FALLBACK_BATCH_SIZE: usize = 5;

/// Progress after one completed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    pub current_page_count: u32,
    pub total_page_count: u32,
    /// Completed share in percent; 100 only once every page is done.
    pub percentage: u8,
}

impl BatchProgress {
    pub fn new(completed: u32, total: u32) -> Self {
        let percentage = if total == 0 {
            100
        } else {
            (u64::from(completed.min(total)) * 100 / u64::from(total)) as u8
        };
        Self {
            current_page_count: completed,
            total_page_count: total,
            percentage,
        }
    }
}

/// One-way receiver of progress notifications.
///
/// Delivery errors are discarded by the pipeline; they never affect the run.
pub trait ProgressSink: Send + Sync {
    fn notify(&self, progress: &BatchProgress) -> anyhow::Result<()>;
}

/// Tunables of the aggregation pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub api_batch_size: usize,
    pub fallback_batch_size: usize,
    /// Pause between batches, to stay under the portal's rate limits.
    pub batch_delay: Option<Duration>,
    /// Query parameter carrying the page number in portal URLs.
    pub page_param: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            api_batch_size: API_BATCH_SIZE,
            fallback_batch_size: FALLBACK_BATCH_SIZE,
            batch_delay: None,
            page_param: "page".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Api,
    OutOfBand,
}

/// Drives acquisition of all pages and assembles the final report.
pub struct AggregationPipeline {
    host: Arc<dyn HostPage>,
    endpoint: EndpointContext,
    fetcher: PageFetcher,
    loader: OutOfBandPageLoader,
    inspector: PaginationInspector,
    settings: PipelineSettings,
    in_progress: AtomicBool,
}

/// Holds the in-progress flag for one run; clears it when dropped, so a
/// cancelled run does not leave the pipeline marked busy.
struct RunningFlag<'a>(&'a AtomicBool);

impl<'a> RunningFlag<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for RunningFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl AggregationPipeline {
    pub fn new(
        host: Arc<dyn HostPage>,
        endpoint: EndpointContext,
        fetcher: PageFetcher,
        loader: OutOfBandPageLoader,
        settings: PipelineSettings,
    ) -> Self {
        let inspector = PaginationInspector::new(settings.page_param.clone());
        Self {
            host,
            endpoint,
            fetcher,
            loader,
            inspector,
            settings,
            in_progress: AtomicBool::new(false),
        }
    }

    /// True while [`acquire_all`](Self::acquire_all) is running.
    ///
    /// Callers are expected to avoid overlapping runs; this is not a lock.
    pub fn is_processing_all_pages(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Acquire every page and return the combined report.
    ///
    /// A failing page contributes no records; only a failure of the run
    /// itself sets `success = false`, keeping whatever was gathered so far.
    pub async fn acquire_all(&self, progress: Option<&dyn ProgressSink>) -> AcquisitionResult {
        let running = RunningFlag::set(&self.in_progress);

        let mut data = Vec::new();
        let mut expected_total = 0;
        let outcome = self.run(&mut data, &mut expected_total, progress).await;

        drop(running);

        match outcome {
            Ok(()) => {
                if (data.len() as u64) < expected_total {
                    warn!(
                        "Acquired {} of {} expected records",
                        data.len(),
                        expected_total
                    );
                } else {
                    info!("Acquired {} records", data.len());
                }
                AcquisitionResult::completed(data, expected_total)
            }
            Err(e) => {
                warn!("Acquisition failed after {} records: {}", data.len(), e);
                AcquisitionResult::failed(data, expected_total, e.to_string())
            }
        }
    }

    async fn run(
        &self,
        data: &mut Vec<InvoiceRecord>,
        expected_total: &mut u64,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<(), AcquisitionError> {
        let html = self
            .host
            .content()
            .await
            .map_err(|e| AcquisitionError::HostPage(e.to_string()))?;
        let page_url = self
            .host
            .url()
            .await
            .map_err(|e| AcquisitionError::HostPage(e.to_string()))?;

        let state = self.inspector.inspect_with_url(&html, &page_url);
        *expected_total = state.total_count;

        if state.is_unknown() {
            info!("Result count not shown; using the visible page only");
            data.extend(extract_rows(&html, state.current_page));
            report(progress, BatchProgress::new(1, 1));
            return Ok(());
        }

        let total_pages = state.total_pages;
        let strategy = if self.endpoint.snapshot().is_ready() {
            Strategy::Api
        } else {
            Strategy::OutOfBand
        };
        info!(
            "Acquiring {} pages ({} records) via {:?}",
            total_pages, state.total_count, strategy
        );

        let pages: Vec<u32> = (1..=total_pages).collect();
        let batch_size = match strategy {
            Strategy::Api => self.settings.api_batch_size,
            Strategy::OutOfBand => self.settings.fallback_batch_size,
        }
        .max(1);

        let urls = match strategy {
            Strategy::Api => Vec::new(),
            Strategy::OutOfBand => pages
                .iter()
                .map(|page| page_target_url(&page_url, &self.settings.page_param, *page))
                .collect::<Result<Vec<_>, _>>()?,
        };

        let mut completed = 0u32;
        for (batch_index, batch) in pages.chunks(batch_size).enumerate() {
            if batch_index > 0 {
                if let Some(delay) = self.settings.batch_delay {
                    tokio::time::sleep(delay).await;
                }
            }

            let results = match strategy {
                Strategy::Api => {
                    join_all(batch.iter().map(|page| self.fetcher.fetch_page(*page))).await
                }
                Strategy::OutOfBand => {
                    join_all(batch.iter().map(|page| {
                        let url = &urls[(*page - 1) as usize];
                        self.loader.load_page(url, *page)
                    }))
                    .await
                }
            };

            for records in results {
                data.extend(records);
            }

            completed += batch.len() as u32;
            debug!("Batch {} done: {}/{} pages", batch_index + 1, completed, total_pages);
            report(progress, BatchProgress::new(completed, total_pages));
        }

        Ok(())
    }
}

/// Deliver a progress notification, ignoring delivery failures.
fn report(sink: Option<&dyn ProgressSink>, progress: BatchProgress) {
    if let Some(sink) = sink {
        if let Err(e) = sink.notify(&progress) {
            debug!("Progress delivery failed: {}", e);
        }
    }
}

/// URL of `page` derived from the visible page's URL.
pub fn page_target_url(
    page_url: &str,
    page_param: &str,
    page: u32,
) -> Result<String, AcquisitionError> {
    let mut url = Url::parse(page_url).map_err(|source| AcquisitionError::InvalidPageUrl {
        url: page_url.to_string(),
        source,
    })?;

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != page_param)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    {
        let mut query = url.query_pairs_mut();
        query.clear();
        for (key, value) in &kept {
            query.append_pair(key, value);
        }
        query.append_pair(page_param, &page.to_string());
    }

    Ok(url.to_string())
}
