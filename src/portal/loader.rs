//! Out-of-band page loading through invisible browsing contexts.
//!
//! When no API is known, each additional page is rendered in a separate,
//! invisible context so the visible page is never navigated away.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::normalize::extract_rows;
use crate::models::InvoiceRecord;

/// Default time allowed for a context to finish loading.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_millis(10_000);

/// An invisible, isolated browsing context showing one page.
#[async_trait]
pub trait BrowsingContext: Send {
    /// Resolve once the document is ready to read, result grid included.
    async fn wait_for_load(&mut self) -> anyhow::Result<()>;

    /// Rendered markup of the loaded document.
    async fn content(&mut self) -> anyhow::Result<String>;

    /// Detach the context. Called exactly once per opened context.
    async fn close(self: Box<Self>);
}

/// Creates browsing contexts pointed at a URL.
#[async_trait]
pub trait BrowsingContextFactory: Send + Sync {
    async fn open(&self, url: &str) -> anyhow::Result<Box<dyn BrowsingContext>>;
}

/// Loads single result pages out of band and normalizes their rows.
#[derive(Clone)]
pub struct OutOfBandPageLoader {
    factory: Arc<dyn BrowsingContextFactory>,
    timeout: Duration,
}

impl OutOfBandPageLoader {
    pub fn new(factory: Arc<dyn BrowsingContextFactory>) -> Self {
        Self::with_timeout(factory, DEFAULT_LOAD_TIMEOUT)
    }

    pub fn with_timeout(factory: Arc<dyn BrowsingContextFactory>, timeout: Duration) -> Self {
        Self { factory, timeout }
    }

    /// Load `url` and return the valid records of its grid.
    ///
    /// Load errors, extraction errors and timeouts all yield an empty page.
    /// The context is closed exactly once whichever way this returns.
    pub async fn load_page(&self, url: &str, page_number: u32) -> Vec<InvoiceRecord> {
        let mut context = match self.factory.open(url).await {
            Ok(context) => context,
            Err(e) => {
                warn!("Could not open context for page {}: {}", page_number, e);
                return Vec::new();
            }
        };

        let outcome = self.read_document(context.as_mut()).await;
        context.close().await;

        match outcome {
            Ok(Some(html)) => {
                let records = extract_rows(&html, page_number);
                debug!("Page {}: {} rows loaded out of band", page_number, records.len());
                records
            }
            Ok(None) => {
                warn!(
                    "Page {} did not load within {}ms",
                    page_number,
                    self.timeout.as_millis()
                );
                Vec::new()
            }
            Err(e) => {
                warn!("Failed to load page {}: {}", page_number, e);
                Vec::new()
            }
        }
    }

    /// Wait for load (bounded by the timeout) and read the document.
    /// `Ok(None)` means the timeout elapsed first.
    async fn read_document(
        &self,
        context: &mut dyn BrowsingContext,
    ) -> anyhow::Result<Option<String>> {
        match tokio::time::timeout(self.timeout, context.wait_for_load()).await {
            Ok(loaded) => loaded?,
            Err(_) => return Ok(None),
        }
        context.content().await.map(Some)
    }
}
