//! CDP-backed host page and out-of-band browsing contexts.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use chromiumoxide::{Browser, Page};

use crate::portal::markers::ROW_SELECTOR;
use crate::portal::{BrowsingContext, BrowsingContextFactory, HostPage};

/// The attached portal tab.
#[derive(Clone)]
pub struct CdpHostPage {
    page: Page,
}

impl CdpHostPage {
    pub fn new(page: Page) -> Self {
        Self { page }
    }
}

#[async_trait]
impl HostPage for CdpHostPage {
    async fn url(&self) -> anyhow::Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn content(&self) -> anyhow::Result<String> {
        Ok(self.page.content().await?)
    }
}

/// Opens background tabs in the shared browser session.
///
/// Tabs share the portal tab's cookies, so pages render as the logged-in user.
#[derive(Clone)]
pub struct CdpContextFactory {
    browser: Arc<Mutex<Browser>>,
}

impl CdpContextFactory {
    pub fn new(browser: Arc<Mutex<Browser>>) -> Self {
        Self { browser }
    }
}

#[async_trait]
impl BrowsingContextFactory for CdpContextFactory {
    async fn open(&self, url: &str) -> anyhow::Result<Box<dyn BrowsingContext>> {
        let page = self.browser.lock().await.new_page("about:blank").await?;
        Ok(Box::new(CdpContext {
            page,
            url: url.to_string(),
        }))
    }
}

/// One background tab; navigation starts on [`wait_for_load`](BrowsingContext::wait_for_load).
///
/// The result grid fills in after the load event, so loading is complete only
/// once the first row has rendered. The caller's timeout bounds that wait.
pub struct CdpContext {
    page: Page,
    url: String,
}

#[async_trait]
impl BrowsingContext for CdpContext {
    async fn wait_for_load(&mut self) -> anyhow::Result<()> {
        self.page.goto(self.url.as_str()).await?;
        self.page.find_element(ROW_SELECTOR).await?;
        Ok(())
    }

    async fn content(&mut self) -> anyhow::Result<String> {
        Ok(self.page.content().await?)
    }

    async fn close(self: Box<Self>) {
        let CdpContext { page, url } = *self;
        if let Err(e) = page.close().await {
            debug!("Failed to close background tab for {}: {}", url, e);
        }
    }
}
