//! Wiring of a live portal session: browser tab, network tap and agent.

use crate::agent::ContentAgent;
use crate::config::Config;
use crate::portal::EndpointInfo;

#[cfg(feature = "browser")]
use std::sync::Arc;
#[cfg(feature = "browser")]
use std::time::Duration;

#[cfg(feature = "browser")]
use anyhow::Context;
#[cfg(feature = "browser")]
use console::style;
#[cfg(feature = "browser")]
use tokio::task::JoinHandle;
#[cfg(feature = "browser")]
use tracing::{debug, warn};

#[cfg(feature = "browser")]
use crate::portal::markers::ROW_SELECTOR;
#[cfg(feature = "browser")]
use crate::portal::{
    AggregationPipeline, EndpointContext, EndpointObserver, HostPage, OutOfBandPageLoader,
    PageFetcher, PaginationInspector,
};
#[cfg(feature = "browser")]
use crate::scrapers::browser::{install_request_tap, session_cookies, CdpHostPage};
#[cfg(feature = "browser")]
use crate::scrapers::{BrowserFetcher, HttpClient};

/// A live session attached to the portal tab.
#[cfg(feature = "browser")]
pub struct PortalSession {
    pub agent: ContentAgent,
    browser: BrowserFetcher,
    tap: JoinHandle<()>,
}

#[cfg(feature = "browser")]
impl PortalSession {
    /// Attach to the portal tab and assemble the acquisition stack.
    ///
    /// The tab is reloaded once after the tap is installed so the grid's own
    /// documents request can be observed.
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        let mut browser = BrowserFetcher::new(config.browser.clone());
        let page = browser.attach_portal_tab(config.portal_url()).await?;

        let endpoint = EndpointContext::new();
        let observer = Arc::new(EndpointObserver::new(endpoint.clone()));
        let tap = install_request_tap(&page, observer).await?;

        page.reload().await.context("Failed to reload portal tab")?;
        wait_for_grid(&page, Duration::from_secs(config.browser.timeout)).await;

        let page_url = page
            .url()
            .await?
            .unwrap_or_else(|| config.portal_url().to_string());
        let client = HttpClient::with_options(
            config.request_timeout(),
            config.user_agent.as_deref(),
            config.browser.proxy.as_deref(),
        )?;
        let urls = cookie_urls(page_url, &endpoint.snapshot());
        client.add_cookies(&session_cookies(&page, urls).await);

        if endpoint.snapshot().is_ready() {
            eprintln!("{} Documents API discovered", style("✓").green());
        } else {
            eprintln!(
                "{} No documents API seen; pages will be rendered in background tabs",
                style("!").yellow()
            );
        }

        let loader = OutOfBandPageLoader::with_timeout(
            Arc::new(browser.context_factory().await?),
            config.acquisition.load_timeout(),
        );
        let settings = config.acquisition.pipeline_settings();
        let inspector = PaginationInspector::new(settings.page_param.clone());
        let host: Arc<dyn HostPage> = Arc::new(CdpHostPage::new(page));
        let pipeline = AggregationPipeline::new(
            host.clone(),
            endpoint.clone(),
            PageFetcher::new(client, endpoint),
            loader,
            settings,
        );

        Ok(Self {
            agent: ContentAgent::new(host, inspector, pipeline),
            browser,
            tap,
        })
    }

    pub async fn close(mut self) {
        self.tap.abort();
        self.browser.close().await;
    }
}

/// URLs whose cookies seed the HTTP client: the portal page and, once
/// discovered, the documents API host.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn cookie_urls(page_url: String, endpoint: &EndpointInfo) -> Vec<String> {
    let mut urls = vec![page_url];
    if let Some(base_url) = &endpoint.base_url {
        if !urls.contains(base_url) {
            urls.push(base_url.clone());
        }
    }
    urls
}

/// Wait until the result grid has rendered at least one row.
#[cfg(feature = "browser")]
async fn wait_for_grid(page: &chromiumoxide::Page, timeout: Duration) {
    match tokio::time::timeout(timeout, page.find_element(ROW_SELECTOR)).await {
        Ok(Ok(_)) => debug!("Result grid rendered"),
        Ok(Err(e)) => warn!("Result grid not found: {}", e),
        Err(_) => warn!("Timeout waiting for result grid"),
    }
}

/// Stand-in when browser support is compiled out.
#[cfg(not(feature = "browser"))]
pub struct PortalSession {
    pub agent: ContentAgent,
}

#[cfg(not(feature = "browser"))]
impl PortalSession {
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        let mut browser = crate::scrapers::BrowserFetcher::new(config.browser.clone());
        browser.ensure_browser().await?;
        anyhow::bail!("Browser support not compiled")
    }

    pub async fn close(self) {}
}
