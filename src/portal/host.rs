//! The visible portal page the acquisition runs against.

use async_trait::async_trait;

/// Read access to the page the user is looking at.
#[async_trait]
pub trait HostPage: Send + Sync {
    /// Current URL of the page.
    async fn url(&self) -> anyhow::Result<String>;

    /// Current rendered markup of the page.
    async fn content(&self) -> anyhow::Result<String>;
}

/// A fixed page, used when the markup has been captured ahead of time.
#[derive(Debug, Clone)]
pub struct StaticPage {
    pub url: String,
    pub html: String,
}

impl StaticPage {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }
}

#[async_trait]
impl HostPage for StaticPage {
    async fn url(&self) -> anyhow::Result<String> {
        Ok(self.url.clone())
    }

    async fn content(&self) -> anyhow::Result<String> {
        Ok(self.html.clone())
    }
}
