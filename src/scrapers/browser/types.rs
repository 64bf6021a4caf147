//! Types shared between the browser session and the HTTP client.

/// Cookie extracted from browser session.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
}

#[cfg(feature = "browser")]
impl From<&chromiumoxide::cdp::browser_protocol::network::Cookie> for BrowserCookie {
    fn from(c: &chromiumoxide::cdp::browser_protocol::network::Cookie) -> Self {
        Self {
            name: c.name.clone(),
            value: c.value.clone(),
            domain: c.domain.clone(),
            path: c.path.clone(),
            secure: c.secure,
            http_only: c.http_only,
        }
    }
}
