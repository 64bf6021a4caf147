//! HTTP client for direct calls to the portal API.
//!
//! Requests carry the browser session's cookies through a shared jar plus
//! any per-request headers (captured bearer credentials).

mod response;
mod user_agent;

pub use response::HttpResponse;
pub use user_agent::{resolve_user_agent, USER_AGENT};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::cookie::Jar;
use reqwest::{Client, Proxy, Url};
use tracing::debug;

use crate::scrapers::browser::BrowserCookie;

/// HTTP client sharing the browser's session cookies.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    jar: Arc<Jar>,
}

impl HttpClient {
    /// Create a new HTTP client with the default user agent.
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        Self::with_options(timeout, None, None)
    }

    /// Create a new HTTP client with custom user agent and proxy configuration.
    /// - user agent None: browser-like default user agent
    /// - proxy Some(url): route requests like the browser does (e.g. socks5://)
    pub fn with_options(
        timeout: Duration,
        user_agent_config: Option<&str>,
        proxy: Option<&str>,
    ) -> reqwest::Result<Self> {
        let jar = Arc::new(Jar::default());
        let user_agent = resolve_user_agent(user_agent_config);
        let mut builder = Client::builder()
            .user_agent(&user_agent)
            .cookie_provider(jar.clone())
            .timeout(timeout)
            .gzip(true)
            .brotli(true);

        if let Some(proxy) = proxy.filter(|p| !p.is_empty()) {
            builder = builder.proxy(Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
            jar,
        })
    }

    /// Seed the cookie jar with cookies taken from the browser session.
    pub fn add_cookies(&self, cookies: &[BrowserCookie]) {
        for cookie in cookies {
            if cookie.name.is_empty() || cookie.domain.is_empty() {
                continue;
            }
            let host = cookie.domain.trim_start_matches('.');
            let Ok(url) = format!("https://{}/", host).parse::<Url>() else {
                continue;
            };
            let path = if cookie.path.is_empty() { "/" } else { &cookie.path };
            let cookie_str = format!(
                "{}={}; Domain={}; Path={}",
                cookie.name, cookie.value, cookie.domain, path
            );
            self.jar.add_cookie_str(&cookie_str, &url);
        }
        debug!("Seeded HTTP client with {} browser cookies", cookies.len());
    }

    /// Make a GET request with extra headers.
    pub async fn get(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<HttpResponse, reqwest::Error> {
        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/json, text/plain, */*");
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let start = Instant::now();
        let response = request.send().await?;
        debug!(
            "GET {} -> {} in {}ms",
            url,
            response.status().as_u16(),
            start.elapsed().as_millis()
        );

        Ok(HttpResponse::from_response(response))
    }
}
