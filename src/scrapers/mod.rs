//! Transport layer: the browser session and the direct HTTP client.

pub mod browser;
pub mod http_client;

pub use browser::{BrowserCookie, BrowserEngineConfig, BrowserFetcher};
pub use http_client::{HttpClient, HttpResponse};
