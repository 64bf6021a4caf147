//! Session cookie and storage extraction from the portal tab.

use anyhow::Result;
use tracing::{debug, warn};

use chromiumoxide::cdp::browser_protocol::network::GetCookiesParams;
use chromiumoxide::Page;

use super::types::BrowserCookie;
use crate::portal::CredentialSnapshot;

/// Reads local storage, session storage and script-visible cookies as
/// arrays of `[key, value]` pairs.
const CREDENTIAL_SCRIPT: &str = r#"
    (() => {
        const entries = (storage) => {
            const out = [];
            try {
                for (let i = 0; i < storage.length; i++) {
                    const key = storage.key(i);
                    out.push([key, String(storage.getItem(key))]);
                }
            } catch (e) {}
            return out;
        };
        const cookies = document.cookie
            .split(';')
            .map((c) => c.trim())
            .filter((c) => c.includes('='))
            .map((c) => {
                const at = c.indexOf('=');
                return [c.slice(0, at), decodeURIComponent(c.slice(at + 1))];
            });
        return {
            localStorage: entries(window.localStorage),
            sessionStorage: entries(window.sessionStorage),
            cookies,
        };
    })()
"#;

/// Cookies the browser holds for any of `urls`, for seeding the HTTP client.
pub async fn session_cookies(page: &Page, urls: Vec<String>) -> Vec<BrowserCookie> {
    let cookie_params = GetCookiesParams::builder().urls(urls).build();

    let browser_cookies = match page.execute(cookie_params).await {
        Ok(result) => result.result.cookies,
        Err(e) => {
            warn!(
                "Failed to get cookies via CDP: {}, trying page.get_cookies()",
                e
            );
            page.get_cookies().await.unwrap_or_default()
        }
    };

    debug!("Got {} cookies from browser", browser_cookies.len());
    browser_cookies.iter().map(BrowserCookie::from).collect()
}

/// Storage entries and cookies visible to the page's scripts.
pub async fn credential_snapshot(page: &Page) -> Result<CredentialSnapshot> {
    let result = page.evaluate(CREDENTIAL_SCRIPT.to_string()).await?;
    Ok(result.into_value()?)
}
