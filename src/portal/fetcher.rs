//! Direct page retrieval through the discovered documents API.

use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::endpoint::EndpointContext;
use super::normalize::normalize_items;
use crate::models::{InvoiceRecord, RESULTS_PER_PAGE};
use crate::scrapers::HttpClient;

/// Keys the API may keep its item list under, in order of preference.
const ITEM_KEYS: &[&str] = &["items", "documents", "data"];

/// Sort field and direction the portal uses for its own listing.
const SORT_BY: &str = "dateTimeReceived";
const SORT_DIR: &str = "desc";

/// Fetches one page of normalized records from the documents API.
#[derive(Clone)]
pub struct PageFetcher {
    client: HttpClient,
    endpoint: EndpointContext,
}

impl PageFetcher {
    pub fn new(client: HttpClient, endpoint: EndpointContext) -> Self {
        Self { client, endpoint }
    }

    /// Fetch and normalize one page.
    ///
    /// Never fails: any error is logged and yields an empty page so that
    /// sibling pages of the same batch are unaffected.
    pub async fn fetch_page(&self, page_number: u32) -> Vec<InvoiceRecord> {
        match self.try_fetch_page(page_number).await {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to fetch page {}: {}", page_number, e);
                Vec::new()
            }
        }
    }

    async fn try_fetch_page(&self, page_number: u32) -> anyhow::Result<Vec<InvoiceRecord>> {
        let endpoint = self.endpoint.snapshot();
        let base_url = endpoint
            .base_url
            .ok_or_else(|| anyhow::anyhow!("no documents API discovered yet"))?;
        let url = page_url(&base_url, page_number)?;
        let headers = endpoint.auth_headers.unwrap_or_default();

        let response = self.client.get(url.as_str(), &headers).await?;
        if !response.is_success() {
            anyhow::bail!("HTTP {} from {}", response.status.as_u16(), url);
        }
        if !response.is_json() {
            anyhow::bail!(
                "Expected JSON from {}, got {}",
                url,
                response.content_type().unwrap_or("no content type")
            );
        }

        let body = response.json().await?;
        let items = find_items(&body);
        debug!("Page {}: {} items from API", page_number, items.len());

        Ok(normalize_items(items, page_number))
    }
}

/// Build the request URL for one page: the base URL's path with its query
/// replaced by page, size and sort parameters.
pub fn page_url(base_url: &str, page_number: u32) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base_url)?;
    url.set_query(None);
    url.set_fragment(None);
    url.query_pairs_mut()
        .append_pair("page", &page_number.to_string())
        .append_pair("pageSize", &RESULTS_PER_PAGE.to_string())
        .append_pair("sortBy", SORT_BY)
        .append_pair("sortDir", SORT_DIR);
    Ok(url)
}

/// Locate the item list in an API payload; first present key wins.
pub fn find_items(body: &Value) -> &[Value] {
    if let Some(items) = body.as_array() {
        return items;
    }
    ITEM_KEYS
        .iter()
        .find_map(|key| body.get(*key).filter(|v| !v.is_null()))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_url_replaces_query() {
        let url = page_url(
            "https://api.example.eg/api/v1/documents/recent?page=1&pageSize=10#top",
            3,
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.eg/api/v1/documents/recent?page=3&pageSize=50&sortBy=dateTimeReceived&sortDir=desc"
        );
    }

    #[test]
    fn test_find_items_key_preference() {
        let body = json!({"items": [1, 2], "data": [3]});
        assert_eq!(find_items(&body).len(), 2);

        let body = json!({"documents": [1], "data": [1, 2, 3]});
        assert_eq!(find_items(&body).len(), 1);

        let body = json!({"items": null, "data": [1, 2, 3]});
        assert_eq!(find_items(&body).len(), 3);

        let body = json!({"result": [1]});
        assert!(find_items(&body).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_without_endpoint_is_empty() {
        let client = HttpClient::new(std::time::Duration::from_secs(1)).unwrap();
        let fetcher = PageFetcher::new(client, EndpointContext::new());
        assert!(fetcher.fetch_page(1).await.is_empty());
    }
}
