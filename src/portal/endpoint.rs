//! Passive discovery of the portal's documents API.
//!
//! The host page's own traffic is observed after it has been issued; nothing
//! here ever issues, blocks or rewrites a request. Whatever is learned is
//! stored in an [`EndpointContext`] that page fetchers read by snapshot.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

/// Path segment identifying an API call.
const API_SEGMENT: &str = "/api/";

/// Resource-collection marker of the documents API.
const COLLECTION_MARKER: &str = "documents";

/// Listing views of the documents collection; anything deeper addresses one document.
const LISTING_SEGMENTS: &[&str] = &["recent", "search"];

/// Substrings marking storage keys and cookie names that may hold a credential.
const CREDENTIAL_HINTS: &[&str] = &["token", "auth"];

/// JSON fields a stored session object may keep its bearer token under.
const TOKEN_FIELDS: &[&str] = &["access_token", "accessToken", "token", "id_token"];

/// What has been learned about the documents API so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointInfo {
    pub base_url: Option<String>,
    pub auth_headers: Option<HashMap<String, String>>,
}

impl EndpointInfo {
    /// True once both an endpoint and credentials are known.
    pub fn is_ready(&self) -> bool {
        self.base_url.is_some() && self.auth_headers.is_some()
    }
}

/// Shared handle to the discovery state of one attached tab.
///
/// Written by the network tap, read by page fetchers. Readers take a
/// snapshot, so a change mid-run only affects fetches built afterwards.
#[derive(Debug, Clone, Default)]
pub struct EndpointContext {
    inner: Arc<RwLock<EndpointInfo>>,
}

impl EndpointContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> EndpointInfo {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn update(&self, f: impl FnOnce(&mut EndpointInfo)) {
        match self.inner.write() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    pub fn set_base_url(&self, url: String) {
        self.update(|info| info.base_url = Some(url));
    }

    pub fn set_auth_headers(&self, headers: HashMap<String, String>) {
        self.update(|info| info.auth_headers = Some(headers));
    }
}

/// An outgoing request seen on the host page.
#[derive(Debug, Clone, Default)]
pub struct ObservedRequest {
    pub url: String,
    pub method: String,
    pub headers: HashMap<String, String>,
}

impl ObservedRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Storage and cookie entries read from the host page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSnapshot {
    #[serde(default)]
    pub local_storage: Vec<(String, String)>,
    #[serde(default)]
    pub session_storage: Vec<(String, String)>,
    #[serde(default)]
    pub cookies: Vec<(String, String)>,
}

/// Non-intrusive observer of the host page's outgoing requests.
pub trait RequestTap: Send + Sync {
    /// Called after a request has been issued. Must never fail.
    fn on_request(&self, request: &ObservedRequest);
}

/// Learns the documents API endpoint and its credentials from traffic.
#[derive(Debug, Clone, Default)]
pub struct EndpointObserver {
    context: EndpointContext,
}

impl EndpointObserver {
    pub fn new(context: EndpointContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &EndpointContext {
        &self.context
    }

    /// Record the request if it targets the documents API.
    ///
    /// Returns true when the URL matched. Only listing requests update the
    /// paginated endpoint; single-document calls still count as a match. A
    /// bearer `Authorization` header carried by the request itself is
    /// captured directly.
    pub fn observe(&self, request: &ObservedRequest) -> bool {
        if !is_documents_api(&request.url) {
            return false;
        }

        let snapshot = self.context.snapshot();
        if is_listing_endpoint(&request.url)
            && snapshot.base_url.as_deref() != Some(request.url.as_str())
        {
            info!("Discovered documents API at {}", request.url);
            self.context.set_base_url(request.url.clone());
        }

        if let Some(auth) = request.header("authorization").filter(|v| !v.is_empty()) {
            if snapshot.auth_headers.is_none() {
                debug!("Captured authorization header from observed request");
            }
            self.context.set_auth_headers(bearer_headers(auth));
        }

        true
    }

    /// Whether a credential still has to be looked up in storage or cookies.
    pub fn needs_credentials(&self) -> bool {
        let info = self.context.snapshot();
        info.base_url.is_some() && info.auth_headers.is_none()
    }

    /// Try to find a credential in the page's storage or cookies.
    ///
    /// Returns true if one was found and stored.
    pub fn absorb_credentials(&self, snapshot: &CredentialSnapshot) -> bool {
        let token = find_storage_token(&snapshot.local_storage)
            .or_else(|| find_storage_token(&snapshot.session_storage))
            .or_else(|| find_cookie_token(&snapshot.cookies));

        match token {
            Some(token) => {
                debug!("Captured credential from page storage");
                self.context.set_auth_headers(bearer_headers(&token));
                true
            }
            None => false,
        }
    }
}

impl RequestTap for EndpointObserver {
    fn on_request(&self, request: &ObservedRequest) {
        self.observe(request);
    }
}

/// True for URLs whose path has an API segment and the documents marker.
pub fn is_documents_api(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let path = parsed.path().to_ascii_lowercase();
    path.contains(API_SEGMENT) && path.contains(COLLECTION_MARKER)
}

/// True when the path ends at the documents collection or one of its listing views.
pub fn is_listing_endpoint(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(segments) = parsed.path_segments() else {
        return false;
    };
    let segments: Vec<String> = segments
        .filter(|segment| !segment.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();

    match segments.iter().position(|segment| segment == COLLECTION_MARKER) {
        Some(at) => match &segments[at + 1..] {
            [] => true,
            [view] => LISTING_SEGMENTS.contains(&view.as_str()),
            _ => false,
        },
        None => false,
    }
}

fn mentions_credential(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    CREDENTIAL_HINTS.iter().any(|hint| lower.contains(hint))
}

/// Build the header bag sent with direct API calls.
fn bearer_headers(token: &str) -> HashMap<String, String> {
    let token = token.trim();
    let value = if token.to_ascii_lowercase().starts_with("bearer ") {
        token.to_string()
    } else {
        format!("Bearer {}", token)
    };
    HashMap::from([("Authorization".to_string(), value)])
}

fn find_storage_token(entries: &[(String, String)]) -> Option<String> {
    entries
        .iter()
        .filter(|(key, _)| mentions_credential(key))
        .find_map(|(_, value)| token_from_value(value))
}

fn find_cookie_token(cookies: &[(String, String)]) -> Option<String> {
    cookies
        .iter()
        .filter(|(name, _)| mentions_credential(name))
        .map(|(_, value)| value.trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// A stored value is either a raw token or a JSON object holding one.
fn token_from_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.starts_with('{') {
        let parsed: serde_json::Value = serde_json::from_str(trimmed).ok()?;
        return TOKEN_FIELDS
            .iter()
            .filter_map(|field| parsed.get(*field).and_then(|v| v.as_str()))
            .map(str::trim)
            .find(|token| !token.is_empty())
            .map(str::to_string);
    }

    Some(trimmed.trim_matches('"').to_string())
}
