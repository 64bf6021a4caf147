//! Passive network tap on the portal tab.
//!
//! Listens to `Network.requestWillBeSent` events, which are reported after
//! the page has issued a request, and feeds them to the endpoint observer.

use std::sync::Arc;

use anyhow::Result;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::debug;

use chromiumoxide::cdp::browser_protocol::network::{EnableParams, EventRequestWillBeSent};
use chromiumoxide::Page;

use super::cookies::credential_snapshot;
use crate::portal::{EndpointObserver, ObservedRequest};

/// Start observing the page's requests. The tap runs until the page closes.
pub async fn install_request_tap(
    page: &Page,
    observer: Arc<EndpointObserver>,
) -> Result<JoinHandle<()>> {
    page.execute(EnableParams::default()).await?;
    let mut events = page.event_listener::<EventRequestWillBeSent>().await?;
    let page = page.clone();

    Ok(tokio::spawn(async move {
        while let Some(event) = events.next().await {
            let request = observed_request(&event);
            if !observer.observe(&request) || !observer.needs_credentials() {
                continue;
            }

            match credential_snapshot(&page).await {
                Ok(snapshot) => {
                    if !observer.absorb_credentials(&snapshot) {
                        debug!("No credential found in page storage yet");
                    }
                }
                Err(e) => debug!("Could not read page storage: {}", e),
            }
        }
        debug!("Request tap stopped");
    }))
}

fn observed_request(event: &EventRequestWillBeSent) -> ObservedRequest {
    let mut request = ObservedRequest::new(event.request.url.clone());
    request.method = event.request.method.clone();
    if let Some(headers) = event.request.headers.inner().as_object() {
        for (name, value) in headers {
            if let Some(value) = value.as_str() {
                request = request.with_header(name, value);
            }
        }
    }
    request
}
