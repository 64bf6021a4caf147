//! Visible-page command.

use std::path::PathBuf;

use console::style;

use super::session::PortalSession;
use crate::agent::{Request, Response, VisibleData};
use crate::config::{resolve_path, Config};
use crate::portal::{extract_rows, PaginationInspector};

/// Print the records of the page currently shown, as JSON.
///
/// With `html`, a saved copy of the page is read instead of the live tab.
pub async fn cmd_visible(
    config: &Config,
    html: Option<PathBuf>,
    url: Option<String>,
) -> anyhow::Result<()> {
    let visible = match html {
        Some(path) => {
            let path = resolve_path(&path.to_string_lossy());
            let markup = tokio::fs::read_to_string(&path).await?;
            let url = url.unwrap_or_else(|| config.portal_url().to_string());
            read_saved_page(config, &markup, &url)
        }
        None => {
            let session = PortalSession::open(config).await?;
            let response = session.agent.handle(Request::GetInvoiceData, None).await;
            session.close().await;
            match response {
                Response::InvoiceData(visible) => visible,
                other => anyhow::bail!("Unexpected response: {:?}", other),
            }
        }
    };

    println!("{}", serde_json::to_string_pretty(&visible)?);
    eprintln!(
        "{} Page {} of {}: {} records ({} results in total)",
        style("→").cyan(),
        visible.pagination.current_page,
        visible.pagination.total_pages.max(1),
        visible.data.len(),
        visible.pagination.total_count
    );
    Ok(())
}

fn read_saved_page(config: &Config, markup: &str, url: &str) -> VisibleData {
    let inspector = PaginationInspector::new(config.acquisition.page_param.clone());
    let pagination = inspector.inspect_with_url(markup, url);
    VisibleData {
        success: true,
        data: extract_rows(markup, pagination.current_page),
        pagination,
        error: None,
    }
}
