//! Full export command.

use std::path::PathBuf;

use console::style;
use tokio::sync::mpsc;

use super::session::PortalSession;
use crate::agent::{AcquireOptions, Request, Response};
use crate::cli::progress::ExportProgress;
use crate::config::{resolve_path, Config};
use crate::models::AcquisitionResult;

/// Acquire every page from the attached portal tab and write the result.
pub async fn cmd_export(config: &Config, output: Option<PathBuf>, quiet: bool) -> anyhow::Result<()> {
    let session = PortalSession::open(config).await?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let request = Request::GetAllPagesData {
        options: AcquireOptions {
            send_progress: !quiet,
        },
    };

    let progress = if quiet {
        ExportProgress::hidden()
    } else {
        ExportProgress::new()
    };
    let response = {
        let handling = session.agent.handle(request, Some(&tx));
        tokio::pin!(handling);
        loop {
            tokio::select! {
                response = &mut handling => break response,
                Some(update) = rx.recv() => progress.update(&update),
            }
        }
    };
    while let Ok(update) = rx.try_recv() {
        progress.update(&update);
    }
    progress.finish();
    session.close().await;

    let result = match response {
        Response::AllPagesData(result) => result,
        other => anyhow::bail!("Unexpected response: {:?}", other),
    };

    write_result(&result, output).await?;
    print_summary(&result);

    if result.success {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Export failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        ))
    }
}

async fn write_result(result: &AcquisitionResult, output: Option<PathBuf>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    match output {
        Some(path) => {
            let path = resolve_path(&path.to_string_lossy());
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, json).await?;
            eprintln!("{} Wrote {}", style("→").cyan(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn print_summary(result: &AcquisitionResult) {
    if !result.success {
        eprintln!(
            "{} Acquisition failed after {} records",
            style("✗").red(),
            result.total_processed
        );
        return;
    }

    if result.shortfall() > 0 {
        eprintln!(
            "{} {} of {} records acquired ({} missing)",
            style("!").yellow(),
            result.total_processed,
            result.expected_total,
            result.shortfall()
        );
    } else {
        eprintln!(
            "{} {} records acquired",
            style("✓").green(),
            result.total_processed
        );
    }
}
