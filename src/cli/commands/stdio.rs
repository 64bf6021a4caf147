//! JSON-lines transport on stdin/stdout.
//!
//! Each input line is one request; each output line is either a progress
//! event or the response to the request being handled. Requests are served
//! one at a time, so a response always follows its own progress events.

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::session::PortalSession;
use crate::agent::{ContentAgent, Event, Request, Response};
use crate::config::Config;

/// Serve requests from stdin until it closes.
pub async fn cmd_serve_stdio(config: &Config) -> anyhow::Result<()> {
    let session = PortalSession::open(config).await?;
    info!("Serving requests on stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.next_line().await? {
        serve_line(&session.agent, &line, &mut stdout).await?;
    }

    session.close().await;
    Ok(())
}

/// Handle one input line, writing progress events and the response.
pub async fn serve_line<W>(agent: &ContentAgent, line: &str, out: &mut W) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }

    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            debug!("Rejected request line: {}", e);
            let response = Response::Error {
                message: format!("invalid request: {}", e),
            };
            return write_line(out, &response).await;
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let response = {
        let handling = agent.handle(request, Some(&tx));
        tokio::pin!(handling);
        loop {
            tokio::select! {
                response = &mut handling => break response,
                Some(update) = rx.recv() => {
                    write_line(out, &Event::ProgressUpdate(update)).await?;
                }
            }
        }
    };
    while let Ok(update) = rx.try_recv() {
        write_line(out, &Event::ProgressUpdate(update)).await?;
    }

    write_line(out, &response).await
}

async fn write_line<W, T>(out: &mut W, message: &T) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    out.write_all(&line).await?;
    out.flush().await?;
    Ok(())
}
