//! JSON-lines transport for the message router
//!
//! Each stdin line is one request object. `context` names the sending
//! context (default `stdio`) and `requestId` is echoed on the reply so a
//! client can match out-of-order responses. Replies, and any notifications
//! the store raises, are written to stdout one JSON object per line.

use crate::context::CliContext;
use crate::error::{CliError, CliResult};
use crate::exit_codes::EXIT_ERROR;
use anyhow::{bail, Context};
use serde_json::{Map, Value};
use snapnote::session::ContextId;
use snapnote::{BroadcastNotifier, Notification, Request, Response, RouterClient};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinSet;

/// Context used when a line does not name one
pub const DEFAULT_CONTEXT: &str = "stdio";

const CHANNEL_CAPACITY: usize = 64;

/// One parsed input line
#[derive(Debug, PartialEq)]
pub enum ServeLine {
    /// A router request
    Request {
        context: ContextId,
        request_id: Option<Value>,
        request: Request,
    },
    /// A context was torn down
    CloseContext(ContextId),
}

/// Parse one input line
pub fn parse_line(line: &str) -> anyhow::Result<ServeLine> {
    let value: Value = serde_json::from_str(line).context("line is not valid JSON")?;
    let Value::Object(mut fields) = value else {
        bail!("expected a JSON object");
    };

    let context = match fields.remove("context") {
        None | Some(Value::Null) => DEFAULT_CONTEXT.to_string(),
        Some(Value::String(name)) => name,
        Some(other) => bail!("context must be a string, got {other}"),
    };

    if let Some(event) = fields.get("event").and_then(Value::as_str) {
        if event == "closeContext" {
            return Ok(ServeLine::CloseContext(context));
        }
        bail!("unknown event '{event}'");
    }

    let request_id = fields.remove("requestId");
    let request: Request =
        serde_json::from_value(Value::Object(fields)).context("malformed request")?;

    Ok(ServeLine::Request {
        context,
        request_id,
        request,
    })
}

/// Serialize a reply, tagging it with the request id if one was sent
pub fn render_response(response: Response, request_id: Option<Value>) -> String {
    let mut value = match serde_json::to_value(&response) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    if let Some(id) = request_id {
        value.insert("requestId".to_string(), id);
    }
    Value::Object(value).to_string()
}

fn render_notification(notification: &Notification) -> String {
    let mut value = match serde_json::to_value(notification) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    value.insert("event".to_string(), Value::from("notification"));
    Value::Object(value).to_string()
}

/// Serve router requests on stdin/stdout until stdin closes
pub async fn run_serve(context: CliContext, notifier: BroadcastNotifier) -> CliResult<()> {
    let (client, router_task) = context.router().clone().spawn(CHANNEL_CAPACITY);
    let (out_tx, out_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);

    let writer = tokio::spawn(write_lines(out_rx));
    let (stop_forwarding, stop) = oneshot::channel();
    let forwarder = tokio::spawn(forward_notifications(
        notifier.subscribe(),
        out_tx.clone(),
        stop,
    ));

    let lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending = read_requests(lines, &client, &out_tx).await?;

    tracing::info!("Input closed, waiting for {} in-flight requests", pending.len());
    while pending.join_next().await.is_some() {}

    drop(client);
    if let Err(e) = router_task.await {
        tracing::error!("Router task failed: {}", e);
    }

    let _ = stop_forwarding.send(());
    if let Err(e) = forwarder.await {
        tracing::error!("Notification task failed: {}", e);
    }
    drop(out_tx);

    match writer.await {
        Ok(result) => result.map_err(|e| CliError::new(format!("{e:#}"), EXIT_ERROR)),
        Err(e) => {
            tracing::error!("Output task failed: {}", e);
            Ok(())
        }
    }
}

/// Read request lines until EOF, answering each on its own task
///
/// Finished tasks are reaped while reading, so the returned set only holds
/// requests still running when input closed.
async fn read_requests<R>(
    mut lines: Lines<R>,
    client: &RouterClient,
    out: &mpsc::Sender<String>,
) -> CliResult<JoinSet<()>>
where
    R: AsyncBufRead + Unpin,
{
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }

                match parse_line(&line) {
                    Ok(ServeLine::CloseContext(name)) => {
                        tracing::debug!("Closing context {}", name);
                        client.close_context(name).await?;
                    }
                    Ok(ServeLine::Request {
                        context,
                        request_id,
                        request,
                    }) => {
                        in_flight.spawn(answer(
                            client.clone(),
                            context,
                            request,
                            request_id,
                            out.clone(),
                        ));
                    }
                    Err(e) => {
                        tracing::warn!("Rejected input line: {:#}", e);
                        let reply = Response::failure(format!("Invalid request: {e:#}"));
                        if out.send(render_response(reply, None)).await.is_err() {
                            break;
                        }
                    }
                }
            }
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
        }
    }

    Ok(in_flight)
}

async fn answer(
    client: RouterClient,
    context: ContextId,
    request: Request,
    request_id: Option<Value>,
    out: mpsc::Sender<String>,
) {
    let response = match client.request(context, request).await {
        Ok(response) => response,
        Err(e) => Response::failure(e.to_string()),
    };
    if out.send(render_response(response, request_id)).await.is_err() {
        tracing::debug!("Output closed before reply was written");
    }
}

/// Forward notifications until stopped, then flush whatever is queued
async fn forward_notifications(
    mut notifications: broadcast::Receiver<Notification>,
    out: mpsc::Sender<String>,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            received = notifications.recv() => match received {
                Ok(notification) => {
                    if out.send(render_notification(&notification)).await.is_err() {
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Dropped {} notifications", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return,
            },
            _ = &mut stop => break,
        }
    }

    while let Ok(notification) = notifications.try_recv() {
        if out.send(render_notification(&notification)).await.is_err() {
            return;
        }
    }
}

async fn write_lines(mut lines: mpsc::Receiver<String>) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.recv().await {
        stdout.write_all(line.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await.context("failed to flush stdout")?;
    }
    Ok(())
}
