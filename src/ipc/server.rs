//! Local IPC server for `chat-herald-ctl` commands.
//!
//! Listens on a named pipe (Windows) or Unix domain socket (Linux/macOS)
//! using the `interprocess` crate. Accepts line-delimited JSON commands
//! from `chat-herald-ctl` and routes them to the [`Monitor`].
//!
//! ## Protocol
//!
//! Request (one JSON object per line):
//! ```json
//! {"command": "status"}
//! {"command": "start", "token_address": "So1ana...", "token_name": "HERALD"}
//! {"command": "stop"}
//! ```
//!
//! Response (one JSON object per line):
//! ```json
//! {"ok": true, "data": { ... } }
//! {"ok": false, "error": "unknown command: foo"}
//! ```

use std::sync::Arc;

use interprocess::local_socket::{tokio::prelude::*, GenericNamespaced, ListenerOptions};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use crate::monitor::Monitor;
use crate::{AppError, Result};

/// Environment variable holding the optional shared secret for IPC clients.
pub const IPC_TOKEN_ENV: &str = "CHAT_HERALD_IPC_TOKEN";

/// Inbound IPC request from `chat-herald-ctl`.
#[derive(Debug, Default, Deserialize)]
pub struct IpcRequest {
    /// Command verb.
    pub command: String,
    /// Token address (for `start`).
    #[serde(default)]
    pub token_address: Option<String>,
    /// Token display name (for `start`).
    #[serde(default)]
    pub token_name: Option<String>,
    /// Shared-secret authentication token.
    #[serde(default)]
    pub auth_token: Option<String>,
}

/// Outbound IPC response to `chat-herald-ctl`.
#[derive(Debug, Serialize)]
pub struct IpcResponse {
    /// Whether the command succeeded.
    pub ok: bool,
    /// Payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Error message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IpcResponse {
    fn success(data: serde_json::Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Spawn the IPC server task on `ipc_name`.
///
/// When `auth_token` is set, requests must carry the same value.
///
/// # Errors
///
/// Returns `AppError::Ipc` if the listener cannot be created.
pub fn spawn_ipc_server(
    monitor: Arc<Monitor>,
    ipc_name: &str,
    auth_token: Option<String>,
    ct: CancellationToken,
) -> Result<tokio::task::JoinHandle<()>> {
    let name = ipc_name.to_owned();

    let listener_name = name
        .clone()
        .to_ns_name::<GenericNamespaced>()
        .map_err(|err| AppError::Ipc(format!("invalid ipc socket name '{name}': {err}")))?;

    let listener = ListenerOptions::new()
        .name(listener_name)
        .create_tokio()
        .map_err(|err| AppError::Ipc(format!("failed to create ipc listener: {err}")))?;

    info!(ipc_name = %name, "IPC server listening");

    let auth_token = auth_token.map(Arc::<str>::from);
    let handle = tokio::spawn(async move {
        let span = info_span!("ipc_server", name = %name);
        async move {
            loop {
                tokio::select! {
                    () = ct.cancelled() => {
                        info!("IPC server shutting down");
                        break;
                    }
                    accept_result = listener.accept() => {
                        match accept_result {
                            Ok(stream) => {
                                tokio::spawn(handle_connection(
                                    stream,
                                    Arc::clone(&monitor),
                                    auth_token.clone(),
                                ));
                            }
                            Err(err) => {
                                warn!(%err, "IPC accept failed");
                            }
                        }
                    }
                }
            }
        }
        .instrument(span)
        .await;
    });

    Ok(handle)
}

/// Handle a single IPC client connection.
async fn handle_connection(
    stream: interprocess::local_socket::tokio::Stream,
    monitor: Arc<Monitor>,
    auth_token: Option<Arc<str>>,
) {
    let span = info_span!("ipc_conn");
    async move {
        let (reader, mut writer) = stream.split();
        let mut buf_reader = BufReader::new(reader);
        let mut line = String::new();

        loop {
            line.clear();
            match buf_reader.read_line(&mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    let response = match serde_json::from_str::<IpcRequest>(trimmed) {
                        Ok(request) => {
                            dispatch_command(&request, &monitor, auth_token.as_deref()).await
                        }
                        Err(err) => IpcResponse::error(format!("invalid json: {err}")),
                    };

                    let mut response_line = serde_json::to_string(&response).unwrap_or_else(|_| {
                        r#"{"ok":false,"error":"serialization failed"}"#.to_owned()
                    });
                    response_line.push('\n');

                    if let Err(err) = writer.write_all(response_line.as_bytes()).await {
                        warn!(%err, "failed to write ipc response");
                        break;
                    }
                }
                Err(err) => {
                    warn!(%err, "ipc read error");
                    break;
                }
            }
        }

        info!("IPC connection closed");
    }
    .instrument(span)
    .await;
}

/// Route an IPC command to the monitor.
pub async fn dispatch_command(
    request: &IpcRequest,
    monitor: &Monitor,
    auth_token: Option<&str>,
) -> IpcResponse {
    if let Some(expected) = auth_token {
        if request.auth_token.as_deref() != Some(expected) {
            warn!(command = %request.command, "IPC request rejected: invalid auth token");
            return IpcResponse::error("unauthorized");
        }
    }

    let span = info_span!("ipc_command", command = %request.command);
    async {
        match request.command.as_str() {
            "status" => status_response(monitor).await,
            "start" => handle_start(request, monitor).await,
            "stop" => {
                let was_running = monitor.stop().await;
                IpcResponse::success(serde_json::json!({ "stopped": was_running }))
            }
            other => IpcResponse::error(format!("unknown command: {other}")),
        }
    }
    .instrument(span)
    .await
}

async fn status_response(monitor: &Monitor) -> IpcResponse {
    match serde_json::to_value(monitor.status().await) {
        Ok(data) => IpcResponse::success(data),
        Err(err) => IpcResponse::error(format!("failed to encode status: {err}")),
    }
}

async fn handle_start(request: &IpcRequest, monitor: &Monitor) -> IpcResponse {
    let Some(ref token_address) = request.token_address else {
        return IpcResponse::error("missing required 'token_address' field");
    };

    match monitor
        .start(token_address, request.token_name.as_deref())
        .await
    {
        Ok(report) => {
            info!(token = %token_address, "monitoring started via IPC");
            match serde_json::to_value(report) {
                Ok(data) => IpcResponse::success(data),
                Err(err) => IpcResponse::error(format!("failed to encode status: {err}")),
            }
        }
        Err(err) => IpcResponse::error(err.to_string()),
    }
}
