//! HTTP and WebSocket transport.
//!
//! | Route              | Purpose                                        |
//! |--------------------|------------------------------------------------|
//! | `GET /health`      | Liveness probe, returns `ok`                   |
//! | `GET /api/status`  | [`StatusReport`] as JSON                       |
//! | `POST /api/start`  | Start (or restart) monitoring a token          |
//! | `POST /api/stop`   | Stop the chat source                           |
//! | `GET /ws`          | Live observer channel pushing [`LiveEvent`]s   |
//!
//! When `http.static_dir` is configured its files are served for any other
//! path.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::HttpConfig;
use crate::models::live::LiveEvent;
use crate::models::status::StatusReport;
use crate::monitor::Monitor;
use crate::{AppError, Result};

/// Body of `POST /api/start`.
#[derive(Debug, Deserialize)]
pub struct StartRequest {
    /// Token address to monitor.
    pub token_address: String,
    /// Optional display name.
    #[serde(default)]
    pub token_name: Option<String>,
}

/// Response envelope shared by the control routes.
#[derive(Debug, Serialize)]
struct ApiResponse {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<StatusReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ApiResponse {
    fn success(status: Option<StatusReport>) -> Self {
        Self {
            ok: true,
            status,
            error: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            status: None,
            error: Some(message.into()),
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn status(State(monitor): State<Arc<Monitor>>) -> Json<StatusReport> {
    Json(monitor.status().await)
}

async fn start(
    State(monitor): State<Arc<Monitor>>,
    Json(request): Json<StartRequest>,
) -> Response {
    match monitor
        .start(&request.token_address, request.token_name.as_deref())
        .await
    {
        Ok(report) => Json(ApiResponse::success(Some(report))).into_response(),
        Err(err) => {
            warn!(%err, "start request rejected");
            (StatusCode::BAD_REQUEST, Json(ApiResponse::error(err.to_string()))).into_response()
        }
    }
}

async fn stop(State(monitor): State<Arc<Monitor>>) -> Json<ApiResponse> {
    monitor.stop().await;
    Json(ApiResponse::success(Some(monitor.status().await)))
}

async fn ws_handler(ws: WebSocketUpgrade, State(monitor): State<Arc<Monitor>>) -> Response {
    ws.on_upgrade(move |socket| observe(socket, monitor))
}

/// Push live events to one observer until it disconnects.
async fn observe(socket: WebSocket, monitor: Arc<Monitor>) {
    let span = info_span!("observer", id = %Uuid::new_v4());
    pump_events(socket, monitor).instrument(span).await;
}

async fn pump_events(mut socket: WebSocket, monitor: Arc<Monitor>) {
    let mut events = monitor.hub().subscribe();
    info!(observers = monitor.hub().observer_count(), "observer connected");

    let hello = LiveEvent::Status {
        status: monitor.status().await,
    };
    if send_event(&mut socket, &hello).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if send_event(&mut socket, &event).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "observer lagging, events skipped");
                }
                Err(RecvError::Closed) => break,
            },
            inbound = socket.recv() => match inbound {
                None | Some(Ok(Message::Close(_)) | Err(_)) => break,
                Some(Ok(other)) => debug!(?other, "ignoring inbound observer frame"),
            },
        }
    }

    info!("observer disconnected");
}

async fn send_event(socket: &mut WebSocket, event: &LiveEvent) -> std::result::Result<(), ()> {
    let payload = serde_json::to_string(event).map_err(|err| {
        warn!(%err, "failed to serialize live event");
    })?;
    socket
        .send(Message::Text(payload.into()))
        .await
        .map_err(|err| debug!(%err, "observer send failed"))
}

/// Build the application router.
#[must_use]
pub fn router(monitor: Arc<Monitor>, config: &HttpConfig) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/api/status", get(status))
        .route("/api/start", post(start))
        .route("/api/stop", post(stop))
        .route("/ws", get(ws_handler))
        .with_state(monitor);

    match config.static_dir {
        Some(ref dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    }
}

/// Bind `http.host:http.port`.
///
/// # Errors
///
/// Returns `AppError::Http` if the address is invalid or cannot be bound.
pub async fn bind(config: &HttpConfig) -> Result<tokio::net::TcpListener> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|err| AppError::Http(format!("invalid listen address: {err}")))?;
    tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::Http(format!("failed to bind {addr}: {err}")))
}

/// Serve HTTP on `listener` until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Http` if the server fails.
pub async fn serve(
    listener: tokio::net::TcpListener,
    monitor: Arc<Monitor>,
    config: &HttpConfig,
    ct: CancellationToken,
) -> Result<()> {
    let local = listener
        .local_addr()
        .map_err(|err| AppError::Http(format!("failed to read local address: {err}")))?;
    info!(%local, "starting HTTP server");

    axum::serve(listener, router(monitor, config))
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Http(format!("server error: {err}")))?;

    info!("HTTP server shut down");
    Ok(())
}
