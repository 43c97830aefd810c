//! Gateway HTTP + WebSocket server (single port).

use crate::activity::{IncomingTurn, ReplyPayload};
use crate::attachments::{AttachmentFetcher, AttachmentIngestor};
use crate::config::{self, Config};
use crate::gateway::protocol::{HelloOk, TurnResponse, WsRequest, WsResponse, PROTOCOL_VERSION};
use crate::init;
use crate::menu::MenuDispatcher;
use crate::reply::CollectingSink;
use crate::router::{TurnError, TurnRouter};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

const SHUTDOWN_EVENT_JSON: &str = r#"{"type":"event","event":"shutdown","payload":{}}"#;

/// Shared state for the gateway (config, router, turn lock, shutdown events).
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub router: Arc<TurnRouter>,
    /// Held for the whole of a turn so turns never interleave.
    turn_lock: Arc<Mutex<()>>,
    /// Broadcasts events to connected WebSocket clients (e.g. shutdown).
    pub event_tx: broadcast::Sender<String>,
}

impl GatewayState {
    pub fn new(config: Config, router: TurnRouter) -> Self {
        let (event_tx, _) = broadcast::channel(16);
        Self {
            config: Arc::new(config),
            router: Arc::new(router),
            turn_lock: Arc::new(Mutex::new(())),
            event_tx,
        }
    }

    /// Run one turn to completion and return its replies in send order.
    pub async fn run_turn(&self, turn: &IncomingTurn) -> Result<Vec<ReplyPayload>, TurnError> {
        let _guard = self.turn_lock.lock().await;
        let sink = CollectingSink::new();
        self.router.on_turn(turn, &sink).await?;
        Ok(sink.into_replies())
    }
}

/// Routes served by the gateway.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/api/messages", post(messages_http))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Build the turn router from config: attachments dir, resources dir, bot name.
fn turn_router(config: &Config, config_path: &std::path::Path) -> TurnRouter {
    let attachments_dir = config::resolve_attachments_dir(config, config_path);
    let resources_dir = config::resolve_resources_dir(config, config_path);
    log::info!("attachments are written to {}", attachments_dir.display());
    log::info!("bundled resources are read from {}", resources_dir.display());
    TurnRouter::new(
        AttachmentIngestor::new(AttachmentFetcher::new(attachments_dir)),
        MenuDispatcher::new(resources_dir),
        config.bot.name.clone(),
    )
}

/// Run the gateway server; binds to config.gateway.bind:config.gateway.port.
/// Blocks until shutdown (e.g. Ctrl+C).
/// Requires the configuration directory to be initialized (`botin init`) so the bundled resources exist.
pub async fn run_gateway(config: Config, config_path: PathBuf) -> Result<()> {
    init::require_initialized(&config_path, &config)?;
    let bind = config.gateway.bind.trim().to_string();
    if !config::is_loopback_bind(&bind) {
        log::warn!("gateway bound to non-loopback address {}; turns are not authenticated", bind);
    }

    let attachments_dir = config::resolve_attachments_dir(&config, &config_path);
    tokio::fs::create_dir_all(&attachments_dir)
        .await
        .with_context(|| format!("creating attachments directory {}", attachments_dir.display()))?;

    let router = turn_router(&config, &config_path);
    let port = config.gateway.port;
    let state = GatewayState::new(config, router);
    let event_tx = state.event_tx.clone();
    let app = build_router(state);

    let bind_addr = format!("{}:{}", bind, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(event_tx))
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
/// Broadcasts a shutdown event to WebSocket clients before connections drain.
async fn shutdown_signal(event_tx: broadcast::Sender<String>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, broadcasting shutdown and draining connections");

    let _ = event_tx.send(SHUTDOWN_EVENT_JSON.to_string());
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "protocol": PROTOCOL_VERSION,
        "port": state.config.gateway.port,
    }))
}

/// POST /api/messages: one activity in, `{ replies }` out.
async fn messages_http(State(state): State<GatewayState>, body: Bytes) -> Response {
    let turn: IncomingTurn = match serde_json::from_slice(&body) {
        Ok(t) => t,
        Err(e) => {
            log::debug!("rejecting malformed activity: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "invalid activity" })),
            )
                .into_response();
        }
    };
    match state.run_turn(&turn).await {
        Ok(replies) => Json(TurnResponse { replies }).into_response(),
        Err(e) => {
            log::error!("turn failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "turn could not be processed" })),
            )
                .into_response()
        }
    }
}

/// GET /ws upgrades to WebSocket.
async fn ws_handler(State(state): State<GatewayState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn send_response(socket: &mut WebSocket, res: &WsResponse) -> bool {
    let text = serde_json::to_string(res).unwrap_or_default();
    socket.send(Message::Text(text)).await.is_ok()
}

async fn handle_socket(mut socket: WebSocket, state: GatewayState) {
    let mut event_rx = state.event_tx.subscribe();

    loop {
        tokio::select! {
            biased;

            event = event_rx.recv() => {
                match event {
                    Ok(text) => {
                        let is_shutdown = text == SHUTDOWN_EVENT_JSON;
                        let _ = socket.send(Message::Text(text)).await;
                        if is_shutdown {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        log::debug!("ws client lagged {} broadcast messages", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                let Message::Text(text) = msg else { continue };
                let Ok(req): Result<WsRequest, _> = serde_json::from_str(&text) else { continue };
                if req.typ != "req" {
                    continue;
                }
                let res = handle_request(&state, req).await;
                if !send_response(&mut socket, &res).await {
                    break;
                }
            }
        }
    }
    log::debug!("ws client disconnected");
}

async fn handle_request(state: &GatewayState, req: WsRequest) -> WsResponse {
    match req.method.as_str() {
        "connect" => {
            let hello = HelloOk {
                typ: "hello-ok".to_string(),
                protocol: PROTOCOL_VERSION,
                bot_name: state.config.bot.name.clone(),
            };
            WsResponse::ok(&req.id, serde_json::to_value(&hello).unwrap_or(json!({})))
        }
        "health" => WsResponse::ok(
            &req.id,
            json!({
                "runtime": "running",
                "protocol": PROTOCOL_VERSION,
            }),
        ),
        "turn" => {
            let turn: IncomingTurn = match serde_json::from_value(req.params) {
                Ok(t) => t,
                Err(_) => return WsResponse::err(&req.id, "invalid turn params"),
            };
            match state.run_turn(&turn).await {
                Ok(replies) => WsResponse::ok(
                    &req.id,
                    serde_json::to_value(TurnResponse { replies }).unwrap_or(json!({})),
                ),
                Err(e) => {
                    log::error!("turn failed: {}", e);
                    WsResponse::err(&req.id, "turn could not be processed")
                }
            }
        }
        _ => WsResponse::err(&req.id, format!("unknown method: {}", req.method)),
    }
}
