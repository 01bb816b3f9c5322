//! Gateway HTTP + WebSocket server (single port) exposing the broker's
//! list / describe / run operations.

use crate::broker::SkillBroker;
use crate::config::{self, Config};
use crate::exec::UvScriptRunner;
use crate::gateway::protocol::{
    ConnectParams, DescribeParams, HelloOk, RunParams, WsRequest, WsResponse,
};
use crate::init;
use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

const PROTOCOL_VERSION: u32 = 1;

const SHUTDOWN_EVENT_JSON: &str = r#"{"type":"event","event":"shutdown","payload":{}}"#;

/// When auth mode is token and a token is configured, returns it for connect validation.
fn require_connect_token(config: &Config) -> Option<String> {
    if config.gateway.auth.mode == config::GatewayAuthMode::Token {
        config::resolve_gateway_token(config)
    } else {
        None
    }
}

/// Queue a reply from the socket loop without awaiting: the loop is also the
/// channel's consumer, so a blocking send here could deadlock against a slow
/// client. Under flood the reply is dropped.
fn send_or_drop(tx: &mpsc::Sender<WsResponse>, res: WsResponse) {
    if tx.try_send(res).is_err() {
        log::debug!("dropping ws response: outbound queue full or closed");
    }
}

/// Shared state for the gateway (config, broker, event broadcast).
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    /// When Some, WebSocket connect must provide params.auth.token matching this.
    pub required_token: Option<String>,
    pub broker: Arc<SkillBroker>,
    /// Broadcasts events to connected clients (e.g. shutdown).
    pub event_tx: broadcast::Sender<String>,
}

/// Run the gateway server; binds to config.gateway.bind:config.gateway.port.
/// When bind is not loopback, a gateway token must be configured or startup fails.
/// Blocks until shutdown (e.g. Ctrl+C).
/// `config_path` is the path to the config file (used to resolve the skills root).
/// Requires the configuration directory to be initialized (`satchel init`).
pub async fn run_gateway(config: Config, config_path: PathBuf) -> Result<()> {
    init::require_initialized(&config_path, &config)?;
    let bind = config.gateway.bind.trim().to_string();
    if !config::is_loopback_bind(&bind) {
        let token = config::resolve_gateway_token(&config);
        if token.is_none() || config.gateway.auth.mode != config::GatewayAuthMode::Token {
            anyhow::bail!(
                "refusing to bind gateway to {} without auth (set gateway.auth.mode to \"token\" and gateway.auth.token or SATCHEL_GATEWAY_TOKEN)",
                bind
            );
        }
    }

    let required_token = require_connect_token(&config);
    let (event_tx, _) = broadcast::channel(64);

    let skills_root = config::resolve_skills_dir(&config, &config_path);
    let runner = Arc::new(UvScriptRunner::new(
        config.runner.uv_bin.clone(),
        config.runner.timeout(),
    ));
    let broker = Arc::new(SkillBroker::new(&skills_root, runner));
    log::info!(
        "serving {} skill(s) from {}",
        broker.store().list_units().len(),
        skills_root.display()
    );

    let state = GatewayState {
        config: Arc::new(config.clone()),
        required_token,
        broker,
        event_tx: event_tx.clone(),
    };

    let app = Router::new()
        .route("/", get(health_http))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let bind_addr = format!("{}:{}", bind, config.gateway.port);
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
/// Broadcasts a shutdown event to WebSocket clients first.
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

/// GET /ws upgrades to WebSocket. First frame must be connect; we reply with hello-ok.
async fn ws_handler(State(state): State<GatewayState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: GatewayState) {
    let conn_id = uuid::Uuid::new_v4();
    let mut event_rx = state.event_tx.subscribe();

    // All replies funnel through one writer channel so skill operations can
    // run on their own tasks; a hung script never blocks health or other
    // requests on this connection.
    let (out_tx, mut out_rx) = mpsc::channel::<WsResponse>(64);
    let mut connected = false;

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
                        log::debug!("ws client {} lagged {} broadcast messages", conn_id, n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            Some(res) = out_rx.recv() => {
                let _ = socket
                    .send(Message::Text(serde_json::to_string(&res).unwrap_or_default()))
                    .await;
            }
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                let Message::Text(text) = msg else { continue };
                let Ok(req): Result<WsRequest, _> = serde_json::from_str(&text) else { continue };

                if req.typ != "req" {
                    continue;
                }

                match req.method.as_str() {
                    "connect" => {
                        let params: ConnectParams =
                            serde_json::from_value(req.params.clone()).unwrap_or_default();
                        if let Some(ref required) = state.required_token {
                            let provided = params.auth.token.as_deref().unwrap_or("").trim();
                            if provided.is_empty() {
                                send_or_drop(&out_tx, WsResponse::err(
                                    &req.id,
                                    "unauthorized: gateway token missing (set SATCHEL_GATEWAY_TOKEN or gateway.auth.token)",
                                ));
                                continue;
                            }
                            if provided != required {
                                send_or_drop(
                                    &out_tx,
                                    WsResponse::err(&req.id, "unauthorized: gateway token mismatch"),
                                );
                                continue;
                            }
                        }
                        let protocol = params
                            .max_protocol
                            .unwrap_or(PROTOCOL_VERSION)
                            .min(PROTOCOL_VERSION);
                        let hello = HelloOk {
                            typ: "hello-ok".to_string(),
                            protocol,
                        };
                        connected = true;
                        log::debug!("ws client {} connected", conn_id);
                        send_or_drop(
                            &out_tx,
                            WsResponse::ok(&req.id, serde_json::to_value(&hello).unwrap_or(json!({}))),
                        );
                    }
                    "health" => {
                        let payload = json!({
                            "runtime": "running",
                            "protocol": PROTOCOL_VERSION,
                        });
                        send_or_drop(&out_tx, WsResponse::ok(&req.id, payload));
                    }
                    _ if !connected => {
                        send_or_drop(
                            &out_tx,
                            WsResponse::err(&req.id, "not connected: send connect first"),
                        );
                    }
                    "status" => {
                        let auth_mode = if state.required_token.is_some() {
                            "token"
                        } else {
                            "none"
                        };
                        let names: Vec<String> = state
                            .broker
                            .store()
                            .list_units()
                            .into_iter()
                            .map(|u| u.name)
                            .collect();
                        let payload = json!({
                            "runtime": "running",
                            "protocol": PROTOCOL_VERSION,
                            "port": state.config.gateway.port,
                            "bind": state.config.gateway.bind,
                            "auth": auth_mode,
                            "skillsRoot": state.broker.store().root(),
                            "skills": names,
                        });
                        send_or_drop(&out_tx, WsResponse::ok(&req.id, payload));
                    }
                    "skills.index" => {
                        let broker = state.broker.clone();
                        let out = out_tx.clone();
                        let id = req.id.clone();
                        tokio::spawn(async move {
                            let res = match broker.skills_index() {
                                Ok(text) => WsResponse::ok(&id, json!({ "index": text })),
                                Err(e) => WsResponse::err(&id, e.to_string()),
                            };
                            let _ = out.send(res).await;
                        });
                    }
                    "skills.list" => {
                        let broker = state.broker.clone();
                        let out = out_tx.clone();
                        let id = req.id.clone();
                        tokio::spawn(async move {
                            let res = match broker.list_skills_summary() {
                                Ok(list) => WsResponse::ok(&id, json!({ "skills": list })),
                                Err(e) => WsResponse::err(&id, e.to_string()),
                            };
                            let _ = out.send(res).await;
                        });
                    }
                    "skills.describe" => {
                        let params: DescribeParams = match serde_json::from_value(req.params.clone()) {
                            Ok(p) => p,
                            Err(_) => {
                                send_or_drop(
                                    &out_tx,
                                    WsResponse::err(&req.id, "invalid skills.describe params"),
                                );
                                continue;
                            }
                        };
                        let broker = state.broker.clone();
                        let out = out_tx.clone();
                        let id = req.id.clone();
                        tokio::spawn(async move {
                            let res = match broker.render_skill_for_client(&params.skill_name).await {
                                Ok(text) => WsResponse::ok(&id, json!({ "skill": text })),
                                Err(e) => WsResponse::err(&id, e.to_string()),
                            };
                            let _ = out.send(res).await;
                        });
                    }
                    "skills.run" => {
                        let params: RunParams = match serde_json::from_value(req.params.clone()) {
                            Ok(p) => p,
                            Err(_) => {
                                send_or_drop(
                                    &out_tx,
                                    WsResponse::err(&req.id, "invalid skills.run params"),
                                );
                                continue;
                            }
                        };
                        let broker = state.broker.clone();
                        let out = out_tx.clone();
                        let id = req.id.clone();
                        tokio::spawn(async move {
                            let res = match broker
                                .run_skill_script(
                                    &params.skill_name,
                                    &params.script_name,
                                    params.argv,
                                    params.stdin,
                                )
                                .await
                            {
                                Ok(result) => WsResponse::ok(
                                    &id,
                                    serde_json::to_value(&result).unwrap_or(json!({})),
                                ),
                                Err(e) => WsResponse::err(&id, e.to_string()),
                            };
                            let _ = out.send(res).await;
                        });
                    }
                    _ => {
                        send_or_drop(
                            &out_tx,
                            WsResponse::err(&req.id, format!("unknown method: {}", req.method)),
                        );
                    }
                }
            }
        }
    }

    if !connected {
        log::debug!("ws client {} disconnected before sending connect", conn_id);
    }
}
