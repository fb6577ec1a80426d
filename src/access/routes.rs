//! WebSocket + REST endpoints for the access state.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::access::gate::{self, RouteFamily};
use crate::access::hub::{AccessEvent, AccessHub};
use crate::preview::PreviewRole;
use crate::profile::{ProfileStore, Role};
use crate::session::IdentityId;

/// Application state shared across access handlers.
#[derive(Clone)]
pub struct AccessRouteState {
    pub hub: Arc<AccessHub>,
    pub store: Arc<dyn ProfileStore>,
}

/// Build the Axum router with access WebSocket and REST routes.
pub fn access_routes(hub: Arc<AccessHub>, store: Arc<dyn ProfileStore>) -> Router {
    let state = AccessRouteState { hub, store };

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/api/access/state", get(get_state))
        .route("/api/access/routes/{family}", get(gate_route))
        .route("/api/session/sign-in", post(sign_in))
        .route("/api/session/sign-out", post(sign_out))
        .route("/api/preview", post(set_preview).delete(exit_preview))
        .route("/api/admin/role", post(set_role))
        .route("/api/admin/group", post(set_group))
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "mentorhub-access"
    }))
}

// ── WebSocket ───────────────────────────────────────────────────────────

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AccessRouteState>) -> impl IntoResponse {
    info!("WebSocket client connecting");
    ws.on_upgrade(|socket| handle_socket(socket, state.hub))
}

async fn handle_socket(mut socket: WebSocket, hub: Arc<AccessHub>) {
    info!("WebSocket client connected");

    // Send the current resolution on connect
    let sync = AccessEvent::Sync {
        resolution: hub.resolve().await,
    };
    if let Ok(json) = serde_json::to_string(&sync) {
        if socket.send(Message::Text(json.into())).await.is_err() {
            warn!("Failed to send initial sync, client disconnected");
            return;
        }
    }

    // Subscribe to broadcast channel for real-time updates
    let mut rx = hub.subscribe();

    loop {
        tokio::select! {
            // Forward broadcast events to this client
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        if let Ok(json) = serde_json::to_string(&event) {
                            if socket.send(Message::Text(json.into())).await.is_err() {
                                debug!("Client disconnected during send");
                                break;
                            }
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!(missed = n, "WS client lagged behind broadcast");
                        // Re-sync with the current resolution
                        let sync = AccessEvent::Sync {
                            resolution: hub.resolve().await,
                        };
                        if let Ok(json) = serde_json::to_string(&sync) {
                            if socket.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        debug!("Broadcast channel closed");
                        break;
                    }
                }
            }

            // The client only listens; handle keepalive and close frames
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(Message::Text(text))) => {
                        debug!(text = %text, "Ignoring WS message from client");
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("WebSocket connection closed");
}

// ── REST Endpoints ──────────────────────────────────────────────────────

/// GET /api/access/state
async fn get_state(State(state): State<AccessRouteState>) -> impl IntoResponse {
    Json(state.hub.resolve().await)
}

/// GET /api/access/routes/{family}
///
/// Gate one requested route family against the current surface.
async fn gate_route(
    State(state): State<AccessRouteState>,
    Path(family): Path<String>,
) -> impl IntoResponse {
    let Some(family) = RouteFamily::try_parse(&family) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Unknown route family"})),
        )
            .into_response();
    };

    let resolution = state.hub.resolve().await;
    let decision = gate::gate(resolution.surface, family);
    Json(serde_json::json!({"requested": family, "decision": decision})).into_response()
}

#[derive(Deserialize)]
struct SignInRequest {
    /// Identity handle issued by the provider; minted fresh when absent.
    #[serde(default)]
    identity: Option<Uuid>,
}

/// POST /api/session/sign-in
async fn sign_in(
    State(state): State<AccessRouteState>,
    Json(body): Json<SignInRequest>,
) -> impl IntoResponse {
    let identity: IdentityId = body.identity.map(Into::into).unwrap_or_default();
    state.hub.sign_in(identity).await;
    let resolution = state.hub.resolve().await;
    Json(serde_json::json!({"identity": identity, "resolution": resolution}))
}

/// POST /api/session/sign-out
async fn sign_out(State(state): State<AccessRouteState>) -> impl IntoResponse {
    state.hub.sign_out().await;
    Json(state.hub.resolve().await)
}

#[derive(Deserialize)]
struct PreviewRequest {
    role: PreviewRole,
}

/// POST /api/preview
///
/// Activate an admin preview. For a non-admin this is a no-op by contract,
/// reported as `applied: false`.
async fn set_preview(
    State(state): State<AccessRouteState>,
    Json(body): Json<PreviewRequest>,
) -> impl IntoResponse {
    let applied = state.hub.set_preview(body.role).await;
    let resolution = state.hub.resolve().await;
    Json(serde_json::json!({"applied": applied, "resolution": resolution}))
}

/// DELETE /api/preview
async fn exit_preview(State(state): State<AccessRouteState>) -> impl IntoResponse {
    state.hub.exit_preview().await;
    Json(state.hub.resolve().await)
}

/// Require the signed-in identity's real role to be admin.
///
/// The real (stored) role, not the effective one: a previewing admin keeps
/// admin rights over data while seeing mentor/mentee routes.
async fn require_admin(state: &AccessRouteState) -> Result<(), (StatusCode, Json<serde_json::Value>)> {
    match state.hub.real_role().await {
        Some(Role::Admin) => Ok(()),
        _ => Err((
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({"error": "Admin role required"})),
        )),
    }
}

#[derive(Deserialize)]
struct SetRoleRequest {
    identity: Uuid,
    role: Role,
}

/// POST /api/admin/role
async fn set_role(
    State(state): State<AccessRouteState>,
    Json(body): Json<SetRoleRequest>,
) -> impl IntoResponse {
    if let Err(resp) = require_admin(&state).await {
        return resp.into_response();
    }

    match state.store.set_role(body.identity.into(), body.role).await {
        Ok(()) => {
            info!(identity = %body.identity, role = %body.role, "Role updated");
            state.hub.notify_profile_changed().await;
            Json(serde_json::json!({"status": "updated"})).into_response()
        }
        Err(crate::error::StoreError::NotFound { .. }) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "Profile not found"})),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}

#[derive(Deserialize)]
struct SetGroupRequest {
    identity: Uuid,
    #[serde(default)]
    group_id: Option<Uuid>,
}

/// POST /api/admin/group
async fn set_group(
    State(state): State<AccessRouteState>,
    Json(body): Json<SetGroupRequest>,
) -> impl IntoResponse {
    if let Err(resp) = require_admin(&state).await {
        return resp.into_response();
    }

    match state
        .store
        .set_group(body.identity.into(), body.group_id)
        .await
    {
        Ok(()) => {
            info!(identity = %body.identity, "Group assignment updated");
            state.hub.notify_profile_changed().await;
            Json(serde_json::json!({"status": "updated"})).into_response()
        }
        Err(crate::error::StoreError::NotFound { .. }) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "Profile not found"})),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}
