//! REST endpoints for onboarding progression.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::access::AccessHub;
use crate::error::OnboardingError;
use crate::onboarding::manager::{OnboardingManager, WriteOutcome};
use crate::session::IdentityId;

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub manager: Arc<OnboardingManager>,
    pub hub: Arc<AccessHub>,
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/api/onboarding/status", get(get_status))
        .route("/api/onboarding/advance", post(advance))
        .route("/api/onboarding/retreat", post(retreat))
        .route("/api/onboarding/complete", post(complete))
        .route("/api/onboarding/account-setup", post(account_setup))
        .with_state(state)
}

/// Resolve the signed-in identity, or 401 if nobody is.
fn require_identity(state: &OnboardingRouteState) -> Result<IdentityId, (StatusCode, Json<serde_json::Value>)> {
    state.hub.session().current_identity().ok_or((
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({"error": "Not signed in"})),
    ))
}

/// Map an onboarding error onto a status code + JSON body.
///
/// Write failures are retryable: the profile is still on the prior step.
fn error_response(err: OnboardingError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match err {
        OnboardingError::ProfileMissing { .. } => StatusCode::NOT_FOUND,
        OnboardingError::WriteFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({"error": err.to_string(), "retryable": status == StatusCode::INTERNAL_SERVER_ERROR})))
}

/// Render a write outcome.
fn outcome_response(outcome: WriteOutcome) -> Json<serde_json::Value> {
    let body = match outcome {
        WriteOutcome::Applied(step) => {
            serde_json::json!({"outcome": "applied", "step": step})
        }
        WriteOutcome::Unchanged(step) => {
            serde_json::json!({"outcome": "unchanged", "step": step})
        }
        WriteOutcome::Superseded => serde_json::json!({"outcome": "superseded"}),
    };
    Json(body)
}

/// GET /api/onboarding/status
async fn get_status(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    let identity = match require_identity(&state) {
        Ok(identity) => identity,
        Err(resp) => return resp.into_response(),
    };
    match state.manager.status(identity).await {
        Ok(status) => Json(status).into_response(),
        Err(err) => error_response(err).into_response(),
    }
}

/// POST /api/onboarding/advance
async fn advance(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    step_transition(&state, |manager, identity| async move {
        manager.advance(identity).await
    })
    .await
}

/// POST /api/onboarding/retreat
async fn retreat(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    step_transition(&state, |manager, identity| async move {
        manager.retreat(identity).await
    })
    .await
}

/// POST /api/onboarding/complete
async fn complete(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    step_transition(&state, |manager, identity| async move {
        manager.complete(identity).await
    })
    .await
}

#[derive(Deserialize)]
struct AccountSetupRequest {
    #[serde(default)]
    display_name: Option<String>,
}

/// POST /api/onboarding/account-setup
async fn account_setup(
    State(state): State<OnboardingRouteState>,
    Json(body): Json<AccountSetupRequest>,
) -> impl IntoResponse {
    let identity = match require_identity(&state) {
        Ok(identity) => identity,
        Err(resp) => return resp.into_response(),
    };
    match state
        .manager
        .complete_account_setup(identity, body.display_name.as_deref())
        .await
    {
        Ok(outcome) => {
            state.hub.notify_profile_changed().await;
            outcome_response(outcome).into_response()
        }
        Err(err) => error_response(err).into_response(),
    }
}

/// Shared shape of the advance/retreat/complete handlers: resolve the
/// identity, run the transition, rebroadcast on success.
async fn step_transition<F, Fut>(
    state: &OnboardingRouteState,
    op: F,
) -> axum::response::Response
where
    F: FnOnce(Arc<OnboardingManager>, IdentityId) -> Fut,
    Fut: std::future::Future<Output = Result<WriteOutcome, OnboardingError>>,
{
    let identity = match require_identity(state) {
        Ok(identity) => identity,
        Err(resp) => return resp.into_response(),
    };
    match op(Arc::clone(&state.manager), identity).await {
        Ok(outcome) => {
            if matches!(outcome, WriteOutcome::Applied(_)) {
                state.hub.notify_profile_changed().await;
            }
            outcome_response(outcome).into_response()
        }
        Err(err) => error_response(err).into_response(),
    }
}
