//! REST endpoints for the onboarding workflow.
//!
//! The presentation layer talks to the engine through these routes. The
//! actor's roles arrive from the identity provider as the
//! `x-actor-roles` header (comma-separated tags); an unknown tag is a
//! 400 at the boundary, never a silent mismatch inside the workflow.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{DatabaseError, WorkflowError};
use crate::roles::RoleSet;

use super::controller::WorkflowController;
use super::steps::{visible_steps, StepId};

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub controller: Arc<WorkflowController>,
}

/// Extract the actor's role set from the identity header.
fn actor_roles(headers: &HeaderMap) -> Result<RoleSet, Response> {
    let raw = headers
        .get("x-actor-roles")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    RoleSet::parse_list(raw).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": e })),
        )
            .into_response()
    })
}

/// Map workflow errors onto HTTP responses.
fn workflow_error_response(err: WorkflowError) -> Response {
    match err {
        WorkflowError::Locked => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "error": "locked" })),
        )
            .into_response(),
        WorkflowError::InvalidTransition { from, target } => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "error": "invalid_transition",
                "from": from,
                "target": target,
            })),
        )
            .into_response(),
        WorkflowError::StepNotVisible(step) => (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({ "error": "step_not_visible", "step": step })),
        )
            .into_response(),
        WorkflowError::IncompleteRequirements { items } => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "error": "incomplete_requirements",
                "items": items,
            })),
        )
            .into_response(),
        WorkflowError::NoAccessibleSteps => (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({ "error": "no_accessible_steps" })),
        )
            .into_response(),
        WorkflowError::Conflict => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "error": "concurrent_update" })),
        )
            .into_response(),
        WorkflowError::Database(DatabaseError::NotFound { entity, id }) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "not_found", "entity": entity, "id": id })),
        )
            .into_response(),
        WorkflowError::Database(e) => {
            tracing::error!("Onboarding request failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "internal" })),
            )
                .into_response()
        }
    }
}

/// GET /api/onboarding/{institution_id}/status
///
/// Loads (creating on first open) the institution's progress and returns
/// it together with the steps visible to this actor.
async fn get_status(
    State(state): State<OnboardingRouteState>,
    Path(institution_id): Path<Uuid>,
    headers: HeaderMap,
) -> Response {
    let roles = match actor_roles(&headers) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match state.controller.load_or_init(institution_id, &roles).await {
        Ok(progress) => Json(serde_json::json!({
            "progress": progress,
            "visible_steps": visible_steps(&roles),
        }))
        .into_response(),
        Err(e) => workflow_error_response(e),
    }
}

/// GET /api/onboarding/{institution_id}/checklist
async fn get_checklist(
    State(state): State<OnboardingRouteState>,
    Path(institution_id): Path<Uuid>,
    headers: HeaderMap,
) -> Response {
    let roles = match actor_roles(&headers) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let items = state.controller.checklist(institution_id, &roles).await;
    Json(serde_json::json!({ "items": items })).into_response()
}

#[derive(Debug, Deserialize)]
struct UpdateStepBody {
    target: StepId,
}

/// POST /api/onboarding/{institution_id}/step
async fn post_update_step(
    State(state): State<OnboardingRouteState>,
    Path(institution_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<UpdateStepBody>,
) -> Response {
    let roles = match actor_roles(&headers) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match state
        .controller
        .update_step(institution_id, &roles, body.target)
        .await
    {
        Ok(progress) => Json(progress).into_response(),
        Err(e) => workflow_error_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct CompleteStepBody {
    step: StepId,
}

/// POST /api/onboarding/{institution_id}/complete
async fn post_complete_step(
    State(state): State<OnboardingRouteState>,
    Path(institution_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<CompleteStepBody>,
) -> Response {
    let roles = match actor_roles(&headers) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match state
        .controller
        .complete_step(institution_id, &roles, body.step)
        .await
    {
        Ok(progress) => Json(progress).into_response(),
        Err(e) => workflow_error_response(e),
    }
}

/// POST /api/onboarding/{institution_id}/go-live
async fn post_go_live(
    State(state): State<OnboardingRouteState>,
    Path(institution_id): Path<Uuid>,
    headers: HeaderMap,
) -> Response {
    let roles = match actor_roles(&headers) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match state.controller.go_live(institution_id, &roles).await {
        Ok(progress) => Json(progress).into_response(),
        Err(e) => workflow_error_response(e),
    }
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/api/onboarding/{institution_id}/status", get(get_status))
        .route(
            "/api/onboarding/{institution_id}/checklist",
            get(get_checklist),
        )
        .route("/api/onboarding/{institution_id}/step", post(post_update_step))
        .route(
            "/api/onboarding/{institution_id}/complete",
            post(post_complete_step),
        )
        .route("/api/onboarding/{institution_id}/go-live", post(post_go_live))
        .with_state(state)
}
