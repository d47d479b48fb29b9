use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::admin::{RuleAdminError, RuleAdminService};
use super::domain::{LeadId, LeadPatch, LeadSubmission, RuleDraft, RuleId, RuleStatus};
use super::repository::{AutomationNotifier, LeadRepository, RuleRepository};
use super::service::{LeadService, LeadServiceError};

/// Router exposing lead intake and lookup.
pub fn lead_router<L, R, N>(service: Arc<LeadService<L, R, N>>) -> Router
where
    L: LeadRepository + 'static,
    R: RuleRepository + 'static,
    N: AutomationNotifier + 'static,
{
    Router::new()
        .route("/api/leads", post(create_lead_handler::<L, R, N>))
        .route(
            "/api/leads/:lead_id",
            get(get_lead_handler::<L, R, N>).patch(update_lead_handler::<L, R, N>),
        )
        .with_state(service)
}

/// Router exposing scoring rule administration.
pub fn rule_router<R>(service: Arc<RuleAdminService<R>>) -> Router
where
    R: RuleRepository + 'static,
{
    Router::new()
        .route(
            "/api/lead-scoring/rules",
            get(list_rules_handler::<R>).post(create_rule_handler::<R>),
        )
        .route(
            "/api/lead-scoring/rules/:rule_id/status",
            patch(rule_status_handler::<R>),
        )
        .with_state(service)
}

pub(crate) async fn create_lead_handler<L, R, N>(
    State(service): State<Arc<LeadService<L, R, N>>>,
    axum::Json(submission): axum::Json<LeadSubmission>,
) -> Response
where
    L: LeadRepository + 'static,
    R: RuleRepository + 'static,
    N: AutomationNotifier + 'static,
{
    match service.create(submission).await {
        Ok(envelope) => (StatusCode::CREATED, axum::Json(envelope)).into_response(),
        Err(error) => lead_error_response(error),
    }
}

pub(crate) async fn update_lead_handler<L, R, N>(
    State(service): State<Arc<LeadService<L, R, N>>>,
    Path(lead_id): Path<i64>,
    axum::Json(patch): axum::Json<LeadPatch>,
) -> Response
where
    L: LeadRepository + 'static,
    R: RuleRepository + 'static,
    N: AutomationNotifier + 'static,
{
    match service.update(LeadId(lead_id), patch).await {
        Ok(envelope) => (StatusCode::OK, axum::Json(envelope)).into_response(),
        Err(error) => lead_error_response(error),
    }
}

pub(crate) async fn get_lead_handler<L, R, N>(
    State(service): State<Arc<LeadService<L, R, N>>>,
    Path(lead_id): Path<i64>,
) -> Response
where
    L: LeadRepository + 'static,
    R: RuleRepository + 'static,
    N: AutomationNotifier + 'static,
{
    match service.get(LeadId(lead_id)).await {
        Ok(lead) => (StatusCode::OK, axum::Json(lead)).into_response(),
        Err(error) => lead_error_response(error),
    }
}

fn lead_error_response(error: LeadServiceError) -> Response {
    let status = match &error {
        LeadServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LeadServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        LeadServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct RuleStatusRequest {
    pub(crate) status: RuleStatus,
}

pub(crate) async fn list_rules_handler<R>(State(service): State<Arc<RuleAdminService<R>>>) -> Response
where
    R: RuleRepository + 'static,
{
    match service.list_rules().await {
        Ok(rules) => (StatusCode::OK, axum::Json(rules)).into_response(),
        Err(error) => rule_error_response(error),
    }
}

pub(crate) async fn create_rule_handler<R>(
    State(service): State<Arc<RuleAdminService<R>>>,
    axum::Json(draft): axum::Json<RuleDraft>,
) -> Response
where
    R: RuleRepository + 'static,
{
    match service.create_rule(draft).await {
        Ok(rule) => (StatusCode::CREATED, axum::Json(rule)).into_response(),
        Err(error) => rule_error_response(error),
    }
}

pub(crate) async fn rule_status_handler<R>(
    State(service): State<Arc<RuleAdminService<R>>>,
    Path(rule_id): Path<i64>,
    axum::Json(request): axum::Json<RuleStatusRequest>,
) -> Response
where
    R: RuleRepository + 'static,
{
    match service.set_status(RuleId(rule_id), request.status).await {
        Ok(rule) => (StatusCode::OK, axum::Json(rule)).into_response(),
        Err(error) => rule_error_response(error),
    }
}

fn rule_error_response(error: RuleAdminError) -> Response {
    let status = match &error {
        RuleAdminError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RuleAdminError::NotFound(_) => StatusCode::NOT_FOUND,
        RuleAdminError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
