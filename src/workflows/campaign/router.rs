use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{CampaignId, CandidateId};
use super::pipeline::{
    CandidateEvaluator, CandidateSourcer, OutreachDrafter, PipelineError, PipelineOrchestrator,
};
use super::registry::RegistryError;
use super::store::CampaignStoreError;

/// Router builder exposing the campaign operations over HTTP. The handlers
/// are deliberately thin: validation and state rules live in the store and
/// orchestrator.
pub fn campaign_router<S, E, D>(orchestrator: Arc<PipelineOrchestrator<S, E, D>>) -> Router
where
    S: CandidateSourcer + 'static,
    E: CandidateEvaluator + 'static,
    D: OutreachDrafter + 'static,
{
    Router::new()
        .route(
            "/api/v1/campaigns",
            post(create_handler::<S, E, D>).get(list_handler::<S, E, D>),
        )
        .route(
            "/api/v1/campaigns/:campaign_id",
            get(get_handler::<S, E, D>).delete(purge_handler::<S, E, D>),
        )
        .route(
            "/api/v1/campaigns/:campaign_id/run",
            post(run_handler::<S, E, D>),
        )
        .route(
            "/api/v1/campaigns/:campaign_id/audit",
            get(audit_handler::<S, E, D>),
        )
        .route(
            "/api/v1/campaigns/:campaign_id/review/complete",
            post(complete_review_handler::<S, E, D>),
        )
        .route(
            "/api/v1/campaigns/:campaign_id/outreach/:candidate_id/:draft_index/approve",
            post(approve_handler::<S, E, D>),
        )
        .route(
            "/api/v1/campaigns/:campaign_id/outreach/:candidate_id/:draft_index/send",
            post(send_handler::<S, E, D>),
        )
        .with_state(orchestrator)
}

#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub job_description: String,
}

type Orchestrator<S, E, D> = Arc<PipelineOrchestrator<S, E, D>>;

pub(crate) async fn create_handler<S, E, D>(
    State(orchestrator): State<Orchestrator<S, E, D>>,
    axum::Json(request): axum::Json<CreateCampaignRequest>,
) -> Response
where
    S: CandidateSourcer + 'static,
    E: CandidateEvaluator + 'static,
    D: OutreachDrafter + 'static,
{
    match orchestrator.store().create(&request.job_description) {
        Ok(id) => (
            StatusCode::CREATED,
            axum::Json(json!({ "campaign_id": id.0 })),
        )
            .into_response(),
        Err(err) => store_error_response(err),
    }
}

pub(crate) async fn list_handler<S, E, D>(
    State(orchestrator): State<Orchestrator<S, E, D>>,
) -> Response
where
    S: CandidateSourcer + 'static,
    E: CandidateEvaluator + 'static,
    D: OutreachDrafter + 'static,
{
    match orchestrator.store().list() {
        Ok(summaries) => (StatusCode::OK, axum::Json(summaries)).into_response(),
        Err(err) => store_error_response(err),
    }
}

pub(crate) async fn get_handler<S, E, D>(
    State(orchestrator): State<Orchestrator<S, E, D>>,
    Path(campaign_id): Path<String>,
) -> Response
where
    S: CandidateSourcer + 'static,
    E: CandidateEvaluator + 'static,
    D: OutreachDrafter + 'static,
{
    let id = CampaignId(campaign_id);
    match orchestrator.store().get(&id) {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(err) => store_error_response(err),
    }
}

pub(crate) async fn run_handler<S, E, D>(
    State(orchestrator): State<Orchestrator<S, E, D>>,
    Path(campaign_id): Path<String>,
) -> Response
where
    S: CandidateSourcer + 'static,
    E: CandidateEvaluator + 'static,
    D: OutreachDrafter + 'static,
{
    let id = CampaignId(campaign_id);
    match orchestrator.run_to_review(&id).await {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(err) => pipeline_error_response(err),
    }
}

pub(crate) async fn audit_handler<S, E, D>(
    State(orchestrator): State<Orchestrator<S, E, D>>,
    Path(campaign_id): Path<String>,
) -> Response
where
    S: CandidateSourcer + 'static,
    E: CandidateEvaluator + 'static,
    D: OutreachDrafter + 'static,
{
    let id = CampaignId(campaign_id);
    let entries = orchestrator.store().audit_entries(&id);
    (StatusCode::OK, axum::Json(entries)).into_response()
}

pub(crate) async fn complete_review_handler<S, E, D>(
    State(orchestrator): State<Orchestrator<S, E, D>>,
    Path(campaign_id): Path<String>,
) -> Response
where
    S: CandidateSourcer + 'static,
    E: CandidateEvaluator + 'static,
    D: OutreachDrafter + 'static,
{
    let id = CampaignId(campaign_id);
    match orchestrator.store().complete_review(&id) {
        Ok(()) => (StatusCode::OK, axum::Json(json!({ "status": "completed" }))).into_response(),
        Err(err) => store_error_response(err),
    }
}

pub(crate) async fn approve_handler<S, E, D>(
    State(orchestrator): State<Orchestrator<S, E, D>>,
    Path((campaign_id, candidate_id, draft_index)): Path<(String, String, usize)>,
) -> Response
where
    S: CandidateSourcer + 'static,
    E: CandidateEvaluator + 'static,
    D: OutreachDrafter + 'static,
{
    let id = CampaignId(campaign_id);
    let candidate = CandidateId(candidate_id);
    match orchestrator
        .store()
        .approve_outreach(&id, &candidate, draft_index)
    {
        Ok(()) => (StatusCode::OK, axum::Json(json!({ "approved": true }))).into_response(),
        Err(err) => store_error_response(err),
    }
}

pub(crate) async fn send_handler<S, E, D>(
    State(orchestrator): State<Orchestrator<S, E, D>>,
    Path((campaign_id, candidate_id, draft_index)): Path<(String, String, usize)>,
) -> Response
where
    S: CandidateSourcer + 'static,
    E: CandidateEvaluator + 'static,
    D: OutreachDrafter + 'static,
{
    let id = CampaignId(campaign_id);
    let candidate = CandidateId(candidate_id);
    match orchestrator.store().mark_sent(&id, &candidate, draft_index) {
        Ok(()) => (StatusCode::OK, axum::Json(json!({ "sent": true }))).into_response(),
        Err(err) => store_error_response(err),
    }
}

pub(crate) async fn purge_handler<S, E, D>(
    State(orchestrator): State<Orchestrator<S, E, D>>,
    Path(campaign_id): Path<String>,
) -> Response
where
    S: CandidateSourcer + 'static,
    E: CandidateEvaluator + 'static,
    D: OutreachDrafter + 'static,
{
    let id = CampaignId(campaign_id);
    match orchestrator.store().purge(&id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => store_error_response(err),
    }
}

fn store_error_response(err: CampaignStoreError) -> Response {
    let status = match &err {
        CampaignStoreError::Validation(_) | CampaignStoreError::DraftIndexOutOfBounds { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        CampaignStoreError::CampaignNotFound | CampaignStoreError::CandidateNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        CampaignStoreError::Registry(RegistryError::UnknownCandidate(_)) => StatusCode::NOT_FOUND,
        CampaignStoreError::InvalidState { .. }
        | CampaignStoreError::InvalidTransition { .. }
        | CampaignStoreError::Registry(RegistryError::EvaluationAlreadyRecorded(_)) => {
            StatusCode::CONFLICT
        }
        CampaignStoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, axum::Json(json!({ "error": err.to_string() }))).into_response()
}

fn pipeline_error_response(err: PipelineError) -> Response {
    match err {
        PipelineError::Store(store_err) => store_error_response(store_err),
        PipelineError::Collaborator { .. } => (
            StatusCode::BAD_GATEWAY,
            axum::Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
        PipelineError::Concurrency => (
            StatusCode::CONFLICT,
            axum::Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}
