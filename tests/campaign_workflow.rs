use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use talent_ai::workflows::campaign::demo::{
    HeuristicEvaluator, ProfilePoolSourcer, TemplateDrafter,
};
use talent_ai::workflows::campaign::{
    campaign_router, CampaignStore, PipelineConfig, PipelineOrchestrator,
};

fn app() -> Router {
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        Arc::new(CampaignStore::in_memory()),
        Arc::new(ProfilePoolSourcer::default()),
        Arc::new(HeuristicEvaluator::default()),
        Arc::new(TemplateDrafter::default()),
        PipelineConfig::default(),
    ));
    campaign_router(orchestrator)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("request handled");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body read");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request built")
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .expect("request built")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request built")
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .expect("request built")
}

#[tokio::test]
async fn campaign_lifecycle_over_http() {
    let app = app();

    // Create.
    let (status, body) = send(
        &app,
        post_json(
            "/api/v1/campaigns",
            json!({ "job_description": "Senior Backend Engineer" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let campaign_id = body["campaign_id"].as_str().expect("id present").to_string();

    // Run to review.
    let (status, view) = send(
        &app,
        post_empty(&format!("/api/v1/campaigns/{campaign_id}/run")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["status"], "awaiting_review");
    let candidates = view["candidates"].as_array().expect("candidate array");
    assert_eq!(candidates.len(), 4);
    let ranked: Vec<&Value> = candidates
        .iter()
        .filter(|candidate| !candidate["rank"].is_null())
        .collect();
    assert_eq!(ranked.len(), 2, "flagged pool members stay off the shortlist");
    assert_eq!(view["metrics"]["ranked_count"], 2);
    assert_eq!(view["outreach_drafts"].as_object().expect("draft map").len(), 2);

    // Listing includes the campaign.
    let (status, listing) = send(&app, get("/api/v1/campaigns")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(listing
        .as_array()
        .expect("summary array")
        .iter()
        .any(|summary| summary["campaign_id"] == campaign_id.as_str()));

    // The audit trail starts with creation.
    let (status, audit) = send(
        &app,
        get(&format!("/api/v1/campaigns/{campaign_id}/audit")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let entries = audit.as_array().expect("entry array");
    assert!(entries.len() > 4);
    assert_eq!(entries[0]["event"], "campaign_created");

    // Approve one variant for each ranked candidate; the campaign completes
    // on its own.
    for candidate in &ranked {
        let candidate_id = candidate["id"].as_str().expect("candidate id");
        let (status, body) = send(
            &app,
            post_empty(&format!(
                "/api/v1/campaigns/{campaign_id}/outreach/{candidate_id}/0/approve"
            )),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "approve failed: {body}");
    }
    let (status, view) = send(&app, get(&format!("/api/v1/campaigns/{campaign_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["status"], "completed");

    // Purge, then the campaign is gone and only the tombstone remains.
    let (status, _) = send(&app, delete(&format!("/api/v1/campaigns/{campaign_id}"))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, get(&format!("/api/v1/campaigns/{campaign_id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, audit) = send(
        &app,
        get(&format!("/api/v1/campaigns/{campaign_id}/audit")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let entries = audit.as_array().expect("entry array");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["event"], "campaign_purged");

    // Purging again stays a no-op success.
    let (status, _) = send(&app, delete(&format!("/api/v1/campaigns/{campaign_id}"))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn invalid_requests_map_to_http_errors() {
    let app = app();

    let (status, body) = send(
        &app,
        post_json("/api/v1/campaigns", json!({ "job_description": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().expect("message").contains("job description"));

    let (status, _) = send(&app, get("/api/v1/campaigns/camp-424242")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, post_empty("/api/v1/campaigns/camp-424242/run")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rerunning_a_campaign_conflicts() {
    let app = app();

    let (_, body) = send(
        &app,
        post_json(
            "/api/v1/campaigns",
            json!({ "job_description": "Platform Architect" }),
        ),
    )
    .await;
    let campaign_id = body["campaign_id"].as_str().expect("id present").to_string();

    let (status, _) = send(
        &app,
        post_empty(&format!("/api/v1/campaigns/{campaign_id}/run")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        post_empty(&format!("/api/v1/campaigns/{campaign_id}/run")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
