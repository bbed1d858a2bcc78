//! Exercises the full HTTP surface in-process with `tower::Service`,
//! backed by a fake LLM backend so no network call is ever made.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use modelforge_audit::AuditLogger;
use modelforge_engine::PipelineController;
use modelforge_jobs::Executor;
use modelforge_llm::{ExtractResult, Invocation, LlmBackend, LlmError, Message, StopReason, TextStream};
use modelforge_prompts::{defaults::builtin_prompts, PromptRegistry};
use modelforge_server::{build_app, AppState, PlaceholderSpreadsheetDriver};
use modelforge_store::{MemoryStore, Store};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tower::ServiceExt;

struct FakeBackend {
    response: Value,
}

#[async_trait]
impl LlmBackend for FakeBackend {
    fn provider_name(&self) -> &'static str {
        "fake"
    }

    async fn extract(&self, _inv: Invocation) -> Result<ExtractResult, LlmError> {
        Ok(ExtractResult {
            raw_response: self.response.to_string(),
            parsed: self.response.clone(),
            warnings: Vec::new(),
            stop_reason: StopReason::EndTurn,
            provider: "fake".to_string(),
            model_used: "fake-model".to_string(),
            tokens_input: Some(10),
            tokens_output: Some(10),
            latency_ms: 5,
        })
    }

    async fn stream_text(&self, _messages: Vec<Message>, _model: &str) -> Result<TextStream, LlmError> {
        Err(LlmError::UnknownProvider("fake backend does not stream".to_string()))
    }
}

fn test_state(responses: HashMap<&'static str, Value>) -> Arc<AppState> {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let executor = Arc::new(Executor::new(store.clone(), 2, Duration::from_secs(5)));
    let prompts = Arc::new(PromptRegistry::new(builtin_prompts()));
    let audit = Arc::new(AuditLogger::new());

    let mut backends: HashMap<String, Arc<dyn LlmBackend>> = HashMap::new();
    // Phase 1 always asks its configured default provider/model, so a
    // single fake backend registered under "anthropic" covers every
    // phase dispatched in these tests.
    let _ = &responses;
    backends.insert("anthropic".to_string(), Arc::new(FakeBackend { response: responses.get("phase1").cloned().unwrap_or_else(|| json!({})) }));

    let controller = Arc::new(PipelineController::new(store.clone(), executor, backends, prompts.clone(), audit.clone(), "anthropic".to_string(), "fake-model".to_string()));

    let mut config = modelforge_config::Config::default();
    config.admin.username = None;
    config.admin.password = None;

    Arc::new(AppState {
        store,
        controller,
        prompts,
        audit,
        driver: Arc::new(PlaceholderSpreadsheetDriver),
        admin_tokens: Arc::new(RwLock::new(HashSet::new())),
        export_files: Arc::new(Mutex::new(HashMap::new())),
        config,
    })
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let state = test_state(HashMap::new());
    let app = build_app(state);

    let response = app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn happy_path_create_project_upload_and_scan() {
    let mut responses = HashMap::new();
    responses.insert("phase1", json!({ "sections": ["overview", "market"], "summary": "a plan" }));
    let state = test_state(responses);
    let app = build_app(state);

    let create_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/projects")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "name": "Acme Expansion" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(create_response.status(), StatusCode::CREATED);
    let body = axum::body::to_bytes(create_response.into_body(), usize::MAX).await.unwrap();
    let project: Value = serde_json::from_slice(&body).unwrap();
    let project_id = project["id"].as_str().unwrap();

    let boundary = "X-TEST-BOUNDARY";
    let multipart_body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"project_id\"\r\n\r\n{project_id}\r\n--{boundary}\r\nContent-Disposition: form-data; name=\"kind\"\r\n\r\ntext\r\n--{boundary}\r\nContent-Disposition: form-data; name=\"text\"\r\n\r\nWe sell subscriptions to bakeries.\r\n--{boundary}--\r\n"
    );
    let upload_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/documents/upload")
                .header("content-type", format!("multipart/form-data; boundary={boundary}"))
                .body(Body::from(multipart_body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(upload_response.status(), StatusCode::CREATED);
    let body = axum::body::to_bytes(upload_response.into_body(), usize::MAX).await.unwrap();
    let upload: Value = serde_json::from_slice(&body).unwrap();
    let document_id = upload["document_id"].as_str().unwrap();

    let scan_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/phase1/scan")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "project_id": project_id, "document_id": document_id }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(scan_response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(scan_response.into_body(), usize::MAX).await.unwrap();
    let scan: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(scan["status"], "completed");
    assert!(scan["result"]["result"]["sections"].is_array());
}

#[tokio::test]
async fn phase4_without_phase3_result_returns_conflict() {
    let state = test_state(HashMap::new());
    let app = build_app(state.clone());

    let project = state.store.create_project("No Phase3 Yet".to_string()).await.unwrap();
    let document = state.store.create_document(project.id, "plan.txt".to_string(), "some plan text".to_string()).await.unwrap();
    let run = state.store.create_run(project.id, document.id).await.unwrap();
    state.store.set_active_run(project.id, run.id).await.unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/phase4/design")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "project_id": project.id }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["detail"]["code"], "PHASE3_NOT_COMPLETED");
}

#[tokio::test]
async fn admin_auth_disabled_without_configured_credentials() {
    let state = test_state(HashMap::new());
    let app = build_app(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/admin/auth")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "username": "admin", "password": "whatever" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn recalc_applies_scenario_multipliers_without_any_project() {
    let state = test_state(HashMap::new());
    let app = build_app(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/recalc")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "scenario": "best" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let result: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(result["scenario"], "best");
    assert!(result["pl_summary"]["revenue"][0].as_i64().unwrap() > 100_000_000);
}

#[tokio::test]
async fn export_download_is_not_ready_for_unknown_job() {
    let state = test_state(HashMap::new());
    let app = build_app(state);

    let random_id = uuid::Uuid::new_v4();
    let response = app.oneshot(Request::builder().uri(format!("/v1/export/download/{random_id}")).body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
