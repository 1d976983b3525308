//! Axum Handlers for the REST API
//!
//! This module contains the logic for handling HTTP requests for study plan
//! generation and document text extraction. It uses `utoipa` doc comments to
//! generate OpenAPI documentation.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use scaffold_core::{PipelineError, plan::StudyPlan};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::{
    extract::ExtractError,
    models::{CreateStudyPlanPayload, ErrorResponse, ExtractedText, HealthResponse},
    state::AppState,
};

pub enum ApiError {
    BadRequest(String),
    UnsupportedMediaType(String),
    BadGateway(String),
    GatewayTimeout(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::UnsupportedMediaType(message) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, message)
            }
            ApiError::BadGateway(message) => {
                error!("Upstream failure: {}", message);
                (StatusCode::BAD_GATEWAY, message)
            }
            ApiError::GatewayTimeout(message) => {
                warn!("Upstream timeout: {}", message);
                (StatusCode::GATEWAY_TIMEOUT, message)
            }
        };
        (status, Json(ErrorResponse { message })).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidRequest(message) => ApiError::BadRequest(message),
            PipelineError::Timeout { .. } => ApiError::GatewayTimeout(err.to_string()),
            PipelineError::SchemaValidation { .. } | PipelineError::ExternalCall { .. } => {
                ApiError::BadGateway(err.to_string())
            }
        }
    }
}

impl From<ExtractError> for ApiError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::Unsupported(_) => ApiError::UnsupportedMediaType(err.to_string()),
            ExtractError::InvalidEncoding | ExtractError::Empty => {
                ApiError::BadRequest(err.to_string())
            }
        }
    }
}

/// Generate a study plan from raw study material.
#[utoipa::path(
    post,
    path = "/study-plans",
    request_body = CreateStudyPlanPayload,
    responses(
        (status = 200, description = "Study plan generated", body = StudyPlan),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 502, description = "Language model failure", body = ErrorResponse),
        (status = 504, description = "Language model timed out", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
pub async fn create_study_plan(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateStudyPlanPayload>,
) -> Result<Json<StudyPlan>, ApiError> {
    let language = payload
        .language
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(state.default_language.as_str())
        .to_string();
    let today = chrono::Local::now().date_naive();

    info!(%language, due_date = ?payload.due_date, "Study plan requested");
    let plan = state
        .pipeline
        .generate_study_plan(payload.material(), &language, today)
        .await?;

    Ok(Json(plan))
}

/// Extract plain text from an uploaded document (multipart field `file`).
#[utoipa::path(
    post,
    path = "/documents/text",
    request_body(content_type = "multipart/form-data", description = "A `file` field holding the document"),
    responses(
        (status = 200, description = "Extracted text", body = ExtractedText),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 415, description = "Unsupported document type", body = ErrorResponse)
    )
)]
pub async fn extract_document_text(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ExtractedText>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        let text = state
            .extractor
            .extract(&filename, content_type.as_deref(), &bytes)?;
        info!(%filename, chars = text.len(), "Document text extracted");
        return Ok(Json(ExtractedText { filename, text }));
    }

    Err(ApiError::BadRequest(
        "multipart field 'file' is required".to_string(),
    ))
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

#[cfg(test)]
mod tests {
    use crate::{
        config::{Config, Provider},
        extract::PlainTextExtractor,
        router::create_router,
        services::build_pipeline,
        state::AppState,
    };
    use async_trait::async_trait;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use scaffold_core::{
        llm_client::{LLMClient, LLMError, StructuredRequest},
        plan::StudyPlan,
        prompts::StageInstructions,
    };
    use serde_json::{Value, json};
    use std::{collections::HashMap, sync::Arc, time::Duration};
    use tower::ServiceExt;

    /// Answers every stage with a fixed reply chosen by output contract.
    struct CannedClient;

    #[async_trait]
    impl LLMClient for CannedClient {
        async fn complete_structured(&self, request: StructuredRequest) -> Result<String, LLMError> {
            let reply = match request.schema_name.as_str() {
                "KnowledgeGraph" => json!({
                    "nodes": [{"name": "Cells", "description": "Basic unit of life"}],
                    "edges": []
                }),
                "GraphEvaluation" => json!({"verdict": "good", "justification": "Complete."}),
                "StudyPlan" => json!({
                    "overview": "One short session.",
                    "sessions": [{
                        "date": null,
                        "topic": {"name": "Cells", "description": "Basic unit of life"},
                        "information": "Structure of a cell.",
                        "duration_minutes": 60,
                        "methods": ["reading"]
                    }],
                    "total_duration_hours": 1
                }),
                "PlanEvaluation" => json!({"verdict": "achievable", "justification": "Fine."}),
                other => panic!("unexpected schema {other}"),
            };
            Ok(reply.to_string())
        }
    }

    struct FailingClient;

    #[async_trait]
    impl LLMClient for FailingClient {
        async fn complete_structured(&self, _: StructuredRequest) -> Result<String, LLMError> {
            Err(LLMError::EmptyResponse)
        }
    }

    /// Never answers within the configured call timeout.
    struct StalledClient;

    #[async_trait]
    impl LLMClient for StalledClient {
        async fn complete_structured(&self, _: StructuredRequest) -> Result<String, LLMError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(LLMError::EmptyResponse)
        }
    }

    fn test_config() -> Config {
        Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            provider: Provider::OpenAI,
            openai_api_key: Some("test-key".to_string()),
            gemini_api_key: None,
            generation_model: "gpt-4o".to_string(),
            critic_model: "gpt-4o-mini".to_string(),
            log_level: tracing::Level::INFO,
            prompts_path: "./prompts".into(),
            cors_origins: vec![],
            default_language: "English".to_string(),
            graph_max_attempts: 2,
            plan_max_attempts: 2,
            output_retries: 0,
            stage_output_retries: HashMap::new(),
            llm_timeout: Duration::from_secs(5),
        }
    }

    fn app(client: Arc<dyn LLMClient>) -> Router {
        let config = test_config();
        let pipeline = build_pipeline(&config, client, StageInstructions::default());
        let state = AppState::new(Arc::new(pipeline), Arc::new(PlainTextExtractor), &config);
        create_router(Arc::new(state))
    }

    fn json_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/study-plans")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(Arc::new(CannedClient))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_create_study_plan() {
        let response = app(Arc::new(CannedClient))
            .oneshot(json_request(json!({"study_material": "All about cells."})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let plan: StudyPlan = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(plan.sessions.len(), 1);
        assert_eq!(plan.sessions[0].topic.name, "Cells");
        assert_eq!(plan.total_duration_hours, 1);
    }

    #[tokio::test]
    async fn test_empty_material_is_bad_request() {
        let response = app(Arc::new(CannedClient))
            .oneshot(json_request(json!({"study_material": "   "})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["message"].is_string());
    }

    #[tokio::test]
    async fn test_past_due_date_is_bad_request() {
        let response = app(Arc::new(CannedClient))
            .oneshot(json_request(
                json!({"study_material": "Cells.", "due_date": "2000-01-01"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_provider_failure_is_bad_gateway() {
        let response = app(Arc::new(FailingClient))
            .oneshot(json_request(json!({"study_material": "Cells."})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_timeout_is_gateway_timeout() {
        let response = app(Arc::new(StalledClient))
            .oneshot(json_request(json!({"study_material": "Cells."})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let body = body_json(response).await;
        assert!(body["message"].as_str().unwrap().contains("timed out"));
    }

    fn multipart_request(field: &str, filename: &str, content_type: &str, content: &str) -> Request<Body> {
        let boundary = "X-SCAFFOLD-BOUNDARY";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n{content}\r\n--{boundary}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri("/documents/text")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_extract_document_text() {
        let response = app(Arc::new(CannedClient))
            .oneshot(multipart_request("file", "notes.md", "text/markdown", "# Cells\nThey divide."))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"filename": "notes.md", "text": "# Cells\nThey divide."})
        );
    }

    #[tokio::test]
    async fn test_extract_unsupported_type() {
        let response = app(Arc::new(CannedClient))
            .oneshot(multipart_request("file", "slides.pdf", "application/pdf", "%PDF"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_extract_requires_file_field() {
        let response = app(Arc::new(CannedClient))
            .oneshot(multipart_request("attachment", "notes.txt", "text/plain", "hi"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
