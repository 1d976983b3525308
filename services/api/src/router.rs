//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API and OpenAPI documentation.

use crate::{
    handlers,
    models::{CreateStudyPlanPayload, ErrorResponse, ExtractedText, HealthResponse},
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use scaffold_core::{
    plan::{StudyMethod, StudyPlan, StudySession},
    topic::Topic,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_study_plan,
        handlers::extract_document_text,
        handlers::health,
    ),
    components(
        schemas(StudyPlan, StudySession, StudyMethod, Topic, CreateStudyPlanPayload, ExtractedText, HealthResponse, ErrorResponse)
    ),
    tags(
        (name = "Study Scaffold API", description = "Study plan generation from raw study material")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/study-plans", post(handlers::create_study_plan))
        .route("/documents/text", post(handlers::extract_document_text))
        .route("/health", get(handlers::health))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
