//! API Request and Response Models
//!
//! This module defines the payloads accepted and returned by the HTTP API and
//! registers them with `utoipa` for OpenAPI generation. The study plan itself
//! is returned as `scaffold_core::plan::StudyPlan`.

use chrono::NaiveDate;
use scaffold_core::plan::StudyMaterial;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema, Debug)]
pub struct CreateStudyPlanPayload {
    /// The raw text to build the plan from.
    #[schema(example = "Linear equations come before quadratic equations...")]
    pub study_material: String,
    /// Language of the returned plan. Defaults to the configured language.
    #[schema(example = "Spanish")]
    pub language: Option<String>,
    /// Target completion date, `YYYY-MM-DD`.
    #[schema(example = "2026-11-01")]
    pub due_date: Option<NaiveDate>,
}

impl CreateStudyPlanPayload {
    pub fn material(&self) -> StudyMaterial {
        StudyMaterial::new(self.study_material.clone(), self.due_date)
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct ExtractedText {
    pub filename: String,
    pub text: String,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}
