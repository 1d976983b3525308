//! Typed inputs for each pipeline stage.

use crate::{
    plan::{DueDateWindow, StudyMaterial, StudyPlan},
    topic::KnowledgeGraph,
};

/// Input to knowledge-graph construction and critique.
#[derive(Debug, Clone)]
pub struct GraphGenerationContext {
    pub material: StudyMaterial,
}

/// Input to scheduling and plan critique.
#[derive(Debug, Clone)]
pub struct PlanGenerationContext {
    pub material: StudyMaterial,
    pub graph: KnowledgeGraph,
    /// `[today, due_date]` when the material carries a due date.
    pub window: Option<DueDateWindow>,
}

/// Input to the translation stage.
#[derive(Debug, Clone)]
pub struct TranslationContext {
    pub plan: StudyPlan,
    pub language: String,
}
