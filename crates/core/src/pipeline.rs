//! The end-to-end study-plan pipeline: graph → schedule → translation.

use crate::{
    context::{GraphGenerationContext, PlanGenerationContext, TranslationContext},
    error::{PipelineError, Result},
    gate::{RetryPolicy, StageSummary, run_gated},
    graph::{GraphBuilder, GraphCritic, GraphStage},
    plan::{DueDateWindow, StudyMaterial, StudyPlan},
    schedule::{PlanCritic, ScheduleStage, Scheduler},
    translate::Translator,
    verdict::{Achievability, Quality},
};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Retry budgets for the two gated stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub graph_policy: RetryPolicy,
    pub plan_policy: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            graph_policy: RetryPolicy::new(2),
            plan_policy: RetryPolicy::new(2),
        }
    }
}

/// The final plan plus how each gated stage ended.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub plan: StudyPlan,
    pub graph: StageSummary<Quality>,
    /// `None` when scheduling was skipped because the graph had no topics.
    pub schedule: Option<StageSummary<Achievability>>,
}

/// Sequences the stages of one study-plan request.
///
/// Holds only shared, stateless services, so a single instance serves any
/// number of concurrent runs. Within a run every stage awaits the previous one.
pub struct StudyPlanPipeline {
    graph_builder: Arc<dyn GraphBuilder>,
    graph_critic: Arc<dyn GraphCritic>,
    scheduler: Arc<dyn Scheduler>,
    plan_critic: Arc<dyn PlanCritic>,
    translator: Arc<dyn Translator>,
    config: PipelineConfig,
}

impl StudyPlanPipeline {
    pub fn new(
        graph_builder: Arc<dyn GraphBuilder>,
        graph_critic: Arc<dyn GraphCritic>,
        scheduler: Arc<dyn Scheduler>,
        plan_critic: Arc<dyn PlanCritic>,
        translator: Arc<dyn Translator>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            graph_builder,
            graph_critic,
            scheduler,
            plan_critic,
            translator,
            config,
        }
    }

    /// Runs the pipeline and returns only the translated plan.
    pub async fn generate_study_plan(
        &self,
        material: StudyMaterial,
        language: &str,
        today: NaiveDate,
    ) -> Result<StudyPlan> {
        Ok(self.run(material, language, today).await?.plan)
    }

    /// Runs every stage in order.
    ///
    /// Any fatal error aborts the whole run; stages that end exhausted pass
    /// their last candidate forward. A graph without topics yields an empty
    /// plan without scheduling or translating.
    #[instrument(name = "study_plan_run", skip_all, fields(run_id = %Uuid::new_v4(), language = %language))]
    pub async fn run(
        &self,
        material: StudyMaterial,
        language: &str,
        today: NaiveDate,
    ) -> Result<PipelineReport> {
        if material.study_material.trim().is_empty() {
            return Err(PipelineError::InvalidRequest(
                "study material is empty".to_string(),
            ));
        }
        let window = match material.due_date {
            Some(due) => Some(DueDateWindow::new(today, due).ok_or_else(|| {
                PipelineError::InvalidRequest(format!(
                    "due date {due} is before the current date {today}"
                ))
            })?),
            None => None,
        };
        info!(
            material_len = material.study_material.len(),
            window = ?window,
            "Starting study plan run"
        );

        let graph_ctx = GraphGenerationContext {
            material: material.clone(),
        };
        let graph_outcome = run_gated(
            &GraphStage {
                builder: self.graph_builder.as_ref(),
                critic: self.graph_critic.as_ref(),
                ctx: &graph_ctx,
            },
            &self.config.graph_policy,
        )
        .await?;
        let graph_summary = graph_outcome.summary();

        if graph_outcome.artifact.is_empty() {
            warn!("No topics could be extracted; returning an empty plan");
            return Ok(PipelineReport {
                plan: StudyPlan::empty(),
                graph: graph_summary,
                schedule: None,
            });
        }

        let plan_ctx = PlanGenerationContext {
            material,
            graph: graph_outcome.artifact,
            window,
        };
        let plan_outcome = run_gated(
            &ScheduleStage {
                scheduler: self.scheduler.as_ref(),
                critic: self.plan_critic.as_ref(),
                ctx: &plan_ctx,
            },
            &self.config.plan_policy,
        )
        .await?;
        let plan_summary = plan_outcome.summary();

        let translation_ctx = TranslationContext {
            plan: plan_outcome.artifact,
            language: language.to_string(),
        };
        let plan = self.translator.translate(&translation_ctx).await?;

        info!(
            sessions = plan.sessions.len(),
            total_hours = plan.total_duration_hours,
            graph_status = ?graph_summary.status,
            plan_status = ?plan_summary.status,
            "Study plan run finished"
        );
        Ok(PipelineReport {
            plan,
            graph: graph_summary,
            schedule: Some(plan_summary),
        })
    }
}
