//! Study-plan scheduling and achievability critique.

use crate::{
    context::PlanGenerationContext,
    error::Result,
    gate::GatedStage,
    generator::StructuredGenerator,
    plan::StudyPlan,
    prompts::{render_graph, render_material, render_plan},
    verdict::{Achievability, PlanEvaluation},
};
use async_trait::async_trait;
use std::fmt::Write;
use tracing::{debug, info};

/// Produces a study plan covering every topic of a knowledge graph.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn schedule(&self, ctx: &PlanGenerationContext) -> Result<StudyPlan>;
}

/// Judges whether a study plan is achievable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlanCritic: Send + Sync {
    async fn evaluate_plan(
        &self,
        ctx: &PlanGenerationContext,
        plan: &StudyPlan,
    ) -> Result<PlanEvaluation>;
}

fn date_range_note(ctx: &PlanGenerationContext) -> String {
    match &ctx.window {
        Some(window) => format!(
            "Date range: every session must be dated between {} and {} (inclusive).",
            window.start, window.end
        ),
        None => "Date range: none given; leave session dates empty.".to_string(),
    }
}

/// `Scheduler` backed by a structured LLM call.
///
/// Plans that miss or repeat graph topics, or break the session bounds, are
/// rejected and regenerated locally. The reported total is recomputed from
/// the session durations.
pub struct LLMScheduler {
    generator: StructuredGenerator,
}

impl LLMScheduler {
    pub fn new(generator: StructuredGenerator) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Scheduler for LLMScheduler {
    async fn schedule(&self, ctx: &PlanGenerationContext) -> Result<StudyPlan> {
        let prompt = format!(
            "Generate a StudyPlan based on the following inputs.\n\n{}\n\n{}\n{}",
            render_material(&ctx.material),
            render_graph(&ctx.graph),
            date_range_note(ctx)
        );
        debug!(prompt_len = prompt.len(), topics = ctx.graph.nodes.len(), "Scheduling prompt built");

        self.generator
            .generate(prompt, |mut plan: StudyPlan| {
                plan.check_against(&ctx.graph).map_err(|violations| {
                    violations
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("; ")
                })?;
                let reported = plan.normalize_total();
                if reported != plan.total_duration_hours {
                    debug!(reported, computed = plan.total_duration_hours, "Corrected total duration");
                }
                Ok(plan)
            })
            .await
    }
}

/// `PlanCritic` backed by a structured LLM call.
///
/// Sessions dated outside the due-date window are checked locally first: such a
/// plan is unachievable regardless of anything else, and the model is not asked.
pub struct LLMPlanCritic {
    generator: StructuredGenerator,
}

impl LLMPlanCritic {
    pub fn new(generator: StructuredGenerator) -> Self {
        Self { generator }
    }
}

/// Returns the unachievable verdict when any session falls outside the window.
pub fn window_verdict(ctx: &PlanGenerationContext, plan: &StudyPlan) -> Option<PlanEvaluation> {
    let window = ctx.window.as_ref()?;
    let outside = plan.dates_outside(window);
    if outside.is_empty() {
        return None;
    }

    let listed: Vec<String> = outside
        .iter()
        .filter_map(|s| s.date.map(|d| format!("'{}' on {}", s.topic.name, d)))
        .collect();
    Some(PlanEvaluation::new(
        Achievability::Unachievable,
        format!(
            "Sessions scheduled outside {window}: {}",
            listed.join(", ")
        ),
    ))
}

#[async_trait]
impl PlanCritic for LLMPlanCritic {
    async fn evaluate_plan(
        &self,
        ctx: &PlanGenerationContext,
        plan: &StudyPlan,
    ) -> Result<PlanEvaluation> {
        if let Some(evaluation) = window_verdict(ctx, plan) {
            info!(justification = %evaluation.justification, "Plan rejected by date window");
            return Ok(evaluation);
        }

        let mut prompt = format!(
            "Evaluate the following StudyPlan based only on the provided study material.\n\n{}\n\n{}\n{}\n",
            render_material(&ctx.material),
            render_plan(plan),
            date_range_note(ctx)
        );
        let ordering = plan.ordering_violations(&ctx.graph);
        if !ordering.is_empty() {
            prompt.push_str("Detected ordering issues:\n");
            for violation in &ordering {
                let _ = writeln!(prompt, "- {violation}");
            }
        }

        self.generator
            .generate::<PlanEvaluation, _>(prompt, Ok)
            .await
    }
}

/// The scheduling stage bound to one run's input.
pub struct ScheduleStage<'a> {
    pub scheduler: &'a dyn Scheduler,
    pub critic: &'a dyn PlanCritic,
    pub ctx: &'a PlanGenerationContext,
}

#[async_trait]
impl<'a> GatedStage for ScheduleStage<'a> {
    type Artifact = StudyPlan;
    type Verdict = Achievability;

    fn name(&self) -> &str {
        "study_plan"
    }

    async fn generate(&self) -> Result<StudyPlan> {
        self.scheduler.schedule(self.ctx).await
    }

    async fn critique(&self, plan: &StudyPlan) -> Result<PlanEvaluation> {
        self.critic.evaluate_plan(self.ctx, plan).await
    }
}
