//! Service Wiring
//!
//! Builds the LLM-backed stage services once at startup from the loaded
//! configuration, so handlers only ever see the assembled pipeline.

use crate::config::Config;
use anyhow::Context;
use scaffold_core::{
    PipelineConfig, StudyPlanPipeline,
    gate::RetryPolicy,
    generator::{GeneratorConfig, StructuredGenerator},
    graph::{LLMGraphBuilder, LLMGraphCritic},
    llm_client::LLMClient,
    prompts::{self, StageInstructions},
    schedule::{LLMPlanCritic, LLMScheduler},
    translate::LLMTranslator,
};
use std::{collections::HashMap, fs, path::Path, sync::Arc};
use tracing::{info, warn};

/// Loads `*.md` prompt overrides from a directory, keyed by file stem.
///
/// A missing directory yields no overrides.
pub fn load_prompts(prompts_path: &Path) -> anyhow::Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    if !prompts_path.is_dir() {
        warn!(path = %prompts_path.display(), "Prompts directory not found; using built-in instructions");
        return Ok(prompts);
    }
    for entry in fs::read_dir(prompts_path)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read prompt {}", path.display()))?;
            info!(prompt = %prompt_key, "Loaded prompt override");
            prompts.insert(prompt_key, content);
        }
    }
    Ok(prompts)
}

/// Assembles the five stage services and the pipeline around one client.
pub fn build_pipeline(
    config: &Config,
    client: Arc<dyn LLMClient>,
    instructions: StageInstructions,
) -> StudyPlanPipeline {
    let stage = |name: &str, model: &str, text: String, schema: &str| {
        StructuredGenerator::new(
            client.clone(),
            GeneratorConfig::new(name, model, text, schema)
                .with_output_retries(config.output_retries_for(name))
                .with_call_timeout(config.llm_timeout),
        )
    };

    let generation = config.generation_model.as_str();
    let critic = config.critic_model.as_str();

    StudyPlanPipeline::new(
        Arc::new(LLMGraphBuilder::new(stage(
            prompts::KNOWLEDGE_GRAPH,
            generation,
            instructions.knowledge_graph,
            "KnowledgeGraph",
        ))),
        Arc::new(LLMGraphCritic::new(stage(
            prompts::GRAPH_CRITIC,
            critic,
            instructions.graph_critic,
            "GraphEvaluation",
        ))),
        Arc::new(LLMScheduler::new(stage(
            prompts::SCHEDULER,
            generation,
            instructions.scheduler,
            "StudyPlan",
        ))),
        Arc::new(LLMPlanCritic::new(stage(
            prompts::PLAN_CRITIC,
            critic,
            instructions.plan_critic,
            "PlanEvaluation",
        ))),
        Arc::new(LLMTranslator::new(stage(
            prompts::TRANSLATOR,
            critic,
            instructions.translator,
            "StudyPlan",
        ))),
        PipelineConfig {
            graph_policy: RetryPolicy::new(config.graph_max_attempts),
            plan_policy: RetryPolicy::new(config.plan_max_attempts),
        },
    )
}
