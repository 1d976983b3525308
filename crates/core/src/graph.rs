//! Knowledge-graph construction and critique.

use crate::{
    context::GraphGenerationContext,
    error::Result,
    gate::GatedStage,
    generator::StructuredGenerator,
    prompts::{render_graph, render_material},
    topic::KnowledgeGraph,
    verdict::{GraphEvaluation, Quality},
};
use async_trait::async_trait;
use tracing::debug;

/// Produces a knowledge graph from study material.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GraphBuilder: Send + Sync {
    async fn build_graph(&self, ctx: &GraphGenerationContext) -> Result<KnowledgeGraph>;
}

/// Scores a knowledge graph against the material it came from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GraphCritic: Send + Sync {
    async fn evaluate_graph(
        &self,
        ctx: &GraphGenerationContext,
        graph: &KnowledgeGraph,
    ) -> Result<GraphEvaluation>;
}

/// `GraphBuilder` backed by a structured LLM call.
///
/// Graphs with duplicate topics or dangling edges are rejected and regenerated
/// within the generator's local retry budget.
pub struct LLMGraphBuilder {
    generator: StructuredGenerator,
}

impl LLMGraphBuilder {
    pub fn new(generator: StructuredGenerator) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl GraphBuilder for LLMGraphBuilder {
    async fn build_graph(&self, ctx: &GraphGenerationContext) -> Result<KnowledgeGraph> {
        let prompt = format!(
            "Build the KnowledgeGraph from the study material below. It is the only source of \
             information; do not use prior knowledge or assumptions.\n\n{}",
            render_material(&ctx.material)
        );
        debug!(prompt_len = prompt.len(), "Knowledge graph prompt built");

        self.generator
            .generate(prompt, |graph: KnowledgeGraph| {
                graph.validate().map(|_| graph).map_err(|violations| {
                    violations
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("; ")
                })
            })
            .await
    }
}

/// `GraphCritic` backed by a structured LLM call.
pub struct LLMGraphCritic {
    generator: StructuredGenerator,
}

impl LLMGraphCritic {
    pub fn new(generator: StructuredGenerator) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl GraphCritic for LLMGraphCritic {
    async fn evaluate_graph(
        &self,
        ctx: &GraphGenerationContext,
        graph: &KnowledgeGraph,
    ) -> Result<GraphEvaluation> {
        let prompt = format!(
            "Evaluate the following knowledge graph using only the provided study material.\n\n{}\n{}",
            render_graph(graph),
            render_material(&ctx.material)
        );
        self.generator
            .generate::<GraphEvaluation, _>(prompt, Ok)
            .await
    }
}

/// The knowledge-graph stage bound to one run's input.
pub struct GraphStage<'a> {
    pub builder: &'a dyn GraphBuilder,
    pub critic: &'a dyn GraphCritic,
    pub ctx: &'a GraphGenerationContext,
}

#[async_trait]
impl<'a> GatedStage for GraphStage<'a> {
    type Artifact = KnowledgeGraph;
    type Verdict = Quality;

    fn name(&self) -> &str {
        "knowledge_graph"
    }

    async fn generate(&self) -> Result<KnowledgeGraph> {
        self.builder.build_graph(self.ctx).await
    }

    async fn critique(&self, graph: &KnowledgeGraph) -> Result<GraphEvaluation> {
        self.critic.evaluate_graph(self.ctx, graph).await
    }
}
