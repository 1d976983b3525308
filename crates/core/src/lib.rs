//! Core of the study-plan scaffolding service.
//!
//! Raw study material flows through three stages: knowledge-graph construction,
//! scheduling, and translation. The first two are retry-gated: each candidate is
//! scored by a critic, and the stage regenerates it a bounded number of times
//! until the critic gives its best verdict.

pub mod context;
pub mod error;
pub mod gate;
pub mod generator;
pub mod graph;
pub mod llm_client;
pub mod pipeline;
pub mod plan;
pub mod prompts;
pub mod schedule;
pub mod topic;
pub mod translate;
pub mod verdict;

pub use error::{PipelineError, Result};
pub use pipeline::{PipelineConfig, PipelineReport, StudyPlanPipeline};
