//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds all shared,
//! clonable resources like the pipeline and the document extractor.

use crate::{config::Config, extract::DocumentExtractor};
use scaffold_core::StudyPlanPipeline;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<StudyPlanPipeline>,
    pub extractor: Arc<dyn DocumentExtractor>,
    pub default_language: Arc<String>,
}

impl AppState {
    pub fn new(
        pipeline: Arc<StudyPlanPipeline>,
        extractor: Arc<dyn DocumentExtractor>,
        config: &Config,
    ) -> Self {
        Self {
            pipeline,
            extractor,
            default_language: Arc::new(config.default_language.clone()),
        }
    }
}
