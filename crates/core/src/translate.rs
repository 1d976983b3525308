//! Translation of finished study plans.

use crate::{
    context::TranslationContext,
    error::Result,
    generator::StructuredGenerator,
    plan::{StudyPlan, StudySession},
    prompts::render_plan,
    topic::Topic,
};
use async_trait::async_trait;
use std::collections::HashMap;

/// Rewrites the text fields of a plan in another language.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, ctx: &TranslationContext) -> Result<StudyPlan>;
}

/// Rebuilds `source` with the text of `translated`.
///
/// Translated sessions are matched to source sessions by topic name, so a
/// reordered translation still lands on the right topics. Session order, topic
/// names, durations, methods, dates and the total are always taken from
/// `source`; only natural-language text can change.
pub fn merge_translation(
    source: &StudyPlan,
    translated: StudyPlan,
) -> std::result::Result<StudyPlan, String> {
    if translated.sessions.len() != source.sessions.len() {
        return Err(format!(
            "translation has {} sessions, the original plan has {}",
            translated.sessions.len(),
            source.sessions.len()
        ));
    }

    let mut by_topic: HashMap<String, StudySession> = translated
        .sessions
        .into_iter()
        .map(|s| (s.topic.name.clone(), s))
        .collect();

    let mut sessions = Vec::with_capacity(source.sessions.len());
    for original in &source.sessions {
        let text = by_topic.remove(&original.topic.name).ok_or_else(|| {
            format!(
                "translation has no session for topic '{}'; topic names must not change",
                original.topic.name
            )
        })?;
        sessions.push(StudySession {
            date: original.date,
            topic: Topic {
                name: original.topic.name.clone(),
                description: text.topic.description,
            },
            information: text.information,
            duration_minutes: original.duration_minutes,
            methods: original.methods.clone(),
        });
    }

    Ok(StudyPlan {
        overview: translated.overview,
        sessions,
        total_duration_hours: source.total_duration_hours,
    })
}

/// `Translator` backed by a single structured LLM call.
pub struct LLMTranslator {
    generator: StructuredGenerator,
}

impl LLMTranslator {
    pub fn new(generator: StructuredGenerator) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Translator for LLMTranslator {
    async fn translate(&self, ctx: &TranslationContext) -> Result<StudyPlan> {
        let prompt = format!(
            "Translate the following StudyPlan into {}. Topic names stay as they are.\n\n{}",
            ctx.language,
            render_plan(&ctx.plan)
        );
        self.generator
            .generate(prompt, |translated: StudyPlan| {
                merge_translation(&ctx.plan, translated)
            })
            .await
    }
}
