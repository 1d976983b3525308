//! Built-in stage instructions and the renderers shared by stage prompts.

use crate::{
    plan::{StudyMaterial, StudyPlan},
    topic::KnowledgeGraph,
};
use std::collections::HashMap;
use std::fmt::Write;

pub const KNOWLEDGE_GRAPH: &str = "knowledge_graph";
pub const GRAPH_CRITIC: &str = "graph_critic";
pub const SCHEDULER: &str = "scheduler";
pub const PLAN_CRITIC: &str = "plan_critic";
pub const TRANSLATOR: &str = "translator";

const KNOWLEDGE_GRAPH_INSTRUCTIONS: &str = r#"You build a KnowledgeGraph from study material.

Nodes:
- Extract the key topics of the material.
- Give every topic a short, precise name and a description of at most 50 words taken from the material.
- Never repeat a topic name. Leave out topics you are unsure about.

Edges:
- Connect extracted topics only, using their names exactly as they appear in the node list.
- precedes: the first topic is introduced before, or is a prerequisite for, the second.
- follows: the first topic builds upon or comes after the second.
- related_to: the topics are related without a clear order.

Return only the KnowledgeGraph object. No commentary."#;

const GRAPH_CRITIC_INSTRUCTIONS: &str = r#"You review a KnowledgeGraph against the study material it was built from.

Judge it on:
1. Completeness: every key topic of the material is present.
2. Accuracy: the relationships between topics are correct.
3. Clarity: the graph is easy to follow.

Use only the supplied study material; do not rely on outside knowledge.
Return an evaluation whose verdict is one of good, needs_improvement or bad,
with a concise justification. No commentary outside the object."#;

const SCHEDULER_INSTRUCTIONS: &str = r#"You turn a KnowledgeGraph and its study material into a StudyPlan.

Overview:
- Summarize the study strategy briefly. Do not copy the material.

Sessions:
- Every session covers exactly one topic of the graph; copy the topic name and description exactly.
- Every topic of the graph appears in exactly one session. Do not invent or drop topics.
- Explain what to learn about the topic.
- duration_minutes is between 30 and 180.
- methods holds one or more of reading, practice, flashcards, review.

Ordering:
- A topic that precedes another is scheduled earlier; a topic that follows another is scheduled later.
- Related topics may sit next to each other.

Dates:
- When a date range is given, give every session a date (YYYY-MM-DD) inside that range, in session order.
- Without a date range, leave the date empty.

Set total_duration_hours to the sum of all session durations, rounded to whole hours.
Return only the StudyPlan object, without markdown or commentary."#;

const PLAN_CRITIC_INSTRUCTIONS: &str = r#"You review a StudyPlan against the study material it was built from.

Judge it on:
1. Time management: session durations are realistic and the workload fits the available days.
2. Coverage: every topic of the material is adequately covered.
3. Methods: the study methods suit the material.

When a date range is given, any session dated outside it makes the plan unachievable, whatever its other merits.
Use only the supplied study material; do not rely on outside knowledge.
Return an evaluation whose verdict is one of achievable, needs_improvement or unachievable,
with a concise justification. No commentary outside the object."#;

const TRANSLATOR_INSTRUCTIONS: &str = r#"You translate a StudyPlan into a requested language.

- Keep the exact structure: same number of sessions, in the same order.
- Translate only text: the overview, each session's information and each topic's description.
- Keep topic names, durations, methods, dates and total_duration_hours unchanged.
- Return only the StudyPlan object, without formatting changes or commentary."#;

/// System instructions for every stage, overridable per stage.
#[derive(Debug, Clone)]
pub struct StageInstructions {
    pub knowledge_graph: String,
    pub graph_critic: String,
    pub scheduler: String,
    pub plan_critic: String,
    pub translator: String,
}

impl Default for StageInstructions {
    fn default() -> Self {
        Self {
            knowledge_graph: KNOWLEDGE_GRAPH_INSTRUCTIONS.to_string(),
            graph_critic: GRAPH_CRITIC_INSTRUCTIONS.to_string(),
            scheduler: SCHEDULER_INSTRUCTIONS.to_string(),
            plan_critic: PLAN_CRITIC_INSTRUCTIONS.to_string(),
            translator: TRANSLATOR_INSTRUCTIONS.to_string(),
        }
    }
}

impl StageInstructions {
    /// Replaces built-in instructions with templates keyed by stage name.
    ///
    /// Unknown keys are ignored.
    pub fn with_overrides(mut self, overrides: &HashMap<String, String>) -> Self {
        for (key, slot) in [
            (KNOWLEDGE_GRAPH, &mut self.knowledge_graph),
            (GRAPH_CRITIC, &mut self.graph_critic),
            (SCHEDULER, &mut self.scheduler),
            (PLAN_CRITIC, &mut self.plan_critic),
            (TRANSLATOR, &mut self.translator),
        ] {
            if let Some(text) = overrides.get(key) {
                *slot = text.clone();
            }
        }
        self
    }
}

pub fn render_material(material: &StudyMaterial) -> String {
    format!(
        "<<STUDY MATERIAL>>\n{}\n<<END STUDY MATERIAL>>",
        material.study_material.trim()
    )
}

pub fn render_graph(graph: &KnowledgeGraph) -> String {
    let mut out = String::from("Knowledge Graph:\nNodes:\n");
    for node in &graph.nodes {
        let _ = writeln!(out, "- {}: {}", node.name, node.description);
    }
    out.push_str("Edges:\n");
    for edge in &graph.edges {
        let _ = writeln!(out, "- {edge}");
    }
    out
}

pub fn render_plan(plan: &StudyPlan) -> String {
    let mut out = format!("<<STUDY PLAN>>\nOverview:\n{}\nStudy Sessions:\n", plan.overview);
    for (idx, session) in plan.sessions.iter().enumerate() {
        let methods: Vec<String> = session.methods.iter().map(|m| m.to_string()).collect();
        let date = session
            .date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "unscheduled".to_string());
        let _ = writeln!(
            out,
            "{}. Date: {}, Topic: {} ({}), Information: {}, Duration: {} minutes, Methods: {}",
            idx + 1,
            date,
            session.topic.name,
            session.topic.description,
            session.information,
            session.duration_minutes,
            methods.join(", ")
        );
    }
    let _ = write!(
        out,
        "Total Duration Hours: {}\n<<END STUDY PLAN>>",
        plan.total_duration_hours
    );
    out
}
