//! Study material, study plans, and the structural checks applied to them.

use crate::topic::{KnowledgeGraph, Topic};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use utoipa::ToSchema;

pub const MIN_SESSION_MINUTES: u32 = 30;
pub const MAX_SESSION_MINUTES: u32 = 180;

/// Raw input to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StudyMaterial {
    /// Source text. The only source of information for every stage.
    pub study_material: String,
    /// Optional target completion date (`YYYY-MM-DD`).
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

impl StudyMaterial {
    pub fn new(study_material: impl Into<String>, due_date: Option<NaiveDate>) -> Self {
        Self {
            study_material: study_material.into(),
            due_date,
        }
    }
}

/// Inclusive date range every dated session must fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueDateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DueDateWindow {
    /// Builds `[today, due_date]`. Returns `None` when the due date already passed.
    pub fn new(today: NaiveDate, due_date: NaiveDate) -> Option<Self> {
        (due_date >= today).then_some(Self {
            start: today,
            end: due_date,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DueDateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Closed set of recommended study methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StudyMethod {
    Reading,
    Practice,
    Flashcards,
    Review,
}

impl fmt::Display for StudyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StudyMethod::Reading => write!(f, "reading"),
            StudyMethod::Practice => write!(f, "practice"),
            StudyMethod::Flashcards => write!(f, "flashcards"),
            StudyMethod::Review => write!(f, "review"),
        }
    }
}

/// One session of the plan, covering exactly one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ToSchema)]
pub struct StudySession {
    /// Date of the session (`YYYY-MM-DD`), if scheduled.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Topic covered in this session.
    pub topic: Topic,
    /// What to learn about the topic.
    pub information: String,
    /// Planned duration in minutes (30-180).
    pub duration_minutes: u32,
    /// Recommended study methods.
    pub methods: Vec<StudyMethod>,
}

/// The final artifact handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ToSchema)]
pub struct StudyPlan {
    /// High-level summary of the study strategy.
    pub overview: String,
    /// Ordered study sessions.
    pub sessions: Vec<StudySession>,
    /// Total planned study duration in whole hours.
    pub total_duration_hours: u32,
}

/// Structural problems found when checking a plan against its graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanViolation {
    #[error("topic '{0}' has no study session")]
    MissingTopic(String),
    #[error("topic '{0}' appears in {1} sessions")]
    RepeatedTopic(String, usize),
    #[error("session topic '{0}' is not part of the knowledge graph")]
    UnknownTopic(String),
    #[error("session for '{0}' lasts {1} minutes, outside 30-180")]
    DurationOutOfRange(String, u32),
    #[error("session for '{0}' has no study methods")]
    NoMethods(String),
}

/// A session scheduled before a topic it depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingViolation {
    pub earlier: String,
    pub later: String,
}

impl fmt::Display for OrderingViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' should be studied before '{}'",
            self.earlier, self.later
        )
    }
}

/// Rounds minutes to whole hours, half up.
pub fn rounded_hours(minutes: u32) -> u32 {
    (minutes + 30) / 60
}

impl StudyPlan {
    /// A plan with no sessions, returned when nothing could be extracted.
    pub fn empty() -> Self {
        Self {
            overview: String::new(),
            sessions: Vec::new(),
            total_duration_hours: 0,
        }
    }

    pub fn total_minutes(&self) -> u32 {
        self.sessions.iter().map(|s| s.duration_minutes).sum()
    }

    /// Recomputes `total_duration_hours` from the session durations.
    ///
    /// Returns the previously reported value.
    pub fn normalize_total(&mut self) -> u32 {
        let reported = self.total_duration_hours;
        self.total_duration_hours = rounded_hours(self.total_minutes());
        reported
    }

    /// Coverage bijection plus per-session bounds.
    pub fn check_against(&self, graph: &KnowledgeGraph) -> Result<(), Vec<PlanViolation>> {
        let mut violations = Vec::new();
        let known = graph.topic_names();
        let mut counts: HashMap<&str, usize> = HashMap::new();

        for session in &self.sessions {
            let name = session.topic.name.as_str();
            if !known.contains(name) {
                violations.push(PlanViolation::UnknownTopic(name.to_string()));
            }
            *counts.entry(name).or_default() += 1;

            if !(MIN_SESSION_MINUTES..=MAX_SESSION_MINUTES).contains(&session.duration_minutes) {
                violations.push(PlanViolation::DurationOutOfRange(
                    name.to_string(),
                    session.duration_minutes,
                ));
            }
            if session.methods.is_empty() {
                violations.push(PlanViolation::NoMethods(name.to_string()));
            }
        }

        for topic in &graph.nodes {
            match counts.get(topic.name.as_str()).copied().unwrap_or(0) {
                0 => violations.push(PlanViolation::MissingTopic(topic.name.clone())),
                1 => {}
                n => violations.push(PlanViolation::RepeatedTopic(topic.name.clone(), n)),
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// Sessions whose date lies outside the window.
    pub fn dates_outside(&self, window: &DueDateWindow) -> Vec<&StudySession> {
        self.sessions
            .iter()
            .filter(|s| s.date.is_some_and(|d| !window.contains(d)))
            .collect()
    }

    /// Ordering edges the session sequence (or session dates) contradicts.
    pub fn ordering_violations(&self, graph: &KnowledgeGraph) -> Vec<OrderingViolation> {
        let position: HashMap<&str, (usize, Option<NaiveDate>)> = self
            .sessions
            .iter()
            .enumerate()
            .map(|(idx, s)| (s.topic.name.as_str(), (idx, s.date)))
            .collect();

        graph
            .ordering_constraints()
            .into_iter()
            .filter(|(earlier, later)| {
                match (position.get(earlier), position.get(later)) {
                    (Some((ei, ed)), Some((li, ld))) => {
                        let dates_inverted = matches!((ed, ld), (Some(e), Some(l)) if e > l);
                        ei > li || dates_inverted
                    }
                    _ => false,
                }
            })
            .map(|(earlier, later)| OrderingViolation {
                earlier: earlier.to_string(),
                later: later.to_string(),
            })
            .collect()
    }
}
