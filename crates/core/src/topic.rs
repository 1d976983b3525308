use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use utoipa::ToSchema;

/// A single topic extracted from the study material.
///
/// Topics are identified by `name`; the description is informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ToSchema)]
pub struct Topic {
    /// Short, precise name. Must be unique within a graph.
    pub name: String,
    /// Concise description derived from the study material.
    pub description: String,
}

impl Topic {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// The kind of edge between two topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// `from` is introduced before, or is a prerequisite for, `to`.
    Precedes,
    /// `from` builds upon or comes after `to`.
    Follows,
    /// Conceptually related without a clear ordering.
    RelatedTo,
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationshipKind::Precedes => write!(f, "precedes"),
            RelationshipKind::Follows => write!(f, "follows"),
            RelationshipKind::RelatedTo => write!(f, "related_to"),
        }
    }
}

/// A directed edge `(from_topic, relationship, to_topic)` referencing topics by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ToSchema)]
pub struct TopicRelationship {
    pub from_topic: String,
    pub relationship: RelationshipKind,
    pub to_topic: String,
}

impl TopicRelationship {
    pub fn new(
        from_topic: impl Into<String>,
        relationship: RelationshipKind,
        to_topic: impl Into<String>,
    ) -> Self {
        Self {
            from_topic: from_topic.into(),
            relationship,
            to_topic: to_topic.into(),
        }
    }

    /// Normalizes ordering edges into an `(earlier, later)` pair.
    ///
    /// `RelatedTo` edges carry no ordering and return `None`.
    pub fn ordering(&self) -> Option<(&str, &str)> {
        match self.relationship {
            RelationshipKind::Precedes => Some((&self.from_topic, &self.to_topic)),
            RelationshipKind::Follows => Some((&self.to_topic, &self.from_topic)),
            RelationshipKind::RelatedTo => None,
        }
    }
}

impl fmt::Display for TopicRelationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({} {} {})",
            self.from_topic, self.relationship, self.to_topic
        )
    }
}

/// Reasons a generated graph is structurally unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphViolation {
    #[error("topic at position {0} has an empty name")]
    EmptyName(usize),
    #[error("duplicate topic name '{0}'")]
    DuplicateTopic(String),
    #[error("edge {0} references unknown topic '{1}'")]
    UnknownEndpoint(String, String),
}

/// Topics extracted from a piece of study material and the relationships between them.
///
/// A graph is produced fresh by every generation attempt and is never patched in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ToSchema)]
pub struct KnowledgeGraph {
    /// A list of topics extracted from the study material.
    pub nodes: Vec<Topic>,
    /// Relationships between topics, referencing them by name.
    pub edges: Vec<TopicRelationship>,
}

impl KnowledgeGraph {
    pub fn new(nodes: Vec<Topic>, edges: Vec<TopicRelationship>) -> Self {
        Self { nodes, edges }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn topic(&self, name: &str) -> Option<&Topic> {
        self.nodes.iter().find(|t| t.name == name)
    }

    pub fn topic_names(&self) -> HashSet<&str> {
        self.nodes.iter().map(|t| t.name.as_str()).collect()
    }

    /// Checks node uniqueness and edge referential integrity.
    pub fn validate(&self) -> Result<(), Vec<GraphViolation>> {
        let mut violations = Vec::new();
        let mut seen = HashSet::new();

        for (idx, topic) in self.nodes.iter().enumerate() {
            if topic.name.trim().is_empty() {
                violations.push(GraphViolation::EmptyName(idx));
            } else if !seen.insert(topic.name.as_str()) {
                violations.push(GraphViolation::DuplicateTopic(topic.name.clone()));
            }
        }

        for edge in &self.edges {
            for endpoint in [&edge.from_topic, &edge.to_topic] {
                if !seen.contains(endpoint.as_str()) {
                    violations.push(GraphViolation::UnknownEndpoint(
                        edge.to_string(),
                        endpoint.clone(),
                    ));
                }
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// All `(earlier, later)` pairs implied by `Precedes`/`Follows` edges.
    pub fn ordering_constraints(&self) -> Vec<(&str, &str)> {
        self.edges.iter().filter_map(|e| e.ordering()).collect()
    }
}
