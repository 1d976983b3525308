//! Discrete verdicts returned by critics.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt::{self, Debug, Display};

/// A closed, ordered scale of critic verdicts.
///
/// The retry gate only needs to know the two ends of the scale: `WORST` seeds
/// the loop, and reaching `BEST` accepts the candidate.
pub trait Verdict:
    Copy + Eq + Debug + Display + Send + Sync + Serialize + DeserializeOwned + JsonSchema + 'static
{
    const BEST: Self;
    const WORST: Self;

    fn is_best(&self) -> bool {
        *self == Self::BEST
    }
}

/// Quality of a generated knowledge graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Good,
    NeedsImprovement,
    Bad,
}

impl Verdict for Quality {
    const BEST: Self = Quality::Good;
    const WORST: Self = Quality::Bad;
}

impl Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Good => write!(f, "good"),
            Quality::NeedsImprovement => write!(f, "needs_improvement"),
            Quality::Bad => write!(f, "bad"),
        }
    }
}

/// Whether a study plan can realistically be completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Achievability {
    Achievable,
    NeedsImprovement,
    Unachievable,
}

impl Verdict for Achievability {
    const BEST: Self = Achievability::Achievable;
    const WORST: Self = Achievability::Unachievable;
}

impl Display for Achievability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Achievability::Achievable => write!(f, "achievable"),
            Achievability::NeedsImprovement => write!(f, "needs_improvement"),
            Achievability::Unachievable => write!(f, "unachievable"),
        }
    }
}

/// A critic's verdict together with its justification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(bound = "V: Verdict")]
pub struct Evaluation<V: Verdict> {
    /// The assessment result.
    pub verdict: V,
    /// A concise explanation for the rating.
    pub justification: String,
}

impl<V: Verdict> Evaluation<V> {
    pub fn new(verdict: V, justification: impl Into<String>) -> Self {
        Self {
            verdict,
            justification: justification.into(),
        }
    }
}

pub type GraphEvaluation = Evaluation<Quality>;
pub type PlanEvaluation = Evaluation<Achievability>;
