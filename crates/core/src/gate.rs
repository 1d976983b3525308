//! Retry-gated stages: generate a candidate, have it critiqued, and retry a
//! bounded number of times until the critic gives its best verdict.

use crate::{
    error::Result,
    verdict::{Evaluation, Verdict},
};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

/// Bounded-attempt policy for a gated stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// A policy of `0` attempts still runs once.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2)
    }
}

/// How a gated stage ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// The critic returned its best verdict.
    Accepted,
    /// All attempts were used without a best verdict; the last candidate is kept.
    Exhausted,
}

/// The artifact a stage settled on, plus how it got there.
#[derive(Debug, Clone)]
pub struct StageOutcome<A, V> {
    pub artifact: A,
    pub verdict: V,
    pub justification: String,
    pub attempts: u32,
    pub status: StageStatus,
}

/// Artifact-free view of a [`StageOutcome`], for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageSummary<V> {
    pub verdict: V,
    pub justification: String,
    pub attempts: u32,
    pub status: StageStatus,
}

impl<A, V: Clone> StageOutcome<A, V> {
    pub fn summary(&self) -> StageSummary<V> {
        StageSummary {
            verdict: self.verdict.clone(),
            justification: self.justification.clone(),
            attempts: self.attempts,
            status: self.status,
        }
    }
}

/// A (generator, critic) pair bound to one stage's input.
#[async_trait]
pub trait GatedStage: Send + Sync {
    type Artifact: Send + Sync;
    type Verdict: Verdict;

    fn name(&self) -> &str;

    /// Produces a fresh candidate. Previous candidates are never reused.
    async fn generate(&self) -> Result<Self::Artifact>;

    async fn critique(&self, artifact: &Self::Artifact) -> Result<Evaluation<Self::Verdict>>;
}

/// Drives a stage until it is accepted or out of attempts.
///
/// The loop starts from the worst verdict, so at least one attempt is always
/// made. An exhausted stage is a degraded success, not an error: the last
/// candidate is returned and a warning is logged. Critic justifications are
/// recorded but not fed back into the next attempt.
pub async fn run_gated<S>(
    stage: &S,
    policy: &RetryPolicy,
) -> Result<StageOutcome<S::Artifact, S::Verdict>>
where
    S: GatedStage + ?Sized,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut verdict = <S::Verdict as Verdict>::WORST;
    let mut attempts = 0;

    loop {
        attempts += 1;
        info!(stage = stage.name(), attempt = attempts, max_attempts, "Generating candidate");
        let artifact = stage.generate().await?;

        let evaluation = stage.critique(&artifact).await?;
        info!(
            stage = stage.name(),
            attempt = attempts,
            previous = %verdict,
            verdict = %evaluation.verdict,
            justification = %evaluation.justification,
            "Candidate evaluated"
        );
        verdict = evaluation.verdict;

        if verdict.is_best() {
            return Ok(StageOutcome {
                artifact,
                verdict,
                justification: evaluation.justification,
                attempts,
                status: StageStatus::Accepted,
            });
        }

        if attempts >= max_attempts {
            warn!(
                stage = stage.name(),
                attempts,
                verdict = %verdict,
                "Stage exhausted its attempts; continuing with the last candidate"
            );
            return Ok(StageOutcome {
                artifact,
                verdict,
                justification: evaluation.justification,
                attempts,
                status: StageStatus::Exhausted,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::verdict::Quality;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Generates numbered candidates and replays scripted verdicts.
    struct ScriptedStage {
        verdicts: Mutex<Vec<Quality>>,
        generated: AtomicU32,
        critiqued: AtomicU32,
        fail_generation_at: Option<u32>,
    }

    impl ScriptedStage {
        fn new(verdicts: Vec<Quality>) -> Self {
            Self {
                verdicts: Mutex::new(verdicts.into_iter().rev().collect()),
                generated: AtomicU32::new(0),
                critiqued: AtomicU32::new(0),
                fail_generation_at: None,
            }
        }
    }

    #[async_trait]
    impl GatedStage for ScriptedStage {
        type Artifact = u32;
        type Verdict = Quality;

        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self) -> Result<u32> {
            let n = self.generated.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_generation_at == Some(n) {
                return Err(PipelineError::InvalidRequest("boom".to_string()));
            }
            Ok(n)
        }

        async fn critique(&self, artifact: &u32) -> Result<Evaluation<Quality>> {
            self.critiqued.fetch_add(1, Ordering::SeqCst);
            let verdict = self.verdicts.lock().unwrap().pop().unwrap_or(Quality::Bad);
            Ok(Evaluation::new(verdict, format!("candidate {artifact}")))
        }
    }

    #[tokio::test]
    async fn test_first_good_candidate_is_accepted() {
        let stage = ScriptedStage::new(vec![Quality::Good]);
        let outcome = run_gated(&stage, &RetryPolicy::new(2)).await.unwrap();

        assert_eq!(outcome.status, StageStatus::Accepted);
        assert_eq!(outcome.artifact, 1);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(stage.generated.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_attempt_accepted() {
        let stage = ScriptedStage::new(vec![Quality::NeedsImprovement, Quality::Good]);
        let outcome = run_gated(&stage, &RetryPolicy::new(2)).await.unwrap();

        assert_eq!(outcome.status, StageStatus::Accepted);
        assert_eq!(outcome.artifact, 2);
        assert_eq!(outcome.verdict, Quality::Good);
    }

    #[tokio::test]
    async fn test_always_bad_keeps_last_candidate_within_bound() {
        let stage = ScriptedStage::new(vec![Quality::Bad; 10]);
        let outcome = run_gated(&stage, &RetryPolicy::new(2)).await.unwrap();

        assert_eq!(outcome.status, StageStatus::Exhausted);
        assert_eq!(outcome.artifact, 2, "the second artifact, not the first");
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.justification, "candidate 2");
        assert_eq!(stage.generated.load(Ordering::SeqCst), 2);
        assert_eq!(stage.critiqued.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_attempt_policy_still_runs_once() {
        let stage = ScriptedStage::new(vec![Quality::Bad]);
        let outcome = run_gated(&stage, &RetryPolicy::new(0)).await.unwrap();

        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.status, StageStatus::Exhausted);
    }

    #[tokio::test]
    async fn test_generation_error_aborts_stage() {
        let mut stage = ScriptedStage::new(vec![Quality::Bad, Quality::Good]);
        stage.fail_generation_at = Some(2);

        let err = run_gated(&stage, &RetryPolicy::new(2)).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRequest(_)));
        assert_eq!(stage.critiqued.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_summary_drops_artifact() {
        let outcome = StageOutcome {
            artifact: "graph",
            verdict: Quality::NeedsImprovement,
            justification: "thin".to_string(),
            attempts: 2,
            status: StageStatus::Exhausted,
        };
        let summary = outcome.summary();
        assert_eq!(summary.verdict, Quality::NeedsImprovement);
        assert_eq!(summary.status, StageStatus::Exhausted);
    }
}
