use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::future;
use serde_json::json;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::timeout;
use tracing::{info, warn};

use super::domain::{
    CampaignId, CampaignRecord, CampaignStatus, CandidateId, CandidateProfile, Evaluation,
};
use super::registry::RankingPolicy;
use super::store::{CampaignStore, CampaignStoreError, EvaluationUpdate};

/// The active reasoning stages of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Sourcing,
    Evaluating,
    Ranking,
    Drafting,
}

impl PipelineStage {
    pub const fn label(self) -> &'static str {
        match self {
            PipelineStage::Sourcing => "sourcing",
            PipelineStage::Evaluating => "evaluating",
            PipelineStage::Ranking => "ranking",
            PipelineStage::Drafting => "drafting",
        }
    }

    /// Campaign status that marks this stage as in progress.
    pub const fn entry_status(self) -> CampaignStatus {
        match self {
            PipelineStage::Sourcing => CampaignStatus::Sourcing,
            PipelineStage::Evaluating => CampaignStatus::Evaluating,
            PipelineStage::Ranking => CampaignStatus::Ranking,
            PipelineStage::Drafting => CampaignStatus::Drafting,
        }
    }

    pub const fn for_status(status: CampaignStatus) -> Option<PipelineStage> {
        match status {
            CampaignStatus::Sourcing => Some(PipelineStage::Sourcing),
            CampaignStatus::Evaluating => Some(PipelineStage::Evaluating),
            CampaignStatus::Ranking => Some(PipelineStage::Ranking),
            CampaignStatus::Drafting => Some(PipelineStage::Drafting),
            _ => None,
        }
    }
}

/// Failure reported by an external stage collaborator.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct StageError(pub String);

/// Sourcing collaborator: turns a job description into candidate profiles.
#[async_trait]
pub trait CandidateSourcer: Send + Sync {
    async fn find_candidates(
        &self,
        job_description: &str,
    ) -> Result<Vec<CandidateProfile>, StageError>;
}

/// Evaluation collaborator: scores one candidate against the job description.
#[async_trait]
pub trait CandidateEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        job_description: &str,
        profile: &CandidateProfile,
    ) -> Result<Evaluation, StageError>;
}

/// Outreach collaborator: drafts up to three message variants for a ranked
/// candidate.
#[async_trait]
pub trait OutreachDrafter: Send + Sync {
    async fn draft(
        &self,
        profile: &CandidateProfile,
        rationale: &str,
    ) -> Result<Vec<String>, StageError>;
}

/// Error raised while advancing a campaign through the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] CampaignStoreError),
    #[error("{stage} collaborator failed: {detail}")]
    Collaborator { stage: &'static str, detail: String },
    #[error("campaign is already being advanced")]
    Concurrency,
}

/// Orchestrator configuration. The defaults mirror the policy decisions the
/// product team signed off on: a shortlist of three, bias-flagged candidates
/// excluded, and a thirty second budget per collaborator call.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub ranking: RankingPolicy,
    pub stage_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ranking: RankingPolicy::default(),
            stage_timeout: Duration::from_secs(30),
        }
    }
}

/// Drives campaigns through the fixed stage sequence, delegating the
/// reasoning to external collaborators and all state changes to the store.
///
/// Campaigns advance independently of each other, but a per-campaign guard
/// ensures a single campaign is never advanced by two executions at once.
pub struct PipelineOrchestrator<S, E, D> {
    store: Arc<CampaignStore>,
    sourcer: Arc<S>,
    evaluator: Arc<E>,
    drafter: Arc<D>,
    config: PipelineConfig,
    run_guards: Mutex<HashMap<CampaignId, Arc<AsyncMutex<()>>>>,
}

impl<S, E, D> PipelineOrchestrator<S, E, D>
where
    S: CandidateSourcer + 'static,
    E: CandidateEvaluator + 'static,
    D: OutreachDrafter + 'static,
{
    pub fn new(
        store: Arc<CampaignStore>,
        sourcer: Arc<S>,
        evaluator: Arc<E>,
        drafter: Arc<D>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            sourcer,
            evaluator,
            drafter,
            config,
            run_guards: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<CampaignStore> {
        &self.store
    }

    /// Drive a pending campaign through sourcing, evaluation, ranking, and
    /// drafting until it awaits human review. Unrecoverable stage failures
    /// leave the campaign `failed` with its partial output intact.
    pub async fn run_to_review(
        &self,
        id: &CampaignId,
    ) -> Result<CampaignRecord, PipelineError> {
        let permit = self
            .run_guard(id)
            .try_lock_owned()
            .map_err(|_| PipelineError::Concurrency)?;
        let result = self.advance_to_review(id).await;
        drop(permit);
        self.release_run_guard(id);
        result
    }

    async fn advance_to_review(
        &self,
        id: &CampaignId,
    ) -> Result<CampaignRecord, PipelineError> {
        let record = self.store.get(id)?;
        if record.status != CampaignStatus::Pending {
            return Err(CampaignStoreError::InvalidState {
                status: record.status,
            }
            .into());
        }
        let job_description = record.job_description;

        info!(campaign = %id, "pipeline run starting");
        self.run_sourcing(id, &job_description).await?;
        self.run_evaluation(id, &job_description).await?;
        self.run_ranking(id)?;
        self.run_drafting(id).await?;
        info!(campaign = %id, "pipeline run awaiting review");

        Ok(self.store.get(id)?)
    }

    async fn run_sourcing(&self, id: &CampaignId, jd: &str) -> Result<(), PipelineError> {
        self.store.begin_stage(id, PipelineStage::Sourcing)?;
        match self
            .stage_call(PipelineStage::Sourcing, self.sourcer.find_candidates(jd))
            .await
        {
            Ok(profiles) => {
                let absorbed = self.store.update_candidates(id, profiles)?;
                self.store.complete_stage(
                    id,
                    PipelineStage::Sourcing,
                    CampaignStatus::Evaluating,
                    json!({ "candidates": absorbed.len() }),
                )?;
                Ok(())
            }
            Err(err) => {
                self.record_failure(id, PipelineStage::Sourcing, &err);
                Err(err)
            }
        }
    }

    /// Evaluate candidates concurrently; a per-candidate failure marks that
    /// candidate data-deficient and never aborts the campaign.
    async fn run_evaluation(&self, id: &CampaignId, jd: &str) -> Result<(), PipelineError> {
        let record = self.store.get(id)?;
        let pending: Vec<_> = record
            .candidates
            .records()
            .into_iter()
            .filter(|candidate| candidate.evaluation.is_none() && !candidate.data_deficient)
            .collect();

        let stage_timeout = self.config.stage_timeout;
        let evaluator = &self.evaluator;
        let calls = pending.iter().map(|candidate| async move {
            match timeout(stage_timeout, evaluator.evaluate(jd, &candidate.profile)).await {
                Ok(Ok(evaluation)) => EvaluationUpdate::Scored(candidate.id.clone(), evaluation),
                Ok(Err(err)) => EvaluationUpdate::Failed(candidate.id.clone(), err.to_string()),
                Err(_) => EvaluationUpdate::Failed(
                    candidate.id.clone(),
                    "evaluation timed out".to_string(),
                ),
            }
        });
        let updates = future::join_all(calls).await;

        let failed: Vec<String> = updates
            .iter()
            .filter_map(|update| match update {
                EvaluationUpdate::Failed(candidate_id, _) => Some(candidate_id.0.clone()),
                EvaluationUpdate::Scored(..) => None,
            })
            .collect();
        let evaluated = updates.len() - failed.len();

        self.store.record_evaluations(id, updates)?;
        self.store.complete_stage(
            id,
            PipelineStage::Evaluating,
            CampaignStatus::Ranking,
            json!({ "evaluated": evaluated, "failed_candidates": failed }),
        )?;
        Ok(())
    }

    fn run_ranking(&self, id: &CampaignId) -> Result<(), PipelineError> {
        let ranked = self.store.apply_ranking(id, &self.config.ranking)?;
        self.store.complete_stage(
            id,
            PipelineStage::Ranking,
            CampaignStatus::Drafting,
            json!({ "ranked": ranked.len() }),
        )?;
        Ok(())
    }

    async fn run_drafting(&self, id: &CampaignId) -> Result<(), PipelineError> {
        let record = self.store.get(id)?;
        let ranked = record.candidates.ranked();

        for candidate in &ranked {
            let rationale = candidate
                .evaluation
                .as_ref()
                .map(|evaluation| evaluation.rationale.clone())
                .unwrap_or_default();
            match self
                .stage_call(
                    PipelineStage::Drafting,
                    self.drafter.draft(&candidate.profile, &rationale),
                )
                .await
            {
                Ok(variants) => {
                    let variants: Vec<String> = variants.into_iter().take(3).collect();
                    self.store
                        .record_outreach_drafts(id, &candidate.id, variants)?;
                }
                Err(err) => {
                    self.record_failure(id, PipelineStage::Drafting, &err);
                    return Err(err);
                }
            }
        }

        self.store.complete_stage(
            id,
            PipelineStage::Drafting,
            CampaignStatus::AwaitingReview,
            json!({ "drafted_candidates": ranked.len() }),
        )?;
        Ok(())
    }

    /// Wrap a collaborator call with the configured timeout; a timeout is
    /// indistinguishable from any other collaborator failure.
    async fn stage_call<T>(
        &self,
        stage: PipelineStage,
        call: impl Future<Output = Result<T, StageError>>,
    ) -> Result<T, PipelineError> {
        match timeout(self.config.stage_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(PipelineError::Collaborator {
                stage: stage.label(),
                detail: err.to_string(),
            }),
            Err(_) => Err(PipelineError::Collaborator {
                stage: stage.label(),
                detail: "timed out".to_string(),
            }),
        }
    }

    fn record_failure(&self, id: &CampaignId, stage: PipelineStage, err: &PipelineError) {
        match self
            .store
            .fail_stage(id, stage, json!({ "error": err.to_string() }))
        {
            Ok(()) => warn!(campaign = %id, stage = stage.label(), error = %err, "stage failed"),
            // The campaign turned terminal while the collaborator was in
            // flight; its result is discarded rather than applied.
            Err(store_err) => warn!(
                campaign = %id,
                stage = stage.label(),
                error = %store_err,
                "discarding stage failure for terminal campaign"
            ),
        }
    }

    fn run_guard(&self, id: &CampaignId) -> Arc<AsyncMutex<()>> {
        let mut guards = self
            .run_guards
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        guards.entry(id.clone()).or_default().clone()
    }

    /// Drop the guard entry once this run's permit is released and no other
    /// execution holds a clone. The strong-count check runs under the map
    /// mutex, so a concurrent `run_guard` either reuses the entry before
    /// removal or allocates a fresh one afterwards.
    fn release_run_guard(&self, id: &CampaignId) {
        let mut guards = self
            .run_guards
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let unshared = guards
            .get(id)
            .map(|guard| Arc::strong_count(guard) == 1)
            .unwrap_or(false);
        if unshared {
            guards.remove(id);
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked_run_guard_count(&self) -> usize {
        self.run_guards
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
