use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;

use super::audit::{AuditEntry, AuditEventType, AuditLog};
use super::domain::{
    CampaignId, CampaignRecord, CampaignStatus, CampaignSummary, CandidateId, CandidateProfile,
    Evaluation, OutreachDraft,
};
use super::metrics;
use super::pipeline::PipelineStage;
use super::redaction;
use super::registry::{RankingPolicy, RegistryError};
use super::storage::{CampaignStorage, InMemoryCampaignStorage, StorageError};

const MAX_DRAFT_VARIANTS: usize = 3;

/// Error raised by campaign store operations.
#[derive(Debug, thiserror::Error)]
pub enum CampaignStoreError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("campaign not found")]
    CampaignNotFound,
    #[error("candidate {0} not found")]
    CandidateNotFound(CandidateId),
    #[error("operation not allowed while campaign is {status}")]
    InvalidState { status: CampaignStatus },
    #[error("illegal status transition {from} -> {to}")]
    InvalidTransition {
        from: CampaignStatus,
        to: CampaignStatus,
    },
    #[error("draft index {index} out of bounds for {len} stored draft(s)")]
    DraftIndexOutOfBounds { index: usize, len: usize },
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Evaluation-stage output for one candidate, as merged back by the
/// orchestrator. Per-candidate failures do not abort the stage; they mark the
/// candidate data-deficient instead.
#[derive(Debug, Clone)]
pub enum EvaluationUpdate {
    Scored(CandidateId, Evaluation),
    Failed(CandidateId, String),
}

static CAMPAIGN_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_campaign_id() -> CampaignId {
    let id = CAMPAIGN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    CampaignId(format!("camp-{id:06}"))
}

/// Aggregate root owning campaign records, their audit trail, and the
/// per-campaign serialization of mutations.
///
/// Every mutating operation takes the campaign's lock, applies the change to
/// the backing storage, and appends its audit entries before releasing the
/// lock: a mutation is observable if and only if its audit entries are. The
/// lock is never held across collaborator calls; those happen in the
/// orchestrator before or after the store operation.
pub struct CampaignStore {
    storage: Arc<dyn CampaignStorage>,
    audit: AuditLog,
    locks: Mutex<HashMap<CampaignId, Arc<Mutex<()>>>>,
}

impl CampaignStore {
    pub fn new(storage: Arc<dyn CampaignStorage>) -> Self {
        Self {
            storage,
            audit: AuditLog::default(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryCampaignStorage::default()))
    }

    /// Allocate a new campaign in `pending` and record its creation.
    pub fn create(&self, job_description: &str) -> Result<CampaignId, CampaignStoreError> {
        if job_description.trim().is_empty() {
            return Err(CampaignStoreError::Validation(
                "job description must not be empty".to_string(),
            ));
        }

        let id = next_campaign_id();
        let lock = self.campaign_lock(&id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let record = CampaignRecord::new(id.clone(), job_description.to_string(), Utc::now());
        self.storage.put(record)?;
        self.audit.append(
            id.clone(),
            AuditEventType::CampaignCreated,
            json!({ "status": CampaignStatus::Pending.label() }),
        );
        info!(campaign = %id, "campaign created");
        Ok(id)
    }

    /// Read-consistent snapshot of a campaign. Purged campaigns are gone as
    /// far as readers are concerned; only their audit tombstone remains.
    pub fn get(&self, id: &CampaignId) -> Result<CampaignRecord, CampaignStoreError> {
        match self.storage.get(id)? {
            Some(record) if record.status != CampaignStatus::Purged => Ok(record),
            _ => Err(CampaignStoreError::CampaignNotFound),
        }
    }

    pub fn list(&self) -> Result<Vec<CampaignSummary>, CampaignStoreError> {
        Ok(self
            .storage
            .list()?
            .iter()
            .map(CampaignRecord::summary)
            .collect())
    }

    /// Merge sourced candidate profiles into the campaign.
    pub fn update_candidates(
        &self,
        id: &CampaignId,
        profiles: Vec<CandidateProfile>,
    ) -> Result<Vec<CandidateId>, CampaignStoreError> {
        self.with_campaign(id, |record, _events| {
            ensure_active(record)?;
            Ok(record.candidates.absorb_profiles(profiles))
        })
    }

    /// Merge evaluation-stage outcomes. Failed candidates are marked
    /// data-deficient rather than aborting the batch.
    pub fn record_evaluations(
        &self,
        id: &CampaignId,
        updates: Vec<EvaluationUpdate>,
    ) -> Result<(), CampaignStoreError> {
        self.with_campaign(id, |record, _events| {
            ensure_active(record)?;
            for update in updates {
                match update {
                    EvaluationUpdate::Scored(candidate_id, evaluation) => {
                        record.candidates.record_evaluation(&candidate_id, evaluation)?;
                    }
                    EvaluationUpdate::Failed(candidate_id, _reason) => {
                        record.candidates.mark_data_deficient(&candidate_id)?;
                    }
                }
            }
            Ok(())
        })
    }

    /// Recompute the deterministic ranking for the current evaluated set.
    pub fn apply_ranking(
        &self,
        id: &CampaignId,
        policy: &RankingPolicy,
    ) -> Result<Vec<CandidateId>, CampaignStoreError> {
        self.with_campaign(id, |record, events| {
            ensure_active(record)?;
            let ranked = record.candidates.apply_ranking(policy);
            events.push((
                AuditEventType::RankingComputed,
                json!({
                    "ranked": ranked.iter().map(|c| c.0.clone()).collect::<Vec<_>>(),
                    "shortlist_size": policy.shortlist_size,
                    "rank_flagged": policy.rank_flagged,
                }),
            ));
            Ok(ranked)
        })
    }

    /// Store up to three redacted outreach variants for a ranked candidate.
    pub fn record_outreach_drafts(
        &self,
        id: &CampaignId,
        candidate_id: &CandidateId,
        variants: Vec<String>,
    ) -> Result<(), CampaignStoreError> {
        if variants.is_empty() || variants.len() > MAX_DRAFT_VARIANTS {
            return Err(CampaignStoreError::Validation(format!(
                "expected 1..={MAX_DRAFT_VARIANTS} draft variants, got {}",
                variants.len()
            )));
        }
        self.with_campaign(id, |record, events| {
            ensure_active(record)?;
            let candidate = record
                .candidates
                .get(candidate_id)
                .ok_or_else(|| CampaignStoreError::CandidateNotFound(candidate_id.clone()))?;
            let bias_flagged = candidate.bias_flagged();
            let drafts: Vec<OutreachDraft> = variants
                .iter()
                .map(|body| OutreachDraft {
                    body: redaction::redact(body),
                    bias_flagged,
                    approved: false,
                    sent: false,
                })
                .collect();
            let count = drafts.len();
            record.outreach_drafts.insert(candidate_id.clone(), drafts);
            events.push((
                AuditEventType::OutreachDrafted,
                json!({ "candidate": candidate_id.0.clone(), "variants": count }),
            ));
            Ok(())
        })
    }

    /// Mark one stored draft variant as approved by a reviewer.
    pub fn approve_outreach(
        &self,
        id: &CampaignId,
        candidate_id: &CandidateId,
        draft_index: usize,
    ) -> Result<(), CampaignStoreError> {
        self.with_campaign(id, |record, events| {
            ensure_active(record)?;
            let draft = draft_mut(record, candidate_id, draft_index)?;
            draft.approved = true;
            events.push((
                AuditEventType::OutreachApproved,
                json!({ "candidate": candidate_id.0.clone(), "draft_index": draft_index }),
            ));
            maybe_complete_review(record, events, "outreach");
            Ok(())
        })
    }

    /// Mark one stored draft variant as sent to the candidate.
    pub fn mark_sent(
        &self,
        id: &CampaignId,
        candidate_id: &CandidateId,
        draft_index: usize,
    ) -> Result<(), CampaignStoreError> {
        self.with_campaign(id, |record, events| {
            ensure_active(record)?;
            let draft = draft_mut(record, candidate_id, draft_index)?;
            draft.sent = true;
            events.push((
                AuditEventType::OutreachSent,
                json!({ "candidate": candidate_id.0.clone(), "draft_index": draft_index }),
            ));
            maybe_complete_review(record, events, "outreach");
            Ok(())
        })
    }

    /// Explicitly close the review phase without sending outreach.
    pub fn complete_review(&self, id: &CampaignId) -> Result<(), CampaignStoreError> {
        self.with_campaign(id, |record, events| {
            transition(record, CampaignStatus::Completed)?;
            events.push((
                AuditEventType::StageCompleted,
                json!({ "stage": "review", "via": "manual" }),
            ));
            Ok(())
        })
    }

    /// Move the campaign along the state machine without stage bookkeeping.
    pub fn set_status(
        &self,
        id: &CampaignId,
        status: CampaignStatus,
    ) -> Result<(), CampaignStoreError> {
        self.with_campaign(id, |record, _events| transition(record, status))
    }

    /// Enter a pipeline stage: advance the status and record `stage_started`.
    pub fn begin_stage(
        &self,
        id: &CampaignId,
        stage: PipelineStage,
    ) -> Result<(), CampaignStoreError> {
        self.with_campaign(id, |record, events| {
            transition(record, stage.entry_status())?;
            events.push((
                AuditEventType::StageStarted,
                json!({ "stage": stage.label() }),
            ));
            Ok(())
        })
    }

    /// Leave a pipeline stage: record `stage_completed`, advance to `next`,
    /// and when `next` is itself an active stage record its `stage_started`
    /// in the same transaction.
    pub fn complete_stage(
        &self,
        id: &CampaignId,
        stage: PipelineStage,
        next: CampaignStatus,
        detail: Value,
    ) -> Result<(), CampaignStoreError> {
        self.with_campaign(id, |record, events| {
            transition(record, next)?;
            events.push((
                AuditEventType::StageCompleted,
                json!({ "stage": stage.label(), "detail": detail }),
            ));
            if let Some(started) = PipelineStage::for_status(next) {
                events.push((
                    AuditEventType::StageStarted,
                    json!({ "stage": started.label() }),
                ));
            }
            Ok(())
        })
    }

    /// Record an unrecoverable stage failure and move the campaign to
    /// `failed`. Prior stage output stays inspectable.
    pub fn fail_stage(
        &self,
        id: &CampaignId,
        stage: PipelineStage,
        detail: Value,
    ) -> Result<(), CampaignStoreError> {
        self.with_campaign(id, |record, events| {
            transition(record, CampaignStatus::Failed)?;
            events.push((
                AuditEventType::StageFailed,
                json!({
                    "stage": stage.label(),
                    "reason": format!("{}_failed", stage.label()),
                    "detail": detail,
                }),
            ));
            Ok(())
        })
    }

    /// Remove the campaign's job description, candidate data, and drafts,
    /// keeping a tombstone record and a surviving audit entry. Purging an
    /// absent or already-purged campaign is a successful no-op.
    pub fn purge(&self, id: &CampaignId) -> Result<(), CampaignStoreError> {
        let lock = self.campaign_lock(id);
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.purge_locked(id)
        };
        drop(lock);
        self.release_lock(id);
        result
    }

    fn purge_locked(&self, id: &CampaignId) -> Result<(), CampaignStoreError> {
        let record = match self.storage.get(id)? {
            None => return Ok(()),
            Some(record) if record.status == CampaignStatus::Purged => return Ok(()),
            Some(record) => record,
        };

        let mut tombstone = CampaignRecord::new(id.clone(), String::new(), record.created_at);
        tombstone.status = CampaignStatus::Purged;
        tombstone.updated_at = Utc::now();
        self.storage.put(tombstone)?;
        self.audit.purge(
            id,
            json!({ "status": CampaignStatus::Purged.label(), "previous_status": record.status.label() }),
        );
        info!(campaign = %id, "campaign purged");
        Ok(())
    }

    pub fn audit_entries(&self, id: &CampaignId) -> Vec<AuditEntry> {
        self.audit.entries_for(id)
    }

    pub fn all_audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.entries()
    }

    fn campaign_lock(&self, id: &CampaignId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(id.clone()).or_default().clone()
    }

    /// Drop the lock-map entry for a campaign nobody else is touching.
    /// Callers must have released their own clone first; the strong-count
    /// check happens under the map mutex, so a racing `campaign_lock` either
    /// sees the entry before removal or allocates a fresh one after.
    fn release_lock(&self, id: &CampaignId) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let unshared = locks
            .get(id)
            .map(|lock| Arc::strong_count(lock) == 1)
            .unwrap_or(false);
        if unshared {
            locks.remove(id);
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked_lock_count(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Run one serialized mutation against a campaign. Metrics are recomputed
    /// and audit entries appended before the campaign lock is released, so
    /// concurrent writers never observe or produce interleaved partial state.
    fn with_campaign<T>(
        &self,
        id: &CampaignId,
        op: impl FnOnce(
            &mut CampaignRecord,
            &mut Vec<(AuditEventType, Value)>,
        ) -> Result<T, CampaignStoreError>,
    ) -> Result<T, CampaignStoreError> {
        let lock = self.campaign_lock(id);
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.mutate_locked(id, op)
        };
        drop(lock);
        // A miss means the campaign is gone (or was never there); do not keep
        // a lock entry alive for it.
        if matches!(&result, Err(CampaignStoreError::CampaignNotFound)) {
            self.release_lock(id);
        }
        result
    }

    fn mutate_locked<T>(
        &self,
        id: &CampaignId,
        op: impl FnOnce(
            &mut CampaignRecord,
            &mut Vec<(AuditEventType, Value)>,
        ) -> Result<T, CampaignStoreError>,
    ) -> Result<T, CampaignStoreError> {
        let mut record = match self.storage.get(id)? {
            Some(record) if record.status != CampaignStatus::Purged => record,
            _ => return Err(CampaignStoreError::CampaignNotFound),
        };

        let mut events = Vec::new();
        let value = op(&mut record, &mut events)?;
        record.updated_at = Utc::now();
        record.metrics = metrics::compute(&record);
        self.storage.put(record)?;
        for (event, detail) in events {
            self.audit.append(id.clone(), event, detail);
        }
        Ok(value)
    }
}

fn ensure_active(record: &CampaignRecord) -> Result<(), CampaignStoreError> {
    if record.status.is_terminal() {
        return Err(CampaignStoreError::InvalidState {
            status: record.status,
        });
    }
    Ok(())
}

fn transition(record: &mut CampaignRecord, next: CampaignStatus) -> Result<(), CampaignStoreError> {
    if !record.status.can_transition(next) {
        return Err(CampaignStoreError::InvalidTransition {
            from: record.status,
            to: next,
        });
    }
    record.status = next;
    Ok(())
}

fn draft_mut<'a>(
    record: &'a mut CampaignRecord,
    candidate_id: &CandidateId,
    draft_index: usize,
) -> Result<&'a mut OutreachDraft, CampaignStoreError> {
    if !record.candidates.contains(candidate_id) {
        return Err(CampaignStoreError::CandidateNotFound(candidate_id.clone()));
    }
    let drafts = record
        .outreach_drafts
        .get_mut(candidate_id)
        .ok_or(CampaignStoreError::DraftIndexOutOfBounds { index: draft_index, len: 0 })?;
    let len = drafts.len();
    drafts
        .get_mut(draft_index)
        .ok_or(CampaignStoreError::DraftIndexOutOfBounds { index: draft_index, len })
}

/// Once every ranked candidate has a reviewed draft, the campaign leaves
/// `awaiting_review` on its own.
fn maybe_complete_review(
    record: &mut CampaignRecord,
    events: &mut Vec<(AuditEventType, Value)>,
    via: &str,
) {
    if record.status != CampaignStatus::AwaitingReview {
        return;
    }
    let all_reviewed = record.candidates.ranked().iter().all(|candidate| {
        record
            .outreach_drafts
            .get(&candidate.id)
            .map(|drafts| drafts.iter().any(|draft| draft.approved || draft.sent))
            .unwrap_or(false)
    });
    if all_reviewed {
        record.status = CampaignStatus::Completed;
        events.push((
            AuditEventType::StageCompleted,
            json!({ "stage": "review", "via": via }),
        ));
    }
}
