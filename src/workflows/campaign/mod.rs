//! Recruiting campaign orchestration and storage.
//!
//! A campaign runs a fixed reasoning sequence (sourcing, evaluation, ranking,
//! outreach drafting) against one job description. The store owns all state
//! and its audit trail; the orchestrator owns stage sequencing and the
//! collaborator boundaries; everything a human reviews comes out of the read
//! operations here.

pub mod audit;
pub mod demo;
pub mod domain;
pub mod metrics;
pub mod pipeline;
pub(crate) mod redaction;
pub mod registry;
pub mod storage;
pub mod store;

pub mod router;

#[cfg(test)]
mod tests;

pub use audit::{AuditEntry, AuditEventType, AuditLog};
pub use domain::{
    CampaignId, CampaignRecord, CampaignStatus, CampaignSummary, CampaignView, CandidateId,
    CandidateProfile, CandidateRecord, Evaluation, OutreachDraft,
};
pub use metrics::CampaignMetrics;
pub use pipeline::{
    CandidateEvaluator, CandidateSourcer, OutreachDrafter, PipelineConfig, PipelineError,
    PipelineOrchestrator, PipelineStage, StageError,
};
pub use registry::{CandidateRegistry, RankingPolicy, RegistryError};
pub use router::campaign_router;
pub use storage::{CampaignStorage, InMemoryCampaignStorage, StorageError};
pub use store::{CampaignStore, CampaignStoreError, EvaluationUpdate};
