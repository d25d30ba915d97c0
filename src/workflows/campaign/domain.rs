use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metrics::CampaignMetrics;
use super::registry::CandidateRegistry;

/// Identifier wrapper for stored campaigns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CampaignId(pub String);

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for sourced candidates. Ordered so registries and
/// tie-breaks are deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub String);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Finite states a campaign moves through. Progress along the pipeline is
/// monotonic; `Failed` is reachable from any non-terminal state and `Purged`
/// from any state at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Pending,
    Sourcing,
    Evaluating,
    Ranking,
    Drafting,
    AwaitingReview,
    Completed,
    Failed,
    Purged,
}

impl CampaignStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CampaignStatus::Pending => "pending",
            CampaignStatus::Sourcing => "sourcing",
            CampaignStatus::Evaluating => "evaluating",
            CampaignStatus::Ranking => "ranking",
            CampaignStatus::Drafting => "drafting",
            CampaignStatus::AwaitingReview => "awaiting_review",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Failed => "failed",
            CampaignStatus::Purged => "purged",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            CampaignStatus::Completed | CampaignStatus::Failed | CampaignStatus::Purged
        )
    }

    /// Transition table for the campaign state machine.
    pub fn can_transition(self, next: CampaignStatus) -> bool {
        use CampaignStatus::*;
        match (self, next) {
            (_, Purged) => true,
            (from, Failed) => !from.is_terminal(),
            (Pending, Sourcing)
            | (Sourcing, Evaluating)
            | (Evaluating, Ranking)
            | (Ranking, Drafting)
            | (Drafting, AwaitingReview)
            | (AwaitingReview, Completed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Profile attributes discovered by the sourcing collaborator. Immutable once
/// a candidate has been absorbed into a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub name: String,
    pub role: String,
    pub profile_url: String,
    pub summary: String,
    pub tags: Vec<String>,
    pub data_sources: Vec<String>,
}

/// Structured output of the evaluation collaborator for one candidate.
/// Written once; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: f32,
    pub rationale: String,
    pub bias_flag: bool,
    pub data_deficient_flag: bool,
}

/// Per-candidate state owned by exactly one campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: CandidateId,
    pub profile: CandidateProfile,
    /// Absent until the evaluation stage ran for this candidate; stays absent
    /// when the per-candidate evaluation call failed.
    pub evaluation: Option<Evaluation>,
    /// Set by the evaluator, or by the orchestrator when the per-candidate
    /// evaluation call failed. Data-deficient candidates are never ranked.
    pub data_deficient: bool,
    /// Assigned by the ranking stage; unique among ranked candidates.
    pub rank: Option<u32>,
}

impl CandidateRecord {
    pub fn bias_flagged(&self) -> bool {
        self.evaluation
            .as_ref()
            .map(|evaluation| evaluation.bias_flag)
            .unwrap_or(false)
    }

    pub fn score(&self) -> Option<f32> {
        self.evaluation.as_ref().map(|evaluation| evaluation.score)
    }
}

/// One redacted outreach variant awaiting human review. The bias flag of the
/// candidate is carried along so it stays visible in every downstream artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutreachDraft {
    pub body: String,
    pub bias_flagged: bool,
    pub approved: bool,
    pub sent: bool,
}

/// Aggregate record for a stored campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignRecord {
    pub id: CampaignId,
    /// Provided at creation; emptied by purge, otherwise immutable.
    pub job_description: String,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub candidates: CandidateRegistry,
    pub metrics: CampaignMetrics,
    pub outreach_drafts: BTreeMap<CandidateId, Vec<OutreachDraft>>,
}

impl CampaignRecord {
    pub fn new(id: CampaignId, job_description: String, now: DateTime<Utc>) -> Self {
        let mut record = Self {
            id,
            job_description,
            status: CampaignStatus::Pending,
            created_at: now,
            updated_at: now,
            candidates: CandidateRegistry::default(),
            metrics: CampaignMetrics::empty(now),
            outreach_drafts: BTreeMap::new(),
        };
        record.metrics = super::metrics::compute(&record);
        record
    }

    pub fn summary(&self) -> CampaignSummary {
        CampaignSummary {
            campaign_id: self.id.clone(),
            status: self.status.label(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            candidate_count: self.candidates.len(),
        }
    }

    pub fn view(&self) -> CampaignView {
        CampaignView {
            campaign_id: self.id.clone(),
            status: self.status.label(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            job_description: self.job_description.clone(),
            candidates: self.candidates.records(),
            metrics: self.metrics.clone(),
            outreach_drafts: self.outreach_drafts.clone(),
        }
    }
}

/// Compact listing entry for dashboards.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignSummary {
    pub campaign_id: CampaignId,
    pub status: &'static str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub candidate_count: usize,
}

/// Full read model exposed to API consumers.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignView {
    pub campaign_id: CampaignId,
    pub status: &'static str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub job_description: String,
    pub candidates: Vec<CandidateRecord>,
    pub metrics: CampaignMetrics,
    pub outreach_drafts: BTreeMap<CandidateId, Vec<OutreachDraft>>,
}
