use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::CampaignRecord;

/// Derived campaign statistics. Always recomputed from candidate and draft
/// state; never incremented independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignMetrics {
    pub candidate_count: usize,
    pub evaluated_count: usize,
    pub ranked_count: usize,
    pub bias_flag_rate: f32,
    pub data_deficient_rate: f32,
    pub draft_count: usize,
    pub sent_count: usize,
    pub selection_rationale: String,
    pub generated_at: DateTime<Utc>,
}

impl CampaignMetrics {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            candidate_count: 0,
            evaluated_count: 0,
            ranked_count: 0,
            bias_flag_rate: 0.0,
            data_deficient_rate: 0.0,
            draft_count: 0,
            sent_count: 0,
            selection_rationale: "Pending".to_string(),
            generated_at: now,
        }
    }
}

/// Pure snapshot computation over the record's current candidate and draft
/// state.
pub fn compute(record: &CampaignRecord) -> CampaignMetrics {
    let candidates = record.candidates.records();
    let candidate_count = candidates.len();
    let evaluated_count = candidates
        .iter()
        .filter(|candidate| candidate.evaluation.is_some())
        .count();
    let ranked_count = candidates
        .iter()
        .filter(|candidate| candidate.rank.is_some())
        .count();
    let bias_flagged = candidates
        .iter()
        .filter(|candidate| candidate.bias_flagged())
        .count();
    let data_deficient = candidates
        .iter()
        .filter(|candidate| candidate.data_deficient)
        .count();

    let rate = |count: usize| {
        if candidate_count == 0 {
            0.0
        } else {
            count as f32 / candidate_count as f32
        }
    };

    let draft_count = record.outreach_drafts.values().map(Vec::len).sum();
    let sent_count = record
        .outreach_drafts
        .values()
        .flatten()
        .filter(|draft| draft.sent)
        .count();

    let selection_rationale = candidates
        .iter()
        .find(|candidate| candidate.rank == Some(1))
        .map(|top| format!("Top candidate: {} ({})", top.profile.name, top.profile.role))
        .unwrap_or_else(|| "Pending".to_string());

    CampaignMetrics {
        candidate_count,
        evaluated_count,
        ranked_count,
        bias_flag_rate: rate(bias_flagged),
        data_deficient_rate: rate(data_deficient),
        draft_count,
        sent_count,
        selection_rationale,
        generated_at: Utc::now(),
    }
}
