use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::domain::CampaignId;

/// Event kinds recorded in the audit ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    CampaignCreated,
    StageStarted,
    StageCompleted,
    StageFailed,
    RankingComputed,
    OutreachDrafted,
    OutreachApproved,
    OutreachSent,
    CampaignPurged,
}

impl AuditEventType {
    pub const fn label(self) -> &'static str {
        match self {
            AuditEventType::CampaignCreated => "campaign_created",
            AuditEventType::StageStarted => "stage_started",
            AuditEventType::StageCompleted => "stage_completed",
            AuditEventType::StageFailed => "stage_failed",
            AuditEventType::RankingComputed => "ranking_computed",
            AuditEventType::OutreachDrafted => "outreach_drafted",
            AuditEventType::OutreachApproved => "outreach_approved",
            AuditEventType::OutreachSent => "outreach_sent",
            AuditEventType::CampaignPurged => "campaign_purged",
        }
    }
}

/// Immutable record of one state-changing event.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub campaign_id: CampaignId,
    pub timestamp: DateTime<Utc>,
    pub event: AuditEventType,
    pub detail: Value,
}

/// Append-only ledger of campaign events. Entries are only ever removed by a
/// purge, which first writes the tombstone that survives it.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl AuditLog {
    pub fn append(&self, campaign_id: CampaignId, event: AuditEventType, detail: Value) {
        let entry = AuditEntry {
            campaign_id,
            timestamp: Utc::now(),
            event,
            detail,
        };
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    pub fn entries_for(&self, campaign_id: &CampaignId) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|entry| &entry.campaign_id == campaign_id)
            .cloned()
            .collect()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drop every entry belonging to the campaign, then record the tombstone.
    /// The tombstone is written inside the same critical section so no reader
    /// can observe a purged campaign without it.
    pub fn purge(&self, campaign_id: &CampaignId, detail: Value) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|entry| &entry.campaign_id != campaign_id);
        entries.push(AuditEntry {
            campaign_id: campaign_id.clone(),
            timestamp: Utc::now(),
            event: AuditEventType::CampaignPurged,
            detail,
        });
    }
}
