use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{CandidateId, CandidateProfile, CandidateRecord, Evaluation};

/// Knobs governing how evaluated candidates are shortlisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankingPolicy {
    /// How many candidates receive a rank.
    pub shortlist_size: usize,
    /// Whether bias-flagged candidates may be ranked at all. They stay
    /// visibly flagged in every downstream artifact either way.
    pub rank_flagged: bool,
}

impl Default for RankingPolicy {
    fn default() -> Self {
        Self {
            shortlist_size: 3,
            rank_flagged: false,
        }
    }
}

/// Error enumeration for registry writes.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("candidate {0} is not part of this campaign")]
    UnknownCandidate(CandidateId),
    #[error("evaluation already recorded for candidate {0}")]
    EvaluationAlreadyRecorded(CandidateId),
}

/// Per-campaign mapping of candidate identity to sourced, evaluated, and
/// ranked state. Ordered by candidate id so iteration and tie-breaks are
/// reproducible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateRegistry {
    candidates: BTreeMap<CandidateId, CandidateRecord>,
}

impl CandidateRegistry {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn get(&self, id: &CandidateId) -> Option<&CandidateRecord> {
        self.candidates.get(id)
    }

    pub fn contains(&self, id: &CandidateId) -> bool {
        self.candidates.contains_key(id)
    }

    /// Snapshot of every candidate record in id order.
    pub fn records(&self) -> Vec<CandidateRecord> {
        self.candidates.values().cloned().collect()
    }

    /// Merge sourced profiles into the registry, deriving a stable candidate
    /// id from the profile name. Returns the ids in insertion order.
    pub fn absorb_profiles(&mut self, profiles: Vec<CandidateProfile>) -> Vec<CandidateId> {
        let mut absorbed = Vec::with_capacity(profiles.len());
        for profile in profiles {
            let id = self.allocate_id(&profile.name);
            self.candidates.insert(
                id.clone(),
                CandidateRecord {
                    id: id.clone(),
                    profile,
                    evaluation: None,
                    data_deficient: false,
                    rank: None,
                },
            );
            absorbed.push(id);
        }
        absorbed
    }

    /// Record the evaluator's outcome for one candidate. Evaluations are
    /// write-once.
    pub fn record_evaluation(
        &mut self,
        id: &CandidateId,
        evaluation: Evaluation,
    ) -> Result<(), RegistryError> {
        let record = self
            .candidates
            .get_mut(id)
            .ok_or_else(|| RegistryError::UnknownCandidate(id.clone()))?;
        if record.evaluation.is_some() {
            return Err(RegistryError::EvaluationAlreadyRecorded(id.clone()));
        }
        record.data_deficient = record.data_deficient || evaluation.data_deficient_flag;
        record.evaluation = Some(evaluation);
        Ok(())
    }

    /// Mark a candidate whose evaluation call failed; the candidate stays in
    /// the campaign but is excluded from ranking.
    pub fn mark_data_deficient(&mut self, id: &CandidateId) -> Result<(), RegistryError> {
        let record = self
            .candidates
            .get_mut(id)
            .ok_or_else(|| RegistryError::UnknownCandidate(id.clone()))?;
        record.data_deficient = true;
        Ok(())
    }

    /// Recompute ranks for the current evaluated set. Idempotent: any prior
    /// rank assignment is cleared first, and ordering is fully determined by
    /// score (descending) with candidate id (ascending) as tie-break.
    pub fn apply_ranking(&mut self, policy: &RankingPolicy) -> Vec<CandidateId> {
        for record in self.candidates.values_mut() {
            record.rank = None;
        }

        let mut eligible: Vec<(CandidateId, f32)> = self
            .candidates
            .values()
            .filter(|record| {
                record.evaluation.is_some()
                    && !record.data_deficient
                    && (policy.rank_flagged || !record.bias_flagged())
            })
            .filter_map(|record| record.score().map(|score| (record.id.clone(), score)))
            .collect();

        eligible.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        let mut ranked = Vec::new();
        for (position, (id, _)) in eligible.into_iter().take(policy.shortlist_size).enumerate() {
            if let Some(record) = self.candidates.get_mut(&id) {
                record.rank = Some(position as u32 + 1);
                ranked.push(id);
            }
        }
        ranked
    }

    /// Candidates that received a rank, in rank order.
    pub fn ranked(&self) -> Vec<CandidateRecord> {
        let mut ranked: Vec<CandidateRecord> = self
            .candidates
            .values()
            .filter(|record| record.rank.is_some())
            .cloned()
            .collect();
        ranked.sort_by_key(|record| record.rank.unwrap_or(u32::MAX));
        ranked
    }

    fn allocate_id(&self, name: &str) -> CandidateId {
        let slug = slugify(name);
        let mut candidate = CandidateId(format!("can-{slug}"));
        let mut suffix = 2;
        while self.candidates.contains_key(&candidate) {
            candidate = CandidateId(format!("can-{slug}-{suffix}"));
            suffix += 1;
        }
        candidate
    }
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("candidate");
    }
    slug
}
