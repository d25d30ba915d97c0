use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::workflows::campaign::domain::{CampaignStatus, CandidateId, CandidateProfile, Evaluation};
use crate::workflows::campaign::pipeline::{
    CandidateEvaluator, CandidateSourcer, OutreachDrafter, PipelineConfig, PipelineOrchestrator,
    PipelineStage, StageError,
};
use crate::workflows::campaign::registry::RankingPolicy;
use crate::workflows::campaign::store::{CampaignStore, EvaluationUpdate};
use crate::workflows::campaign::CampaignId;

pub(super) fn profile(name: &str, role: &str) -> CandidateProfile {
    CandidateProfile {
        name: name.to_string(),
        role: role.to_string(),
        profile_url: format!(
            "https://talent.example.com/{}",
            name.to_lowercase().replace(' ', "-")
        ),
        summary: format!("{name} has shipped production {role} work."),
        tags: Vec::new(),
        data_sources: vec!["GitHub".to_string()],
    }
}

pub(super) fn evaluation(score: f32, bias_flag: bool, data_deficient: bool) -> Evaluation {
    Evaluation {
        score,
        rationale: "matches the brief".to_string(),
        bias_flag,
        data_deficient_flag: data_deficient,
    }
}

/// Sourcer returning a scripted profile slate, optionally after a delay or as
/// a failure.
pub(super) struct ScriptedSourcer {
    pub profiles: Vec<CandidateProfile>,
    pub delay: Option<Duration>,
    pub fail: bool,
}

impl ScriptedSourcer {
    pub fn with_profiles(profiles: Vec<CandidateProfile>) -> Self {
        Self {
            profiles,
            delay: None,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            profiles: Vec::new(),
            delay: None,
            fail: true,
        }
    }
}

#[async_trait]
impl CandidateSourcer for ScriptedSourcer {
    async fn find_candidates(
        &self,
        _job_description: &str,
    ) -> Result<Vec<CandidateProfile>, StageError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(StageError("search backend exhausted".to_string()));
        }
        Ok(self.profiles.clone())
    }
}

/// Evaluator scripted per candidate name.
#[derive(Default)]
pub(super) struct ScriptedEvaluator {
    pub scores: HashMap<String, f32>,
    pub biased: HashSet<String>,
    pub fail_for: HashSet<String>,
}

impl ScriptedEvaluator {
    pub fn with_scores(scores: &[(&str, f32)]) -> Self {
        Self {
            scores: scores
                .iter()
                .map(|(name, score)| (name.to_string(), *score))
                .collect(),
            ..Self::default()
        }
    }

    pub fn biased(mut self, name: &str) -> Self {
        self.biased.insert(name.to_string());
        self
    }

    pub fn failing_for(mut self, name: &str) -> Self {
        self.fail_for.insert(name.to_string());
        self
    }
}

#[async_trait]
impl CandidateEvaluator for ScriptedEvaluator {
    async fn evaluate(
        &self,
        _job_description: &str,
        profile: &CandidateProfile,
    ) -> Result<Evaluation, StageError> {
        if self.fail_for.contains(&profile.name) {
            return Err(StageError(format!("no signal for {}", profile.name)));
        }
        let score = self.scores.get(&profile.name).copied().unwrap_or(0.5);
        Ok(evaluation(score, self.biased.contains(&profile.name), false))
    }
}

/// Drafter emitting a fixed number of template variants.
pub(super) struct ScriptedDrafter {
    pub variants: usize,
    pub fail: bool,
}

impl Default for ScriptedDrafter {
    fn default() -> Self {
        Self {
            variants: 2,
            fail: false,
        }
    }
}

#[async_trait]
impl OutreachDrafter for ScriptedDrafter {
    async fn draft(
        &self,
        profile: &CandidateProfile,
        rationale: &str,
    ) -> Result<Vec<String>, StageError> {
        if self.fail {
            return Err(StageError("drafting model unavailable".to_string()));
        }
        Ok((0..self.variants)
            .map(|variant| {
                format!(
                    "Hi {}, variant {variant}: {rationale} Reach me at recruiter@example.com",
                    profile.name
                )
            })
            .collect())
    }
}

pub(super) fn orchestrator(
    sourcer: ScriptedSourcer,
    evaluator: ScriptedEvaluator,
    drafter: ScriptedDrafter,
    config: PipelineConfig,
) -> Arc<PipelineOrchestrator<ScriptedSourcer, ScriptedEvaluator, ScriptedDrafter>> {
    Arc::new(PipelineOrchestrator::new(
        Arc::new(CampaignStore::in_memory()),
        Arc::new(sourcer),
        Arc::new(evaluator),
        Arc::new(drafter),
        config,
    ))
}

pub(super) fn shortlist(size: usize) -> PipelineConfig {
    PipelineConfig {
        ranking: RankingPolicy {
            shortlist_size: size,
            rank_flagged: false,
        },
        ..PipelineConfig::default()
    }
}

/// Drive a campaign to `awaiting_review` through the store operations alone,
/// with two ranked candidates out of three.
pub(super) fn staged_campaign(store: &CampaignStore) -> (CampaignId, Vec<CandidateId>) {
    let id = store.create("Senior Backend Engineer").expect("created");
    store
        .begin_stage(&id, PipelineStage::Sourcing)
        .expect("sourcing begins");
    let candidate_ids = store
        .update_candidates(
            &id,
            vec![
                profile("Ada", "Backend Engineer"),
                profile("Brin", "Platform Engineer"),
                profile("Cleo", "SRE"),
            ],
        )
        .expect("candidates stored");
    store
        .complete_stage(
            &id,
            PipelineStage::Sourcing,
            CampaignStatus::Evaluating,
            json!({}),
        )
        .expect("sourcing completes");
    store
        .record_evaluations(
            &id,
            vec![
                EvaluationUpdate::Scored(candidate_ids[0].clone(), evaluation(0.9, false, false)),
                EvaluationUpdate::Scored(candidate_ids[1].clone(), evaluation(0.8, false, false)),
                EvaluationUpdate::Scored(candidate_ids[2].clone(), evaluation(0.5, false, false)),
            ],
        )
        .expect("evaluations stored");
    store
        .complete_stage(
            &id,
            PipelineStage::Evaluating,
            CampaignStatus::Ranking,
            json!({}),
        )
        .expect("evaluating completes");
    let ranked = store
        .apply_ranking(
            &id,
            &RankingPolicy {
                shortlist_size: 2,
                rank_flagged: false,
            },
        )
        .expect("ranking applied");
    store
        .complete_stage(
            &id,
            PipelineStage::Ranking,
            CampaignStatus::Drafting,
            json!({}),
        )
        .expect("ranking completes");
    for candidate_id in &ranked {
        store
            .record_outreach_drafts(
                &id,
                candidate_id,
                vec![format!("Hi {candidate_id}, let's talk.")],
            )
            .expect("drafts stored");
    }
    store
        .complete_stage(
            &id,
            PipelineStage::Drafting,
            CampaignStatus::AwaitingReview,
            json!({}),
        )
        .expect("drafting completes");
    (id, ranked)
}
