//! Deterministic stand-in collaborators for local demos and smoke checks.
//!
//! These implement the stage interfaces against a built-in candidate pool so
//! the whole pipeline can run without any external search or LLM calls.

use async_trait::async_trait;

use super::domain::{CandidateProfile, Evaluation};
use super::pipeline::{CandidateEvaluator, CandidateSourcer, OutreachDrafter, StageError};

const DATA_DEFICIENT_TAG: &str = "Data Deficient";
const MANUAL_REVIEW_TAG: &str = "Manual Review Required";

/// Sourcer backed by a fixed candidate pool.
pub struct ProfilePoolSourcer {
    pool: Vec<CandidateProfile>,
    limit: usize,
}

impl ProfilePoolSourcer {
    pub fn new(pool: Vec<CandidateProfile>, limit: usize) -> Self {
        Self { pool, limit }
    }
}

impl Default for ProfilePoolSourcer {
    fn default() -> Self {
        Self::new(sample_pool(), 4)
    }
}

#[async_trait]
impl CandidateSourcer for ProfilePoolSourcer {
    async fn find_candidates(
        &self,
        _job_description: &str,
    ) -> Result<Vec<CandidateProfile>, StageError> {
        Ok(self.pool.iter().take(self.limit).cloned().collect())
    }
}

/// Heuristic evaluator that scores on profile signal and derives flags from
/// the sourcing tags.
#[derive(Debug, Clone)]
pub struct HeuristicEvaluator {
    pub bias_threshold: f32,
}

impl Default for HeuristicEvaluator {
    fn default() -> Self {
        Self {
            bias_threshold: 0.65,
        }
    }
}

#[async_trait]
impl CandidateEvaluator for HeuristicEvaluator {
    async fn evaluate(
        &self,
        job_description: &str,
        profile: &CandidateProfile,
    ) -> Result<Evaluation, StageError> {
        let signal = 0.4
            + 0.1 * profile.data_sources.len() as f32
            + (profile.summary.len() as f32 / 400.0).min(0.2);
        let content_bonus = (job_description.len() as f32 / 4000.0).min(0.1);
        let score = (signal + content_bonus).min(0.95);

        let data_deficient = profile.tags.iter().any(|tag| tag == DATA_DEFICIENT_TAG);
        let bias_flag = score < self.bias_threshold
            || profile.tags.iter().any(|tag| tag == MANUAL_REVIEW_TAG);

        Ok(Evaluation {
            score,
            rationale: format!(
                "{} shows a {} signal that aligns with the brief.",
                profile.name, profile.role
            ),
            bias_flag,
            data_deficient_flag: data_deficient,
        })
    }
}

/// Drafter that expands a fixed outreach template per candidate.
#[derive(Debug, Clone)]
pub struct TemplateDrafter {
    pub call_to_action: String,
    pub compliance_note: String,
}

impl Default for TemplateDrafter {
    fn default() -> Self {
        Self {
            call_to_action: "Let's schedule a time to chat".to_string(),
            compliance_note:
                "Processed for recruitment only; transparent opt-out included.".to_string(),
        }
    }
}

#[async_trait]
impl OutreachDrafter for TemplateDrafter {
    async fn draft(
        &self,
        profile: &CandidateProfile,
        rationale: &str,
    ) -> Result<Vec<String>, StageError> {
        let formal = format!(
            "Hi {},\n\nI saw your work as a {} and was impressed: {}\n{}\n{}.\n\nBest,\nTalent Team",
            profile.name,
            profile.role,
            rationale.to_lowercase(),
            self.compliance_note,
            self.call_to_action,
        );
        let brief = format!(
            "Hi {} - your {} background stood out. {}?",
            profile.name, profile.role, self.call_to_action
        );
        Ok(vec![formal, brief])
    }
}

fn sample_pool() -> Vec<CandidateProfile> {
    vec![
        CandidateProfile {
            name: "Alex Dev".to_string(),
            role: "Backend Engineer".to_string(),
            profile_url: "https://talent.example.com/alex-dev".to_string(),
            summary: "Maintains a handful of sparse repositories.".to_string(),
            tags: vec![DATA_DEFICIENT_TAG.to_string(), MANUAL_REVIEW_TAG.to_string()],
            data_sources: vec!["Serper.dev".to_string(), "GitHub".to_string()],
        },
        CandidateProfile {
            name: "Marina Byte".to_string(),
            role: "Full Stack Engineer".to_string(),
            profile_url: "https://talent.example.com/marina-byte".to_string(),
            summary: "Ships end-to-end features with a strong public portfolio and consistent open source activity across several ecosystems.".to_string(),
            tags: vec!["High Confidence".to_string()],
            data_sources: vec!["Serper.dev".to_string(), "Portfolio".to_string(), "GitHub".to_string()],
        },
        CandidateProfile {
            name: "Kai Ops".to_string(),
            role: "DevOps Engineer".to_string(),
            profile_url: "https://talent.example.com/kai-ops".to_string(),
            summary: "Automates infrastructure with popular tooling contributions.".to_string(),
            tags: vec![MANUAL_REVIEW_TAG.to_string()],
            data_sources: vec!["GitHub".to_string(), "Browserless.io".to_string()],
        },
        CandidateProfile {
            name: "Nia Vector".to_string(),
            role: "Platform Architect".to_string(),
            profile_url: "https://talent.example.com/nia-vector".to_string(),
            summary: "Leads platform rebuilds and mentors infrastructure teams across organizations.".to_string(),
            tags: vec!["Leadership Potential".to_string()],
            data_sources: vec!["LinkedIn".to_string(), "Public Portfolio".to_string(), "Talks".to_string()],
        },
    ]
}
