//! Campaign orchestration core for agentic recruiting funnels.
//!
//! The crate drives a job description through sourcing, evaluation, ranking,
//! and outreach drafting, keeps every intermediate artifact reviewable, and
//! records an audit trail that outlives even a compliance purge.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
