//! Core types, configuration, and error taxonomy for the job matching
//! pipeline.
//!
//! This crate provides:
//! - Configuration management (`Config`, environment parsing)
//! - Domain types (`JobMatch`, `CandidateRow`, filters, request/response)
//! - The shared error taxonomy used across the retrieval/calibration/
//!   rerank/explain stages

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{DowngradeSignal, MatchError, MatchResult};
pub use types::{
    BlacklistSet, CandidateRow, CompanyRecord, Embedding, ExperienceLevel, ExperienceMatchExplanation,
    JobMatch, JobState, KeywordFilter, LocationFilter, LocationMatchExplanation, LocationRecord,
    MatchExplanation, MatchRequest, MatchResponse, MatchStrength, Radius, RequestFlags, Resume,
    SkillMatchExplanation,
};
