//! Filter compiler, candidate retriever, calibrator, reranker, explainer,
//! and pipeline orchestrator for the job matching engine.
//!
//! This crate depends on both [`jobmatch_core`] (shared types/config/
//! errors) and [`jobmatch_db`] (the Postgres/Mongo data access layer),
//! and contains none of its own persistence — it shapes requests into
//! SQL, projects rows into externally visible matches, and orchestrates
//! the stages between them.

#![forbid(unsafe_code)]

pub mod calibrate;
pub mod explain;
pub mod filter;
pub mod fingerprint;
pub mod orchestrator;
pub mod rerank;
pub mod retriever;

pub use calibrate::{parse_skills, project_candidate, score_to_percentage};
pub use explain::explain;
pub use filter::{CompiledFilters, compile_filters, compile_filters_with_offset};
pub use fingerprint::fingerprint;
pub use orchestrator::Orchestrator;
pub use rerank::{CrossEncoder, LexicalOverlapEncoder, rerank};
pub use retriever::{RetrievalOutcome, retrieve};
