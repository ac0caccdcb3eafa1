//! Data access layer for the job matching pipeline.
//!
//! This crate provides:
//! - Postgres connection pooling (`pool`)
//! - Bounded retry for transient driver errors (`retry`)
//! - Candidate retrieval queries, including the vector similarity query
//!   with single-pass min-max normalization (`queries`)
//! - The fingerprint-keyed result cache (`cache`)
//! - The secondary document store used for blacklist assembly (`secondary`)
//!
//! The filter compiler that produces the parameterized `WHERE` clauses
//! these queries splice in lives in `jobmatch-engine::filter`, one layer
//! up, since it is pure request-shaping logic with no database handle.

#![forbid(unsafe_code)]

pub mod cache;
pub mod error;
pub mod pool;
pub mod queries;
pub mod retry;
pub mod secondary;

pub use cache::{CacheMetrics, ResultCache};
pub use error::{DbError, DbResult, is_transient_message};
pub use pool::{DbPool, PoolStatus, PooledConnection};
pub use retry::{MAX_BACKOFF, MAX_RETRIES, retry_transient};
pub use secondary::SecondaryStore;
