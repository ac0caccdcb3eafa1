//! Pipeline orchestrator: wires blacklist assembly, fingerprinting, the
//! result cache, candidate retrieval, calibration, and the optional
//! rerank/explain stages into one request/response cycle.
//!
//! Mirrors the legacy matcher's top-level `get_job_matches` flow: fetch
//! the blacklist first (it gates which rows even qualify), check the
//! cache before touching Postgres, retrieve, calibrate, then apply the
//! optional stages — each of which degrades softly rather than failing
//! the whole request.

use std::time::Duration;

use jobmatch_core::{BlacklistSet, Config, MatchError, MatchRequest, MatchResponse};
use jobmatch_db::{DbPool, ResultCache, SecondaryStore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::calibrate::project_candidate;
use crate::explain::explain;
use crate::fingerprint::fingerprint;
use crate::rerank::{CrossEncoder, LexicalOverlapEncoder, rerank};
use crate::retriever::retrieve;

/// Soft deadline for the optional rerank/explain stages. Exceeding it
/// skips the remaining optional work rather than blocking the response.
const OPTIONAL_STAGE_BUDGET: Duration = Duration::from_millis(750);

/// Ties the data access layer, cache, and engine stages together behind
/// one entry point.
pub struct Orchestrator {
    pool: DbPool,
    secondary: SecondaryStore,
    cache: ResultCache,
    config: Config,
    encoder: Box<dyn CrossEncoder>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(pool: DbPool, secondary: SecondaryStore, config: Config) -> Self {
        let cache = ResultCache::new(
            Duration::from_secs(config.cache_ttl_seconds),
            config.cache_soft_cap,
        );
        Self {
            pool,
            secondary,
            cache,
            config,
            encoder: Box::new(LexicalOverlapEncoder),
        }
    }

    /// Run the full match pipeline for one request.
    pub async fn handle(
        &self,
        request: MatchRequest,
        cancellation: &CancellationToken,
    ) -> Result<MatchResponse, MatchError> {
        if cancellation.is_cancelled() {
            return Err(MatchError::Cancelled);
        }

        let expected_dimension = self.config.embedding_dimension;
        if request.resume.embedding.as_ref().is_none_or(|e| e.len() != expected_dimension) {
            debug!(
                resume_id = %request.resume.resume_id,
                expected_dimension,
                "resume carries no embedding of the expected dimension; returning an empty result"
            );
            return Ok(MatchResponse { jobs: Vec::new(), total_count: None });
        }

        let blacklist = self.fetch_blacklist(&request).await?;
        let key = fingerprint(&request, &blacklist);

        if request.flags.use_cache && let Some(cached) = self.cache.get(&key) {
            debug!(fingerprint = %key, "result cache hit");
            return Ok(cached);
        }

        if cancellation.is_cancelled() {
            return Err(MatchError::Cancelled);
        }

        let rerank_enabled = request.flags.enable_rerank && self.config.enable_rerank;
        let fetch_limit = if rerank_enabled {
            request.limit.max(u32::try_from(self.config.top_k_retrieve).unwrap_or(u32::MAX))
        } else {
            request.limit
        };

        let union = blacklist.union();
        let outcome = retrieve(&self.pool, &self.config, &request, &union, fetch_limit).await?;
        let total_count = outcome.total_count;

        let mut jobs: Vec<_> = outcome.candidates.into_iter().filter_map(project_candidate).collect();

        if rerank_enabled && jobs.len() > self.config.top_k_final {
            if cancellation.is_cancelled() {
                warn!("skipping rerank stage: request cancelled");
            } else {
                let started = tokio::time::Instant::now();
                jobs = rerank(
                    self.encoder.as_ref(),
                    &request.resume,
                    jobs,
                    self.config.rerank_weight_cross,
                    self.config.rerank_weight_retrieve,
                );
                jobs.truncate(self.config.top_k_final);
                let elapsed = started.elapsed();
                if elapsed > OPTIONAL_STAGE_BUDGET {
                    warn!(elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX), "rerank stage exceeded its soft deadline");
                }
            }
        }

        jobs.truncate(request.limit as usize);

        Ok(self.finish(&request, &blacklist, key, jobs, total_count, cancellation))
    }

    fn finish(
        &self,
        request: &MatchRequest,
        blacklist: &BlacklistSet,
        key: String,
        mut jobs: Vec<jobmatch_core::JobMatch>,
        total_count: Option<u64>,
        cancellation: &CancellationToken,
    ) -> MatchResponse {
        if request.flags.enable_explain && self.config.enable_explain && !cancellation.is_cancelled() {
            for job in &mut jobs {
                let explanation = explain(&request.resume, job, self.config.enable_skill_graph);
                debug!(job_id = %job.id, overall = ?explanation.overall, "match explanation computed");
                job.explanation = Some(explanation);
            }
        }

        let response = MatchResponse { jobs, total_count };

        if request.flags.use_cache {
            self.cache.insert(key, response.clone());
        }

        if request.flags.save {
            debug!(
                user_id = ?request.resume.user_id,
                blacklist_size = blacklist.union().len(),
                "save flag set; no persistence sink configured for saved searches"
            );
        }

        response
    }

    async fn fetch_blacklist(&self, request: &MatchRequest) -> Result<BlacklistSet, MatchError> {
        let Some(user_id) = request.resume.user_id.as_deref() else {
            return Ok(BlacklistSet::default());
        };
        self.secondary
            .fetch_blacklist(user_id)
            .await
            .map_err(jobmatch_db::DbError::into_match_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobmatch_core::{RequestFlags, Resume};

    #[test]
    fn optional_stage_budget_is_sub_second() {
        assert!(OPTIONAL_STAGE_BUDGET < Duration::from_secs(1));
    }

    async fn orchestrator() -> Orchestrator {
        let config = Config::from_env();
        let pool = DbPool::new(&config).expect("pool config should parse without connecting");
        // `mongodb::Client::with_uri_str` parses the URI and spawns its
        // monitoring tasks but does not block on an actual handshake, so
        // this succeeds without a running MongoDB instance.
        let secondary = SecondaryStore::connect(&config.mongodb_url, &config.mongodb_database)
            .await
            .expect("client construction should not require a live connection");
        Orchestrator::new(pool, secondary, config)
    }

    fn request_with_embedding(embedding: Option<Vec<f32>>) -> MatchRequest {
        MatchRequest {
            resume: Resume {
                resume_id: "r1".to_string(),
                user_id: None,
                embedding,
                skills: vec![],
                experience_level: None,
                city: None,
            },
            location: None,
            keywords: vec![],
            experience: vec![],
            offset: 0,
            limit: 25,
            flags: RequestFlags::default(),
        }
    }

    #[tokio::test]
    async fn missing_embedding_short_circuits_to_an_empty_response_not_an_error() {
        let orchestrator = orchestrator().await;
        let request = request_with_embedding(None);
        let token = CancellationToken::new();
        let response = orchestrator.handle(request, &token).await.expect("should not error");
        assert!(response.jobs.is_empty());
        assert_eq!(response.total_count, None);
    }

    #[tokio::test]
    async fn wrong_dimension_embedding_short_circuits_to_an_empty_response() {
        let orchestrator = orchestrator().await;
        let request = request_with_embedding(Some(vec![0.1; 3]));
        let token = CancellationToken::new();
        let response = orchestrator.handle(request, &token).await.expect("should not error");
        assert!(response.jobs.is_empty());
    }

    #[tokio::test]
    async fn cancellation_before_any_work_is_reported_as_cancelled() {
        let orchestrator = orchestrator().await;
        let config = Config::from_env();
        let request = request_with_embedding(Some(vec![0.1; config.embedding_dimension]));
        let token = CancellationToken::new();
        token.cancel();
        let result = orchestrator.handle(request, &token).await;
        assert!(matches!(result, Err(MatchError::Cancelled)));
    }
}
