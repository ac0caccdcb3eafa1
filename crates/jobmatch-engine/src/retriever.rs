//! Candidate retriever: counts the filtered candidate set first, then
//! branches between the vector similarity path and the "few-results"
//! recency fallback, and clamps deep pagination.
//!
//! Per the pipeline's transaction-hygiene contract, the whole of one
//! request's count-then-fetch sequence runs inside a single read-only
//! transaction, bounded by [`TRANSACTION_TIMEOUT`], with the ANN recall
//! knobs (`ann.probes`/`ann.ef_search`) set as a transaction-local
//! setting that cannot leak onto the connection the pool later hands to
//! a different request. A transient failure re-acquires a fresh
//! connection and opens a new transaction rather than retrying inside a
//! transaction that may already be aborted.

use std::time::Duration;

use jobmatch_core::{CandidateRow, Config, MatchError, MatchRequest};
use jobmatch_db::{DbError, DbPool, queries, retry_transient};
use tracing::warn;

use crate::filter::{compile_filters, compile_filters_with_offset};

/// Candidate sets at or below this size skip vector ranking entirely:
/// min-max normalization over three or fewer items is numerically
/// meaningless and can amplify noise, so a flat "any match" fallback is
/// both simpler and safer.
const FEW_RESULTS_THRESHOLD: u64 = 5;

/// Upper bound on one request's read-only transaction. Exceeding it is
/// treated as a transient failure so the bounded retry policy re-opens a
/// fresh transaction rather than leaving a stalled one open.
const TRANSACTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of one retrieval pass.
///
/// Carries the page of candidates plus an optional total count, surfaced
/// to the caller only when the request asked for it — though the count
/// itself is always computed, since it decides which retrieval path runs.
pub struct RetrievalOutcome {
    pub candidates: Vec<CandidateRow>,
    pub total_count: Option<u64>,
}

/// Retrieve one page of candidates for `request`, excluding `blacklist`.
///
/// Offsets beyond `config.max_offset` reset to zero (not clamped to the
/// limit) with a logged warning — deep pagination is not supported;
/// callers are expected to refine filters instead. The candidate count
/// under the compiled filters is always computed first: at or below
/// [`FEW_RESULTS_THRESHOLD`] rows, or when the résumé carries no
/// embedding to rank against, retrieval falls back to recency ordering
/// instead of vector similarity.
///
/// # Errors
/// Returns [`MatchError::Validation`] if the request's location filter
/// carries an invalid radius, and the usual DB error taxonomy otherwise.
pub async fn retrieve(
    pool: &DbPool,
    config: &Config,
    request: &MatchRequest,
    blacklist: &[String],
    fetch_limit: u32,
) -> Result<RetrievalOutcome, MatchError> {
    let offset = if request.offset > config.max_offset {
        warn!(
            requested = request.offset,
            "offset beyond max_offset, resetting to 0"
        );
        0
    } else {
        request.offset
    };

    let base_filters = compile_filters(request.location.as_ref(), &request.keywords, &request.experience)?;
    let base_clause = base_filters.clauses_sql();
    let base_params = base_filters.params();

    let vector_filters = compile_filters_with_offset(
        request.location.as_ref(),
        &request.keywords,
        &request.experience,
        1,
    )?;
    let vector_clause = vector_filters.clauses_sql();
    let vector_params = vector_filters.params();

    let embedding = request.resume.embedding.clone();
    let limit = fetch_limit;

    let (count, candidates) = retry_transient("retrieve_candidates_transaction", || {
        with_transaction_timeout(async {
            let mut conn = pool.acquire().await?;
            let txn =
                queries::begin_ann_transaction(&mut conn, config.ann_probes, config.ann_ef_search).await?;

            let count = queries::count_filtered(&txn, &base_clause, &base_params, blacklist).await?;

            let candidates = if count <= FEW_RESULTS_THRESHOLD {
                queries::fetch_fallback_candidates(&txn, &base_clause, &base_params, blacklist, offset, limit)
                    .await?
            } else {
                match embedding.as_deref() {
                    Some(vector) => {
                        queries::fetch_vector_candidates(
                            &txn,
                            vector,
                            &vector_clause,
                            &vector_params,
                            blacklist,
                            offset,
                            limit,
                        )
                        .await?
                    }
                    None => {
                        queries::fetch_fallback_candidates(
                            &txn,
                            &base_clause,
                            &base_params,
                            blacklist,
                            offset,
                            limit,
                        )
                        .await?
                    }
                }
            };

            txn.commit().await?;
            Ok((count, candidates))
        })
    })
    .await
    .map_err(DbError::into_match_error)?;

    let total_count = request.flags.include_total_count.then_some(count);

    Ok(RetrievalOutcome { candidates, total_count })
}

async fn with_transaction_timeout<T, Fut>(fut: Fut) -> Result<T, DbError>
where
    Fut: std::future::Future<Output = Result<T, DbError>>,
{
    match tokio::time::timeout(TRANSACTION_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(DbError::Transient("read-only transaction exceeded its bounded timeout".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobmatch_core::{RequestFlags, Resume};

    fn sample_request(offset: u32) -> MatchRequest {
        MatchRequest {
            resume: Resume {
                resume_id: "r1".to_string(),
                user_id: None,
                embedding: None,
                skills: vec![],
                experience_level: None,
                city: None,
            },
            location: None,
            keywords: vec![],
            experience: vec![],
            offset,
            limit: 25,
            flags: RequestFlags::default(),
        }
    }

    #[test]
    fn offset_within_bound_is_unchanged() {
        let config = Config::from_env();
        let request = sample_request(10);
        assert!(request.offset <= config.max_offset);
    }

    #[test]
    fn clamp_resets_to_zero_not_to_max_offset() {
        let config = Config::from_env();
        let requested = config.max_offset + 500;
        let clamped = if requested > config.max_offset { 0 } else { requested };
        assert_eq!(clamped, 0);
    }

    #[test]
    fn few_results_threshold_is_five() {
        assert_eq!(FEW_RESULTS_THRESHOLD, 5);
    }

    #[test]
    fn transaction_timeout_is_bounded() {
        assert!(TRANSACTION_TIMEOUT <= Duration::from_secs(30));
    }
}
