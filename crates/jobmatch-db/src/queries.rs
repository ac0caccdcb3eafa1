//! SQL query construction and execution for the candidate retriever.
//!
//! The vector similarity query is the one place the legacy Python matcher
//! (`app/utils/db_utils.py::execute_vector_similarity_query`) triples the
//! `WHERE` clause and its parameters inside three separate `MAX(...) OVER
//! (...)` subqueries to normalize each metric. Postgres window functions
//! compute `MIN(...) OVER ()`/`MAX(...) OVER ()` once per result set when
//! written as a single pass over the already-filtered rows, so this
//! module binds the filter parameters exactly once and lets Postgres
//! reuse the window frame across all three metrics.
//!
//! The `WHERE`-clause text and its parameters are supplied pre-compiled
//! by the caller (`jobmatch-engine::filter`); this module only knows how
//! to splice them into the three query shapes and bind the parameters
//! that follow (blacklist exclusion, offset, limit).
//!
//! Every query function is generic over [`GenericClient`] so it can run
//! either directly on a pooled connection or inside the read-only
//! transaction `retrieve_in_transaction` opens for ANN recall tuning.

use deadpool_postgres::GenericClient;
use jobmatch_core::{CandidateRow, CompanyRecord, LocationRecord};
use pgvector::Vector;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

use crate::error::DbError;
use crate::pool::PooledConnection;

const BASE_JOIN: &str = "
    FROM jobs j
    JOIN companies c ON c.company_id = j.company_id
    JOIN locations l ON l.location_id = j.location_id
    JOIN countries co ON co.country_id = l.country_id
    WHERE TRUE
";

/// Composite-score ordering convention: ascending, since every metric this
/// module blends (L2, cosine, negated inner product) is a *distance* —
/// smaller is better, matching `calibrate::score_to_percentage`'s
/// low-score-is-good input contract.
const COMPOSITE_ORDER: &str = "composite_score ASC";

/// Open a read-only transaction on `conn` and set the ANN recall knobs
/// (`ivfflat.probes`, `hnsw.ef_search`) for its lifetime only — `SET
/// LOCAL` resets on commit/rollback, so tuning one request's recall never
/// leaks onto the connection the pool hands to the next request.
pub async fn begin_ann_transaction<'a>(
    conn: &'a mut PooledConnection,
    ann_probes: u32,
    ann_ef_search: u32,
) -> Result<deadpool_postgres::Transaction<'a>, DbError> {
    let txn = conn.build_transaction().read_only(true).start().await?;
    txn.batch_execute(&format!(
        "SET LOCAL ivfflat.probes = {ann_probes}; SET LOCAL hnsw.ef_search = {ann_ef_search};"
    ))
    .await?;
    Ok(txn)
}

/// Fetch the `limit` nearest candidates to `embedding` (by a 0.4/0.4/0.2
/// weighted blend of L2, cosine, and negated inner product, each
/// min-max normalized over the filtered result set), ordered by that
/// blended composite score rather than any single metric.
///
/// `filter_clause_sql` must already be rendered with placeholders
/// starting at `$2` (the embedding vector occupies `$1`), and
/// `filter_params` must supply exactly those parameters in order.
pub async fn fetch_vector_candidates<C: GenericClient>(
    conn: &C,
    embedding: &[f32],
    filter_clause_sql: &str,
    filter_params: &[&(dyn ToSql + Sync)],
    blacklist: &[String],
    offset: u32,
    limit: u32,
) -> Result<Vec<CandidateRow>, DbError> {
    let vector = Vector::from(embedding.to_vec());
    let mut where_clause = String::new();
    if !filter_clause_sql.is_empty() {
        where_clause.push_str(" AND ");
        where_clause.push_str(filter_clause_sql);
    }

    let mut next_idx = 1 + filter_params.len() + 1;
    let blacklist_idx = next_idx;
    if !blacklist.is_empty() {
        where_clause.push_str(&format!(" AND j.job_id <> ALL(${blacklist_idx})"));
        next_idx += 1;
    }
    let offset_idx = next_idx;
    let limit_idx = offset_idx + 1;

    let sql = format!(
        "SELECT * FROM (
            SELECT j.job_id, j.title, j.description, j.short_description, j.field,
                   j.experience, j.skills_required, j.workplace_type, j.posted_date,
                   j.job_state, j.apply_link,
                   c.company_id, c.company_name, c.logo,
                   l.location_id, l.city, co.country_name, l.latitude, l.longitude,
                   j.embedding <-> $1 AS l2_distance,
                   1 - (j.embedding <#> $1) AS inner_product,
                   (j.embedding <=> $1) AS cosine_distance,
                   0.4 * CASE WHEN (MAX(j.embedding <-> $1) OVER () - MIN(j.embedding <-> $1) OVER ()) < 1e-12 THEN 0.0
                        ELSE (j.embedding <-> $1 - MIN(j.embedding <-> $1) OVER ())
                             / (MAX(j.embedding <-> $1) OVER () - MIN(j.embedding <-> $1) OVER ()) END
                   + 0.4 * CASE WHEN (MAX(j.embedding <=> $1) OVER () - MIN(j.embedding <=> $1) OVER ()) < 1e-12 THEN 0.0
                        ELSE (j.embedding <=> $1 - MIN(j.embedding <=> $1) OVER ())
                             / (MAX(j.embedding <=> $1) OVER () - MIN(j.embedding <=> $1) OVER ()) END
                   + 0.2 * (1.0 - CASE WHEN (MAX(-(j.embedding <#> $1)) OVER () - MIN(-(j.embedding <#> $1)) OVER ()) < 1e-12 THEN 0.0
                        ELSE (-(j.embedding <#> $1) - MIN(-(j.embedding <#> $1)) OVER ())
                             / (MAX(-(j.embedding <#> $1)) OVER () - MIN(-(j.embedding <#> $1)) OVER ()) END)
                   AS composite_score
            {BASE_JOIN}{where_clause}
         ) ranked
         ORDER BY {COMPOSITE_ORDER}
         OFFSET ${offset_idx} LIMIT ${limit_idx}"
    );

    let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();
    params.push(&vector);
    params.extend(filter_params.iter().copied());
    let blacklist_owned = blacklist.to_vec();
    if !blacklist.is_empty() {
        params.push(&blacklist_owned);
    }
    let offset_i64 = i64::from(offset);
    let limit_i64 = i64::from(limit);
    params.push(&offset_i64);
    params.push(&limit_i64);

    let rows = conn.query(&sql, &params).await?;
    Ok(rows.iter().map(row_to_candidate_with_composite).collect())
}

/// Fetch candidates without vector similarity, ordered by posting
/// recency. Used when the résumé has no embedding available.
///
/// `filter_clause_sql` must already be rendered with placeholders
/// starting at `$1`.
pub async fn fetch_fallback_candidates<C: GenericClient>(
    conn: &C,
    filter_clause_sql: &str,
    filter_params: &[&(dyn ToSql + Sync)],
    blacklist: &[String],
    offset: u32,
    limit: u32,
) -> Result<Vec<CandidateRow>, DbError> {
    let mut where_clause = String::new();
    if !filter_clause_sql.is_empty() {
        where_clause.push_str(" AND ");
        where_clause.push_str(filter_clause_sql);
    }

    let mut next_idx = filter_params.len() + 1;
    let blacklist_idx = next_idx;
    if !blacklist.is_empty() {
        where_clause.push_str(&format!(" AND j.job_id <> ALL(${blacklist_idx})"));
        next_idx += 1;
    }
    let offset_idx = next_idx;
    let limit_idx = offset_idx + 1;

    let sql = format!(
        "SELECT j.job_id, j.title, j.description, j.short_description, j.field,
                j.experience, j.skills_required, j.workplace_type, j.posted_date,
                j.job_state, j.apply_link,
                c.company_id, c.company_name, c.logo,
                l.location_id, l.city, co.country_name, l.latitude, l.longitude
         {BASE_JOIN}{where_clause}
         ORDER BY j.posted_date DESC
         OFFSET ${offset_idx} LIMIT ${limit_idx}"
    );

    let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();
    params.extend(filter_params.iter().copied());
    let blacklist_owned = blacklist.to_vec();
    if !blacklist.is_empty() {
        params.push(&blacklist_owned);
    }
    let offset_i64 = i64::from(offset);
    let limit_i64 = i64::from(limit);
    params.push(&offset_i64);
    params.push(&limit_i64);

    let rows = conn.query(&sql, &params).await?;
    Ok(rows.iter().map(row_to_candidate_plain).collect())
}

/// Count how many jobs match the given filters (ignoring pagination),
/// for the optional `total_count` projection.
///
/// `filter_clause_sql` must already be rendered with placeholders
/// starting at `$1`.
pub async fn count_filtered<C: GenericClient>(
    conn: &C,
    filter_clause_sql: &str,
    filter_params: &[&(dyn ToSql + Sync)],
    blacklist: &[String],
) -> Result<u64, DbError> {
    let mut where_clause = String::new();
    if !filter_clause_sql.is_empty() {
        where_clause.push_str(" AND ");
        where_clause.push_str(filter_clause_sql);
    }
    let blacklist_idx = filter_params.len() + 1;
    if !blacklist.is_empty() {
        where_clause.push_str(&format!(" AND j.job_id <> ALL(${blacklist_idx})"));
    }

    let sql = format!("SELECT COUNT(*) AS total {BASE_JOIN}{where_clause}");

    let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();
    params.extend(filter_params.iter().copied());
    let blacklist_owned = blacklist.to_vec();
    if !blacklist.is_empty() {
        params.push(&blacklist_owned);
    }

    let row = conn.query_one(&sql, &params).await?;
    let total: i64 = row.get("total");
    Ok(total.max(0) as u64)
}

fn row_to_candidate_with_composite(row: &Row) -> CandidateRow {
    let composite: f64 = row.get("composite_score");
    CandidateRow {
        composite_score: composite,
        ..row_to_candidate_plain(row)
    }
}

fn row_to_candidate_plain(row: &Row) -> CandidateRow {
    CandidateRow {
        job_id: row.get("job_id"),
        title: row.get("title"),
        description: row.get("description"),
        short_description: row.get("short_description"),
        field: row.get("field"),
        experience: row.get("experience"),
        skills_required: row.get("skills_required"),
        workplace_type: row.get("workplace_type"),
        posted_date: row.get("posted_date"),
        job_state: row.get("job_state"),
        apply_link: row.get("apply_link"),
        company: CompanyRecord {
            company_id: row.get("company_id"),
            company_name: row.get("company_name"),
            logo: row.get("logo"),
        },
        location: LocationRecord {
            location_id: row.get("location_id"),
            city: row.get("city"),
            country_name: row.get("country_name"),
            latitude: row.get("latitude"),
            longitude: row.get("longitude"),
        },
        composite_score: 0.0,
    }
}
