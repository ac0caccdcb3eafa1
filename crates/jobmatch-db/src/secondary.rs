//! Secondary document store: blacklist assembly from MongoDB.
//!
//! Mirrors the legacy matcher's two blacklist sources — a per-user
//! `already_applied_jobs` collection and a global `cooled_jobs` collection
//! — fetched once per request, before the cache fingerprint is computed.

use jobmatch_core::BlacklistSet;
use mongodb::bson::doc;
use mongodb::{Client, Database};
use serde::Deserialize;

use crate::error::DbError;

const APPLIED_COLLECTION: &str = "already_applied_jobs";
const COOLED_COLLECTION: &str = "cooled_jobs";

/// One user's applied-jobs document: a single row per user with an array
/// of job ids, per `applied_jobs_service.py`.
#[derive(Debug, Deserialize)]
struct AppliedJobsDoc {
    #[serde(default)]
    job_ids: Vec<String>,
}

/// One cooled-job document: one row per job id, with no owning user —
/// cooling windows apply globally, per `cooled_jobs_service.py`.
#[derive(Debug, Deserialize)]
struct CooledJobDoc {
    job_id: String,
}

/// Client over the secondary document store.
#[derive(Clone)]
pub struct SecondaryStore {
    db: Database,
}

impl SecondaryStore {
    /// Connect using the configured MongoDB URL and database name.
    pub async fn connect(url: &str, database: &str) -> Result<Self, DbError> {
        let client = Client::with_uri_str(url)
            .await
            .map_err(|e| DbError::Fatal(e.to_string()))?;
        Ok(Self {
            db: client.database(database),
        })
    }

    /// Fetch both blacklist sets for the given user. A user with no
    /// applied/cooled documents gets back an empty [`BlacklistSet`],
    /// not an error.
    pub async fn fetch_blacklist(&self, user_id: &str) -> Result<BlacklistSet, DbError> {
        let applied_job_ids = self.fetch_applied_job_ids(user_id).await?;
        let cooled_job_ids = self.fetch_cooled_job_ids().await?;
        Ok(BlacklistSet {
            applied_job_ids,
            cooled_job_ids,
        })
    }

    /// `already_applied_jobs` documents are keyed by `user_id`, with job
    /// ids collected into a single array field — flatten across every
    /// matching document for this user.
    async fn fetch_applied_job_ids(&self, user_id: &str) -> Result<Vec<String>, DbError> {
        use futures_util::TryStreamExt;

        let coll = self.db.collection::<AppliedJobsDoc>(APPLIED_COLLECTION);
        let mut cursor = coll.find(doc! { "user_id": user_id }).await.map_err(DbError::from)?;

        let mut ids = Vec::new();
        while let Some(doc) = cursor.try_next().await.map_err(DbError::from)? {
            ids.extend(doc.job_ids);
        }
        Ok(ids)
    }

    /// `cooled_jobs` has no owning user — the cooling window applies to
    /// every caller, so it is fetched unfiltered.
    async fn fetch_cooled_job_ids(&self) -> Result<Vec<String>, DbError> {
        use futures_util::TryStreamExt;

        let coll = self.db.collection::<CooledJobDoc>(COOLED_COLLECTION);
        let mut cursor = coll.find(doc! {}).await.map_err(DbError::from)?;

        let mut ids = Vec::new();
        while let Some(doc) = cursor.try_next().await.map_err(DbError::from)? {
            ids.push(doc.job_id);
        }
        Ok(ids)
    }
}
