//! Domain types for the job matching core.
//!
//! These map directly to the relational tables and request/response shapes
//! described in the matching engine's external interfaces: `Jobs`,
//! `Companies`, `Locations`, `Countries`, plus the request/response
//! envelopes exchanged with callers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A dense résumé or job embedding. Dimension is a runtime invariant,
/// checked against [`crate::config::Config::embedding_dimension`] at the
/// pipeline boundary rather than encoded as a const generic, since both
/// résumé and job embeddings arrive from storage at runtime.
pub type Embedding = Vec<f32>;

/// Candidate experience level, matching the four-way enumeration the
/// filter compiler and job records share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExperienceLevel {
    Intern,
    Entry,
    Mid,
    Executive,
}

impl ExperienceLevel {
    /// All four canonical levels, in the enumeration's declared order.
    pub const ALL: [Self; 4] = [Self::Intern, Self::Entry, Self::Mid, Self::Executive];

    /// Database/wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Intern => "Intern",
            Self::Entry => "Entry",
            Self::Mid => "Mid",
            Self::Executive => "Executive",
        }
    }

    /// Parse the canonical token. Unknown tokens return `None` and are
    /// silently dropped by the filter compiler rather than rejected.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "Intern" => Some(Self::Intern),
            "Entry" => Some(Self::Entry),
            "Mid" => Some(Self::Mid),
            "Executive" => Some(Self::Executive),
            _ => None,
        }
    }
}

/// Lifecycle state of a job posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Active,
    Filled,
    Expired,
}

impl JobState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Filled => "Filled",
            Self::Expired => "Expired",
        }
    }

    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "Active" => Some(Self::Active),
            "Filled" => Some(Self::Filled),
            "Expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

/// A search radius, expressed in exactly one of the two canonical units a
/// request may supply. The filter compiler normalizes this to meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Radius {
    Meters(f64),
    Kilometers(f64),
}

impl Radius {
    /// Normalize to meters, the unit `ST_DWithin`-equivalent geography
    /// predicates expect.
    #[must_use]
    pub fn to_meters(self) -> f64 {
        match self {
            Self::Meters(m) => m,
            Self::Kilometers(km) => km * 1000.0,
        }
    }
}

/// Optional location constraints on a request.
#[derive(Debug, Clone, Default)]
pub struct LocationFilter {
    pub country: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius: Option<Radius>,
}

/// An ordered list of keyword phrases. Order matters for the fingerprint's
/// *keyword-list* equality (spec.md requires the fingerprint to be
/// order-sensitive on keywords while being reorder-invariant on blacklist
/// sets), but is resolved to a sorted set for the fingerprint hash itself
/// per spec.md's own open-question resolution (see `fingerprint.rs`).
pub type KeywordFilter = Vec<String>;

/// The union of jobs already applied to (per-user) and jobs in a global
/// cooling window, assembled once per request.
#[derive(Debug, Clone, Default)]
pub struct BlacklistSet {
    pub applied_job_ids: Vec<String>,
    pub cooled_job_ids: Vec<String>,
}

impl BlacklistSet {
    /// The union of both sets, deduplicated.
    #[must_use]
    pub fn union(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .applied_job_ids
            .iter()
            .chain(self.cooled_job_ids.iter())
            .cloned()
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.applied_job_ids.is_empty() && self.cooled_job_ids.is_empty()
    }
}

/// A company joined into a candidate row.
#[derive(Debug, Clone, Default)]
pub struct CompanyRecord {
    pub company_id: String,
    pub company_name: Option<String>,
    pub logo: Option<String>,
}

/// A location joined into a candidate row. `city == "remote"` is
/// semantically special and matches any city filter.
#[derive(Debug, Clone, Default)]
pub struct LocationRecord {
    pub location_id: String,
    pub city: Option<String>,
    pub country_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl LocationRecord {
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.city.as_deref().is_some_and(|c| c.eq_ignore_ascii_case("remote"))
    }
}

/// Raw row fetched from the DAL, before calibration/projection. On the
/// fallback path, `l2_distance`/`cosine_distance`/`inner_product` are
/// `None` and `composite_score` is `0.0`.
#[derive(Debug, Clone)]
pub struct CandidateRow {
    pub job_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub field: Option<String>,
    pub experience: Option<String>,
    pub skills_required: Option<String>,
    pub workplace_type: Option<String>,
    pub posted_date: Option<NaiveDate>,
    pub job_state: Option<String>,
    pub apply_link: Option<String>,
    pub company: CompanyRecord,
    pub location: LocationRecord,
    pub composite_score: f64,
}

/// The externally visible match record. `apply_link` and `portal` are
/// intentionally excluded from this shape per the external projection
/// contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMatch {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub workplace_type: Option<String>,
    pub field: Option<String>,
    pub experience: Option<String>,
    pub skills: Vec<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub company_name: Option<String>,
    pub company_logo: Option<String>,
    pub score: f64,
    pub posted_date: Option<NaiveDate>,
    pub job_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub explanation: Option<MatchExplanation>,
}

/// Coarse strength rating for one explanation dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MatchStrength {
    Missing,
    Weak,
    Moderate,
    Strong,
}

/// Skill overlap between the résumé and the job's required skills.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillMatchExplanation {
    /// Skills present on both the résumé and the job's required list.
    pub matched: Vec<String>,
    /// Required skills absent from the résumé.
    pub missing: Vec<String>,
    /// Résumé skills related to a missing requirement by the skill
    /// taxonomy (e.g. `Tokio` implying partial credit for `Rust`), but not
    /// themselves a direct match.
    pub related: Vec<String>,
    /// Résumé skills beyond what the job requires, surfaced as a bonus.
    pub bonus: Vec<String>,
    pub strength: MatchStrength,
}

/// Experience-level distance between résumé and job, on the canonical
/// Intern/Entry/Mid/Executive ordinal scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceMatchExplanation {
    pub resume_level: Option<String>,
    pub job_level: Option<String>,
    pub strength: MatchStrength,
}

/// Location compatibility between résumé city and job city, with a
/// remote job always rating `Strong`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationMatchExplanation {
    pub resume_city: Option<String>,
    pub job_city: Option<String>,
    pub is_remote: bool,
    pub strength: MatchStrength,
}

/// Full per-dimension explanation for one job match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchExplanation {
    pub skills: SkillMatchExplanation,
    pub experience: ExperienceMatchExplanation,
    pub location: LocationMatchExplanation,
    pub overall: MatchStrength,
    /// Short bullet points calling out what worked in the candidate's favor.
    pub highlights: Vec<String>,
    /// Short bullet points calling out gaps or risks.
    pub concerns: Vec<String>,
}

/// Résumé as consumed by the pipeline: an embedding plus optional metadata
/// used for cache-key assembly and explanation generation.
#[derive(Debug, Clone)]
pub struct Resume {
    pub resume_id: String,
    pub user_id: Option<String>,
    pub embedding: Option<Embedding>,
    pub skills: Vec<String>,
    pub experience_level: Option<String>,
    pub city: Option<String>,
}

/// Feature flags carried on a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestFlags {
    pub use_cache: bool,
    pub save: bool,
    pub include_total_count: bool,
    pub enable_rerank: bool,
    pub enable_explain: bool,
}

/// Typed inbound request.
#[derive(Debug, Clone)]
pub struct MatchRequest {
    pub resume: Resume,
    pub location: Option<LocationFilter>,
    pub keywords: KeywordFilter,
    pub experience: Vec<ExperienceLevel>,
    pub offset: u32,
    pub limit: u32,
    pub flags: RequestFlags,
}

/// Typed outbound response.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MatchResponse {
    pub jobs: Vec<JobMatch>,
    pub total_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn experience_level_roundtrips() {
        for level in ExperienceLevel::ALL {
            assert_eq!(ExperienceLevel::parse(level.as_str()), Some(level));
        }
        assert_eq!(ExperienceLevel::parse("Senior"), None);
    }

    #[test]
    fn job_state_roundtrips() {
        assert_eq!(JobState::parse("Active"), Some(JobState::Active));
        assert_eq!(JobState::parse("Bogus"), None);
    }

    #[test]
    fn radius_normalizes_to_meters() {
        assert!((Radius::Kilometers(1.0).to_meters() - 1000.0).abs() < f64::EPSILON);
        assert!((Radius::Meters(500.0).to_meters() - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn blacklist_union_dedupes_and_sorts() {
        let bl = BlacklistSet {
            applied_job_ids: vec!["b".into(), "a".into()],
            cooled_job_ids: vec!["a".into(), "c".into()],
        };
        assert_eq!(bl.union(), vec!["a".to_string(), "b".to_string(), "c".to_string()]);
    }

    #[test]
    fn remote_location_is_case_insensitive() {
        let loc = LocationRecord {
            city: Some("Remote".into()),
            ..Default::default()
        };
        assert!(loc.is_remote());
    }
}
