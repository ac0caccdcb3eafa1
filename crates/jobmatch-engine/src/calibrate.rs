//! Score calibration and candidate-row-to-`JobMatch` projection.
//!
//! The calibration curve and the "discard rows missing required fields"
//! rule are ported from `job_validator.py::score_to_percentage` and
//! `create_job_match` — a four-segment piecewise map from raw composite
//! distance (lower is better, range roughly `[0, 2]`) to a user-facing
//! match percentage in `[0, 1]`.

use jobmatch_core::{CandidateRow, JobMatch};
use tracing::warn;
use uuid::Uuid;

/// Map a raw composite distance to a calibrated match percentage.
#[must_use]
pub fn score_to_percentage(score: f64) -> f64 {
    let raw = if score <= 0.7 {
        1.0
    } else if score <= 0.9 {
        0.999 - 0.095 * (score - 0.7)
    } else if score <= 0.95 {
        0.98 - 1.6 * (score - 0.9)
    } else if score <= 2.0 {
        (0.9 - 0.857 * (score - 0.95)).max(0.0)
    } else {
        0.0
    };
    ((raw * 10_000.0).round() / 10_000.0).clamp(0.0, 1.0)
}

/// Parse a skills field that may be either an array-literal string
/// (`"['Rust', 'PostgreSQL']"`) or a comma-separated string
/// (`"Rust, PostgreSQL"`), matching the two forms the legacy job store
/// used interchangeably across schema versions.
#[must_use]
pub fn parse_skills(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let body = if trimmed.starts_with('[') && trimmed.ends_with(']') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };
    body.split(',')
        .map(|s| s.trim().trim_matches(['\'', '"']).trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Project a raw candidate row into the externally visible `JobMatch`
/// shape, calibrating its score. Returns `None` (and logs a warning) if
/// the row is missing `job_id` or `title` — the two fields the legacy
/// matcher treats as non-negotiable (`JobValidator.REQUIRED_FIELDS`).
#[must_use]
pub fn project_candidate(row: CandidateRow) -> Option<JobMatch> {
    let Some(title) = row.title.clone() else {
        warn!(job_id = %row.job_id, "discarding candidate row missing required field: title");
        return None;
    };

    let Ok(id) = Uuid::parse_str(&row.job_id) else {
        warn!(job_id = %row.job_id, "discarding candidate row with unparseable job id");
        return None;
    };

    let skills = row
        .skills_required
        .as_deref()
        .map(parse_skills)
        .unwrap_or_default();

    Some(JobMatch {
        id,
        title,
        description: row.description,
        short_description: row.short_description,
        workplace_type: row.workplace_type,
        field: row.field,
        experience: row.experience,
        skills,
        country: row.location.country_name,
        city: row.location.city,
        company_name: row.company.company_name,
        company_logo: row.company.logo,
        score: score_to_percentage(row.composite_score),
        posted_date: row.posted_date,
        job_state: row.job_state,
        explanation: None,
    })
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use jobmatch_core::{CompanyRecord, LocationRecord};

    #[test]
    fn scores_at_or_below_0_7_are_perfect_matches() {
        assert_eq!(score_to_percentage(0.0), 1.0);
        assert_eq!(score_to_percentage(0.7), 1.0);
    }

    #[test]
    fn scores_above_2_are_zero() {
        assert_eq!(score_to_percentage(2.5), 0.0);
    }

    #[test]
    fn calibration_is_monotonically_non_increasing() {
        let samples: Vec<f64> = (0..=200).map(|i| f64::from(i) / 100.0).collect();
        let mut prev = 1.0;
        for s in samples {
            let pct = score_to_percentage(s);
            assert!(pct <= prev + 1e-9, "percentage increased at score {s}");
            prev = pct;
        }
    }

    #[test]
    fn parses_array_literal_skills() {
        assert_eq!(
            parse_skills("['Rust', 'PostgreSQL']"),
            vec!["Rust".to_string(), "PostgreSQL".to_string()]
        );
    }

    #[test]
    fn parses_comma_separated_skills() {
        assert_eq!(
            parse_skills("Rust, PostgreSQL, Tokio"),
            vec!["Rust".to_string(), "PostgreSQL".to_string(), "Tokio".to_string()]
        );
    }

    fn sample_row(job_id: &str, title: Option<&str>) -> CandidateRow {
        CandidateRow {
            job_id: job_id.to_string(),
            title: title.map(str::to_string),
            description: None,
            short_description: None,
            field: None,
            experience: None,
            skills_required: Some("Rust, SQL".to_string()),
            workplace_type: None,
            posted_date: None,
            job_state: Some("Active".to_string()),
            apply_link: None,
            company: CompanyRecord::default(),
            location: LocationRecord::default(),
            composite_score: 0.5,
        }
    }

    #[test]
    fn discards_row_missing_title() {
        let row = sample_row("11111111-1111-1111-1111-111111111111", None);
        assert!(project_candidate(row).is_none());
    }

    #[test]
    fn projects_complete_row() {
        let row = sample_row("11111111-1111-1111-1111-111111111111", Some("Rust Engineer"));
        let job_match = project_candidate(row).expect("row should project");
        assert_eq!(job_match.title, "Rust Engineer");
        assert_eq!(job_match.score, 1.0);
        assert_eq!(job_match.skills, vec!["Rust".to_string(), "SQL".to_string()]);
    }
}
