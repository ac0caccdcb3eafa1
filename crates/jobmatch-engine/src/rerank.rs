//! Optional cross-encoder reranking stage.
//!
//! Reranking blends the retrieval-stage score with a second, more
//! expensive relevance signal. A real deployment would plug in a
//! learned cross-encoder; the default here is a lexical overlap scorer
//! so the stage is exercisable without a model server. Per the pipeline
//! contract this stage degrades softly: an encoder failure logs a
//! warning and leaves that candidate's retrieval score untouched rather
//! than failing the whole request.

use std::collections::HashSet;

use jobmatch_core::{DowngradeSignal, JobMatch, Resume};
use tracing::warn;

/// A pluggable second-stage relevance scorer. Implementations may call
/// out to a model server; [`DowngradeSignal`] lets them fail a single
/// candidate without aborting the rerank pass.
pub trait CrossEncoder: Send + Sync {
    fn score(&self, resume: &Resume, candidate: &JobMatch) -> Result<f64, DowngradeSignal>;
}

/// Token-overlap scorer: the fraction of résumé skill tokens that also
/// appear in the candidate's title, skills, or description.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalOverlapEncoder;

impl CrossEncoder for LexicalOverlapEncoder {
    fn score(&self, resume: &Resume, candidate: &JobMatch) -> Result<f64, DowngradeSignal> {
        if resume.skills.is_empty() {
            return Ok(0.0);
        }

        let candidate_tokens: HashSet<String> = candidate
            .skills
            .iter()
            .chain(std::iter::once(&candidate.title))
            .chain(candidate.description.iter())
            .flat_map(|s| s.split_whitespace())
            .map(str::to_lowercase)
            .collect();

        let resume_tokens: HashSet<String> =
            resume.skills.iter().flat_map(|s| s.split_whitespace()).map(str::to_lowercase).collect();

        let overlap = resume_tokens.intersection(&candidate_tokens).count();
        #[allow(clippy::cast_precision_loss)]
        Ok(overlap as f64 / resume_tokens.len() as f64)
    }
}

/// Rerank `matches` in place, blending each candidate's retrieval score
/// with `encoder`'s cross-encoder score at `weight_cross`/`weight_retrieve`.
///
/// Sorts descending by the blended score. An encoder failure on one
/// candidate is logged and that candidate keeps its retrieval-only score.
pub fn rerank(
    encoder: &dyn CrossEncoder,
    resume: &Resume,
    mut matches: Vec<JobMatch>,
    weight_cross: f64,
    weight_retrieve: f64,
) -> Vec<JobMatch> {
    for job in &mut matches {
        let retrieve_score = job.score;
        match encoder.score(resume, job) {
            Ok(cross_score) => {
                job.score = weight_cross.mul_add(cross_score, weight_retrieve * retrieve_score);
            }
            Err(signal) => {
                warn!(job_id = %job.id, reason = %signal.reason, "cross-encoder failed, keeping retrieval score");
            }
        }
    }
    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn job(title: &str, skills: Vec<&str>, score: f64) -> JobMatch {
        JobMatch {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            short_description: None,
            workplace_type: None,
            field: None,
            experience: None,
            skills: skills.into_iter().map(str::to_string).collect(),
            country: None,
            city: None,
            company_name: None,
            company_logo: None,
            score,
            posted_date: NaiveDate::from_ymd_opt(2026, 1, 1),
            job_state: None,
            explanation: None,
        }
    }

    fn resume(skills: Vec<&str>) -> Resume {
        Resume {
            resume_id: "r1".to_string(),
            user_id: None,
            embedding: None,
            skills: skills.into_iter().map(str::to_string).collect(),
            experience_level: None,
            city: None,
        }
    }

    #[test]
    fn lexical_overlap_scorer_rewards_shared_tokens() {
        let encoder = LexicalOverlapEncoder;
        let r = resume(vec!["rust", "postgresql"]);
        let high = job("Rust Backend Engineer", vec!["rust", "postgresql"], 0.5);
        let low = job("Marketing Manager", vec!["seo"], 0.5);
        let high_score = encoder.score(&r, &high).unwrap();
        let low_score = encoder.score(&r, &low).unwrap();
        assert!(high_score > low_score);
    }

    #[test]
    fn rerank_sorts_descending_by_blended_score() {
        let encoder = LexicalOverlapEncoder;
        let r = resume(vec!["rust"]);
        let matches = vec![job("Marketing", vec!["seo"], 0.9), job("Rust Engineer", vec!["rust"], 0.1)];
        let reranked = rerank(&encoder, &r, matches, 0.7, 0.3);
        assert_eq!(reranked[0].title, "Rust Engineer");
    }

    struct FailingEncoder;
    impl CrossEncoder for FailingEncoder {
        fn score(&self, _resume: &Resume, _candidate: &JobMatch) -> Result<f64, DowngradeSignal> {
            Err(DowngradeSignal::new("model unavailable"))
        }
    }

    #[test]
    fn encoder_failure_keeps_retrieval_score() {
        let encoder = FailingEncoder;
        let r = resume(vec!["rust"]);
        let matches = vec![job("Rust Engineer", vec!["rust"], 0.42)];
        let reranked = rerank(&encoder, &r, matches, 0.7, 0.3);
        assert!((reranked[0].score - 0.42).abs() < f64::EPSILON);
    }
}
