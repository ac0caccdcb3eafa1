//! Match explanation: a per-dimension breakdown of why a job matched a
//! résumé, grounded on the legacy matcher's explainer (skill overlap,
//! experience-level distance, and location proximity, each reduced to a
//! coarse strength rating rather than a raw score) and on
//! `app/ml/knowledge_graph/taxonomy.py`'s skill-category grouping for the
//! "related-by-graph" dimension — represented here as a small static
//! adjacency table rather than the full graph-traversal engine, since the
//! explainer only needs one-hop relatedness, not similarity search.

use jobmatch_core::{
    ExperienceMatchExplanation, JobMatch, LocationMatchExplanation, MatchExplanation, MatchStrength,
    Resume, SkillMatchExplanation,
};

/// Skill-adjacency groups used for the "related-by-graph" dimension. Each
/// group is a cluster of skills commonly required together; a résumé
/// skill in the same group as a missing requirement counts as related
/// rather than absent.
const SKILL_GROUPS: &[&[&str]] = &[
    &["rust", "tokio", "actix", "axum"],
    &["python", "django", "flask", "fastapi"],
    &["javascript", "typescript", "react", "vue", "node"],
    &["sql", "postgresql", "mysql", "sqlite"],
    &["aws", "azure", "gcp", "cloud"],
    &["docker", "kubernetes", "helm"],
];

fn related_group(skill: &str) -> Option<&'static [&'static str]> {
    let lower = skill.to_lowercase();
    SKILL_GROUPS.iter().find(|group| group.iter().any(|s| *s == lower)).copied()
}

/// Ordinal position of each canonical experience level, used to measure
/// the distance between a résumé's level and a job's.
fn experience_ordinal(level: &str) -> Option<u8> {
    match level {
        "Intern" => Some(0),
        "Entry" => Some(1),
        "Mid" => Some(2),
        "Executive" => Some(3),
        _ => None,
    }
}

fn explain_skills(resume: &Resume, job: &JobMatch, enable_skill_graph: bool) -> SkillMatchExplanation {
    if job.skills.is_empty() {
        return SkillMatchExplanation {
            matched: Vec::new(),
            missing: Vec::new(),
            related: Vec::new(),
            bonus: Vec::new(),
            strength: MatchStrength::Strong,
        };
    }

    let resume_lower: Vec<String> = resume.skills.iter().map(|s| s.to_lowercase()).collect();
    let mut matched = Vec::new();
    let mut missing = Vec::new();
    let mut related = Vec::new();
    for skill in &job.skills {
        if resume_lower.contains(&skill.to_lowercase()) {
            matched.push(skill.clone());
        } else if enable_skill_graph
            && let Some(group) = related_group(skill)
            && resume_lower.iter().any(|r| group.contains(&r.as_str()))
        {
            related.push(skill.clone());
        } else {
            missing.push(skill.clone());
        }
    }

    let job_skills_lower: Vec<String> = job.skills.iter().map(|s| s.to_lowercase()).collect();
    let bonus: Vec<String> = resume
        .skills
        .iter()
        .filter(|s| !job_skills_lower.contains(&s.to_lowercase()))
        .cloned()
        .collect();

    let ratio = matched.len() as f64 / job.skills.len() as f64;
    let strength = if ratio >= 0.7 {
        MatchStrength::Strong
    } else if ratio >= 0.4 {
        MatchStrength::Moderate
    } else if ratio > 0.0 || !related.is_empty() {
        MatchStrength::Weak
    } else {
        MatchStrength::Missing
    };

    SkillMatchExplanation { matched, missing, related, bonus, strength }
}

fn explain_experience(resume: &Resume, job: &JobMatch) -> ExperienceMatchExplanation {
    let strength = match (
        resume.experience_level.as_deref().and_then(experience_ordinal),
        job.experience.as_deref().and_then(experience_ordinal),
    ) {
        (Some(r), Some(j)) => match r.abs_diff(j) {
            0 => MatchStrength::Strong,
            1 => MatchStrength::Moderate,
            _ => MatchStrength::Weak,
        },
        _ => MatchStrength::Missing,
    };

    ExperienceMatchExplanation {
        resume_level: resume.experience_level.clone(),
        job_level: job.experience.clone(),
        strength,
    }
}

fn explain_location(resume: &Resume, job: &JobMatch) -> LocationMatchExplanation {
    let is_remote = job.city.as_deref().is_some_and(|c| c.eq_ignore_ascii_case("remote"));
    let strength = if is_remote {
        MatchStrength::Strong
    } else {
        match (resume.city.as_deref(), job.city.as_deref()) {
            (Some(r), Some(j)) if r.eq_ignore_ascii_case(j) => MatchStrength::Strong,
            (Some(_), Some(_)) => MatchStrength::Weak,
            _ => MatchStrength::Missing,
        }
    };

    LocationMatchExplanation {
        resume_city: resume.city.clone(),
        job_city: job.city.clone(),
        is_remote,
        strength,
    }
}

fn build_highlights(skills: &SkillMatchExplanation, location: &LocationMatchExplanation) -> Vec<String> {
    let mut highlights = Vec::new();
    if !skills.matched.is_empty() {
        highlights.push(format!("Matches required skills: {}", skills.matched.join(", ")));
    }
    if !skills.bonus.is_empty() {
        highlights.push(format!("Brings additional skills: {}", skills.bonus.join(", ")));
    }
    if location.is_remote {
        highlights.push("Job is remote".to_string());
    } else if location.strength == MatchStrength::Strong {
        highlights.push("Candidate is already based in the job's city".to_string());
    }
    highlights
}

fn build_concerns(
    skills: &SkillMatchExplanation,
    experience: &ExperienceMatchExplanation,
    location: &LocationMatchExplanation,
) -> Vec<String> {
    let mut concerns = Vec::new();
    if !skills.missing.is_empty() {
        concerns.push(format!("Missing required skills: {}", skills.missing.join(", ")));
    }
    if !skills.related.is_empty() {
        concerns.push(format!("Only related experience with: {}", skills.related.join(", ")));
    }
    if experience.strength <= MatchStrength::Weak {
        concerns.push("Experience level differs substantially from the job's requirement".to_string());
    }
    if !location.is_remote && location.strength <= MatchStrength::Weak {
        concerns.push("Candidate and job are in different cities".to_string());
    }
    concerns
}

/// Build the full explanation for one `(resume, job)` pair. The overall
/// strength is the weakest of the three dimensions, since a single
/// mismatched dimension (wrong continent, wrong seniority) should not be
/// masked by strong scores elsewhere.
#[must_use]
pub fn explain(resume: &Resume, job: &JobMatch, enable_skill_graph: bool) -> MatchExplanation {
    let skills = explain_skills(resume, job, enable_skill_graph);
    let experience = explain_experience(resume, job);
    let location = explain_location(resume, job);
    let overall = skills.strength.min(experience.strength).min(location.strength);
    let highlights = build_highlights(&skills, &location);
    let concerns = build_concerns(&skills, &experience, &location);

    MatchExplanation { skills, experience, location, overall, highlights, concerns }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn resume() -> Resume {
        Resume {
            resume_id: "r1".to_string(),
            user_id: None,
            embedding: None,
            skills: vec!["Rust".to_string(), "PostgreSQL".to_string()],
            experience_level: Some("Mid".to_string()),
            city: Some("Austin".to_string()),
        }
    }

    fn job(skills: Vec<&str>, experience: Option<&str>, city: Option<&str>) -> JobMatch {
        JobMatch {
            id: Uuid::new_v4(),
            title: "Job".to_string(),
            description: None,
            short_description: None,
            workplace_type: None,
            field: None,
            experience: experience.map(str::to_string),
            skills: skills.into_iter().map(str::to_string).collect(),
            country: None,
            city: city.map(str::to_string),
            company_name: None,
            company_logo: None,
            score: 0.9,
            posted_date: NaiveDate::from_ymd_opt(2026, 1, 1),
            job_state: None,
            explanation: None,
        }
    }

    #[test]
    fn full_skill_overlap_is_strong() {
        let e = explain_skills(&resume(), &job(vec!["Rust", "PostgreSQL"], None, None), true);
        assert_eq!(e.strength, MatchStrength::Strong);
        assert!(e.missing.is_empty());
    }

    #[test]
    fn no_skill_overlap_is_missing() {
        let e = explain_skills(&resume(), &job(vec!["Java"], None, None), true);
        assert_eq!(e.strength, MatchStrength::Missing);
    }

    #[test]
    fn related_skill_counts_as_weak_not_missing() {
        let e = explain_skills(&resume(), &job(vec!["Tokio"], None, None), true);
        assert_eq!(e.related, vec!["Tokio".to_string()]);
        assert_eq!(e.strength, MatchStrength::Weak);
    }

    #[test]
    fn bonus_skills_surface_resume_skills_the_job_does_not_require() {
        let e = explain_skills(&resume(), &job(vec!["Rust"], None, None), true);
        assert_eq!(e.bonus, vec!["PostgreSQL".to_string()]);
    }

    #[test]
    fn remote_job_is_always_strong_location() {
        let e = explain_location(&resume(), &job(vec![], None, Some("Remote")));
        assert_eq!(e.strength, MatchStrength::Strong);
    }

    #[test]
    fn adjacent_experience_level_is_moderate() {
        let e = explain_experience(&resume(), &job(vec![], Some("Entry"), None));
        assert_eq!(e.strength, MatchStrength::Moderate);
    }

    #[test]
    fn overall_strength_is_the_weakest_dimension() {
        let explanation = explain(&resume(), &job(vec!["Java"], Some("Executive"), Some("Berlin")), true);
        assert_eq!(explanation.overall, MatchStrength::Missing);
        assert!(!explanation.concerns.is_empty());
    }

    #[test]
    fn strong_match_produces_highlights() {
        let explanation = explain(&resume(), &job(vec!["Rust", "PostgreSQL"], Some("Mid"), Some("Austin")), true);
        assert!(!explanation.highlights.is_empty());
    }
}
