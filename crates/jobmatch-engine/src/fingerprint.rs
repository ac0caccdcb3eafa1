//! Request fingerprinting for the result cache.
//!
//! A fingerprint must be stable across requests that are semantically
//! identical but arrived with a differently ordered blacklist (the
//! legacy matcher assembles `already_applied_jobs`/`cooled_jobs` from an
//! unordered Mongo cursor) or a differently ordered keyword list. Phrase
//! order changes the generated `ILIKE` clause text and parameter order
//! but never which rows match, so fingerprint equality is defined on the
//! *sorted* keyword list, not the caller's literal ordering.

use std::hash::{Hash, Hasher};

use jobmatch_core::{BlacklistSet, ExperienceLevel, LocationFilter, MatchRequest};
use std::collections::hash_map::DefaultHasher;

/// A deterministic cache key for one match request plus its blacklist.
#[must_use]
pub fn fingerprint(request: &MatchRequest, blacklist: &BlacklistSet) -> String {
    let mut hasher = DefaultHasher::new();

    request.resume.resume_id.hash(&mut hasher);
    hash_option_embedding(&request.resume.embedding, &mut hasher);
    hash_location(request.location.as_ref(), &mut hasher);

    let mut sorted_keywords = request.keywords.clone();
    sorted_keywords.sort_unstable();
    sorted_keywords.hash(&mut hasher);

    hash_experience(&request.experience, &mut hasher);
    request.offset.hash(&mut hasher);
    request.limit.hash(&mut hasher);

    let mut sorted_blacklist = blacklist.union();
    sorted_blacklist.sort_unstable();
    sorted_blacklist.hash(&mut hasher);

    format!("{:016x}", hasher.finish())
}

fn hash_option_embedding(embedding: &Option<Vec<f32>>, hasher: &mut impl Hasher) {
    match embedding {
        None => 0u8.hash(hasher),
        Some(values) => {
            1u8.hash(hasher);
            values.len().hash(hasher);
            for v in values {
                v.to_bits().hash(hasher);
            }
        }
    }
}

fn hash_location(location: Option<&LocationFilter>, hasher: &mut impl Hasher) {
    match location {
        None => 0u8.hash(hasher),
        Some(loc) => {
            1u8.hash(hasher);
            loc.country.hash(hasher);
            loc.city.hash(hasher);
            loc.latitude.map(f64::to_bits).hash(hasher);
            loc.longitude.map(f64::to_bits).hash(hasher);
            match loc.radius {
                None => 0u8.hash(hasher),
                Some(r) => {
                    1u8.hash(hasher);
                    r.to_meters().to_bits().hash(hasher);
                }
            }
        }
    }
}

fn hash_experience(levels: &[ExperienceLevel], hasher: &mut impl Hasher) {
    let mut tokens: Vec<&'static str> = levels.iter().map(|l| l.as_str()).collect();
    tokens.sort_unstable();
    tokens.hash(hasher);
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobmatch_core::{RequestFlags, Resume};

    fn base_request(keywords: Vec<String>) -> MatchRequest {
        MatchRequest {
            resume: Resume {
                resume_id: "r1".to_string(),
                user_id: None,
                embedding: Some(vec![0.1, 0.2]),
                skills: vec![],
                experience_level: None,
                city: None,
            },
            location: None,
            keywords,
            experience: vec![],
            offset: 0,
            limit: 25,
            flags: RequestFlags::default(),
        }
    }

    #[test]
    fn identical_requests_fingerprint_identically() {
        let req = base_request(vec!["rust".to_string()]);
        let bl = BlacklistSet::default();
        assert_eq!(fingerprint(&req, &bl), fingerprint(&req, &bl));
    }

    #[test]
    fn keyword_order_does_not_change_the_fingerprint() {
        let bl = BlacklistSet::default();
        let a = fingerprint(&base_request(vec!["rust".into(), "backend".into()]), &bl);
        let b = fingerprint(&base_request(vec!["backend".into(), "rust".into()]), &bl);
        assert_eq!(a, b);
    }

    #[test]
    fn different_keyword_sets_fingerprint_differently() {
        let bl = BlacklistSet::default();
        let a = fingerprint(&base_request(vec!["rust".into()]), &bl);
        let b = fingerprint(&base_request(vec!["python".into()]), &bl);
        assert_ne!(a, b);
    }

    #[test]
    fn blacklist_order_does_not_change_the_fingerprint() {
        let req = base_request(vec!["rust".to_string()]);
        let a = fingerprint(
            &req,
            &BlacklistSet {
                applied_job_ids: vec!["a".into(), "b".into()],
                cooled_job_ids: vec![],
            },
        );
        let b = fingerprint(
            &req,
            &BlacklistSet {
                applied_job_ids: vec!["b".into(), "a".into()],
                cooled_job_ids: vec![],
            },
        );
        assert_eq!(a, b);
    }

    #[test]
    fn experience_order_does_not_change_the_fingerprint() {
        let bl = BlacklistSet::default();
        let mut req_a = base_request(vec![]);
        req_a.experience = vec![ExperienceLevel::Mid, ExperienceLevel::Entry];
        let mut req_b = base_request(vec![]);
        req_b.experience = vec![ExperienceLevel::Entry, ExperienceLevel::Mid];
        assert_eq!(fingerprint(&req_a, &bl), fingerprint(&req_b, &bl));
    }
}
