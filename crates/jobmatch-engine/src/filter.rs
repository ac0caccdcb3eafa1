//! Compiles a [`jobmatch_core`] filter set into parameterized SQL clauses.
//!
//! Each filter (location, keywords, experience) contributes zero or more
//! `WHERE`-clause fragments plus positional parameters; the caller joins
//! the fragments with `AND` and appends them after the base query. This
//! mirrors the legacy query builder's per-filter-group method split
//! (`_build_location_filters`/`_build_keyword_filters`/
//! `_build_experience_filters`), translated from Python string formatting
//! into `tokio_postgres`'s `$n` positional placeholders.

use jobmatch_core::{ExperienceLevel, KeywordFilter, LocationFilter, MatchError};
use tokio_postgres::types::ToSql;

/// Accumulated `WHERE` clauses and their bound parameters. Clauses are
/// joined with `AND`; an empty compiler contributes no filtering at all.
/// Placeholders are numbered starting at `offset + 1`, so a caller that
/// binds a fixed leading parameter (the embedding vector in a similarity
/// query) can reserve `$1` for itself by constructing with `offset: 1`.
pub struct CompiledFilters {
    offset: usize,
    clauses: Vec<String>,
    params: Vec<Box<dyn ToSql + Sync + Send>>,
}

impl Default for CompiledFilters {
    fn default() -> Self {
        Self::with_offset(0)
    }
}

impl CompiledFilters {
    #[must_use]
    pub fn with_offset(offset: usize) -> Self {
        Self {
            offset,
            clauses: Vec::new(),
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Number of parameters bound so far, i.e. the 0-based offset at
    /// which a caller's next placeholder should start (added to this
    /// compiler's own `offset`).
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// The placeholder index (1-based, `$n`) one past the last
    /// parameter this compiler bound.
    #[must_use]
    pub fn next_param_index(&self) -> usize {
        self.offset + self.params.len() + 1
    }

    /// Render as a single `WHERE ... AND ...` suffix (without the leading
    /// `WHERE`/`AND` keyword, which the caller supplies based on whether
    /// the base query already has a `WHERE` clause).
    #[must_use]
    pub fn clauses_sql(&self) -> String {
        self.clauses.join(" AND ")
    }

    #[must_use]
    pub fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect()
    }

    fn next_placeholder(&mut self, param: Box<dyn ToSql + Sync + Send>) -> usize {
        self.params.push(param);
        self.offset + self.params.len()
    }

    fn push(&mut self, clause: &str, param: Box<dyn ToSql + Sync + Send>) {
        let placeholder = self.next_placeholder(param);
        self.clauses.push(clause.replacen("{}", &format!("${placeholder}"), 1));
    }
}

/// Compile the location, keyword, and experience filters of a request
/// into one parameterized clause set, placeholder-numbered from `$1`.
///
/// # Errors
/// Returns [`MatchError::Validation`] if a supplied radius is `<= 0`.
pub fn compile_filters(
    location: Option<&LocationFilter>,
    keywords: &KeywordFilter,
    experience: &[ExperienceLevel],
) -> Result<CompiledFilters, MatchError> {
    compile_filters_with_offset(location, keywords, experience, 0)
}

/// Same as [`compile_filters`], but placeholders start at `offset + 1` so
/// a caller that binds a fixed leading parameter (the embedding vector in
/// a similarity query) can reserve the earlier `$n`s for itself.
///
/// # Errors
/// Returns [`MatchError::Validation`] if a supplied radius is `<= 0`.
pub fn compile_filters_with_offset(
    location: Option<&LocationFilter>,
    keywords: &KeywordFilter,
    experience: &[ExperienceLevel],
    offset: usize,
) -> Result<CompiledFilters, MatchError> {
    let mut compiled = CompiledFilters::with_offset(offset);
    compiled.clauses.push("embedding IS NOT NULL".to_string());

    if let Some(loc) = location {
        compile_location(loc, &mut compiled)?;
    }
    if !keywords.is_empty() {
        compile_keywords(keywords, &mut compiled);
    }
    if !experience.is_empty() {
        compile_experience(experience, &mut compiled);
    }

    Ok(compiled)
}

fn compile_location(loc: &LocationFilter, out: &mut CompiledFilters) -> Result<(), MatchError> {
    if let Some(country) = &loc.country {
        if country.eq_ignore_ascii_case("usa") || country.eq_ignore_ascii_case("united states") {
            // Canonical alias: no parameter needed, matches the legacy
            // builder's literal comparison.
            out.clauses.push("(co.country_name = 'United States')".to_string());
        } else {
            out.push("(co.country_name = {})", Box::new(country.clone()));
        }
    }

    let has_geo = loc.latitude.is_some() && loc.longitude.is_some();

    // City is emitted only when geo coordinates are absent: a geo query
    // already subsumes city matching via the `remote`-OR fallback below.
    if let Some(city) = &loc.city {
        if !has_geo {
            let idx = out.next_placeholder(Box::new(city.clone()));
            out.clauses.push(format!("(l.city = ${idx} OR l.city = 'remote')"));
        }
    }

    if let (Some(lat), Some(lon), Some(radius)) = (loc.latitude, loc.longitude, loc.radius) {
        let meters = radius.to_meters();
        if meters <= 0.0 {
            return Err(MatchError::Validation(format!("radius must be > 0, got {meters} meters")));
        }
        let lon_idx = out.next_placeholder(Box::new(lon));
        let lat_idx = out.next_placeholder(Box::new(lat));
        let radius_idx = out.next_placeholder(Box::new(meters));
        out.clauses.push(format!(
            "(l.city = 'remote' OR ST_DWithin(ST_MakePoint(l.longitude, l.latitude)::geography, \
             ST_MakePoint(${lon_idx}, ${lat_idx})::geography, ${radius_idx}))"
        ));
    }

    Ok(())
}

/// Build one OR-combined disjunction across every keyword phrase (and, for
/// multi-word phrases, each whitespace-separated token within it), and
/// push it as a single `AND`-joinable clause. A phrase contributes its own
/// `(title ILIKE phrase OR description ILIKE phrase)` disjunct plus one
/// more per token, so `"senior rust"` matches rows containing the full
/// phrase or either word alone.
fn compile_keywords(keywords: &KeywordFilter, out: &mut CompiledFilters) {
    let mut disjuncts = Vec::new();
    for phrase in keywords {
        disjuncts.push(keyword_disjunct(phrase, out));
        let tokens: Vec<&str> = phrase.split_whitespace().collect();
        if tokens.len() > 1 {
            for token in tokens {
                disjuncts.push(keyword_disjunct(token, out));
            }
        }
    }
    out.clauses.push(format!("({})", disjuncts.join(" OR ")));
}

fn keyword_disjunct(phrase: &str, out: &mut CompiledFilters) -> String {
    let pattern = format!("%{phrase}%");
    let title_idx = out.next_placeholder(Box::new(pattern.clone()));
    let desc_idx = out.next_placeholder(Box::new(pattern));
    format!("(j.title ILIKE ${title_idx} OR j.description ILIKE ${desc_idx})")
}

fn compile_experience(levels: &[ExperienceLevel], out: &mut CompiledFilters) {
    let tokens: Vec<String> = levels.iter().map(|l| l.as_str().to_string()).collect();
    let idx = out.next_placeholder(Box::new(tokens));
    out.clauses.push(format!("(j.experience = ANY(${idx}))"));
}
