//! Runtime configuration for the matching pipeline.
//!
//! Values are read with explicit precedence: process environment, then a
//! project-local `.env` file, then the built-in default. Each field mirrors
//! one of the external configuration keys enumerated for the pipeline
//! (pool sizing, ANN search breadth, cache policy, stage weighting,
//! pagination limits).

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use std::{env, fs};

/// Fully resolved configuration for one running instance of the pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub mongodb_url: String,
    pub mongodb_database: String,

    pub pool_min_connections: usize,
    pub pool_max_connections: usize,
    pub pool_acquire_timeout_ms: u64,
    pub pool_max_idle_ms: u64,

    pub ann_probes: u32,
    pub ann_ef_search: u32,

    pub cache_ttl_seconds: u64,
    pub cache_soft_cap: usize,

    pub top_k_retrieve: usize,
    pub top_k_final: usize,
    pub rerank_weight_cross: f64,
    pub rerank_weight_retrieve: f64,
    pub enable_rerank: bool,
    pub enable_explain: bool,
    pub enable_skill_graph: bool,

    pub max_offset: u32,
    pub embedding_dimension: usize,
}

impl Config {
    /// Built-in defaults, overridable per-field via environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            database_url: env_value("DATABASE_URL")
                .unwrap_or_else(|| "postgresql://localhost/jobmatch".to_string()),
            mongodb_url: env_value("MONGODB_URL")
                .unwrap_or_else(|| "mongodb://localhost:27017".to_string()),
            mongodb_database: env_value("MONGODB_DATABASE")
                .unwrap_or_else(|| "resumes".to_string()),

            pool_min_connections: env_usize("JOBMATCH_POOL_MIN", 5),
            pool_max_connections: env_usize("JOBMATCH_POOL_MAX", 25),
            pool_acquire_timeout_ms: env_u64("JOBMATCH_POOL_ACQUIRE_TIMEOUT_MS", 3_000),
            pool_max_idle_ms: env_u64("JOBMATCH_POOL_MAX_IDLE_MS", 30 * 60 * 1000),

            ann_probes: env_u32("JOBMATCH_ANN_PROBES", 10),
            ann_ef_search: env_u32("JOBMATCH_ANN_EF_SEARCH", 100),

            cache_ttl_seconds: env_u64("JOBMATCH_CACHE_TTL_SECONDS", 300),
            cache_soft_cap: env_usize("JOBMATCH_CACHE_SOFT_CAP", 1_000),

            top_k_retrieve: env_usize("JOBMATCH_TOP_K_RETRIEVE", 100),
            top_k_final: env_usize("JOBMATCH_TOP_K_FINAL", 25),
            rerank_weight_cross: env_f64("JOBMATCH_RERANK_WEIGHT_CROSS", 0.7),
            rerank_weight_retrieve: env_f64("JOBMATCH_RERANK_WEIGHT_RETRIEVE", 0.3),
            enable_rerank: env_bool("JOBMATCH_ENABLE_RERANK", false),
            enable_explain: env_bool("JOBMATCH_ENABLE_EXPLAIN", false),
            enable_skill_graph: env_bool("JOBMATCH_ENABLE_SKILL_GRAPH", false),

            max_offset: env_u32("JOBMATCH_MAX_OFFSET", 1_500),
            embedding_dimension: env_usize("JOBMATCH_EMBEDDING_DIMENSION", 1_024),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

// --- environment helpers -----------------------------------------------

static DOTENV_VALUES: OnceLock<HashMap<String, String>> = OnceLock::new();

#[cfg(test)]
thread_local! {
    static TEST_ENV_OVERRIDES: std::cell::RefCell<HashMap<String, String>> =
        std::cell::RefCell::new(HashMap::new());
}

#[cfg(test)]
fn test_env_override_value(key: &str) -> Option<String> {
    TEST_ENV_OVERRIDES.with(|cell| cell.borrow().get(key).cloned())
}

#[cfg(test)]
fn set_test_env_override(key: &str, value: &str) {
    TEST_ENV_OVERRIDES.with(|cell| cell.borrow_mut().insert(key.to_string(), value.to_string()));
}

fn dotenv_values() -> &'static HashMap<String, String> {
    DOTENV_VALUES.get_or_init(|| load_dotenv_file(Path::new(".env")))
}

fn load_dotenv_file(path: &Path) -> HashMap<String, String> {
    let Ok(contents) = fs::read_to_string(path) else {
        return HashMap::new();
    };
    parse_dotenv_contents(&contents)
}

fn parse_dotenv_contents(contents: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            out.insert(key.trim().to_string(), value.to_string());
        }
    }
    out
}

/// Read a value from the real environment first, falling back to a
/// project-local `.env` file.
#[must_use]
pub fn env_value(key: &str) -> Option<String> {
    #[cfg(test)]
    if let Some(v) = test_env_override_value(key) {
        return Some(v);
    }
    env::var(key).ok().or_else(|| dotenv_values().get(key).cloned())
}

fn env_usize(key: &str, default: usize) -> usize {
    env_value(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env_value(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_value(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env_value(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env_value(key)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
