//! Configuration management and environment variable loading

use crate::{AskerError, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Load environment variables from a .env file
///
/// Looks in the current directory and its parents. A missing file is not an
/// error; the process environment is used as-is.
///
/// # Example
///
/// ```no_run
/// use askerbot_core::load_env;
///
/// load_env().ok();
/// let key_present = std::env::var("OPENAI_API_KEY").is_ok();
/// ```
pub fn load_env() -> Result<()> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::info!("Loaded environment from: {}", path.display());
            Ok(())
        }
        Err(dotenvy::Error::LineParse(line, pos)) => Err(AskerError::config(format!(
            "Failed to parse .env file at line {}, position {}",
            line, pos
        ))),
        Err(dotenvy::Error::Io(_)) => {
            tracing::debug!("No .env file found - using system environment variables only");
            Ok(())
        }
        Err(e) => Err(AskerError::config(format!(
            "Failed to load .env file: {}",
            e
        ))),
    }
}

/// Get required environment variable
///
/// Returns an error if the variable is unset or blank
pub fn get_required_env(key: &str) -> Result<String> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AskerError::config(format!(
            "Required environment variable '{}' is not set",
            key
        ))),
    }
}

/// Get optional environment variable with default
pub fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get environment variable as boolean
pub fn get_env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| match v.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

/// Get environment variable as integer
pub fn get_env_int<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Get environment variable as float
pub fn get_env_float(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(default)
}

fn get_env_secs(key: &str, default: u64) -> Duration {
    Duration::from_secs(get_env_int(key, default))
}

/// Tunables for the chat pipeline
///
/// Every field can be overridden through an `ASKERBOT_*` environment
/// variable; see [`ChatConfig::from_env`].
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Deployment environment name; anything but `production` exposes error details
    pub environment: String,

    /// Model used for both the analysis and the answer call
    pub model: String,

    /// Sampling temperature for the answer call
    pub answer_temperature: f32,

    /// Token cap for the answer call
    pub answer_max_tokens: u32,

    /// Sampling temperature for the query-analysis call
    pub analysis_temperature: f32,

    /// Token cap for the query-analysis call
    pub analysis_max_tokens: u32,

    /// Deadline applied to every completion call
    pub completion_timeout: Duration,

    /// Top lexicon score that is good enough to answer from the lexicon alone
    pub lexicon_good_enough: f64,

    /// Minimum relevance ratio when the analysis came from the completion service
    pub enriched_relevance_ratio: f64,

    /// Minimum relevance ratio for purely local analysis
    pub local_relevance_ratio: f64,

    /// Weight of the heuristic relevance next to the BM25 score
    pub heuristic_weight: f64,

    /// Snippets handed to the answer prompt on the statistical path
    pub max_context_snippets: usize,

    /// Citations attached to a generated answer
    pub max_citations: usize,

    /// Full-response cache
    pub response_cache_ttl: Duration,
    /// Full-response cache capacity
    pub response_cache_max: usize,

    /// Retrieval-result cache
    pub search_cache_ttl: Duration,
    /// Retrieval-result cache capacity
    pub search_cache_max: usize,

    /// Query-analysis cache
    pub analysis_cache_ttl: Duration,
    /// Query-analysis cache capacity
    pub analysis_cache_max: usize,

    /// How long a loaded statistical index stays in memory
    pub index_cache_ttl: Duration,

    /// Directory holding `bm25-index.json` and `chunk-metadata.json`
    pub index_dir: PathBuf,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            environment: "production".to_string(),
            model: "gpt-4o-mini".to_string(),
            answer_temperature: 0.2,
            answer_max_tokens: 300,
            analysis_temperature: 0.1,
            analysis_max_tokens: 200,
            completion_timeout: Duration::from_secs(20),
            lexicon_good_enough: 20.0,
            enriched_relevance_ratio: 0.25,
            local_relevance_ratio: 0.4,
            heuristic_weight: 0.1,
            max_context_snippets: 3,
            max_citations: 1,
            response_cache_ttl: Duration::from_secs(10 * 60),
            response_cache_max: 500,
            search_cache_ttl: Duration::from_secs(30 * 60),
            search_cache_max: 500,
            analysis_cache_ttl: Duration::from_secs(60 * 60),
            analysis_cache_max: 1000,
            index_cache_ttl: Duration::from_secs(24 * 60 * 60),
            index_dir: PathBuf::from("storage/index/bm25"),
        }
    }
}

impl ChatConfig {
    /// Build a config from the environment, falling back to defaults
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            environment: get_env_or("ASKERBOT_ENV", &d.environment),
            model: get_env_or("OPENAI_MODEL", &d.model),
            answer_temperature: get_env_int("ASKERBOT_ANSWER_TEMPERATURE", d.answer_temperature),
            answer_max_tokens: get_env_int("ASKERBOT_ANSWER_MAX_TOKENS", d.answer_max_tokens),
            analysis_temperature: get_env_int(
                "ASKERBOT_ANALYSIS_TEMPERATURE",
                d.analysis_temperature,
            ),
            analysis_max_tokens: get_env_int("ASKERBOT_ANALYSIS_MAX_TOKENS", d.analysis_max_tokens),
            completion_timeout: get_env_secs("ASKERBOT_COMPLETION_TIMEOUT_SECS", 20),
            lexicon_good_enough: get_env_float("ASKERBOT_LEXICON_GOOD_ENOUGH", d.lexicon_good_enough),
            enriched_relevance_ratio: get_env_float(
                "ASKERBOT_ENRICHED_RELEVANCE_RATIO",
                d.enriched_relevance_ratio,
            ),
            local_relevance_ratio: get_env_float(
                "ASKERBOT_LOCAL_RELEVANCE_RATIO",
                d.local_relevance_ratio,
            ),
            heuristic_weight: get_env_float("ASKERBOT_HEURISTIC_WEIGHT", d.heuristic_weight),
            max_context_snippets: get_env_int("ASKERBOT_MAX_CONTEXT_SNIPPETS", d.max_context_snippets),
            max_citations: get_env_int("ASKERBOT_MAX_CITATIONS", d.max_citations),
            response_cache_ttl: get_env_secs("ASKERBOT_RESPONSE_CACHE_TTL_SECS", 10 * 60),
            response_cache_max: get_env_int("ASKERBOT_RESPONSE_CACHE_MAX", d.response_cache_max),
            search_cache_ttl: get_env_secs("ASKERBOT_SEARCH_CACHE_TTL_SECS", 30 * 60),
            search_cache_max: get_env_int("ASKERBOT_SEARCH_CACHE_MAX", d.search_cache_max),
            analysis_cache_ttl: get_env_secs("ASKERBOT_ANALYSIS_CACHE_TTL_SECS", 60 * 60),
            analysis_cache_max: get_env_int("ASKERBOT_ANALYSIS_CACHE_MAX", d.analysis_cache_max),
            index_cache_ttl: get_env_secs("ASKERBOT_INDEX_CACHE_TTL_SECS", 24 * 60 * 60),
            index_dir: env::var("ASKERBOT_INDEX_DIR")
                .map(PathBuf::from)
                .unwrap_or(d.index_dir),
        }
    }

    /// Whether error details may be shown to callers
    pub fn expose_error_details(&self) -> bool {
        !self.environment.eq_ignore_ascii_case("production")
    }
}
