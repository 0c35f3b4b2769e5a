//! Pipeline configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result, RetryPolicy};

pub const DEFAULT_INDEX_NAME: &str = "wiki_qa_questions";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_SEARCH_URL: &str = "http://localhost:9200";
/// Largest result count a search may request (Elasticsearch's `index.max_result_window`)
pub const MAX_TOP_K: usize = 10_000;

/// Which search backend the pipeline talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackendKind {
    Elasticsearch,
    Local,
}

impl FromStr for SearchBackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "elasticsearch" | "es" => Ok(SearchBackendKind::Elasticsearch),
            "local" | "tantivy" => Ok(SearchBackendKind::Local),
            other => Err(Error::Configuration(format!(
                "unknown search backend '{}', expected 'elasticsearch' or 'local'",
                other
            ))),
        }
    }
}

/// Search backend address and credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub backend: SearchBackendKind,
    pub url: String,
    pub username: String,
    pub password: Option<String>,
    /// On-disk location for the local backend; RAM when unset
    pub index_dir: Option<PathBuf>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: SearchBackendKind::Elasticsearch,
            url: DEFAULT_SEARCH_URL.to_string(),
            username: "elastic".to_string(),
            password: None,
            index_dir: None,
        }
    }
}

/// Everything the pipeline needs apart from generation-backend credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub search: SearchConfig,
    pub index_name: String,
    pub top_k: usize,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    pub model_id: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            index_name: DEFAULT_INDEX_NAME.to_string(),
            top_k: 5,
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(60),
            model_id: DEFAULT_MODEL.to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the process environment (and `.env`, if present)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = match get("QARAG_SEARCH_BACKEND") {
            Some(raw) => raw.parse()?,
            None => defaults.search.backend,
        };

        // An in-memory index does not outlive the process that built it.
        let index_dir = get("QARAG_INDEX_DIR").map(PathBuf::from);
        if backend == SearchBackendKind::Local && index_dir.is_none() {
            return Err(Error::Configuration(
                "QARAG_SEARCH_BACKEND=local requires QARAG_INDEX_DIR".to_string(),
            ));
        }

        let search = SearchConfig {
            backend,
            url: get("ELASTICSEARCH_URL").unwrap_or(defaults.search.url),
            username: get("ELASTIC_SEARCH_USER").unwrap_or(defaults.search.username),
            password: get("ELASTIC_SEARCH_PWD"),
            index_dir,
        };

        let top_k: usize = parse_or(&get, "QARAG_TOP_K", defaults.top_k)?;
        if top_k == 0 || top_k > MAX_TOP_K {
            return Err(Error::Configuration(format!(
                "QARAG_TOP_K must be between 1 and {}",
                MAX_TOP_K
            )));
        }

        let max_attempts: u32 =
            parse_or(&get, "QARAG_CONNECT_RETRIES", defaults.retry.max_attempts)?;
        if max_attempts == 0 {
            return Err(Error::Configuration(
                "QARAG_CONNECT_RETRIES must be greater than zero".to_string(),
            ));
        }

        let interval_secs: u64 = parse_or(
            &get,
            "QARAG_CONNECT_INTERVAL_SECS",
            defaults.retry.interval.as_secs(),
        )?;
        let timeout_secs: u64 = parse_or(
            &get,
            "QARAG_REQUEST_TIMEOUT_SECS",
            defaults.request_timeout.as_secs(),
        )?;

        Ok(Self {
            search,
            index_name: get("QARAG_INDEX_NAME").unwrap_or(defaults.index_name),
            top_k,
            retry: RetryPolicy::new(max_attempts, Duration::from_secs(interval_secs)),
            request_timeout: Duration::from_secs(timeout_secs),
            model_id: get("QARAG_MODEL").unwrap_or(defaults.model_id),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            Error::Configuration(format!("{} has an invalid value '{}'", key, raw))
        }),
        None => Ok(default),
    }
}
