//! Named endpoint configurations with one active entry, persisted as JSON.
//!
//! The registry is the only shared mutable state in the crate. A single
//! mutex guards reads and writes so a request is never built from a
//! half-updated configuration; [`EndpointRegistry::active`] hands out a
//! snapshot clone. Every mutation rewrites the backing file before
//! returning.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

/// Name of the reserved endpoint that always exists and cannot be removed.
pub const DEFAULT_ENDPOINT: &str = "default";

const FALLBACK_URL: &str = "http://3.108.164.82:1428/upload";
const FALLBACK_TIMEOUT: u64 = 30;
const FALLBACK_MAX_RETRIES: u32 = 3;
const FALLBACK_RETRY_BACKOFF: f64 = 1.0;

/// A single named OCR endpoint configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub name: String,
    pub url: String,
    /// Per-attempt request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Retries allowed after the initial attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base backoff in seconds; doubles per retry.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff: f64,
    #[serde(default)]
    pub description: String,
    /// Extra headers applied to every request to this endpoint.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub auth_required: bool,
    #[serde(default)]
    pub auth_token: String,
}

fn default_timeout() -> u64 {
    FALLBACK_TIMEOUT
}

fn default_max_retries() -> u32 {
    FALLBACK_MAX_RETRIES
}

fn default_retry_backoff() -> f64 {
    FALLBACK_RETRY_BACKOFF
}

impl EndpointConfig {
    /// Create a config with defaults for everything but name and URL.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            timeout: FALLBACK_TIMEOUT,
            max_retries: FALLBACK_MAX_RETRIES,
            retry_backoff: FALLBACK_RETRY_BACKOFF,
            description: String::new(),
            headers: HashMap::new(),
            auth_required: false,
            auth_token: String::new(),
        }
    }

    /// The reserved `default` endpoint, built from the process environment.
    ///
    /// Reads `OCR_API_URL`, `REQUEST_TIMEOUT`, `MAX_RETRIES` and
    /// `RETRY_DELAY`, falling back to built-in values for anything unset or
    /// unparseable.
    pub fn from_env() -> Self {
        Self {
            name: DEFAULT_ENDPOINT.to_string(),
            url: env_or("OCR_API_URL", FALLBACK_URL),
            timeout: env_parse("REQUEST_TIMEOUT", FALLBACK_TIMEOUT),
            max_retries: env_parse("MAX_RETRIES", FALLBACK_MAX_RETRIES),
            retry_backoff: env_parse("RETRY_DELAY", FALLBACK_RETRY_BACKOFF),
            description: "Default OCR API endpoint".to_string(),
            ..Self::new(DEFAULT_ENDPOINT, FALLBACK_URL)
        }
    }

    /// Set the per-attempt timeout in seconds.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Set the retry budget.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the base backoff in seconds.
    pub fn with_retry_backoff(mut self, seconds: f64) -> Self {
        self.retry_backoff = seconds;
        self
    }

    /// Set the human-readable description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

fn env_or(key: &str, fallback: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| fallback.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(fallback)
}

/// One row of [`EndpointRegistry::list`].
#[derive(Debug, Clone, Serialize)]
pub struct EndpointSummary {
    pub name: String,
    pub url: String,
    pub description: String,
    pub active: bool,
    pub timeout: u64,
    pub auth_required: bool,
}

/// Registry mutation failures.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no endpoint named {0:?}")]
    UnknownEndpoint(String),

    #[error("the {DEFAULT_ENDPOINT:?} endpoint is reserved and cannot be removed")]
    ReservedEndpoint,

    #[error("failed to persist endpoint configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("endpoint configuration is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk shape of the registry.
#[derive(Debug, Serialize, Deserialize)]
struct RegistryFile {
    active_endpoint: String,
    endpoints: HashMap<String, EndpointConfig>,
}

struct RegistryState {
    active: String,
    endpoints: HashMap<String, EndpointConfig>,
}

/// Mutex-guarded set of named endpoint configs with one active entry.
pub struct EndpointRegistry {
    path: PathBuf,
    state: Mutex<RegistryState>,
}

impl EndpointRegistry {
    /// Load the registry from `path`, seeding a fresh one around the
    /// environment-derived `default` entry when the file is missing or
    /// unreadable.
    ///
    /// A loaded document is repaired to uphold the invariants: the
    /// `default` entry is re-created if absent and a dangling active name
    /// is reset to `default`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref().to_path_buf();
        let state = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RegistryFile>(&contents) {
                Ok(file) => {
                    let mut state = RegistryState {
                        active: file.active_endpoint,
                        endpoints: file.endpoints,
                    };
                    repair(&mut state);
                    info!(
                        count = state.endpoints.len(),
                        path = %path.display(),
                        "loaded endpoint registry"
                    );
                    state
                }
                Err(err) => {
                    warn!(path = %path.display(), %err, "endpoint config unreadable, recreating");
                    seed_state()
                }
            },
            Err(_) => seed_state(),
        };

        let registry = Self {
            path,
            state: Mutex::new(state),
        };
        registry.save(&registry.locked())?;
        Ok(registry)
    }

    /// Snapshot of the active endpoint configuration.
    ///
    /// Falls back to `default`, and as a last resort to the
    /// environment-derived config, so callers always get something usable.
    pub fn active(&self) -> EndpointConfig {
        let state = self.locked();
        state
            .endpoints
            .get(&state.active)
            .or_else(|| state.endpoints.get(DEFAULT_ENDPOINT))
            .cloned()
            .unwrap_or_else(EndpointConfig::from_env)
    }

    /// Name of the active endpoint.
    pub fn active_name(&self) -> String {
        self.locked().active.clone()
    }

    /// Switch the active endpoint.
    pub fn set_active(&self, name: &str) -> Result<(), RegistryError> {
        let mut state = self.locked();
        if !state.endpoints.contains_key(name) {
            return Err(RegistryError::UnknownEndpoint(name.to_string()));
        }
        state.active = name.to_string();
        self.save(&state)?;
        info!(endpoint = name, "switched active endpoint");
        Ok(())
    }

    /// Add a new endpoint, or overwrite an existing one of the same name.
    pub fn add(&self, config: EndpointConfig) -> Result<(), RegistryError> {
        let mut state = self.locked();
        info!(endpoint = %config.name, url = %config.url, "registered endpoint");
        state.endpoints.insert(config.name.clone(), config);
        self.save(&state)
    }

    /// Remove an endpoint. The `default` entry is reserved; removing the
    /// active entry falls back to `default`.
    pub fn remove(&self, name: &str) -> Result<(), RegistryError> {
        if name == DEFAULT_ENDPOINT {
            return Err(RegistryError::ReservedEndpoint);
        }
        let mut state = self.locked();
        if state.endpoints.remove(name).is_none() {
            return Err(RegistryError::UnknownEndpoint(name.to_string()));
        }
        if state.active == name {
            state.active = DEFAULT_ENDPOINT.to_string();
        }
        self.save(&state)?;
        info!(endpoint = name, "removed endpoint");
        Ok(())
    }

    /// Mutate an existing endpoint in place. The registry key stays
    /// authoritative for the name, whatever the closure does to it.
    pub fn update(
        &self,
        name: &str,
        mutate: impl FnOnce(&mut EndpointConfig),
    ) -> Result<(), RegistryError> {
        let mut state = self.locked();
        let config = state
            .endpoints
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownEndpoint(name.to_string()))?;
        mutate(config);
        config.name = name.to_string();
        self.save(&state)?;
        info!(endpoint = name, "updated endpoint");
        Ok(())
    }

    /// Summaries of every endpoint, sorted by name.
    pub fn list(&self) -> Vec<EndpointSummary> {
        let state = self.locked();
        let mut rows: Vec<EndpointSummary> = state
            .endpoints
            .values()
            .map(|config| EndpointSummary {
                name: config.name.clone(),
                url: config.url.clone(),
                description: config.description.clone(),
                active: config.name == state.active,
                timeout: config.timeout,
                auth_required: config.auth_required,
            })
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        rows
    }

    fn locked(&self) -> MutexGuard<'_, RegistryState> {
        // A poisoned lock only means another thread panicked mid-mutation;
        // the state itself is still a coherent map.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn save(&self, state: &RegistryState) -> Result<(), RegistryError> {
        let file = RegistryFile {
            active_endpoint: state.active.clone(),
            endpoints: state.endpoints.clone(),
        };
        let contents = serde_json::to_string_pretty(&file)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

fn seed_state() -> RegistryState {
    let default = EndpointConfig::from_env();
    let mut endpoints = HashMap::new();
    endpoints.insert(default.name.clone(), default);
    RegistryState {
        active: DEFAULT_ENDPOINT.to_string(),
        endpoints,
    }
}

fn repair(state: &mut RegistryState) {
    if !state.endpoints.contains_key(DEFAULT_ENDPOINT) {
        warn!("endpoint config lost its default entry, recreating");
        let default = EndpointConfig::from_env();
        state.endpoints.insert(default.name.clone(), default);
    }
    if !state.endpoints.contains_key(&state.active) {
        warn!(active = %state.active, "active endpoint missing, resetting to default");
        state.active = DEFAULT_ENDPOINT.to_string();
    }
}
