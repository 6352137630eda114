use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::gemini::TransientRetryPolicy;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_STORE_ROOT: &str = "temp";
pub const DEFAULT_SWEEP_AGE: Duration = Duration::from_secs(24 * 60 * 60);

const REQUEST_TIMEOUT_DEFAULT_SECS: f64 = 90.0;
const REQUEST_TIMEOUT_MIN_SECS: f64 = 15.0;
const REQUEST_TIMEOUT_MAX_SECS: f64 = 300.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub request_timeout: Duration,
    pub retry: TransientRetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs_f64(REQUEST_TIMEOUT_DEFAULT_SECS),
            retry: TransientRetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Reads `GEMINI_API_BASE`, `PICTURA_MODEL`, `PICTURA_REQUEST_TIMEOUT_SECS`
    /// and the API key variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: resolve_api_key(None).unwrap_or_default(),
            api_base: non_empty_env("GEMINI_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            model: non_empty_env("PICTURA_MODEL").unwrap_or(defaults.model),
            request_timeout: non_empty_env("PICTURA_REQUEST_TIMEOUT_SECS")
                .and_then(|raw| raw.parse::<f64>().ok())
                .filter(|value| value.is_finite())
                .map(|value| {
                    Duration::from_secs_f64(
                        value.clamp(REQUEST_TIMEOUT_MIN_SECS, REQUEST_TIMEOUT_MAX_SECS),
                    )
                })
                .unwrap_or(defaults.request_timeout),
            retry: defaults.retry,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn endpoint(&self) -> String {
        let trimmed = self.model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub root: PathBuf,
    pub sweep_age: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_STORE_ROOT),
            sweep_age: DEFAULT_SWEEP_AGE,
        }
    }
}

/// Explicit key first, then `GEMINI_API_KEY`, then `GOOGLE_API_KEY`.
pub fn resolve_api_key(explicit: Option<&str>) -> Option<String> {
    explicit
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| non_empty_env("GEMINI_API_KEY"))
        .or_else(|| non_empty_env("GOOGLE_API_KEY"))
}

/// Shows only the first and last four characters of a key.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.trim().chars().collect();
    if chars.is_empty() {
        return "[unset]".to_string();
    }
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Parses `KEY=VALUE` lines; blank lines and `#` comments are skipped and a
/// leading `export ` and surrounding quotes are stripped.
pub fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw_line in content.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let mut value = value.trim();
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            value = &value[1..value.len() - 1];
        }
        out.push((key.to_string(), value.to_string()));
    }
    out
}

/// Applies a `.env` file without overriding variables that are already set.
/// Returns how many variables were applied; a missing file applies none.
pub fn load_dotenv(path: &Path) -> usize {
    let Ok(content) = std::fs::read_to_string(path) else {
        return 0;
    };
    let mut applied = 0;
    for (key, value) in parse_dotenv(&content) {
        if env::var_os(&key).is_some() {
            continue;
        }
        env::set_var(&key, value);
        applied += 1;
    }
    tracing::debug!(path = %path.display(), applied, "loaded dotenv file");
    applied
}

pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
