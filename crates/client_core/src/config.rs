use std::{fs, io, path::Path, time::Duration};

use serde::Deserialize;
use shared::domain::{RepoQuery, SortDirection, SortKey};
use thiserror::Error;

use crate::gateway::DEFAULT_PAGE_SIZE;

pub const DEFAULT_CONFIG_FILE: &str = "github_users.toml";
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com/";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read { path: String, source: io::Error },
    #[error("invalid config file '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub token: Option<String>,
    pub user_agent: String,
    pub page_size: u32,
    pub search_debounce_ms: u64,
    pub request_timeout_secs: u64,
    pub repo_sort: SortKey,
    pub repo_direction: SortDirection,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            token: None,
            user_agent: "github-users-client".into(),
            page_size: DEFAULT_PAGE_SIZE,
            search_debounce_ms: 500,
            request_timeout_secs: 30,
            repo_sort: SortKey::Updated,
            repo_direction: SortDirection::Desc,
        }
    }
}

impl Settings {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// First page of the owner's repositories in the configured order.
    pub fn repo_query(&self) -> RepoQuery {
        RepoQuery {
            page: 1,
            per_page: self.page_size,
            sort: self.repo_sort,
            direction: self.repo_direction,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_base_url: Option<String>,
    token: Option<String>,
    user_agent: Option<String>,
    page_size: Option<u32>,
    search_debounce_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
    repo_sort: Option<SortKey>,
    repo_direction: Option<SortDirection>,
}

/// Defaults, then `github_users.toml` in the working directory, then the
/// process environment.
pub fn load_settings() -> Result<Settings, ConfigError> {
    load_settings_from(Path::new(DEFAULT_CONFIG_FILE), |key| std::env::var(key).ok())
}

/// A missing file is not an error; a malformed one is.
pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Settings, ConfigError> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => {
            let file_cfg: FileSettings =
                toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                    path: path.display().to_string(),
                    source,
                })?;
            apply_file_settings(&mut settings, file_cfg);
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            })
        }
    }

    apply_env_overrides(&mut settings, env)?;
    settings.token = normalize_token(settings.token.take());
    Ok(settings)
}

fn apply_file_settings(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.api_base_url {
        settings.api_base_url = v;
    }
    if let Some(v) = file_cfg.token {
        settings.token = Some(v);
    }
    if let Some(v) = file_cfg.user_agent {
        settings.user_agent = v;
    }
    if let Some(v) = file_cfg.page_size {
        settings.page_size = v;
    }
    if let Some(v) = file_cfg.search_debounce_ms {
        settings.search_debounce_ms = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.repo_sort {
        settings.repo_sort = v;
    }
    if let Some(v) = file_cfg.repo_direction {
        settings.repo_direction = v;
    }
}

fn apply_env_overrides(
    settings: &mut Settings,
    env: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(v) = env("GITHUB_TOKEN") {
        settings.token = Some(v);
    }
    if let Some(v) = env("APP__GITHUB_TOKEN") {
        settings.token = Some(v);
    }
    if let Some(v) = env("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = env("APP__USER_AGENT") {
        settings.user_agent = v;
    }
    if let Some(v) = env("APP__PAGE_SIZE") {
        settings.page_size = parse_number("APP__PAGE_SIZE", v)?;
    }
    if let Some(v) = env("APP__SEARCH_DEBOUNCE_MS") {
        settings.search_debounce_ms = parse_number("APP__SEARCH_DEBOUNCE_MS", v)?;
    }
    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        settings.request_timeout_secs = parse_number("APP__REQUEST_TIMEOUT_SECS", v)?;
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}

fn normalize_token(token: Option<String>) -> Option<String> {
    token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
