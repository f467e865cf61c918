use std::{collections::HashMap, fs, path::Path};

use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::error::ClientError;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";
pub const SETTINGS_FILE: &str = "rover_console.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub server_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
        }
    }
}

impl Settings {
    /// Validated base address with any trailing slash removed.
    pub fn server_base(&self) -> Result<String, ClientError> {
        normalize_server_url(&self.server_url)
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(
        Path::new(SETTINGS_FILE),
        |key| std::env::var(key).ok(),
    )
}

/// File values override defaults; `ROVER_SERVER_URL` overrides the file and
/// `APP__SERVER_URL` overrides both.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, String>>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.get("server_url") {
                    settings.server_url = v.clone();
                }
            }
            Err(err) => warn!(path = %path.display(), %err, "ignoring unreadable settings file"),
        }
    }

    if let Some(v) = env("ROVER_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }

    settings
}

pub fn normalize_server_url(raw: &str) -> Result<String, ClientError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let invalid = |reason: String| ClientError::InvalidBaseUrl {
        address: raw.to_string(),
        reason,
    };
    let parsed = Url::parse(trimmed).map_err(|err| invalid(err.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(invalid(format!(
            "scheme must be http or https, got {other}"
        ))),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
