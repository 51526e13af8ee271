use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "auditor.toml";
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    server_url: Option<String>,
    request_timeout_secs: Option<u64>,
}

/// Defaults, then the config file, then environment variables. An explicit
/// `config_path` must exist; the default `auditor.toml` is optional.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (path, required) = match config_path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };
    match fs::read_to_string(&path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid config file {}", path.display()))?,
        Err(err) if required => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
        Err(_) => {}
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings.server_url = normalize_server_url(&settings.server_url);
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    // A zero timeout would fail every request; keep the default instead.
    if let Some(v) = file_cfg.request_timeout_secs.filter(|v| *v > 0) {
        settings.request_timeout_secs = v;
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("AUDITOR_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = lookup("AUDITOR_REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed @ 1..) = v.trim().parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }
}

pub fn normalize_server_url(raw_server_url: &str) -> String {
    let raw_server_url = raw_server_url.trim();

    if raw_server_url.is_empty() {
        return DEFAULT_SERVER_URL.to_string();
    }

    let with_scheme = if raw_server_url.contains("://") {
        raw_server_url.to_string()
    } else {
        format!("http://{raw_server_url}")
    };

    with_scheme.trim_end_matches('/').to_string()
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
