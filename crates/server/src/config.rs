use std::{fs, io::ErrorKind, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use shared::domain::{validate_counter_name, DEFAULT_COUNTER_NAME};
use storage::UpdatedAtPolicy;

pub const SETTINGS_FILE: &str = "server.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    pub counter_name: String,
    pub status_revert_ms: u64,
    pub updated_at_policy: UpdatedAtPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            database_url: "sqlite://./data/counter.db".into(),
            counter_name: DEFAULT_COUNTER_NAME.into(),
            status_revert_ms: 2000,
            updated_at_policy: UpdatedAtPolicy::Touch,
        }
    }
}

impl Settings {
    pub fn status_revert(&self) -> Duration {
        Duration::from_millis(self.status_revert_ms)
    }
}

/// Keys accepted in `server.toml`. Everything is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    bind_addr: Option<String>,
    database_url: Option<String>,
    counter_name: Option<String>,
    status_revert_ms: Option<u64>,
    updated_at_policy: Option<UpdatedAtPolicy>,
}

/// Defaults, then `server.toml` in the working directory, then environment.
pub fn load_settings() -> anyhow::Result<Settings> {
    let settings = load_settings_file(Path::new(SETTINGS_FILE))?;
    let settings = apply_env(settings, |key| std::env::var(key).ok())?;
    validate_counter_name(&settings.counter_name).context("invalid counter_name setting")?;
    Ok(settings)
}

pub(crate) fn load_settings_file(path: &Path) -> anyhow::Result<Settings> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Settings::default()),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()))
        }
    };
    let file_cfg: FileSettings =
        toml::from_str(&raw).with_context(|| format!("failed to parse '{}'", path.display()))?;

    let mut settings = Settings::default();
    if let Some(v) = file_cfg.bind_addr {
        settings.server_bind = v;
    }
    if let Some(v) = file_cfg.database_url {
        settings.database_url = v;
    }
    if let Some(v) = file_cfg.counter_name {
        settings.counter_name = v;
    }
    if let Some(v) = file_cfg.status_revert_ms {
        settings.status_revert_ms = v;
    }
    if let Some(v) = file_cfg.updated_at_policy {
        settings.updated_at_policy = v;
    }
    Ok(settings)
}

/// Later keys win, so the `APP__` spelling overrides the bare one.
pub(crate) fn apply_env(
    mut settings: Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    for key in ["SERVER_BIND", "APP__BIND_ADDR"] {
        if let Some(v) = lookup(key) {
            settings.server_bind = v;
        }
    }
    for key in ["DATABASE_URL", "APP__DATABASE_URL"] {
        if let Some(v) = lookup(key) {
            settings.database_url = v;
        }
    }
    if let Some(v) = lookup("APP__COUNTER_NAME") {
        settings.counter_name = v;
    }
    if let Some(v) = lookup("APP__STATUS_REVERT_MS") {
        settings.status_revert_ms = v
            .trim()
            .parse()
            .with_context(|| format!("APP__STATUS_REVERT_MS is not a number: '{v}'"))?;
    }
    if let Some(v) = lookup("APP__UPDATED_AT_POLICY") {
        settings.updated_at_policy = v.parse()?;
    }
    Ok(settings)
}

/// Turns bare file paths and `sqlite:` shorthands into `sqlite://` URLs.
pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return format!("sqlite://{}", path.replace('\\', "/"));
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
