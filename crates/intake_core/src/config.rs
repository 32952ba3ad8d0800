use std::{fs, io::ErrorKind, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;

use crate::progress::ProgressPhase;

pub const DEFAULT_CONFIG_FILE: &str = "intake.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub upload_timeout_secs: u64,
    pub database_url: String,
    pub progress_phases: Vec<ProgressPhaseSetting>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProgressPhaseSetting {
    pub label: String,
    pub min_duration_ms: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".into(),
            request_timeout_secs: 30,
            upload_timeout_secs: 120,
            database_url: "sqlite://./data/intake.db".into(),
            progress_phases: [
                ("Validating your profile", 900),
                ("Applying deductions", 900),
                ("Comparing old and new regimes", 1100),
                ("Preparing your recommendation", 700),
            ]
            .into_iter()
            .map(|(label, min_duration_ms)| ProgressPhaseSetting {
                label: label.into(),
                min_duration_ms,
            })
            .collect(),
        }
    }
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn progress_phases(&self) -> Vec<ProgressPhase> {
        self.progress_phases
            .iter()
            .map(|phase| {
                ProgressPhase::new(
                    phase.label.clone(),
                    Duration::from_millis(phase.min_duration_ms),
                )
            })
            .collect()
    }
}

/// Defaults, then `intake.toml` in the working directory, then environment.
pub fn load_settings() -> anyhow::Result<ClientSettings> {
    load_settings_from(Path::new(DEFAULT_CONFIG_FILE))
}

pub fn load_settings_from(path: &Path) -> anyhow::Result<ClientSettings> {
    let settings = match fs::read_to_string(path) {
        Ok(raw) => toml::from_str::<ClientSettings>(&raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?,
        Err(err) if err.kind() == ErrorKind::NotFound => ClientSettings::default(),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()))
        }
    };
    Ok(apply_env_overrides(settings, |key| std::env::var(key).ok()))
}

pub fn apply_env_overrides(
    mut settings: ClientSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    if let Some(v) = lookup("INTAKE_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = lookup("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }
    if let Some(v) = lookup("APP__UPLOAD_TIMEOUT_SECS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.upload_timeout_secs = parsed;
        }
    }

    if let Some(v) = lookup("APP__DATABASE_URL") {
        settings.database_url = v;
    }
    settings.database_url = normalize_database_url(&settings.database_url);

    settings
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return ClientSettings::default().database_url;
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
