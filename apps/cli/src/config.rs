use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context};
use client_core::{ApiFlavor, ControllerConfig};
use shared::domain::DEFAULT_MODEL;
use tracing::warn;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "vidgen.toml";
const MIN_POLL_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub model: String,
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
    pub api_flavor: ApiFlavor,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            model: DEFAULT_MODEL.into(),
            poll_interval_ms: 1_000,
            request_timeout_secs: 30,
            api_flavor: ApiFlavor::TaskQueue,
        }
    }
}

impl Settings {
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS)),
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
        }
    }
}

/// Defaults, then the config file, then environment variables. An explicitly
/// passed file must exist; the default `vidgen.toml` is optional.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    match fs::read_to_string(&path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound && config_path.is_none() => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()))
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    validate_server_url(&settings.server_url)?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg = toml::from_str::<HashMap<String, toml::Value>>(raw)?;
    let lookup = |key: &str| {
        file_cfg.get(key).map(|value| match value {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    };
    apply_source(settings, "config file", lookup, FILE_KEYS);
    Ok(())
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    apply_source(settings, "environment", lookup, ENV_KEYS);
}

#[derive(Clone, Copy)]
enum Field {
    ServerUrl,
    Model,
    PollIntervalMs,
    RequestTimeoutSecs,
    ApiFlavor,
}

const FILE_KEYS: &[(&str, Field)] = &[
    ("server_url", Field::ServerUrl),
    ("model", Field::Model),
    ("poll_interval_ms", Field::PollIntervalMs),
    ("request_timeout_secs", Field::RequestTimeoutSecs),
    ("api_flavor", Field::ApiFlavor),
];

// Later keys win, so the APP__ spelling overrides the short one.
const ENV_KEYS: &[(&str, Field)] = &[
    ("VIDGEN_SERVER_URL", Field::ServerUrl),
    ("APP__SERVER_URL", Field::ServerUrl),
    ("APP__MODEL", Field::Model),
    ("APP__POLL_INTERVAL_MS", Field::PollIntervalMs),
    ("APP__REQUEST_TIMEOUT_SECS", Field::RequestTimeoutSecs),
    ("APP__API_FLAVOR", Field::ApiFlavor),
];

fn apply_source(
    settings: &mut Settings,
    source: &str,
    lookup: impl Fn(&str) -> Option<String>,
    keys: &[(&str, Field)],
) {
    for &(key, field) in keys {
        let Some(value) = lookup(key) else {
            continue;
        };
        let value = value.trim().to_string();
        match field {
            Field::ServerUrl => settings.server_url = value,
            Field::Model if !value.is_empty() => settings.model = value,
            Field::Model => {}
            Field::PollIntervalMs => match value.parse::<u64>() {
                Ok(parsed) => settings.poll_interval_ms = parsed,
                Err(_) => warn!(source, key, %value, "ignoring non-numeric poll interval"),
            },
            Field::RequestTimeoutSecs => match value.parse::<u64>() {
                Ok(parsed) => settings.request_timeout_secs = parsed,
                Err(_) => warn!(source, key, %value, "ignoring non-numeric request timeout"),
            },
            Field::ApiFlavor => match value.parse::<ApiFlavor>() {
                Ok(parsed) => settings.api_flavor = parsed,
                Err(err) => warn!(source, key, "{err}"),
            },
        }
    }
}

pub fn validate_server_url(raw: &str) -> anyhow::Result<()> {
    let url = Url::parse(raw).with_context(|| format!("invalid server url '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("server url '{raw}' must use http or https");
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
