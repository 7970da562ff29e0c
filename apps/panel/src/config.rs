use std::{collections::HashMap, fs, io, path::Path, time::Duration};

use anyhow::Context;

use client_core::PollOverlapPolicy;
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "panel.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub poll_interval_ms: u64,
    pub overlap_policy: PollOverlapPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".into(),
            poll_interval_ms: 2000,
            overlap_policy: PollOverlapPolicy::LastArrivalWins,
        }
    }
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Defaults, then the config file, then environment overrides.
///
/// An explicit `path` must be readable; without one, `panel.toml` is used
/// when present.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{}'", path.display()))?;
            apply_file(&mut settings, &raw);
        }
        None => match fs::read_to_string(DEFAULT_CONFIG_PATH) {
            Ok(raw) => apply_file(&mut settings, &raw),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => warn!(%error, path = DEFAULT_CONFIG_PATH, "ignoring panel config"),
        },
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings.server_url = normalize_server_url(&settings.server_url);
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<HashMap<String, toml::Value>>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(error) => {
            warn!(%error, "ignoring unreadable panel config");
            return;
        }
    };

    if let Some(v) = file_cfg.get("server_url").and_then(toml::Value::as_str) {
        settings.server_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("poll_interval_ms") {
        let parsed = match v {
            toml::Value::Integer(ms) => u64::try_from(*ms).ok(),
            toml::Value::String(ms) => ms.trim().parse().ok(),
            _ => None,
        };
        set_poll_interval(settings, parsed);
    }
    if let Some(v) = file_cfg.get("overlap_policy").and_then(toml::Value::as_str) {
        set_overlap_policy(settings, v);
    }
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("PICO_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = lookup("APP__POLL_INTERVAL_MS") {
        set_poll_interval(settings, v.trim().parse().ok());
    }

    if let Some(v) = lookup("APP__OVERLAP_POLICY") {
        set_overlap_policy(settings, &v);
    }
}

fn set_poll_interval(settings: &mut Settings, parsed: Option<u64>) {
    match parsed {
        Some(ms) if ms > 0 => settings.poll_interval_ms = ms,
        _ => warn!("ignoring invalid poll interval; must be a positive number of milliseconds"),
    }
}

fn set_overlap_policy(settings: &mut Settings, raw: &str) {
    match raw.parse() {
        Ok(policy) => settings.overlap_policy = policy,
        Err(error) => warn!(%error, "ignoring overlap policy"),
    }
}

/// Accepts `host:port`, bare hosts and full URLs; yields `scheme://host[:port][/path]`
/// without a trailing slash.
pub fn normalize_server_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return Settings::default().server_url;
    }

    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };

    with_scheme.trim_end_matches('/').to_string()
}
