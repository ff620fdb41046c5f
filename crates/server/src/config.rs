use std::{fs, path::Path};

use game_api::OpponentConfig;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_bind: String,
    pub allowed_origins: Vec<String>,
    pub computer_min_delay_ms: u64,
    pub computer_max_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let opponent = OpponentConfig::default();
        Self {
            server_bind: "127.0.0.1:5130".into(),
            allowed_origins: vec!["http://localhost:3000".into()],
            computer_min_delay_ms: opponent.min_delay_ms,
            computer_max_delay_ms: opponent.max_delay_ms,
        }
    }
}

impl Settings {
    /// Thinking delay with the bounds put in order.
    pub fn opponent(&self) -> OpponentConfig {
        OpponentConfig {
            min_delay_ms: self.computer_min_delay_ms.min(self.computer_max_delay_ms),
            max_delay_ms: self.computer_min_delay_ms.max(self.computer_max_delay_ms),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    bind_addr: Option<String>,
    allowed_origins: Option<Vec<String>>,
    computer_min_delay_ms: Option<u64>,
    computer_max_delay_ms: Option<u64>,
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new("server.toml"), |key| std::env::var(key).ok())
}

/// Defaults, then the optional TOML file, then environment overrides.
pub fn load_settings_from<F>(file: &Path, env: F) -> Settings
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(file) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => apply_file(&mut settings, file_cfg),
            Err(error) => warn!(path = %file.display(), %error, "ignoring unreadable settings file"),
        }
    }

    if let Some(v) = env("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = env("APP__ALLOWED_ORIGINS") {
        settings.allowed_origins = parse_origins(&v);
    }

    if let Some(v) = env("APP__COMPUTER_MIN_DELAY_MS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.computer_min_delay_ms = parsed,
            Err(error) => warn!(value = %v, %error, "invalid APP__COMPUTER_MIN_DELAY_MS"),
        }
    }
    if let Some(v) = env("APP__COMPUTER_MAX_DELAY_MS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.computer_max_delay_ms = parsed,
            Err(error) => warn!(value = %v, %error, "invalid APP__COMPUTER_MAX_DELAY_MS"),
        }
    }

    settings
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.bind_addr {
        settings.server_bind = v;
    }
    if let Some(v) = file_cfg.allowed_origins {
        settings.allowed_origins = v;
    }
    if let Some(v) = file_cfg.computer_min_delay_ms {
        settings.computer_min_delay_ms = v;
    }
    if let Some(v) = file_cfg.computer_max_delay_ms {
        settings.computer_max_delay_ms = v;
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
