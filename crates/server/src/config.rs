use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use storage::StoreKind;
use tracing::warn;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server_bind: String,
    pub store: StoreKind,
    /// Directory served for every path outside `/api`. Ignored when missing.
    pub static_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: format!("{DEFAULT_HOST}:{DEFAULT_PORT}"),
            store: StoreKind::Memory,
            static_dir: PathBuf::from("./dist"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    bind_addr: Option<String>,
    store: Option<String>,
    static_dir: Option<String>,
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string("server.toml") {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<FileConfig>(raw) {
        Ok(cfg) => cfg,
        Err(error) => {
            warn!(%error, "ignoring malformed server.toml");
            return;
        }
    };
    if let Some(v) = file_cfg.bind_addr {
        settings.server_bind = v;
    }
    if let Some(v) = file_cfg.store {
        set_store(settings, &v);
    }
    if let Some(v) = file_cfg.static_dir {
        settings.static_dir = PathBuf::from(v);
    }
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    let host = lookup("HOST");
    let port = lookup("PORT").and_then(|raw| match raw.trim().parse::<u16>() {
        Ok(port) => Some(port),
        Err(error) => {
            warn!(%raw, %error, "ignoring invalid PORT");
            None
        }
    });
    if host.is_some() || port.is_some() {
        let (current_host, current_port) = match settings.server_bind.rsplit_once(':') {
            Some((current_host, current_port)) => (current_host.to_string(), current_port.to_string()),
            None => (settings.server_bind.clone(), DEFAULT_PORT.to_string()),
        };
        let host = host.unwrap_or(current_host);
        let port = port.map_or(current_port, |port| port.to_string());
        settings.server_bind = format!("{host}:{port}");
    }

    if let Some(v) = lookup("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = lookup("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = lookup("APP__STORE") {
        set_store(settings, &v);
    }

    if let Some(v) = lookup("APP__STATIC_DIR") {
        settings.static_dir = PathBuf::from(v);
    }
}

fn set_store(settings: &mut Settings, raw: &str) {
    match raw.parse::<StoreKind>() {
        Ok(kind) => settings.store = kind,
        Err(error) => warn!(%error, "keeping store '{}'", settings.store),
    }
}

/// Returns the static directory only when it can actually be served.
pub fn static_dir_if_present(settings: &Settings) -> Option<&Path> {
    let dir = settings.static_dir.as_path();
    dir.is_dir().then_some(dir)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;

