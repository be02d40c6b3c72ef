use std::{fs, time::Duration};

use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080/api";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub server_url: Url,
    pub request_timeout: Option<Duration>,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    server_url: Option<String>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default)]
struct RawSettings {
    server_url: Option<String>,
    request_timeout_secs: Option<u64>,
}

/// Reads `radius.toml` from the working directory, then the environment.
pub fn load_settings() -> Result<ClientSettings> {
    let file = fs::read_to_string("radius.toml").ok();
    resolve(file.as_deref(), |key| std::env::var(key).ok())
}

fn resolve(
    file: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ClientSettings> {
    let mut raw = RawSettings::default();

    if let Some(contents) = file {
        let file_cfg: FileConfig =
            toml::from_str(contents).context("failed to parse radius.toml")?;
        raw.server_url = file_cfg.server_url;
        raw.request_timeout_secs = file_cfg.request_timeout_secs;
    }

    if let Some(v) = lookup("RADIUS_SERVER_URL") {
        raw.server_url = Some(v);
    }
    if let Some(v) = lookup("APP__SERVER_URL") {
        raw.server_url = Some(v);
    }
    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        let secs = v
            .trim()
            .parse::<u64>()
            .with_context(|| format!("invalid APP__REQUEST_TIMEOUT_SECS '{v}'"))?;
        raw.request_timeout_secs = Some(secs);
    }

    let server_url = raw.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL);
    Ok(ClientSettings {
        server_url: parse_server_url(server_url)?,
        request_timeout: raw
            .request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs),
    })
}

pub fn parse_server_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("invalid server url '{raw}'"))?;
    anyhow::ensure!(
        matches!(url.scheme(), "http" | "https"),
        "server url must use http or https, got '{}'",
        url.scheme()
    );
    Ok(url)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
