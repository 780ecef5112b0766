use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_url: String,
    pub outline_path: PathBuf,
    pub host: String,
    pub port: u16,
    /// Directory for daily rotated log files; stdout when unset
    pub log_dir: Option<PathBuf>,
    pub notifier: NotifierConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://database/langprogress.db".to_string(),
            outline_path: PathBuf::from("course.toml"),
            host: "127.0.0.1".to_string(),
            port: 8080,
            log_dir: None,
            notifier: NotifierConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// HTTP mail relay endpoint. Notices are only logged when unset.
    pub relay_url: Option<String>,
    pub from: String,
    pub timeout_secs: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            relay_url: None,
            from: "LangProgress <noreply@langprogress.com>".to_string(),
            timeout_secs: 10,
        }
    }
}

impl NotifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Read the TOML config file, or the defaults when no path is given
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Secret used to verify `auth-token` cookies
    pub fn jwt_secret() -> anyhow::Result<String> {
        let _ = dotenvy::dotenv();
        dotenvy::var("JWT_SECRET").context("JWT_SECRET is not set")
    }

    /// Bearer token for the mail relay, if any
    pub fn relay_token() -> Option<String> {
        let _ = dotenvy::dotenv();
        dotenvy::var("MAIL_RELAY_TOKEN").ok()
    }
}
