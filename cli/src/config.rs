use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Result, WrapErr};
use livewind::{FieldPolicy, DEFAULT_POINTS, MAX_SPAN};
use serde::Deserialize;

/// Settings from the optional TOML config file. Command line flags take
/// precedence over anything set here.
///
/// ```toml
/// points = 288
/// max_span = "7days"
/// data_dir = "/var/lib/livewind"
///
/// [policy]
/// gust = "max"
/// wind = "mean"
/// timestamp = "mean"
/// direction = "circular:360"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub points: NonZeroUsize,
    #[serde(with = "humantime_serde")]
    pub max_span: Duration,
    pub data_dir: PathBuf,
    pub policy: FieldPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            points: DEFAULT_POINTS,
            max_span: MAX_SPAN,
            data_dir: PathBuf::from("data"),
            policy: FieldPolicy::wind(),
        }
    }
}

impl Config {
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Config::default());
        };
        let text = tokio::fs::read_to_string(path)
            .await
            .wrap_err_with(|| format!("read config {}", path.display()))?;
        Config::parse(&text).wrap_err_with(|| format!("parse config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        if config.policy.is_empty() {
            eyre::bail!("policy table is empty");
        }
        if config.max_span.is_zero() {
            eyre::bail!("max_span must be positive");
        }
        Ok(config)
    }
}
