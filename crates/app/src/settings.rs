//! Handles settings for the application. Configuration is written in
//! `settings.toml` and can be overridden with `TRIPSPLIT_<SECTION>__<KEY>`
//! environment variables (e.g. `TRIPSPLIT_APP__LEVEL=debug`).
//!
//! See `settings.example.toml` for the configuration.
use std::path::{Path, PathBuf};

use chrono::Duration;
use config::{Config, Environment, File};
use engine::{EngineConfig, MoneyCents};
use serde::Deserialize;

use crate::error::{AppError, Result};

const DEFAULT_CONFIG_PATH: &str = "settings";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Store {
    /// JSON snapshot of the trip database.
    pub path: PathBuf,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            path: PathBuf::from("tripsplit.json"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Engine {
    /// Decimal amount, e.g. `"0.01"`.
    pub split_tolerance: Option<String>,
    pub session_ttl_minutes: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub store: Store,
    pub engine: Engine,
}

impl Settings {
    /// Loads `path`, or `./settings.toml` when present, then the environment.
    pub fn new(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_PATH).required(false),
        };
        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("TRIPSPLIT")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = EngineConfig::default();
        if let Some(raw) = &self.engine.split_tolerance {
            let tolerance: MoneyCents = raw
                .parse()
                .map_err(|_| AppError::Usage(format!("invalid engine.split_tolerance: {raw}")))?;
            if tolerance.is_negative() {
                return Err(AppError::Usage(
                    "engine.split_tolerance must not be negative".to_string(),
                ));
            }
            config.split_tolerance = tolerance;
        }
        if let Some(minutes) = self.engine.session_ttl_minutes {
            if minutes <= 0 {
                return Err(AppError::Usage(
                    "engine.session_ttl_minutes must be positive".to_string(),
                ));
            }
            config.session_ttl = Duration::try_minutes(minutes).ok_or_else(|| {
                AppError::Usage("engine.session_ttl_minutes is too large".to_string())
            })?;
        }
        Ok(config)
    }
}
