use crate::error::{ErrorCode, SpendgraphError};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParamsError {
    #[error("invalid parameter header: {0}")]
    InvalidHeader(String),
    #[error("missing network parameter {0}")]
    Missing(&'static str),
    #[error("network parameter {name} is not an integer: {value}")]
    NotAnInteger { name: &'static str, value: String },
    #[error("network parameter {name} must not be negative: {value}")]
    Negative { name: &'static str, value: i64 },
}

impl SpendgraphError for ParamsError {
    fn error_code(&self) -> ErrorCode {
        ErrorCode::InvalidConfig
    }
}

/// Process-wide network parameters, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParams {
    /// `D`: maximum hop distance of a user's network.
    pub degree: usize,
    /// `T`: number of most recent purchases used for statistics.
    pub tracked_purchases: usize,
}

impl NetworkParams {
    pub fn new(degree: usize, tracked_purchases: usize) -> Self {
        Self {
            degree,
            tracked_purchases,
        }
    }

    /// Validate raw signed values, refusing negatives instead of clamping.
    pub fn try_from_signed(degree: i64, tracked_purchases: i64) -> Result<Self, ParamsError> {
        Ok(Self::new(
            non_negative("D", degree)?,
            non_negative("T", tracked_purchases)?,
        ))
    }

    /// Parse the batch log header, e.g. `{"D":"3", "T":"50"}`.
    ///
    /// Both keys are required; values may be JSON integers or strings holding
    /// an integer.
    pub fn from_header(line: &str) -> Result<Self, ParamsError> {
        let value: Value = serde_json::from_str(line.trim())
            .map_err(|e| ParamsError::InvalidHeader(e.to_string()))?;
        let object = value
            .as_object()
            .ok_or_else(|| ParamsError::InvalidHeader("expected a JSON object".to_string()))?;

        let degree = integer_field(object.get("D"), "D")?;
        let tracked = integer_field(object.get("T"), "T")?;
        Self::try_from_signed(degree, tracked)
    }
}

fn integer_field(value: Option<&Value>, name: &'static str) -> Result<i64, ParamsError> {
    let value = value.ok_or(ParamsError::Missing(name))?;
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ParamsError::NotAnInteger {
        name,
        value: value.to_string(),
    })
}

fn non_negative(name: &'static str, value: i64) -> Result<usize, ParamsError> {
    usize::try_from(value).map_err(|_| ParamsError::Negative { name, value })
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub batch_log: PathBuf,
    pub stream_log: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub flagged_purchases: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueueConfig {
    pub capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub queue: QueueConfig,
}

/// Values that take precedence over every other configuration source.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub batch_log: Option<String>,
    pub stream_log: Option<String>,
    pub flagged_purchases: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(&ConfigOverrides::default())
    }

    pub fn load_with(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            .set_default("input.batch_log", "log_input/batch_log.json")?
            .set_default("input.stream_log", "log_input/stream_log.json")?
            .set_default("output.flagged_purchases", "log_output/flagged_purchases.json")?
            .set_default("queue.capacity", 1024_i64)?;

        builder = match &overrides.config_file {
            Some(path) => builder.add_source(File::from(path.as_path())),
            None => builder
                .add_source(File::with_name("config/default").required(false))
                .add_source(File::with_name(&format!("config/{}", run_mode)).required(false)),
        };

        let builder = builder
            .add_source(
                Environment::with_prefix("SPENDGRAPH")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override_option("input.batch_log", overrides.batch_log.clone())?
            .set_override_option("input.stream_log", overrides.stream_log.clone())?
            .set_override_option(
                "output.flagged_purchases",
                overrides.flagged_purchases.clone(),
            )?;

        let config: AppConfig = builder.build()?.try_deserialize()?;
        if config.queue.capacity == 0 {
            return Err(ConfigError::Message(
                "queue.capacity must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }
}
