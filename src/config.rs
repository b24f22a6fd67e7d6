//! Tracker configuration loaded from the environment (and an optional `.env`)

use std::time::Duration;

use crate::error::{AppError, Result};
use crate::modules::speed::{DEFAULT_SAMPLE_INTERVAL, DEFAULT_SAMPLE_WINDOW};

const ENV_SAMPLE_INTERVAL_MS: &str = "UPLOADPULSE_SAMPLE_INTERVAL_MS";
const ENV_SAMPLE_WINDOW: &str = "UPLOADPULSE_SAMPLE_WINDOW";
const ENV_EVENT_BUFFER: &str = "UPLOADPULSE_EVENT_BUFFER";

/// Default capacity of the inbound event channel
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Runtime knobs for the tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Minimum time between speed samples
    pub sample_interval: Duration,
    /// Number of speed samples averaged into the reported speed
    pub sample_window: usize,
    /// Capacity of the inbound event channel
    pub event_buffer: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            sample_window: DEFAULT_SAMPLE_WINDOW,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl TrackerConfig {
    /// Load from process environment after reading `.env` if present
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_SAMPLE_INTERVAL_MS)? {
            config.sample_interval = Duration::from_millis(ms);
        }
        if let Some(window) = parse_var::<usize, _>(&lookup, ENV_SAMPLE_WINDOW)? {
            if window == 0 {
                return Err(AppError::Config(format!(
                    "{ENV_SAMPLE_WINDOW} must be at least 1"
                )));
            }
            config.sample_window = window;
        }
        if let Some(buffer) = parse_var::<usize, _>(&lookup, ENV_EVENT_BUFFER)? {
            if buffer == 0 {
                return Err(AppError::Config(format!(
                    "{ENV_EVENT_BUFFER} must be at least 1"
                )));
            }
            config.event_buffer = buffer;
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<T>()
        .map(Some)
        .map_err(|e| AppError::Config(format!("Invalid {key} '{raw}': {e}")))
}
