//! Alert configuration delivered by the shell at startup.
//!
//! Every field has a default, so an empty JSON object (or no config at all)
//! yields the stock helplines and the 4 s hold threshold.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::dispatch::normalize_number;
use crate::{
    AppError, ErrorKind, CONFIRM_THRESHOLD_MS, DEFAULT_MAP_BASE_URL, HOLD_POLL_INTERVAL_MS,
    POLICE_HELPLINE, SHARE_MESSAGE_PREFIX, WOMEN_HELPLINE,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config is not valid JSON: {0}")]
    Parse(String),
    #[error("helpline number {index} is empty")]
    EmptyHelpline { index: usize },
    #[error("both helplines are set to {0}")]
    DuplicateHelpline(String),
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },
    #[error("poll interval {interval_ms} ms exceeds confirm threshold {threshold_ms} ms")]
    PollSlowerThanThreshold { interval_ms: u64, threshold_ms: u64 },
    #[error("map base url is invalid: {0}")]
    InvalidMapBase(String),
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::new(ErrorKind::Configuration, e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Called first and second on every confirmed trigger, in this order.
    pub helplines: [String; 2],
    pub confirm_threshold_ms: u64,
    pub poll_interval_ms: u64,
    pub map_base_url: String,
    pub share_message_prefix: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            helplines: [POLICE_HELPLINE.to_string(), WOMEN_HELPLINE.to_string()],
            confirm_threshold_ms: CONFIRM_THRESHOLD_MS,
            poll_interval_ms: HOLD_POLL_INTERVAL_MS,
            map_base_url: DEFAULT_MAP_BASE_URL.to_string(),
            share_message_prefix: SHARE_MESSAGE_PREFIX.to_string(),
        }
    }
}

impl AlertConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let config = config.normalized();
        config.validate()?;
        Ok(config)
    }

    /// Trims the helpline numbers. Applied to every config before it is installed.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        for helpline in &mut self.helplines {
            *helpline = helpline.trim().to_string();
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, helpline) in self.helplines.iter().enumerate() {
            if helpline.trim().is_empty() {
                return Err(ConfigError::EmptyHelpline { index });
            }
        }
        if dial_key(&self.helplines[0]) == dial_key(&self.helplines[1]) {
            return Err(ConfigError::DuplicateHelpline(self.helplines[0].clone()));
        }
        if self.confirm_threshold_ms == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "confirm_threshold_ms",
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "poll_interval_ms",
            });
        }
        if self.poll_interval_ms > self.confirm_threshold_ms {
            return Err(ConfigError::PollSlowerThanThreshold {
                interval_ms: self.poll_interval_ms,
                threshold_ms: self.confirm_threshold_ms,
            });
        }
        self.map_base()?;
        Ok(())
    }

    pub fn map_base(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.map_base_url)
            .map_err(|e| ConfigError::InvalidMapBase(e.to_string()))?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::InvalidMapBase(self.map_base_url.clone()));
        }
        Ok(url)
    }

    /// Matches on the dialed form, so `10-0` or `(100)` is the `100` helpline.
    #[must_use]
    pub fn is_helpline(&self, number: &str) -> bool {
        let key = dial_key(number);
        self.helplines.iter().any(|h| dial_key(h) == key)
    }
}

/// The number as it would be dialed; undialable input compares trimmed.
fn dial_key(number: &str) -> String {
    normalize_number(number).unwrap_or_else(|_| number.trim().to_string())
}
