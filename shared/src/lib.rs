// lib.rs - Safe Pulse shared core

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod app;
pub mod capabilities;
pub mod config;
pub mod contacts;
pub mod dispatch;
pub mod event;
pub mod hold;
pub mod location;
pub mod model;
pub mod session;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub use app::{App, ViewModel};
pub use capabilities::{Capabilities, Effect};
pub use config::{AlertConfig, ConfigError};
pub use contacts::{Contact, ContactError, ContactRegistry};
pub use dispatch::{
    build_share_message, dial_uri, normalize_number, AlertId, CallChannel, Channel, DispatchEngine,
    DispatchError, DispatchReport, MessageChannel, RecipientOutcome, ReportEntry, Slot,
};
pub use event::Event;
pub use hold::{EpisodeId, HoldError, HoldState, HoldTick, HoldTimer, Trigger};
pub use location::{LocationProvider, LocationSnapshot, PermissionStatus};
pub use model::{AlertNotice, Model, NoticeKind};
pub use session::{AlertSession, SessionError};

pub const POLICE_HELPLINE: &str = "100";
pub const WOMEN_HELPLINE: &str = "1091";
pub const CONFIRM_THRESHOLD_MS: u64 = 4000;
pub const HOLD_POLL_INTERVAL_MS: u64 = 100;
pub const DEFAULT_MAP_BASE_URL: &str = "https://maps.google.com/";
pub const SHARE_MESSAGE_PREFIX: &str = "My current location is:";
pub const APP_TITLE: &str = "Safe Pulse";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    PermissionRequired,
    PermissionDenied,
    LocationUnavailable,
    Validation,
    CallInitiation,
    MessageDispatch,
    NoLocationAvailable,
    Configuration,
    InvalidState,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::PermissionRequired => "PERMISSION_REQUIRED",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::LocationUnavailable => "LOCATION_UNAVAILABLE",
            Self::Validation => "VALIDATION_ERROR",
            Self::CallInitiation => "CALL_INITIATION_FAILED",
            Self::MessageDispatch => "MESSAGE_DISPATCH_FAILED",
            Self::NoLocationAvailable => "NO_LOCATION_AVAILABLE",
            Self::Configuration => "CONFIG_ERROR",
            Self::InvalidState => "INVALID_STATE",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::LocationUnavailable | Self::CallInitiation | Self::MessageDispatch => {
                ErrorSeverity::Transient
            }

            Self::InvalidState => ErrorSeverity::Fatal,

            Self::PermissionRequired
            | Self::PermissionDenied
            | Self::Validation
            | Self::NoLocationAvailable
            | Self::Configuration => ErrorSeverity::Permanent,
        }
    }

    /// Retries are always manual; this only tells the shell whether offering one makes sense.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::LocationUnavailable
                | Self::PermissionDenied
                | Self::CallInitiation
                | Self::MessageDispatch
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable() && !matches!(self.severity, ErrorSeverity::Fatal)
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::PermissionRequired => "Location permission is required".into(),
            ErrorKind::PermissionDenied => "Permission to access location was denied".into(),
            ErrorKind::LocationUnavailable => {
                format!("Error getting location: {}", self.message)
            }
            ErrorKind::NoLocationAvailable => {
                "No location available yet. Use \"Get My Location\" first.".into()
            }
            ErrorKind::Validation | ErrorKind::CallInitiation | ErrorKind::MessageDispatch => {
                self.message.clone()
            }
            ErrorKind::Configuration => {
                "The alert settings could not be applied. Previous settings are still active."
                    .into()
            }
            ErrorKind::InvalidState => {
                "The app is in an invalid state. Please restart the app.".into()
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoordinateError {
    #[error("Latitude {0} is out of valid range [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("Longitude {0} is out of valid range [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("Coordinate value is not finite (NaN or Infinity)")]
    NonFinite,
}

impl From<CoordinateError> for AppError {
    fn from(e: CoordinateError) -> Self {
        AppError::new(ErrorKind::LocationUnavailable, e.to_string())
    }
}
