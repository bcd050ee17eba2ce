//! App state held between events, and the alert shown to the user.

use serde::{Deserialize, Serialize};

use crate::{AlertSession, AppError};

pub const SHARE_SUCCESS_MESSAGE: &str = "Location shared successfully!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    #[default]
    Info,
    Success,
    Error,
}

/// A blocking informational alert. At most one is shown at a time; a newer
/// one replaces the current one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertNotice {
    pub message: String,
    pub kind: NoticeKind,
    pub code: Option<String>,
    /// Whether repeating the action that raised this alert may succeed.
    pub retryable: bool,
}

impl AlertNotice {
    #[must_use]
    pub fn new(message: impl Into<String>, kind: NoticeKind) -> Self {
        Self {
            message: message.into(),
            kind,
            code: None,
            retryable: false,
        }
    }
}

impl From<&AppError> for AlertNotice {
    fn from(e: &AppError) -> Self {
        Self {
            message: e.user_facing_message(),
            kind: NoticeKind::Error,
            code: Some(e.code().to_string()),
            retryable: e.is_retryable(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Model {
    pub session: AlertSession,
    pub active_alert: Option<AlertNotice>,
    pub is_fetching_location: bool,
}

impl Model {
    pub fn show_alert(&mut self, message: impl Into<String>, kind: NoticeKind) {
        self.active_alert = Some(AlertNotice::new(message, kind));
    }

    pub fn set_error(&mut self, error: impl Into<AppError>) {
        let error = error.into();
        self.active_alert = Some(AlertNotice::from(&error));
    }

    pub fn clear_alert(&mut self) {
        self.active_alert = None;
    }
}
