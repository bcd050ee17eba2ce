//! Everything that can happen to the core: shell input and capability replies.

use serde::{Deserialize, Serialize};

use crate::capabilities::{CallResult, LocationError, MessageResult};
use crate::dispatch::Slot;
use crate::{EpisodeId, PermissionStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Noop,

    AppStarted,
    ConfigProvided {
        json: String,
    },

    LocationPermissionRequested,
    LocationRequested,

    /// Press-in on the SOS button; `at_ms` is the shell clock.
    SosPressed {
        at_ms: u64,
    },
    SosReleased,

    ShareLocationRequested,
    AddContact {
        name: String,
        number: String,
    },
    DismissAlert,

    // Capability responses. Never sent by the shell directly.
    #[serde(skip)]
    LocationPermissionResult {
        status: PermissionStatus,
    },
    #[serde(skip)]
    LocationReceived(Result<(f64, f64), LocationError>),
    #[serde(skip)]
    HoldTick {
        episode: EpisodeId,
        now_ms: u64,
    },
    #[serde(skip)]
    CallResult {
        slot: Slot,
        result: CallResult,
    },
    #[serde(skip)]
    MessageResult {
        slot: Slot,
        result: MessageResult,
    },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::AppStarted => "app_started",
            Self::ConfigProvided { .. } => "config_provided",
            Self::LocationPermissionRequested => "location_permission_requested",
            Self::LocationRequested => "location_requested",
            Self::SosPressed { .. } => "sos_pressed",
            Self::SosReleased => "sos_released",
            Self::ShareLocationRequested => "share_location_requested",
            Self::AddContact { .. } => "add_contact",
            Self::DismissAlert => "dismiss_alert",
            Self::LocationPermissionResult { .. } => "location_permission_result",
            Self::LocationReceived(_) => "location_received",
            Self::HoldTick { .. } => "hold_tick",
            Self::CallResult { .. } => "call_result",
            Self::MessageResult { .. } => "message_result",
        }
    }

    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Self::LocationPermissionRequested
                | Self::LocationRequested
                | Self::SosPressed { .. }
                | Self::SosReleased
                | Self::ShareLocationRequested
                | Self::AddContact { .. }
                | Self::DismissAlert
        )
    }
}
