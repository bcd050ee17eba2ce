use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AppError, ErrorKind};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    #[default]
    NotDetermined,
    Granted,
    Denied,
}

impl PermissionStatus {
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }

    #[must_use]
    pub const fn is_denied(self) -> bool {
        matches!(self, Self::Denied)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "data")]
pub enum LocationOperation {
    RequestPermission,
    GetCurrentPosition,
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
pub enum LocationError {
    #[error("location permission is required")]
    PermissionRequired,

    #[error("location services are disabled")]
    ServiceDisabled,

    #[error("location request timed out")]
    Timeout,

    #[error("{reason}")]
    Unavailable { reason: String },

    #[error("platform returned an invalid position: {0}")]
    InvalidPosition(String),
}

impl LocationError {
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

impl From<LocationError> for AppError {
    fn from(e: LocationError) -> Self {
        match e {
            LocationError::PermissionRequired => {
                AppError::new(ErrorKind::PermissionRequired, e.to_string())
            }
            LocationError::ServiceDisabled
            | LocationError::Timeout
            | LocationError::Unavailable { .. }
            | LocationError::InvalidPosition(_) => {
                AppError::new(ErrorKind::LocationUnavailable, e.to_string())
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum LocationOutput {
    Permission(PermissionStatus),
    Position { latitude: f64, longitude: f64 },
}

pub type LocationResult = Result<LocationOutput, LocationError>;

impl Operation for LocationOperation {
    type Output = LocationResult;
}

pub struct Location<Ev> {
    context: CapabilityContext<LocationOperation, Ev>,
}

impl<Ev> Capability<Ev> for Location<Ev> {
    type Operation = LocationOperation;
    type MappedSelf<MappedEv> = Location<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Location::new(self.context.map_event(f))
    }
}

impl<Ev> Location<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<LocationOperation, Ev>) -> Self {
        Self { context }
    }

    /// Always resolves: a platform error is reported as `Denied`.
    pub fn request_permission<F>(&self, callback: F)
    where
        F: FnOnce(PermissionStatus) -> Ev + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let status = match context
                .request_from_shell(LocationOperation::RequestPermission)
                .await
            {
                Ok(LocationOutput::Permission(status)) => status,
                Ok(LocationOutput::Position { .. }) | Err(_) => PermissionStatus::Denied,
            };
            context.update_app(callback(status));
        });
    }

    pub fn get_current_position<F>(&self, callback: F)
    where
        F: FnOnce(Result<(f64, f64), LocationError>) -> Ev + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = match context
                .request_from_shell(LocationOperation::GetCurrentPosition)
                .await
            {
                Ok(LocationOutput::Position {
                    latitude,
                    longitude,
                }) => Ok((latitude, longitude)),
                Ok(LocationOutput::Permission(_)) => Err(LocationError::unavailable(
                    "unexpected permission output for a position request",
                )),
                Err(e) => Err(e),
            };
            context.update_app(callback(result));
        });
    }
}
