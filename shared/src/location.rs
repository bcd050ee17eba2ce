//! One-shot location acquisition, gated on permission.
//!
//! The provider holds no platform handle. It decides whether a fetch may be
//! issued and validates what the shell sends back; the `Location` capability
//! does the actual request.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use crate::capabilities::{LocationError, PermissionStatus};
use crate::CoordinateError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSnapshot {
    latitude: f64,
    longitude: f64,
}

impl LocationSnapshot {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(CoordinateError::NonFinite);
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    #[must_use]
    pub const fn latitude(self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub const fn longitude(self) -> f64 {
        self.longitude
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationProvider {
    permission: PermissionStatus,
    last_snapshot: Option<LocationSnapshot>,
}

impl LocationProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn permission(&self) -> PermissionStatus {
        self.permission
    }

    /// Returns the known answer when permission was already granted, so a
    /// repeated request does not prompt the user again.
    #[must_use]
    pub const fn cached_permission(&self) -> Option<PermissionStatus> {
        if self.permission.is_granted() {
            Some(PermissionStatus::Granted)
        } else {
            None
        }
    }

    pub fn record_permission(&mut self, status: PermissionStatus) -> PermissionStatus {
        let status = match status {
            // The platform must answer; an undetermined reply counts as a denial.
            PermissionStatus::NotDetermined => PermissionStatus::Denied,
            other => other,
        };
        if status.is_denied() {
            warn!("location permission denied");
        } else {
            debug!("location permission granted");
        }
        self.permission = status;
        status
    }

    /// Checks the precondition for a fresh fetch. Nothing is cached: every
    /// successful check is followed by a new platform request.
    pub fn begin_fetch(&self) -> Result<(), LocationError> {
        if self.permission.is_granted() {
            Ok(())
        } else {
            Err(LocationError::PermissionRequired)
        }
    }

    /// Replaces the previous snapshot with the new fix.
    pub fn record_fix(
        &mut self,
        latitude: f64,
        longitude: f64,
    ) -> Result<LocationSnapshot, LocationError> {
        let snapshot = LocationSnapshot::new(latitude, longitude)
            .map_err(|e| LocationError::InvalidPosition(e.to_string()))?;
        self.last_snapshot = Some(snapshot);
        Ok(snapshot)
    }

    /// A failed fetch leaves the previous snapshot in place.
    pub fn record_failure(&self, error: &LocationError) {
        warn!(error = %error, has_previous = self.last_snapshot.is_some(), "location fetch failed");
    }

    #[must_use]
    pub const fn last_snapshot(&self) -> Option<LocationSnapshot> {
        self.last_snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_validation() {
        assert!(LocationSnapshot::new(12.9716, 77.5946).is_ok());
        assert!(LocationSnapshot::new(90.0, -180.0).is_ok());
        assert_eq!(
            LocationSnapshot::new(91.0, 0.0),
            Err(CoordinateError::LatitudeOutOfRange(91.0))
        );
        assert_eq!(
            LocationSnapshot::new(0.0, 180.5),
            Err(CoordinateError::LongitudeOutOfRange(180.5))
        );
        assert_eq!(
            LocationSnapshot::new(f64::NAN, 0.0),
            Err(CoordinateError::NonFinite)
        );
    }

    #[test]
    fn test_fetch_requires_permission() {
        let mut provider = LocationProvider::new();
        assert_eq!(provider.begin_fetch(), Err(LocationError::PermissionRequired));

        provider.record_permission(PermissionStatus::Denied);
        assert_eq!(provider.begin_fetch(), Err(LocationError::PermissionRequired));

        provider.record_permission(PermissionStatus::Granted);
        assert_eq!(provider.begin_fetch(), Ok(()));
    }

    #[test]
    fn test_granted_permission_is_cached() {
        let mut provider = LocationProvider::new();
        assert_eq!(provider.cached_permission(), None);
        provider.record_permission(PermissionStatus::Denied);
        assert_eq!(provider.cached_permission(), None);
        provider.record_permission(PermissionStatus::Granted);
        assert_eq!(provider.cached_permission(), Some(PermissionStatus::Granted));
    }

    #[test]
    fn test_undetermined_reply_counts_as_denied() {
        let mut provider = LocationProvider::new();
        assert_eq!(
            provider.record_permission(PermissionStatus::NotDetermined),
            PermissionStatus::Denied
        );
    }

    #[test]
    fn test_new_fix_supersedes_previous() {
        let mut provider = LocationProvider::new();
        provider.record_permission(PermissionStatus::Granted);
        provider.record_fix(1.0, 2.0).unwrap();
        let second = provider.record_fix(3.0, 4.0).unwrap();
        assert_eq!(provider.last_snapshot(), Some(second));
        assert_eq!(second.latitude(), 3.0);
        assert_eq!(second.longitude(), 4.0);
    }

    #[test]
    fn test_failure_keeps_previous_snapshot() {
        let mut provider = LocationProvider::new();
        provider.record_permission(PermissionStatus::Granted);
        let first = provider.record_fix(1.0, 2.0).unwrap();

        provider.record_failure(&LocationError::Timeout);
        assert_eq!(provider.last_snapshot(), Some(first));

        assert!(matches!(
            provider.record_fix(200.0, 0.0),
            Err(LocationError::InvalidPosition(_))
        ));
        assert_eq!(provider.last_snapshot(), Some(first));
    }
}
