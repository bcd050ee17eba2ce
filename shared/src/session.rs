//! The alert session: everything the app knows between two events.
//!
//! `AlertSession` owns the contact registry, the hold timer, the location
//! provider and the most recent dispatch report per channel. The app layer
//! translates events into calls on the session and hands it a
//! [`DispatchEngine`] wired to the shell.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::dispatch::{Channel, Slot};
use crate::{
    build_share_message, AlertConfig, AppError, CallChannel, ConfigError, Contact, ContactError,
    ContactRegistry, DispatchEngine, DispatchReport, ErrorKind, HoldError, HoldTimer,
    LocationProvider, MessageChannel, RecipientOutcome, Trigger,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no location has been fetched yet")]
    NoLocationAvailable,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Hold(#[from] HoldError),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NoLocationAvailable => {
                AppError::new(ErrorKind::NoLocationAvailable, e.to_string())
            }
            SessionError::Config(inner) => inner.into(),
            SessionError::Hold(inner) => inner.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertSession {
    config: AlertConfig,
    contacts: ContactRegistry,
    location: LocationProvider,
    hold: HoldTimer,
    last_call_report: Option<DispatchReport>,
    last_message_report: Option<DispatchReport>,
}

impl AlertSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AlertConfig) -> Result<Self, SessionError> {
        let mut session = Self::new();
        session.apply_config(config)?;
        Ok(session)
    }

    #[must_use]
    pub const fn config(&self) -> &AlertConfig {
        &self.config
    }

    #[must_use]
    pub const fn contacts(&self) -> &ContactRegistry {
        &self.contacts
    }

    #[must_use]
    pub const fn location(&self) -> &LocationProvider {
        &self.location
    }

    pub fn location_mut(&mut self) -> &mut LocationProvider {
        &mut self.location
    }

    #[must_use]
    pub const fn hold(&self) -> &HoldTimer {
        &self.hold
    }

    pub fn hold_mut(&mut self) -> &mut HoldTimer {
        &mut self.hold
    }

    #[must_use]
    pub const fn last_call_report(&self) -> Option<&DispatchReport> {
        self.last_call_report.as_ref()
    }

    #[must_use]
    pub const fn last_message_report(&self) -> Option<&DispatchReport> {
        self.last_message_report.as_ref()
    }

    /// Validates and installs a new config. Rejected while the trigger is
    /// held; on any error the previous config stays active.
    pub fn apply_config(&mut self, config: AlertConfig) -> Result<(), SessionError> {
        let config = config.normalized();
        config.validate()?;
        self.hold.reconfigure(&config)?;
        info!(helplines = ?config.helplines, threshold_ms = config.confirm_threshold_ms, "alert config applied");
        self.config = config;
        Ok(())
    }

    pub fn add_contact(&mut self, name: &str, number: &str) -> Result<&Contact, ContactError> {
        self.contacts.add_contact(name, number)
    }

    /// Calls both helplines, then every non-helpline contact. Needs no location.
    pub fn on_confirmed_trigger<C, M>(
        &mut self,
        trigger: Trigger,
        engine: &DispatchEngine<'_, C, M>,
    ) -> &DispatchReport
    where
        C: CallChannel,
        M: MessageChannel,
    {
        let targets = self.contacts.call_recipients(&self.config);
        info!(episode = %trigger.episode, held_ms = trigger.held_ms, "SOS confirmed");
        self.last_call_report
            .insert(engine.dispatch_calls(&targets))
    }

    /// Sends the last snapshot to every non-helpline contact. Fails without
    /// dispatching anything when no location has been fetched.
    pub fn on_share_location_requested<C, M>(
        &mut self,
        engine: &DispatchEngine<'_, C, M>,
    ) -> Result<&DispatchReport, SessionError>
    where
        C: CallChannel,
        M: MessageChannel,
    {
        let Some(snapshot) = self.location.last_snapshot() else {
            warn!("share requested before any location fix");
            return Err(SessionError::NoLocationAvailable);
        };
        let body = build_share_message(snapshot, &self.config)?;
        let targets = self.contacts.message_recipients(&self.config);
        Ok(self
            .last_message_report
            .insert(engine.dispatch_messages(&targets, &body)))
    }

    fn report(&self, channel: Channel) -> Option<&DispatchReport> {
        match channel {
            Channel::Call => self.last_call_report.as_ref(),
            Channel::Message => self.last_message_report.as_ref(),
        }
    }

    /// The number a slot was issued to, if the slot belongs to the latest
    /// dispatch on that channel.
    #[must_use]
    pub fn recipient_for(&self, channel: Channel, slot: Slot) -> Option<&str> {
        self.report(channel)
            .filter(|report| report.alert() == slot.alert)
            .and_then(|report| report.entries().get(slot.index))
            .map(|entry| entry.recipient.as_str())
    }

    /// Folds a late platform reply into the report it belongs to.
    pub fn record_outcome(
        &mut self,
        channel: Channel,
        slot: Slot,
        outcome: RecipientOutcome,
    ) -> bool {
        let report = match channel {
            Channel::Call => self.last_call_report.as_mut(),
            Channel::Message => self.last_message_report.as_mut(),
        };
        match report {
            Some(report) => report.record(slot, outcome),
            None => false,
        }
    }
}
