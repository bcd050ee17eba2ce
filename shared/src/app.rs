//! The Crux app: event handling and the view model.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::capabilities::{CallOutput, Capabilities, MessageStatus};
use crate::dispatch::{Channel, Slot};
use crate::model::SHARE_SUCCESS_MESSAGE;
use crate::{
    AlertConfig, AlertNotice, AppError, CallChannel, DispatchEngine, DispatchError,
    DispatchReport, EpisodeId, ErrorKind, Event, HoldTick, MessageChannel, Model, NoticeKind,
    PermissionStatus, RecipientOutcome, SessionError, APP_TITLE,
};

pub const FETCHING_LOCATION_TEXT: &str = "Fetching location...";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReportView {
    pub total: usize,
    pub pending: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl From<&DispatchReport> for ReportView {
    fn from(r: &DispatchReport) -> Self {
        Self {
            total: r.len(),
            pending: r.pending_count(),
            succeeded: r.succeeded_count(),
            failed: r.failed_count(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub title: String,
    /// "Latitude: …" / "Longitude: …", or the fetching placeholder.
    pub location_lines: Vec<String>,
    pub is_fetching_location: bool,
    pub permission: PermissionStatus,
    pub is_holding: bool,
    pub hold_progress: f64,
    /// "name: number", in insertion order.
    pub contacts: Vec<String>,
    pub alert: Option<AlertNotice>,
    pub last_calls: Option<ReportView>,
    pub last_messages: Option<ReportView>,
}

/// Routes dispatch through the shell capabilities. Replies come back as
/// `Event::CallResult` / `Event::MessageResult` tagged with their slot.
struct ShellChannels<'a> {
    caps: &'a Capabilities,
}

impl CallChannel for ShellChannels<'_> {
    fn place_call(&self, slot: Slot, dial_uri: &Url) {
        self.caps
            .telephony
            .dial(dial_uri.as_str(), move |result| Event::CallResult { slot, result });
    }
}

impl MessageChannel for ShellChannels<'_> {
    fn send_message(&self, slot: Slot, recipient: &str, body: &str) {
        self.caps
            .messaging
            .send(recipient, body, move |result| Event::MessageResult { slot, result });
    }
}

#[derive(Default)]
pub struct App;

impl App {
    fn request_permission(model: &Model, caps: &Capabilities) {
        if model.session.location().cached_permission().is_some() {
            debug!("location permission already granted");
            return;
        }
        caps.location
            .request_permission(|status| Event::LocationPermissionResult { status });
    }

    fn arm_wake_up(model: &Model, caps: &Capabilities, episode: EpisodeId) {
        let after_ms = model.session.hold().poll_interval_ms();
        caps.timer.wake_after(episode, after_ms, move |output| Event::HoldTick {
            episode,
            now_ms: output.now_ms,
        });
    }

    /// Turns a shell-reported failure into a report outcome, naming the
    /// number the slot was issued to.
    fn failed_outcome(
        model: &Model,
        channel: Channel,
        slot: Slot,
        reason: String,
    ) -> RecipientOutcome {
        let number = model
            .session
            .recipient_for(channel, slot)
            .unwrap_or_default()
            .to_string();
        let error = match channel {
            Channel::Call => DispatchError::CallFailed { number, reason },
            Channel::Message => DispatchError::MessageFailed { number, reason },
        };
        let error = AppError::from(error)
            .with_context("alert", slot.alert.to_string())
            .with_context("index", slot.index.to_string());
        warn!(
            code = error.code(),
            retryable = error.is_retryable(),
            error = %error,
            "dispatch failed"
        );
        RecipientOutcome::Failed {
            reason: error.message,
        }
    }

    fn apply_config_json(model: &mut Model, json: &str) -> Result<(), SessionError> {
        let config = AlertConfig::from_json(json)?;
        model.session.apply_config(config)
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        debug!(
            event = event.name(),
            user_initiated = event.is_user_initiated(),
            "update"
        );

        match event {
            Event::Noop => {}

            Event::AppStarted => {
                Self::request_permission(model, caps);
                caps.render.render();
            }

            Event::ConfigProvided { json } => {
                if let Err(e) = Self::apply_config_json(model, &json) {
                    warn!(error = %e, "alert config rejected");
                    model.set_error(e);
                }
                caps.render.render();
            }

            Event::LocationPermissionRequested => {
                Self::request_permission(model, caps);
            }

            Event::LocationPermissionResult { status } => {
                let status = model.session.location_mut().record_permission(status);
                if status.is_denied() {
                    model.set_error(AppError::new(
                        ErrorKind::PermissionDenied,
                        "location permission denied",
                    ));
                }
                caps.render.render();
            }

            Event::LocationRequested => {
                match model.session.location().begin_fetch() {
                    Ok(()) => {
                        model.is_fetching_location = true;
                        caps.location.get_current_position(Event::LocationReceived);
                    }
                    Err(e) => model.set_error(e),
                }
                caps.render.render();
            }

            Event::LocationReceived(result) => {
                model.is_fetching_location = false;
                let recorded = result.and_then(|(latitude, longitude)| {
                    model.session.location_mut().record_fix(latitude, longitude)
                });
                match recorded {
                    Ok(snapshot) => {
                        info!(
                            latitude = snapshot.latitude(),
                            longitude = snapshot.longitude(),
                            "location updated"
                        );
                    }
                    Err(e) => {
                        model.session.location().record_failure(&e);
                        model.set_error(e);
                    }
                }
                caps.render.render();
            }

            Event::SosPressed { at_ms } => {
                match model.session.hold_mut().press_down(at_ms) {
                    Ok(episode) => Self::arm_wake_up(model, caps, episode),
                    Err(e) => debug!(error = %e, "press ignored"),
                }
                caps.render.render();
            }

            Event::SosReleased => {
                if let Some(episode) = model.session.hold_mut().press_up() {
                    debug!(%episode, "released before confirmation");
                }
                caps.render.render();
            }

            Event::HoldTick { episode, now_ms } => {
                match model.session.hold_mut().tick(episode, now_ms) {
                    HoldTick::Stale => {}
                    HoldTick::Waiting { .. } => {
                        Self::arm_wake_up(model, caps, episode);
                        caps.render.render();
                    }
                    HoldTick::Confirmed(trigger) => {
                        let channels = ShellChannels { caps };
                        let engine = DispatchEngine::new(&channels, &channels);
                        model.session.on_confirmed_trigger(trigger, &engine);
                        caps.render.render();
                    }
                }
            }

            Event::ShareLocationRequested => {
                let channels = ShellChannels { caps };
                let engine = DispatchEngine::new(&channels, &channels);
                match model.session.on_share_location_requested(&engine) {
                    // Shown before any delivery outcome is known.
                    Ok(_) => model.show_alert(SHARE_SUCCESS_MESSAGE, NoticeKind::Success),
                    Err(e) => model.set_error(e),
                }
                caps.render.render();
            }

            Event::AddContact { name, number } => {
                if let Err(e) = model.session.add_contact(&name, &number) {
                    model.set_error(e);
                }
                caps.render.render();
            }

            Event::DismissAlert => {
                model.clear_alert();
                caps.render.render();
            }

            Event::CallResult { slot, result } => {
                let outcome = match result {
                    Ok(CallOutput::Initiated) => RecipientOutcome::Initiated,
                    Err(e) => Self::failed_outcome(model, Channel::Call, slot, e.to_string()),
                };
                model.session.record_outcome(Channel::Call, slot, outcome);
                caps.render.render();
            }

            Event::MessageResult { slot, result } => {
                let outcome = match result {
                    Ok(MessageStatus::Sent) => RecipientOutcome::Sent,
                    Ok(MessageStatus::Cancelled) => RecipientOutcome::Cancelled,
                    Ok(MessageStatus::Unknown) => RecipientOutcome::Unknown,
                    Err(e) => {
                        Self::failed_outcome(model, Channel::Message, slot, e.to_string())
                    }
                };
                model.session.record_outcome(Channel::Message, slot, outcome);
                caps.render.render();
            }
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        let session = &model.session;
        let location_lines = match session.location().last_snapshot() {
            Some(snapshot) => vec![
                format!("Latitude: {}", snapshot.latitude()),
                format!("Longitude: {}", snapshot.longitude()),
            ],
            None => vec![FETCHING_LOCATION_TEXT.to_string()],
        };

        ViewModel {
            title: APP_TITLE.to_string(),
            location_lines,
            is_fetching_location: model.is_fetching_location,
            permission: session.location().permission(),
            is_holding: session.hold().is_holding(),
            hold_progress: session.hold().progress(),
            contacts: session
                .contacts()
                .list_contacts()
                .iter()
                .map(|c| format!("{}: {}", c.name(), c.number()))
                .collect(),
            alert: model.active_alert.clone(),
            last_calls: session.last_call_report().map(ReportView::from),
            last_messages: session.last_message_report().map(ReportView::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use crux_core::testing::AppTester;

    use super::*;
    use crate::capabilities::{LocationOperation, LocationOutput};
    use crate::Effect;

    #[test]
    fn test_initial_view() {
        let app = AppTester::<App, Effect>::default();
        let model = Model::default();
        let view = app.view(&model);

        assert_eq!(view.title, "Safe Pulse");
        assert_eq!(view.location_lines, vec!["Fetching location..."]);
        assert!(!view.is_holding);
        assert!(view.contacts.is_empty());
        assert!(view.alert.is_none());
    }

    #[test]
    fn test_app_started_requests_permission() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();

        let update = app.update(Event::AppStarted, &mut model);
        let mut requests = update.effects.into_iter().filter_map(|effect| match effect {
            Effect::Location(request) => Some(request),
            _ => None,
        });
        let mut request = requests.next().unwrap();
        assert_eq!(request.operation, LocationOperation::RequestPermission);

        let update = app
            .resolve(&mut request, Ok(LocationOutput::Permission(PermissionStatus::Denied)))
            .unwrap();
        for event in update.events {
            app.update(event, &mut model);
        }

        assert_eq!(
            model.active_alert.as_ref().map(|a| a.message.as_str()),
            Some("Permission to access location was denied")
        );
    }

    #[test]
    fn test_get_location_without_permission_alerts() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();

        let update = app.update(Event::LocationRequested, &mut model);
        assert!(!update
            .effects
            .iter()
            .any(|effect| matches!(effect, Effect::Location(_))));
        assert_eq!(
            model.active_alert.as_ref().map(|a| a.message.as_str()),
            Some("Location permission is required")
        );
    }

    #[test]
    fn test_add_contact_updates_view() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();

        app.update(
            Event::AddContact {
                name: "Alice".into(),
                number: "555-1111".into(),
            },
            &mut model,
        );
        app.update(
            Event::AddContact {
                name: "".into(),
                number: "123".into(),
            },
            &mut model,
        );

        let view = app.view(&model);
        assert_eq!(view.contacts, vec!["Alice: 555-1111"]);
        assert_matches!(
            view.alert,
            Some(AlertNotice { kind: NoticeKind::Error, ref message, .. })
                if message == "Please provide both name and number"
        );

        app.update(Event::DismissAlert, &mut model);
        assert!(app.view(&model).alert.is_none());
    }

    #[test]
    fn test_invalid_config_keeps_defaults() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();

        app.update(
            Event::ConfigProvided {
                json: r#"{"helplines": ["112", "112"]}"#.into(),
            },
            &mut model,
        );
        assert_eq!(model.session.config(), &AlertConfig::default());
        assert_eq!(
            model.active_alert.as_ref().and_then(|a| a.code.as_deref()),
            Some("CONFIG_ERROR")
        );

        app.update(
            Event::ConfigProvided {
                json: r#"{"helplines": ["112", "181"]}"#.into(),
            },
            &mut model,
        );
        assert_eq!(model.session.config().helplines, ["112".to_string(), "181".to_string()]);
    }
}
