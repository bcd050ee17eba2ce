//! Fan-out of an alert over the call and message channels.
//!
//! Each recipient is issued independently and in order. A recipient that
//! cannot be issued (malformed number) is recorded as failed and the batch
//! carries on. The engine never waits for the platform: outcomes arrive later
//! and are folded into the [`DispatchReport`] by the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::{AlertConfig, AppError, ConfigError, ErrorKind, LocationSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertId(pub Uuid);

impl AlertId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for AlertId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchError {
    #[error("{number} is not a dialable number: {reason}")]
    MalformedNumber { number: String, reason: String },
    #[error("call to {number} could not be started: {reason}")]
    CallFailed { number: String, reason: String },
    #[error("message to {number} failed: {reason}")]
    MessageFailed { number: String, reason: String },
}

impl From<DispatchError> for AppError {
    fn from(e: DispatchError) -> Self {
        let kind = match &e {
            DispatchError::MalformedNumber { .. } | DispatchError::CallFailed { .. } => {
                ErrorKind::CallInitiation
            }
            DispatchError::MessageFailed { .. } => ErrorKind::MessageDispatch,
        };
        AppError::new(kind, e.to_string())
    }
}

/// Identifies one recipient of one dispatch, so late platform replies land on
/// the right entry even when the same number appears twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub alert: AlertId,
    pub index: usize,
}

pub trait CallChannel {
    /// Fire-and-forget: the call outcome is never reported back.
    fn place_call(&self, slot: Slot, dial_uri: &Url);
}

pub trait MessageChannel {
    fn send_message(&self, slot: Slot, recipient: &str, body: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Call,
    Message,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecipientOutcome {
    Pending,
    Initiated,
    Sent,
    Cancelled,
    Unknown,
    Failed { reason: String },
}

impl RecipientOutcome {
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Initiated | Self::Sent)
    }

    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub recipient: String,
    pub outcome: RecipientOutcome,
}

/// Recipient → outcome for one dispatch, in issue order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    alert: AlertId,
    channel: Channel,
    entries: Vec<ReportEntry>,
}

impl DispatchReport {
    #[must_use]
    pub fn new(alert: AlertId, channel: Channel) -> Self {
        Self {
            alert,
            channel,
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub const fn alert(&self) -> AlertId {
        self.alert
    }

    #[must_use]
    pub const fn channel(&self) -> Channel {
        self.channel
    }

    #[must_use]
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    #[must_use]
    pub fn recipients(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.recipient.as_str()).collect()
    }

    fn push(&mut self, recipient: &str, outcome: RecipientOutcome) -> Slot {
        self.entries.push(ReportEntry {
            recipient: recipient.to_string(),
            outcome,
        });
        Slot {
            alert: self.alert,
            index: self.entries.len() - 1,
        }
    }

    /// Applies a platform reply. Replies for another dispatch, unknown slots,
    /// or slots that already settled are ignored.
    pub fn record(&mut self, slot: Slot, outcome: RecipientOutcome) -> bool {
        if slot.alert != self.alert {
            return false;
        }
        match self.entries.get_mut(slot.index) {
            Some(entry) if entry.outcome.is_pending() => {
                entry.outcome = outcome;
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_pending()).count()
    }

    #[must_use]
    pub fn succeeded_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_success()).count()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_failure()).count()
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.pending_count() == 0
    }
}

const VISUAL_SEPARATORS: &[char] = &[' ', '-', '(', ')', '.', '/'];

/// Strips visual separators and checks the remainder is dialable:
/// digits, `*`, `#`, and a single leading `+`.
pub fn normalize_number(number: &str) -> Result<String, DispatchError> {
    let malformed = |reason: &str| DispatchError::MalformedNumber {
        number: number.to_string(),
        reason: reason.to_string(),
    };

    let stripped: String = number
        .trim()
        .chars()
        .filter(|c| !VISUAL_SEPARATORS.contains(c))
        .collect();

    if !stripped.chars().any(|c| c.is_ascii_digit()) {
        return Err(malformed("no digits"));
    }
    for (i, c) in stripped.chars().enumerate() {
        match c {
            '0'..='9' | '*' | '#' => {}
            '+' if i == 0 => {}
            '+' => return Err(malformed("'+' is only allowed as a prefix")),
            other => return Err(malformed(&format!("unexpected character {other:?}"))),
        }
    }
    Ok(stripped)
}

pub fn dial_uri(number: &str) -> Result<Url, DispatchError> {
    let normalized = normalize_number(number)?;
    // '#' would otherwise start a URI fragment.
    Url::parse(&format!("tel:{}", normalized.replace('#', "%23"))).map_err(|e| {
        DispatchError::MalformedNumber {
            number: number.to_string(),
            reason: e.to_string(),
        }
    })
}

/// `My current location is: https://maps.google.com/?q=<lat>,<lon>`
pub fn build_share_message(
    snapshot: LocationSnapshot,
    config: &AlertConfig,
) -> Result<String, ConfigError> {
    let mut link = config.map_base()?;
    link.set_query(Some(&format!(
        "q={},{}",
        snapshot.latitude(),
        snapshot.longitude()
    )));
    Ok(format!("{} {link}", config.share_message_prefix))
}

pub struct DispatchEngine<'a, C, M> {
    calls: &'a C,
    messages: &'a M,
}

impl<'a, C, M> DispatchEngine<'a, C, M>
where
    C: CallChannel,
    M: MessageChannel,
{
    pub fn new(calls: &'a C, messages: &'a M) -> Self {
        Self { calls, messages }
    }

    pub fn dispatch_calls(&self, targets: &[String]) -> DispatchReport {
        let mut report = DispatchReport::new(AlertId::generate(), Channel::Call);
        info!(alert = %report.alert(), recipients = targets.len(), "dispatching calls");

        for target in targets {
            match dial_uri(target) {
                Ok(uri) => {
                    let slot = report.push(target, RecipientOutcome::Pending);
                    self.calls.place_call(slot, &uri);
                }
                Err(e) => {
                    warn!(alert = %report.alert(), error = %e, "call not initiated");
                    report.push(
                        target,
                        RecipientOutcome::Failed {
                            reason: e.to_string(),
                        },
                    );
                }
            }
        }
        report
    }

    pub fn dispatch_messages(&self, targets: &[String], body: &str) -> DispatchReport {
        let mut report = DispatchReport::new(AlertId::generate(), Channel::Message);
        info!(alert = %report.alert(), recipients = targets.len(), "dispatching messages");

        for target in targets {
            match normalize_number(target) {
                Ok(_) => {
                    let slot = report.push(target, RecipientOutcome::Pending);
                    self.messages.send_message(slot, target, body);
                }
                Err(e) => {
                    warn!(alert = %report.alert(), error = %e, "message not sent");
                    report.push(
                        target,
                        RecipientOutcome::Failed {
                            reason: e.to_string(),
                        },
                    );
                }
            }
        }
        report
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingChannels;
    use super::*;

    fn targets(numbers: &[&str]) -> Vec<String> {
        numbers.iter().map(|n| (*n).to_string()).collect()
    }

    #[test]
    fn test_normalize_number() {
        assert_eq!(normalize_number("555-1111").unwrap(), "5551111");
        assert_eq!(normalize_number(" +91 (80) 1234.5678 ").unwrap(), "+918012345678");
        assert_eq!(normalize_number("*121#").unwrap(), "*121#");
        assert!(normalize_number("abc").is_err());
        assert!(normalize_number("12+34").is_err());
        assert!(normalize_number("555-CALL").is_err());
        assert!(normalize_number("---").is_err());
    }

    #[test]
    fn test_dial_uri() {
        assert_eq!(dial_uri("100").unwrap().as_str(), "tel:100");
        assert_eq!(dial_uri("555-1111").unwrap().as_str(), "tel:5551111");
        assert_eq!(dial_uri("*121#").unwrap().as_str(), "tel:*121%23");
    }

    #[test]
    fn test_share_message_format() {
        let snapshot = LocationSnapshot::new(12.9716, 77.5946).unwrap();
        let message = build_share_message(snapshot, &AlertConfig::default()).unwrap();
        assert_eq!(
            message,
            "My current location is: https://maps.google.com/?q=12.9716,77.5946"
        );
    }

    #[test]
    fn test_share_message_is_deterministic() {
        let snapshot = LocationSnapshot::new(-33.5, 151.0).unwrap();
        let config = AlertConfig::default();
        assert_eq!(
            build_share_message(snapshot, &config).unwrap(),
            build_share_message(snapshot, &config).unwrap()
        );
        assert!(build_share_message(snapshot, &config)
            .unwrap()
            .ends_with("?q=-33.5,151"));
    }

    #[test]
    fn test_calls_issued_in_order() {
        let channels = RecordingChannels::default();
        let engine = DispatchEngine::new(&channels, &channels);

        let report = engine.dispatch_calls(&targets(&["100", "1091", "555-1111"]));

        let issued: Vec<String> = channels.calls.borrow().iter().map(|(_, uri)| uri.clone()).collect();
        assert_eq!(issued, vec!["tel:100", "tel:1091", "tel:5551111"]);
        assert_eq!(report.channel(), Channel::Call);
        assert_eq!(report.recipients(), vec!["100", "1091", "555-1111"]);
        assert_eq!(report.pending_count(), 3);
    }

    #[test]
    fn test_malformed_number_does_not_stop_batch() {
        let channels = RecordingChannels::default();
        let engine = DispatchEngine::new(&channels, &channels);

        let report = engine.dispatch_calls(&targets(&["100", "not a number", "555-1111"]));

        assert_eq!(channels.calls.borrow().len(), 2);
        assert_eq!(report.len(), 3);
        assert_eq!(report.failed_count(), 1);
        assert!(report.entries()[1].outcome.is_failure());
        assert_eq!(report.pending_count(), 2);
    }

    #[test]
    fn test_messages_carry_body_and_slots() {
        let channels = RecordingChannels::default();
        let engine = DispatchEngine::new(&channels, &channels);

        let report = engine.dispatch_messages(&targets(&["555-1111", "555-1111"]), "help");

        let sent = channels.messages.borrow();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].1, "555-1111");
        assert_eq!(sent[0].2, "help");
        assert_eq!(sent[0].0.index, 0);
        assert_eq!(sent[1].0.index, 1);
        assert_eq!(sent[0].0.alert, report.alert());
    }

    #[test]
    fn test_empty_batch() {
        let channels = RecordingChannels::default();
        let engine = DispatchEngine::new(&channels, &channels);
        let report = engine.dispatch_messages(&[], "help");
        assert!(report.is_empty());
        assert!(report.is_settled());
        assert!(channels.messages.borrow().is_empty());
    }

    #[test]
    fn test_report_records_each_slot_once() {
        let channels = RecordingChannels::default();
        let engine = DispatchEngine::new(&channels, &channels);
        let mut report = engine.dispatch_messages(&targets(&["111", "222"]), "help");
        let first = channels.messages.borrow()[0].0;
        let second = channels.messages.borrow()[1].0;

        assert!(report.record(first, RecipientOutcome::Sent));
        assert!(!report.record(first, RecipientOutcome::Cancelled));
        assert!(report.record(
            second,
            RecipientOutcome::Failed {
                reason: "no signal".into()
            }
        ));

        assert_eq!(report.succeeded_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert!(report.is_settled());

        let foreign = Slot {
            alert: AlertId::generate(),
            index: 0,
        };
        assert!(!report.record(foreign, RecipientOutcome::Sent));
        let out_of_range = Slot {
            alert: report.alert(),
            index: 9,
        };
        assert!(!report.record(out_of_range, RecipientOutcome::Sent));
    }

    #[test]
    fn test_dispatch_error_kinds() {
        let err: AppError = DispatchError::MalformedNumber {
            number: "abc".into(),
            reason: "no digits".into(),
        }
        .into();
        assert_eq!(err.kind, ErrorKind::CallInitiation);

        let err: AppError = DispatchError::MessageFailed {
            number: "111".into(),
            reason: "no signal".into(),
        }
        .into();
        assert_eq!(err.kind, ErrorKind::MessageDispatch);
    }
}
