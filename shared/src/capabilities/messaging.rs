use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "data")]
pub enum MessageOperation {
    Send { recipient: String, body: String },
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum MessageError {
    #[error("text messaging is not available on this device")]
    NotAvailable,

    #[error("delivery failed: {reason}")]
    DeliveryFailed { reason: String },

    #[error("unknown error: {message}")]
    Unknown { message: String },
}

/// Outcome reported by the platform composer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Sent,
    Cancelled,
    Unknown,
}

pub type MessageResult = Result<MessageStatus, MessageError>;

impl Operation for MessageOperation {
    type Output = MessageResult;
}

pub struct Messaging<Ev> {
    context: CapabilityContext<MessageOperation, Ev>,
}

impl<Ev> Capability<Ev> for Messaging<Ev> {
    type Operation = MessageOperation;
    type MappedSelf<MappedEv> = Messaging<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Messaging::new(self.context.map_event(f))
    }
}

impl<Ev> Messaging<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<MessageOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn send<F>(&self, recipient: impl Into<String>, body: impl Into<String>, callback: F)
    where
        F: FnOnce(MessageResult) -> Ev + Send + 'static,
    {
        let context = self.context.clone();
        let operation = MessageOperation::Send {
            recipient: recipient.into(),
            body: body.into(),
        };
        self.context.spawn(async move {
            let result = context.request_from_shell(operation).await;
            context.update_app(callback(result));
        });
    }
}
