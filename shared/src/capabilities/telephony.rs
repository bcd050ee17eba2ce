use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "data")]
pub enum CallOperation {
    /// Opens the platform dialer on a `tel:` URI.
    Dial { uri: String },
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum CallError {
    #[error("telephony is not available on this device")]
    NotAvailable,

    #[error("the platform refused to open {uri}")]
    Refused { uri: String },

    #[error("unknown error: {message}")]
    Unknown { message: String },
}

/// The core never sees whether the call was answered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CallOutput {
    Initiated,
}

pub type CallResult = Result<CallOutput, CallError>;

impl Operation for CallOperation {
    type Output = CallResult;
}

pub struct Telephony<Ev> {
    context: CapabilityContext<CallOperation, Ev>,
}

impl<Ev> Capability<Ev> for Telephony<Ev> {
    type Operation = CallOperation;
    type MappedSelf<MappedEv> = Telephony<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Telephony::new(self.context.map_event(f))
    }
}

impl<Ev> Telephony<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<CallOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn dial<F>(&self, uri: impl Into<String>, callback: F)
    where
        F: FnOnce(CallResult) -> Ev + Send + 'static,
    {
        let context = self.context.clone();
        let operation = CallOperation::Dial { uri: uri.into() };
        self.context.spawn(async move {
            let result = context.request_from_shell(operation).await;
            context.update_app(callback(result));
        });
    }
}
