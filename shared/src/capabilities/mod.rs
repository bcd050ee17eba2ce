mod location;
mod messaging;
mod telephony;
mod timer;

pub use self::location::{
    Location, LocationError, LocationOperation, LocationOutput, LocationResult, PermissionStatus,
};
pub use self::messaging::{MessageError, MessageOperation, MessageResult, MessageStatus, Messaging};
pub use self::telephony::{CallError, CallOperation, CallOutput, CallResult, Telephony};
pub use self::timer::{Timer, TimerOperation, TimerOutput};

// Crux's built-in Render covers view updates; no custom capability needed.
pub use crux_core::render::Render;

use crate::event::Event;
use crate::App;

#[derive(crux_core::macros::Effect)]
#[effect(app = "App")]
pub struct Capabilities {
    pub location: Location<Event>,
    pub telephony: Telephony<Event>,
    pub messaging: Messaging<Event>,
    pub timer: Timer<Event>,
    pub render: Render<Event>,
}
