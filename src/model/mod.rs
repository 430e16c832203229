pub mod event;
pub mod message;

pub use event::{AdminCommand, InboundEvent, OutboundEvent};
pub use message::{ChatKind, InboundMessage};
