//! Domain types shared between the server and the session controller.

pub mod event;
pub mod message;
pub mod room;

pub use event::{ChatEvent, MessageWithSender, ParticipantUpdate};
pub use message::{ChatMessage, MessageType, UserProfile};
pub use room::{Participant, Room, RoomKind, RoomOverview};
