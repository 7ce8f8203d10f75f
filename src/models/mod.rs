pub mod channel;
pub mod message;
pub mod participant;

pub use channel::{Channel, ChannelSummary, ChannelType};
pub use message::{ChatMessage, MessageKind};
pub use participant::{Participant, ParticipantRole};
