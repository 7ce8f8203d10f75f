pub mod channel_service;
pub mod message_service;
pub mod message_store;
pub mod profile;
pub mod push;
