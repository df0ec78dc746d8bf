//! Conversation state
//!
//! A single session is persisted as a JSON array of messages under one key
//! of a [`KeyValueStore`].

pub mod kv;
pub mod manager;
pub mod store;

pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use manager::{ConversationStore, DEFAULT_HISTORY_LIMIT};
pub use store::{
    window, Message, Role, Session, WireMessage, WireRole, GREETING_PERSONA, GREETING_TEXT,
};
