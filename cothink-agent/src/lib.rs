//! Chat controller for cothink
//!
//! Ties the conversation store to a relay: appends user turns, waits for the
//! selected persona's reply and records it, one request at a time.

pub mod conversation;

pub use conversation::{ChatController, SendOutcome, SendState, APOLOGY_TEXT};
