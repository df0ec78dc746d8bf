//! Core types for cothink
//!
//! This crate owns the conversation model (messages, sessions and the
//! persisted conversation store), the persona table with its system-prompt
//! template, configuration loading and logging setup.

pub mod config;
pub mod error;
pub mod logging;
pub mod persona;
pub mod session;

pub use error::{Error, Result};
