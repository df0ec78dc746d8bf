//! Relay service
//!
//! Accepts chat requests from the front end, adds the persona system prompt
//! and the upstream credential, and forwards them to OpenRouter.

pub mod handlers;
pub mod server;
pub mod state;

pub use server::{build_router, run_server};
pub use state::AppState;
