//! Chat relay clients for cothink
//!
//! [`RelayClient`] is what the front end uses to reach the relay endpoint;
//! [`OpenRouterClient`] is what the relay uses to reach the upstream provider.

pub mod base;
pub mod openrouter;
pub mod relay_client;

pub use base::{
    extract_reply, ChatRelay, ProviderError, ProviderResult, RelayError, RelayRequest,
    RelayResult, UpstreamChat, NO_REPLY,
};
pub use openrouter::OpenRouterClient;
pub use relay_client::RelayClient;
