//! Chat controller: the single entry point that mutates a conversation
//!
//! Sends are single-flight. A send moves the controller from `Idle` to
//! `Sending`; while sending, further sends and edit-submits are rejected with
//! [`SendOutcome::Busy`]. The reply (or a fixed apology on failure) is
//! appended before returning to `Idle`. A reset while a send is in flight
//! bumps the session generation, and the late reply is dropped.
//!
//! Nothing here fails the caller: relay errors become the apology message and
//! storage errors are logged and surfaced through [`ChatController::is_saved`].

use cothink_core::persona::PersonaRegistry;
use cothink_core::session::{window, ConversationStore, Message, Role, WireMessage};
use cothink_core::{Error, Result};
use cothink_providers::ChatRelay;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Assistant text appended when the relay call fails
pub const APOLOGY_TEXT: &str = "Sorry, there was an error processing your request.";

/// Whether a relay call is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendState {
    Idle,
    Sending,
}

/// Result of a send or edit-submit
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The reply was appended
    Replied(Message),
    /// The relay failed and the apology was appended
    Failed(Message),
    /// The session was reset while waiting, nothing was appended
    Stale,
    /// Another send is in flight
    Busy,
    /// Blank input or an invalid edit target
    Ignored,
}

#[derive(Debug, Clone)]
struct Selection {
    persona: String,
    concise: bool,
}

/// Clears the busy flag when the send completes, however it completes
struct SendGuard<'a>(&'a AtomicBool);

impl Drop for SendGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Explicit state container for one chat session
pub struct ChatController {
    store: Mutex<ConversationStore>,
    relay: Arc<dyn ChatRelay>,
    personas: PersonaRegistry,
    selection: Mutex<Selection>,
    busy: AtomicBool,
    history_limit: usize,
}

impl ChatController {
    /// Create a controller; `persona` must exist in `personas`
    pub fn new(
        store: ConversationStore,
        relay: Arc<dyn ChatRelay>,
        personas: PersonaRegistry,
        persona: &str,
        history_limit: usize,
    ) -> Result<Self> {
        if personas.get(persona).is_none() {
            return Err(Error::NotFound(format!("persona '{}'", persona)));
        }
        Ok(Self {
            store: Mutex::new(store),
            relay,
            personas,
            selection: Mutex::new(Selection {
                persona: persona.to_string(),
                concise: false,
            }),
            busy: AtomicBool::new(false),
            history_limit: history_limit.max(1),
        })
    }

    /// Send a user utterance to the selected persona
    pub async fn send(&self, text: &str) -> SendOutcome {
        if text.trim().is_empty() {
            return SendOutcome::Ignored;
        }
        let Some(_guard) = self.begin_send() else {
            debug!("Send rejected, another request is in flight");
            return SendOutcome::Busy;
        };

        let Selection { persona, concise } = self.selection.lock().clone();
        let (history, generation) = {
            let mut store = self.store.lock();
            // the window is taken before the new utterance is appended
            let history = store.window_for_upstream(self.history_limit);
            store.append(Role::User, text, persona.as_str());
            (history, store.generation())
        };

        self.relay_and_append(&persona, text, concise, history, generation)
            .await
    }

    /// Replace a user message's text, discard everything after it and
    /// request a fresh reply.
    ///
    /// The reply comes from the persona the edited message was addressed to.
    /// Unknown ids and assistant messages are ignored.
    pub async fn edit_and_regenerate(&self, id: u64, text: &str) -> SendOutcome {
        if text.trim().is_empty() {
            return SendOutcome::Ignored;
        }
        let Some(_guard) = self.begin_send() else {
            debug!("Edit rejected, another request is in flight");
            return SendOutcome::Busy;
        };

        let concise = self.selection.lock().concise;
        let (persona, history, generation) = {
            let mut store = self.store.lock();
            let Some(prefix) = store.edit_and_regenerate(id, text) else {
                return SendOutcome::Ignored;
            };
            let Some((edited, earlier)) = prefix.split_last() else {
                return SendOutcome::Ignored;
            };
            let persona = if self.personas.get(&edited.model_tag).is_some() {
                edited.model_tag.clone()
            } else {
                self.selection.lock().persona.clone()
            };
            (persona, window(earlier, self.history_limit), store.generation())
        };

        info!("Regenerating reply for edited message {} with {}", id, persona);
        self.relay_and_append(&persona, text, concise, history, generation)
            .await
    }

    async fn relay_and_append(
        &self,
        persona: &str,
        text: &str,
        concise: bool,
        history: Vec<WireMessage>,
        generation: u64,
    ) -> SendOutcome {
        let result = self.relay.send(persona, text, concise, history).await;

        let mut store = self.store.lock();
        if store.generation() != generation {
            info!("Session was reset while waiting for {}, dropping reply", persona);
            return SendOutcome::Stale;
        }

        match result {
            Ok(reply) => SendOutcome::Replied(store.append(Role::Assistant, reply, persona)),
            Err(e) => {
                error!("Relay call for {} failed: {}", persona, e);
                SendOutcome::Failed(store.append(Role::Assistant, APOLOGY_TEXT, persona))
            }
        }
    }

    fn begin_send(&self) -> Option<SendGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SendGuard(&self.busy))
    }

    /// Replace the conversation with a fresh greeting
    pub fn reset(&self) {
        self.store.lock().reset();
        info!("Conversation reset");
    }

    /// Change the persona future sends go to
    pub fn select_persona(&self, id: &str) -> Result<()> {
        if self.personas.get(id).is_none() {
            return Err(Error::NotFound(format!("persona '{}'", id)));
        }
        self.selection.lock().persona = id.to_string();
        Ok(())
    }

    pub fn set_concise(&self, concise: bool) {
        self.selection.lock().concise = concise;
    }

    pub fn selected_persona(&self) -> String {
        self.selection.lock().persona.clone()
    }

    pub fn concise(&self) -> bool {
        self.selection.lock().concise
    }

    pub fn state(&self) -> SendState {
        if self.busy.load(Ordering::Acquire) {
            SendState::Sending
        } else {
            SendState::Idle
        }
    }

    /// Whether the conversation as shown is also persisted
    pub fn is_saved(&self) -> bool {
        self.store.lock().is_saved()
    }

    /// Copy of the current messages
    pub fn snapshot(&self) -> Vec<Message> {
        self.store.lock().messages().to_vec()
    }

    pub fn personas(&self) -> &PersonaRegistry {
        &self.personas
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }
}
