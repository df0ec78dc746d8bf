//! Session data structures

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Text of the assistant greeting a fresh session starts with
pub const GREETING_TEXT: &str = "Hi, I’m Grok! How can I help you today?";
/// Persona the greeting is attributed to
pub const GREETING_PERSONA: &str = "grok";

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[serde(alias = "bot")]
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique, strictly increasing within a session
    pub id: u64,
    #[serde(alias = "type")]
    pub role: Role,
    pub text: String,
    /// Persona that produced (assistant) or was addressed by (user) the message
    #[serde(alias = "model")]
    pub model_tag: String,
}

impl Message {
    pub fn new(id: u64, role: Role, text: impl Into<String>, model_tag: impl Into<String>) -> Self {
        Self {
            id,
            role,
            text: text.into(),
            model_tag: model_tag.into(),
        }
    }

    /// Convert to the upstream wire format (role and content only)
    pub fn to_wire(&self) -> WireMessage {
        WireMessage {
            role: match self.role {
                Role::User => WireRole::User,
                Role::Assistant => WireRole::Assistant,
            },
            content: self.text.clone(),
        }
    }
}

/// The single conversation thread
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Messages in creation order
    pub messages: Vec<Message>,
    /// Bumped on every reset so in-flight replies can detect they are stale
    pub generation: u64,
}

impl Session {
    /// Create a session holding only the greeting
    pub fn seeded(generation: u64) -> Self {
        let mut session = Self {
            messages: Vec::new(),
            generation,
        };
        session.push(Role::Assistant, GREETING_TEXT, GREETING_PERSONA);
        session
    }

    pub(crate) fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            generation: 0,
        }
    }

    /// Append a message with a freshly allocated id and return it
    pub fn push(
        &mut self,
        role: Role,
        text: impl Into<String>,
        model_tag: impl Into<String>,
    ) -> &Message {
        let id = match self.next_id() {
            Some(id) => id,
            None => {
                warn!("Message ids exhausted, renumbering {} messages", self.messages.len());
                self.renumber();
                self.next_id().unwrap_or(self.messages.len() as u64 + 1)
            }
        };
        self.messages.push(Message::new(id, role, text, model_tag));
        &self.messages[self.messages.len() - 1]
    }

    /// Next message id: timestamp-like but always above the last id.
    /// `None` once the last id is `u64::MAX`.
    pub fn next_id(&self) -> Option<u64> {
        let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
        let floor = match self.messages.last() {
            Some(last) => last.id.checked_add(1)?,
            None => 1,
        };
        Some(now.max(floor))
    }

    /// Whether ids strictly increase and leave room for another message
    pub fn has_valid_ids(&self) -> bool {
        self.messages.windows(2).all(|w| w[0].id < w[1].id)
            && self.messages.last().map_or(true, |m| m.id < u64::MAX)
    }

    /// Reassign ids `1..=n` keeping the current order
    pub fn renumber(&mut self) {
        for (id, message) in (1..).zip(self.messages.iter_mut()) {
            message.id = id;
        }
    }

    /// Index of the message with `id`
    pub fn position(&self, id: u64) -> Option<usize> {
        self.messages.iter().position(|m| m.id == id)
    }

    /// Last `limit` messages in wire format, oldest first
    pub fn window(&self, limit: usize) -> Vec<WireMessage> {
        window(&self.messages, limit)
    }
}

/// Role vocabulary of the chat-completion wire format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireRole {
    System,
    User,
    Assistant,
}

/// A `{role, content}` entry as sent to the relay and upstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: WireRole,
    pub content: String,
}

impl WireMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: WireRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: WireRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: WireRole::Assistant,
            content: content.into(),
        }
    }
}

/// Last `limit` messages of `messages` in wire format, order preserved
pub fn window(messages: &[Message], limit: usize) -> Vec<WireMessage> {
    let start = messages.len().saturating_sub(limit);
    messages[start..].iter().map(Message::to_wire).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_session() {
        let session = Session::seeded(0);
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].role, Role::Assistant);
        assert_eq!(session.messages[0].text, GREETING_TEXT);
        assert_eq!(session.messages[0].model_tag, "grok");
    }

    #[test]
    fn test_ids_strictly_increase() {
        let mut session = Session::seeded(0);
        for i in 0..50 {
            session.push(Role::User, format!("m{}", i), "grok");
        }
        assert!(session.messages.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn test_next_id_above_future_ids() {
        let mut session =
            Session::from_messages(vec![Message::new(u64::MAX - 10, Role::User, "x", "grok")]);
        let id = session.push(Role::Assistant, "y", "grok").id;
        assert_eq!(id, u64::MAX - 9);
    }

    #[test]
    fn test_push_after_max_id_renumbers() {
        let mut session = Session::from_messages(vec![
            Message::new(7, Role::Assistant, "hi", "grok"),
            Message::new(u64::MAX, Role::User, "x", "grok"),
        ]);
        assert_eq!(session.next_id(), None);
        assert!(!session.has_valid_ids());

        session.push(Role::Assistant, "y", "grok");

        assert_eq!(session.messages[0].id, 1);
        assert_eq!(session.messages[1].id, 2);
        assert!(session.messages[2].id > 2);
        assert_eq!(session.messages[2].text, "y");
        assert!(session.has_valid_ids());
    }

    #[test]
    fn test_renumber_repairs_out_of_order_ids() {
        let mut session = Session::from_messages(vec![
            Message::new(5, Role::Assistant, "a", "grok"),
            Message::new(5, Role::User, "b", "grok"),
            Message::new(2, Role::Assistant, "c", "grok"),
        ]);
        assert!(!session.has_valid_ids());

        session.renumber();

        let ids: Vec<u64> = session.messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, [1, 2, 3]);
        assert_eq!(session.messages[2].text, "c");
        assert!(session.has_valid_ids());
    }

    #[test]
    fn test_window_limits_and_orders() {
        let mut session = Session::seeded(0);
        for i in 0..40 {
            session.push(Role::User, format!("Message {}", i), "grok");
        }

        let window = session.window(30);
        assert_eq!(window.len(), 30);
        assert_eq!(window[0].content, "Message 10");
        assert_eq!(window[29].content, "Message 39");

        let whole = session.window(100);
        assert_eq!(whole.len(), 41);
        assert_eq!(whole[0].role, WireRole::Assistant);
    }

    #[test]
    fn test_legacy_layout_deserializes() {
        let raw = r#"[{"id":1,"type":"bot","text":"Hi","model":"grok"},
                      {"id":2,"type":"user","text":"Hello","model":"gpt35"}]"#;
        let messages: Vec<Message> = serde_json::from_str(raw).unwrap();
        assert_eq!(messages[0].role, Role::Assistant);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].model_tag, "gpt35");
    }

    #[test]
    fn test_wire_roles_serialize_lowercase() {
        let json = serde_json::to_value(WireMessage::assistant("Hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "Hi"}));
    }
}
