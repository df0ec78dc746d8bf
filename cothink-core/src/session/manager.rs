//! Conversation store: the single owner of the persisted session

use tracing::{debug, error, warn};

use super::kv::KeyValueStore;
use super::store::{window, Message, Role, Session, WireMessage};

/// Default number of prior messages sent upstream
pub const DEFAULT_HISTORY_LIMIT: usize = 30;

/// Owns the session and persists it after every mutation.
///
/// The in-memory session is authoritative. A failed write is logged and
/// reported by [`ConversationStore::is_saved`]; the mutation itself stands
/// and the next successful write catches the backend up.
pub struct ConversationStore {
    backend: Box<dyn KeyValueStore>,
    key: String,
    session: Session,
    saved: bool,
}

impl ConversationStore {
    /// Open the session persisted under `key`, seeding a fresh one if needed
    pub fn open(backend: Box<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let mut store = Self {
            backend,
            key,
            session: Session::seeded(0),
            saved: true,
        };
        store.load();
        store
    }

    /// Reload from the backend.
    ///
    /// Absent, empty or unparseable persisted data yields a freshly seeded
    /// session. History whose ids are out of order is kept and renumbered.
    /// Either repair is written back.
    pub fn load(&mut self) -> &[Message] {
        let generation = self.session.generation;
        match self.read_persisted() {
            Some(messages) => {
                debug!("Loaded {} messages from '{}'", messages.len(), self.key);
                self.session = Session::from_messages(messages);
                self.session.generation = generation;
                if !self.session.has_valid_ids() {
                    warn!("Persisted session '{}' has out-of-order ids, renumbering", self.key);
                    self.session.renumber();
                    self.persist_logged();
                }
            }
            None => {
                self.session = Session::seeded(generation);
                self.persist_logged();
            }
        }
        &self.session.messages
    }

    fn read_persisted(&self) -> Option<Vec<Message>> {
        let raw = match self.backend.load(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read persisted session '{}': {}", self.key, e);
                return None;
            }
        };

        match serde_json::from_str::<Vec<Message>>(&raw) {
            Ok(messages) if messages.is_empty() => None,
            Ok(messages) => Some(messages),
            Err(e) => {
                warn!("Malformed persisted session '{}', reseeding: {}", self.key, e);
                None
            }
        }
    }

    /// Append a message, allocating its id, then persist
    pub fn append(
        &mut self,
        role: Role,
        text: impl Into<String>,
        model_tag: impl Into<String>,
    ) -> Message {
        let message = self.session.push(role, text, model_tag).clone();
        self.persist_logged();
        message
    }

    /// Replace the text of a user message and drop everything after it.
    ///
    /// The session is truncated to the messages strictly before `id`, a new
    /// user message carrying `new_text` (and the edited message's persona) is
    /// appended, and the resulting prefix is returned. Returns `None` and
    /// leaves the session untouched when `id` is unknown or not a user message.
    pub fn edit_and_regenerate(
        &mut self,
        id: u64,
        new_text: impl Into<String>,
    ) -> Option<Vec<Message>> {
        let Some(index) = self.session.position(id) else {
            debug!("Ignoring edit of unknown message {}", id);
            return None;
        };
        let target = &self.session.messages[index];
        if target.role != Role::User {
            debug!("Ignoring edit of {} message {}", target.role.as_str(), id);
            return None;
        }

        let model_tag = target.model_tag.clone();
        let discarded = self.session.messages.len() - index - 1;
        self.session.messages.truncate(index);
        self.session.push(Role::User, new_text, model_tag);
        debug!("Edited message {}, discarded {} later messages", id, discarded);

        self.persist_logged();
        Some(self.session.messages.clone())
    }

    /// Replace the session with a single fresh greeting
    pub fn reset(&mut self) {
        let generation = self.session.generation + 1;
        let mut fresh = Session::seeded(generation);
        // keep ids monotonic across the reset
        if let (Some(first), Some(id)) = (fresh.messages.first_mut(), self.session.next_id()) {
            first.id = id;
        }
        self.session = fresh;
        self.persist_logged();
    }

    /// Last `limit` messages mapped to wire roles; does not mutate
    pub fn window_for_upstream(&self, limit: usize) -> Vec<WireMessage> {
        window(&self.session.messages, limit)
    }

    pub fn messages(&self) -> &[Message] {
        &self.session.messages
    }

    pub fn find(&self, id: u64) -> Option<&Message> {
        self.session.messages.iter().find(|m| m.id == id)
    }

    pub fn len(&self) -> usize {
        self.session.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.session.messages.is_empty()
    }

    /// Counter bumped by every reset
    pub fn generation(&self) -> u64 {
        self.session.generation
    }

    /// Whether the last write reached the backend
    pub fn is_saved(&self) -> bool {
        self.saved
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn persist(&self) -> crate::Result<()> {
        let raw = serde_json::to_string(&self.session.messages)?;
        self.backend
            .save(&self.key, &raw)
            .map_err(|e| crate::Error::Session(format!("failed to persist '{}': {}", self.key, e)))
    }

    fn persist_logged(&mut self) {
        self.saved = match self.persist() {
            Ok(()) => true,
            Err(e) => {
                error!("{}", e);
                false
            }
        };
    }
}

impl std::fmt::Debug for ConversationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationStore")
            .field("key", &self.key)
            .field("session", &self.session)
            .field("saved", &self.saved)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::kv::{FileStore, MemoryStore};
    use crate::session::{WireRole, GREETING_TEXT};
    use tempfile::TempDir;

    const KEY: &str = "chatMessages";

    fn open(backend: &MemoryStore) -> ConversationStore {
        ConversationStore::open(Box::new(backend.clone()), KEY)
    }

    #[test]
    fn test_open_seeds_and_persists_greeting() {
        let backend = MemoryStore::new();
        let store = open(&backend);

        assert_eq!(store.len(), 1);
        assert_eq!(store.messages()[0].role, Role::Assistant);
        assert_eq!(store.messages()[0].text, GREETING_TEXT);
        assert!(backend.raw(KEY).is_some());
    }

    #[test]
    fn test_append_survives_reload() {
        let backend = MemoryStore::new();
        let mut store = open(&backend);
        store.append(Role::User, "Hello", "grok");
        store.append(Role::Assistant, "Hi there", "grok");
        store.append(Role::User, "Switching", "gpt35");
        let expected = store.messages().to_vec();

        let reloaded = open(&backend);
        assert_eq!(reloaded.messages(), expected.as_slice());
    }

    #[test]
    fn test_empty_and_malformed_state_reseed() {
        let cases = [
            "[]",
            "not json",
            r#"{"id":1}"#,
            r#"[{"id":1,"role":"system","text":"x","model_tag":"grok"}]"#,
        ];
        for raw in cases {
            let backend = MemoryStore::new();
            backend.put_raw(KEY, raw);
            let store = open(&backend);
            assert_eq!(store.len(), 1, "raw = {}", raw);
            assert_eq!(store.messages()[0].text, GREETING_TEXT);
        }
    }

    #[test]
    fn test_legacy_browser_state_loads() {
        let backend = MemoryStore::new();
        backend.put_raw(
            KEY,
            r#"[{"id":1,"type":"bot","text":"Hi","model":"grok"},{"id":5,"type":"user","text":"Yo","model":"grok"}]"#,
        );
        let store = open(&backend);
        assert_eq!(store.len(), 2);
        assert_eq!(store.messages()[1].text, "Yo");
    }

    #[test]
    fn test_out_of_order_history_is_renumbered() {
        let backend = MemoryStore::new();
        backend.put_raw(
            KEY,
            r#"[{"id":9,"type":"bot","text":"Hi","model":"grok"},{"id":9,"type":"user","text":"Yo","model":"grok"},{"id":3,"type":"bot","text":"Hey","model":"kimi"}]"#,
        );
        let mut store = open(&backend);

        let texts: Vec<&str> = store.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["Hi", "Yo", "Hey"]);
        let ids: Vec<u64> = store.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, [1, 2, 3]);
        assert_eq!(open(&backend).messages(), store.messages());

        let next = store.append(Role::User, "More", "kimi");
        assert!(next.id > 3);
    }

    #[test]
    fn test_max_id_history_accepts_appends() {
        let backend = MemoryStore::new();
        backend.put_raw(
            KEY,
            r#"[{"id":18446744073709551615,"role":"user","text":"x","model_tag":"grok"}]"#,
        );
        let mut store = open(&backend);
        assert_eq!(store.len(), 1);
        assert_eq!(store.messages()[0].text, "x");

        let reply = store.append(Role::Assistant, "y", "grok");

        assert_eq!(store.len(), 2);
        assert!(store.messages()[0].id < reply.id);
        assert_eq!(open(&backend).messages()[1].text, "y");
    }

    #[test]
    fn test_failed_save_keeps_memory_state() {
        let backend = MemoryStore::new();
        let mut store = open(&backend);
        let persisted = backend.raw(KEY);
        backend.set_read_only(true);

        let message = store.append(Role::User, "Hello", "grok");

        assert!(!store.is_saved());
        assert_eq!(store.len(), 2);
        assert_eq!(store.messages()[1], message);
        assert_eq!(backend.raw(KEY), persisted);

        backend.set_read_only(false);
        store.append(Role::Assistant, "Hi there", "grok");
        assert!(store.is_saved());
        assert_eq!(open(&backend).len(), 3);
    }

    #[test]
    fn test_reset_yields_single_greeting() {
        let backend = MemoryStore::new();
        let mut store = open(&backend);
        store.append(Role::User, "Hello", "grok");
        let last_id = store.messages()[1].id;

        store.reset();

        assert_eq!(store.len(), 1);
        assert_eq!(store.messages()[0].role, Role::Assistant);
        assert!(store.messages()[0].id > last_id);
        assert_eq!(store.generation(), 1);
        assert_eq!(open(&backend).len(), 1);
    }

    #[test]
    fn test_edit_truncates_to_prefix() {
        let backend = MemoryStore::new();
        let mut store = open(&backend);
        store.append(Role::User, "first", "grok");
        store.append(Role::Assistant, "reply one", "grok");
        let target = store.append(Role::User, "second", "gpt35");
        store.append(Role::Assistant, "reply two", "gpt35");

        // target is the message at index 3
        let prefix = store
            .edit_and_regenerate(target.id, "second, edited")
            .unwrap();

        assert_eq!(store.len(), 4);
        assert_eq!(prefix.len(), 4);
        assert_eq!(prefix[3].text, "second, edited");
        assert_eq!(prefix[3].role, Role::User);
        assert_eq!(prefix[3].model_tag, "gpt35");
        assert!(prefix[3].id > prefix[2].id);
        assert_eq!(prefix[..3], store.messages()[..3]);
        assert_eq!(open(&backend).messages(), prefix.as_slice());
    }

    #[test]
    fn test_edit_rejects_unknown_and_assistant_ids() {
        let backend = MemoryStore::new();
        let mut store = open(&backend);
        store.append(Role::User, "Hello", "grok");
        let reply = store.append(Role::Assistant, "Hi", "grok");
        let before = store.messages().to_vec();

        assert!(store.edit_and_regenerate(reply.id, "nope").is_none());
        assert!(store.edit_and_regenerate(424242, "nope").is_none());
        assert_eq!(store.messages(), before.as_slice());
    }

    #[test]
    fn test_window_for_upstream() {
        let backend = MemoryStore::new();
        let mut store = open(&backend);
        for i in 0..35 {
            store.append(Role::User, format!("m{}", i), "grok");
        }

        let window = store.window_for_upstream(DEFAULT_HISTORY_LIMIT);
        assert_eq!(window.len(), 30);
        assert_eq!(window.last().unwrap().content, "m34");
        assert!(window.iter().all(|m| m.role == WireRole::User));
        assert_eq!(store.len(), 36);

        let short = open(&MemoryStore::new()).window_for_upstream(30);
        assert_eq!(short.len(), 1);
        assert_eq!(short[0].role, WireRole::Assistant);
    }

    #[test]
    fn test_file_backed_store() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileStore::new(temp_dir.path());
        let mut store = ConversationStore::open(Box::new(backend.clone()), KEY);
        store.append(Role::User, "persist me", "kimi");

        let reloaded = ConversationStore::open(Box::new(backend), KEY);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.messages()[1].model_tag, "kimi");
    }
}
