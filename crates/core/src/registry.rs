//! The ordered collection of conversations and the active pointer.

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Utc};
use orb_chat_model::{
    Conversation, ConversationId, Message, PersistedState, Theme, UNTITLED,
};

use crate::store::Store;

/// Number of characters kept when a title is derived from a message.
pub const TITLE_MAX_CHARS: usize = 30;

/// Appended to a derived title when the message was longer.
pub const TITLE_TRUNCATION_MARKER: &str = "...";

/// Error returned when a conversation id does not resolve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LookupError {
    /// No conversation has this id.
    NotFound(ConversationId),
}

impl Display for LookupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::NotFound(id) => write!(f, "conversation {id} not found"),
        }
    }
}

impl StdError for LookupError {}

/// Owns every conversation, newest first, and which one is active.
///
/// All mutation goes through this type. The active id, when present,
/// always names a conversation in the collection, and every change to
/// the collection is written to the injected [`Store`] right away.
/// Persistence failures are logged and otherwise ignored: the in-memory
/// state stays authoritative.
pub struct Registry {
    conversations: Vec<Conversation>,
    active_id: Option<ConversationId>,
    theme: Theme,
    store: Box<dyn Store>,
}

impl Registry {
    /// Opens a registry on top of `store`, restoring what it holds.
    ///
    /// No conversation is active after opening.
    pub fn open<S: Store>(store: S) -> Self {
        let PersistedState {
            conversations,
            theme,
        } = store.load().unwrap_or_default();
        info!("restored {} conversations", conversations.len());
        Self {
            conversations,
            active_id: None,
            theme,
            store: Box::new(store),
        }
    }

    /// Inserts an empty conversation at the front and makes it active.
    pub fn create_conversation(&mut self) -> ConversationId {
        let now = Utc::now();
        let id = self.next_id(now);
        self.conversations.insert(0, Conversation::new(id, now));
        self.active_id = Some(id);
        info!("created conversation {id}");
        self.persist();
        id
    }

    /// Makes `id` the active conversation.
    ///
    /// Leaves the state unchanged when `id` is unknown.
    pub fn select_conversation(
        &mut self,
        id: ConversationId,
    ) -> Result<(), LookupError> {
        if self.get(id).is_none() {
            return Err(LookupError::NotFound(id));
        }
        debug!("selected conversation {id}");
        self.active_id = Some(id);
        Ok(())
    }

    /// Removes a conversation. Does nothing if `id` is unknown.
    ///
    /// Deleting the active conversation leaves no conversation active.
    pub fn delete_conversation(&mut self, id: ConversationId) {
        let Some(idx) = self.position(id) else {
            return;
        };
        self.conversations.remove(idx);
        if self.active_id == Some(id) {
            self.active_id = None;
        }
        info!("deleted conversation {id}");
        self.persist();
    }

    /// Appends a message to a conversation's transcript.
    ///
    /// The first message also fixes the conversation's title, see
    /// [`derive_title`].
    pub fn append_message(
        &mut self,
        id: ConversationId,
        message: Message,
    ) -> Result<(), LookupError> {
        let idx = self.position(id).ok_or(LookupError::NotFound(id))?;
        let conversation = &mut self.conversations[idx];
        if conversation.is_empty() {
            conversation.title = derive_title(&message.content);
        }
        conversation.transcript.push(message);
        conversation.updated_at = Utc::now();
        trace!(
            "conversation {id} now has {} messages",
            conversation.transcript.len()
        );
        self.persist();
        Ok(())
    }

    /// Returns the active conversation, if any.
    #[inline]
    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.active_id.and_then(|id| self.get(id))
    }

    /// Returns the id of the active conversation, if any.
    #[inline]
    pub fn active_id(&self) -> Option<ConversationId> {
        self.active_id
    }

    /// Looks up a conversation.
    #[inline]
    pub fn get(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    /// Returns every conversation, newest first.
    #[inline]
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Returns the theme preference.
    #[inline]
    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Changes the theme preference.
    pub fn set_theme(&mut self, theme: Theme) {
        if self.theme == theme {
            return;
        }
        self.theme = theme;
        self.persist();
    }

    #[inline]
    fn position(&self, id: ConversationId) -> Option<usize> {
        self.conversations.iter().position(|c| c.id == id)
    }

    /// Uses the creation time as id, bumped past the newest existing id
    /// when two conversations are created within the same millisecond.
    fn next_id(&self, now: DateTime<Utc>) -> ConversationId {
        let candidate = now.timestamp_millis();
        let newest = self.conversations.iter().map(|c| c.id.as_raw()).max();
        match newest {
            Some(newest) if newest >= candidate => {
                ConversationId::from_raw(newest.saturating_add(1))
            }
            _ => ConversationId::from_raw(candidate),
        }
    }

    fn persist(&self) {
        let state = PersistedState {
            conversations: self.conversations.clone(),
            theme: self.theme,
        };
        if let Err(err) = self.store.save(&state) {
            warn!("failed to persist conversations: {err}");
        }
    }
}

/// Derives a conversation title from its first message.
///
/// The title is the trimmed content cut to [`TITLE_MAX_CHARS`]
/// characters, with [`TITLE_TRUNCATION_MARKER`] appended only if
/// something was cut.
pub fn derive_title(content: &str) -> String {
    let content = content.trim();
    if content.is_empty() {
        return UNTITLED.to_owned();
    }
    let mut chars = content.char_indices();
    match chars.nth(TITLE_MAX_CHARS) {
        Some((cut, _)) => format!("{}{TITLE_TRUNCATION_MARKER}", &content[..cut]),
        None => content.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::store::{CONVERSATIONS_KEY, MemoryStore};

    #[test]
    fn test_derive_title() {
        assert_eq!(derive_title("Hello"), "Hello");
        assert_eq!(derive_title("  Hello  \n"), "Hello");

        let exact = "a".repeat(TITLE_MAX_CHARS);
        assert_eq!(derive_title(&exact), exact);

        let long = "Explain artificial intelligence to me like I am five";
        assert_eq!(derive_title(long), "Explain artificial intelligenc...");

        let accented = "é".repeat(TITLE_MAX_CHARS + 5);
        assert_eq!(
            derive_title(&accented),
            format!("{}...", "é".repeat(TITLE_MAX_CHARS))
        );
        assert_eq!(derive_title("   "), UNTITLED);
    }

    #[test]
    fn test_create_select_delete() {
        let mut registry = Registry::open(MemoryStore::new());
        assert!(registry.active_conversation().is_none());

        let first = registry.create_conversation();
        let second = registry.create_conversation();
        assert_eq!(registry.active_id(), Some(second));
        let ids: Vec<_> = registry.conversations().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![second, first]);

        registry.select_conversation(first).unwrap();
        assert_eq!(registry.active_id(), Some(first));

        let unknown = ConversationId::from_raw(-1);
        assert_eq!(
            registry.select_conversation(unknown),
            Err(LookupError::NotFound(unknown))
        );
        assert_eq!(registry.active_id(), Some(first));

        registry.delete_conversation(second);
        assert_eq!(registry.active_id(), Some(first));
        registry.delete_conversation(first);
        assert_eq!(registry.active_id(), None);
        assert!(registry.conversations().is_empty());

        // Idempotent.
        registry.delete_conversation(first);
        assert!(registry.conversations().is_empty());
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let mut registry = Registry::open(MemoryStore::new());
        let ids: Vec<_> = (0..50).map(|_| registry.create_conversation()).collect();
        let unique: HashSet<_> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_next_id_saturates() {
        let store = MemoryStore::new();
        let mut stored = Conversation::new(
            ConversationId::from_raw(i64::MAX),
            Utc::now(),
        );
        stored.title = "Edited by hand".to_owned();
        store
            .save(&PersistedState {
                conversations: vec![stored],
                theme: Theme::Dark,
            })
            .unwrap();

        let mut registry = Registry::open(store);
        let id = registry.create_conversation();
        assert_eq!(id.as_raw(), i64::MAX);
        assert_eq!(registry.active_id(), Some(id));
    }

    #[test]
    fn test_title_is_fixed_once() {
        let mut registry = Registry::open(MemoryStore::new());
        let id = registry.create_conversation();
        let created = registry.get(id).unwrap().updated_at;
        assert_eq!(registry.get(id).unwrap().title, UNTITLED);

        registry.append_message(id, Message::user("Hello")).unwrap();
        registry
            .append_message(id, Message::assistant("Hi, how can I help?"))
            .unwrap();
        registry
            .append_message(id, Message::user("Something else entirely"))
            .unwrap();

        let conversation = registry.get(id).unwrap();
        assert_eq!(conversation.title, "Hello");
        assert_eq!(conversation.transcript.len(), 3);
        assert_eq!(conversation.transcript[1].content, "Hi, how can I help?");
        assert!(conversation.updated_at >= created);
    }

    #[test]
    fn test_append_to_unknown() {
        let mut registry = Registry::open(MemoryStore::new());
        let unknown = ConversationId::from_raw(42);
        assert_eq!(
            registry.append_message(unknown, Message::user("Hi")),
            Err(LookupError::NotFound(unknown))
        );
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let store = MemoryStore::new();
        let mut registry = Registry::open(store.clone());

        let id = registry.create_conversation();
        registry.append_message(id, Message::user("Hello")).unwrap();
        registry.set_theme(Theme::Light);

        let reopened = Registry::open(store.clone());
        assert_eq!(reopened.conversations(), registry.conversations());
        assert_eq!(reopened.theme(), Theme::Light);
        assert_eq!(reopened.active_id(), None);

        // Deleting the last conversation is persisted too.
        registry.delete_conversation(id);
        assert_eq!(store.entry(CONVERSATIONS_KEY).as_deref(), Some("[]"));
    }

    #[test]
    fn test_persistence_failure_is_not_fatal() {
        let store = MemoryStore::new();
        store.set_read_only(true);
        let mut registry = Registry::open(store);
        let id = registry.create_conversation();
        registry.append_message(id, Message::user("Hello")).unwrap();
        assert_eq!(registry.get(id).unwrap().transcript.len(), 1);
    }
}
