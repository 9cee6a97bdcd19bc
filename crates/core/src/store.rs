//! Durable storage for the client state.
//!
//! A [`Store`] is a plain key/value boundary. The client keeps two
//! entries in it: [`THEME_KEY`] with the theme preference and
//! [`CONVERSATIONS_KEY`] with every conversation, newest first, both as
//! JSON. Writes are last-write-wins; a store is owned by one client.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use orb_chat_model::{Conversation, PersistedState, Theme};

/// Entry holding the theme preference.
pub const THEME_KEY: &str = "theme";

/// Entry holding the conversation list.
pub const CONVERSATIONS_KEY: &str = "conversations";

/// Error raised by a [`Store`].
#[derive(Debug)]
pub enum StoreError {
    /// Reading or writing the entry failed.
    Io {
        /// The entry involved.
        key: String,
        /// The underlying error.
        source: io::Error,
    },
    /// The state could not be serialized.
    Encode {
        /// The entry involved.
        key: String,
        /// The underlying error.
        source: serde_json::Error,
    },
    /// The stored entry is not valid.
    Decode {
        /// The entry involved.
        key: String,
        /// The underlying error.
        source: serde_json::Error,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io { key, source } => {
                write!(f, "cannot access entry `{key}`: {source}")
            }
            StoreError::Encode { key, source } => {
                write!(f, "cannot encode entry `{key}`: {source}")
            }
            StoreError::Decode { key, source } => {
                write!(f, "cannot decode entry `{key}`: {source}")
            }
        }
    }
}

impl StdError for StoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            StoreError::Io { source, .. } => Some(source),
            StoreError::Encode { source, .. } => Some(source),
            StoreError::Decode { source, .. } => Some(source),
        }
    }
}

/// A key/value storage scoped to one client installation.
///
/// Implementors only provide raw entry access; [`Store::load`] and
/// [`Store::save`] handle the persisted layout. All methods are
/// synchronous.
pub trait Store: Send + 'static {
    /// Reads an entry, returning `None` if it was never written.
    fn load_entry(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes an entry, replacing any previous value.
    fn save_entry(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Loads the persisted state.
    ///
    /// Returns `None` when nothing was ever saved. Entries that cannot be
    /// read or decoded are logged and replaced by their defaults, so a
    /// damaged store never prevents the client from starting.
    fn load(&self) -> Option<PersistedState> {
        let theme = load_json::<Theme>(self, THEME_KEY);
        let conversations =
            load_json::<Vec<Conversation>>(self, CONVERSATIONS_KEY);
        if theme.is_none() && conversations.is_none() {
            return None;
        }
        Some(PersistedState {
            conversations: conversations.flatten().unwrap_or_default(),
            theme: theme.flatten().unwrap_or_default(),
        })
    }

    /// Saves the persisted state, both entries.
    fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        save_json(self, THEME_KEY, &state.theme)?;
        save_json(self, CONVERSATIONS_KEY, &state.conversations)
    }
}

/// Returns `None` if the entry was never written, and `Some(None)` if it
/// exists but cannot be read or decoded.
fn load_json<T: serde::de::DeserializeOwned>(
    store: &(impl Store + ?Sized),
    key: &str,
) -> Option<Option<T>> {
    let raw = match store.load_entry(key) {
        Ok(raw) => raw?,
        Err(err) => {
            warn!("{err}, falling back to default");
            return Some(None);
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(Some(value)),
        Err(source) => {
            let err = StoreError::Decode {
                key: key.to_owned(),
                source,
            };
            warn!("{err}, falling back to default");
            Some(None)
        }
    }
}

fn save_json<T: serde::Serialize + ?Sized>(
    store: &(impl Store + ?Sized),
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value).map_err(|source| StoreError::Encode {
        key: key.to_owned(),
        source,
    })?;
    store.save_entry(key, &raw)
}

impl<S: Store + ?Sized> Store for Box<S> {
    #[inline]
    fn load_entry(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).load_entry(key)
    }

    #[inline]
    fn save_entry(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).save_entry(key, value)
    }
}

/// A store keeping one JSON file per entry in a directory.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `dir`. The directory is created on the
    /// first write.
    #[inline]
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the directory holding the entries.
    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[inline]
    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Store for FileStore {
    fn load_entry(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.entry_path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_owned(),
                source,
            }),
        }
    }

    fn save_entry(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            key: key.to_owned(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io_err)?;

        // Write aside and rename, so a crash never leaves half an entry.
        let path = self.entry_path(key);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, value).map_err(io_err)?;
        fs::rename(&tmp_path, &path).map_err(io_err)?;
        trace!("saved {} bytes to {}", value.len(), path.display());
        Ok(())
    }
}

#[derive(Default)]
struct MemoryStoreInner {
    entries: HashMap<String, String>,
    read_only: bool,
}

/// An in-memory store. Clones share the same entries.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw value of an entry.
    #[inline]
    pub fn entry(&self, key: &str) -> Option<String> {
        self.lock().entries.get(key).cloned()
    }

    /// Makes every following write fail (or succeed again).
    #[inline]
    pub fn set_read_only(&self, read_only: bool) {
        self.lock().read_only = read_only;
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, MemoryStoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("MemoryStore")
            .field("keys", &inner.entries.keys().collect::<Vec<_>>())
            .field("read_only", &inner.read_only)
            .finish()
    }
}

impl Store for MemoryStore {
    fn load_entry(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entry(key))
    }

    fn save_entry(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.read_only {
            return Err(StoreError::Io {
                key: key.to_owned(),
                source: io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "store is read-only",
                ),
            });
        }
        inner.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use orb_chat_model::{ConversationId, Message};

    use super::*;

    fn sample_state() -> PersistedState {
        let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
        let mut older = Conversation::new(ConversationId::from_raw(1), t0);
        older.title = "Explain AI".to_owned();
        older.transcript = vec![
            Message::user("Explain AI"),
            Message::assistant("# AI\n\nIt is *statistics*."),
        ];
        older.updated_at = t0 + Duration::seconds(4);

        let t1 = t0 + Duration::hours(1);
        let mut newer = Conversation::new(ConversationId::from_raw(2), t1);
        newer.title = "Python help".to_owned();
        newer.transcript = vec![
            Message::user("Python help"),
            Message::assistant("Sure."),
            Message::user("Lists?"),
        ];

        PersistedState {
            conversations: vec![newer, older],
            theme: Theme::Light,
        }
    }

    #[test]
    fn test_memory_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.load(), None);

        let state = sample_state();
        store.save(&state).unwrap();
        assert_eq!(store.entry(THEME_KEY).as_deref(), Some("\"light\""));
        assert_eq!(store.load(), Some(state));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));
        assert_eq!(store.load(), None);

        let state = sample_state();
        store.save(&state).unwrap();
        assert!(store.dir().join("conversations.json").exists());
        assert!(!store.dir().join("conversations.json.tmp").exists());

        let reopened = FileStore::new(dir.path().join("nested"));
        assert_eq!(reopened.load(), Some(state));
    }

    #[test]
    fn test_corrupt_entries_fall_back() {
        let store = MemoryStore::new();
        store.save_entry(THEME_KEY, "\"sepia\"").unwrap();
        store.save_entry(CONVERSATIONS_KEY, "[{\"id\": ").unwrap();

        let state = store.load().unwrap();
        assert_eq!(state.theme, Theme::Dark);
        assert!(state.conversations.is_empty());
    }

    #[test]
    fn test_one_corrupt_entry_keeps_the_other() {
        let store = MemoryStore::new();
        store.save_entry(THEME_KEY, "\"light\"").unwrap();
        store.save_entry(CONVERSATIONS_KEY, "not json").unwrap();
        let state = store.load().unwrap();
        assert_eq!(state.theme, Theme::Light);
        assert!(state.conversations.is_empty());

        // A corrupt entry alone still counts as saved state.
        let store = MemoryStore::new();
        store.save_entry(CONVERSATIONS_KEY, "{").unwrap();
        assert_eq!(store.load(), Some(PersistedState::default()));
    }

    #[test]
    fn test_read_only_store() {
        let store = MemoryStore::new();
        store.set_read_only(true);
        let err = store.save(&sample_state()).unwrap_err();
        assert!(matches!(err, StoreError::Io { ref key, .. } if key == THEME_KEY));
        assert_eq!(store.load(), None);
    }
}
