use std::ops::Deref;

use orb_chat_core::{
    FileStore, MemoryStore, Session as CoreSession,
    SessionBuilder as CoreSessionBuilder,
};
use orb_chat_http_backend::{Error as HttpError, HttpBackend};
use orb_chat_model::{ConversationId, Message};

use crate::ClientConfig;

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    backend: HttpBackend,
    core_builder: CoreSessionBuilder,
}

impl SessionBuilder {
    /// Creates a session builder talking to the backend described by
    /// `config` and storing conversations in its data directory.
    pub fn with_config(config: &ClientConfig) -> Self {
        let backend = HttpBackend::new(config.backend.clone());
        let core_builder = CoreSessionBuilder::with_backend(backend.clone())
            .with_request_timeout(config.request_timeout);
        let core_builder = match &config.data_dir {
            Some(dir) => {
                info!("storing conversations in {}", dir.display());
                core_builder.with_store(FileStore::new(dir))
            }
            None => {
                warn!("no data directory, conversations will not be kept");
                core_builder.with_store(MemoryStore::new())
            }
        };
        Self {
            backend,
            core_builder,
        }
    }

    /// Sets the initial web search toggle.
    #[inline]
    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.core_builder = self.core_builder.with_web_search(enabled);
        self
    }

    /// Attaches a callback to be invoked when a submission has completed.
    #[inline]
    pub fn on_idle(
        mut self,
        on_idle: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.core_builder = self.core_builder.on_idle(on_idle);
        self
    }

    /// Attaches a callback to be invoked when a message is appended.
    #[inline]
    pub fn on_message(
        mut self,
        on_message: impl Fn(ConversationId, &Message) + Send + Sync + 'static,
    ) -> Self {
        self.core_builder = self.core_builder.on_message(on_message);
        self
    }

    /// Builds a new session.
    pub fn build(self) -> Session {
        Session {
            inner: self.core_builder.build(),
            backend: self.backend,
        }
    }
}

/// A chat session backed by the HTTP backend.
///
/// Dereferences to [`orb_chat_core::Session`] for every conversation
/// operation, and adds a probe for the backend itself.
#[derive(Clone)]
pub struct Session {
    inner: CoreSession,
    backend: HttpBackend,
}

impl Session {
    /// Asks the backend whether it is up and returns the status it reports.
    #[inline]
    pub async fn backend_status(&self) -> Result<String, HttpError> {
        self.backend.health().await
    }

    /// Returns the base URL requests are sent to.
    #[inline]
    pub fn backend_url(&self) -> &str {
        self.backend.config().base_url()
    }
}

impl Deref for Session {
    type Target = CoreSession;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
