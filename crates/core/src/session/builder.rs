use std::time::Duration;

use orb_chat_actor::Actor;
use orb_chat_model::{ChatBackend, ConversationId, Message};
use tokio::sync::watch;

use super::Session;
use super::state::{MessageCallback, SessionState};
use crate::backend_client::BackendClient;
use crate::registry::Registry;
use crate::staging::StagingArea;
use crate::store::{MemoryStore, Store};

/// The request timeout used when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// [`Session`] builder.
pub struct SessionBuilder {
    backend_client: Box<dyn FnOnce(Duration) -> BackendClient + Send>,
    store: Box<dyn Store>,
    request_timeout: Duration,
    use_web_search: bool,
    on_idle: Option<Box<dyn Fn() + Send + Sync>>,
    on_message: Option<MessageCallback>,
}

impl SessionBuilder {
    /// Creates a new builder with the specified backend.
    ///
    /// Unless [`SessionBuilder::with_store`] is called, the session keeps
    /// its conversations in memory only.
    #[inline]
    pub fn with_backend<B: ChatBackend + 'static>(backend: B) -> Self {
        Self {
            backend_client: Box::new(move |timeout| {
                BackendClient::new(backend, timeout)
            }),
            store: Box::new(MemoryStore::new()),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            use_web_search: false,
            on_idle: None,
            on_message: None,
        }
    }

    /// Sets the store conversations are restored from and saved to.
    #[inline]
    pub fn with_store<S: Store>(mut self, store: S) -> Self {
        self.store = Box::new(store);
        self
    }

    /// Bounds how long one submission may wait for the backend. A
    /// request exceeding it fails like any other transport error.
    #[inline]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the initial web search toggle.
    #[inline]
    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.use_web_search = enabled;
        self
    }

    /// Attaches a callback to be invoked when the pipeline becomes idle
    /// after a submission.
    #[inline]
    pub fn on_idle(
        mut self,
        on_idle: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.on_idle = Some(Box::new(on_idle));
        self
    }

    /// Attaches a callback to be invoked whenever the pipeline appends a
    /// message to a conversation.
    #[inline]
    pub fn on_message(
        mut self,
        on_message: impl Fn(ConversationId, &Message) + Send + Sync + 'static,
    ) -> Self {
        self.on_message = Some(Box::new(on_message));
        self
    }

    /// Builds the session, restoring the stored conversations.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn build(self) -> Session {
        let SessionBuilder {
            backend_client,
            store,
            request_timeout,
            use_web_search,
            on_idle,
            on_message,
        } = self;

        let (thinking_tx, thinking_rx) = watch::channel(false);
        let state = SessionState {
            backend_client: backend_client(request_timeout),
            registry: Registry::open(store),
            staging: StagingArea::default(),
            use_web_search,
            pipeline: Default::default(),
            thinking_tx,
            on_idle,
            on_message,
        };
        Session {
            handle: Actor::spawn(state, Some("session")),
            thinking_rx,
        }
    }
}
