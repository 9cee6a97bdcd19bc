use std::error::Error;

use crate::{Attachment, ErrorKind, Message};

/// The error type for a chat backend.
pub trait BackendError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}

/// The backend route a request is sent to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Plain JSON chat, `POST /chat`.
    Chat,
    /// Multipart chat carrying files, `POST /chat-with-files`.
    ChatWithFiles,
}

impl Endpoint {
    /// Returns the path of this endpoint, relative to the base URL.
    #[inline]
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Chat => "/chat",
            Endpoint::ChatWithFiles => "/chat-with-files",
        }
    }
}

/// One exchange to be sent to the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatRequest {
    /// The new user turn.
    pub prompt: String,
    /// The conversation so far, excluding the new user turn.
    pub history: Vec<Message>,
    /// Whether the backend should consult web search.
    pub use_web_search: bool,
    /// Files to send along with the prompt.
    pub attachments: Vec<Attachment>,
}

impl ChatRequest {
    /// Returns the endpoint this request must be sent to.
    ///
    /// Requests carrying attachments go to [`Endpoint::ChatWithFiles`],
    /// everything else to [`Endpoint::Chat`].
    #[inline]
    pub fn endpoint(&self) -> Endpoint {
        if self.attachments.is_empty() {
            Endpoint::Chat
        } else {
            Endpoint::ChatWithFiles
        }
    }
}

/// A remote service that answers one chat exchange at a time.
///
/// Once created, the backend should behave like a stateless object.
/// Each call sends exactly one request and resolves to the single
/// message the backend replied with.
pub trait ChatBackend: Send + Sync {
    /// The error type that may be returned by the backend.
    type Error: BackendError;

    /// Sends a request to the backend.
    ///
    /// The returned future must not borrow `self`.
    fn send_request(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<Message, Self::Error>> + Send + 'static;
}
