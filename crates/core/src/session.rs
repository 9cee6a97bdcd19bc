mod builder;
mod state;

use orb_chat_actor::Actor;
use orb_chat_model::{
    Attachment, AttachmentInfo, Conversation, ConversationId, Theme,
};
use tokio::sync::watch;

pub use builder::{DEFAULT_REQUEST_TIMEOUT, SessionBuilder};
use state::SessionState;

use crate::registry::LookupError;

/// The stage of the submission pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PipelineState {
    /// No request is outstanding; a submission may start.
    #[default]
    Idle,
    /// A request is outstanding. Its reply will be appended to the named
    /// conversation, whichever conversation is active by then.
    Submitting(ConversationId),
}

impl PipelineState {
    /// Returns `true` while a request is outstanding.
    #[inline]
    pub fn is_submitting(self) -> bool {
        matches!(self, PipelineState::Submitting(_))
    }
}

/// A chat session: the conversations, the composer's staged files and
/// the pipeline exchanging messages with the backend.
///
/// Every operation is handled in order by a single task, so the session
/// can be shared freely and always presents a consistent state. At most
/// one submission is in flight at a time; submitting while one is
/// outstanding does nothing.
///
/// Cloning a session yields another handle to the same session.
#[derive(Clone)]
pub struct Session {
    handle: Actor<SessionState>,
    thinking_rx: watch::Receiver<bool>,
}

impl Session {
    /// Submits a prompt to the active conversation, creating one first if
    /// none is active.
    ///
    /// The user message is appended right away and the staged files are
    /// sent with it, then cleared. Returns the conversation the exchange
    /// belongs to once the request is issued, without waiting for the
    /// reply. Returns `None`, doing nothing, if the prompt is blank or a
    /// submission is already in flight.
    pub async fn submit<S: Into<String>>(
        &self,
        prompt: S,
    ) -> Option<ConversationId> {
        let prompt = prompt.into();
        self.call(move |state, handle| state.submit(prompt, handle))
            .await
    }

    /// Creates an empty conversation and makes it active.
    pub async fn new_conversation(&self) -> ConversationId {
        self.call(|state, _| state.registry.create_conversation())
            .await
    }

    /// Makes another conversation active.
    pub async fn select_conversation(
        &self,
        id: ConversationId,
    ) -> Result<(), LookupError> {
        self.call(move |state, _| state.registry.select_conversation(id))
            .await
    }

    /// Deletes a conversation. Unknown ids are ignored.
    ///
    /// A reply still in flight for a deleted conversation is discarded
    /// when it arrives.
    pub async fn delete_conversation(&self, id: ConversationId) {
        self.call(move |state, _| state.registry.delete_conversation(id))
            .await
    }

    /// Returns a snapshot of the active conversation.
    pub async fn active_conversation(&self) -> Option<Conversation> {
        self.call(|state, _| state.registry.active_conversation().cloned())
            .await
    }

    /// Returns a snapshot of a conversation.
    pub async fn conversation(&self, id: ConversationId) -> Option<Conversation> {
        self.call(move |state, _| state.registry.get(id).cloned())
            .await
    }

    /// Returns a snapshot of every conversation, newest first.
    pub async fn conversations(&self) -> Vec<Conversation> {
        self.call(|state, _| state.registry.conversations().to_vec())
            .await
    }

    /// Stages a file for the next submission.
    pub async fn stage_attachment(&self, attachment: Attachment) {
        self.call(move |state, _| state.staging.stage(attachment))
            .await
    }

    /// Describes the staged files.
    pub async fn staged_attachments(&self) -> Vec<AttachmentInfo> {
        self.call(|state, _| state.staging.infos()).await
    }

    /// Discards the staged files.
    pub async fn clear_attachments(&self) {
        self.call(|state, _| state.staging.clear()).await
    }

    /// Turns web search on or off for following submissions.
    pub async fn set_web_search(&self, enabled: bool) {
        self.call(move |state, _| state.use_web_search = enabled)
            .await
    }

    /// Returns whether web search is on.
    pub async fn web_search(&self) -> bool {
        self.call(|state, _| state.use_web_search).await
    }

    /// Changes the theme preference.
    pub async fn set_theme(&self, theme: Theme) {
        self.call(move |state, _| state.registry.set_theme(theme))
            .await
    }

    /// Returns the theme preference.
    pub async fn theme(&self) -> Theme {
        self.call(|state, _| state.registry.theme()).await
    }

    /// Returns the current pipeline stage.
    pub async fn pipeline_state(&self) -> PipelineState {
        self.call(|state, _| state.pipeline).await
    }

    /// Subscribes to the "thinking" signal, which is `true` exactly while
    /// a submission is in flight.
    #[inline]
    pub fn thinking(&self) -> watch::Receiver<bool> {
        self.thinking_rx.clone()
    }

    /// Waits until no submission is in flight.
    pub async fn wait_idle(&self) {
        let mut thinking_rx = self.thinking_rx.clone();
        // The sender lives in the session task, which outlives `self`.
        thinking_rx.wait_for(|thinking| !*thinking).await.ok();
    }

    /// # Panics
    ///
    /// Panics if the session task is gone, which only happens if it
    /// panicked earlier.
    async fn call<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut SessionState, &Actor<SessionState>) -> R
            + Send
            + 'static,
        R: Send + 'static,
    {
        self.handle
            .call(f)
            .await
            .expect("session task has stopped")
    }
}
