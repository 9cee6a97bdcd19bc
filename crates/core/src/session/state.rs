use std::error::Error as StdError;
use std::fmt::{self, Display};

use orb_chat_actor::{Actor, Message as ActorMessage};
use orb_chat_model::{
    BackendError, ChatRequest, ConversationId, ErrorKind, Message,
};
use tokio::sync::watch;

use super::PipelineState;
use crate::backend_client::{BackendClient, SendRequestResult};
use crate::registry::Registry;
use crate::staging::StagingArea;

pub type MessageCallback = Box<dyn Fn(ConversationId, &Message) + Send + Sync>;

pub struct SessionState {
    pub backend_client: BackendClient,
    pub registry: Registry,
    pub staging: StagingArea,
    pub use_web_search: bool,
    pub pipeline: PipelineState,
    pub thinking_tx: watch::Sender<bool>,
    pub on_idle: Option<Box<dyn Fn() + Send + Sync>>,
    pub on_message: Option<MessageCallback>,
}

impl SessionState {
    pub fn submit(
        &mut self,
        prompt: String,
        handle: &Actor<Self>,
    ) -> Option<ConversationId> {
        if prompt.trim().is_empty() {
            trace!("ignoring blank prompt");
            return None;
        }
        if let PipelineState::Submitting(target) = self.pipeline {
            debug!("ignoring prompt, still waiting on conversation {target}");
            return None;
        }

        let target = match self.registry.active_id() {
            Some(id) => id,
            None => self.registry.create_conversation(),
        };
        // The history is captured before the new turn, which the backend
        // receives separately as `prompt`.
        let history = self
            .registry
            .get(target)
            .map(|c| c.transcript.clone())
            .unwrap_or_default();
        self.append(target, Message::user(prompt.clone()));

        let request = ChatRequest {
            prompt,
            history,
            use_web_search: self.use_web_search,
            attachments: self.staging.take(),
        };
        debug!(
            "submitting to conversation {target} via {:?}",
            request.endpoint()
        );
        self.set_pipeline(PipelineState::Submitting(target));

        let response_fut = self.backend_client.send_request(request);
        let mut finisher = Finisher {
            target,
            handle: Some(handle.clone()),
        };
        tokio::spawn(async move {
            let response = response_fut.await;
            finisher.finish(response);
        });
        Some(target)
    }

    fn append(&mut self, target: ConversationId, message: Message) {
        match self.registry.append_message(target, message.clone()) {
            Ok(()) => {
                if let Some(on_message) = &self.on_message {
                    on_message(target, &message);
                }
            }
            // The conversation was deleted while the request was in flight.
            Err(err) => warn!("dropping reply: {err}"),
        }
    }

    fn set_pipeline(&mut self, pipeline: PipelineState) {
        self.pipeline = pipeline;
        self.thinking_tx.send_replace(pipeline.is_submitting());
    }
}

/// Reports the outcome of a request back to the session exactly once.
///
/// If the request task ends without reporting, e.g. because the backend
/// panicked, dropping the finisher reports an aborted request so the
/// pipeline never stays in `Submitting`.
struct Finisher {
    target: ConversationId,
    handle: Option<Actor<SessionState>>,
}

impl Finisher {
    fn finish(&mut self, response: SendRequestResult) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let target = self.target;
        handle
            .send(RequestFinishedMessage { target, response })
            .ok();
    }
}

impl Drop for Finisher {
    fn drop(&mut self) {
        self.finish(Err(Box::new(AbortedError)));
    }
}

#[derive(Debug)]
struct AbortedError;

impl Display for AbortedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("the request was aborted")
    }
}

impl StdError for AbortedError {}

impl BackendError for AbortedError {
    #[inline]
    fn kind(&self) -> ErrorKind {
        ErrorKind::Transport
    }
}

#[derive(Debug)]
struct RequestFinishedMessage {
    target: ConversationId,
    response: SendRequestResult,
}

impl ActorMessage<SessionState> for RequestFinishedMessage {
    fn handle(
        self: Box<Self>,
        state: &mut SessionState,
        _handle: &Actor<SessionState>,
    ) {
        let RequestFinishedMessage { target, response } = *self;
        let reply = match response {
            Ok(reply) => reply,
            Err(err) => {
                warn!("submission to conversation {target} failed: {err}");
                Message::assistant(failure_text(&err))
            }
        };
        state.append(target, reply);

        state.set_pipeline(PipelineState::Idle);
        if let Some(on_idle) = &state.on_idle {
            on_idle();
        }
    }
}

/// The assistant turn shown in place of a reply that never came.
pub fn failure_text(err: &dyn Display) -> String {
    format!("Sorry, something went wrong: {err}")
}
