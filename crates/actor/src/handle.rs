use std::marker::PhantomData;
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::Instrument;

use crate::ActorDeadError;
use crate::mailbox::{Call, Mailbox, Message, run_actor};

/// Handle to an actor.
///
/// The actor keeps running while at least one handle is alive. Cloning
/// a handle is cheap.
pub struct Actor<S> {
    mailbox: Arc<Mailbox<S>>,
}

impl<S: Send + 'static> Actor<S> {
    /// Spawns a new actor on the current tokio runtime, with the
    /// specified state and an optional label for tracing.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn spawn(state: S, label: Option<&str>) -> Self {
        let (mailbox, msg_rx) = Mailbox::new();
        let mailbox = Arc::new(mailbox);
        tokio::spawn(
            run_actor(Arc::downgrade(&mailbox), state, msg_rx)
                .instrument(trace_span!("actor", label = label)),
        );
        Self { mailbox }
    }

    #[inline]
    pub(crate) fn from_mailbox(mailbox: Arc<Mailbox<S>>) -> Self {
        Self { mailbox }
    }

    /// Sends a message to the actor without waiting for it to be handled.
    #[inline]
    pub fn send<M: Message<S>>(&self, msg: M) -> Result<(), ActorDeadError> {
        if self.mailbox.send(Box::new(msg)) {
            Ok(())
        } else {
            Err(ActorDeadError)
        }
    }

    /// Runs `f` against the actor's state and returns its result.
    ///
    /// The closure is queued like any other message, so it observes every
    /// message sent before it and none sent after.
    pub async fn call<F, R>(&self, f: F) -> Result<R, ActorDeadError>
    where
        F: FnOnce(&mut S, &Actor<S>) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Call {
            f,
            reply_tx,
            _state: PhantomData,
        })?;
        reply_rx.await.map_err(|_| ActorDeadError)
    }
}

impl<S> Clone for Actor<S> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            mailbox: Arc::clone(&self.mailbox),
        }
    }
}
