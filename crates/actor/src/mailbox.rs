use std::fmt::{self, Debug};
use std::sync::Weak;

use tokio::sync::{mpsc, oneshot};

use crate::Actor;

/// The message that an actor can handle.
///
/// Messages are handled strictly one at a time, in the order they were
/// sent, each with exclusive access to the actor's state.
pub trait Message<S>: Send + Debug + 'static {
    /// Handles the message with mutable access to the actor's state.
    fn handle(self: Box<Self>, state: &mut S, handle: &Actor<S>);
}

pub(crate) type BoxedMessage<S> = Box<dyn Message<S>>;

pub(crate) struct Mailbox<S> {
    msg_tx: mpsc::UnboundedSender<BoxedMessage<S>>,
}

impl<S: Send + 'static> Mailbox<S> {
    #[inline]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BoxedMessage<S>>) {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        (Mailbox { msg_tx }, msg_rx)
    }

    #[inline]
    pub fn send(&self, msg: BoxedMessage<S>) -> bool {
        self.msg_tx.send(msg).is_ok()
    }
}

/// A message that runs a closure against the state and sends back what
/// it returns.
pub(crate) struct Call<S, F, R> {
    pub f: F,
    pub reply_tx: oneshot::Sender<R>,
    pub _state: std::marker::PhantomData<fn(&mut S)>,
}

impl<S, F, R> Debug for Call<S, F, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("returns", &std::any::type_name::<R>())
            .finish_non_exhaustive()
    }
}

impl<S, F, R> Message<S> for Call<S, F, R>
where
    S: 'static,
    F: FnOnce(&mut S, &Actor<S>) -> R + Send + 'static,
    R: Send + 'static,
{
    fn handle(self: Box<Self>, state: &mut S, handle: &Actor<S>) {
        let Call { f, reply_tx, .. } = *self;
        // The caller may have given up waiting, which is fine.
        reply_tx.send(f(state, handle)).ok();
    }
}

pub(crate) async fn run_actor<S: Send + 'static>(
    mailbox: Weak<Mailbox<S>>,
    mut state: S,
    mut msg_rx: mpsc::UnboundedReceiver<BoxedMessage<S>>,
) {
    debug!("started");
    while let Some(msg) = msg_rx.recv().await {
        trace!("received message: {msg:?}");

        let Some(mailbox) = mailbox.upgrade() else {
            warn!("last handle has been dropped, discard the message");
            break;
        };
        let proc_span = trace_span!("proc msg");
        proc_span.in_scope(|| {
            msg.handle(&mut state, &Actor::from_mailbox(mailbox));
            trace!("finished");
        });
    }
    debug!("will terminate");
}
