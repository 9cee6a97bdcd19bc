use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use orb_chat_model::{
    BackendError, ChatBackend, ChatRequest, ErrorKind, Message,
};
use tokio::time::timeout;
use tracing::Instrument;

pub type SendRequestResult = Result<Message, Box<dyn BackendError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn =
    Arc<dyn Fn(ChatRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// A wrapper around a chat backend that bounds every request by a
/// timeout and provides a type-erased interface for the other modules.
#[derive(Clone)]
pub struct BackendClient {
    handler_fn: HandlerFn,
}

impl BackendClient {
    pub fn new<B: ChatBackend + 'static>(
        backend: B,
        request_timeout: Duration,
    ) -> Self {
        // We have to erase the type `B`, since `BackendClient` doesn't have
        // a generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = backend.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {req:?}");
                    match timeout(request_timeout, fut).await {
                        Ok(Ok(msg)) => Ok(msg),
                        Ok(Err(err)) => {
                            warn!("backend failed: {err}");
                            Err(Box::new(err) as Box<dyn BackendError>)
                        }
                        Err(_) => {
                            warn!("backend did not answer in {request_timeout:?}");
                            Err(Box::new(TimeoutError(request_timeout)) as _)
                        }
                    }
                }
                .instrument(trace_span!("backend client req")),
            )
        });
        Self { handler_fn }
    }

    /// Issues a request and returns a future resolving to the reply.
    ///
    /// The backend sees the request before this method returns; only
    /// waiting for the reply is deferred to the future. Dropping the
    /// future abandons the request.
    #[inline]
    pub fn send_request(&self, req: ChatRequest) -> BoxedSendRequestFuture {
        (self.handler_fn)(req)
    }
}

#[derive(Debug)]
struct TimeoutError(Duration);

impl Display for TimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no response within {} seconds", self.0.as_secs_f32())
    }
}

impl StdError for TimeoutError {}

impl BackendError for TimeoutError {
    #[inline]
    fn kind(&self) -> ErrorKind {
        ErrorKind::Timeout
    }
}
