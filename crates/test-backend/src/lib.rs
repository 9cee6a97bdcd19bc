//! A local fake chat backend for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use orb_chat_model::{
    AttachmentInfo, BackendError, ChatBackend, ChatRequest, Endpoint,
    ErrorKind, Message,
};
use tokio::sync::watch;
use tokio::time::sleep;

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for Error {}

impl BackendError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// A request as the fake backend saw it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
    pub endpoint: Endpoint,
    pub prompt: String,
    pub history: Vec<Message>,
    pub use_web_search: bool,
    pub files: Vec<AttachmentInfo>,
}

struct Inner {
    script: Mutex<VecDeque<PresetReply>>,
    requests: Mutex<Vec<RecordedRequest>>,
    delay: Mutex<Option<Duration>>,
    gate_tx: watch::Sender<bool>,
}

/// A local fake backend for testing purpose.
///
/// Each request consumes the next scripted reply. When the script is
/// exhausted the backend echoes the prompt back as `You said <prompt>`.
/// Every request is recorded at the moment it is issued, so tests can
/// inspect it while the response is still pending.
///
/// Clones share the same script, records and gate.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone)]
pub struct TestBackend {
    inner: Arc<Inner>,
}

impl Default for TestBackend {
    fn default() -> Self {
        let (gate_tx, _) = watch::channel(true);
        Self {
            inner: Arc::new(Inner {
                script: Default::default(),
                requests: Default::default(),
                delay: Default::default(),
                gate_tx,
            }),
        }
    }
}

impl TestBackend {
    #[inline]
    pub fn add_reply(&self, reply: PresetReply) {
        lock(&self.inner.script).push_back(reply);
    }

    #[inline]
    pub fn set_delay(&self, duration: Duration) {
        *lock(&self.inner.delay) = Some(duration);
    }

    /// Holds every response, including those already in flight, until
    /// [`TestBackend::release`] is called.
    #[inline]
    pub fn hold(&self) {
        self.inner.gate_tx.send_replace(false);
    }

    /// Lets held responses complete.
    #[inline]
    pub fn release(&self) {
        self.inner.gate_tx.send_replace(true);
    }

    /// Returns every request received so far, oldest first.
    #[inline]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.inner.requests).clone()
    }

    /// Returns how many requests were sent to `endpoint`.
    #[inline]
    pub fn count(&self, endpoint: Endpoint) -> usize {
        lock(&self.inner.requests)
            .iter()
            .filter(|req| req.endpoint == endpoint)
            .count()
    }
}

impl Debug for TestBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestBackend")
            .field("pending_replies", &lock(&self.inner.script).len())
            .field("requests", &lock(&self.inner.requests).len())
            .finish()
    }
}

impl ChatBackend for TestBackend {
    type Error = crate::Error;

    fn send_request(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<Message, Self::Error>> + Send + 'static
    {
        lock(&self.inner.requests).push(RecordedRequest {
            endpoint: req.endpoint(),
            prompt: req.prompt.clone(),
            history: req.history.clone(),
            use_web_search: req.use_web_search,
            files: req.attachments.iter().map(|a| a.info()).collect(),
        });

        let reply = lock(&self.inner.script)
            .pop_front()
            .unwrap_or_else(|| PresetReply::reply(format!("You said {}", req.prompt)));
        let delay = *lock(&self.inner.delay);
        let mut gate_rx = self.inner.gate_tx.subscribe();

        async move {
            if let Some(delay) = delay {
                sleep(delay).await;
            }
            // The sender lives as long as any clone of the backend.
            gate_rx.wait_for(|open| *open).await.ok();

            match reply {
                PresetReply::Reply(content) => Ok(Message::assistant(content)),
                PresetReply::Fail(failure) => Err(Error {
                    message: format!("scripted {failure:?} failure"),
                    kind: failure.into(),
                }),
            }
        }
    }
}

#[inline]
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use orb_chat_model::{Attachment, MediaType};
    use tokio::time::timeout;

    use super::*;

    fn request(prompt: &str) -> ChatRequest {
        ChatRequest {
            prompt: prompt.to_owned(),
            history: vec![],
            use_web_search: false,
            attachments: vec![],
        }
    }

    #[tokio::test]
    async fn test_scripted_then_echo() {
        let backend = TestBackend::default();
        backend.add_reply(PresetReply::reply("Hi there"));
        backend.add_reply(PresetReply::Fail(PresetFailure::Status));

        let msg = backend.send_request(&request("Hello")).await.unwrap();
        assert_eq!(msg, Message::assistant("Hi there"));

        let err = backend.send_request(&request("Again")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Status);

        let msg = backend.send_request(&request("Good morning")).await.unwrap();
        assert_eq!(msg.content, "You said Good morning");
        assert_eq!(backend.count(Endpoint::Chat), 3);
    }

    #[tokio::test]
    async fn test_records_files() {
        let backend = TestBackend::default();
        let mut req = request("Describe");
        req.attachments
            .push(Attachment::new("a.png", MediaType::Png, vec![0; 4]));
        backend.send_request(&req).await.unwrap();

        let recorded = backend.requests();
        assert_eq!(recorded[0].endpoint, Endpoint::ChatWithFiles);
        assert_eq!(recorded[0].files[0].name, "a.png");
        assert_eq!(backend.count(Endpoint::Chat), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hold_and_release() {
        let backend = TestBackend::default();
        backend.hold();
        let fut = backend.send_request(&request("Wait"));
        let mut fut = Box::pin(fut);

        let held = timeout(Duration::from_secs(1), &mut fut).await;
        assert!(held.is_err());
        assert_eq!(backend.requests().len(), 1);

        backend.release();
        let msg = fut.await.unwrap();
        assert_eq!(msg.content, "You said Wait");
    }
}
