//! A chat backend reached over HTTP.
//!
//! Plain exchanges are posted as JSON to `/chat`. Exchanges carrying
//! files are posted as `multipart/form-data` to `/chat-with-files`. Both
//! answer with `{ "response": { "role": ..., "content": ... } }`.

#[macro_use]
extern crate tracing;

mod config;
mod proto;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use orb_chat_model::{
    BackendError, ChatBackend, ChatRequest, Endpoint, ErrorKind, Message,
};
use reqwest::{Client, Response, header};

pub use config::{
    BackendConfig, BackendConfigBuilder, DEFAULT_BASE_URL, DEFAULT_TIMEOUT,
};

/// Error type for [`HttpBackend`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ErrorKind::Timeout
        } else if err.is_status() {
            ErrorKind::Status
        } else if err.is_decode() {
            ErrorKind::Deserialization
        } else {
            ErrorKind::Transport
        };
        Self::new(format!("{err}"), kind)
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl BackendError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Chat backend speaking the HTTP protocol described in the crate docs.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    config: Arc<BackendConfig>,
}

impl HttpBackend {
    /// Creates a new `HttpBackend` with the given configuration.
    #[inline]
    pub fn new(config: BackendConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }

    /// Returns the configuration in use.
    #[inline]
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Probes `GET /` and returns the status string the backend reports.
    pub async fn health(&self) -> Result<String, Error> {
        let url = self.config.url("/");
        trace!("probing {url}");
        let resp = self
            .client
            .get(url)
            .timeout(self.config.timeout)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(Error::from_reqwest)?;
        let reply = resp
            .json::<proto::HealthReply>()
            .await
            .map_err(Error::from_reqwest)?;
        Ok(reply.status)
    }
}

impl ChatBackend for HttpBackend {
    type Error = Error;

    fn send_request(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<Message, Self::Error>> + Send + 'static
    {
        let endpoint = req.endpoint();
        let url = self.config.url(endpoint.path());
        debug!(
            "posting to {url} with {} history messages and {} files",
            req.history.len(),
            req.attachments.len()
        );

        let builder = self
            .client
            .post(url)
            .timeout(self.config.timeout)
            .header(header::ACCEPT, "application/json");
        let builder = match endpoint {
            Endpoint::Chat => Ok(builder.json(&proto::create_chat_body(req))),
            Endpoint::ChatWithFiles => proto::create_form_fields(req)
                .and_then(proto::create_form)
                .map(|form| builder.multipart(form)),
        };

        async move {
            let resp = builder?
                .send()
                .await
                .and_then(Response::error_for_status)
                .map_err(Error::from_reqwest)?;
            trace!("got status {}", resp.status());

            // Here we got a successful response.
            let body = resp.bytes().await.map_err(Error::from_reqwest)?;
            proto::parse_chat_reply(&body)
        }
    }
}
