use std::fmt::{self, Display, Formatter};

/// The kind of error a chat backend reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The backend could not be reached, or the connection broke.
    Transport,
    /// The request did not complete in time.
    Timeout,
    /// The backend answered with a non-success status.
    Status,
    /// The response body was malformed or missing fields.
    Deserialization,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Transport => write!(f, "transport error"),
            ErrorKind::Timeout => write!(f, "request timed out"),
            ErrorKind::Status => write!(f, "unexpected status"),
            ErrorKind::Deserialization => write!(f, "malformed response"),
        }
    }
}
