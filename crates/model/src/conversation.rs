use std::fmt::{self, Display, Formatter};
use std::num::ParseIntError;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Message;

/// The title a conversation carries until its first message arrives.
pub const UNTITLED: &str = "New conversation";

/// Identifies a conversation.
///
/// The value is the creation time in milliseconds since the Unix epoch,
/// which is distinct enough at human interaction rates. Ordering follows
/// creation order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ConversationId(i64);

impl ConversationId {
    /// Wraps a raw id.
    #[inline]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    #[inline]
    pub const fn as_raw(self) -> i64 {
        self.0
    }
}

impl Display for ConversationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConversationId {
    type Err = ParseIntError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// A titled, timestamped transcript.
///
/// The transcript only grows: messages are appended in chronological
/// order and never reordered or removed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// The unique id.
    pub id: ConversationId,
    /// The display title, [`UNTITLED`] until the first message.
    pub title: String,
    /// Messages in the order they were appended.
    #[serde(rename = "messages")]
    pub transcript: Vec<Message>,
    /// When the conversation was created.
    pub created_at: DateTime<Utc>,
    /// When the transcript last changed.
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Creates an empty conversation.
    #[inline]
    pub fn new(id: ConversationId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: UNTITLED.to_owned(),
            transcript: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` if no message has been appended yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.transcript.is_empty()
    }
}
