use orb_chat_model::ErrorKind;
use serde::{Deserialize, Serialize};

/// How a scripted failure presents itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetFailure {
    /// The backend is unreachable.
    Transport,
    /// The request never completes in time.
    Timeout,
    /// The backend answers with a non-success status.
    Status,
    /// The backend answers with a malformed body.
    Deserialization,
}

impl From<PresetFailure> for ErrorKind {
    #[inline]
    fn from(failure: PresetFailure) -> Self {
        match failure {
            PresetFailure::Transport => ErrorKind::Transport,
            PresetFailure::Timeout => ErrorKind::Timeout,
            PresetFailure::Status => ErrorKind::Status,
            PresetFailure::Deserialization => ErrorKind::Deserialization,
        }
    }
}

/// The scripted outcome of one request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetReply {
    /// The backend replies with an assistant message.
    #[serde(rename = "reply")]
    Reply(String),
    /// The request fails.
    #[serde(rename = "fail")]
    Fail(PresetFailure),
}

impl PresetReply {
    /// Creates a successful reply.
    #[inline]
    pub fn reply<S: Into<String>>(content: S) -> Self {
        Self::Reply(content.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_deserialize() {
        let script = vec![
            PresetReply::reply("Hello, **world**!"),
            PresetReply::Fail(PresetFailure::Status),
        ];

        let serialized = serde_json::to_string(&script).unwrap();
        assert!(serialized.contains(r#""type":"fail","data":"status""#));
        let deserialized: Vec<PresetReply> =
            serde_json::from_str(&serialized).unwrap();

        assert_eq!(script, deserialized);
    }
}
