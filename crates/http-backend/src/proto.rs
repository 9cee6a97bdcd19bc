use bytes::Bytes;
use orb_chat_model::{ChatRequest, ErrorKind, Message};
use reqwest::Body;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use crate::Error;

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatBody<'a> {
    prompt: &'a str,
    history: &'a [Message],
    use_web_search: bool,
}

/// One field of a `/chat-with-files` form, kept inspectable until it is
/// turned into a reqwest [`Form`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormField {
    Text {
        name: &'static str,
        value: String,
    },
    File {
        file_name: String,
        media_type: &'static str,
        data: Bytes,
    },
}

const FILES_FIELD: &str = "files";

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, Deserialize)]
struct ChatReply {
    response: Option<Message>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct HealthReply {
    pub status: String,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_chat_body(req: &ChatRequest) -> ChatBody<'_> {
    ChatBody {
        prompt: &req.prompt,
        history: &req.history,
        use_web_search: req.use_web_search,
    }
}

pub fn create_form_fields(req: &ChatRequest) -> Result<Vec<FormField>, Error> {
    let history = serde_json::to_string(&req.history)
        .map_err(|err| Error::new(format!("{err}"), ErrorKind::Transport))?;
    let mut fields = vec![
        FormField::Text {
            name: "prompt",
            value: req.prompt.clone(),
        },
        FormField::Text {
            name: "history",
            value: history,
        },
        FormField::Text {
            name: "use_web_search",
            value: req.use_web_search.to_string(),
        },
    ];
    fields.extend(req.attachments.iter().map(|attachment| FormField::File {
        file_name: attachment.name().to_owned(),
        media_type: attachment.media_type().as_str(),
        data: attachment.data().clone(),
    }));
    Ok(fields)
}

pub fn create_form(fields: Vec<FormField>) -> Result<Form, Error> {
    let mut form = Form::new();
    for field in fields {
        form = match field {
            FormField::Text { name, value } => form.text(name, value),
            FormField::File {
                file_name,
                media_type,
                data,
            } => {
                let len = data.len() as u64;
                let part = Part::stream_with_length(Body::from(data), len)
                    .file_name(file_name)
                    .mime_str(media_type)
                    .map_err(|err| {
                        Error::new(format!("{err}"), ErrorKind::Transport)
                    })?;
                form.part(FILES_FIELD, part)
            }
        };
    }
    Ok(form)
}

pub fn parse_chat_reply(body: &[u8]) -> Result<Message, Error> {
    let reply = serde_json::from_slice::<ChatReply>(body).map_err(|err| {
        Error::new(format!("{err}"), ErrorKind::Deserialization)
    })?;
    reply.response.ok_or_else(|| {
        Error::new("response has no message", ErrorKind::Deserialization)
    })
}

#[cfg(test)]
mod tests {
    use orb_chat_model::{Attachment, MediaType, Role};
    use serde_json::json;

    use super::*;

    fn request_with_files() -> ChatRequest {
        ChatRequest {
            prompt: "Describe these".to_owned(),
            history: vec![Message::user("Hi"), Message::assistant("Hello!")],
            use_web_search: true,
            attachments: vec![
                Attachment::new("a.pdf", MediaType::Pdf, &b"%PDF"[..]),
                Attachment::new("b.jpg", MediaType::Jpeg, &b"\xff\xd8"[..]),
            ],
        }
    }

    #[test]
    fn test_chat_body() {
        let mut req = request_with_files();
        req.attachments.clear();
        req.use_web_search = false;
        let body = serde_json::to_value(create_chat_body(&req)).unwrap();
        assert_eq!(
            body,
            json!({
                "prompt": "Describe these",
                "history": [
                    { "role": "user", "content": "Hi" },
                    { "role": "assistant", "content": "Hello!" }
                ],
                "use_web_search": false
            })
        );
    }

    #[test]
    fn test_form_fields() {
        let fields = create_form_fields(&request_with_files()).unwrap();
        assert_eq!(fields.len(), 5);
        assert_eq!(
            fields[0],
            FormField::Text {
                name: "prompt",
                value: "Describe these".to_owned()
            }
        );
        let FormField::Text { name, value } = &fields[1] else {
            panic!("unexpected field: {:?}", fields[1]);
        };
        assert_eq!(*name, "history");
        let history: Vec<Message> = serde_json::from_str(value).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(
            fields[2],
            FormField::Text {
                name: "use_web_search",
                value: "true".to_owned()
            }
        );
        assert_eq!(
            fields[4],
            FormField::File {
                file_name: "b.jpg".to_owned(),
                media_type: "image/jpeg",
                data: Bytes::from_static(b"\xff\xd8"),
            }
        );

        assert!(create_form(fields).is_ok());
    }

    #[test]
    fn test_parse_chat_reply() {
        let msg = parse_chat_reply(
            br#"{ "response": { "role": "assistant", "content": "Bonjour" } }"#,
        )
        .unwrap();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content, "Bonjour");

        let err = parse_chat_reply(b"{}").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Deserialization);
        let err = parse_chat_reply(br#"{ "response": {} }"#).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Deserialization);
        let err = parse_chat_reply(b"<html>").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Deserialization);
    }
}
