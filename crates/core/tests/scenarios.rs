use std::time::Duration;

use orb_chat_core::{FileStore, SessionBuilder, load_attachment};
use orb_chat_model::{Endpoint, MediaType, Message, Role, UNTITLED};
use orb_chat_test_backend::{PresetFailure, PresetReply, TestBackend};
use tokio::time::timeout;

const GUARD: Duration = Duration::from_secs(10);

#[tokio::test]
async fn test_first_message_creates_conversation() {
    let backend = TestBackend::default();
    backend.add_reply(PresetReply::reply("Hi! How can I help?"));
    let session = SessionBuilder::with_backend(backend.clone()).build();
    assert!(session.conversations().await.is_empty());

    let id = session.submit("Hello").await.unwrap();
    timeout(GUARD, session.wait_idle()).await.unwrap();

    let conversations = session.conversations().await;
    assert_eq!(conversations.len(), 1);
    let conversation = &conversations[0];
    assert_eq!(conversation.id, id);
    assert_eq!(conversation.title, "Hello");
    assert_eq!(
        conversation.transcript,
        vec![
            Message::user("Hello"),
            Message::assistant("Hi! How can I help?")
        ]
    );
    assert_eq!(session.active_conversation().await.unwrap().id, id);
    assert_eq!(backend.count(Endpoint::Chat), 1);
}

#[tokio::test]
async fn test_delete_active_conversation() {
    let backend = TestBackend::default();
    let session = SessionBuilder::with_backend(backend).build();

    let older = session.new_conversation().await;
    let newer = session.new_conversation().await;
    assert_eq!(session.active_conversation().await.unwrap().id, newer);

    session.delete_conversation(newer).await;
    assert!(session.active_conversation().await.is_none());
    let remaining: Vec<_> =
        session.conversations().await.iter().map(|c| c.id).collect();
    assert_eq!(remaining, vec![older]);

    // The next prompt starts a fresh conversation instead of reviving one.
    let id = session.submit("Start over").await.unwrap();
    assert_ne!(id, older);
    timeout(GUARD, session.wait_idle()).await.unwrap();
    assert_eq!(session.conversations().await.len(), 2);
    assert_eq!(session.conversation(older).await.unwrap().title, UNTITLED);
}

#[tokio::test]
async fn test_files_are_sent_once() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("report.pdf");
    let png = dir.path().join("chart.png");
    std::fs::write(&pdf, b"%PDF-1.7").unwrap();
    std::fs::write(&png, [0x89, b'P', b'N', b'G']).unwrap();

    let backend = TestBackend::default();
    backend.add_reply(PresetReply::reply("Both look fine."));
    backend.add_reply(PresetReply::Fail(PresetFailure::Transport));
    let session = SessionBuilder::with_backend(backend.clone()).build();

    for path in [&pdf, &png] {
        let attachment = load_attachment(path).await.unwrap();
        session.stage_attachment(attachment).await;
    }
    session.submit("Compare these").await.unwrap();
    timeout(GUARD, session.wait_idle()).await.unwrap();

    let requests = backend.requests();
    let request = &requests[0];
    assert_eq!(request.endpoint, Endpoint::ChatWithFiles);
    assert_eq!(request.prompt, "Compare these");
    assert!(request.history.is_empty());
    let files: Vec<_> = request
        .files
        .iter()
        .map(|f| (f.name.as_str(), f.media_type, f.size))
        .collect();
    assert_eq!(
        files,
        vec![("report.pdf", MediaType::Pdf, 8), ("chart.png", MediaType::Png, 4)]
    );
    assert!(session.staged_attachments().await.is_empty());

    // Staged files are cleared even when the exchange fails.
    let attachment = load_attachment(&pdf).await.unwrap();
    session.stage_attachment(attachment).await;
    let id = session.submit("Once more").await.unwrap();
    timeout(GUARD, session.wait_idle()).await.unwrap();
    assert!(session.staged_attachments().await.is_empty());

    let transcript = session.conversation(id).await.unwrap().transcript;
    assert_eq!(transcript.len(), 4);
    assert_eq!(transcript[3].role, Role::Assistant);
    assert!(transcript[3].content.starts_with("Sorry, something went wrong"));
    assert_eq!(backend.count(Endpoint::ChatWithFiles), 2);
    assert_eq!(backend.count(Endpoint::Chat), 0);
}

#[tokio::test]
async fn test_conversations_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let backend = TestBackend::default();

    let saved = {
        let session = SessionBuilder::with_backend(backend.clone())
            .with_store(FileStore::new(dir.path()))
            .build();
        session.submit("Tell me a short story").await.unwrap();
        timeout(GUARD, session.wait_idle()).await.unwrap();
        session.new_conversation().await;
        session.conversations().await
    };
    assert!(dir.path().join("conversations.json").exists());

    let session = SessionBuilder::with_backend(backend)
        .with_store(FileStore::new(dir.path()))
        .build();
    assert_eq!(session.conversations().await, saved);
    assert!(session.active_conversation().await.is_none());
}
