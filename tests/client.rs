//! The assistant client against a live server on a local port.

mod common;

use std::sync::Arc;

use manuscrypt::client::{AssistantClient, ChatRequest, ClientError, SessionKey, SessionStore};
use manuscrypt::config::AppConfig;
use manuscrypt::llm::{ChatTurn, LlmProvider, ScriptedProvider, Step};
use manuscrypt::relay::RelayEvent;
use pretty_assertions::assert_eq;

use common::builders::{seed_book, seed_character};
use common::harness::spawn_server;
use common::test_app;

fn provider(p: ScriptedProvider) -> Option<Arc<dyn LlmProvider>> {
    Some(Arc::new(p))
}

#[tokio::test]
async fn test_send_folds_stream_into_session() {
    let app = test_app(
        provider(ScriptedProvider::fragments(["Hello", " world"])),
        AppConfig::default(),
    )
    .await;
    let book_id = seed_book(app.db(), "Book", None).await;
    let client = AssistantClient::new(spawn_server(&app).await);

    let mut store = SessionStore::new();
    let key = SessionKey::general(&book_id);
    let mut seen = Vec::new();
    let request = ChatRequest {
        book_id: book_id.clone(),
        message: "Go on".into(),
        command: Some("continue".into()),
        ..Default::default()
    };
    client
        .send(store.get_or_create(&key), &request, |e| seen.push(e.clone()))
        .await
        .unwrap();

    assert_eq!(
        seen,
        vec![
            RelayEvent::Text("Hello".into()),
            RelayEvent::Text(" world".into()),
            RelayEvent::Done,
        ]
    );
    let session = store.get(&key).unwrap();
    assert!(!session.is_streaming);
    assert!(session.error.is_none());
    assert_eq!(
        session.messages,
        vec![ChatTurn::user("Go on"), ChatTurn::assistant("Hello world")]
    );
}

#[tokio::test]
async fn test_upstream_failure_is_recorded_in_session() {
    let app = test_app(
        provider(ScriptedProvider::new(vec![
            Step::Text("Par".into()),
            Step::Fail("boom".into()),
        ])),
        AppConfig::default(),
    )
    .await;
    let client = AssistantClient::new(spawn_server(&app).await);

    let mut store = SessionStore::new();
    let key = SessionKey::general("b1");
    let request = ChatRequest {
        book_id: "b1".into(),
        message: "Go".into(),
        ..Default::default()
    };
    client
        .send(store.get_or_create(&key), &request, |_| {})
        .await
        .unwrap();

    let session = store.get(&key).unwrap();
    assert!(session.error.is_some());
    assert_eq!(session.messages.last(), Some(&ChatTurn::assistant("Par")));
}

#[tokio::test]
async fn test_rejected_request_surfaces_status() {
    let app = test_app(None, AppConfig::default()).await;
    let client = AssistantClient::new(spawn_server(&app).await);

    let mut store = SessionStore::new();
    let key = SessionKey::general("b1");
    let request = ChatRequest {
        book_id: "b1".into(),
        message: "Hi".into(),
        ..Default::default()
    };
    let err = client
        .send(store.get_or_create(&key), &request, |_| {})
        .await
        .unwrap_err();

    match err {
        ClientError::Status { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "ANTHROPIC_API_KEY not configured");
        }
        other => panic!("expected status error, got {other:?}"),
    }
    let session = store.get(&key).unwrap();
    assert!(!session.is_streaming);
    assert!(session.error.is_some());
}

#[tokio::test]
async fn test_interview_sends_prior_turns_as_history() {
    let scripted = Arc::new(ScriptedProvider::fragments(["Aye."]));
    let dynamic: Arc<dyn LlmProvider> = scripted.clone();
    let app = test_app(Some(dynamic), AppConfig::default()).await;
    let book_id = seed_book(app.db(), "Book", None).await;
    let character_id = seed_character(app.db(), &book_id, "Captain").await;
    let client = AssistantClient::new(spawn_server(&app).await);

    let mut store = SessionStore::new();
    let key = SessionKey::interview(&book_id, &character_id);
    for question in ["Ready?", "Sure?"] {
        client
            .interview(
                store.get_or_create(&key),
                &book_id,
                &character_id,
                question,
                |_| {},
            )
            .await
            .unwrap();
    }

    let second = &scripted.requests()[1];
    assert_eq!(
        second.messages,
        vec![
            ChatTurn::user("Ready?"),
            ChatTurn::assistant("Aye."),
            ChatTurn::user("Sure?"),
        ]
    );
    assert_eq!(store.get(&key).unwrap().messages.len(), 4);
}
