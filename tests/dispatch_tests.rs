// Command dispatch properties: optimistic user message, error-flagged
// replies, connection status and session-id rotation.

mod common;

use common::MockBackend;
use rover_console::{ConnectionStatus, Role, SessionState, CONNECTION_ERROR_TEXT, GREETING};
use std::sync::atomic::Ordering;

#[tokio::test]
async fn typed_command_round_trip() {
    let mock = MockBackend::new().with_chat_reply("Moving forward now.");
    let (console, _) = common::scripted_console(mock.clone(), Vec::new(), 50).await;

    console.connect().await.expect("connect");
    let reply = console.send("move forward").await.expect("dispatched");

    assert_eq!(reply.role, Role::Bot);
    assert_eq!(reply.text, "Moving forward now.");
    assert!(!reply.is_error);

    let messages = console.messages().await;
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].text, GREETING);
    assert_eq!(messages[1].role, Role::User);
    assert_eq!(messages[1].text, "move forward");
    assert_eq!(messages[2].text, "Moving forward now.");
    assert!(messages[1].id < messages[2].id);

    assert_eq!(console.connection(), ConnectionStatus::Connected);
    assert_eq!(
        mock.last_chat_session.lock().unwrap().as_deref(),
        Some(common::SESSION_ID)
    );
}

#[tokio::test]
async fn failed_dispatch_marks_disconnected_with_one_error_message() {
    let mock = MockBackend::new();
    mock.fail_chat.store(true, Ordering::SeqCst);
    let (console, _) = common::scripted_console(mock.clone(), Vec::new(), 50).await;

    console.connect().await.expect("connect");
    let reply = console.send("turn left").await.expect("dispatched");

    assert!(reply.is_error);
    assert_eq!(reply.text, CONNECTION_ERROR_TEXT);
    assert_eq!(console.connection(), ConnectionStatus::Disconnected);
    assert!(!console.is_awaiting_reply());

    let errors: Vec<_> = console
        .messages()
        .await
        .into_iter()
        .filter(|m| m.is_error)
        .collect();
    assert_eq!(errors.len(), 1);
}

#[tokio::test]
async fn successful_dispatch_restores_connected() {
    let mock = MockBackend::new();
    mock.fail_chat.store(true, Ordering::SeqCst);
    let (console, _) = common::scripted_console(mock.clone(), Vec::new(), 50).await;

    console.connect().await.expect("connect");
    console.send("stop").await;
    assert_eq!(console.connection(), ConnectionStatus::Disconnected);

    mock.fail_chat.store(false, Ordering::SeqCst);
    console.send("stop").await;
    assert_eq!(console.connection(), ConnectionStatus::Connected);
}

#[tokio::test]
async fn dispatch_without_a_session_is_a_silent_no_op() {
    let mock = MockBackend::new();
    mock.fail_start.store(true, Ordering::SeqCst);
    let (console, _) = common::scripted_console(mock.clone(), Vec::new(), 50).await;

    assert!(console.connect().await.is_err());

    let outcome = console.send("move forward").await;
    assert!(outcome.is_none());
    assert_eq!(mock.chat_calls.load(Ordering::SeqCst), 0);

    // Only the greeting; no user message, no error entry.
    let messages = console.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text, GREETING);
}

#[tokio::test]
async fn blank_text_is_rejected_before_the_network() {
    let mock = MockBackend::new();
    let (console, _) = common::scripted_console(mock.clone(), Vec::new(), 50).await;

    console.connect().await.expect("connect");
    assert!(console.send("   ").await.is_none());
    assert_eq!(mock.chat_calls.load(Ordering::SeqCst), 0);
    assert_eq!(console.messages().await.len(), 1);
}

#[tokio::test]
async fn rotated_session_id_is_used_for_subsequent_calls() {
    let mock = MockBackend::new();
    *mock.rotate_to.lock().unwrap() = Some("session-2".to_string());
    let (console, _) = common::scripted_console(mock.clone(), Vec::new(), 50).await;

    console.connect().await.expect("connect");
    console.send("move forward").await.expect("first dispatch");
    console.send("stop").await.expect("second dispatch");

    assert_eq!(
        mock.last_chat_session.lock().unwrap().as_deref(),
        Some("session-2")
    );
}

#[tokio::test]
async fn reset_clears_chat_but_keeps_the_session() {
    let mock = MockBackend::new();
    let (console, _) = common::scripted_console(mock.clone(), Vec::new(), 50).await;

    console.connect().await.expect("connect");
    console.send("move forward").await.expect("dispatched");
    assert!(!console.messages().await.is_empty());

    console.reset().await;
    assert!(console.messages().await.is_empty());
    assert!(matches!(
        console.session_state().await,
        SessionState::Active(_)
    ));

    // Still dispatchable after the reset.
    assert!(console.send("stop").await.is_some());
}
