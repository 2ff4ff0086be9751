use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use chat_session::{
    ChatSessionAccumulator, SendOutcome, SessionError, SessionState, TurnNotice, ABORT_NOTICE,
};
use chat_transport::{
    cancel_signal, CancelSignal, ChatMessage, ChatTransport, DeltaStream, SendRequest,
    TextDelta, TransportError, TransportProfile,
};
use chat_transport_managed::{ManagedStreamTransport, ScriptedBackend, ScriptedReply};
use proptest::prelude::*;

/// Replays fixed deltas and records every request it receives.
struct FixedTransport {
    deltas: Vec<String>,
    requests: Arc<std::sync::Mutex<Vec<SendRequest>>>,
}

impl ChatTransport for FixedTransport {
    fn profile(&self) -> TransportProfile {
        TransportProfile {
            transport_id: "fixed".to_string(),
            model_id: "fixed".to_string(),
        }
    }

    fn send(&mut self, request: SendRequest, _cancel: CancelSignal) -> DeltaStream<'_> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request);
        let deltas = self.deltas.clone();
        Box::pin(stream! {
            for delta in deltas {
                yield Ok(TextDelta::from(delta));
            }
        })
    }
}

fn scripted_session(backend: &ScriptedBackend) -> ChatSessionAccumulator {
    ChatSessionAccumulator::new(
        Box::new(ManagedStreamTransport::new(Arc::new(backend.clone()))),
        "You are terse.",
    )
}

#[tokio::test]
async fn completed_send_fills_placeholder_in_arrival_order() {
    let backend = ScriptedBackend::new(vec![ScriptedReply::chunks(["Hi", " there", "!"])]);
    let mut session = scripted_session(&backend);
    let mut seen = Vec::new();

    let outcome = session
        .send("hello", cancel_signal(), |message| seen.push(message.content.clone()))
        .await
        .expect("send");

    assert_eq!(outcome, SendOutcome::Completed);
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(
        session.messages(),
        &[ChatMessage::user("hello"), ChatMessage::model("Hi there!")]
    );
    assert_eq!(
        seen,
        vec!["Hi".to_string(), "Hi there".to_string(), "Hi there!".to_string()]
    );
}

#[tokio::test]
async fn cancel_after_two_deltas_keeps_exactly_their_text() {
    let backend = ScriptedBackend::new(vec![ScriptedReply::chunks(["a", "b", "c", "d"])])
        .with_chunk_delay(Duration::from_millis(40));
    let mut session = scripted_session(&backend);
    let cancel = cancel_signal();
    let trigger = cancel.clone();
    let mut applied = 0;

    let outcome = session
        .send("go", cancel, |_| {
            applied += 1;
            if applied == 2 {
                trigger.store(true, Ordering::SeqCst);
            }
        })
        .await
        .expect("send");

    assert!(matches!(outcome, SendOutcome::Aborted { ref notice } if !notice.is_empty()));
    assert_eq!(applied, 2);
    assert_eq!(session.messages()[1].content, "ab");
    assert_eq!(session.state(), SessionState::Idle);

    let snapshot = session.snapshot().expect("snapshot");
    assert_eq!(snapshot.messages[1].content, "ab");
    assert_eq!(
        snapshot.notices,
        vec![TurnNotice {
            message_index: 1,
            notice: ABORT_NOTICE.to_string(),
        }]
    );
    let json = serde_json::to_value(&snapshot).expect("serialize");
    assert_eq!(json["notices"][0]["messageIndex"], 1);
}

#[tokio::test]
async fn dropped_send_future_leaves_session_usable() {
    let backend = ScriptedBackend::new(vec![ScriptedReply::chunks(["slow", "reply"])])
        .with_chunk_delay(Duration::from_millis(200));
    let mut session = scripted_session(&backend);

    let timed_out = tokio::time::timeout(
        Duration::from_millis(50),
        session.send("hello", cancel_signal(), |_| {}),
    )
    .await;
    assert!(timed_out.is_err());

    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.messages()[1], ChatMessage::model(""));
    assert_eq!(session.notices().len(), 1);
    assert_eq!(session.notices()[0].message_index, 1);

    session.clear().expect("clear after dropped send");
    backend.push_reply(ScriptedReply::chunks(["again"]));
    let outcome = session
        .send("retry", cancel_signal(), |_| {})
        .await
        .expect("send after dropped send");
    assert_eq!(outcome, SendOutcome::Completed);
    assert_eq!(
        session.messages(),
        &[ChatMessage::user("retry"), ChatMessage::model("again")]
    );
}

#[tokio::test]
async fn transport_failure_becomes_visible_model_text() {
    let backend = ScriptedBackend::new(vec![ScriptedReply::Fail {
        chunks: vec!["Half".to_string()],
        error: TransportError::Api {
            status: 500,
            body: "boom".to_string(),
        },
    }]);
    let mut session = scripted_session(&backend);

    let outcome = session
        .send("hello", cancel_signal(), |_| {})
        .await
        .expect("send");

    assert!(matches!(
        outcome,
        SendOutcome::Failed { error: TransportError::Api { status: 500, .. } }
    ));
    assert_eq!(
        session.messages()[1].content,
        "Half\n\nError: API error (HTTP 500): boom"
    );
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn history_excludes_the_new_user_message() {
    let requests = Arc::new(std::sync::Mutex::new(Vec::new()));
    let mut session = ChatSessionAccumulator::new(
        Box::new(FixedTransport {
            deltas: vec!["ok".to_string()],
            requests: Arc::clone(&requests),
        }),
        "System",
    );

    session.send("first", cancel_signal(), |_| {}).await.expect("first");
    session.send("second", cancel_signal(), |_| {}).await.expect("second");

    let requests = requests.lock().expect("requests lock");
    assert_eq!(requests[1].message, "second");
    assert_eq!(requests[1].system_prompt, "System");
    assert_eq!(
        requests[1].history,
        vec![ChatMessage::user("first"), ChatMessage::model("ok")]
    );
}

#[tokio::test]
async fn clear_resets_managed_session() {
    let backend = ScriptedBackend::default();
    let mut session = scripted_session(&backend);

    session.send("one", cancel_signal(), |_| {}).await.expect("send");
    session.clear().expect("clear");
    assert!(session.messages().is_empty());

    session.send("two", cancel_signal(), |_| {}).await.expect("send");
    assert_eq!(backend.sessions_started(), 2);
    assert!(backend.setups()[1].history.is_empty());
}

#[tokio::test]
async fn clear_is_refused_mid_send() {
    let backend = ScriptedBackend::default();
    let mut session = scripted_session(&backend);
    session.begin_send("pending").expect("begin");

    assert!(matches!(session.clear(), Err(SessionError::SendInFlight)));
    assert!(matches!(
        session.send("again", cancel_signal(), |_| {}).await,
        Err(SessionError::SendInFlight)
    ));
}

#[test]
fn snapshot_is_detached_from_later_mutation() {
    let backend = ScriptedBackend::default();
    let mut session = scripted_session(&backend);
    session.begin_send("hello").expect("begin");
    session.apply_delta(&TextDelta::from("Hi")).expect("delta");
    session.complete().expect("complete");

    let snapshot = session.snapshot().expect("snapshot");
    session.clear().expect("clear");

    assert_eq!(snapshot.system_prompt, "You are terse.");
    assert_eq!(snapshot.messages.len(), 2);
    assert_eq!(snapshot.id.get_version_num(), 4);
    assert!(time::OffsetDateTime::parse(
        &snapshot.created_at,
        &time::format_description::well_known::Rfc3339
    )
    .is_ok());

    let json = serde_json::to_value(&snapshot).expect("serialize");
    assert!(json.get("createdAt").is_some());
    assert!(json.get("systemPrompt").is_some());
    assert!(json.get("notices").is_none());
}

proptest! {
    #[test]
    fn placeholder_is_concatenation_of_deltas(deltas in prop::collection::vec(".{0,8}", 0..12)) {
        let runtime = tokio::runtime::Runtime::new().expect("runtime");
        let mut session = ChatSessionAccumulator::new(
            Box::new(FixedTransport {
                deltas: deltas.clone(),
                requests: Arc::default(),
            }),
            "",
        );

        let outcome = runtime
            .block_on(session.send("q", cancel_signal(), |_| {}))
            .expect("send");

        prop_assert_eq!(outcome, SendOutcome::Completed);
        prop_assert_eq!(&session.messages()[1].content, &deltas.concat());
    }
}
