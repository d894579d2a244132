use std::sync::{Arc, Mutex};

use chrono::Utc;
use planbook_model::{
    Conversation, ConversationDetail, ErrorKind as ServiceErrorKind, Message,
    Role,
};
use planbook_test_model::{
    InMemoryConversations, PresetEvent, PresetResponse, ScriptedTransport,
};
use serde_json::{Map, Value, json};

use super::exchange::Exchange;
use super::*;
use crate::store::ConversationStore;
use crate::stream::StreamHandler;

type Session = ChatSession<ScriptedTransport, InMemoryConversations>;

struct Harness {
    transport: ScriptedTransport,
    conversations: InMemoryConversations,
    updates: Arc<Mutex<Vec<ConversationStore>>>,
    session: Session,
}

impl Harness {
    fn new() -> Self {
        let transport = ScriptedTransport::default();
        let conversations = InMemoryConversations::default();
        let updates = Arc::new(Mutex::new(vec![]));
        let session = ChatSessionBuilder::with_backend(
            transport.clone(),
            conversations.clone(),
        )
        .on_update({
            let updates = Arc::clone(&updates);
            move |store| updates.lock().unwrap().push(store.clone())
        })
        .build();
        Self {
            transport,
            conversations,
            updates,
            session,
        }
    }

    fn reply(&self, preset: PresetResponse) {
        self.transport.add_response(preset);
    }

    fn updates(&self) -> Vec<ConversationStore> {
        self.updates.lock().unwrap().clone()
    }

    fn last_message(&self) -> &Message {
        self.session.store().messages().last().unwrap()
    }
}

fn token(content: &str) -> PresetEvent {
    PresetEvent::Token(content.to_owned())
}

fn done(message_id: i64, name: Option<&str>) -> PresetEvent {
    PresetEvent::Done {
        message_id: Some(message_id),
        conversation_name: name.map(str::to_owned),
    }
}

fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn detail(id: i64, name: &str, messages: Vec<Message>) -> ConversationDetail {
    let now = Utc::now();
    ConversationDetail {
        conversation: Conversation {
            id,
            name: name.to_owned(),
            created_at: now,
            updated_at: now,
            message_count: messages.len() as u32,
        },
        messages,
    }
}

#[tokio::test]
async fn test_send_creates_conversation_first() {
    let mut h = Harness::new();
    h.reply(PresetResponse::with_events([
        token("Sure."),
        done(2, Some("Weekly plan")),
    ]));

    h.session.send(None, "  Plan my week ").await.unwrap();

    let store = h.session.store();
    let active = store.active_conversation().unwrap();
    assert_eq!(store.conversations().len(), 1);
    assert_eq!(active.name, "Weekly plan");
    assert_eq!(h.transport.requests(), vec![(active.id, "Plan my week".to_owned())]);

    // The conversation exists before any message is appended, and the
    // human message precedes the placeholder.
    let updates = h.updates();
    assert_eq!(updates[0].active_id(), Some(active.id));
    assert!(updates[0].messages().is_empty());
    let roles: Vec<_> = updates[1].messages().iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::Human, Role::Assistant]);
    assert!(updates[1].is_streaming());

    let messages = store.messages();
    assert_eq!(messages[0].content, "Plan my week");
    assert_eq!(messages[1].content, "Sure.");
    assert_eq!(messages[1].id, Some(2));
    assert!(!messages[1].streaming);
}

#[tokio::test]
async fn test_tokens_concatenate_across_chunks() {
    for size in [1, 2, 5, 7, 64] {
        let mut h = Harness::new();
        h.reply(
            PresetResponse::with_events([
                token("Hel"),
                token("lo, "),
                token("wörld"),
                done(1, None),
            ])
            .chunked(size),
        );
        h.session.send(None, "Hi").await.unwrap();
        assert_eq!(h.last_message().content, "Hello, wörld", "chunk size {size}");
    }
}

#[tokio::test]
async fn test_tool_result_matches_earliest_pending_call() {
    let mut h = Harness::new();
    h.reply(PresetResponse::with_events([
        PresetEvent::ToolCall {
            name: "search".to_owned(),
            args: args(json!({ "q": "milk" })),
        },
        PresetEvent::ToolCall {
            name: "add_task".to_owned(),
            args: args(json!({ "title": "Buy milk" })),
        },
        PresetEvent::ToolCall {
            name: "search".to_owned(),
            args: args(json!({ "q": "eggs" })),
        },
        PresetEvent::ToolResult {
            name: "search".to_owned(),
            result: "3 hits".to_owned(),
        },
        PresetEvent::ToolResult {
            name: "unknown".to_owned(),
            result: "lost".to_owned(),
        },
        token("Found them."),
        done(4, None),
    ]));

    h.session.send(None, "Find milk").await.unwrap();

    let calls = &h.last_message().tool_calls;
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].name, "search");
    assert_eq!(calls[0].args["q"], "milk");
    assert_eq!(calls[0].result.as_deref(), Some("3 hits"));
    assert!(calls[1].is_pending());
    assert!(calls[2].is_pending());
}

#[tokio::test]
async fn test_terminal_transition_happens_once() {
    let mut h = Harness::new();
    h.reply(PresetResponse::with_events([
        token("Done"),
        done(9, None),
        token(" and more"),
        PresetEvent::Error("too late".to_owned()),
    ]));

    h.session.send(None, "Hi").await.unwrap();

    assert_eq!(h.last_message().content, "Done");
    let flags: Vec<_> = h.updates().iter().map(|s| s.is_streaming()).collect();
    let transitions =
        flags.windows(2).filter(|w| w[0] && !w[1]).count();
    assert_eq!(transitions, 1);
    assert_eq!(flags.last(), Some(&false));
}

#[test]
fn test_events_after_terminal_are_ignored() {
    let mut store = ConversationStore::default();
    store.push_message(Message::human("Hi"));
    let placeholder = store.push_message(Message::placeholder());

    {
        let mut exchange = Exchange::new(&mut store, None, 1, placeholder);
        exchange.on_token("Partial".to_owned());
        exchange.on_error("boom".to_owned());
        assert!(exchange.is_finished());
        exchange.on_token(" more".to_owned());
        exchange.on_done(Some(3), Some("Renamed".to_owned()));
        exchange.on_error("again".to_owned());
    }

    let message = &store.messages()[1];
    assert_eq!(message.content, "Partial\n\n[Error: boom]");
    assert_eq!(message.id, None);
    assert!(!message.streaming);
}

#[test]
fn test_dropped_exchange_finishes_placeholder() {
    let mut store = ConversationStore::default();
    let placeholder = store.push_message(Message::placeholder());
    let exchange = Exchange::new(&mut store, None, 1, placeholder);
    drop(exchange);

    assert!(!store.is_streaming());
    assert_eq!(store.messages()[0].content, "Error: The request was cancelled.");
}

#[tokio::test]
async fn test_error_event() {
    let mut h = Harness::new();
    h.reply(PresetResponse::with_events([
        token("Half an ans"),
        PresetEvent::Error("quota exceeded".to_owned()),
    ]));
    h.reply(PresetResponse::with_events([PresetEvent::Error(
        "quota exceeded".to_owned(),
    )]));

    h.session.send(None, "First").await.unwrap();
    assert_eq!(
        h.last_message().content,
        "Half an ans\n\n[Error: quota exceeded]"
    );
    assert!(!h.last_message().streaming);

    h.session.send(None, "Second").await.unwrap();
    assert_eq!(h.last_message().content, "Error: quota exceeded");
    assert_eq!(h.session.store().messages().len(), 4);
}

#[tokio::test]
async fn test_refused_exchange() {
    let mut h = Harness::new();
    h.reply(PresetResponse::with_status(503));

    h.session.send(None, "Hi").await.unwrap();

    let message = h.last_message();
    assert!(!message.streaming);
    assert!(
        message.content.starts_with("Error: Request failed: "),
        "{}",
        message.content
    );
    assert!(message.content.contains("HTTP 503"));
}

#[tokio::test]
async fn test_truncated_stream() {
    let mut h = Harness::new();
    h.reply(PresetResponse::with_events([token("Half")]));

    h.session.send(None, "Hi").await.unwrap();

    assert_eq!(
        h.last_message().content,
        "Half\n\n[Error: The response ended unexpectedly.]"
    );
    assert!(!h.session.store().is_streaming());
}

#[tokio::test]
async fn test_connection_lost() {
    let mut h = Harness::new();
    h.reply(PresetResponse::with_events([token("Half")]).chunked(3).broken());

    h.session.send(None, "Hi").await.unwrap();

    let message = h.last_message();
    assert!(
        message.content.starts_with("Half\n\n[Error: Connection lost: "),
        "{}",
        message.content
    );
    assert!(!message.streaming);
}

#[tokio::test]
async fn test_malformed_event_is_dropped() {
    let mut h = Harness::new();
    h.reply(PresetResponse::with_events([
        PresetEvent::Raw("event: token\ndata: {\"content\":\n\n".to_owned()),
        PresetEvent::Raw("event: progress\ndata: {\"step\":1}\n\n".to_owned()),
        PresetEvent::Raw("event: token\ndata:\n\n".to_owned()),
        token("ok"),
        done(1, Some("")),
    ]));

    h.session.send(None, "Hi").await.unwrap();

    assert_eq!(h.last_message().content, "ok");
    // An empty name never renames the conversation.
    let active = h.session.store().active_conversation().unwrap();
    assert_eq!(active.name, "New conversation");
}

#[tokio::test]
async fn test_empty_content_is_rejected() {
    let mut h = Harness::new();

    let err = h.session.send(None, " \n\t ").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(h.session.store().conversations().is_empty());
    assert!(h.session.store().messages().is_empty());
    assert!(h.transport.requests().is_empty());
    assert!(h.updates().is_empty());
}

#[tokio::test]
async fn test_failed_create() {
    let mut h = Harness::new();
    h.conversations.fail_next(ServiceErrorKind::Network);

    let err = h.session.send(None, "Hi").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Service(ServiceErrorKind::Network));
    assert!(h.session.store().active_id().is_none());
    assert!(h.session.store().messages().is_empty());
    assert!(h.transport.requests().is_empty());
}

#[tokio::test]
async fn test_send_reuses_active_conversation() {
    let mut h = Harness::new();
    h.reply(PresetResponse::with_events([token("One"), done(2, None)]));
    h.reply(PresetResponse::with_events([token("Two"), done(4, None)]));

    h.session.send(None, "First").await.unwrap();
    h.session.send(None, "Second").await.unwrap();

    assert_eq!(h.conversations.ids().len(), 1);
    let contents: Vec<_> = h
        .session
        .store()
        .messages()
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(contents, vec!["First", "One", "Second", "Two"]);
}

#[tokio::test]
async fn test_send_to_another_conversation() {
    let mut h = Harness::new();
    h.conversations
        .insert(detail(1, "Groceries", vec![Message::human("Old")]));
    h.conversations.insert(detail(2, "Trip", vec![]));
    h.reply(PresetResponse::with_events([token("Booked."), done(5, None)]));

    h.session.refresh_conversations().await.unwrap();
    h.session.select_conversation(1).await.unwrap();
    assert_eq!(h.session.store().messages().len(), 1);

    h.session.send(Some(2), "Book a train").await.unwrap();

    let store = h.session.store();
    assert_eq!(store.active_id(), Some(2));
    assert_eq!(store.messages().len(), 2);
    assert_eq!(store.messages()[0].content, "Book a train");
    assert_eq!(h.transport.requests()[0].0, 2);
}

#[tokio::test]
async fn test_conversation_operations() {
    let mut h = Harness::new();
    h.conversations.insert(detail(
        1,
        "Groceries",
        vec![Message::human("Milk?")],
    ));
    h.conversations.insert(detail(2, "Trip", vec![]));

    h.session.refresh_conversations().await.unwrap();
    let ids: Vec<_> =
        h.session.store().conversations().iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![2, 1]);

    h.session.select_conversation(1).await.unwrap();
    assert_eq!(h.session.store().active_id(), Some(1));
    assert_eq!(h.session.store().messages()[0].content, "Milk?");

    let err = h.session.select_conversation(7).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Service(ServiceErrorKind::Status(404)));
    assert_eq!(h.session.store().active_id(), Some(1));

    let created = h.session.new_conversation().await.unwrap();
    assert_eq!(h.session.store().active_id(), Some(created));
    assert_eq!(h.session.store().conversations()[0].id, created);
    assert!(h.session.store().messages().is_empty());

    h.session.select_conversation(1).await.unwrap();
    h.session.delete_conversation(1).await.unwrap();
    assert_eq!(h.session.store().active_id(), None);
    assert!(h.session.store().messages().is_empty());
    assert!(h.session.store().conversation(1).is_none());
    assert!(!h.conversations.ids().contains(&1));

    // A failed deletion keeps the conversation.
    h.session.select_conversation(2).await.unwrap();
    h.conversations.fail_next(ServiceErrorKind::Network);
    assert!(h.session.delete_conversation(2).await.is_err());
    assert_eq!(h.session.store().active_id(), Some(2));

    // Every operation notified the view.
    assert!(h.updates().len() >= 6);
}
